//! High level filesystem operations over any [`GenFS`].
//!
//! [`Filesystem`] is the operations provider a [`Dir`] forwards its passthrough calls to. Every
//! operation accepts either a single path or a set of paths where that makes sense (see
//! [`Paths`]), reports failures as an [`Error`] naming the offending path, and is built only from
//! [`GenFS`] primitives, so it behaves the same on disk and in memory.
//!
//! # Example
//!
//! ```
//! use fsdir::*;
//! use fsdir::ops::{Filesystem, MirrorOptions};
//!
//! let fs = Filesystem::new(fsdir::mem::FS::new());
//! fs.mkdir("/src/nested", 0o755).unwrap();
//! fs.touch(["/src/a.txt", "/src/nested/b.txt"], None, None).unwrap();
//!
//! fs.mirror("/src", "/dst", &MirrorOptions::new()).unwrap();
//! assert!(fs.exists(["/dst/a.txt", "/dst/nested/b.txt"]));
//!
//! fs.remove("/src").unwrap();
//! assert!(!fs.exists("/src"));
//! ```
//!
//! [`GenFS`]: ../trait.GenFS.html
//! [`Filesystem`]: struct.Filesystem.html
//! [`Dir`]: ../dir/struct.Dir.html
//! [`Paths`]: struct.Paths.html
//! [`Error`]: struct.Error.html

use std::io;
use std::path::{Path, PathBuf};
use std::slice;
use std::time::SystemTime;
use std::vec;

use thiserror::Error;
use tracing::{debug, trace};

use crate::finder::Finder;
use crate::fs::{DirEntry, GenFS, Metadata};
use crate::path_parts::trim_trailing;

/// A failed filesystem operation.
///
/// The message names the operation and the path it failed on; the underlying I/O error, if the
/// failure came from the filesystem, is available through [`source`].
///
/// [`source`]: https://doc.rust-lang.org/std/error/trait.Error.html#method.source
#[derive(Debug, Error)]
#[error("{message}")]
pub struct Error {
    message: String,
    path: PathBuf,
    #[source]
    source: Option<io::Error>,
}

impl Error {
    fn io<P: AsRef<Path>>(message: String, path: P, source: io::Error) -> Error {
        Error {
            message,
            path: path.as_ref().to_path_buf(),
            source: Some(source),
        }
    }

    fn plain<P: AsRef<Path>>(message: String, path: P) -> Error {
        Error {
            message,
            path: path.as_ref().to_path_buf(),
            source: None,
        }
    }

    /// Returns the message describing the failure.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the path the operation failed on.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A specialized `Result` for filesystem operations.
pub type Result<T> = std::result::Result<T, Error>;

/// One or more paths an operation applies to.
///
/// `Paths` is built through `From`, so operations taking `impl Into<Paths>` accept a single
/// `&str`, `String`, `&Path` or `PathBuf` as well as arrays, slices and vectors of them.
///
/// ```
/// use fsdir::ops::Paths;
///
/// assert_eq!(Paths::from("a").len(), 1);
/// assert_eq!(Paths::from(["a", "b"]).len(), 2);
/// assert_eq!(Paths::from(vec![String::from("a")]).len(), 1);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Paths(Vec<PathBuf>);

impl Paths {
    /// Returns the number of paths.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether there are no paths.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over the paths.
    pub fn iter(&self) -> slice::Iter<'_, PathBuf> {
        self.0.iter()
    }

    /// Returns new `Paths` with every path passed through `f`.
    pub fn map<F: FnMut(&Path) -> PathBuf>(&self, mut f: F) -> Paths {
        Paths(self.0.iter().map(|p| f(p)).collect())
    }
}

impl IntoIterator for Paths {
    type Item = PathBuf;
    type IntoIter = vec::IntoIter<PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Paths {
    type Item = &'a PathBuf;
    type IntoIter = slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<&str> for Paths {
    fn from(path: &str) -> Paths {
        Paths(vec![PathBuf::from(path)])
    }
}

impl From<String> for Paths {
    fn from(path: String) -> Paths {
        Paths(vec![PathBuf::from(path)])
    }
}

impl From<&String> for Paths {
    fn from(path: &String) -> Paths {
        Paths(vec![PathBuf::from(path)])
    }
}

impl From<&Path> for Paths {
    fn from(path: &Path) -> Paths {
        Paths(vec![path.to_path_buf()])
    }
}

impl From<PathBuf> for Paths {
    fn from(path: PathBuf) -> Paths {
        Paths(vec![path])
    }
}

impl From<&PathBuf> for Paths {
    fn from(path: &PathBuf) -> Paths {
        Paths(vec![path.clone()])
    }
}

impl<P: AsRef<Path>> From<Vec<P>> for Paths {
    fn from(paths: Vec<P>) -> Paths {
        Paths(paths.iter().map(|p| p.as_ref().to_path_buf()).collect())
    }
}

impl<P: AsRef<Path>> From<&[P]> for Paths {
    fn from(paths: &[P]) -> Paths {
        Paths(paths.iter().map(|p| p.as_ref().to_path_buf()).collect())
    }
}

impl<P: AsRef<Path>, const N: usize> From<[P; N]> for Paths {
    fn from(paths: [P; N]) -> Paths {
        Paths(paths.iter().map(|p| p.as_ref().to_path_buf()).collect())
    }
}

impl<P: AsRef<Path>, const N: usize> From<&[P; N]> for Paths {
    fn from(paths: &[P; N]) -> Paths {
        Paths(paths.iter().map(|p| p.as_ref().to_path_buf()).collect())
    }
}

/// Options for [`Filesystem::mirror`].
///
/// ```
/// use fsdir::ops::MirrorOptions;
///
/// let mut opts = MirrorOptions::new();
/// opts.overwrite(true).delete(true);
/// ```
///
/// [`Filesystem::mirror`]: struct.Filesystem.html#method.mirror
#[derive(Clone, Debug, Default)]
pub struct MirrorOptions {
    overwrite: bool,
    copy_on_windows: bool,
    delete: bool,
}

impl MirrorOptions {
    /// Creates options that copy only newer files, recreate symlinks and delete nothing.
    pub fn new() -> MirrorOptions {
        MirrorOptions::default()
    }

    /// Copy files even when the target is up to date.
    pub fn overwrite(&mut self, overwrite: bool) -> &mut Self {
        self.overwrite = overwrite;
        self
    }

    /// Copy symlinked files instead of recreating the links, following symlinked directories.
    ///
    /// Despite the name this applies on every platform, as it does for [`Filesystem::mirror`];
    /// only [`Filesystem::symlink`] limits its fallback to Windows.
    ///
    /// [`Filesystem::mirror`]: struct.Filesystem.html#method.mirror
    /// [`Filesystem::symlink`]: struct.Filesystem.html#method.symlink
    pub fn copy_on_windows(&mut self, copy_on_windows: bool) -> &mut Self {
        self.copy_on_windows = copy_on_windows;
        self
    }

    /// Remove entries of the target that have no counterpart in the origin.
    pub fn delete(&mut self, delete: bool) -> &mut Self {
        self.delete = delete;
        self
    }
}

/// Filesystem operations built on a [`GenFS`].
///
/// [`GenFS`]: ../trait.GenFS.html
#[derive(Clone, Debug, Default)]
pub struct Filesystem<F> {
    fs: F,
}

impl<F: GenFS> Filesystem<F> {
    /// Creates operations over `fs`.
    pub fn new(fs: F) -> Filesystem<F> {
        Filesystem { fs }
    }

    /// Returns the underlying primitive filesystem.
    pub fn fs(&self) -> &F {
        &self.fs
    }

    /// Returns whether every one of `files` exists. A symlink exists even if it dangles.
    pub fn exists<P: Into<Paths>>(&self, files: P) -> bool {
        files.into().iter().all(|file| self.fs.symlink_metadata(file).is_ok())
    }

    /// Creates every one of `dirs`, with missing parents, using `mode`.
    ///
    /// Directories that already exist are left alone.
    pub fn mkdir<P: Into<Paths>>(&self, dirs: P, mode: u32) -> Result<()> {
        for dir in &dirs.into() {
            if self.is_dir(dir) {
                continue;
            }
            debug!(path = %dir.display(), mode, "creating directory");
            self.fs
                .create_dir_all(dir, mode)
                .map_err(|e| Error::io(format!("Failed to create \"{}\"", dir.display()), dir, e))?;
        }
        Ok(())
    }

    /// Copies `origin` to `target`, creating the parent of `target` if needed.
    ///
    /// Unless `overwrite` is set, an existing target is only replaced when `origin` was modified
    /// more recently.
    pub fn copy<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        origin: P,
        target: Q,
        overwrite: bool,
    ) -> Result<()> {
        let (origin, target) = (origin.as_ref(), target.as_ref());
        let missing = || format!("Failed to copy \"{}\" because file does not exist", origin.display());
        let origin_meta = match self.fs.metadata(origin) {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => return Err(Error::plain(missing(), origin)),
            Err(e) => return Err(Error::io(missing(), origin, e)),
        };

        if let Some(parent) = parent_of(target) {
            self.mkdir(parent, 0o777)?;
        }

        let stale = match self.fs.metadata(target) {
            Ok(ref meta) if meta.is_file() => newer(&origin_meta, meta),
            _ => true,
        };
        if !overwrite && !stale {
            trace!(origin = %origin.display(), target = %target.display(), "target is up to date");
            return Ok(());
        }

        trace!(origin = %origin.display(), target = %target.display(), "copying file");
        self.fs.copy(origin, target).map_err(|e| {
            let msg = format!("Failed to copy \"{}\" to \"{}\"", origin.display(), target.display());
            Error::io(msg, origin, e)
        })?;
        Ok(())
    }

    /// Sets the modification time of `files` to `time` (default now) and their access time to
    /// `atime` (default the modification time), creating missing files empty.
    pub fn touch<P: Into<Paths>>(
        &self,
        files: P,
        time: Option<SystemTime>,
        atime: Option<SystemTime>,
    ) -> Result<()> {
        let modified = time.unwrap_or_else(SystemTime::now);
        let accessed = atime.unwrap_or(modified);
        for file in &files.into() {
            trace!(path = %file.display(), "touching file");
            let created = match self.fs.symlink_metadata(file) {
                Ok(_) => Ok(()),
                Err(_) => self.fs.write(file, &[]),
            };
            created
                .and_then(|_| self.fs.set_times(file, accessed, modified))
                .map_err(|e| Error::io(format!("Failed to touch \"{}\"", file.display()), file, e))?;
        }
        Ok(())
    }

    /// Removes `files`, in reverse order, recursing into directories.
    ///
    /// Symlinks are removed, never followed. Paths that do not exist are skipped.
    pub fn remove<P: Into<Paths>>(&self, files: P) -> Result<()> {
        let files = files.into();
        for file in files.iter().rev() {
            let meta = match self.fs.symlink_metadata(file) {
                Ok(meta) => meta,
                Err(ref e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(Error::io(format!("Failed to remove \"{}\"", file.display()), file, e))
                }
            };
            if meta.is_dir() {
                let failed = |e| {
                    Error::io(format!("Failed to remove directory \"{}\"", file.display()), file, e)
                };
                let children = self.children(file).map_err(failed)?;
                self.remove(children)?;
                self.fs.remove_dir(file).map_err(failed)?;
            } else {
                self.fs.remove_file(file).map_err(|e| {
                    Error::io(format!("Failed to remove file \"{}\"", file.display()), file, e)
                })?;
            }
            trace!(path = %file.display(), "removed");
        }
        Ok(())
    }

    /// Sets the mode of `files` to `mode & !umask`, descending into directories (children first)
    /// if `recursive` is set. Symlinked directories are not descended into.
    pub fn chmod<P: Into<Paths>>(
        &self,
        files: P,
        mode: u32,
        umask: u32,
        recursive: bool,
    ) -> Result<()> {
        for file in &files.into() {
            let failed = |e| Error::io(format!("Failed to chmod file \"{}\"", file.display()), file, e);
            if recursive && self.is_dir(file) && !self.is_link(file) {
                let children = self.children(file).map_err(failed)?;
                self.chmod(children, mode, umask, true)?;
            }
            trace!(path = %file.display(), mode = mode & !umask, "chmod");
            self.fs.set_mode(file, mode & !umask).map_err(failed)?;
        }
        Ok(())
    }

    /// Changes the owner of `files` to the user ID `uid`, descending into directories if
    /// `recursive` is set. Symlinks themselves are changed.
    pub fn chown<P: Into<Paths>>(&self, files: P, uid: u32, recursive: bool) -> Result<()> {
        self.change_owner(files.into(), Some(uid), None, recursive, "chown")
    }

    /// Changes the group of `files` to the group ID `gid`, descending into directories if
    /// `recursive` is set. Symlinks themselves are changed.
    pub fn chgrp<P: Into<Paths>>(&self, files: P, gid: u32, recursive: bool) -> Result<()> {
        self.change_owner(files.into(), None, Some(gid), recursive, "chgrp")
    }

    fn change_owner(
        &self,
        files: Paths,
        uid: Option<u32>,
        gid: Option<u32>,
        recursive: bool,
        verb: &str,
    ) -> Result<()> {
        for file in &files {
            let failed = |e| Error::io(format!("Failed to {} file \"{}\"", verb, file.display()), file, e);
            if recursive && self.is_dir(file) && !self.is_link(file) {
                let children = self.children(file).map_err(failed)?;
                self.change_owner(Paths::from(children), uid, gid, true, verb)?;
            }
            trace!(path = %file.display(), ?uid, ?gid, "changing owner");
            self.fs.chown(file, uid, gid).map_err(failed)?;
        }
        Ok(())
    }

    /// Renames `origin` to `target`, refusing to replace an existing target.
    pub fn rename<P: AsRef<Path>, Q: AsRef<Path>>(&self, origin: P, target: Q) -> Result<()> {
        let (origin, target) = (origin.as_ref(), target.as_ref());
        if self.exists(target) {
            let msg = format!("Cannot rename because the target \"{}\" already exists", target.display());
            return Err(Error::plain(msg, target));
        }
        trace!(origin = %origin.display(), target = %target.display(), "renaming");
        self.fs.rename(origin, target).map_err(|e| {
            let msg = format!("Cannot rename \"{}\" to \"{}\"", origin.display(), target.display());
            Error::io(msg, origin, e)
        })
    }

    /// Creates a symlink at `target` pointing to `origin`, creating the parent of `target`.
    ///
    /// An existing link at `target` is kept if it already points to `origin` and replaced
    /// otherwise. On Windows, `copy_on_windows` mirrors `origin` instead of linking it.
    pub fn symlink<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        origin: P,
        target: Q,
        copy_on_windows: bool,
    ) -> Result<()> {
        let (origin, target) = (origin.as_ref(), target.as_ref());
        if copy_on_windows && cfg!(windows) {
            return self.mirror(origin, target, MirrorOptions::new().copy_on_windows(true));
        }

        if let Some(parent) = parent_of(target) {
            self.mkdir(parent, 0o777)?;
        }
        if self.is_link(target) {
            if self.fs.read_link(target).ok().as_deref() == Some(origin) {
                return Ok(());
            }
            self.remove(target)?;
        }

        trace!(origin = %origin.display(), target = %target.display(), "creating symlink");
        self.fs.symlink(origin, target).map_err(|e| {
            let msg = format!(
                "Failed to create symbolic link from \"{}\" to \"{}\"",
                origin.display(),
                target.display()
            );
            Error::io(msg, target, e)
        })
    }

    /// Mirrors the tree below `origin` into `target`.
    ///
    /// See [`mirror_entries`] for how each entry is mirrored; this walks every entry of `origin`,
    /// parents before children.
    ///
    /// [`mirror_entries`]: #method.mirror_entries
    pub fn mirror<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        origin: P,
        target: Q,
        options: &MirrorOptions,
    ) -> Result<()> {
        let origin = trim_trailing(origin);
        let entries = self.walk(&origin, false, options.copy_on_windows)?;
        self.mirror_entries(&origin, target, entries, options)
    }

    /// Mirrors the given `entries`, which must lie below `origin`, into `target`.
    ///
    /// With the `delete` option, entries of `target` without a counterpart in `origin` are removed
    /// first. Then each entry is recreated: symlinks as symlinks (or copied, with
    /// `copy_on_windows`), directories created, and files copied, honoring `overwrite`.
    pub fn mirror_entries<P, Q, I>(
        &self,
        origin: P,
        target: Q,
        entries: I,
        options: &MirrorOptions,
    ) -> Result<()>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
        I: IntoIterator<Item = PathBuf>,
    {
        let origin = trim_trailing(origin);
        let target = trim_trailing(target);
        debug!(origin = %origin.display(), target = %target.display(), "mirroring");

        if options.delete && self.exists(&target) {
            for file in self.walk(&target, true, false)? {
                let rel = match file.strip_prefix(&target) {
                    Ok(rel) => rel,
                    Err(_) => continue,
                };
                if !self.exists(origin.join(rel)) {
                    self.remove(&file)?;
                }
            }
        }

        self.mkdir(&target, 0o777)?;
        for file in entries {
            let dest = match file.strip_prefix(&origin) {
                Ok(rel) => target.join(rel),
                Err(_) => {
                    trace!(path = %file.display(), "skipping entry outside of the mirrored origin");
                    continue;
                }
            };
            let unknown = || format!("Unable to guess \"{}\" file type", file.display());
            let meta = self.fs.symlink_metadata(&file).map_err(|e| Error::io(unknown(), &file, e))?;

            if meta.is_symlink() && !options.copy_on_windows {
                let link = self.fs.read_link(&file).map_err(|e| Error::io(unknown(), &file, e))?;
                self.symlink(link, &dest, false)?;
            } else if meta.is_dir() {
                self.mkdir(&dest, 0o777)?;
            } else if meta.is_file() || meta.is_symlink() {
                self.copy(&file, &dest, options.overwrite)?;
            } else {
                return Err(Error::plain(unknown(), &file));
            }
        }
        Ok(())
    }

    fn is_dir<P: AsRef<Path>>(&self, path: P) -> bool {
        self.fs.metadata(path).map(|m| m.is_dir()).unwrap_or(false)
    }

    fn is_link<P: AsRef<Path>>(&self, path: P) -> bool {
        self.fs.symlink_metadata(path).map(|m| m.is_symlink()).unwrap_or(false)
    }

    fn children(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        self.fs.read_dir(dir)?.map(|ent| ent.map(|ent| ent.path())).collect()
    }

    // walk lists every path below dir.
    fn walk(&self, dir: &Path, child_first: bool, follow_links: bool) -> Result<Vec<PathBuf>> {
        let mut finder = Finder::all(self.fs.clone()).from(dir).follow_links(follow_links);
        if child_first {
            finder = finder.child_first();
        }
        finder
            .iter()
            .map(|info| info.map(|info| info.path().to_path_buf()))
            .collect::<io::Result<Vec<_>>>()
            .map_err(|e| Error::io(format!("Failed to read directory \"{}\"", dir.display()), dir, e))
    }
}

fn parent_of(path: &Path) -> Option<&Path> {
    path.parent().filter(|parent| !parent.as_os_str().is_empty())
}

fn newer<M: Metadata>(origin: &M, target: &M) -> bool {
    match (origin.modified(), target.modified()) {
        (Ok(origin), Ok(target)) => origin > target,
        _ => true,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::errors::EACCES;
    use crate::mem::{fail_at, At, FS};
    use std::error::Error as StdError;
    use std::time::Duration;

    fn setup() -> Filesystem<FS> {
        let fs = Filesystem::new(FS::new());
        fs.mkdir("/src/nested", 0o777).unwrap();
        fs.fs().write("/src/a.txt", b"a").unwrap();
        fs.fs().write("/src/nested/b.txt", b"b").unwrap();
        fs
    }

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn mkdir_is_idempotent() {
        let fs = Filesystem::new(FS::new());
        fs.mkdir(["/a/b", "/c"], 0o750).unwrap();
        fs.mkdir("/a/b", 0o700).unwrap();
        assert_eq!(fs.fs().metadata("/a/b").unwrap().mode(), 0o750);
        assert!(fs.exists(["/a", "/a/b", "/c"]));
    }

    #[test]
    fn mkdir_failure_names_path() {
        let fs = Filesystem::new(FS::new());
        fs.fs().push_sequence(vec![fail_at(At::CreateDirAll, EACCES)]);
        let err = fs.mkdir("/a", 0o777).unwrap_err();
        assert_eq!(err.message(), "Failed to create \"/a\"");
        assert_eq!(err.path(), Path::new("/a"));
        assert!(err.source().is_some());
    }

    #[test]
    fn copy_respects_modification_times() {
        let fs = setup();
        fs.copy("/src/a.txt", "/out/deep/a.txt", false).unwrap();
        assert_eq!(fs.fs().read("/out/deep/a.txt").unwrap(), b"a");

        // an up to date target is kept unless overwriting
        fs.fs().write("/out/deep/a.txt", b"changed").unwrap();
        fs.touch("/src/a.txt", Some(at(10)), None).unwrap();
        fs.touch("/out/deep/a.txt", Some(at(20)), None).unwrap();
        fs.copy("/src/a.txt", "/out/deep/a.txt", false).unwrap();
        assert_eq!(fs.fs().read("/out/deep/a.txt").unwrap(), b"changed");

        fs.copy("/src/a.txt", "/out/deep/a.txt", true).unwrap();
        assert_eq!(fs.fs().read("/out/deep/a.txt").unwrap(), b"a");

        fs.touch("/src/a.txt", Some(at(30)), None).unwrap();
        fs.fs().write("/out/deep/a.txt", b"changed").unwrap();
        fs.touch("/out/deep/a.txt", Some(at(20)), None).unwrap();
        fs.copy("/src/a.txt", "/out/deep/a.txt", false).unwrap();
        assert_eq!(fs.fs().read("/out/deep/a.txt").unwrap(), b"a");
    }

    #[test]
    fn copy_missing_origin() {
        let fs = setup();
        let err = fs.copy("/src/none", "/x", false).unwrap_err();
        assert_eq!(err.to_string(), "Failed to copy \"/src/none\" because file does not exist");
        let err = fs.copy("/src/nested", "/x", false).unwrap_err();
        assert!(err.source().is_none());
    }

    #[test]
    fn touch_creates_and_sets_times() {
        let fs = Filesystem::new(FS::new());
        fs.touch(["/a", "/b"], Some(at(5)), Some(at(3))).unwrap();
        let meta = fs.fs().metadata("/a").unwrap();
        assert!(meta.is_empty());
        assert_eq!(meta.modified().unwrap(), at(5));
        assert_eq!(meta.accessed().unwrap(), at(3));

        fs.touch("/b", Some(at(7)), None).unwrap();
        assert_eq!(fs.fs().metadata("/b").unwrap().accessed().unwrap(), at(7));
    }

    #[test]
    fn remove_recurses_without_following_links() {
        let fs = setup();
        fs.mkdir("/keep", 0o777).unwrap();
        fs.fs().write("/keep/k", b"k").unwrap();
        fs.fs().symlink("/keep", "/src/nested/link").unwrap();

        fs.remove(["/src", "/does/not/exist"]).unwrap();
        assert!(!fs.exists("/src"));
        assert_eq!(fs.fs().read("/keep/k").unwrap(), b"k");
    }

    #[test]
    fn remove_failure() {
        let fs = setup();
        fs.fs().push_sequence(vec![fail_at(At::RemoveFile, EACCES)]);
        let err = fs.remove("/src/a.txt").unwrap_err();
        assert_eq!(err.to_string(), "Failed to remove file \"/src/a.txt\"");
    }

    #[test]
    fn chmod_recursive_and_umask() {
        let fs = setup();
        fs.chmod("/src", 0o777, 0o022, true).unwrap();
        for path in &["/src", "/src/a.txt", "/src/nested", "/src/nested/b.txt"] {
            assert_eq!(fs.fs().metadata(path).unwrap().mode(), 0o755, "{}", path);
        }

        fs.chmod("/src", 0o700, 0, false).unwrap();
        assert_eq!(fs.fs().metadata("/src").unwrap().mode(), 0o700);
        assert_eq!(fs.fs().metadata("/src/a.txt").unwrap().mode(), 0o755);
    }

    #[test]
    fn chown_and_chgrp() {
        let fs = setup();
        fs.chown("/src", 1000, true).unwrap();
        fs.chgrp("/src/a.txt", 50, false).unwrap();

        let meta = fs.fs().metadata("/src/nested/b.txt").unwrap();
        assert_eq!((meta.uid(), meta.gid()), (1000, 0));
        let meta = fs.fs().metadata("/src/a.txt").unwrap();
        assert_eq!((meta.uid(), meta.gid()), (1000, 50));
    }

    #[test]
    fn rename_refuses_existing_target() {
        let fs = setup();
        let err = fs.rename("/src/a.txt", "/src/nested/b.txt").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot rename because the target \"/src/nested/b.txt\" already exists"
        );

        fs.rename("/src/a.txt", "/src/c.txt").unwrap();
        assert!(fs.exists("/src/c.txt"));
        assert!(!fs.exists("/src/a.txt"));
    }

    #[test]
    fn symlink_replaces_stale_links() {
        let fs = setup();
        fs.symlink("/src/a.txt", "/links/l", false).unwrap();
        assert_eq!(fs.fs().read("/links/l").unwrap(), b"a");

        // pointing at the same origin is a no-op
        fs.fs().push_sequence(vec![fail_at(At::Symlink, EACCES)]);
        fs.symlink("/src/a.txt", "/links/l", false).unwrap();
        fs.fs().clear_sequence();

        fs.symlink("/src/nested/b.txt", "/links/l", false).unwrap();
        assert_eq!(fs.fs().read("/links/l").unwrap(), b"b");
    }

    #[test]
    fn mirror_copies_tree_and_links() {
        let fs = setup();
        fs.fs().symlink("a.txt", "/src/link").unwrap();
        fs.mirror("/src/", "/dst", &MirrorOptions::new()).unwrap();

        assert_eq!(fs.fs().read("/dst/a.txt").unwrap(), b"a");
        assert_eq!(fs.fs().read("/dst/nested/b.txt").unwrap(), b"b");
        assert_eq!(fs.fs().read_link("/dst/link").unwrap(), PathBuf::from("a.txt"));
    }

    #[test]
    fn mirror_with_delete_removes_obsolete_entries() {
        let fs = setup();
        fs.mkdir("/dst/old", 0o777).unwrap();
        fs.fs().write("/dst/old/x", b"x").unwrap();
        fs.fs().write("/dst/stale.txt", b"x").unwrap();

        fs.mirror("/src", "/dst", MirrorOptions::new().delete(true)).unwrap();
        assert!(!fs.exists("/dst/old"));
        assert!(!fs.exists("/dst/stale.txt"));
        assert!(fs.exists(["/dst/a.txt", "/dst/nested/b.txt"]));
    }

    #[test]
    fn mirror_entries_only_mirrors_given_entries() {
        let fs = setup();
        let entries = vec![PathBuf::from("/src/nested"), PathBuf::from("/elsewhere")];
        fs.mirror_entries("/src", "/dst", entries, &MirrorOptions::new()).unwrap();
        assert!(fs.exists("/dst/nested"));
        assert!(!fs.exists("/dst/a.txt"));
        assert!(!fs.exists("/dst/nested/b.txt"));
    }
}
