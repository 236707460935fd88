//! A handle on one writable directory.
//!
//! A [`Dir`] is bound to a directory path. Opening it makes sure the directory exists and is
//! writable; afterwards it reads and writes files inside it, stores uploads under random names
//! that never collide, lists entries by mask, purges everything below it, and forwards the
//! operations of [`ops::Filesystem`] with paths resolved inside the directory.
//!
//! # Example
//!
//! ```
//! use fsdir::DirOptions;
//!
//! let fs = fsdir::mem::FS::new();
//! let dir = DirOptions::with_fs(fs).mode(0o755).open("/var/www/uploads/").unwrap();
//! assert_eq!(dir.to_string(), "/var/www/uploads");
//!
//! dir.write("notes/today.txt", "hello").unwrap();
//! assert_eq!(dir.read("notes/today.txt").unwrap(), b"hello");
//!
//! dir.copy("notes/today.txt", "notes/tomorrow.txt", false).unwrap()
//!     .rename("notes/tomorrow.txt", "later.txt").unwrap();
//!
//! let found: Vec<_> = dir.find("*.txt", true)
//!     .unwrap()
//!     .into_iter()
//!     .map(|info| info.unwrap().relative_path().to_string_lossy().into_owned())
//!     .collect();
//! assert_eq!(found, vec!["later.txt", "notes/today.txt"]);
//!
//! dir.purge().unwrap();
//! assert_eq!(dir.iter(true).into_iter().count(), 0);
//! ```
//!
//! [`Dir`]: struct.Dir.html
//! [`ops::Filesystem`]: ../ops/struct.Filesystem.html

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use fastrand::Rng;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::disk;
use crate::error::{Error, Result};
use crate::finder::{FileInfo, Finder, Iter, Masks};
use crate::fs::GenFS;
use crate::ops::{Filesystem, MirrorOptions, Paths};
use crate::path_parts::{prefixed, trim_trailing};
use crate::upload::UploadedFile;

const TOKEN_CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const TOKEN_LEN: usize = 10;

// token returns a random name prefix for an upload.
pub(crate) fn token(rng: &mut Rng) -> String {
    (0..TOKEN_LEN)
        .map(|_| TOKEN_CHARS[rng.usize(..TOKEN_CHARS.len())] as char)
        .collect()
}

/// Options and flags which can be used to configure how a [`Dir`] is opened.
///
/// This builder exposes the ability to configure how a [`Dir`] is opened: the filesystem it works
/// on, the mode its directory is created and kept with, and the seed of the random source that
/// names uploads.
///
/// # Example
///
/// ```
/// use fsdir::DirOptions;
///
/// let mut opts = DirOptions::with_fs(fsdir::mem::FS::new());
/// opts.mode(0o700).seed(42);
/// let dir = opts.open("/data").unwrap();
/// assert_eq!(dir.mode(), 0o700);
/// ```
///
/// [`Dir`]: struct.Dir.html
#[derive(Clone, Debug)]
pub struct DirOptions<F> {
    fs: F,
    mode: u32,
    seed: Option<u64>,
}

impl DirOptions<disk::FS> {
    /// Creates options for a directory on disk with mode `0o777`.
    pub fn new() -> DirOptions<disk::FS> {
        DirOptions::with_fs(disk::FS)
    }
}

impl Default for DirOptions<disk::FS> {
    fn default() -> Self {
        DirOptions::new()
    }
}

impl<F: GenFS> DirOptions<F> {
    /// Creates options for a directory on `fs` with mode `0o777`.
    pub fn with_fs(fs: F) -> DirOptions<F> {
        DirOptions {
            fs,
            mode: 0o777,
            seed: None,
        }
    }

    /// Sets the mode the directory is created and kept with.
    pub fn mode(&mut self, mode: u32) -> &mut Self {
        self.mode = mode;
        self
    }

    /// Seeds the random source used to name uploads.
    pub fn seed(&mut self, seed: u64) -> &mut Self {
        self.seed = Some(seed);
        self
    }

    /// Opens `path` with the options in `self`, creating the directory if needed and making it
    /// writable.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::NotWritable`] if the directory cannot be created or its mode set.
    ///
    /// [`Error::NotWritable`]: ../error/enum.Error.html#variant.NotWritable
    pub fn open<P: AsRef<Path>>(&self, path: P) -> Result<Dir<F>> {
        let rng = match self.seed {
            Some(seed) => Rng::with_seed(seed),
            None => Rng::new(),
        };
        let dir = Dir {
            path: trim_trailing(path),
            fs: Filesystem::new(self.fs.clone()),
            mode: self.mode,
            rng: Mutex::new(rng),
        };
        dir.ensure_writable(self.mode)?;
        debug!(path = %dir.path.display(), mode = dir.mode, "directory ready");
        Ok(dir)
    }
}

/// A handle on a writable directory.
///
/// Relative paths given to a `Dir` are resolved inside its directory. The designated file argument
/// of every forwarded operation is always placed inside the directory, even when absolute; the
/// origin of the two path operations (copy, rename, mirror) is only resolved when relative, so
/// outside files can be brought in. Symlink origins are stored as given.
pub struct Dir<F: GenFS = disk::FS> {
    path: PathBuf,
    fs: Filesystem<F>,
    mode: u32,
    rng: Mutex<Rng>,
}

impl Dir {
    /// Opens `path` on disk with mode `0o777`. See [`DirOptions`] for other settings.
    ///
    /// [`DirOptions`]: struct.DirOptions.html
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Dir> {
        DirOptions::new().open(path)
    }
}

impl<F: GenFS> Dir<F> {
    /// Returns the path of the directory.
    pub fn as_path(&self) -> &Path {
        &self.path
    }

    /// Returns the mode the directory was opened with.
    pub fn mode(&self) -> u32 {
        self.mode
    }

    /// Returns the operations this handle forwards to.
    pub fn filesystem(&self) -> &Filesystem<F> {
        &self.fs
    }

    /// Creates the directory, with missing parents, and sets `mode` on it and everything below
    /// it.
    pub fn ensure_writable(&self, mode: u32) -> Result<&Self> {
        let not_writable = |source| Error::NotWritable {
            path: self.path.clone(),
            source,
        };
        self.fs.mkdir(&self.path, mode).map_err(not_writable)?;
        self.fs.chmod(&self.path, mode, 0, true).map_err(not_writable)?;
        Ok(self)
    }

    /// Reads the whole of `file`.
    pub fn read<P: AsRef<Path>>(&self, file: P) -> io::Result<Vec<u8>> {
        self.fs.fs().read(self.resolve(file))
    }

    /// Writes `contents` to `file`, replacing it, and creates its parent directories if needed.
    pub fn write<P: AsRef<Path>, C: AsRef<[u8]>>(&self, file: P, contents: C) -> Result<()> {
        let path = self.resolve(file);
        if let Some(parent) = path.parent() {
            self.fs.mkdir(parent, 0o777)?;
        }
        self.fs
            .fs()
            .write(&path, contents.as_ref())
            .map_err(|source| Error::Write { path, source })
    }

    /// Moves `upload` into the directory and returns the base name of the file it was stored as.
    ///
    /// The name is a random token of ten lowercase letters and digits, a `.`, and `filename` or,
    /// without one (or with an empty one), the upload's sanitized name. A `filename` containing
    /// separators stores the upload in a subdirectory and only its last component is returned. A
    /// new token is drawn until the name is free, so no existing entry is ever replaced.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::CorruptedUpload`] if the upload did not arrive intact and with
    /// [`Error::Upload`] if it cannot be moved.
    ///
    /// [`Error::CorruptedUpload`]: ../error/enum.Error.html#variant.CorruptedUpload
    /// [`Error::Upload`]: ../error/enum.Error.html#variant.Upload
    pub fn write_uploaded<U: UploadedFile>(
        &self,
        upload: &mut U,
        filename: Option<&str>,
    ) -> Result<String> {
        if !upload.is_ok() {
            return Err(Error::CorruptedUpload);
        }
        let suffix = match filename.filter(|name| !name.is_empty()) {
            Some(name) => name.to_owned(),
            None => upload.sanitized_name(),
        };

        let path = loop {
            let name = format!("{}.{}", token(&mut self.rng.lock()), suffix);
            let path = self.resolve(&name);
            if self.fs.fs().symlink_metadata(&path).is_err() {
                break path;
            }
            trace!(name = %name, "upload name taken");
        };

        upload
            .move_to(self.fs.fs(), &path)
            .map_err(|source| Error::Upload { path: path.clone(), source })?;
        debug!(path = %path.display(), "upload stored");
        Ok(path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default())
    }

    /// Removes everything below the directory, children before their parents. The directory
    /// itself stays. Symlinks are removed, not followed.
    ///
    /// # Errors
    ///
    /// Stops at the first entry that cannot be removed with [`Error::Delete`] naming it.
    ///
    /// [`Error::Delete`]: ../error/enum.Error.html#variant.Delete
    pub fn purge(&self) -> Result<()> {
        let finder = Finder::all(self.fs.fs().clone())
            .from(&self.path)
            .child_first()
            .follow_links(false);

        let mut removed = 0;
        for info in &finder {
            let info = info.map_err(|source| Error::Find {
                path: self.path.clone(),
                source,
            })?;
            let (kind, res) = if info.is_dir() {
                ("directory", self.fs.fs().remove_dir(info.path()))
            } else {
                ("file", self.fs.fs().remove_file(info.path()))
            };
            res.map_err(|source| Error::Delete {
                kind,
                path: info.path().to_path_buf(),
                source,
            })?;
            removed += 1;
        }
        debug!(path = %self.path.display(), removed, "purged");
        Ok(())
    }

    /// Returns a [`Finder`] over the entries matching `masks`: the entries directly in the
    /// directory or, if `recursive`, every entry below it.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Mask`] if a mask is not a valid glob pattern.
    ///
    /// [`Finder`]: ../finder/struct.Finder.html
    /// [`Error::Mask`]: ../error/enum.Error.html#variant.Mask
    pub fn find<M: Into<Masks>>(&self, masks: M, recursive: bool) -> Result<Finder<F>> {
        let finder = Finder::find(self.fs.fs().clone(), masks)?;
        Ok(self.scope(finder, recursive))
    }

    /// Returns a [`Finder`] over every entry, like `find("*", recursive)`.
    ///
    /// [`Finder`]: ../finder/struct.Finder.html
    pub fn iter(&self, recursive: bool) -> Finder<F> {
        self.scope(Finder::all(self.fs.fs().clone()), recursive)
    }

    /// Returns a handle on the directory `name` inside this one, creating it with this handle's
    /// mode. This directory is made writable again first.
    pub fn subdir<P: AsRef<Path>>(&self, name: P) -> Result<Dir<F>> {
        self.ensure_writable(self.mode)?;
        let mut opts = DirOptions::with_fs(self.fs.fs().clone());
        opts.mode(self.mode);
        opts.open(self.resolve(name))
    }

    /// Returns whether `file` exists. A dangling symlink exists.
    pub fn exists<P: AsRef<Path>>(&self, file: P) -> bool {
        self.fs.exists(self.resolve(file))
    }

    /// Copies `origin` to `target`. See [`Filesystem::copy`].
    ///
    /// [`Filesystem::copy`]: ../ops/struct.Filesystem.html#method.copy
    pub fn copy<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        origin: P,
        target: Q,
        overwrite: bool,
    ) -> Result<&Self> {
        self.fs.copy(self.origin(origin), self.resolve(target), overwrite)?;
        Ok(self)
    }

    /// Creates `dirs` with `mode`. See [`Filesystem::mkdir`].
    ///
    /// [`Filesystem::mkdir`]: ../ops/struct.Filesystem.html#method.mkdir
    pub fn mkdir<P: Into<Paths>>(&self, dirs: P, mode: u32) -> Result<&Self> {
        self.fs.mkdir(self.resolve_all(dirs), mode)?;
        Ok(self)
    }

    /// Sets the times of `files`, creating missing ones. See [`Filesystem::touch`].
    ///
    /// [`Filesystem::touch`]: ../ops/struct.Filesystem.html#method.touch
    pub fn touch<P: Into<Paths>>(
        &self,
        files: P,
        time: Option<SystemTime>,
        atime: Option<SystemTime>,
    ) -> Result<&Self> {
        self.fs.touch(self.resolve_all(files), time, atime)?;
        Ok(self)
    }

    /// Removes `files`. See [`Filesystem::remove`].
    ///
    /// [`Filesystem::remove`]: ../ops/struct.Filesystem.html#method.remove
    pub fn remove<P: Into<Paths>>(&self, files: P) -> Result<&Self> {
        self.fs.remove(self.resolve_all(files))?;
        Ok(self)
    }

    /// Sets the mode of `files`. See [`Filesystem::chmod`].
    ///
    /// [`Filesystem::chmod`]: ../ops/struct.Filesystem.html#method.chmod
    pub fn chmod<P: Into<Paths>>(
        &self,
        files: P,
        mode: u32,
        umask: u32,
        recursive: bool,
    ) -> Result<&Self> {
        self.fs.chmod(self.resolve_all(files), mode, umask, recursive)?;
        Ok(self)
    }

    /// Sets the owner of `files`. See [`Filesystem::chown`].
    ///
    /// [`Filesystem::chown`]: ../ops/struct.Filesystem.html#method.chown
    pub fn chown<P: Into<Paths>>(&self, files: P, uid: u32, recursive: bool) -> Result<&Self> {
        self.fs.chown(self.resolve_all(files), uid, recursive)?;
        Ok(self)
    }

    /// Sets the group of `files`. See [`Filesystem::chgrp`].
    ///
    /// [`Filesystem::chgrp`]: ../ops/struct.Filesystem.html#method.chgrp
    pub fn chgrp<P: Into<Paths>>(&self, files: P, gid: u32, recursive: bool) -> Result<&Self> {
        self.fs.chgrp(self.resolve_all(files), gid, recursive)?;
        Ok(self)
    }

    /// Renames `origin` to `target`. See [`Filesystem::rename`].
    ///
    /// [`Filesystem::rename`]: ../ops/struct.Filesystem.html#method.rename
    pub fn rename<P: AsRef<Path>, Q: AsRef<Path>>(&self, origin: P, target: Q) -> Result<&Self> {
        self.fs.rename(self.origin(origin), self.resolve(target))?;
        Ok(self)
    }

    /// Creates a symlink at `target` pointing to `origin`, which is stored as given. See
    /// [`Filesystem::symlink`].
    ///
    /// [`Filesystem::symlink`]: ../ops/struct.Filesystem.html#method.symlink
    pub fn symlink<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        origin: P,
        target: Q,
        copy_on_windows: bool,
    ) -> Result<&Self> {
        self.fs.symlink(origin, self.resolve(target), copy_on_windows)?;
        Ok(self)
    }

    /// Mirrors `origin` into `target`. See [`Filesystem::mirror`].
    ///
    /// [`Filesystem::mirror`]: ../ops/struct.Filesystem.html#method.mirror
    pub fn mirror<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        origin: P,
        target: Q,
        options: &MirrorOptions,
    ) -> Result<&Self> {
        self.fs.mirror(self.origin(origin), self.resolve(target), options)?;
        Ok(self)
    }

    /// Mirrors the given `entries` of `origin` into `target`. Relative entries are resolved like
    /// `origin`. See [`Filesystem::mirror_entries`].
    ///
    /// [`Filesystem::mirror_entries`]: ../ops/struct.Filesystem.html#method.mirror_entries
    pub fn mirror_entries<P, Q, I>(
        &self,
        origin: P,
        target: Q,
        entries: I,
        options: &MirrorOptions,
    ) -> Result<&Self>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
        I: IntoIterator<Item = PathBuf>,
    {
        let entries: Vec<PathBuf> = entries.into_iter().map(|e| self.origin(e)).collect();
        self.fs.mirror_entries(self.origin(origin), self.resolve(target), entries, options)?;
        Ok(self)
    }

    fn resolve<P: AsRef<Path>>(&self, file: P) -> PathBuf {
        prefixed(&self.path, file)
    }

    fn resolve_all<P: Into<Paths>>(&self, files: P) -> Paths {
        files.into().map(|file| self.resolve(file))
    }

    fn origin<P: AsRef<Path>>(&self, origin: P) -> PathBuf {
        let origin = origin.as_ref();
        if origin.is_absolute() {
            origin.to_path_buf()
        } else {
            self.resolve(origin)
        }
    }

    fn scope(&self, finder: Finder<F>, recursive: bool) -> Finder<F> {
        if recursive {
            finder.from(&self.path)
        } else {
            finder.within(&self.path)
        }
    }
}

impl<F: GenFS> fmt::Debug for Dir<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Dir")
            .field("path", &self.path)
            .field("mode", &format_args!("{:#o}", self.mode))
            .field("fs", &self.fs)
            .finish()
    }
}

impl<F: GenFS> fmt::Display for Dir<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

impl<F: GenFS> AsRef<Path> for Dir<F> {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

impl<'a, F: GenFS> IntoIterator for &'a Dir<F> {
    type Item = io::Result<FileInfo<F::Metadata>>;
    type IntoIter = Iter<F>;

    fn into_iter(self) -> Iter<F> {
        self.iter(false).into_iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::errors::EACCES;
    use crate::fs::Metadata;
    use crate::mem::{fail_at, At, FS};
    use crate::upload::{FileUpload, UploadError};
    use std::error::Error as StdError;
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    const SEED: u64 = 7;

    fn open(fs: &FS) -> Dir<FS> {
        DirOptions::with_fs(fs.clone()).seed(SEED).open("/tmp/x/").unwrap()
    }

    fn names(finder: Finder<FS>) -> Vec<String> {
        finder
            .into_iter()
            .map(|info| info.unwrap().relative_path().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn opening_creates_a_writable_directory() {
        let fs = FS::new();
        let dir = DirOptions::with_fs(fs.clone()).mode(0o750).open("/a/b//").unwrap();
        assert_eq!(dir.as_path(), Path::new("/a/b"));
        assert_eq!(dir.to_string(), "/a/b");
        assert_eq!(fs.metadata("/a/b").unwrap().mode(), 0o750);

        // reopening keeps the contents and resets modes below
        dir.write("f", "x").unwrap();
        fs.set_mode("/a/b/f", 0o600).unwrap();
        let dir = DirOptions::with_fs(fs.clone()).mode(0o770).open("/a/b").unwrap();
        assert_eq!(dir.read("f").unwrap(), b"x");
        assert_eq!(fs.metadata("/a/b/f").unwrap().mode(), 0o770);
    }

    #[test]
    fn not_writable() {
        let fs = FS::new();
        fs.push_sequence(vec![fail_at(At::CreateDirAll, EACCES)]);
        let err = DirOptions::with_fs(fs.clone()).open("/a").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Please make directory '/a' writable, it cannot be done automatically"
        );
        assert_eq!(err.source().unwrap().to_string(), "Failed to create \"/a\"");
        assert!(matches!(err, Error::NotWritable { .. }));

        fs.push_sequence(vec![fail_at(At::SetMode, EACCES)]);
        let err = DirOptions::with_fs(fs.clone()).open("/a").unwrap_err();
        assert!(matches!(err, Error::NotWritable { .. }));
        assert!(fs.metadata("/a").unwrap().is_dir());
    }

    #[test]
    fn write_read_round_trip() {
        let fs = FS::new();
        let dir = open(&fs);
        dir.write("a/b/c.txt", b"contents").unwrap();
        assert_eq!(dir.read("a/b/c.txt").unwrap(), b"contents");

        dir.write("a/b/c.txt", "").unwrap();
        assert_eq!(dir.read("a/b/c.txt").unwrap(), b"");
        assert_eq!(fs.read("/tmp/x/a/b/c.txt").unwrap(), b"");
    }

    #[test]
    fn opening_keeps_non_utf8_paths() {
        let fs = FS::new();
        let raw = OsStr::from_bytes(b"/data/caf\xe9");
        let dir = DirOptions::with_fs(fs.clone())
            .open(OsStr::from_bytes(b"/data/caf\xe9/"))
            .unwrap();
        assert_eq!(dir.as_path().as_os_str().as_bytes(), raw.as_bytes());
        assert!(fs.metadata(raw).unwrap().is_dir());

        dir.write("f", "x").unwrap();
        assert_eq!(fs.read(Path::new(raw).join("f")).unwrap(), b"x");
    }

    #[test]
    fn read_missing_is_a_native_error() {
        let dir = open(&FS::new());
        assert_eq!(dir.read("nope").unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn write_failures() {
        let fs = FS::new();
        let dir = open(&fs);

        fs.push_sequence(vec![fail_at(At::Write, EACCES)]);
        let err = dir.write("f", "x").unwrap_err();
        assert!(err.to_string().starts_with("Cannot write to file '/tmp/x/f': "));
        assert!(matches!(err, Error::Write { .. }));

        fs.push_sequence(vec![fail_at(At::CreateDirAll, EACCES)]);
        let err = dir.write("sub/f", "x").unwrap_err();
        assert_eq!(err.to_string(), "Failed to create \"/tmp/x/sub\"");
    }

    #[test]
    fn uploads_never_overwrite() {
        let fs = FS::new();
        let dir = open(&fs);
        fs.write("/tmp/upload", b"new").unwrap();

        let taken = format!("{}.photo.jpg", token(&mut Rng::with_seed(SEED)));
        dir.write(&taken, "old").unwrap();

        let mut upload = FileUpload::new("ignored", "/tmp/upload", 3);
        let name = dir.write_uploaded(&mut upload, Some("photo.jpg")).unwrap();
        assert_ne!(name, taken);
        assert!(name.ends_with(".photo.jpg"));
        assert_eq!(name.len(), TOKEN_LEN + ".photo.jpg".len());
        assert!(name[..TOKEN_LEN].bytes().all(|b| TOKEN_CHARS.contains(&b)));

        assert_eq!(dir.read(&taken).unwrap(), b"old");
        assert_eq!(dir.read(&name).unwrap(), b"new");
        assert_eq!(upload.path(), dir.as_path().join(&name));
    }

    #[test]
    fn uploads_default_to_the_sanitized_name() {
        let fs = FS::new();
        let dir = open(&fs);
        fs.write("/tmp/upload", b"").unwrap();

        let mut upload = FileUpload::new("My File (1).txt", "/tmp/upload", 0);
        let name = dir.write_uploaded(&mut upload, None).unwrap();
        assert_eq!(&name[TOKEN_LEN..], ".My-File-1-.txt");
    }

    #[test]
    fn empty_upload_names_use_the_sanitized_name() {
        let fs = FS::new();
        let dir = open(&fs);
        fs.write("/tmp/upload", b"").unwrap();

        let mut upload = FileUpload::new("Résumé.pdf", "/tmp/upload", 0);
        let name = dir.write_uploaded(&mut upload, Some("")).unwrap();
        assert_eq!(&name[TOKEN_LEN..], ".Resume.pdf");
        assert!(dir.exists(&name));
    }

    #[test]
    fn uploads_into_subdirectories_return_the_base_name() {
        let fs = FS::new();
        let dir = open(&fs);
        fs.write("/tmp/upload", b"img").unwrap();

        let mut upload = FileUpload::new("ignored", "/tmp/upload", 3);
        let name = dir.write_uploaded(&mut upload, Some("sub/photo.jpg")).unwrap();
        assert_eq!(name, "photo.jpg");

        let stored = format!("{}.sub/photo.jpg", token(&mut Rng::with_seed(SEED)));
        assert_eq!(dir.read(&stored).unwrap(), b"img");
        assert_eq!(upload.path(), dir.as_path().join(&stored));
    }

    #[test]
    fn uploads_survive_mode_failures() {
        let fs = FS::new();
        let dir = open(&fs);
        fs.write("/tmp/upload", b"data").unwrap();

        fs.push_sequence(vec![fail_at(At::SetMode, EACCES)]);
        let mut upload = FileUpload::new("a.txt", "/tmp/upload", 4);
        let name = dir.write_uploaded(&mut upload, None).unwrap();
        assert_eq!(dir.read(&name).unwrap(), b"data");
        assert_eq!(upload.path(), dir.as_path().join(&name));
        assert!(fs.metadata("/tmp/upload").is_err());
    }

    #[test]
    fn upload_failures() {
        let fs = FS::new();
        let dir = open(&fs);

        let mut upload = FileUpload::failed("a.txt", UploadError::TooLarge);
        let err = dir.write_uploaded(&mut upload, None).unwrap_err();
        assert_eq!(err.to_string(), "Cannot save corrupted file.");

        fs.write("/tmp/upload", b"").unwrap();
        fs.push_sequence(vec![fail_at(At::Rename, EACCES)]);
        let mut upload = FileUpload::new("a.txt", "/tmp/upload", 0);
        let err = dir.write_uploaded(&mut upload, None).unwrap_err();
        assert!(matches!(err, Error::Upload { .. }));
        assert_eq!(upload.path(), Path::new("/tmp/upload"));
    }

    #[test]
    fn purge_empties_the_tree() {
        let fs = FS::new();
        let dir = open(&fs);
        dir.write("a.txt", "a").unwrap();
        dir.write("sub/deep/b.txt", "b").unwrap();
        dir.mkdir("empty", 0o777).unwrap();

        dir.purge().unwrap();
        assert!(fs.metadata("/tmp/x").unwrap().is_dir());
        assert_eq!(dir.iter(true).into_iter().count(), 0);

        dir.purge().unwrap();
        assert!(fs.metadata("/tmp/x").unwrap().is_dir());
    }

    #[test]
    fn purge_does_not_follow_links() {
        let fs = FS::new();
        let dir = open(&fs);
        fs.create_dir_all("/outside", 0o777).unwrap();
        fs.write("/outside/keep", b"k").unwrap();
        dir.symlink("/outside", "link", false).unwrap();

        dir.purge().unwrap();
        assert!(!dir.exists("link"));
        assert_eq!(fs.read("/outside/keep").unwrap(), b"k");
    }

    #[test]
    fn purge_stops_at_the_first_failure() {
        let fs = FS::new();
        let dir = open(&fs);
        dir.write("sub/f", "f").unwrap();
        dir.write("z", "z").unwrap();

        fs.push_sequence(vec![fail_at(At::RemoveFile, EACCES)]);
        let err = dir.purge().unwrap_err();
        assert_eq!(err.to_string(), "Cannot delete file /tmp/x/sub/f");
        assert!(dir.exists("sub/f"));
        assert!(dir.exists("z"));

        fs.push_sequence(vec![fail_at(At::RemoveDir, EACCES)]);
        let err = dir.purge().unwrap_err();
        assert_eq!(err.to_string(), "Cannot delete directory /tmp/x/sub");
        assert!(!dir.exists("sub/f"));
    }

    #[test]
    fn find_by_mask() {
        let fs = FS::new();
        let dir = open(&fs);
        dir.write("a.txt", "").unwrap();
        dir.write("b.md", "").unwrap();
        dir.write("sub/c.txt", "").unwrap();

        assert_eq!(names(dir.find("*.txt", false).unwrap()), vec!["a.txt"]);
        assert_eq!(names(dir.find("*.txt", true).unwrap()), vec!["a.txt", "sub/c.txt"]);
        assert_eq!(names(dir.find(["*.txt", "*.md"], false).unwrap()), vec!["a.txt", "b.md"]);
        assert_eq!(names(dir.iter(false)), vec!["a.txt", "b.md", "sub"]);

        let top: Vec<_> = (&dir).into_iter().map(|info| info.unwrap().is_dir()).collect();
        assert_eq!(top, vec![false, false, true]);

        assert!(matches!(dir.find("[", false), Err(Error::Mask(_))));
    }

    #[test]
    fn copy_resolves_both_paths() {
        let fs = FS::new();
        let dir = open(&fs);
        dir.write("a.txt", "a").unwrap();
        fs.write("/elsewhere.txt", b"e").unwrap();

        dir.copy("a.txt", "b.txt", false).unwrap();
        assert_eq!(fs.read("/tmp/x/b.txt").unwrap(), b"a");

        dir.copy("/elsewhere.txt", "in/e.txt", false).unwrap();
        assert_eq!(dir.read("in/e.txt").unwrap(), b"e");

        // the target always lands inside the directory
        dir.copy("a.txt", "/abs.txt", false).unwrap();
        assert_eq!(fs.read("/tmp/x//abs.txt").unwrap(), b"a");
        assert!(fs.metadata("/abs.txt").is_err());
    }

    #[test]
    fn provider_failures_are_forwarded() {
        let fs = FS::new();
        let dir = open(&fs);
        dir.touch(["a.txt", "b.txt"], None, None).unwrap();

        let err = dir.rename("a.txt", "b.txt").unwrap_err();
        let msg = "Cannot rename because the target \"/tmp/x/b.txt\" already exists";
        assert_eq!(err.to_string(), msg);
        assert_eq!(err.source().unwrap().to_string(), msg);
        assert!(matches!(err, Error::Operation(_)));

        let err = dir.copy("missing", "c", false).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to copy \"/tmp/x/missing\" because file does not exist"
        );
    }

    #[test]
    fn operations_chain() {
        let fs = FS::new();
        let dir = open(&fs);
        dir.mkdir(["m", "n"], 0o700)
            .unwrap()
            .touch("m/f", None, None)
            .unwrap()
            .chmod("m", 0o640, 0o040, true)
            .unwrap()
            .chown(vec!["m", "n"], 1000, false)
            .unwrap()
            .chgrp("m/f", 100, false)
            .unwrap()
            .rename("n", "o")
            .unwrap();

        assert_eq!(fs.metadata("/tmp/x/m/f").unwrap().mode(), 0o600);
        assert_eq!(fs.metadata("/tmp/x/m").unwrap().mode(), 0o600);
        assert_eq!(fs.metadata("/tmp/x/m").unwrap().uid(), 1000);
        assert_eq!(fs.metadata("/tmp/x/o").unwrap().uid(), 1000);
        assert_eq!(fs.metadata("/tmp/x/m/f").unwrap().gid(), 100);
        assert!(!dir.exists("n"));

        dir.remove(["m", "o"]).unwrap();
        assert_eq!(names(dir.iter(true)), Vec::<String>::new());
    }

    #[test]
    fn symlink_and_mirror() {
        let fs = FS::new();
        let dir = open(&fs);
        dir.write("src/a.txt", "a").unwrap();
        dir.write("dst/old.txt", "old").unwrap();
        dir.symlink("a.txt", "src/link", false).unwrap();
        assert_eq!(dir.read("src/link").unwrap(), b"a");

        dir.mirror("src", "dst", MirrorOptions::new().delete(true)).unwrap();
        assert_eq!(
            names(dir.iter(true)),
            vec!["dst", "dst/a.txt", "dst/link", "src", "src/a.txt", "src/link"]
        );
        assert_eq!(dir.read("dst/link").unwrap(), b"a");

        let entries = vec![PathBuf::from("src/a.txt")];
        dir.mirror_entries("src", "partial", entries, &MirrorOptions::new()).unwrap();
        assert!(dir.exists("partial/a.txt"));
        assert!(!dir.exists("partial/link"));
    }

    #[test]
    fn subdirectories_share_the_filesystem() {
        let fs = FS::new();
        let dir = open(&fs);
        let sub = dir.subdir("nested/deeper").unwrap();
        assert_eq!(sub.as_path(), Path::new("/tmp/x/nested/deeper"));
        assert_eq!(sub.mode(), dir.mode());

        sub.write("f", "x").unwrap();
        assert_eq!(dir.read("nested/deeper/f").unwrap(), b"x");
    }

    #[test]
    fn on_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Dir::new(tmp.path().join("uploads/")).unwrap();
        assert!(dir.as_path().is_dir());

        dir.write("a/b.txt", "hello").unwrap();
        assert_eq!(dir.read("a/b.txt").unwrap(), b"hello");

        let spooled = tmp.path().join("spooled");
        std::fs::write(&spooled, "upload").unwrap();
        let mut upload = FileUpload::new("report.pdf", &spooled, 6);
        let name = dir.write_uploaded(&mut upload, None).unwrap();
        assert!(name.ends_with(".report.pdf"));
        assert_eq!(std::fs::read(dir.as_path().join(&name)).unwrap(), b"upload");

        let mut expected = vec!["a".to_owned(), "a/b.txt".to_owned(), name];
        expected.sort();
        let mut found = names_on_disk(&dir);
        found.sort();
        assert_eq!(found, expected);

        dir.purge().unwrap();
        assert!(names_on_disk(&dir).is_empty());
        assert!(dir.as_path().is_dir());
    }

    fn names_on_disk(dir: &Dir) -> Vec<String> {
        dir.iter(true)
            .into_iter()
            .map(|info| info.unwrap().relative_path().to_string_lossy().into_owned())
            .collect()
    }
}
