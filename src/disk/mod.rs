//! A zero cost wrapper around [`std::fs`].
//!
//! The [`FS`] struct is an empty struct. All methods on it use `std::fs` functions (and the
//! `std::os::unix::fs` extensions for modes, ownership and symlinks). The intent of this module is
//! to use `fsdir::disk::FS` in production, which is what [`Dir::new`] does, and to use
//! [`mem::FS`] in tests.
//!
//! [`std::fs`]: https://doc.rust-lang.org/std/fs/
//! [`FS`]: struct.FS.html
//! [`Dir::new`]: ../dir/struct.Dir.html#method.new
//! [`mem::FS`]: ../mem/struct.FS.html
//!
//! # Examples
//!
//! ```
//! use fsdir::*;
//!
//! let fs = fsdir::disk::FS;
//!
//! let meta = fs.metadata("/").unwrap();
//! assert!(meta.is_dir());
//! ```

use std::ffi::OsString;
use std::fs as rs_fs;
use std::fs::FileTimes;
use std::io::Result;
use std::os::unix::fs::{DirBuilderExt, MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::fs;

/// Entries returned by the [`ReadDir`] iterator.
///
/// This struct is a single element tuple containing a [`std::fs::DirEntry`].
///
/// [`ReadDir`]: struct.ReadDir.html
/// [`std::fs::DirEntry`]: https://doc.rust-lang.org/std/fs/struct.DirEntry.html
#[derive(Debug)]
pub struct DirEntry(rs_fs::DirEntry);

impl fs::DirEntry for DirEntry {
    type Metadata = Metadata;

    fn path(&self) -> PathBuf {
        self.0.path()
    }
    fn file_name(&self) -> OsString {
        self.0.file_name()
    }
    fn metadata(&self) -> Result<Self::Metadata> {
        self.0.metadata().map(Metadata)
    }
}

/// Metadata information about a file.
///
/// This structure, a single element tuple containing a [`std::fs::Metadata`], is returned from
/// the [`metadata`] or [`symlink_metadata`] methods and represents known metadata information
/// about a file at the instant in time this structure is instantiated.
///
/// [`std::fs::Metadata`]: https://doc.rust-lang.org/std/fs/struct.Metadata.html
/// [`metadata`]: ../trait.GenFS.html#tymethod.metadata
/// [`symlink_metadata`]: ../trait.GenFS.html#tymethod.symlink_metadata
#[derive(Clone, Debug)]
pub struct Metadata(rs_fs::Metadata);

impl fs::Metadata for Metadata {
    fn is_dir(&self) -> bool {
        self.0.is_dir()
    }
    fn is_file(&self) -> bool {
        self.0.is_file()
    }
    fn is_symlink(&self) -> bool {
        self.0.file_type().is_symlink()
    }
    fn len(&self) -> u64 {
        self.0.len()
    }
    fn mode(&self) -> u32 {
        self.0.permissions().mode() & 0o7777
    }
    fn uid(&self) -> u32 {
        self.0.uid()
    }
    fn gid(&self) -> u32 {
        self.0.gid()
    }
    fn modified(&self) -> Result<SystemTime> {
        self.0.modified()
    }
    fn accessed(&self) -> Result<SystemTime> {
        self.0.accessed()
    }
}

/// Iterator over entries in a directory.
///
/// This struct is a single element tuple containing a [`std::fs::ReadDir`].
///
/// [`std::fs::ReadDir`]: https://doc.rust-lang.org/std/fs/struct.ReadDir.html
#[derive(Debug)]
pub struct ReadDir(rs_fs::ReadDir);

impl Iterator for ReadDir {
    type Item = Result<DirEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|res_dirent| res_dirent.map(DirEntry))
    }
}

/// An empty struct that satisfies [`fsdir::GenFS`] by calling [`std::fs`] functions.
///
/// Because this is an empty struct, it is inherently thread safe and copyable.
///
/// [`fsdir::GenFS`]: ../trait.GenFS.html
/// [`std::fs`]: https://doc.rust-lang.org/std/fs/
#[derive(Copy, Clone, Debug, Default)]
pub struct FS;

impl fs::GenFS for FS {
    type DirEntry = DirEntry;
    type Metadata = Metadata;
    type ReadDir = ReadDir;

    fn metadata<P: AsRef<Path>>(&self, path: P) -> Result<Self::Metadata> {
        rs_fs::metadata(path).map(Metadata)
    }
    fn symlink_metadata<P: AsRef<Path>>(&self, path: P) -> Result<Self::Metadata> {
        rs_fs::symlink_metadata(path).map(Metadata)
    }
    fn read_dir<P: AsRef<Path>>(&self, path: P) -> Result<Self::ReadDir> {
        rs_fs::read_dir(path).map(ReadDir)
    }
    fn create_dir<P: AsRef<Path>>(&self, path: P, mode: u32) -> Result<()> {
        rs_fs::DirBuilder::new().mode(mode).create(path)
    }
    fn create_dir_all<P: AsRef<Path>>(&self, path: P, mode: u32) -> Result<()> {
        rs_fs::DirBuilder::new().mode(mode).recursive(true).create(path)
    }
    fn remove_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        rs_fs::remove_file(path)
    }
    fn remove_dir<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        rs_fs::remove_dir(path)
    }
    fn rename<P: AsRef<Path>, Q: AsRef<Path>>(&self, from: P, to: Q) -> Result<()> {
        rs_fs::rename(from, to)
    }
    fn copy<P: AsRef<Path>, Q: AsRef<Path>>(&self, from: P, to: Q) -> Result<u64> {
        rs_fs::copy(from, to)
    }
    fn read<P: AsRef<Path>>(&self, path: P) -> Result<Vec<u8>> {
        rs_fs::read(path)
    }
    fn write<P: AsRef<Path>>(&self, path: P, contents: &[u8]) -> Result<()> {
        rs_fs::write(path, contents)
    }
    fn set_mode<P: AsRef<Path>>(&self, path: P, mode: u32) -> Result<()> {
        rs_fs::set_permissions(path, rs_fs::Permissions::from_mode(mode))
    }
    fn set_times<P: AsRef<Path>>(
        &self,
        path: P,
        accessed: SystemTime,
        modified: SystemTime,
    ) -> Result<()> {
        // futimens only needs ownership or write access to the file, not a writable descriptor,
        // which lets this work on directories as well.
        let times = FileTimes::new().set_accessed(accessed).set_modified(modified);
        rs_fs::File::open(path)?.set_times(times)
    }
    fn chown<P: AsRef<Path>>(&self, path: P, uid: Option<u32>, gid: Option<u32>) -> Result<()> {
        std::os::unix::fs::lchown(path, uid, gid)
    }
    fn symlink<P: AsRef<Path>, Q: AsRef<Path>>(&self, original: P, link: Q) -> Result<()> {
        std::os::unix::fs::symlink(original, link)
    }
    fn read_link<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf> {
        rs_fs::read_link(path)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fs::{DirEntry as DirEntryT, GenFS, Metadata as MetadataT};

    #[test]
    fn create_write_read() {
        let tmp = tempfile::tempdir().unwrap();
        let fs = FS;

        let nested = tmp.path().join("a/b/c");
        fs.create_dir_all(&nested, 0o755).unwrap();
        assert!(fs.metadata(&nested).unwrap().is_dir());

        let file = nested.join("f.txt");
        fs.write(&file, b"hello").unwrap();
        assert_eq!(fs.read(&file).unwrap(), b"hello");
        assert_eq!(fs.metadata(&file).unwrap().len(), 5);

        fs.set_mode(&file, 0o640).unwrap();
        assert_eq!(fs.metadata(&file).unwrap().mode(), 0o640);
    }

    #[test]
    fn symlinks_are_not_followed_by_symlink_metadata() {
        let tmp = tempfile::tempdir().unwrap();
        let fs = FS;

        let target = tmp.path().join("target");
        let link = tmp.path().join("link");
        fs.write(&target, b"x").unwrap();
        fs.symlink(&target, &link).unwrap();

        assert!(fs.symlink_metadata(&link).unwrap().is_symlink());
        assert!(fs.metadata(&link).unwrap().is_file());
        assert_eq!(fs.read_link(&link).unwrap(), target);

        let names: Vec<_> = fs.read_dir(tmp.path())
            .unwrap()
            .map(|ent| ent.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 2);
    }
}
