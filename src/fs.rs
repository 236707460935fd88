use std::ffi::OsString;
use std::fmt::Debug;
use std::io::Result;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Entries returned by the [`ReadDir`] iterator of a [`GenFS`].
///
/// An instance of `DirEntry` represents an entry inside of a directory on a filesystem. Each entry
/// can be inspected via methods to learn about the full path or possibly other metadata.
///
/// [`ReadDir`]: trait.GenFS.html#associatedtype.ReadDir
/// [`GenFS`]: trait.GenFS.html
pub trait DirEntry: Debug {
    /// The `Metadata` type in the same module implementing this trait.
    type Metadata: Metadata;

    /// Returns the full path to the file that this entry represents.
    ///
    /// The full path is created by joining the original path passed to `read_dir` with the
    /// filename of this entry.
    fn path(&self) -> PathBuf;

    /// Returns the bare file name of this directory entry without any other leading path
    /// component.
    fn file_name(&self) -> OsString;

    /// Returns the metadata for the file that this entry points at.
    ///
    /// This function does not traverse symlinks: if this entry is a symlink, the metadata is that
    /// of the link itself.
    fn metadata(&self) -> Result<Self::Metadata>;
}

/// Metadata information about a file.
///
/// This structure is returned from the [`metadata`] or [`symlink_metadata`] methods and
/// represents known metadata about a file such as its permissions, size, and modification times.
///
/// [`metadata`]: trait.GenFS.html#tymethod.metadata
/// [`symlink_metadata`]: trait.GenFS.html#tymethod.symlink_metadata
pub trait Metadata: Clone + Debug {
    /// Returns whether this metadata is for a directory.
    fn is_dir(&self) -> bool;

    /// Returns whether this metadata is for a regular file.
    fn is_file(&self) -> bool;

    /// Returns whether this metadata is for a symbolic link.
    ///
    /// This can only be true for metadata obtained without following symlinks.
    fn is_symlink(&self) -> bool;

    /// Returns the size of the file, in bytes, this metadata is for.
    fn len(&self) -> u64;

    /// Returns whether the file this metadata is for is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the permission bits (`0o7777`) of the file this metadata is for.
    fn mode(&self) -> u32;

    /// Returns the user ID of the owner of the file.
    fn uid(&self) -> u32;

    /// Returns the group ID of the owner of the file.
    fn gid(&self) -> u32;

    /// Returns the last modification time listed in this metadata.
    fn modified(&self) -> Result<SystemTime>;

    /// Returns the last access time of this metadata.
    fn accessed(&self) -> Result<SystemTime>;
}

/// A filesystem of primitive operations.
///
/// `GenFS` is the seam every higher level type in this crate is generic over. The methods mirror
/// the free functions of [`std::fs`] (plus the Unix extensions this crate needs) so that
/// [`disk::FS`] can forward to them directly, while [`mem::FS`] provides the same behavior in
/// memory for tests.
///
/// Implementations are expected to be cheap to clone; clones refer to the same filesystem.
///
/// [`std::fs`]: https://doc.rust-lang.org/std/fs/
/// [`disk::FS`]: disk/struct.FS.html
/// [`mem::FS`]: mem/struct.FS.html
pub trait GenFS: Clone + Debug + Send + Sync {
    /// The `DirEntry` type in the same module implementing this trait.
    type DirEntry: DirEntry<Metadata = Self::Metadata>;
    /// The `Metadata` type in the same module implementing this trait.
    type Metadata: Metadata;
    /// The `ReadDir` type in the same module implementing this trait.
    type ReadDir: Iterator<Item = Result<Self::DirEntry>>;

    /// Given a path, query the file system to get information about a file, directory, etc.
    ///
    /// This function will traverse symbolic links to query information about the destination
    /// file.
    ///
    /// # Errors
    ///
    /// This function will return an error if the user lacks permissions to perform `metadata`
    /// call on `path` or if `path` does not exist.
    fn metadata<P: AsRef<Path>>(&self, path: P) -> Result<Self::Metadata>;

    /// Query the metadata about a file without following symlinks.
    fn symlink_metadata<P: AsRef<Path>>(&self, path: P) -> Result<Self::Metadata>;

    /// Returns an iterator over the entries within a directory.
    ///
    /// The iterator will yield instances of `io::Result<DirEntry>`. New errors may be encountered
    /// after an iterator is initially constructed. The order of the entries is unspecified.
    fn read_dir<P: AsRef<Path>>(&self, path: P) -> Result<Self::ReadDir>;

    /// Creates a new, empty directory at the provided path with the given permission bits.
    ///
    /// # Errors
    ///
    /// This function will return an error if the parent of `path` does not exist or if `path`
    /// already exists.
    fn create_dir<P: AsRef<Path>>(&self, path: P, mode: u32) -> Result<()>;

    /// Recursively create a directory and all of its parent components if they are missing,
    /// giving every created directory the permission bits `mode`.
    ///
    /// Creating a directory that already exists is not an error.
    fn create_dir_all<P: AsRef<Path>>(&self, path: P, mode: u32) -> Result<()>;

    /// Removes a file or symlink from the filesystem.
    fn remove_file<P: AsRef<Path>>(&self, path: P) -> Result<()>;

    /// Removes an existing, empty directory.
    fn remove_dir<P: AsRef<Path>>(&self, path: P) -> Result<()>;

    /// Rename a file or directory to a new name, replacing the original file if `to` already
    /// exists.
    fn rename<P: AsRef<Path>, Q: AsRef<Path>>(&self, from: P, to: Q) -> Result<()>;

    /// Copies the contents of one file to another. This function will also copy the permission
    /// bits of the original file to the destination file.
    ///
    /// On success, the total number of bytes copied is returned.
    fn copy<P: AsRef<Path>, Q: AsRef<Path>>(&self, from: P, to: Q) -> Result<u64>;

    /// Read the entire contents of a file into a bytes vector.
    fn read<P: AsRef<Path>>(&self, path: P) -> Result<Vec<u8>>;

    /// Write a slice as the entire contents of a file, creating it if it does not exist and
    /// truncating it if it does.
    fn write<P: AsRef<Path>>(&self, path: P, contents: &[u8]) -> Result<()>;

    /// Changes the permission bits of the file or directory at `path`.
    fn set_mode<P: AsRef<Path>>(&self, path: P, mode: u32) -> Result<()>;

    /// Changes the access and modification times of the file or directory at `path`.
    fn set_times<P: AsRef<Path>>(&self, path: P, accessed: SystemTime, modified: SystemTime)
        -> Result<()>;

    /// Changes the owner and group of `path`. A `None` leaves the respective ID unchanged.
    ///
    /// If `path` is a symlink, the link itself is changed rather than its destination.
    fn chown<P: AsRef<Path>>(&self, path: P, uid: Option<u32>, gid: Option<u32>) -> Result<()>;

    /// Creates a new symbolic link at `link` pointing to `original`.
    fn symlink<P: AsRef<Path>, Q: AsRef<Path>>(&self, original: P, link: Q) -> Result<()>;

    /// Reads a symbolic link, returning the file that the link points to.
    fn read_link<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf>;
}
