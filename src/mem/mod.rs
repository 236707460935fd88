//! An in memory filesystem that allows error injection.
//!
//! The [`FS`] provides an in memory file system. The implementation mirrors file operations on a
//! Unix system: modes, owners and symlinks are tracked and errors are raw os errors from the
//! [`errors`] module. Modes are recorded but not enforced; every call behaves as if made by the
//! owner of every file.
//!
//! Paths are always resolved from the root; there is no working directory, so `a/b` and `/a/b`
//! name the same file.
//!
//! All API calls to FS operate under a mutex to ensure consistency, and clones of an `FS` share
//! the same tree.
//!
//! Injected errors are consumed via a FIFO queue. The calling API passes a sequence of closures
//! that will be passed which primitive a filesystem call is about to run. The sequence of closures
//! is drained as they return `Some(Result)`; if a closure returns `None`, the closure is not
//! drained from the sequence.
//!
//! # Example
//!
//! ```
//! use fsdir::*;
//! use fsdir::errors::ENOENT;
//! use fsdir::mem::{At, FS};
//! use std::ffi::OsString;
//! use std::io::Result;
//!
//! let fs = FS::new();
//! fs.create_dir_all("a/b/c", 0o700).unwrap();
//! fs.write("a/f", &[0, 1, 2, 3]).unwrap();
//!
//! let names: Vec<OsString> = fs.read_dir("a")
//!     .unwrap()
//!     .map(|ent| ent.unwrap().file_name())
//!     .collect();
//! assert_eq!(names, vec![OsString::from("b"), OsString::from("f")]);
//!
//! // push a sequence that we want to trigger failure on:
//! // a successful read followed by a failure.
//!
//! fs.push_sequence(vec![Box::new(|k: At| -> Option<Result<()>> { // successful first
//!                           if k == At::Read {
//!                               return Some(Ok(()));
//!                           }
//!                           None
//!                       }),
//!                       Box::new(|k: At| -> Option<Result<()>> { // failing second
//!                           if k == At::Read {
//!                               return Some(Err(ENOENT()));
//!                           }
//!                           None
//!                       })]);
//!
//! assert_eq!(fs.read("a/f").unwrap(), vec![0, 1, 2, 3]);
//!
//! // notice that other operations will not fail
//! assert!(fs.metadata("a/f").is_ok());
//!
//! // consume the second closure, which will error...
//! assert!(fs.read("a/f").is_err());
//!
//! // now we are back to normal
//! assert!(fs.read("a/f").is_ok());
//! ```
//!
//! [`FS`]: struct.FS.html
//! [`errors`]: ../errors/index.html

use parking_lot::Mutex;

use std::collections::{BTreeMap, VecDeque};
use std::ffi::OsString;
use std::io::Result;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use std::vec::IntoIter;

use crate::errors::*;
use crate::fs;
use crate::path_parts::{self, Part};

mod inject;

use self::inject::ResultSeq;
pub use self::inject::{fail_at, At, Injector};

/// DIRLEN is the length returned from Metadata's len() call for a directory. This is pulled from
/// the initial file size that Unix uses for a directory sector.
pub const DIRLEN: u64 = 4096;

// The number of symlinks followed while resolving one path before giving up with ELOOP, matching
// Linux.
const MAX_LINKS: usize = 40;

// Differentiates between a directory, a file and a symlink.
#[derive(Copy, Clone, Debug, PartialEq)]
enum FileType {
    Dir,
    File,
    Symlink,
}

/// Metadata information about a file.
///
/// See the module [documentation] for a comprehensive example.
///
/// [documentation]: index.html
#[derive(Clone, Debug, PartialEq)]
pub struct Metadata {
    filetype: FileType,
    length: u64,
    mode: u32,
    uid: u32,
    gid: u32,
    accessed: SystemTime,
    modified: SystemTime,
}

impl fs::Metadata for Metadata {
    fn is_dir(&self) -> bool {
        self.filetype == FileType::Dir
    }
    fn is_file(&self) -> bool {
        self.filetype == FileType::File
    }
    fn is_symlink(&self) -> bool {
        self.filetype == FileType::Symlink
    }
    fn len(&self) -> u64 {
        self.length
    }
    fn mode(&self) -> u32 {
        self.mode
    }
    fn uid(&self) -> u32 {
        self.uid
    }
    fn gid(&self) -> u32 {
        self.gid
    }
    fn modified(&self) -> Result<SystemTime> {
        Ok(self.modified)
    }
    fn accessed(&self) -> Result<SystemTime> {
        Ok(self.accessed)
    }
}

/// Entries returned by the [`ReadDir`] iterator.
///
/// [`ReadDir`]: struct.ReadDir.html
#[derive(Debug)]
pub struct DirEntry {
    dir: PathBuf,
    base: OsString,
    meta: Metadata,
    seq: ResultSeq,
}

impl fs::DirEntry for DirEntry {
    type Metadata = Metadata;

    fn path(&self) -> PathBuf {
        self.dir.join(&self.base)
    }
    fn file_name(&self) -> OsString {
        self.base.clone()
    }
    fn metadata(&self) -> Result<Self::Metadata> {
        self.seq.maybe_seq(At::DirEntryMetadata)?;
        Ok(self.meta.clone())
    }
}

/// Iterator over entries in a directory.
///
/// This is returned from the [`read_dir`] method of [`FS`]. Entries are a snapshot taken when
/// `read_dir` was called and are returned in alphabetical order.
///
/// [`read_dir`]: struct.FS.html#method.read_dir
/// [`FS`]: struct.FS.html
#[derive(Debug)]
pub struct ReadDir {
    ents: IntoIter<DirEntry>,
}

impl Iterator for ReadDir {
    type Item = Result<DirEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.ents.next().map(Ok)
    }
}

/// An in memory struct that satisfies [`fsdir::GenFS`] and allows for injectable errors.
///
/// `FS` is thread safe and cheap to clone; all clones refer to the same tree and the same
/// injection sequence.
///
/// See the module [documentation] for an example.
///
/// [`fsdir::GenFS`]: ../trait.GenFS.html
/// [documentation]: index.html
#[derive(Clone, Debug)]
pub struct FS {
    inner: Arc<Mutex<FileSystem>>,
    seq: ResultSeq,
}

impl FS {
    /// Creates an empty `FS` whose root has mode `0o775`.
    pub fn new() -> FS {
        Self::with_mode(0o775)
    }

    /// Creates an empty `FS` whose root has the given mode.
    pub fn with_mode(mode: u32) -> FS {
        FS {
            inner: Arc::new(Mutex::new(FileSystem::new(mode))),
            seq: ResultSeq::default(),
        }
    }

    /// Pushes a sequence of closures to run on future operations that return `Result`.
    ///
    /// On every filesystem call that returns `Result`, the `FS` checks the head of an internal
    /// sequence of closures. If one exists, it calls that closure with an enum signalling what
    /// call it is about to perform. With this information, the closure can return whether that
    /// operation should fail and if so, with what error.
    ///
    /// Closures in the sequence are only consumed once they return `Some` value. By returning a
    /// series of `Some` values, this sequence can trigger cascading errors during testing that
    /// normally are untestable.
    ///
    /// See the module [documentation] for an example.
    ///
    /// [documentation]: index.html
    pub fn push_sequence(&self, seq: Vec<Injector>) {
        self.seq.push(seq)
    }

    /// Clears the internal sequence of errors, if any.
    ///
    /// Future operations will proceed as normal unless more errors are injected.
    pub fn clear_sequence(&self) {
        self.seq.clear()
    }
}

impl Default for FS {
    fn default() -> Self {
        FS::new()
    }
}

impl fs::GenFS for FS {
    type DirEntry = DirEntry;
    type Metadata = Metadata;
    type ReadDir = ReadDir;

    fn metadata<P: AsRef<Path>>(&self, path: P) -> Result<Self::Metadata> {
        self.seq.maybe_seq(At::Metadata)?;
        self.inner.lock().metadata(path.as_ref(), true)
    }
    fn symlink_metadata<P: AsRef<Path>>(&self, path: P) -> Result<Self::Metadata> {
        self.seq.maybe_seq(At::SymlinkMetadata)?;
        self.inner.lock().metadata(path.as_ref(), false)
    }
    fn read_dir<P: AsRef<Path>>(&self, path: P) -> Result<Self::ReadDir> {
        self.seq.maybe_seq(At::ReadDir)?;
        self.inner.lock().read_dir(path.as_ref(), &self.seq)
    }
    fn create_dir<P: AsRef<Path>>(&self, path: P, mode: u32) -> Result<()> {
        self.seq.maybe_seq(At::CreateDir)?;
        self.inner.lock().create_dir(path.as_ref(), mode)
    }
    fn create_dir_all<P: AsRef<Path>>(&self, path: P, mode: u32) -> Result<()> {
        self.seq.maybe_seq(At::CreateDirAll)?;
        self.inner.lock().create_dir_all(path.as_ref(), mode)
    }
    fn remove_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.seq.maybe_seq(At::RemoveFile)?;
        self.inner.lock().remove_file(path.as_ref())
    }
    fn remove_dir<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.seq.maybe_seq(At::RemoveDir)?;
        self.inner.lock().remove_dir(path.as_ref())
    }
    fn rename<P: AsRef<Path>, Q: AsRef<Path>>(&self, from: P, to: Q) -> Result<()> {
        self.seq.maybe_seq(At::Rename)?;
        self.inner.lock().rename(from.as_ref(), to.as_ref())
    }
    fn copy<P: AsRef<Path>, Q: AsRef<Path>>(&self, from: P, to: Q) -> Result<u64> {
        self.seq.maybe_seq(At::Copy)?;
        self.inner.lock().copy(from.as_ref(), to.as_ref())
    }
    fn read<P: AsRef<Path>>(&self, path: P) -> Result<Vec<u8>> {
        self.seq.maybe_seq(At::Read)?;
        self.inner.lock().read(path.as_ref())
    }
    fn write<P: AsRef<Path>>(&self, path: P, contents: &[u8]) -> Result<()> {
        self.seq.maybe_seq(At::Write)?;
        self.inner.lock().write(path.as_ref(), contents.to_vec(), None)
    }
    fn set_mode<P: AsRef<Path>>(&self, path: P, mode: u32) -> Result<()> {
        self.seq.maybe_seq(At::SetMode)?;
        self.inner.lock().set_mode(path.as_ref(), mode)
    }
    fn set_times<P: AsRef<Path>>(
        &self,
        path: P,
        accessed: SystemTime,
        modified: SystemTime,
    ) -> Result<()> {
        self.seq.maybe_seq(At::SetTimes)?;
        self.inner.lock().set_times(path.as_ref(), accessed, modified)
    }
    fn chown<P: AsRef<Path>>(&self, path: P, uid: Option<u32>, gid: Option<u32>) -> Result<()> {
        self.seq.maybe_seq(At::Chown)?;
        self.inner.lock().chown(path.as_ref(), uid, gid)
    }
    fn symlink<P: AsRef<Path>, Q: AsRef<Path>>(&self, original: P, link: Q) -> Result<()> {
        self.seq.maybe_seq(At::Symlink)?;
        self.inner.lock().symlink(original.as_ref(), link.as_ref())
    }
    fn read_link<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf> {
        self.seq.maybe_seq(At::ReadLink)?;
        self.inner.lock().read_link(path.as_ref())
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Kind {
    Dir,
    File(Vec<u8>),
    Symlink(PathBuf),
}

// Node is everything known about one path in the tree.
#[derive(Clone, Debug)]
struct Node {
    kind: Kind,
    mode: u32,
    uid: u32,
    gid: u32,
    accessed: SystemTime,
    modified: SystemTime,
}

impl Node {
    fn new(kind: Kind, mode: u32) -> Node {
        let now = SystemTime::now();
        Node {
            kind,
            mode: mode & 0o7777,
            uid: 0,
            gid: 0,
            accessed: now,
            modified: now,
        }
    }

    fn is_dir(&self) -> bool {
        self.kind == Kind::Dir
    }

    fn metadata(&self) -> Metadata {
        let (filetype, length) = match self.kind {
            Kind::Dir => (FileType::Dir, DIRLEN),
            Kind::File(ref data) => (FileType::File, data.len() as u64),
            Kind::Symlink(ref target) => (FileType::Symlink, target.as_os_str().len() as u64),
        };
        Metadata {
            filetype,
            length,
            mode: self.mode,
            uid: self.uid,
            gid: self.gid,
            accessed: self.accessed,
            modified: self.modified,
        }
    }
}

// FileSystem is a flat map from absolute, symlink free paths to nodes. Paths order by component,
// so every descendant of a directory sorts directly after it.
#[derive(Debug)]
struct FileSystem {
    nodes: BTreeMap<PathBuf, Node>,
}

impl FileSystem {
    fn new(mode: u32) -> FileSystem {
        let mut nodes = BTreeMap::new();
        nodes.insert(PathBuf::from("/"), Node::new(Kind::Dir, mode));
        FileSystem { nodes }
    }

    // resolve walks path from the root, replacing every symlink along the way with its target.
    // The final part is only followed if follow is set.
    fn resolve(&self, path: &Path, follow: bool) -> Result<PathBuf> {
        let mut pending: VecDeque<Part> = path_parts::parts(path).into();
        let mut cur = PathBuf::from("/");
        let mut links = 0;
        while let Some(part) = pending.pop_front() {
            let name = match part {
                Part::ParentDir => {
                    cur.pop();
                    continue;
                }
                Part::Normal(name) => name,
            };
            let next = cur.join(&name);
            match self.nodes.get(&next) {
                Some(Node { kind: Kind::Symlink(target), .. }) if follow || !pending.is_empty() => {
                    links += 1;
                    if links > MAX_LINKS {
                        return Err(ELOOP());
                    }
                    if target.has_root() {
                        cur = PathBuf::from("/");
                    }
                    for part in path_parts::parts(target).into_iter().rev() {
                        pending.push_front(part);
                    }
                }
                Some(node) if !pending.is_empty() && !node.is_dir() => return Err(ENOTDIR()),
                _ => cur = next,
            }
        }
        Ok(cur)
    }

    fn node(&self, path: &Path) -> Result<&Node> {
        self.nodes.get(path).ok_or_else(ENOENT)
    }

    fn node_mut(&mut self, path: &Path) -> Result<&mut Node> {
        self.nodes.get_mut(path).ok_or_else(ENOENT)
    }

    // check_parent ensures the directory that would contain path exists.
    fn check_parent(&self, path: &Path) -> Result<()> {
        match path.parent() {
            None => Err(EEXIST()),
            Some(parent) => match self.nodes.get(parent) {
                None => Err(ENOENT()),
                Some(node) if !node.is_dir() => Err(ENOTDIR()),
                Some(_) => Ok(()),
            },
        }
    }

    fn descendants<'a>(&'a self, dir: &'a Path) -> impl Iterator<Item = (&'a PathBuf, &'a Node)> {
        self.nodes
            .range::<PathBuf, _>((Bound::Excluded(dir.to_path_buf()), Bound::Unbounded))
            .take_while(move |(path, _)| path.starts_with(dir))
    }

    fn metadata(&self, path: &Path, follow: bool) -> Result<Metadata> {
        let path = self.resolve(path, follow)?;
        Ok(self.node(&path)?.metadata())
    }

    fn read_dir(&self, path: &Path, seq: &ResultSeq) -> Result<ReadDir> {
        let dir = self.resolve(path, true)?;
        if !self.node(&dir)?.is_dir() {
            return Err(ENOTDIR());
        }
        let ents: Vec<DirEntry> = self.descendants(&dir)
            .filter(|(child, _)| child.parent() == Some(dir.as_path()))
            .map(|(child, node)| {
                DirEntry {
                    dir: path.to_path_buf(),
                    base: child.file_name().map(OsString::from).unwrap_or_default(),
                    meta: node.metadata(),
                    seq: seq.clone(),
                }
            })
            .collect();
        Ok(ReadDir { ents: ents.into_iter() })
    }

    fn create_dir(&mut self, path: &Path, mode: u32) -> Result<()> {
        let path = self.resolve(path, false)?;
        if self.nodes.contains_key(&path) {
            return Err(EEXIST());
        }
        self.check_parent(&path)?;
        self.nodes.insert(path, Node::new(Kind::Dir, mode));
        Ok(())
    }

    fn create_dir_all(&mut self, path: &Path, mode: u32) -> Result<()> {
        let path = self.resolve(path, true)?;
        let mut cur = PathBuf::from("/");
        for part in path_parts::parts(&path) {
            if let Part::Normal(name) = part {
                cur.push(name);
            }
            match self.nodes.get(&cur) {
                Some(node) if node.is_dir() => (),
                Some(_) if cur == path => return Err(EEXIST()),
                Some(_) => return Err(ENOTDIR()),
                None => {
                    self.nodes.insert(cur.clone(), Node::new(Kind::Dir, mode));
                }
            }
        }
        Ok(())
    }

    fn remove_file(&mut self, path: &Path) -> Result<()> {
        let path = self.resolve(path, false)?;
        if self.node(&path)?.is_dir() {
            return Err(EISDIR());
        }
        self.nodes.remove(&path);
        Ok(())
    }

    fn remove_dir(&mut self, path: &Path) -> Result<()> {
        let path = self.resolve(path, false)?;
        if !self.node(&path)?.is_dir() {
            return Err(ENOTDIR());
        }
        if path.parent().is_none() {
            return Err(EBUSY());
        }
        if self.descendants(&path).next().is_some() {
            return Err(ENOTEMPTY());
        }
        self.nodes.remove(&path);
        Ok(())
    }

    fn rename(&mut self, from: &Path, to: &Path) -> Result<()> {
        let from = self.resolve(from, false)?;
        let to = self.resolve(to, false)?;
        let from_dir = self.node(&from)?.is_dir();
        if from == to {
            return Ok(());
        }
        self.check_parent(&to)?;
        if from_dir && to.starts_with(&from) {
            return Err(EINVAL());
        }
        if let Some(existing) = self.nodes.get(&to) {
            match (from_dir, existing.is_dir()) {
                (true, true) if self.descendants(&to).next().is_some() => return Err(ENOTEMPTY()),
                (true, false) => return Err(ENOTDIR()),
                (false, true) => return Err(EISDIR()),
                _ => (),
            }
            self.nodes.remove(&to);
        }

        let moved: Vec<PathBuf> = Some(from.clone())
            .into_iter()
            .chain(self.descendants(&from).map(|(path, _)| path.clone()))
            .collect();
        for old in moved {
            let new = match old.strip_prefix(&from) {
                Ok(rel) if rel.as_os_str().is_empty() => to.clone(),
                Ok(rel) => to.join(rel),
                Err(_) => continue,
            };
            if let Some(node) = self.nodes.remove(&old) {
                self.nodes.insert(new, node);
            }
        }
        Ok(())
    }

    fn copy(&mut self, from: &Path, to: &Path) -> Result<u64> {
        let from = self.resolve(from, true)?;
        let node = self.node(&from)?;
        let data = match node.kind {
            Kind::File(ref data) => data.clone(),
            Kind::Dir => return Err(EISDIR()),
            Kind::Symlink(_) => return Err(ENOENT()),
        };
        let len = data.len() as u64;
        let mode = node.mode;
        self.write(to, data, Some(mode))?;
        Ok(len)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let path = self.resolve(path, true)?;
        match self.node(&path)?.kind {
            Kind::File(ref data) => Ok(data.clone()),
            Kind::Dir => Err(EISDIR()),
            Kind::Symlink(_) => Err(ENOENT()),
        }
    }

    // write replaces the contents of the file at path, creating it with mode (or 0o666) if it
    // does not exist. An existing file keeps its mode unless one is given.
    fn write(&mut self, path: &Path, data: Vec<u8>, mode: Option<u32>) -> Result<()> {
        let path = self.resolve(path, true)?;
        match self.nodes.get_mut(&path) {
            Some(node) => {
                if node.is_dir() {
                    return Err(EISDIR());
                }
                node.kind = Kind::File(data);
                node.modified = SystemTime::now();
                if let Some(mode) = mode {
                    node.mode = mode & 0o7777;
                }
                Ok(())
            }
            None => {
                self.check_parent(&path)?;
                self.nodes.insert(path, Node::new(Kind::File(data), mode.unwrap_or(0o666)));
                Ok(())
            }
        }
    }

    fn set_mode(&mut self, path: &Path, mode: u32) -> Result<()> {
        let path = self.resolve(path, true)?;
        self.node_mut(&path)?.mode = mode & 0o7777;
        Ok(())
    }

    fn set_times(&mut self, path: &Path, accessed: SystemTime, modified: SystemTime) -> Result<()> {
        let path = self.resolve(path, true)?;
        let node = self.node_mut(&path)?;
        node.accessed = accessed;
        node.modified = modified;
        Ok(())
    }

    fn chown(&mut self, path: &Path, uid: Option<u32>, gid: Option<u32>) -> Result<()> {
        let path = self.resolve(path, false)?;
        let node = self.node_mut(&path)?;
        if let Some(uid) = uid {
            node.uid = uid;
        }
        if let Some(gid) = gid {
            node.gid = gid;
        }
        Ok(())
    }

    fn symlink(&mut self, original: &Path, link: &Path) -> Result<()> {
        let link = self.resolve(link, false)?;
        if self.nodes.contains_key(&link) {
            return Err(EEXIST());
        }
        self.check_parent(&link)?;
        self.nodes.insert(link, Node::new(Kind::Symlink(original.to_path_buf()), 0o777));
        Ok(())
    }

    fn read_link(&self, path: &Path) -> Result<PathBuf> {
        let path = self.resolve(path, false)?;
        match self.node(&path)?.kind {
            Kind::Symlink(ref target) => Ok(target.clone()),
            _ => Err(EINVAL()),
        }
    }
}
