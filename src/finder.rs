//! Lazy, glob based directory listings.
//!
//! A [`Finder`] describes which entries to list: the masks entries must match, whether files,
//! directories or both are wanted, and the directories to search, either one level deep
//! ([`within`]) or recursively ([`from`]). Nothing touches the filesystem until the finder is
//! iterated, and iterating it again lists the filesystem again.
//!
//! Masks are [`glob`] patterns. A mask without a `/` matches the entry's file name, a mask with a
//! `/` matches the entry's path relative to the searched directory, and a mask starting with `!`
//! excludes what it matches. `*` never matches across a `/`.
//!
//! # Example
//!
//! ```
//! use fsdir::*;
//!
//! let fs = fsdir::mem::FS::new();
//! fs.create_dir_all("/d/sub", 0o755).unwrap();
//! fs.write("/d/a.txt", b"").unwrap();
//! fs.write("/d/b.md", b"").unwrap();
//! fs.write("/d/sub/c.txt", b"").unwrap();
//!
//! let found: Vec<_> = Finder::find(fs, "*.txt")
//!     .unwrap()
//!     .from("/d")
//!     .into_iter()
//!     .map(|info| info.unwrap().relative_path().to_path_buf())
//!     .collect();
//! assert_eq!(found, vec![std::path::PathBuf::from("a.txt"), "sub/c.txt".into()]);
//! ```
//!
//! [`Finder`]: struct.Finder.html
//! [`within`]: struct.Finder.html#method.within
//! [`from`]: struct.Finder.html#method.from
//! [`glob`]: https://docs.rs/glob

use std::ffi::{OsStr, OsString};
use std::io::Result;
use std::path::{Path, PathBuf};
use std::vec;

use glob::{MatchOptions, Pattern, PatternError};

use crate::fs::{DirEntry, GenFS, Metadata};

type Parsed<T> = std::result::Result<T, PatternError>;

const MATCH: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// One or more glob masks.
///
/// Like [`Paths`], `Masks` is built through `From`, so a single mask or a list of masks can be
/// passed wherever `impl Into<Masks>` is accepted.
///
/// [`Paths`]: ../ops/struct.Paths.html
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Masks(Vec<String>);

impl Masks {
    /// Returns the masks as given.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<&str> for Masks {
    fn from(mask: &str) -> Masks {
        Masks(vec![mask.to_owned()])
    }
}

impl From<String> for Masks {
    fn from(mask: String) -> Masks {
        Masks(vec![mask])
    }
}

impl From<&String> for Masks {
    fn from(mask: &String) -> Masks {
        Masks(vec![mask.clone()])
    }
}

impl<S: AsRef<str>> From<Vec<S>> for Masks {
    fn from(masks: Vec<S>) -> Masks {
        Masks(masks.iter().map(|m| m.as_ref().to_owned()).collect())
    }
}

impl<S: AsRef<str>> From<&[S]> for Masks {
    fn from(masks: &[S]) -> Masks {
        Masks(masks.iter().map(|m| m.as_ref().to_owned()).collect())
    }
}

impl<S: AsRef<str>, const N: usize> From<[S; N]> for Masks {
    fn from(masks: [S; N]) -> Masks {
        Masks(masks.iter().map(|m| m.as_ref().to_owned()).collect())
    }
}

impl<S: AsRef<str>, const N: usize> From<&[S; N]> for Masks {
    fn from(masks: &[S; N]) -> Masks {
        Masks(masks.iter().map(|m| m.as_ref().to_owned()).collect())
    }
}

#[derive(Clone, Debug)]
struct Mask {
    pattern: Pattern,
    by_path: bool,
}

impl Mask {
    fn new(mask: &str) -> Parsed<Mask> {
        Ok(Mask {
            pattern: Pattern::new(mask.trim_start_matches('/'))?,
            by_path: mask.contains('/'),
        })
    }

    fn matches(&self, name: &str, relative: &str) -> bool {
        let subject = if self.by_path { relative } else { name };
        self.pattern.matches_with(subject, MATCH)
    }
}

// Filter keeps entries matching any include mask (or everything, without include masks) and no
// exclude mask.
#[derive(Clone, Debug, Default)]
struct Filter {
    include: Vec<Mask>,
    exclude: Vec<Mask>,
}

impl Filter {
    fn parse(masks: Masks) -> Parsed<Filter> {
        let mut filter = Filter::default();
        for mask in masks.0.iter() {
            match mask.strip_prefix('!') {
                Some(negated) => filter.exclude.push(Mask::new(negated)?),
                None => filter.include.push(Mask::new(mask)?),
            }
        }
        Ok(filter)
    }

    fn matches(&self, name: &str, relative: &str) -> bool {
        (self.include.is_empty() || self.include.iter().any(|m| m.matches(name, relative)))
            && !self.exclude.iter().any(|m| m.matches(name, relative))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Kind {
    Any,
    Files,
    Directories,
}

/// A directory entry found by a [`Finder`].
///
/// [`Finder`]: struct.Finder.html
#[derive(Clone, Debug)]
pub struct FileInfo<M> {
    path: PathBuf,
    relative_path: PathBuf,
    file_name: OsString,
    depth: usize,
    symlink: bool,
    metadata: M,
}

impl<M: Metadata> FileInfo<M> {
    /// Returns the full path of the entry: the searched directory joined with the relative path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path of the entry relative to the searched directory.
    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }

    /// Returns the file name of the entry.
    pub fn file_name(&self) -> &OsStr {
        &self.file_name
    }

    /// Returns how many directories below the searched directory the entry is; entries directly
    /// in it have depth 0.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the metadata of the entry.
    ///
    /// For a symlink this is the metadata of its target when the finder follows links and the
    /// target exists, and that of the link itself otherwise.
    pub fn metadata(&self) -> &M {
        &self.metadata
    }

    /// Returns whether the entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.metadata.is_dir()
    }

    /// Returns whether the entry is a regular file.
    pub fn is_file(&self) -> bool {
        self.metadata.is_file()
    }

    /// Returns whether the entry itself is a symlink.
    pub fn is_symlink(&self) -> bool {
        self.symlink
    }

    /// Returns the size of the entry in bytes.
    pub fn len(&self) -> u64 {
        self.metadata.len()
    }

    /// Returns whether the entry is empty.
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }
}

/// A description of which directory entries to list.
///
/// See the module [documentation] for how masks match.
///
/// [documentation]: index.html
#[derive(Clone, Debug)]
pub struct Finder<F> {
    fs: F,
    kind: Kind,
    filter: Filter,
    excluded: Vec<Mask>,
    roots: Vec<(PathBuf, bool)>,
    child_first: bool,
    follow_links: bool,
}

impl<F: GenFS> Finder<F> {
    fn new(fs: F, kind: Kind, filter: Filter) -> Finder<F> {
        Finder {
            fs,
            kind,
            filter,
            excluded: Vec::new(),
            roots: Vec::new(),
            child_first: false,
            follow_links: true,
        }
    }

    /// Finds every file and directory.
    pub fn all(fs: F) -> Finder<F> {
        Finder::new(fs, Kind::Any, Filter::default())
    }

    /// Finds files and directories matching `masks`.
    pub fn find<M: Into<Masks>>(fs: F, masks: M) -> Parsed<Finder<F>> {
        Ok(Finder::new(fs, Kind::Any, Filter::parse(masks.into())?))
    }

    /// Finds files matching `masks`.
    pub fn find_files<M: Into<Masks>>(fs: F, masks: M) -> Parsed<Finder<F>> {
        Ok(Finder::new(fs, Kind::Files, Filter::parse(masks.into())?))
    }

    /// Finds directories matching `masks`.
    pub fn find_directories<M: Into<Masks>>(fs: F, masks: M) -> Parsed<Finder<F>> {
        Ok(Finder::new(fs, Kind::Directories, Filter::parse(masks.into())?))
    }

    /// Searches the entries directly in `dir`.
    pub fn within<P: AsRef<Path>>(mut self, dir: P) -> Finder<F> {
        self.roots.push((dir.as_ref().to_path_buf(), false));
        self
    }

    /// Searches every entry below `dir`.
    pub fn from<P: AsRef<Path>>(mut self, dir: P) -> Finder<F> {
        self.roots.push((dir.as_ref().to_path_buf(), true));
        self
    }

    /// Lists a directory's entries before the directory itself.
    pub fn child_first(mut self) -> Finder<F> {
        self.child_first = true;
        self
    }

    /// Sets whether symlinks to directories are descended into. Defaults to true.
    pub fn follow_links(mut self, follow: bool) -> Finder<F> {
        self.follow_links = follow;
        self
    }

    /// Skips entries matching `masks`: they are neither listed nor descended into.
    pub fn exclude<M: Into<Masks>>(mut self, masks: M) -> Parsed<Finder<F>> {
        for mask in masks.into().0.iter() {
            self.excluded.push(Mask::new(mask)?);
        }
        Ok(self)
    }

    /// Returns an iterator over the entries found, listing the filesystem anew.
    pub fn iter(&self) -> Iter<F> {
        self.clone().into_iter()
    }

    fn wanted(&self, info: &FileInfo<F::Metadata>) -> bool {
        let kind = match self.kind {
            Kind::Any => true,
            Kind::Files => info.is_file(),
            Kind::Directories => info.is_dir(),
        };
        let name = info.file_name.to_string_lossy();
        kind && self.filter.matches(&name, &info.relative_path.to_string_lossy())
    }

    fn excluded(&self, name: &str, relative: &str) -> bool {
        self.excluded.iter().any(|m| m.matches(name, relative))
    }

    // list reads dir, returning its entries sorted by name.
    fn list(
        &self,
        dir: &Path,
        relative: &Path,
        depth: usize,
    ) -> Result<vec::IntoIter<FileInfo<F::Metadata>>> {
        let mut infos = Vec::new();
        for ent in self.fs.read_dir(dir)? {
            let ent = ent?;
            let file_name = ent.file_name();
            let relative_path = relative.join(&file_name);
            if self.excluded(&file_name.to_string_lossy(), &relative_path.to_string_lossy()) {
                continue;
            }

            let path = ent.path();
            let lstat = ent.metadata()?;
            let symlink = lstat.is_symlink();
            let metadata = if symlink && self.follow_links {
                self.fs.metadata(&path).unwrap_or(lstat)
            } else {
                lstat
            };
            infos.push(FileInfo {
                path,
                relative_path,
                file_name,
                depth,
                symlink,
                metadata,
            });
        }
        infos.sort_by(|l, r| l.file_name.cmp(&r.file_name));
        Ok(infos.into_iter())
    }
}

impl<F: GenFS> IntoIterator for Finder<F> {
    type Item = Result<FileInfo<F::Metadata>>;
    type IntoIter = Iter<F>;

    fn into_iter(mut self) -> Iter<F> {
        let roots = std::mem::take(&mut self.roots).into_iter();
        Iter {
            finder: self,
            roots,
            recursive: false,
            stack: Vec::new(),
        }
    }
}

impl<'a, F: GenFS> IntoIterator for &'a Finder<F> {
    type Item = Result<FileInfo<F::Metadata>>;
    type IntoIter = Iter<F>;

    fn into_iter(self) -> Iter<F> {
        self.iter()
    }
}

struct Frame<M> {
    entries: vec::IntoIter<FileInfo<M>>,
    // a directory waiting for its children to be listed first
    pending: Option<FileInfo<M>>,
}

/// Iterator over the entries a [`Finder`] finds.
///
/// Directories are read one at a time as the iteration reaches them. An error reading a
/// directory is returned in place of its entries and the iteration carries on after it.
///
/// [`Finder`]: struct.Finder.html
pub struct Iter<F: GenFS> {
    finder: Finder<F>,
    roots: vec::IntoIter<(PathBuf, bool)>,
    recursive: bool,
    stack: Vec<Frame<F::Metadata>>,
}

impl<F: GenFS> Iterator for Iter<F> {
    type Item = Result<FileInfo<F::Metadata>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let next = match self.stack.last_mut() {
                Some(frame) => frame.entries.next(),
                None => {
                    let (root, recursive) = self.roots.next()?;
                    self.recursive = recursive;
                    match self.finder.list(&root, Path::new(""), 0) {
                        Ok(entries) => self.stack.push(Frame { entries, pending: None }),
                        Err(e) => return Some(Err(e)),
                    }
                    continue;
                }
            };

            let info = match next {
                Some(info) => info,
                None => match self.stack.pop().and_then(|frame| frame.pending) {
                    Some(dir) => return Some(Ok(dir)),
                    None => continue,
                },
            };

            let descend = self.recursive
                && info.is_dir()
                && (self.finder.follow_links || !info.is_symlink());
            if !descend {
                if self.finder.wanted(&info) {
                    return Some(Ok(info));
                }
                continue;
            }

            let entries = match self.finder.list(&info.path, &info.relative_path, info.depth + 1) {
                Ok(entries) => entries,
                Err(e) => return Some(Err(e)),
            };
            let wanted = self.finder.wanted(&info);
            if self.finder.child_first {
                let pending = if wanted { Some(info) } else { None };
                self.stack.push(Frame { entries, pending });
            } else {
                self.stack.push(Frame { entries, pending: None });
                if wanted {
                    return Some(Ok(info));
                }
            }
        }
    }
}
