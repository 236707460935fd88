//! Convenience functions and types for working with [`std::path::Path`].
//!
//! This module deliberately ignores Window's prefixes for now, the same way the rest of the crate
//! assumes a Unix-like filesystem.
//!
//! [`std::path::Path`]: https://doc.rust-lang.org/std/path/struct.Path.html

use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

const SEPARATOR: u8 = MAIN_SEPARATOR as u8;

/// A simplified version of [`std::path::Component`].
///
/// [`std::path::Component`]: https://doc.rust-lang.org/std/path/enum.Component.html
#[derive(Clone, Debug, PartialEq)]
pub enum Part {
    /// A `..` in a path.
    ParentDir,
    /// A file or directory name.
    Normal(OsString),
}

/// Splits a path into its `..` and name parts, dropping root and `.` components.
///
/// Unlike a lexical normalization, `..` parts are kept in place: whoever walks the parts decides
/// what the parent of the current position is, which matters once symlinks are involved.
///
/// # Example
///
/// ```
/// use fsdir::path_parts::{parts, Part};
///
/// let ps = parts("/a/./b/../c");
/// assert_eq!(ps, vec![Part::Normal("a".into()),
///                     Part::Normal("b".into()),
///                     Part::ParentDir,
///                     Part::Normal("c".into())]);
/// ```
pub fn parts<P: AsRef<Path>>(path: P) -> Vec<Part> {
    path.as_ref()
        .components()
        .filter_map(|comp| match comp {
            Component::ParentDir => Some(Part::ParentDir),
            Component::Normal(p) => Some(Part::Normal(p.to_os_string())),
            _ => None,
        })
        .collect()
}

/// Strips trailing path separators from `path`.
///
/// A path made only of separators keeps one, so the root stays the root.
///
/// # Example
///
/// ```
/// use fsdir::path_parts::trim_trailing;
/// use std::path::PathBuf;
///
/// assert_eq!(trim_trailing("/tmp/x//"), PathBuf::from("/tmp/x"));
/// assert_eq!(trim_trailing("/"), PathBuf::from("/"));
/// ```
pub fn trim_trailing<P: AsRef<Path>>(path: P) -> PathBuf {
    let raw = path.as_ref().as_os_str().as_bytes();
    let mut end = raw.len();
    while end > 0 && raw[end - 1] == SEPARATOR {
        end -= 1;
    }
    if end == 0 && !raw.is_empty() {
        end = 1;
    }
    PathBuf::from(OsStr::from_bytes(&raw[..end]))
}

/// Returns `base`, a separator, and `rel` concatenated.
///
/// This is plain concatenation rather than [`Path::join`]: an absolute `rel` is still placed
/// below `base`.
///
/// [`Path::join`]: https://doc.rust-lang.org/std/path/struct.Path.html#method.join
///
/// # Example
///
/// ```
/// use fsdir::path_parts::prefixed;
/// use std::path::PathBuf;
///
/// assert_eq!(prefixed("/tmp/x", "a.txt"), PathBuf::from("/tmp/x/a.txt"));
/// assert_eq!(prefixed("/", "a.txt"), PathBuf::from("/a.txt"));
/// ```
pub fn prefixed<B: AsRef<Path>, R: AsRef<Path>>(base: B, rel: R) -> PathBuf {
    let base = base.as_ref().as_os_str();
    let mut joined = OsString::with_capacity(base.len() + rel.as_ref().as_os_str().len() + 1);
    joined.push(base);
    if !ends_with_separator(base) {
        joined.push(MAIN_SEPARATOR.to_string());
    }
    joined.push(rel.as_ref());
    PathBuf::from(joined)
}

fn ends_with_separator(path: &OsStr) -> bool {
    path.as_bytes().last() == Some(&SEPARATOR)
}
