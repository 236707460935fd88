use parking_lot::Mutex;

use std::collections::VecDeque;
use std::fmt;
use std::io::{Error, Result};
use std::sync::Arc;

/// The in memory [`FS`] is about to call a primitive that can fail.
///
/// [`FS`]: struct.FS.html
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum At {
    /// The next call will be [`metadata`].
    ///
    /// [`metadata`]: ../trait.GenFS.html#tymethod.metadata
    Metadata,
    /// The next call will be [`symlink_metadata`].
    ///
    /// [`symlink_metadata`]: ../trait.GenFS.html#tymethod.symlink_metadata
    SymlinkMetadata,
    /// The next call will be [`read_dir`].
    ///
    /// [`read_dir`]: ../trait.GenFS.html#tymethod.read_dir
    ReadDir,
    /// The next call will be [`DirEntry::metadata`].
    ///
    /// [`DirEntry::metadata`]: ../trait.DirEntry.html#tymethod.metadata
    DirEntryMetadata,
    /// The next call will be [`create_dir`].
    ///
    /// [`create_dir`]: ../trait.GenFS.html#tymethod.create_dir
    CreateDir,
    /// The next call will be [`create_dir_all`].
    ///
    /// [`create_dir_all`]: ../trait.GenFS.html#tymethod.create_dir_all
    CreateDirAll,
    /// The next call will be [`remove_file`].
    ///
    /// [`remove_file`]: ../trait.GenFS.html#tymethod.remove_file
    RemoveFile,
    /// The next call will be [`remove_dir`].
    ///
    /// [`remove_dir`]: ../trait.GenFS.html#tymethod.remove_dir
    RemoveDir,
    /// The next call will be [`rename`].
    ///
    /// [`rename`]: ../trait.GenFS.html#tymethod.rename
    Rename,
    /// The next call will be [`copy`].
    ///
    /// [`copy`]: ../trait.GenFS.html#tymethod.copy
    Copy,
    /// The next call will be [`read`].
    ///
    /// [`read`]: ../trait.GenFS.html#tymethod.read
    Read,
    /// The next call will be [`write`].
    ///
    /// [`write`]: ../trait.GenFS.html#tymethod.write
    Write,
    /// The next call will be [`set_mode`].
    ///
    /// [`set_mode`]: ../trait.GenFS.html#tymethod.set_mode
    SetMode,
    /// The next call will be [`set_times`].
    ///
    /// [`set_times`]: ../trait.GenFS.html#tymethod.set_times
    SetTimes,
    /// The next call will be [`chown`].
    ///
    /// [`chown`]: ../trait.GenFS.html#tymethod.chown
    Chown,
    /// The next call will be [`symlink`].
    ///
    /// [`symlink`]: ../trait.GenFS.html#tymethod.symlink
    Symlink,
    /// The next call will be [`read_link`].
    ///
    /// [`read_link`]: ../trait.GenFS.html#tymethod.read_link
    ReadLink,
}

/// A closure in an error injection sequence.
///
/// It is called with the primitive about to run; returning `Some` consumes the closure and makes
/// the primitive return that result instead of running.
pub type Injector = Box<dyn Fn(At) -> Option<Result<()>> + Send>;

/// Returns an [`Injector`] that fails the first call of `at` with the error built by `err`.
///
/// # Example
///
/// ```
/// use fsdir::*;
/// use fsdir::errors::EACCES;
/// use fsdir::mem::{fail_at, At, FS};
///
/// let fs = FS::new();
/// fs.push_sequence(vec![fail_at(At::Write, EACCES)]);
///
/// assert!(fs.write("/f", b"nope").is_err());
/// assert!(fs.write("/f", b"yes").is_ok());
/// ```
///
/// [`Injector`]: type.Injector.html
pub fn fail_at(at: At, err: fn() -> Error) -> Injector {
    Box::new(move |k: At| -> Option<Result<()>> {
        if k == at {
            return Some(Err(err()));
        }
        None
    })
}

#[derive(Clone, Default)]
pub(crate) struct ResultSeq(Arc<Mutex<VecDeque<Injector>>>);

impl ResultSeq {
    // maybe_seq calls the front sequence closure if it exists and, if that closure returned
    // something, pops the front and returns that something.
    pub(crate) fn maybe_seq(&self, at: At) -> Result<()> {
        let mut seq = self.0.lock();
        match seq.front().and_then(|inject| inject(at)) {
            Some(res) => {
                seq.pop_front();
                res
            }
            None => Ok(()),
        }
    }

    pub(crate) fn push(&self, seq: Vec<Injector>) {
        self.0.lock().extend(seq)
    }

    pub(crate) fn clear(&self) {
        self.0.lock().clear()
    }
}

impl fmt::Debug for ResultSeq {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ResultSeq").field("pending", &self.0.lock().len()).finish()
    }
}
