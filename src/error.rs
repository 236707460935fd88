//! The error type of [`Dir`] operations.
//!
//! Every failing [`Dir`] operation, other than [`read`], reports an [`Error`]. Failures of the
//! underlying operations provider come through as [`Error::Operation`] with the provider's message
//! intact.
//!
//! [`Dir`]: ../dir/struct.Dir.html
//! [`read`]: ../dir/struct.Dir.html#method.read
//! [`Error`]: enum.Error.html
//! [`Error::Operation`]: enum.Error.html#variant.Operation

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::ops;

/// A failed directory operation.
#[derive(Debug, Error)]
pub enum Error {
    /// The directory could not be created or made writable.
    #[error("Please make directory '{}' writable, it cannot be done automatically", .path.display())]
    NotWritable {
        path: PathBuf,
        #[source]
        source: ops::Error,
    },

    /// A filesystem operation failed.
    #[error("{0}")]
    Operation(#[from] ops::Error),

    /// Writing a file failed.
    #[error("Cannot write to file '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The upload did not arrive intact.
    #[error("Cannot save corrupted file.")]
    CorruptedUpload,

    /// Moving an upload into the directory failed.
    #[error("Cannot save uploaded file to '{}'", .path.display())]
    Upload {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Deleting an entry while purging failed.
    #[error("Cannot delete {kind} {}", .path.display())]
    Delete {
        kind: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Listing the directory failed.
    #[error("Cannot list directory '{}'", .path.display())]
    Find {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A find mask is not a valid glob pattern.
    #[error("invalid mask: {0}")]
    Mask(#[from] glob::PatternError),
}

/// A specialized `Result` for directory operations.
pub type Result<T> = std::result::Result<T, Error>;
