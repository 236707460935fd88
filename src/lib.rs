//! A handle on a writable directory, over a generic filesystem with disk and in memory
//! implementations.
//!
//! Code that keeps files in a directory (uploads, caches, generated assets) usually repeats the
//! same chores: make sure the directory exists and is writable, write files creating parents on
//! the way, store uploads under names that never collide, list and purge the tree. [`Dir`] does
//! those chores for one directory and forwards the usual filesystem operations (copy, mkdir,
//! touch, remove, chmod, chown, chgrp, rename, symlink, mirror) with paths resolved inside it.
//!
//! Everything is generic over [`GenFS`], a trait of primitive filesystem operations. Production
//! code uses [`disk::FS`], a zero cost wrapper around [`std::fs`], which is what [`Dir::new`]
//! does. Tests can use [`mem::FS`], an in memory filesystem where errors can be injected into
//! specific operations, to exercise failure paths that are hard to reproduce on a real machine.
//!
//! The filesystem implementations assume a Unix-like system.
//!
//! # Example
//!
//! ```
//! use fsdir::{DirOptions, FileUpload, GenFS};
//!
//! let fs = fsdir::mem::FS::new();
//! let dir = DirOptions::with_fs(fs.clone()).open("/srv/uploads").unwrap();
//!
//! fs.create_dir_all("/tmp", 0o777).unwrap();
//! fs.write("/tmp/spool1", b"%PDF").unwrap();
//! let mut upload = FileUpload::new("Annual report.pdf", "/tmp/spool1", 4);
//!
//! let name = dir.write_uploaded(&mut upload, None).unwrap();
//! assert!(name.ends_with(".Annual-report.pdf"));
//! assert_eq!(dir.read(&name).unwrap(), b"%PDF");
//! ```
//!
//! [`Dir`]: dir/struct.Dir.html
//! [`Dir::new`]: dir/struct.Dir.html#method.new
//! [`GenFS`]: trait.GenFS.html
//! [`disk::FS`]: disk/struct.FS.html
//! [`mem::FS`]: mem/struct.FS.html
//! [`std::fs`]: https://doc.rust-lang.org/std/fs/

mod fs;
pub use fs::*;

pub mod disk;
pub mod mem;
pub mod errors;
pub mod path_parts;

pub mod ops;
pub mod finder;
pub mod upload;
pub mod dir;
pub mod error;

pub use dir::{Dir, DirOptions};
pub use error::{Error, Result};
pub use finder::{FileInfo, Finder};
pub use ops::{Filesystem, MirrorOptions};
pub use upload::{FileUpload, UploadedFile};
