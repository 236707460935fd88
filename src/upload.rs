//! Files received through an upload.
//!
//! A [`Dir`] stores uploads through the [`UploadedFile`] trait: it only needs to know whether the
//! upload arrived intact, what name the client gave it, and how to move it into place.
//! [`FileUpload`] is the implementation for uploads that were spooled to a temporary file.
//!
//! [`Dir`]: ../dir/struct.Dir.html
//! [`UploadedFile`]: trait.UploadedFile.html
//! [`FileUpload`]: struct.FileUpload.html

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, trace};

use crate::fs::GenFS;

/// An uploaded file that can be moved into a directory.
pub trait UploadedFile {
    /// Returns whether the upload arrived completely and can be stored.
    fn is_ok(&self) -> bool;

    /// Returns the client supplied name reduced to characters that are safe in a file name.
    fn sanitized_name(&self) -> String;

    /// Moves the upload to `destination` on `fs`, creating missing parent directories.
    ///
    /// Once the upload is in place, failing to adjust its permissions is not an error.
    fn move_to<F: GenFS>(&mut self, fs: &F, destination: &Path) -> io::Result<()>;
}

/// Why an upload did not arrive intact.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    /// The upload exceeded the allowed size.
    #[error("the uploaded file exceeds the allowed size")]
    TooLarge,
    /// The upload was cut off.
    #[error("the file was only partially uploaded")]
    Partial,
    /// No file was sent.
    #[error("no file was uploaded")]
    NoFile,
    /// There was nowhere to spool the upload.
    #[error("missing a temporary directory")]
    NoTemporaryDirectory,
    /// Spooling the upload failed.
    #[error("failed to write the file to disk")]
    CannotWrite,
    /// The upload was stopped by an extension of the receiving server.
    #[error("an extension stopped the upload")]
    Extension,
}

/// An upload spooled to a temporary file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileUpload {
    name: String,
    path: PathBuf,
    size: u64,
    error: Option<UploadError>,
}

impl FileUpload {
    /// Creates an intact upload named `name` by the client and spooled to `path`.
    pub fn new<S: Into<String>, P: Into<PathBuf>>(name: S, path: P, size: u64) -> FileUpload {
        FileUpload {
            name: name.into(),
            path: path.into(),
            size,
            error: None,
        }
    }

    /// Creates an upload that failed with `error`.
    pub fn failed<S: Into<String>>(name: S, error: UploadError) -> FileUpload {
        FileUpload {
            name: name.into(),
            path: PathBuf::new(),
            size: 0,
            error: Some(error),
        }
    }

    /// Returns the name the client gave the upload.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns where the upload currently is: its temporary file, or where it was moved to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the size of the upload in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Returns why the upload failed, if it did.
    pub fn error(&self) -> Option<UploadError> {
        self.error
    }
}

impl UploadedFile for FileUpload {
    fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    fn sanitized_name(&self) -> String {
        sanitize(&self.name)
    }

    fn move_to<F: GenFS>(&mut self, fs: &F, destination: &Path) -> io::Result<()> {
        if let Some(err) = self.error {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, err));
        }
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs.create_dir_all(parent, 0o777)?;
        }
        trace!(from = %self.path.display(), to = %destination.display(), "moving upload");
        fs.rename(&self.path, destination)?;
        self.path = destination.to_path_buf();
        if let Err(err) = fs.set_mode(destination, 0o666) {
            debug!(path = %destination.display(), error = %err, "cannot set upload mode");
        }
        Ok(())
    }
}

/// The name [`sanitize`] falls back to when nothing of the client name survives.
///
/// [`sanitize`]: fn.sanitize.html
pub const FALLBACK_NAME: &str = "file";

/// Reduces `name` to ASCII letters, digits, `.` and `-`.
///
/// Latin letters with diacritics are folded to their base letter, every run of other characters
/// becomes a single `-`, and dots and dashes are trimmed from both ends. A name with nothing left
/// becomes [`FALLBACK_NAME`].
///
/// # Example
///
/// ```
/// use fsdir::upload::sanitize;
///
/// assert_eq!(sanitize("My Résumé (final).pdf"), "My-Resume-final-.pdf");
/// assert_eq!(sanitize("../../etc/passwd"), "etc-passwd");
/// assert_eq!(sanitize("???"), "file");
/// ```
///
/// [`FALLBACK_NAME`]: constant.FALLBACK_NAME.html
pub fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_run = false;
    for c in name.chars() {
        let folded = match fold(c) {
            Some(ascii) => ascii,
            None if c.is_ascii_alphanumeric() || c == '.' => {
                out.push(c);
                in_run = false;
                continue;
            }
            None => {
                if !in_run {
                    out.push('-');
                    in_run = true;
                }
                continue;
            }
        };
        out.push_str(folded);
        in_run = false;
    }
    let trimmed = out.trim_matches(|c| c == '.' || c == '-');
    if trimmed.is_empty() {
        return FALLBACK_NAME.to_owned();
    }
    trimmed.to_owned()
}

// fold maps a Latin letter with diacritics to its ASCII spelling.
fn fold(c: char) -> Option<&'static str> {
    let ascii = match c {
        'À'..='Å' | 'Ā' | 'Ă' | 'Ą' => "A",
        'à'..='å' | 'ā' | 'ă' | 'ą' => "a",
        'Æ' => "AE",
        'æ' => "ae",
        'Ç' | 'Ć' | 'Ĉ' | 'Ċ' | 'Č' => "C",
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => "c",
        'Ď' | 'Đ' | 'Ð' => "D",
        'ď' | 'đ' | 'ð' => "d",
        'È'..='Ë' | 'Ē' | 'Ĕ' | 'Ė' | 'Ę' | 'Ě' => "E",
        'è'..='ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => "e",
        'Ĝ' | 'Ğ' | 'Ġ' | 'Ģ' => "G",
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => "g",
        'Ĥ' | 'Ħ' => "H",
        'ĥ' | 'ħ' => "h",
        'Ì'..='Ï' | 'Ĩ' | 'Ī' | 'Ĭ' | 'Į' | 'İ' => "I",
        'ì'..='ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' | 'ı' => "i",
        'Ĵ' => "J",
        'ĵ' => "j",
        'Ķ' => "K",
        'ķ' => "k",
        'Ĺ' | 'Ļ' | 'Ľ' | 'Ŀ' | 'Ł' => "L",
        'ĺ' | 'ļ' | 'ľ' | 'ŀ' | 'ł' => "l",
        'Ñ' | 'Ń' | 'Ņ' | 'Ň' => "N",
        'ñ' | 'ń' | 'ņ' | 'ň' => "n",
        'Ò'..='Ö' | 'Ø' | 'Ō' | 'Ŏ' | 'Ő' => "O",
        'ò'..='ö' | 'ø' | 'ō' | 'ŏ' | 'ő' => "o",
        'Œ' => "OE",
        'œ' => "oe",
        'Ŕ' | 'Ŗ' | 'Ř' => "R",
        'ŕ' | 'ŗ' | 'ř' => "r",
        'Ś' | 'Ŝ' | 'Ş' | 'Š' => "S",
        'ś' | 'ŝ' | 'ş' | 'š' => "s",
        'ß' => "ss",
        'Ţ' | 'Ť' | 'Ŧ' => "T",
        'ţ' | 'ť' | 'ŧ' => "t",
        'Ù'..='Ü' | 'Ũ' | 'Ū' | 'Ŭ' | 'Ů' | 'Ű' | 'Ų' => "U",
        'ù'..='ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => "u",
        'Ŵ' => "W",
        'ŵ' => "w",
        'Ý' | 'Ŷ' | 'Ÿ' => "Y",
        'ý' | 'ÿ' | 'ŷ' => "y",
        'Ź' | 'Ż' | 'Ž' => "Z",
        'ź' | 'ż' | 'ž' => "z",
        'Þ' => "TH",
        'þ' => "th",
        _ => return None,
    };
    Some(ascii)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::errors::EACCES;
    use crate::fs::Metadata;
    use crate::mem::{fail_at, At, FS};

    #[test]
    fn sanitizing() {
        assert_eq!(sanitize("photo.JPG"), "photo.JPG");
        assert_eq!(sanitize("  spaced   out  .txt"), "spaced-out-.txt");
        assert_eq!(sanitize("ščř"), "scr");
        assert_eq!(sanitize("Žluťoučký kůň.jpg"), "Zlutoucky-kun.jpg");
        assert_eq!(sanitize("Straße.txt"), "Strasse.txt");
    }

    #[test]
    fn empty_names_fall_back() {
        assert_eq!(sanitize("..."), FALLBACK_NAME);
        assert_eq!(sanitize(""), FALLBACK_NAME);
        assert_eq!(sanitize("日本語"), FALLBACK_NAME);
    }

    #[test]
    fn move_creates_parents() {
        let fs = FS::new();
        fs.create_dir_all("/tmp", 0o777).unwrap();
        fs.write("/tmp/php123", b"data").unwrap();

        let mut upload = FileUpload::new("a b.txt", "/tmp/php123", 4);
        assert!(upload.is_ok());
        assert_eq!(upload.sanitized_name(), "a-b.txt");

        upload.move_to(&fs, Path::new("/up/loads/x.txt")).unwrap();
        assert_eq!(upload.path(), Path::new("/up/loads/x.txt"));
        assert_eq!(fs.read("/up/loads/x.txt").unwrap(), b"data");
        assert_eq!(fs.metadata("/up/loads/x.txt").unwrap().mode(), 0o666);
        assert!(fs.metadata("/tmp/php123").is_err());
    }

    #[test]
    fn mode_failures_keep_the_move() {
        let fs = FS::new();
        fs.write("/spool", b"data").unwrap();
        fs.push_sequence(vec![fail_at(At::SetMode, EACCES)]);

        let mut upload = FileUpload::new("a.txt", "/spool", 4);
        upload.move_to(&fs, Path::new("/up/a.txt")).unwrap();
        assert_eq!(upload.path(), Path::new("/up/a.txt"));
        assert_eq!(fs.read("/up/a.txt").unwrap(), b"data");
        assert!(fs.metadata("/spool").is_err());
    }

    #[test]
    fn failed_uploads_do_not_move() {
        let fs = FS::new();
        let mut upload = FileUpload::failed("a.txt", UploadError::Partial);
        assert!(!upload.is_ok());
        assert_eq!(upload.error(), Some(UploadError::Partial));

        let err = upload.move_to(&fs, Path::new("/a.txt")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert_eq!(err.to_string(), "the file was only partially uploaded");
    }
}
