use std::io;
use std::path::Path;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Error returned by jailconf APIs.
///
/// Ownership refusals and unreadable files are normally reported through
/// [`ReconcileOutcome`](crate::ReconcileOutcome) rather than as an `Err`; the variants exist so the
/// codec and the ownership checker can be used on their own.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Input validation failure (e.g. invalid jail name, value containing a newline).
    #[error("invalid input: {context}")]
    InvalidInput { context: String },

    /// The file that was expected to exist does not.
    #[error("not found: {path}")]
    NotFound { path: String },

    /// The current process is not allowed to read, write or delete the jail file.
    #[error("permission denied for {action}: {detail}")]
    PermissionDenied {
        action: &'static str,
        detail: String,
    },

    /// Generic I/O error with context.
    #[error("io error: {context}")]
    IoError { context: String },

    /// The target exists but does not carry the managed marker as its first line.
    #[error(
        "cannot work with config file as it is not managed by Ansible (set `force` to override): {path}"
    )]
    UnmanagedFile { path: String },

    /// The file body could not be decomposed into exactly one valid section.
    ///
    /// `sample` is truncated to avoid unbounded output.
    #[error("parse error: {context}; sample={sample}")]
    ParseError { context: String, sample: String },

    /// A file that was just written does not begin with the managed marker.
    #[error("integrity failure: written file does not start with the managed marker: {path}")]
    Integrity { path: String },
}

impl Error {
    pub(crate) fn invalid_input(context: impl Into<String>) -> Self {
        Self::InvalidInput {
            context: context.into(),
        }
    }

    pub(crate) fn parse_error(context: impl Into<String>, sample: impl AsRef<str>) -> Self {
        Self::ParseError {
            context: context.into(),
            sample: truncate_for_error(sample.as_ref(), 512).into_owned(),
        }
    }

    pub(crate) fn from_io(action: &'static str, path: &Path, e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::PermissionDenied {
            return Error::PermissionDenied {
                action,
                detail: format!("{}: {e}", path.to_string_lossy()),
            };
        }
        Error::IoError {
            context: format!("{action} {}: {e}", path.to_string_lossy()),
        }
    }

    /// Like [`from_io`](Self::from_io), but a missing file becomes `Error::NotFound`.
    pub(crate) fn from_read_io(action: &'static str, path: &Path, e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::NotFound {
            return Error::NotFound {
                path: path.to_string_lossy().into_owned(),
            };
        }
        Self::from_io(action, path, e)
    }
}

fn truncate_for_error(input: &str, max_bytes: usize) -> std::borrow::Cow<'_, str> {
    if input.len() <= max_bytes {
        return std::borrow::Cow::Borrowed(input);
    }
    let mut end = max_bytes;
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    std::borrow::Cow::Owned(input[..end].to_string())
}
