//! Error types for the relief library.

use std::path::PathBuf;
use thiserror::Error;

/// Stable error codes, in the library's canonical ordering.
///
/// The numeric values form a stable enumeration intended for foreign-function
/// bindings and wire formats; new codes are only ever appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrorCode {
    /// The operation succeeded.
    Success = 0,
    /// An argument contract was violated (e.g. a lone lock hook).
    BadAddress,
    /// Unsupported or missing file extension.
    BadExtension,
    /// Malformed tile or map data.
    BadFormat,
    /// Unknown projection specification.
    BadProjection,
    /// Malformed JSON metadata.
    BadJson,
    /// An input is outside the supported domain.
    DomainError,
    /// An internal invariant was violated.
    LibraryError,
    /// The stack lock could not be acquired.
    LockError,
    /// An allocation failed.
    MemoryError,
    /// A file was not found.
    PathError,
    /// The stack lock could not be released.
    UnlockError,
}

/// Errors that can occur when working with elevation data.
#[derive(Error, Debug)]
pub enum Error {
    /// An argument contract was violated.
    #[error("bad address: {0}")]
    BadAddress(&'static str),

    /// The file extension is missing or not a supported tile format.
    #[error("unsupported file extension: {path}")]
    BadExtension { path: PathBuf },

    /// The file content does not decode as the expected tile format.
    #[error("bad format: {0}")]
    BadFormat(String),

    /// The projection name does not match the supported grammar.
    #[error("bad projection: `{0}`")]
    BadProjection(String),

    /// An input parameter is outside its validity range.
    #[error("domain error: {0}")]
    Domain(String),

    /// An internal invariant was violated; this is a library bug.
    #[error("library error: {0}")]
    Library(String),

    /// The stack lock could not be acquired.
    #[error("could not acquire the stack lock")]
    Lock,

    /// The stack lock could not be released. The stack is left in a
    /// poisoned state; no recovery is attempted.
    #[error("could not release the stack lock")]
    Unlock,

    /// The requested tile or file was not found.
    #[error("missing elevation data: {path}")]
    Path { path: PathBuf },

    /// IO error when reading files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Map this error onto the stable [`ErrorCode`] enumeration.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::BadAddress(_) => ErrorCode::BadAddress,
            Error::BadExtension { .. } => ErrorCode::BadExtension,
            Error::BadFormat(_) => ErrorCode::BadFormat,
            Error::BadProjection(_) => ErrorCode::BadProjection,
            Error::Domain(_) => ErrorCode::DomainError,
            Error::Library(_) => ErrorCode::LibraryError,
            Error::Lock => ErrorCode::LockError,
            Error::Unlock => ErrorCode::UnlockError,
            Error::Path { .. } => ErrorCode::PathError,
            Error::Io(_) => ErrorCode::PathError,
        }
    }
}

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::BadAddress("inconsistent lock and unlock hooks");
        assert!(err.to_string().contains("lock"));

        let err = Error::Path {
            path: PathBuf::from("ASTGTM2_N45E003_dem.tif"),
        };
        assert!(err.to_string().contains("ASTGTM2_N45E003_dem.tif"));

        let err = Error::Domain("latitude 95 exceeds 89".into());
        assert!(err.to_string().contains("95"));
    }

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(ErrorCode::Success as i32, 0);
        assert_eq!(ErrorCode::BadAddress as i32, 1);
        assert_eq!(ErrorCode::BadJson as i32, 5);
        assert_eq!(ErrorCode::DomainError as i32, 6);
        assert_eq!(ErrorCode::UnlockError as i32, 11);
    }

    #[test]
    fn test_code_mapping() {
        assert_eq!(Error::Lock.code(), ErrorCode::LockError);
        assert_eq!(Error::Unlock.code(), ErrorCode::UnlockError);
        assert_eq!(
            Error::Path {
                path: PathBuf::new()
            }
            .code(),
            ErrorCode::PathError
        );
        assert_eq!(
            Error::BadProjection("Mercator".into()).code(),
            ErrorCode::BadProjection
        );
    }
}
