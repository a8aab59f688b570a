//! Error types for the FITS metadata pipeline
//!
//! Errors are organized into categories mirroring where they originate. Every
//! error also maps onto an [`ErrorKind`], which carries the numeric code used
//! as a process exit status and the skip/abort disposition a directory scan
//! applies to it.

use thiserror::Error;

pub mod database;
pub mod fits;
pub mod io;
pub mod validation;

pub use self::database::DatabaseError;
pub use self::fits::FitsError;
pub use self::io::{IoError, IoErrorKind, Location};
pub use self::validation::ValidationError;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the pipeline core
///
/// Errors are categorized into four main types:
/// - I/O errors: local files, object-store handles, output streams
/// - FITS errors: the input is not the kind of FITS file a stage expects
/// - Validation errors: values, datatypes, axes and configuration
/// - Database errors: connecting to or executing against the database
#[derive(Error, Debug)]
pub enum Error {
    /// I/O related errors
    #[error(transparent)]
    Io(#[from] IoError),

    /// FITS structure errors
    #[error(transparent)]
    Fits(#[from] FitsError),

    /// Validation related errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Database errors
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Kind of processing failure, independent of where it was raised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Not the expected kind of FITS file, or too small to be FITS
    UnsupportedType,
    /// A value cannot be coerced or a required value is missing
    BadValue,
    /// Unknown datatype label
    BadType,
    /// WCS axes cannot be mapped onto RA/DEC
    BadAxes,
    /// File, object-store or database I/O failed
    Io,
    /// Remote object or HDU does not exist
    NotFound,
}

/// What a directory scan does after an input fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Warn and continue with the next input
    Skip,
    /// Abort this input with a non-zero status
    Abort,
}

impl ErrorKind {
    /// Exit code reported when a pipeline aborts with this kind
    pub fn code(self) -> i32 {
        match self {
            Self::UnsupportedType => 40,
            Self::BadValue => 41,
            Self::BadType => 42,
            Self::BadAxes => 43,
            Self::Io => 44,
            Self::NotFound => 45,
        }
    }

    /// Short label used in log lines
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnsupportedType => "unsupported-type",
            Self::BadValue => "bad-value",
            Self::BadType => "bad-type",
            Self::BadAxes => "bad-axes",
            Self::Io => "io-error",
            Self::NotFound => "not-found",
        }
    }

    pub fn disposition(self) -> Disposition {
        match self {
            Self::UnsupportedType => Disposition::Skip,
            _ => Disposition::Abort,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(err) => err.error_kind(),
            Self::Fits(err) => err.error_kind(),
            Self::Validation(err) => err.error_kind(),
            Self::Database(_) => ErrorKind::Io,
        }
    }

    /// Numeric code of this error
    pub fn code(&self) -> i32 {
        self.kind().code()
    }

    /// Whether a directory scan skips or aborts on this error
    pub fn disposition(&self) -> Disposition {
        self.kind().disposition()
    }

    /// True when the input should be skipped with a warning
    pub fn is_skippable(&self) -> bool {
        self.disposition() == Disposition::Skip
    }
}

// Conversions from external error types

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Io(IoError::from_std(source))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation(ValidationError::bad_value(format!("Invalid JSON: {err}")))
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Self::Io(IoError::other(format!("CSV output failed: {err}")))
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(DatabaseError::execute(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;
    use std::path::Path;

    #[test]
    fn test_kind_codes_are_distinct() {
        let kinds = [
            ErrorKind::UnsupportedType,
            ErrorKind::BadValue,
            ErrorKind::BadType,
            ErrorKind::BadAxes,
            ErrorKind::Io,
            ErrorKind::NotFound,
        ];
        let mut codes: Vec<i32> = kinds.iter().map(|k| k.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn test_only_unsupported_type_is_skipped() {
        let skip = Error::Fits(FitsError::unsupported("catalog file given to image source"));
        assert!(skip.is_skippable());

        let abort = Error::Validation(ValidationError::bad_axes("GLON", "GLAT"));
        assert!(!abort.is_skippable());
        assert_eq!(abort.disposition(), Disposition::Abort);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let error = Error::Io(IoError::file_not_found(Path::new("/data/missing.fits")));
        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert_eq!(error.code(), 45);
        assert!(error.to_string().contains("/data/missing.fits"));
    }

    #[test]
    fn test_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let error: Error = io_error.into();
        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert!(error.source().is_some());
    }

    #[test]
    fn test_from_json_error_is_bad_value() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: Error = json_error.into();
        assert_eq!(error.kind(), ErrorKind::BadValue);
    }

    #[test]
    fn test_database_error_is_io_kind() {
        let error = Error::Database(DatabaseError::connect("refused"));
        assert_eq!(error.kind(), ErrorKind::Io);
        assert!(error.to_string().contains("refused"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
