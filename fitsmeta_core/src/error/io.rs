//! Failures reading local files or talking to the object store

use super::ErrorKind;
use std::fmt;
use std::path::{Path, PathBuf};

/// What went wrong at the storage layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoErrorKind {
    FileNotFound,
    ObjectNotFound,
    PermissionDenied,
    /// The object store rejected or failed a request
    Remote,
    Other,
}

/// Where the failure happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Local(PathBuf),
    /// Path of an object inside the store
    Object(String),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Object(path) => f.write_str(path),
        }
    }
}

#[derive(Debug)]
pub struct IoError {
    pub kind: IoErrorKind,
    pub location: Option<Location>,
    /// Message used when there is no underlying `std::io::Error`
    pub detail: Option<String>,
    pub source: Option<std::io::Error>,
}

impl IoError {
    fn new(kind: IoErrorKind, location: Option<Location>) -> Self {
        Self {
            kind,
            location,
            detail: None,
            source: None,
        }
    }

    pub fn file_not_found(path: &Path) -> Self {
        Self::new(IoErrorKind::FileNotFound, Some(Location::Local(path.to_path_buf())))
    }

    pub fn object_not_found(remote_path: &str) -> Self {
        Self::new(IoErrorKind::ObjectNotFound, Some(Location::Object(remote_path.to_string())))
    }

    /// Object-store failure on `remote_path`
    pub fn remote(remote_path: &str, detail: impl Into<String>) -> Self {
        let mut error = Self::new(IoErrorKind::Remote, Some(Location::Object(remote_path.to_string())));
        error.detail = Some(detail.into());
        error
    }

    pub fn other(detail: impl Into<String>) -> Self {
        let mut error = Self::new(IoErrorKind::Other, None);
        error.detail = Some(detail.into());
        error
    }

    /// Classify a `std::io::Error`; attach the path with [`IoError::with_path`]
    pub fn from_std(source: std::io::Error) -> Self {
        let kind = match source.kind() {
            std::io::ErrorKind::NotFound => IoErrorKind::FileNotFound,
            std::io::ErrorKind::PermissionDenied => IoErrorKind::PermissionDenied,
            _ => IoErrorKind::Other,
        };
        let mut error = Self::new(kind, None);
        error.source = Some(source);
        error
    }

    pub fn with_path(mut self, path: &Path) -> Self {
        self.location = Some(Location::Local(path.to_path_buf()));
        self
    }

    pub(crate) fn error_kind(&self) -> ErrorKind {
        match self.kind {
            IoErrorKind::FileNotFound | IoErrorKind::ObjectNotFound => ErrorKind::NotFound,
            _ => ErrorKind::Io,
        }
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.kind {
            IoErrorKind::FileNotFound => "File not found",
            IoErrorKind::ObjectNotFound => "Remote object not found",
            IoErrorKind::PermissionDenied => "Permission denied",
            IoErrorKind::Remote => "Object store error",
            IoErrorKind::Other => "I/O error",
        };
        f.write_str(what)?;
        if let Some(location) = &self.location {
            write!(f, ": {location}")?;
        }
        match (&self.source, &self.detail) {
            (Some(source), _) if self.kind == IoErrorKind::Other => write!(f, " ({source})"),
            (None, Some(detail)) => write!(f, " ({detail})"),
            _ => Ok(()),
        }
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_file_not_found_names_the_path() {
        let error = IoError::file_not_found(Path::new("/data/img.fits"));

        assert_eq!(error.error_kind(), ErrorKind::NotFound);
        assert_eq!(error.to_string(), "File not found: /data/img.fits");
    }

    #[test]
    fn test_remote_error_names_object_and_detail() {
        let error = IoError::remote("/zone/home/jwst/a.fits", "connection reset");
        assert_eq!(error.error_kind(), ErrorKind::Io);
        assert_eq!(
            error.to_string(),
            "Object store error: /zone/home/jwst/a.fits (connection reset)"
        );
        assert_eq!(error.location, Some(Location::Object("/zone/home/jwst/a.fits".into())));
    }

    #[test]
    fn test_object_not_found_kind() {
        let error = IoError::object_not_found("/zone/home/none.fits");
        assert_eq!(error.error_kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_from_std_with_path() {
        let error = IoError::from_std(io::Error::other("disk on fire")).with_path(Path::new("/test.fits"));

        assert_eq!(error.kind, IoErrorKind::Other);
        assert_eq!(error.to_string(), "I/O error: /test.fits (disk on fire)");
        assert!(std::error::Error::source(&error).is_some());

        let missing = IoError::from_std(io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(missing.error_kind(), ErrorKind::NotFound);
    }
}
