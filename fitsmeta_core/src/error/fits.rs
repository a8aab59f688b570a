//! FITS structure error types

use super::ErrorKind;
use thiserror::Error;

/// Errors raised while reading or classifying FITS structures
#[derive(Error, Debug)]
pub enum FitsError {
    /// File is not of the kind the stage expects, or uses an unsupported feature
    #[error("Unsupported FITS type: {reason}")]
    UnsupportedType { reason: String },

    /// Input is shorter than a single FITS block
    #[error("Not a FITS file: {location} is {size} bytes, smaller than one 2880-byte block")]
    TooSmall { location: String, size: u64 },

    /// Header blocks could not be parsed
    #[error("Malformed FITS header in {location}: {message}")]
    MalformedHeader { location: String, message: String },

    /// Requested HDU is past the end of the file
    #[error("HDU {index} not found in {location}")]
    HduNotFound { index: usize, location: String },
}

impl FitsError {
    /// Create an unsupported type error
    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self::UnsupportedType {
            reason: reason.into(),
        }
    }

    /// Create a too-small error
    pub fn too_small(location: &str, size: u64) -> Self {
        Self::TooSmall {
            location: location.to_string(),
            size,
        }
    }

    /// Create a malformed header error
    pub fn malformed(location: &str, message: impl Into<String>) -> Self {
        Self::MalformedHeader {
            location: location.to_string(),
            message: message.into(),
        }
    }

    /// Create an HDU not found error
    pub fn hdu_not_found(index: usize, location: &str) -> Self {
        Self::HduNotFound {
            index,
            location: location.to_string(),
        }
    }

    pub(crate) fn error_kind(&self) -> ErrorKind {
        match self {
            Self::HduNotFound { .. } => ErrorKind::NotFound,
            _ => ErrorKind::UnsupportedType,
        }
    }
}
