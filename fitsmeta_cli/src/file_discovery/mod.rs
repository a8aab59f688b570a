//! Finding FITS files below an input directory
//!
//! Files are matched case-insensitively against include and exclude globs.
//! Without explicit includes the FITS extensions (`fits`, `fit`, `fts`) are
//! used.

mod filter;
mod walker;

pub use filter::ScanFilter;
pub use walker::{FitsScan, ScanOptions, extensions_to_patterns};

use std::path::PathBuf;

/// Result of file discovery
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Path to the discovered file
    pub path: PathBuf,
    /// Size of the file in bytes
    pub size: u64,
}

/// Error type for file discovery operations
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid glob pattern: {0}")]
    InvalidPattern(String),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Result type for file discovery operations
pub type Result<T> = std::result::Result<T, DiscoveryError>;
