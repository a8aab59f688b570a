//! Glob filtering of scanned paths
//!
//! Archive trees mix `mosaic.fits` and `MOSAIC.FITS`, so every pattern
//! matches case-insensitively.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::Path;

use super::{DiscoveryError, Result};

fn compile(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| DiscoveryError::InvalidPattern(format!("{pattern}: {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map(Some)
        .map_err(|e| DiscoveryError::InvalidPattern(e.to_string()))
}

/// Decides which walked files a scan hands to the pipeline
#[derive(Debug)]
pub struct ScanFilter {
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
}

impl ScanFilter {
    /// An empty include list accepts every path not excluded
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    /// Exclusion wins over inclusion
    pub fn accepts(&self, path: &Path) -> bool {
        if self.exclude.as_ref().is_some_and(|set| set.is_match(path)) {
            return false;
        }
        self.include.as_ref().is_none_or(|set| set.is_match(path))
    }
}
