//! Walks an input directory for FITS files
//!
//! Entries come back in file-name order, so a scan of the same tree always
//! feeds the pipeline in the same sequence.

use fitsmeta_core::fits::FITS_EXTENSIONS;
use std::path::Path;
use walkdir::WalkDir;

use super::{DiscoveredFile, DiscoveryError, Result, filter::ScanFilter};

/// How far and what to scan
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Globs replacing the FITS extension patterns
    pub include: Vec<String>,
    /// Globs that drop a path even when it matches an include
    pub exclude: Vec<String>,
    /// Descend below the top directory
    pub recursive: bool,
    pub follow_links: bool,
}

impl ScanOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn include(mut self, patterns: Vec<String>) -> Self {
        self.include = patterns;
        self
    }

    pub fn exclude(mut self, patterns: Vec<String>) -> Self {
        self.exclude = patterns;
        self
    }

    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }
}

/// `*.ext` glob for each extension
pub fn extensions_to_patterns(extensions: &[&str]) -> Vec<String> {
    extensions.iter().map(|ext| format!("*.{ext}")).collect()
}

/// Lazily yields the FITS files below a directory
pub struct FitsScan {
    entries: walkdir::IntoIter,
    filter: ScanFilter,
}

impl FitsScan {
    pub fn new(dir: &Path, options: &ScanOptions) -> Result<Self> {
        if !dir.is_dir() {
            return Err(DiscoveryError::NotADirectory(dir.to_path_buf()));
        }

        let include = if options.include.is_empty() {
            extensions_to_patterns(&FITS_EXTENSIONS)
        } else {
            options.include.clone()
        };
        let filter = ScanFilter::new(&include, &options.exclude)?;

        let mut walk = WalkDir::new(dir)
            .follow_links(options.follow_links)
            .sort_by_file_name();
        if !options.recursive {
            walk = walk.max_depth(1);
        }

        Ok(Self {
            entries: walk.into_iter(),
            filter,
        })
    }
}

impl Iterator for FitsScan {
    type Item = Result<DiscoveredFile>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Cannot read directory entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !self.filter.accepts(entry.path()) {
                continue;
            }
            return Some(
                entry
                    .metadata()
                    .map(|meta| DiscoveredFile {
                        path: entry.into_path(),
                        size: meta.len(),
                    })
                    .map_err(|e| DiscoveryError::Io(e.into())),
            );
        }
    }
}
