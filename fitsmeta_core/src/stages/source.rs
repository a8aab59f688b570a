//! Local FITS file sources

use crate::Result;
use crate::bundle::{FileInfo, MetadataBundle};
use crate::checksum::md5_file;
use crate::error::FitsError;
use crate::fits::{FitsReader, HduHeader, is_catalog_header, is_image_header, table};
use crate::pipeline::Stage;
use crate::storage::{LocalFile, RandomAccess};
use log::debug;
use std::path::{Path, PathBuf};

/// Which kind of HDU a source accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HduKind {
    Image,
    Catalog,
}

impl HduKind {
    /// Reject a header of the other kind with unsupported-type
    pub(crate) fn check(self, hdu: &HduHeader, location: &str) -> Result<()> {
        let (accepted, label) = match self {
            Self::Image => (is_image_header(&hdu.header), "an image"),
            Self::Catalog => (is_catalog_header(&hdu.header), "a catalog"),
        };
        if accepted {
            Ok(())
        } else {
            Err(FitsError::unsupported(format!(
                "HDU {} of {location} is not {label} HDU",
                hdu.index
            ))
            .into())
        }
    }
}

/// Open `path`, read HDU `which` and check its kind
fn open_hdu(path: &Path, which: usize, kind: HduKind) -> Result<(FitsReader<LocalFile>, HduHeader)> {
    let mut reader = FitsReader::new(LocalFile::open(path)?)?;
    let hdu = reader.require_hdu(which)?;
    kind.check(&hdu, reader.location())?;
    Ok((reader, hdu))
}

fn file_info(path: &Path, size: u64) -> Result<FileInfo> {
    Ok(FileInfo::local(path, size, Some(md5_file(path)?)))
}

/// Emits the headers of an image HDU in a local file
#[derive(Debug, Clone)]
pub struct ImageHeaderSource {
    path: PathBuf,
    hdu: usize,
}

impl ImageHeaderSource {
    pub fn new(path: impl Into<PathBuf>, hdu: usize) -> Self {
        Self {
            path: path.into(),
            hdu,
        }
    }
}

impl Stage for ImageHeaderSource {
    fn process(&mut self, _bundle: MetadataBundle) -> Result<MetadataBundle> {
        let (reader, mut hdu) = open_hdu(&self.path, self.hdu, HduKind::Image)?;
        let size = reader.into_inner().size();
        hdu.header.strip_blacklisted();
        debug!("Read {} cards from {}", hdu.header.len(), self.path.display());

        Ok(MetadataBundle {
            file_info: Some(file_info(&self.path, size)?),
            headers: Some(hdu.header),
            ..MetadataBundle::default()
        })
    }

    fn name(&self) -> &str {
        "image_headers"
    }

    fn is_source(&self) -> bool {
        true
    }
}

/// Emits the headers and column layout of a table HDU in a local file
#[derive(Debug, Clone)]
pub struct CatalogHeaderSource {
    path: PathBuf,
    hdu: usize,
}

impl CatalogHeaderSource {
    pub fn new(path: impl Into<PathBuf>, hdu: usize) -> Self {
        Self {
            path: path.into(),
            hdu,
        }
    }
}

impl Stage for CatalogHeaderSource {
    fn process(&mut self, _bundle: MetadataBundle) -> Result<MetadataBundle> {
        let (reader, mut hdu) = open_hdu(&self.path, self.hdu, HduKind::Catalog)?;
        let size = reader.into_inner().size();
        let columns = table::column_info(&hdu.header)?;
        hdu.header.strip_blacklisted();

        Ok(MetadataBundle {
            file_info: Some(file_info(&self.path, size)?),
            headers: Some(hdu.header),
            column_info: Some(columns),
            ..MetadataBundle::default()
        })
    }

    fn name(&self) -> &str {
        "catalog_headers"
    }

    fn is_source(&self) -> bool {
        true
    }
}

/// Like [`CatalogHeaderSource`], plus the decoded table rows
#[derive(Debug, Clone)]
pub struct CatalogDataSource {
    path: PathBuf,
    hdu: usize,
}

impl CatalogDataSource {
    pub fn new(path: impl Into<PathBuf>, hdu: usize) -> Self {
        Self {
            path: path.into(),
            hdu,
        }
    }
}

impl Stage for CatalogDataSource {
    fn process(&mut self, _bundle: MetadataBundle) -> Result<MetadataBundle> {
        let (mut reader, mut hdu) = open_hdu(&self.path, self.hdu, HduKind::Catalog)?;
        let columns = table::column_info(&hdu.header)?;
        let bytes = reader.read_table_bytes(&hdu)?;
        let rows = table::decode_rows(&hdu.header, &bytes)?;
        let size = reader.into_inner().size();
        hdu.header.strip_blacklisted();
        debug!("Decoded {} rows from {}", rows.len(), self.path.display());

        Ok(MetadataBundle {
            file_info: Some(file_info(&self.path, size)?),
            headers: Some(hdu.header),
            column_info: Some(columns),
            data: Some(rows),
            ..MetadataBundle::default()
        })
    }

    fn name(&self) -> &str {
        "catalog_data"
    }

    fn is_source(&self) -> bool {
        true
    }
}
