//! Header source reading FITS objects from an object store

use super::source::HduKind;
use crate::Result;
use crate::bundle::{FileInfo, MetadataBundle};
use crate::fits::{FitsReader, table};
use crate::pipeline::Stage;
use crate::storage::{ObjectStore, OpenObject, RandomAccess};
use log::debug;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Attribute carrying the object's MD5 digest when the store records one
const CHECKSUM_ATTRIBUTE: &str = "checksum";

/// Reads one HDU header of a remote object without downloading its data
///
/// The object handle is opened per `process` call and closed on every exit
/// path, while the store itself is shared with the rest of a directory scan.
#[derive(Debug, Clone)]
pub struct RemoteHeaderSource {
    store: Arc<dyn ObjectStore>,
    remote_path: String,
    hdu: usize,
    kind: HduKind,
}

impl RemoteHeaderSource {
    /// Source for an image HDU
    pub fn image(store: Arc<dyn ObjectStore>, remote_path: impl Into<String>, hdu: usize) -> Self {
        Self {
            store,
            remote_path: remote_path.into(),
            hdu,
            kind: HduKind::Image,
        }
    }

    /// Source for a table HDU; also emits `column_info`
    pub fn catalog(store: Arc<dyn ObjectStore>, remote_path: impl Into<String>, hdu: usize) -> Self {
        Self {
            store,
            remote_path: remote_path.into(),
            hdu,
            kind: HduKind::Catalog,
        }
    }
}

impl Stage for RemoteHeaderSource {
    fn process(&mut self, _bundle: MetadataBundle) -> Result<MetadataBundle> {
        let object = OpenObject::open(self.store.get(&self.remote_path)?)?;
        let size = object.size();
        let irods_metadata: BTreeMap<String, String> = object
            .metadata()
            .into_iter()
            .map(|entry| (entry.name, entry.value))
            .collect();
        let content_metadata = object.attributes();

        let mut reader = FitsReader::new(object)?;
        let mut hdu = reader.require_hdu(self.hdu)?;
        self.kind.check(&hdu, &self.remote_path)?;
        drop(reader);

        let column_info = match self.kind {
            HduKind::Catalog => Some(table::column_info(&hdu.header)?),
            HduKind::Image => None,
        };
        hdu.header.strip_blacklisted();
        debug!(
            "Read {} cards of HDU {} from {}",
            hdu.header.len(),
            self.hdu,
            self.remote_path
        );

        let md5sum = content_metadata.get(CHECKSUM_ATTRIBUTE).cloned();
        Ok(MetadataBundle {
            file_info: Some(FileInfo::remote(&self.remote_path, size, md5sum)),
            headers: Some(hdu.header),
            column_info,
            irods_metadata: Some(irods_metadata),
            content_metadata: Some(content_metadata),
            ..MetadataBundle::default()
        })
    }

    fn name(&self) -> &str {
        match self.kind {
            HduKind::Image => "remote_image_headers",
            HduKind::Catalog => "remote_catalog_headers",
        }
    }

    fn is_source(&self) -> bool {
        true
    }
}
