//! Remote FITS reading and object-store annotation

use fitsmeta_core::bundle::MetadataBundle;
use fitsmeta_core::config::ObsCoreConfig;
use fitsmeta_core::fits::{BLOCK_SIZE, FitsReader, LinearTanSolver};
use fitsmeta_core::pipeline::MetadataPipelineBuilder;
use fitsmeta_core::sinks::RemoteAnnotator;
use fitsmeta_core::stages::{
    AliasTable, FieldsInfoStage, ImageAliasStage, ObsCoreCalculator, RemoteHeaderSource,
};
use fitsmeta_core::storage::{DirectoryObjectStore, MetadataEntry, ObjectStore};
use fitsmeta_core::{ErrorKind, RandomAccess, Result, Value};
use fitsmeta_test_utils::{FailingObjectStore, Fixture, format_card, jwst_image};
use std::io::SeekFrom;
use std::sync::Arc;

/// Header blocks at fixed offsets of an otherwise empty object
///
/// Stands in for a multi-hundred-megabyte image without allocating it.
#[derive(Debug)]
struct SparseObject {
    blocks: Vec<(u64, Vec<u8>)>,
    size: u64,
    position: u64,
    seeks: Vec<u64>,
}

impl RandomAccess for SparseObject {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        if let SeekFrom::Start(n) = pos {
            self.position = n;
        }
        self.seeks.push(self.position);
        Ok(self.position)
    }

    fn tell(&mut self) -> Result<u64> {
        Ok(self.position)
    }

    fn read(&mut self, n: usize) -> Result<Vec<u8>> {
        let found = self
            .blocks
            .iter()
            .find(|(offset, bytes)| {
                self.position >= *offset && self.position < offset + bytes.len() as u64
            })
            .map(|(offset, bytes)| {
                let start = (self.position - offset) as usize;
                let end = (start + n).min(bytes.len());
                bytes[start..end].to_vec()
            });
        let out = found.unwrap_or_else(|| vec![0; n.min((self.size - self.position) as usize)]);
        self.position += out.len() as u64;
        Ok(out)
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn location(&self) -> &str {
        "/zone/mosaic.fits"
    }
}

fn header_block(cards: &[(&str, Value)]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for (key, value) in cards {
        bytes.extend_from_slice(format_card(key, value).as_bytes());
    }
    bytes.extend_from_slice(format!("{:<80}", "END").as_bytes());
    bytes.resize(BLOCK_SIZE as usize, b' ');
    bytes
}

#[test]
fn test_second_header_is_one_seek_past_the_image() {
    let primary = header_block(&[
        ("SIMPLE", Value::Bool(true)),
        ("BITPIX", Value::Integer(-64)),
        ("NAXIS", Value::Integer(2)),
        ("NAXIS1", Value::Integer(9791)),
        ("NAXIS2", Value::Integer(4305)),
        ("EXTEND", Value::Bool(true)),
    ]);
    let extension = header_block(&[
        ("XTENSION", Value::Text("IMAGE".into())),
        ("BITPIX", Value::Integer(-32)),
        ("NAXIS", Value::Integer(2)),
        ("NAXIS1", Value::Integer(10)),
        ("NAXIS2", Value::Integer(10)),
        ("PCOUNT", Value::Integer(0)),
        ("GCOUNT", Value::Integer(1)),
        ("FILTER", Value::Text("F356W".into())),
    ]);

    let data_bytes = (9791u64 * 4305 * 8).div_ceil(2880) * 2880;
    let second = 2880 + data_bytes;
    let object = SparseObject {
        blocks: vec![(0, primary), (second, extension)],
        size: second + 2 * 2880,
        position: 0,
        seeks: Vec::new(),
    };

    let mut reader = FitsReader::new(object).unwrap();
    let hdu = reader.require_hdu(1).unwrap();
    assert_eq!(hdu.start_offset, second);
    assert_eq!(hdu.header.get_str("FILTER"), Some("F356W"));

    let object = reader.into_inner();
    assert_eq!(object.seeks, vec![0, second]);
}

#[test]
fn test_truncated_remote_object_is_unsupported() {
    let fixture = Fixture::new().unwrap();
    fixture.write("zone/short.fits", "SIMPLE  =").unwrap();
    let store: Arc<dyn ObjectStore> = Arc::new(DirectoryObjectStore::new(fixture.path()));

    let err = MetadataPipelineBuilder::new()
        .add_stage(Box::new(RemoteHeaderSource::image(store, "/zone/short.fits", 0)))
        .build()
        .run(MetadataBundle::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedType);
}

#[test]
fn test_missing_second_hdu_is_not_found() {
    let fixture = Fixture::new().unwrap();
    fixture.fits("zone/single.fits", &jwst_image()).unwrap();
    let store: Arc<dyn ObjectStore> = Arc::new(DirectoryObjectStore::new(fixture.path()));

    let err = MetadataPipelineBuilder::new()
        .add_stage(Box::new(RemoteHeaderSource::image(store, "zone/single.fits", 1)))
        .build()
        .run(MetadataBundle::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_unreachable_store_is_io_error() {
    let store: Arc<dyn ObjectStore> = Arc::new(FailingObjectStore::default());
    let err = MetadataPipelineBuilder::new()
        .add_stage(Box::new(RemoteHeaderSource::image(store, "/zone/a.fits", 0)))
        .build()
        .run(MetadataBundle::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn test_remote_image_is_annotated_with_calculated_values() {
    let fixture = Fixture::new().unwrap();
    fixture
        .fits("zone/goods_n_f444w.fits", &jwst_image().card("FILTER", "F444W"))
        .unwrap();
    let aliases = fixture
        .aliases("aliases.ini", &[("FILTER", "filter"), ("MODULE", "nircam_module")])
        .unwrap();
    let fields = fixture.fields_info("fields.toml").unwrap();
    let store = Arc::new(DirectoryObjectStore::new(fixture.path()));
    let config = ObsCoreConfig {
        collection: Some("JWST".into()),
        url_prefix: "https://archive.example.org".into(),
        image_mount_path: "/images".into(),
    };

    let bundle = MetadataPipelineBuilder::new()
        .add_stage(Box::new(RemoteHeaderSource::image(
            store.clone(),
            "/zone/goods_n_f444w.fits",
            0,
        )))
        .add_stage(Box::new(ImageAliasStage::new(AliasTable::load(&aliases).unwrap())))
        .add_stage(Box::new(FieldsInfoStage::load(&fields).unwrap()))
        .add_stage(Box::new(ObsCoreCalculator::new(config, Box::new(LinearTanSolver))))
        .with_sink(Box::new(RemoteAnnotator::new(store.clone())))
        .build()
        .run(MetadataBundle::new())
        .unwrap();

    let calculated = bundle.calculated.unwrap();
    assert_eq!(
        calculated["access_url"],
        Value::Text("https://archive.example.org/images/zone/goods_n_f444w.fits".into())
    );

    let sidecar = fixture.join("zone/goods_n_f444w.fits.meta.json");
    let entries: Vec<MetadataEntry> =
        serde_json::from_str(&std::fs::read_to_string(sidecar).unwrap()).unwrap();
    assert!(entries.contains(&MetadataEntry::new("target_name", "goods_north")));
    assert!(entries.contains(&MetadataEntry::new("obs_collection", "JWST")));
    assert!(entries.contains(&MetadataEntry::new("instrument_name", "NIRCam-A")));
    assert!(!entries.iter().any(|e| e.name == "access_url"));
}
