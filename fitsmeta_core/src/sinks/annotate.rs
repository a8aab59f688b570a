use super::OutputTarget;
use crate::Result;
use crate::bundle::MetadataBundle;
use crate::pipeline::{Sink, Stage};
use crate::storage::{MetadataEntry, ObjectStore};
use log::debug;
use std::sync::Arc;

/// Fields that describe the file itself and never become attributes
const SKIPPED: [&str; 4] = ["file_name", "file_path", "file_size", "access_url"];

/// Attaches string-valued `calculated` entries to the remote object
///
/// The object is located through `file_info.remote_path`, falling back to
/// `file_info.file_path`.
#[derive(Debug)]
pub struct RemoteAnnotator {
    store: Arc<dyn ObjectStore>,
    output_only: Option<OutputTarget>,
}

impl RemoteAnnotator {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            output_only: None,
        }
    }

    /// Write the pairs as JSON to `target` instead of annotating
    pub fn output_only(mut self, target: OutputTarget) -> Self {
        self.output_only = Some(target);
        self
    }

    /// Attribute entries for `bundle`, in sorted key order
    pub fn entries(bundle: &MetadataBundle) -> Result<Vec<MetadataEntry>> {
        let calculated = bundle.require_calculated()?;
        Ok(calculated
            .iter()
            .filter(|(key, _)| !SKIPPED.contains(&key.as_str()))
            .filter_map(|(key, value)| value.as_str().map(|s| MetadataEntry::new(key, s)))
            .collect())
    }
}

impl Stage for RemoteAnnotator {
    fn process(&mut self, bundle: MetadataBundle) -> Result<MetadataBundle> {
        Ok(bundle)
    }

    fn name(&self) -> &str {
        "remote_annotate"
    }
}

impl Sink for RemoteAnnotator {
    fn output_results(&mut self, bundle: &MetadataBundle) -> Result<()> {
        let entries = Self::entries(bundle)?;

        if let Some(target) = &self.output_only {
            let mut text = serde_json::to_string_pretty(&entries)?;
            text.push('\n');
            return target.write_all(&text);
        }

        let file_info = bundle.require_file_info()?;
        let path = file_info
            .remote_path
            .as_deref()
            .unwrap_or(&file_info.file_path);
        for entry in &entries {
            self.store.add_metadata(path, &entry.name, &entry.value)?;
        }
        debug!("Annotated {path} with {} attributes", entries.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::FileInfo;
    use crate::error::ErrorKind;
    use crate::storage::MemoryObjectStore;
    use crate::value::Value;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn bundle(remote_path: &str) -> MetadataBundle {
        MetadataBundle {
            file_info: Some(FileInfo::remote(remote_path, 2880, None)),
            calculated: Some(BTreeMap::from([
                ("access_url".to_string(), Value::Text("https://x/y.fits".into())),
                ("file_name".to_string(), Value::Text("y.fits".into())),
                ("instrument_name".to_string(), Value::Text("NIRCam-A".into())),
                ("s_ra".to_string(), Value::Float(53.1)),
                ("target_name".to_string(), Value::Text("goods_south".into())),
            ])),
            ..MetadataBundle::default()
        }
    }

    #[test]
    fn test_only_string_values_become_entries() {
        let entries = RemoteAnnotator::entries(&bundle("/zone/a.fits")).unwrap();
        assert_eq!(
            entries,
            vec![
                MetadataEntry::new("instrument_name", "NIRCam-A"),
                MetadataEntry::new("target_name", "goods_south"),
            ]
        );
    }

    #[test]
    fn test_annotates_remote_object() {
        let store = Arc::new(MemoryObjectStore::new());
        store.insert("/zone/a.fits", vec![0; 2880]);

        RemoteAnnotator::new(store.clone())
            .output_results(&bundle("/zone/a.fits"))
            .unwrap();

        let metadata = store.metadata_of("/zone/a.fits");
        assert!(metadata.contains(&MetadataEntry::new("target_name", "goods_south")));
        assert!(metadata.contains(&MetadataEntry::new("instrument_name", "NIRCam-A")));
        assert!(!metadata.iter().any(|m| m.name == "access_url"));
    }

    #[test]
    fn test_missing_object_is_not_found() {
        let store = Arc::new(MemoryObjectStore::new());
        let err = RemoteAnnotator::new(store)
            .output_results(&bundle("/zone/missing.fits"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_output_only_writes_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("attrs.json");
        let store = Arc::new(MemoryObjectStore::new());
        store.insert("/zone/a.fits", vec![0; 2880]);

        RemoteAnnotator::new(store.clone())
            .output_only(OutputTarget::file(&path))
            .output_results(&bundle("/zone/a.fits"))
            .unwrap();

        let written: Vec<MetadataEntry> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.len(), 2);
        assert!(store.metadata_of("/zone/a.fits").is_empty());
    }
}
