use super::OutputTarget;
use crate::Result;
use crate::bundle::MetadataBundle;
use crate::pipeline::{Sink, Stage};

/// Writes the bundle, or just its `calculated` section, as pretty JSON
#[derive(Debug, Clone, Default)]
pub struct JsonSink {
    target: OutputTarget,
    calculated_only: bool,
}

impl JsonSink {
    pub fn new(target: OutputTarget) -> Self {
        Self {
            target,
            calculated_only: false,
        }
    }

    pub fn calculated_only(mut self, calculated_only: bool) -> Self {
        self.calculated_only = calculated_only;
        self
    }

    fn render(&self, bundle: &MetadataBundle) -> Result<String> {
        let mut text = if self.calculated_only {
            serde_json::to_string_pretty(bundle.require_calculated()?)?
        } else {
            bundle.to_json()?
        };
        text.push('\n');
        Ok(text)
    }
}

impl Stage for JsonSink {
    fn process(&mut self, bundle: MetadataBundle) -> Result<MetadataBundle> {
        Ok(bundle)
    }

    fn name(&self) -> &str {
        "json_out"
    }
}

impl Sink for JsonSink {
    fn output_results(&mut self, bundle: &MetadataBundle) -> Result<()> {
        self.target.write_all(&self.render(bundle)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn bundle() -> MetadataBundle {
        MetadataBundle {
            calculated: Some(BTreeMap::from([("s_ra".to_string(), Value::Float(53.15))])),
            defaults: Some(BTreeMap::new()),
            ..MetadataBundle::default()
        }
    }

    #[test]
    fn test_full_bundle_reloads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        JsonSink::new(OutputTarget::file(&path))
            .output_results(&bundle())
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(MetadataBundle::from_json(&text).unwrap(), bundle());
    }

    #[test]
    fn test_calculated_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        JsonSink::new(OutputTarget::file(&path))
            .calculated_only(true)
            .output_results(&bundle())
            .unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value, serde_json::json!({"s_ra": 53.15}));
    }

    #[test]
    fn test_calculated_only_requires_section() {
        let err = JsonSink::default()
            .calculated_only(true)
            .output_results(&MetadataBundle::new())
            .unwrap_err();
        assert!(err.to_string().contains("calculated"));
    }
}
