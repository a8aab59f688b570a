//! Target schema and per-field defaults

use crate::Result;
use crate::bundle::{FieldsInfo, MetadataBundle};
use crate::error::{IoError, ValidationError};
use crate::pipeline::Stage;
use crate::value::{Datatype, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Read a fields-info document
///
/// TOML unless the file ends in `.json`. Every `datatype` label is checked,
/// so an unknown label fails here with bad-type.
pub fn load_fields_info(path: &Path) -> Result<FieldsInfo> {
    let text = std::fs::read_to_string(path).map_err(|e| IoError::from_std(e).with_path(path))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let info: FieldsInfo = if is_json {
        serde_json::from_str(&text)?
    } else {
        toml::from_str(&text).map_err(|e| {
            ValidationError::invalid_configuration(format!("{}: {e}", path.display()))
        })?
    };

    for spec in info.values() {
        if let Some(label) = &spec.datatype {
            Datatype::parse(label)?;
        }
    }
    Ok(info)
}

/// Defaults of every field that has one, coerced by the field's datatype
fn extract_defaults(info: &FieldsInfo) -> Result<BTreeMap<String, Value>> {
    let mut defaults = BTreeMap::new();
    for (field, spec) in info {
        let Some(default) = &spec.default else {
            continue;
        };
        let value = match &spec.datatype {
            Some(label) => default.clone().coerce(Datatype::parse(label)?)?,
            None => default.clone(),
        };
        defaults.insert(field.clone(), value);
    }
    Ok(defaults)
}

/// Attaches `fields_info` and `defaults`
#[derive(Debug, Clone)]
pub struct FieldsInfoStage {
    info: FieldsInfo,
    defaults: BTreeMap<String, Value>,
}

impl FieldsInfoStage {
    pub fn new(info: FieldsInfo) -> Result<Self> {
        let defaults = extract_defaults(&info)?;
        Ok(Self { info, defaults })
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::new(load_fields_info(path)?)
    }
}

impl Stage for FieldsInfoStage {
    fn process(&mut self, mut bundle: MetadataBundle) -> Result<MetadataBundle> {
        bundle.fields_info = Some(self.info.clone());
        bundle.defaults = Some(self.defaults.clone());
        Ok(bundle)
    }

    fn name(&self) -> &str {
        "fields_info"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    const FIELDS: &str = r#"
[dataproduct_type]
required = true
default = "image"
datatype = "string"

[equinox]
default = 2000.0
datatype = "double"

[t_min]
default = "2022-07-14"
datatype = "date"

[s_ra]
required = true
datatype = "double"
"#;

    fn write(dir: &TempDir, name: &str, text: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_toml_document() {
        let dir = TempDir::new().unwrap();
        let mut stage = FieldsInfoStage::load(&write(&dir, "fields.toml", FIELDS)).unwrap();
        let bundle = stage.process(MetadataBundle::new()).unwrap();

        let info = bundle.fields_info.unwrap();
        assert_eq!(info.len(), 4);
        assert!(info["s_ra"].required);
        assert!(!info["equinox"].required);

        let defaults = bundle.defaults.unwrap();
        assert_eq!(defaults.len(), 3);
        assert_eq!(defaults["dataproduct_type"], Value::Text("image".into()));
        assert_eq!(defaults["equinox"], Value::Float(2000.0));
        assert!(matches!(defaults["t_min"], Value::Timestamp(_)));
    }

    #[test]
    fn test_json_document() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "fields.json",
            r#"{"calib_level": {"required": true, "default": "3", "datatype": "integer"}}"#,
        );
        let stage = FieldsInfoStage::load(&path).unwrap();
        assert_eq!(stage.defaults["calib_level"], Value::Integer(3));
    }

    #[test]
    fn test_no_defaults_gives_empty_map() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "fields.toml", "[s_ra]\nrequired = true\n");
        let mut stage = FieldsInfoStage::load(&path).unwrap();
        let bundle = stage.process(MetadataBundle::new()).unwrap();
        assert!(bundle.defaults.unwrap().is_empty());
    }

    #[test]
    fn test_unknown_datatype_is_bad_type() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "fields.toml", "[x]\ndatatype = \"complex\"\n");
        let err = FieldsInfoStage::load(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadType);
    }

    #[test]
    fn test_unconvertible_default_is_bad_value() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "fields.toml", "[x]\ndefault = \"2022\"\ndatatype = \"date\"\n");
        let err = FieldsInfoStage::load(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadValue);
    }
}
