//! The metadata bundle passed between pipeline stages
//!
//! A bundle is a record of optional, named sections. Stages add sections and
//! may replace the content of sections they own, but a section present on
//! input is present on output. Serialized, each present section becomes a
//! top-level JSON key.

use crate::error::{Result, ValidationError};
use crate::fits::Header;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;

/// Where a file came from and how large it is
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub file_name: String,
    pub file_path: String,
    pub file_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5sum: Option<String>,
    /// Object-store path when the file was read remotely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_path: Option<String>,
}

impl FileInfo {
    /// Describe a local file
    pub fn local(path: &Path, file_size: u64, md5sum: Option<String>) -> Self {
        Self {
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            file_path: path.display().to_string(),
            file_size,
            md5sum,
            remote_path: None,
        }
    }

    /// Describe an object in a remote store
    pub fn remote(remote_path: &str, file_size: u64, md5sum: Option<String>) -> Self {
        let file_name = remote_path
            .rsplit('/')
            .next()
            .unwrap_or(remote_path)
            .to_string();
        Self {
            file_name,
            file_path: remote_path.to_string(),
            file_size,
            md5sum,
            remote_path: Some(remote_path.to_string()),
        }
    }
}

/// Parallel column names and formats of a table HDU
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: Vec<String>,
    pub format: Vec<String>,
}

impl ColumnInfo {
    /// Build column info; names and formats must have equal length
    pub fn new(name: Vec<String>, format: Vec<String>) -> Result<Self> {
        if name.len() != format.len() {
            return Err(ValidationError::bad_value(format!(
                "{} column names but {} column formats",
                name.len(),
                format.len()
            ))
            .into());
        }
        Ok(Self { name, format })
    }

    pub fn len(&self) -> usize {
        self.name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}

/// Output of an alias stage
///
/// Image aliasing yields a keyword map; catalog aliasing yields a list of
/// column names aligned with [`ColumnInfo::name`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Aliased {
    Columns(Vec<String>),
    Fields(BTreeMap<String, Value>),
}

impl Aliased {
    pub fn as_fields(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Fields(fields) => Some(fields),
            Self::Columns(_) => None,
        }
    }

    pub fn as_columns(&self) -> Option<&[String]> {
        match self {
            Self::Columns(columns) => Some(columns),
            Self::Fields(_) => None,
        }
    }
}

/// Per-field instructions from the fields-info document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
}

pub type FieldsInfo = BTreeMap<String, FieldSpec>;

/// Section names in serialization order
pub const SECTION_NAMES: [&str; 10] = [
    "file_info",
    "headers",
    "column_info",
    "data",
    "aliased",
    "fields_info",
    "defaults",
    "calculated",
    "irods_metadata",
    "content_metadata",
];

/// Record of optional sections accumulated by the pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataBundle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_info: Option<FileInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Header>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_info: Option<ColumnInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Vec<Value>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aliased: Option<Aliased>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields_info: Option<FieldsInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<BTreeMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculated: Option<BTreeMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irods_metadata: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_metadata: Option<BTreeMap<String, String>>,
}

impl MetadataBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the sections present, in serialization order
    pub fn sections(&self) -> Vec<&'static str> {
        let present = [
            self.file_info.is_some(),
            self.headers.is_some(),
            self.column_info.is_some(),
            self.data.is_some(),
            self.aliased.is_some(),
            self.fields_info.is_some(),
            self.defaults.is_some(),
            self.calculated.is_some(),
            self.irods_metadata.is_some(),
            self.content_metadata.is_some(),
        ];
        SECTION_NAMES
            .iter()
            .zip(present)
            .filter_map(|(name, present)| present.then_some(*name))
            .collect()
    }

    pub fn require_headers(&self) -> Result<&Header> {
        self.headers
            .as_ref()
            .ok_or_else(|| ValidationError::missing_section("headers").into())
    }

    pub fn require_column_info(&self) -> Result<&ColumnInfo> {
        self.column_info
            .as_ref()
            .ok_or_else(|| ValidationError::missing_section("column_info").into())
    }

    pub fn require_calculated(&self) -> Result<&BTreeMap<String, Value>> {
        self.calculated
            .as_ref()
            .ok_or_else(|| ValidationError::missing_section("calculated").into())
    }

    pub fn require_file_info(&self) -> Result<&FileInfo> {
        self.file_info
            .as_ref()
            .ok_or_else(|| ValidationError::missing_section("file_info").into())
    }

    /// Read a bundle from JSON
    pub fn read_json<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Write the bundle as pretty-printed JSON
    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_column_info_length_mismatch() {
        let err = ColumnInfo::new(vec!["a".into()], vec![]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadValue);
    }

    #[test]
    fn test_empty_bundle_serializes_to_empty_object() {
        let bundle = MetadataBundle::new();
        assert_eq!(bundle.to_json().unwrap(), "{}");
        assert!(bundle.sections().is_empty());
    }

    #[test]
    fn test_sections_become_json_keys() {
        let mut bundle = MetadataBundle::new();
        bundle.file_info = Some(FileInfo::remote("/zone/home/a.fits", 5760, None));
        bundle.calculated = Some(BTreeMap::from([("s_ra".to_string(), Value::Float(1.5))]));

        let json: serde_json::Value = serde_json::from_str(&bundle.to_json().unwrap()).unwrap();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["calculated", "file_info"]);
        assert_eq!(json["file_info"]["file_name"], "a.fits");
        assert_eq!(bundle.sections(), vec!["file_info", "calculated"]);
    }

    #[test]
    fn test_aliased_shapes_reload() {
        let bundle = MetadataBundle::from_json(r#"{"aliased": ["id", "s_ra"]}"#).unwrap();
        assert_eq!(
            bundle.aliased.unwrap().as_columns().unwrap(),
            &["id".to_string(), "s_ra".to_string()]
        );

        let bundle = MetadataBundle::from_json(r#"{"aliased": {"filter": "F444W"}}"#).unwrap();
        let aliased = bundle.aliased.unwrap();
        assert_eq!(
            aliased.as_fields().unwrap().get("filter"),
            Some(&Value::Text("F444W".into()))
        );
    }

    #[test]
    fn test_round_trip_preserves_headers() {
        let text = r#"{
            "file_info": {"file_name": "a.fits", "file_path": "/d/a.fits", "file_size": 5760},
            "headers": {"BITPIX": -32, "NAXIS1": 512, "FILTER": "F200W", "SIMPLE": true}
        }"#;
        let bundle = MetadataBundle::from_json(text).unwrap();
        let reloaded = MetadataBundle::from_json(&bundle.to_json().unwrap()).unwrap();
        assert_eq!(bundle, reloaded);
        assert_eq!(reloaded.require_headers().unwrap().get_int("NAXIS1"), Some(512));
    }

    #[test]
    fn test_missing_section() {
        let bundle = MetadataBundle::new();
        let err = bundle.require_headers().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadValue);
        assert!(err.to_string().contains("headers"));
    }
}
