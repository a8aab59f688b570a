//! Immutable configuration records handed to stages at construction

use crate::error::{Result, ValidationError};
use crate::ini::IniDocument;
use crate::sinks::ExistenceQuery;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Settings used by the ObsCore calculator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObsCoreConfig {
    /// Value for `obs_collection`, when configured
    pub collection: Option<String>,
    /// Scheme and host prefix of `access_url`
    pub url_prefix: String,
    /// Mount point of the image tree below the prefix
    pub image_mount_path: String,
}

/// Column aliases recognised as RA, DEC and object identifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogAliasSets {
    pub ra: Vec<String>,
    pub dec: Vec<String>,
    pub id: Vec<String>,
}

impl Default for CatalogAliasSets {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            ra: strings(&["s_ra", "ra", "RA", "ra_deg", "RAJ2000", "ALPHA_J2000"]),
            dec: strings(&["s_dec", "dec", "DEC", "dec_deg", "DEJ2000", "DELTA_J2000"]),
            id: strings(&["id", "ID", "obs_id", "source_id", "NUMBER"]),
        }
    }
}

/// Database connection settings from the `[db_properties]` INI section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub db_uri: String,
    pub db_schema_name: String,
    pub db_user: String,
    pub db_table_name: Option<String>,
    pub db_hybrid_table_name: Option<String>,
    pub db_catalog_table_name: Option<String>,
    /// Catalog consulted before creating or filling a table
    pub db_existence_query: ExistenceQuery,
}

impl DbConfig {
    pub const SECTION: &'static str = "db_properties";

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_ini(&IniDocument::load(path)?)
    }

    pub fn from_ini(document: &IniDocument) -> Result<Self> {
        if document.section(Self::SECTION).is_none() {
            return Err(ValidationError::invalid_configuration(format!(
                "database configuration has no [{}] section",
                Self::SECTION
            ))
            .into());
        }

        let required = |key: &str| {
            document
                .get(Self::SECTION, key)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| {
                    ValidationError::invalid_configuration(format!(
                        "database configuration is missing '{key}'"
                    ))
                })
        };
        let optional = |key: &str| {
            document
                .get(Self::SECTION, key)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Ok(Self {
            db_uri: required("db_uri")?,
            db_schema_name: required("db_schema_name")?,
            db_user: required("db_user")?,
            db_table_name: optional("db_table_name"),
            db_hybrid_table_name: optional("db_hybrid_table_name"),
            db_catalog_table_name: optional("db_catalog_table_name"),
            db_existence_query: optional("db_existence_query")
                .map(|name| name.parse::<ExistenceQuery>())
                .transpose()?
                .unwrap_or_default(),
        })
    }
}

/// A schema-qualified table name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    pub schema: String,
    pub table: String,
}

impl TableName {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Parse `schema.table`, or a bare `table` in `default_schema`
    pub fn parse(text: &str, default_schema: &str) -> Result<Self> {
        let text = text.trim();
        let (schema, table) = match text.split_once('.') {
            Some((schema, table)) => (schema, table),
            None => (default_schema, text),
        };
        if schema.is_empty() || table.is_empty() || table.contains('.') {
            return Err(ValidationError::invalid_configuration(format!(
                "invalid table name '{text}'"
            ))
            .into());
        }
        Ok(Self::new(schema, table))
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_db_config_from_ini() {
        let doc = IniDocument::parse(
            "[db_properties]\ndb_uri = postgresql://localhost/vos\ndb_schema_name = sia\ndb_user = archive\ndb_table_name = obscore\n",
        )
        .unwrap();
        let config = DbConfig::from_ini(&doc).unwrap();
        assert_eq!(config.db_schema_name, "sia");
        assert_eq!(config.db_table_name.as_deref(), Some("obscore"));
        assert!(config.db_hybrid_table_name.is_none());
        assert_eq!(config.db_existence_query, ExistenceQuery::PgCatalog);
    }

    #[test]
    fn test_db_config_selects_tap_schema() {
        let doc = IniDocument::parse(
            "[db_properties]\ndb_uri = x\ndb_schema_name = sia\ndb_user = archive\ndb_existence_query = tap_schema\n",
        )
        .unwrap();
        let config = DbConfig::from_ini(&doc).unwrap();
        assert_eq!(config.db_existence_query, ExistenceQuery::TapSchema);

        let doc = IniDocument::parse(
            "[db_properties]\ndb_uri = x\ndb_schema_name = sia\ndb_user = archive\ndb_existence_query = pg_tables\n",
        )
        .unwrap();
        let err = DbConfig::from_ini(&doc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadValue);
    }

    #[test]
    fn test_db_config_missing_key() {
        let doc = IniDocument::parse("[db_properties]\ndb_uri = x\n").unwrap();
        let err = DbConfig::from_ini(&doc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadValue);
        assert!(err.to_string().contains("db_schema_name"));
    }

    #[test]
    fn test_db_config_missing_section() {
        let doc = IniDocument::parse("[other]\na = b\n").unwrap();
        assert!(DbConfig::from_ini(&doc).is_err());
    }

    #[test]
    fn test_table_name_parse() {
        assert_eq!(TableName::parse("sia.cat", "public").unwrap(), TableName::new("sia", "cat"));
        assert_eq!(TableName::parse("cat", "sia").unwrap().to_string(), "sia.cat");
        assert!(TableName::parse("a.b.c", "sia").is_err());
        assert!(TableName::parse(".cat", "sia").is_err());
    }

    #[test]
    fn test_default_alias_sets() {
        let sets = CatalogAliasSets::default();
        assert!(sets.ra.contains(&"s_ra".to_string()));
        assert!(sets.dec.contains(&"s_dec".to_string()));
        assert!(sets.id.contains(&"id".to_string()));
    }
}
