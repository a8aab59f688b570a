//! Validation related error types

use super::ErrorKind;
use thiserror::Error;

/// Value, datatype and configuration errors
#[derive(Error, Debug)]
pub enum ValidationError {
    /// A value cannot be coerced to its declared datatype
    #[error("Cannot convert '{value}' to {datatype}")]
    InvalidValue { value: String, datatype: String },

    /// Unknown datatype label in the fields-info document
    #[error("Unknown datatype '{datatype}'")]
    UnknownDatatype { datatype: String },

    /// WCS axes cannot be mapped to RA/DEC
    #[error("Cannot map WCS axes ({ctype1}, {ctype2}) onto RA/DEC")]
    BadAxes { ctype1: String, ctype2: String },

    /// Required fields missing from an input record
    #[error("Missing required fields: {}", fields.join(", "))]
    MissingFields { fields: Vec<String> },

    /// A section a stage depends on has not been produced
    #[error("Metadata bundle has no '{section}' section")]
    MissingSection { section: String },

    /// A stage dropped a section produced upstream
    #[error("Stage '{stage}' removed the '{section}' section")]
    SectionRemoved { stage: String, section: String },

    /// Invalid configuration or resource file
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// Target table does not exist
    #[error("Table {table} does not exist")]
    TableNotFound { table: String },

    /// Any other bad value
    #[error("Bad value: {message}")]
    BadValue { message: String },
}

impl ValidationError {
    /// Create an invalid value error
    pub fn invalid_value(value: &str, datatype: &str) -> Self {
        Self::InvalidValue {
            value: value.to_string(),
            datatype: datatype.to_string(),
        }
    }

    /// Create an unknown datatype error
    pub fn unknown_datatype(datatype: &str) -> Self {
        Self::UnknownDatatype {
            datatype: datatype.to_string(),
        }
    }

    /// Create a bad axes error
    pub fn bad_axes(ctype1: &str, ctype2: &str) -> Self {
        Self::BadAxes {
            ctype1: ctype1.to_string(),
            ctype2: ctype2.to_string(),
        }
    }

    /// Create a missing fields error
    pub fn missing_fields(fields: Vec<String>) -> Self {
        Self::MissingFields { fields }
    }

    /// Create a missing section error
    pub fn missing_section(section: &str) -> Self {
        Self::MissingSection {
            section: section.to_string(),
        }
    }

    /// Create a section removed error
    pub fn section_removed(stage: &str, section: &str) -> Self {
        Self::SectionRemoved {
            stage: stage.to_string(),
            section: section.to_string(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create a table not found error
    pub fn table_not_found(table: &str) -> Self {
        Self::TableNotFound {
            table: table.to_string(),
        }
    }

    /// Create a generic bad value error
    pub fn bad_value(message: impl Into<String>) -> Self {
        Self::BadValue {
            message: message.into(),
        }
    }

    pub(crate) fn error_kind(&self) -> ErrorKind {
        match self {
            Self::UnknownDatatype { .. } => ErrorKind::BadType,
            Self::BadAxes { .. } => ErrorKind::BadAxes,
            Self::TableNotFound { .. } => ErrorKind::NotFound,
            _ => ErrorKind::BadValue,
        }
    }
}
