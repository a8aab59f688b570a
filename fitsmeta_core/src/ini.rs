//! Minimal INI reader for the aliases and database configuration files
//!
//! Sections are `[name]` lines, entries are `key = value` or `key: value`.
//! Lines starting with `#` or `;` are comments. Keys keep their case and
//! entries keep their file order.

use crate::error::{IoError, Result, ValidationError};
use std::path::Path;

/// A parsed INI document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    sections: Vec<(String, Vec<(String, String)>)>,
}

impl IniDocument {
    pub fn parse(text: &str) -> Result<Self> {
        let mut document = Self::default();

        for (number, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                document.sections.push((name.trim().to_string(), Vec::new()));
                continue;
            }

            let Some(split) = line.find(['=', ':']) else {
                return Err(ValidationError::invalid_configuration(format!(
                    "line {}: expected 'key = value', found '{line}'",
                    number + 1
                ))
                .into());
            };
            let key = line[..split].trim().to_string();
            let value = line[split + 1..].trim().to_string();

            match document.sections.last_mut() {
                Some((_, entries)) => entries.push((key, value)),
                None => {
                    return Err(ValidationError::invalid_configuration(format!(
                        "line {}: entry before any [section] header",
                        number + 1
                    ))
                    .into());
                }
            }
        }

        Ok(document)
    }

    /// Read and parse a file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| IoError::from_std(e).with_path(path))?;
        Self::parse(&text)
    }

    /// Entries of the first section called `name`, in file order
    pub fn section(&self, name: &str) -> Option<&[(String, String)]> {
        self.sections
            .iter()
            .find(|(section, _)| section == name)
            .map(|(_, entries)| entries.as_slice())
    }

    /// Last value for `key` in section `name`
    pub fn get(&self, name: &str, key: &str) -> Option<&str> {
        self.section(name)?
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|(name, _)| name.as_str())
    }
}
