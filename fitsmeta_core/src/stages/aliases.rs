//! Keyword and column renaming from an aliases file

use crate::Result;
use crate::bundle::{Aliased, MetadataBundle};
use crate::error::ValidationError;
use crate::ini::IniDocument;
use crate::pipeline::Stage;
use crate::value::Value;
use log::debug;
use std::collections::BTreeMap;
use std::path::Path;

/// `source = target` pairs from the `[aliases]` section, in file order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTable {
    pairs: Vec<(String, String)>,
}

impl AliasTable {
    pub const SECTION: &'static str = "aliases";

    /// Read an aliases file; a missing or empty `[aliases]` section is bad-value
    pub fn load(path: &Path) -> Result<Self> {
        Self::from_ini(&IniDocument::load(path)?)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Self::from_ini(&IniDocument::parse(text)?)
    }

    fn from_ini(document: &IniDocument) -> Result<Self> {
        let pairs = document.section(Self::SECTION).ok_or_else(|| {
            ValidationError::bad_value(format!("aliases file has no [{}] section", Self::SECTION))
        })?;
        if pairs.is_empty() {
            return Err(ValidationError::bad_value("aliases file defines no aliases").into());
        }
        Ok(Self {
            pairs: pairs.to_vec(),
        })
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Target for `source`; the last pair wins on duplicates
    pub fn target(&self, source: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(s, _)| s == source)
            .map(|(_, t)| t.as_str())
    }

    /// `aliased[target] = headers[source]` for every source present
    pub fn apply_to_headers<'a, F>(&self, lookup: F) -> BTreeMap<String, Value>
    where
        F: Fn(&str) -> Option<&'a Value>,
    {
        let mut aliased = BTreeMap::new();
        for (source, target) in &self.pairs {
            if let Some(value) = lookup(source) {
                aliased.insert(target.clone(), value.clone());
            }
        }
        aliased
    }

    /// Rename each column that has an alias, keeping positions
    pub fn apply_to_columns(&self, names: &[String]) -> Vec<String> {
        names
            .iter()
            .map(|name| self.target(name).unwrap_or(name).to_string())
            .collect()
    }
}

/// Produces the `aliased` keyword map from image headers
#[derive(Debug, Clone)]
pub struct ImageAliasStage {
    aliases: AliasTable,
}

impl ImageAliasStage {
    pub fn new(aliases: AliasTable) -> Self {
        Self { aliases }
    }
}

impl Stage for ImageAliasStage {
    fn process(&mut self, mut bundle: MetadataBundle) -> Result<MetadataBundle> {
        let headers = bundle.require_headers()?;
        let aliased = self.aliases.apply_to_headers(|key| headers.get(key));
        debug!("Aliased {} of {} header keywords", aliased.len(), headers.len());
        bundle.aliased = Some(Aliased::Fields(aliased));
        Ok(bundle)
    }

    fn name(&self) -> &str {
        "aliases"
    }
}

/// Produces the `aliased` column list from a catalog's column names
#[derive(Debug, Clone)]
pub struct CatalogAliasStage {
    aliases: AliasTable,
}

impl CatalogAliasStage {
    pub fn new(aliases: AliasTable) -> Self {
        Self { aliases }
    }
}

impl Stage for CatalogAliasStage {
    fn process(&mut self, mut bundle: MetadataBundle) -> Result<MetadataBundle> {
        let columns = bundle.require_column_info()?;
        let aliased = self.aliases.apply_to_columns(&columns.name);
        bundle.aliased = Some(Aliased::Columns(aliased));
        Ok(bundle)
    }

    fn name(&self) -> &str {
        "catalog_aliases"
    }
}
