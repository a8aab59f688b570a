use crate::paths;
use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use fitsmeta_core::stages::ReportFormat;
use fitsmeta_core::{CatalogAliasSets, ObsCoreConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub resources: ResourcesConfig,

    #[serde(default)]
    pub obscore: ObsCoreSettings,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

/// Default locations of the files the stages load
#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
pub struct ResourcesConfig {
    pub aliases_file: Option<PathBuf>,
    pub catalog_aliases_file: Option<PathBuf>,
    pub fields_info_file: Option<PathBuf>,
    pub db_config_file: Option<PathBuf>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ObsCoreSettings {
    pub collection: Option<String>,
    pub url_prefix: String,
    pub image_mount_path: String,
    pub ra_aliases: Vec<String>,
    pub dec_aliases: Vec<String>,
    pub id_aliases: Vec<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct OutputConfig {
    /// Directory for `--generate` output names
    pub out_dir: PathBuf,
    pub report_format: ReportFormat,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
pub struct StoreConfig {
    /// Root directory of the directory-backed object store
    pub root: Option<PathBuf>,
}

impl Default for ObsCoreSettings {
    fn default() -> Self {
        let sets = CatalogAliasSets::default();
        Self {
            collection: None,
            url_prefix: String::new(),
            image_mount_path: String::new(),
            ra_aliases: sets.ra,
            dec_aliases: sets.dec,
            id_aliases: sets.id,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("."),
            report_format: ReportFormat::Text,
        }
    }
}

impl AppConfig {
    /// Settings handed to the ObsCore calculator
    pub fn obscore_config(&self) -> ObsCoreConfig {
        ObsCoreConfig {
            collection: self.obscore.collection.clone(),
            url_prefix: self.obscore.url_prefix.clone(),
            image_mount_path: self.obscore.image_mount_path.clone(),
        }
    }

    /// Column aliases used by catalog SQL
    pub fn alias_sets(&self) -> CatalogAliasSets {
        CatalogAliasSets {
            ra: self.obscore.ra_aliases.clone(),
            dec: self.obscore.dec_aliases.clone(),
            id: self.obscore.id_aliases.clone(),
        }
    }
}

/// Loads [`AppConfig`] from defaults, a TOML file and `FITSMETA_` variables
pub struct ConfigManager {
    config_path: PathBuf,
    explicit: bool,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    /// Manager reading the default XDG-compliant path
    pub fn new() -> Self {
        Self {
            config_path: paths::get_config_path(),
            explicit: false,
        }
    }

    /// Manager reading `path`, which must exist
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            config_path: path,
            explicit: true,
        }
    }

    /// Get the configuration file path
    pub fn get_config_path(&self) -> PathBuf {
        self.config_path.clone()
    }

    /// Load configuration with layered priority: ENV > File > Defaults
    pub fn load(&self) -> Result<AppConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));

        if self.config_path.exists() {
            figment = figment.merge(Toml::file(&self.config_path));
        } else if self.explicit {
            anyhow::bail!(
                "Configuration file {} does not exist",
                self.config_path.display()
            );
        }

        figment = figment.merge(Env::prefixed("FITSMETA_").split("__"));

        figment.extract().with_context(|| {
            format!(
                "Failed to load configuration from {}",
                self.config_path.display()
            )
        })
    }

    /// All effective values as dotted keys, sorted
    pub fn list(&self) -> Result<Vec<(String, String)>> {
        let config = self.load()?;
        let value = toml::Value::try_from(&config)?;

        let mut items = Vec::new();
        Self::collect_values(&value, String::new(), &mut items);
        items.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(items)
    }

    fn collect_values(value: &toml::Value, prefix: String, items: &mut Vec<(String, String)>) {
        match value {
            toml::Value::Table(table) => {
                for (key, val) in table {
                    let new_prefix = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{prefix}.{key}")
                    };
                    Self::collect_values(val, new_prefix, items);
                }
            }
            toml::Value::String(s) => items.push((prefix, s.clone())),
            toml::Value::Array(values) => {
                let rendered: Vec<String> = values
                    .iter()
                    .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                    .collect();
                items.push((prefix, rendered.join(", ")));
            }
            other => items.push((prefix, other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_a_file() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager {
            config_path: dir.path().join("absent.toml"),
            explicit: false,
        };
        let config = manager.load().unwrap();

        assert_eq!(config.output.out_dir, PathBuf::from("."));
        assert_eq!(config.output.report_format, ReportFormat::Text);
        assert_eq!(config.alias_sets(), CatalogAliasSets::default());
        assert_eq!(config.obscore_config(), ObsCoreConfig::default());
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(dir.path().join("absent.toml"));
        assert!(manager.load().is_err());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[resources]
aliases_file = "/etc/fitsmeta/aliases.ini"

[obscore]
collection = "JWST"
url_prefix = "https://archive.example.org"
image_mount_path = "/images"
ra_aliases = ["ALPHA"]

[output]
report_format = "json"
"#,
        )
        .unwrap();

        let config = ConfigManager::with_path(path).load().unwrap();
        assert_eq!(
            config.resources.aliases_file,
            Some(PathBuf::from("/etc/fitsmeta/aliases.ini"))
        );
        assert_eq!(config.output.report_format, ReportFormat::Json);
        assert_eq!(config.output.out_dir, PathBuf::from("."));

        let obscore = config.obscore_config();
        assert_eq!(obscore.collection.as_deref(), Some("JWST"));
        assert_eq!(obscore.image_mount_path, "/images");

        let sets = config.alias_sets();
        assert_eq!(sets.ra, vec!["ALPHA"]);
        assert_eq!(sets.dec, CatalogAliasSets::default().dec);
    }

    #[test]
    fn test_list_flattens_sections() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[store]\nroot = \"/archive\"\n").unwrap();

        let items = ConfigManager::with_path(path).list().unwrap();
        assert!(items.contains(&("store.root".to_string(), "/archive".to_string())));
        assert!(items.contains(&("output.report_format".to_string(), "text".to_string())));
        assert!(items.iter().any(|(k, v)| k == "obscore.ra_aliases" && v.starts_with("s_ra, ra")));
    }
}
