//! Where the CLI looks for its configuration

use std::env;
use std::path::PathBuf;

/// Directory name used below the platform config root
const APP_CONFIG_DIR: &str = "fitsmeta";

/// The configuration file name
const CONFIG_FILE: &str = "config.toml";

/// Returns the configuration directory
///
/// `$XDG_CONFIG_HOME/fitsmeta` when the variable is set, otherwise the
/// platform config directory (`~/.config/fitsmeta` on Linux,
/// `%APPDATA%/fitsmeta` on Windows). Falls back to `.fitsmeta` in the current
/// directory when neither can be determined.
pub fn get_config_dir() -> PathBuf {
    if let Some(xdg) = env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(xdg).join(APP_CONFIG_DIR);
    }
    dirs::config_dir()
        .map(|d| d.join(APP_CONFIG_DIR))
        .unwrap_or_else(|| PathBuf::from(".fitsmeta"))
}

/// Returns the path to the default configuration file
pub fn get_config_path() -> PathBuf {
    get_config_dir().join(CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_is_in_config_dir() {
        let config_path = get_config_path();
        let config_dir = get_config_dir();

        assert!(
            config_path.starts_with(&config_dir),
            "Config path {} should be under config dir {}",
            config_path.display(),
            config_dir.display()
        );
    }

    #[test]
    fn test_config_file_name() {
        assert_eq!(
            get_config_path().file_name().and_then(|n| n.to_str()),
            Some(CONFIG_FILE)
        );
        assert!(get_config_dir().to_string_lossy().contains("fitsmeta"));
    }
}
