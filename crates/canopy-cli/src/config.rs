//! Configuration loading.
//!
//! Handles parsing of `canopy.toml`. Every key is optional; command-line
//! flags override whatever the file sets.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "canopy.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config {path}: {message}")]
    Invalid { path: String, message: String },
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the collection files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Search page size when a call omits `maxResults`
    #[serde(default = "default_max_results")]
    pub default_max_results: usize,

    /// Acting user: default reporter and the `atlassianUserInfo` answer
    #[serde(default)]
    pub account_id: Option<String>,

    /// Site identity reported to clients
    #[serde(default)]
    pub site: SiteConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            default_max_results: default_max_results(),
            account_id: None,
            site: SiteConfig::default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".canopy")
}

fn default_max_results() -> usize {
    50
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_cloud_id")]
    pub cloud_id: String,

    #[serde(default = "default_site_name")]
    pub name: String,

    #[serde(default = "default_site_url")]
    pub url: String,
}

fn default_cloud_id() -> String {
    "canopy-local".to_string()
}

fn default_site_name() -> String {
    "canopy".to_string()
}

fn default_site_url() -> String {
    "http://localhost".to_string()
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            cloud_id: default_cloud_id(),
            name: default_site_name(),
            url: default_site_url(),
        }
    }
}

impl Config {
    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate(path)?;
        Ok(config)
    }

    /// Resolve the effective configuration.
    ///
    /// An explicit path must exist. Without one, `canopy.toml` in the working
    /// directory is used when present, otherwise built-in defaults.
    pub fn resolve(explicit: Option<&str>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(Path::new(path));
        }
        let fallback = Path::new(DEFAULT_CONFIG_FILE);
        if fallback.is_file() {
            return Self::load(fallback);
        }
        tracing::debug!("no config file, using defaults");
        Ok(Self::default())
    }

    /// Apply command-line overrides on top of the file values.
    pub fn with_data_dir(mut self, data_dir: Option<String>) -> Self {
        if let Some(dir) = data_dir.filter(|dir| !dir.trim().is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
        self
    }

    fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        if self.default_max_results == 0 {
            return Err(ConfigError::Invalid {
                path: path.display().to_string(),
                message: "default_max_results must be at least 1".to_string(),
            });
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                path: path.display().to_string(),
                message: "data_dir must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "canopy-cli-config-{prefix}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp dir should exist");
        path
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config: Config = toml::from_str("account_id = \"u-7\"").expect("config should parse");
        assert_eq!(config.data_dir, PathBuf::from(".canopy"));
        assert_eq!(config.default_max_results, 50);
        assert_eq!(config.account_id.as_deref(), Some("u-7"));
        assert_eq!(config.site, SiteConfig::default());
    }

    #[test]
    fn load_reads_nested_site_table() {
        let root = temp_dir("site");
        let path = root.join("canopy.toml");
        fs::write(
            &path,
            "data_dir = \"store\"\ndefault_max_results = 20\n\n[site]\ncloud_id = \"c-1\"\nname = \"acme\"\n",
        )
        .expect("config should be written");

        let config = Config::load(&path).expect("config should load");
        assert_eq!(config.data_dir, PathBuf::from("store"));
        assert_eq!(config.default_max_results, 20);
        assert_eq!(config.site.cloud_id, "c-1");
        assert_eq!(config.site.name, "acme");
        assert_eq!(config.site.url, "http://localhost");
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let root = temp_dir("missing");
        let path = root.join("nope.toml");
        let err = Config::resolve(Some(path.to_str().expect("utf8 path")))
            .expect_err("missing explicit config should fail");
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let root = temp_dir("invalid");
        let path = root.join("canopy.toml");
        fs::write(&path, "default_max_results = 0\n").expect("config should be written");
        let err = Config::load(&path).expect_err("zero page size should fail");
        assert!(err.to_string().contains("default_max_results"));

        fs::write(&path, "default_max_results = \"ten\"\n").expect("config should be written");
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn data_dir_flag_overrides_file_value() {
        let config = Config::default().with_data_dir(Some("/tmp/elsewhere".to_string()));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/elsewhere"));
        let config = Config::default().with_data_dir(Some("  ".to_string()));
        assert_eq!(config.data_dir, PathBuf::from(".canopy"));
    }
}
