//! Client configuration via `docmeta.toml`
//!
//! A small TOML file names the cluster to connect to, the credentials and
//! the filter defaults. Query parameters on the connection string override
//! the `[filter]` values at connect time.

use crate::query::DEFAULT_ID_COLUMN;
use docmeta_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "docmeta.toml";

/// Connection string used when none is configured.
pub const DEFAULT_CONNECTION_STRING: &str = "docmeta://localhost";

/// `[credentials]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialsConfig {
    /// User name
    #[serde(default)]
    pub username: String,
    /// Password
    #[serde(default)]
    pub password: String,
}

/// `[filter]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterConfig {
    /// Probe workers; 1 means sequential
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Return matches in listing order
    #[serde(default = "default_preserve_order")]
    pub preserve_order: bool,
    /// Column of query rows holding the document id
    #[serde(default = "default_id_column")]
    pub id_column: String,
}

fn default_workers() -> usize {
    1
}

fn default_preserve_order() -> bool {
    true
}

fn default_id_column() -> String {
    DEFAULT_ID_COLUMN.to_string()
}

fn default_connection_string() -> String {
    DEFAULT_CONNECTION_STRING.to_string()
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            preserve_order: default_preserve_order(),
            id_column: default_id_column(),
        }
    }
}

/// Client configuration loaded from `docmeta.toml`.
///
/// # Example
///
/// ```toml
/// connection_string = "docmeta://localhost"
///
/// [credentials]
/// username = "Administrator"
/// password = "password"
///
/// [filter]
/// workers = 1
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    /// `docmeta://host[:port][,host...][?key=value&...]`
    #[serde(default = "default_connection_string")]
    pub connection_string: String,
    /// Credentials presented at connect time
    #[serde(default)]
    pub credentials: CredentialsConfig,
    /// Filter workflow defaults
    #[serde(default)]
    pub filter: FilterConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connection_string: default_connection_string(),
            credentials: CredentialsConfig::default(),
            filter: FilterConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Check values that parse but cannot be used.
    pub fn validate(&self) -> Result<()> {
        if self.connection_string.trim().is_empty() {
            return Err(Error::Config("connection_string must not be empty".to_string()));
        }
        if self.filter.workers == 0 {
            return Err(Error::Config(
                "filter.workers must be at least 1".to_string(),
            ));
        }
        if self.filter.id_column.is_empty() {
            return Err(Error::Config("filter.id_column must not be empty".to_string()));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# docmeta client configuration
#
# Hosts are tried in order. Query parameters override [filter]:
#   docmeta://db1,db2?workers=4&preserve_order=false
connection_string = "docmeta://localhost"

[credentials]
username = ""
password = ""

[filter]
# Probe workers (default: 1 = sequential)
workers = 1
# Keep matches in listing order when probing in parallel (default: true)
preserve_order = true
# Column of query rows that holds the document id (default: "id")
id_column = "id"
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// `Config` if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: ClientConfig = toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::Config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_toml_parses_to_default() {
        let config: ClientConfig = toml::from_str(ClientConfig::default_toml()).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn missing_sections_use_defaults() {
        let config: ClientConfig =
            toml::from_str("connection_string = \"docmeta://db1\"").unwrap();
        assert_eq!(config.connection_string, "docmeta://db1");
        assert_eq!(config.filter.workers, 1);
        assert!(config.filter.preserve_order);
        assert_eq!(config.filter.id_column, "id");
        assert!(config.credentials.username.is_empty());
    }

    #[test]
    fn zero_workers_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[filter]\nworkers = 0\n").unwrap();
        assert!(matches!(ClientConfig::from_file(&path), Err(Error::Config(_))));
    }

    #[test]
    fn unparseable_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "workers = [").unwrap();
        assert!(matches!(ClientConfig::from_file(&path), Err(Error::Config(_))));
    }

    #[test]
    fn write_default_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        assert!(!path.exists());

        ClientConfig::write_default_if_missing(&path).unwrap();
        assert!(path.exists());
        assert_eq!(ClientConfig::from_file(&path).unwrap(), ClientConfig::default());
    }

    #[test]
    fn write_default_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "connection_string = \"docmeta://custom\"\n").unwrap();

        ClientConfig::write_default_if_missing(&path).unwrap();
        let config = ClientConfig::from_file(&path).unwrap();
        assert_eq!(config.connection_string, "docmeta://custom");
    }

    #[test]
    fn write_to_file_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let mut config = ClientConfig::default();
        config.credentials.username = "Administrator".to_string();
        config.filter.workers = 4;

        config.write_to_file(&path).unwrap();
        assert_eq!(ClientConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let err = ClientConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
