use crate::client::DEFAULT_GENERATE_PATH;
use crate::session::store::HistoryScope;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const ENV_SQLWRITER_CONFIG: &str = "SQLWRITER_CONFIG";

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8001";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_START_LOCATION: &str = "/";
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndpointConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_generate_path")]
    pub generate_path: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default)]
    pub history_scope: HistoryScope,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UiConfig {
    #[serde(default = "default_start_location")]
    pub start_location: String,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_generate_path() -> String {
    DEFAULT_GENERATE_PATH.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_start_location() -> String {
    DEFAULT_START_LOCATION.to_string()
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            generate_path: default_generate_path(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            start_location: default_start_location(),
            log_filter: default_log_filter(),
        }
    }
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("USERPROFILE").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn app_dir() -> PathBuf {
    home_dir().join(".sqlwriter")
}

pub fn default_config_path() -> PathBuf {
    app_dir().join("config.toml")
}

impl EndpointConfig {
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn generate_url(&self) -> String {
        let path = self.generate_path.trim_start_matches('/');
        format!("{}/{path}", self.base())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl StorageConfig {
    pub fn storage_dir(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| app_dir().join("storage"))
    }
}

impl AppConfig {
    /// `SQLWRITER_CONFIG` must point at a readable file. Without it, the
    /// default location is optional and falls back to built-in defaults.
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var_os(ENV_SQLWRITER_CONFIG) {
            Some(path) => Self::from_path(Path::new(&path)),
            None => {
                let path = default_config_path();
                if path.exists() {
                    Self::from_path(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError};
    use crate::session::store::HistoryScope;
    use std::fs;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn empty_document_uses_defaults() {
        let config: AppConfig = toml::from_str("").expect("empty config should parse");
        assert_eq!(config, AppConfig::default());
        assert_eq!(
            config.endpoint.generate_url(),
            "http://127.0.0.1:8001/-/llm-sql-writer/generate"
        );
        assert_eq!(config.storage.history_scope, HistoryScope::Global);
        assert_eq!(config.ui.start_location, "/");
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
[endpoint]
base_url = "https://data.example.com/"
timeout_secs = 30

[storage]
dir = "/var/lib/sqlwriter"
history_scope = "per_scope"
"#,
        )
        .expect("partial config should parse");

        assert_eq!(
            config.endpoint.generate_url(),
            "https://data.example.com/-/llm-sql-writer/generate"
        );
        assert_eq!(config.endpoint.timeout(), Duration::from_secs(30));
        assert_eq!(
            config.storage.storage_dir(),
            PathBuf::from("/var/lib/sqlwriter")
        );
        assert_eq!(config.storage.history_scope, HistoryScope::PerScope);
        assert_eq!(config.ui.log_filter, "info");
    }

    #[test]
    fn from_path_reads_file() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[ui]\nstart_location = \"/fixtures/people\"\n")
            .expect("config fixture should write");

        let config = AppConfig::from_path(&path).expect("config should load");
        assert_eq!(config.ui.start_location, "/fixtures/people");
    }

    #[test]
    fn missing_explicit_file_is_a_read_error() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let err = AppConfig::from_path(&dir.path().join("absent.toml"))
            .expect_err("missing file should fail");
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn invalid_history_scope_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[storage]\nhistory_scope = \"per_table\"\n")
            .expect("config fixture should write");

        let err = AppConfig::from_path(&path).expect_err("unknown scope should fail");
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.toml"));
    }
}
