//! Layered configuration for the issue board.
//!
//! Settings resolve in order (later wins):
//! 1. `issueboard.toml` in the working directory (or `--config PATH`)
//! 2. `.env`, loaded into the process environment with `dotenvy`
//! 3. Environment variables
//! 4. CLI flags, applied by the command that needs them
//!
//! # Configuration File Format
//!
//! ```toml
//! [store]
//! url = "https://project.example.co"
//! key = "public-anon-key"
//! table = "issues"
//! timeout_secs = 10
//!
//! [server]
//! port = 3142
//!
//! [log]
//! level = "info"
//! format = "text"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

pub const CONFIG_FILE: &str = "issueboard.toml";

pub const ENV_STORE_URL: &str = "ISSUEBOARD_STORE_URL";
pub const ENV_STORE_KEY: &str = "ISSUEBOARD_STORE_KEY";
pub const ENV_STORE_TABLE: &str = "ISSUEBOARD_STORE_TABLE";
pub const ENV_PORT: &str = "ISSUEBOARD_PORT";
pub const ENV_LOG_FORMAT: &str = "ISSUEBOARD_LOG_FORMAT";

pub const DEFAULT_TABLE: &str = "issues";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_PORT: u16 = 3142;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!(
                "Invalid log format '{}'. Valid values: text, json",
                s
            )),
        }
    }
}

/// The store access key. Formatting never reveals it; use `expose()` to
/// put it on the wire.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessKey(String);

impl AccessKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessKey(********)")
    }
}

impl fmt::Display for AccessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("********")
    }
}

// ── File sections ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSection {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default)]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogSection {
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub format: Option<LogFormat>,
}

/// The complete issueboard.toml structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardToml {
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub log: LogSection,
}

impl BoardToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Default configuration when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

// ── Resolved configuration ────────────────────────────────────────────

/// Connection parameters for the hosted issues table.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub url: String,
    pub key: AccessKey,
    pub table: String,
    pub timeout: Duration,
}

/// File and environment merged. Store parameters stay optional here so
/// commands that never touch the store can run without them.
#[derive(Debug, Clone)]
pub struct BoardConfig {
    pub source: Option<PathBuf>,
    pub store_url: Option<String>,
    pub store_key: Option<AccessKey>,
    pub table: String,
    pub timeout: Duration,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl BoardConfig {
    /// Load `.env`, then the config file, then the process environment.
    ///
    /// An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        // A missing .env is normal.
        let _ = dotenvy::dotenv();

        let (file, source) = match path {
            Some(p) => (BoardToml::load(p)?, Some(p.to_path_buf())),
            None => {
                let default = Path::new(CONFIG_FILE);
                let source = default.exists().then(|| default.to_path_buf());
                (BoardToml::load_or_default(default)?, source)
            }
        };

        let mut config = Self::resolve(file, |name| std::env::var(name).ok())?;
        config.source = source;
        Ok(config)
    }

    /// Merge a parsed file with an environment lookup. Empty values count
    /// as unset.
    pub fn resolve(
        file: BoardToml,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let env = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        let store_url = env(ENV_STORE_URL).or(file.store.url);
        let store_key = env(ENV_STORE_KEY).or(file.store.key).map(AccessKey::new);
        let table = env(ENV_STORE_TABLE)
            .or(file.store.table)
            .unwrap_or_else(|| DEFAULT_TABLE.to_string());

        let port = match env(ENV_PORT) {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: ENV_PORT,
                value: raw,
            })?,
            None => file.server.port.unwrap_or(DEFAULT_PORT),
        };

        let log_format = match env(ENV_LOG_FORMAT) {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                name: ENV_LOG_FORMAT,
                value: raw,
            })?,
            None => file.log.format.unwrap_or_default(),
        };

        Ok(Self {
            source: None,
            store_url,
            store_key,
            table,
            timeout: Duration::from_secs(file.store.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            port,
            log_level: file
                .log
                .level
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            log_format,
        })
    }

    /// Store parameters, or the configuration error that must abort startup.
    pub fn store(&self) -> Result<StoreConfig, ConfigError> {
        let url = self
            .store_url
            .clone()
            .ok_or(ConfigError::Missing { name: ENV_STORE_URL })?;
        let key = self
            .store_key
            .clone()
            .ok_or(ConfigError::Missing { name: ENV_STORE_KEY })?;

        let parsed = reqwest::Url::parse(&url).map_err(|e| ConfigError::InvalidUrl {
            url: url.clone(),
            message: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl {
                message: format!("unsupported scheme '{}'", parsed.scheme()),
                url,
            });
        }

        Ok(StoreConfig {
            url,
            key,
            table: self.table.clone(),
            timeout: self.timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_without_file_or_env() {
        let config = BoardConfig::resolve(BoardToml::default(), no_env).unwrap();
        assert_eq!(config.table, "issues");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.port, 3142);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.store_url.is_none());
    }

    #[test]
    fn test_parse_full_file() {
        let content = r#"
[store]
url = "https://board.example.co"
key = "anon"
table = "tickets"
timeout_secs = 3

[server]
port = 8080

[log]
level = "debug"
format = "json"
"#;
        let file = BoardToml::parse(content, Path::new(CONFIG_FILE)).unwrap();
        let config = BoardConfig::resolve(file, no_env).unwrap();
        assert_eq!(config.store_url.as_deref(), Some("https://board.example.co"));
        assert_eq!(config.table, "tickets");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.port, 8080);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_env_overrides_file() {
        let file = BoardToml {
            store: StoreSection {
                url: Some("https://file.example.co".into()),
                key: Some("file-key".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let env = env_of(&[
            (ENV_STORE_URL, "https://env.example.co"),
            (ENV_STORE_TABLE, "board_issues"),
            (ENV_PORT, "9000"),
            (ENV_LOG_FORMAT, "JSON"),
        ]);
        let config = BoardConfig::resolve(file, env).unwrap();
        assert_eq!(config.store_url.as_deref(), Some("https://env.example.co"));
        assert_eq!(config.store_key.as_ref().map(|k| k.expose()), Some("file-key"));
        assert_eq!(config.table, "board_issues");
        assert_eq!(config.port, 9000);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_empty_env_value_counts_as_unset() {
        let env = env_of(&[(ENV_STORE_URL, "  ")]);
        let config = BoardConfig::resolve(BoardToml::default(), env).unwrap();
        assert!(config.store_url.is_none());
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let env = env_of(&[(ENV_PORT, "not-a-port")]);
        let err = BoardConfig::resolve(BoardToml::default(), env).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: ENV_PORT, .. }));
    }

    #[test]
    fn test_missing_url_is_fatal() {
        let env = env_of(&[(ENV_STORE_KEY, "anon")]);
        let config = BoardConfig::resolve(BoardToml::default(), env).unwrap();
        let err = config.store().unwrap_err();
        assert!(matches!(err, ConfigError::Missing { name: ENV_STORE_URL }));
    }

    #[test]
    fn test_missing_key_is_fatal() {
        let env = env_of(&[(ENV_STORE_URL, "https://board.example.co")]);
        let config = BoardConfig::resolve(BoardToml::default(), env).unwrap();
        let err = config.store().unwrap_err();
        assert!(matches!(err, ConfigError::Missing { name: ENV_STORE_KEY }));
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        for url in ["not a url", "ftp://board.example.co"] {
            let env = env_of(&[(ENV_STORE_URL, url), (ENV_STORE_KEY, "anon")]);
            let config = BoardConfig::resolve(BoardToml::default(), env).unwrap();
            assert!(matches!(
                config.store().unwrap_err(),
                ConfigError::InvalidUrl { .. }
            ));
        }
    }

    #[test]
    fn test_store_config_carries_settings() {
        let env = env_of(&[
            (ENV_STORE_URL, "https://board.example.co"),
            (ENV_STORE_KEY, "anon"),
        ]);
        let store = BoardConfig::resolve(BoardToml::default(), env)
            .unwrap()
            .store()
            .unwrap();
        assert_eq!(store.url, "https://board.example.co");
        assert_eq!(store.key.expose(), "anon");
        assert_eq!(store.table, "issues");
    }

    #[test]
    fn test_access_key_is_masked() {
        let key = AccessKey::new("super-secret");
        assert!(!format!("{}", key).contains("super-secret"));
        assert!(!format!("{:?}", key).contains("super-secret"));
        let store = StoreConfig {
            url: "https://board.example.co".into(),
            key,
            table: "issues".into(),
            timeout: Duration::from_secs(1),
        };
        assert!(!format!("{:?}", store).contains("super-secret"));
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[store\nurl = 1").unwrap();
        let err = BoardToml::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_or_default_without_file() {
        let dir = tempdir().unwrap();
        let toml = BoardToml::load_or_default(&dir.path().join(CONFIG_FILE)).unwrap();
        assert!(toml.store.url.is_none());
    }

    #[test]
    fn test_explicit_missing_file_is_read_error() {
        let dir = tempdir().unwrap();
        let err = BoardToml::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
