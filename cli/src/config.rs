//! `grove.toml`. Every key is optional; a missing file means defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use grove_daemon::insights::{GeneratorConfig, DEFAULT_ENDPOINT, DEFAULT_MODEL};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub generator: GeneratorSection,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Defaults to `<local data dir>/grove`.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Keep everything in memory; nothing survives a restart.
    #[serde(default)]
    pub in_memory: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GeneratorSection {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable holding the bearer key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for GeneratorSection {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Also write `grove.log` here.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            log_dir: None,
        }
    }
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 5000 }
fn default_endpoint() -> String { DEFAULT_ENDPOINT.to_string() }
fn default_model() -> String { DEFAULT_MODEL.to_string() }
fn default_api_key_env() -> String { "HF_API_KEY".to_string() }
fn default_timeout_secs() -> u64 { 20 }
fn default_max_tokens() -> u32 { 300 }
fn default_filter() -> String { "info,surrealdb=warn".to_string() }

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn data_dir(&self) -> PathBuf {
        self.storage
            .data_dir
            .clone()
            .or_else(|| dirs::data_local_dir().map(|d| d.join("grove")))
            .unwrap_or_else(|| PathBuf::from("grove-data"))
    }

    /// The key is read from the environment, never from the file.
    pub fn generator(&self) -> GeneratorConfig {
        GeneratorConfig {
            endpoint: self.generator.endpoint.clone(),
            model: self.generator.model.clone(),
            api_key: std::env::var(&self.generator.api_key_env).ok(),
            timeout: Duration::from_secs(self.generator.timeout_secs),
            max_tokens: self.generator.max_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("grove.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.generator.model, DEFAULT_MODEL);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grove.toml");
        std::fs::write(
            &path,
            "[server]\nport = 8081\n\n[storage]\ndata_dir = \"/var/lib/grove\"\n\n[generator]\ntimeout_secs = 5\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.data_dir(), PathBuf::from("/var/lib/grove"));
        assert_eq!(config.generator().timeout, Duration::from_secs(5));
        assert_eq!(config.generator.api_key_env, "HF_API_KEY");
    }

    #[test]
    fn unknown_keys_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grove.toml");
        std::fs::write(&path, "[server]\nprot = 8081\n").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn api_key_comes_from_named_variable() {
        let config = Config {
            generator: GeneratorSection {
                api_key_env: "GROVE_TEST_UNSET_KEY_VARIABLE".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(config.generator().api_key, None);
    }
}
