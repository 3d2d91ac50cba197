use anyhow::{Context, Result};
use file_search_store_core::client::ClientOptions;
use file_search_store_core::poll::{PollOptions, DEFAULT_POLL_INTERVAL_MS, DEFAULT_POLL_TIMEOUT_MS};
use file_search_store_core::query::DEFAULT_MODEL;
use serde::Deserialize;
use std::path::Path;

/// Where `gfss` looks for its config when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "./config/gfss.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Takes precedence over `GEMINI_API_KEY` / `GOOGLE_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            api_key: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/".to_string()
}
fn default_request_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollingConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}
fn default_timeout_ms() -> u64 {
    DEFAULT_POLL_TIMEOUT_MS
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}
fn default_cache_ttl_secs() -> u64 {
    30
}

impl Config {
    pub fn poll_options(&self) -> PollOptions {
        PollOptions::from_millis(self.polling.interval_ms, self.polling.timeout_ms)
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            default_model: self.client.model.clone(),
            poll: self.poll_options(),
        }
    }
}

/// Loads and validates the config at `path`.
///
/// When `explicit` is false and the file does not exist, built-in defaults
/// are used instead.
pub fn load_config(path: &Path, explicit: bool) -> Result<Config> {
    if !explicit && !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.polling.interval_ms == 0 {
        anyhow::bail!("polling.interval_ms must be > 0");
    }

    if config.client.model.trim().is_empty() {
        anyhow::bail!("client.model must not be empty");
    }

    let base = url::Url::parse(&config.client.base_url)
        .with_context(|| format!("client.base_url is not a valid URL: {}", config.client.base_url))?;
    if base.cannot_be_a_base() {
        anyhow::bail!("client.base_url must be an absolute URL");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_default_path_uses_defaults() {
        let config = load_config(Path::new("/nonexistent/gfss.toml"), false).unwrap();
        assert_eq!(config.client.model, DEFAULT_MODEL);
        assert_eq!(config.polling.interval_ms, 2000);
        assert_eq!(config.polling.timeout_ms, 300_000);
        assert_eq!(config.server.bind, "127.0.0.1:3000");
        assert_eq!(config.server.cache_ttl_secs, 30);
    }

    #[test]
    fn test_missing_explicit_path_is_error() {
        assert!(load_config(Path::new("/nonexistent/gfss.toml"), true).is_err());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let file = write_config(
            r#"
[client]
model = "gemini-2.5-flash"

[polling]
timeout_ms = 60000
"#,
        );
        let config = load_config(file.path(), true).unwrap();
        assert_eq!(config.client.model, "gemini-2.5-flash");
        assert_eq!(config.client.request_timeout_secs, 120);
        assert_eq!(config.polling.interval_ms, 2000);
        assert_eq!(config.poll_options(), PollOptions::from_millis(2000, 60_000));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let file = write_config("[polling]\ninterval_ms = 0\n");
        let err = load_config(file.path(), true).unwrap_err();
        assert!(err.to_string().contains("interval_ms"));
    }

    #[test]
    fn test_bad_base_url_rejected() {
        let file = write_config("[client]\nbase_url = \"not a url\"\n");
        assert!(load_config(file.path(), true).is_err());
    }

    #[test]
    fn test_explicit_api_key_wins() {
        let file = write_config("[client]\napi_key = \"from-config\"\n");
        let config = load_config(file.path(), true).unwrap();
        assert_eq!(config.client.api_key.as_deref(), Some("from-config"));
        assert!(crate::rest::build_client(&config).is_ok());
    }
}
