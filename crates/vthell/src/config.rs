//! Monitor configuration loading.

use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;

use crate::error::ConfigError;

const DEFAULT_RECONNECT_DELAY_SECS: u64 = 5;
// The archive tree only changes when a recording finishes; hourly is plenty.
const DEFAULT_RECORDS_REFRESH_SECS: u64 = 3600;

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Backend base URL, e.g. `http://localhost:12790`.
    pub api_url: String,
    /// Push endpoint URL. Derived from `api_url` when absent.
    #[serde(default)]
    pub websocket_url: Option<String>,
    /// Admin password sent as `Authorization: Password <secret>`.
    pub password: SecretString,
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,
    #[serde(default = "default_records_refresh")]
    pub records_refresh_secs: u64,
}

fn default_reconnect_delay() -> u64 {
    DEFAULT_RECONNECT_DELAY_SECS
}

fn default_records_refresh() -> u64 {
    DEFAULT_RECORDS_REFRESH_SECS
}

impl Config {
    /// The push endpoint to connect to: explicit when configured, otherwise
    /// `api_url` with the scheme swapped to its WebSocket counterpart.
    pub fn websocket_url(&self) -> String {
        if let Some(url) = &self.websocket_url {
            return url.clone();
        }
        if let Some(rest) = self.api_url.strip_prefix("https://") {
            format!("wss://{}/event", rest.trim_end_matches('/'))
        } else if let Some(rest) = self.api_url.strip_prefix("http://") {
            format!("ws://{}/event", rest.trim_end_matches('/'))
        } else {
            self.api_url.clone()
        }
    }
}

/// Platform config file location, `<config dir>/vthell/config.json`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("vthell").join("config.json"))
        .ok_or(ConfigError::NoConfigDir)
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if !config.api_url.starts_with("http://") && !config.api_url.starts_with("https://") {
        return Err(ConfigError::Validation {
            message: format!("api_url must be http(s), got '{}'", config.api_url),
        });
    }
    if let Some(url) = &config.websocket_url {
        if !url.starts_with("ws://") && !url.starts_with("wss://") {
            return Err(ConfigError::Validation {
                message: format!("websocket_url must be ws(s), got '{}'", url),
            });
        }
    }
    if config.reconnect_delay_secs == 0 {
        return Err(ConfigError::Validation {
            message: "reconnect_delay_secs must be at least 1".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_minimal_config() {
        let config = load_config_from_str(
            r#"{"api_url": "http://localhost:12790", "password": "hunter2"}"#,
        )
        .unwrap();
        assert_eq!(config.api_url, "http://localhost:12790");
        assert_eq!(config.reconnect_delay_secs, 5);
        assert_eq!(config.records_refresh_secs, 3600);
        assert_eq!(config.websocket_url(), "ws://localhost:12790/event");
    }

    #[test]
    fn test_explicit_websocket_url_wins() {
        let config = load_config_from_str(
            r#"{
                "api_url": "https://vthell.example.com",
                "websocket_url": "wss://vthell.example.com/ws",
                "password": "hunter2"
            }"#,
        )
        .unwrap();
        assert_eq!(config.websocket_url(), "wss://vthell.example.com/ws");
    }

    #[test]
    fn test_https_derives_wss() {
        let config = load_config_from_str(
            r#"{"api_url": "https://vthell.example.com/", "password": "x"}"#,
        )
        .unwrap();
        assert_eq!(config.websocket_url(), "wss://vthell.example.com/event");
    }

    #[test]
    fn test_rejects_non_http_url() {
        let result =
            load_config_from_str(r#"{"api_url": "ftp://nope", "password": "x"}"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_rejects_zero_reconnect_delay() {
        let result = load_config_from_str(
            r#"{"api_url": "http://localhost", "password": "x", "reconnect_delay_secs": 0}"#,
        );
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            load_config_from_str("{nope"),
            Err(ConfigError::ParseJson(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"api_url": "http://localhost:12790", "password": "hunter2"}"#,
        )
        .unwrap();
        assert!(load_config(&path).is_ok());
        assert!(matches!(
            load_config(dir.path().join("missing.json")),
            Err(ConfigError::ReadFile { .. })
        ));
    }
}
