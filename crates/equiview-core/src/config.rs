use crate::error::{Result, WorkspaceError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Set programmatically by the host
    Override,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Override => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

/// Layered configuration for the workspace client
#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    pub api_base_url: ConfigValue<String>,
    pub request_timeout_secs: ConfigValue<u64>,
    pub download_dir: ConfigValue<PathBuf>,
    pub token_path: ConfigValue<PathBuf>,
}

impl WorkspaceConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            api_base_url: ConfigValue::new(DEFAULT_API_BASE_URL.to_string(), ConfigSource::Default),
            request_timeout_secs: ConfigValue::new(30, ConfigSource::Default),
            download_dir: ConfigValue::new(PathBuf::from("reports"), ConfigSource::Default),
            token_path: ConfigValue::new(PathBuf::from("session.json"), ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| WorkspaceError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| WorkspaceError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(url) = file_config.api_base_url {
            self.api_base_url.update(parse_base_url(&url)?, ConfigSource::File);
        }

        if let Some(timeout) = file_config.request_timeout_secs {
            self.request_timeout_secs.update(validate_timeout(timeout)?, ConfigSource::File);
        }

        if let Some(dir) = file_config.download_dir {
            self.download_dir.update(dir, ConfigSource::File);
        }

        if let Some(path) = file_config.token_path {
            self.token_path.update(path, ConfigSource::File);
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        // EQUIVIEW_API_URL
        if let Ok(url) = env::var("EQUIVIEW_API_URL") {
            match parse_base_url(&url) {
                Ok(url) => self.api_base_url.update(url, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid EQUIVIEW_API_URL value '{}': expected an http(s) URL",
                    url
                ),
            }
        }

        // EQUIVIEW_REQUEST_TIMEOUT
        if let Ok(timeout_str) = env::var("EQUIVIEW_REQUEST_TIMEOUT") {
            match timeout_str.parse::<u64>() {
                Ok(timeout) if timeout > 0 => {
                    self.request_timeout_secs.update(timeout, ConfigSource::Environment)
                }
                _ => tracing::warn!(
                    "Invalid EQUIVIEW_REQUEST_TIMEOUT value '{}': expected a positive number of seconds",
                    timeout_str
                ),
            }
        }

        // EQUIVIEW_DOWNLOAD_DIR
        if let Ok(dir) = env::var("EQUIVIEW_DOWNLOAD_DIR") {
            self.download_dir.update(PathBuf::from(dir), ConfigSource::Environment);
        }

        // EQUIVIEW_TOKEN_PATH
        if let Ok(path) = env::var("EQUIVIEW_TOKEN_PATH") {
            self.token_path.update(PathBuf::from(path), ConfigSource::Environment);
        }

        self
    }

    /// Apply host-provided overrides
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) -> Result<()> {
        if let Some(url) = overrides.api_base_url {
            self.api_base_url.update(parse_base_url(&url)?, ConfigSource::Override);
        }

        if let Some(timeout) = overrides.request_timeout_secs {
            self.request_timeout_secs
                .update(validate_timeout(timeout)?, ConfigSource::Override);
        }

        if let Some(dir) = overrides.download_dir {
            self.download_dir.update(dir, ConfigSource::Override);
        }

        if let Some(path) = overrides.token_path {
            self.token_path.update(path, ConfigSource::Override);
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.value)
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert(
            "api_base_url".to_string(),
            (self.api_base_url.value.clone(), self.api_base_url.source),
        );

        map.insert(
            "request_timeout_secs".to_string(),
            (format!("{}s", self.request_timeout_secs.value), self.request_timeout_secs.source),
        );

        map.insert(
            "download_dir".to_string(),
            (self.download_dir.value.display().to_string(), self.download_dir.source),
        );

        map.insert(
            "token_path".to_string(),
            (self.token_path.value.display().to_string(), self.token_path.source),
        );

        map
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    api_base_url: Option<String>,
    request_timeout_secs: Option<u64>,
    download_dir: Option<PathBuf>,
    token_path: Option<PathBuf>,
}

/// Host-provided configuration overrides
#[derive(Debug, Default)]
pub struct ConfigOverrides {
    pub api_base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub download_dir: Option<PathBuf>,
    pub token_path: Option<PathBuf>,
}

/// Normalize an API base URL, dropping any trailing slash
pub fn parse_base_url(s: &str) -> Result<String> {
    let trimmed = s.trim().trim_end_matches('/');
    let host = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"));

    match host {
        Some(rest) if !rest.is_empty() => Ok(trimmed.to_string()),
        _ => Err(WorkspaceError::ConfigInvalid {
            key: "api_base_url".to_string(),
            reason: format!("Invalid API URL: {}. Use an http:// or https:// URL with a host", s),
        }),
    }
}

fn validate_timeout(secs: u64) -> Result<u64> {
    if secs == 0 {
        return Err(WorkspaceError::ConfigInvalid {
            key: "request_timeout_secs".to_string(),
            reason: "must be greater than 0".to_string(),
        });
    }
    Ok(secs)
}
