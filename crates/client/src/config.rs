//! Client configuration: optional TOML file, then environment overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use reqwest::header::HeaderName;
use serde::Deserialize;
use storefront_observability::LogFormat;
use thiserror::Error;

pub const ENV_CONFIG: &str = "STOREFRONT_CONFIG";
pub const ENV_AUTH_URL: &str = "STOREFRONT_AUTH_URL";
pub const ENV_API_URL: &str = "STOREFRONT_API_URL";
pub const ENV_SESSION_PATH: &str = "STOREFRONT_SESSION_PATH";
pub const ENV_LOG_FORMAT: &str = "STOREFRONT_LOG_FORMAT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Logging {
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Identity backend endpoint (`?action=` routed).
    #[serde(default = "ClientConfig::default_auth_url")]
    pub auth_url: String,

    /// Content/admin backend endpoint (`?action=` routed).
    #[serde(default = "ClientConfig::default_api_url")]
    pub api_url: String,

    /// Header carrying `Bearer <token>`.
    #[serde(default = "ClientConfig::default_token_header")]
    pub token_header: String,

    #[serde(default = "ClientConfig::default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Session file; the platform data directory when unset.
    #[serde(default)]
    pub session_path: Option<PathBuf>,

    #[serde(default)]
    pub logging: Logging,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            auth_url: Self::default_auth_url(),
            api_url: Self::default_api_url(),
            token_header: Self::default_token_header(),
            request_timeout_ms: Self::default_request_timeout_ms(),
            session_path: None,
            logging: Logging::default(),
        }
    }
}

impl ClientConfig {
    fn default_auth_url() -> String {
        "http://127.0.0.1:8080/auth".to_string()
    }

    fn default_api_url() -> String {
        "http://127.0.0.1:8080/admin".to_string()
    }

    fn default_token_header() -> String {
        "Authorization".to_string()
    }

    fn default_request_timeout_ms() -> u64 {
        10_000
    }

    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Read `path` if given, otherwise start from defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text, path)
    }

    /// Full resolution used by the binary: file (explicit or `STOREFRONT_CONFIG`),
    /// then environment overrides, then validation.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let from_env = std::env::var_os(ENV_CONFIG).map(PathBuf::from);
        let mut config = Self::load(path.or(from_env.as_deref()))?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from environment-style lookups.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(url) = lookup(ENV_AUTH_URL) {
            self.auth_url = url;
        }
        if let Some(url) = lookup(ENV_API_URL) {
            self.api_url = url;
        }
        if let Some(path) = lookup(ENV_SESSION_PATH) {
            self.session_path = Some(PathBuf::from(path));
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT) {
            self.logging.format = format
                .parse()
                .map_err(|e| ConfigError::invalid("logging.format", format!("{e}")))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, url) in [("auth_url", &self.auth_url), ("api_url", &self.api_url)] {
            let parsed = Url::parse(url).map_err(|e| ConfigError::invalid(field, e.to_string()))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::invalid(field, "scheme must be http or https"));
            }
        }
        HeaderName::from_bytes(self.token_header.as_bytes())
            .map_err(|e| ConfigError::invalid("token_header", e.to_string()))?;
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::invalid("request_timeout_ms", "must be positive"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Configured session path, or the platform default.
    pub fn session_path(&self) -> anyhow::Result<PathBuf> {
        match &self.session_path {
            Some(path) => Ok(path.clone()),
            None => crate::session_store::default_session_path(),
        }
    }
}
