//! Application configuration (`klinelab.toml`).
//!
//! ```toml
//! [api]
//! base_url = "https://api-testnet.bybit.com"
//! recv_window = 5000
//! timeout_secs = 30
//!
//! [credentials]
//! api_key = "..."
//! api_secret = "..."
//! ```
//!
//! Every field is optional. `KLINELAB_API_KEY`, `KLINELAB_API_SECRET` and
//! `KLINELAB_BASE_URL` override the file.

use crate::data::DataError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

pub const DEFAULT_BASE_URL: &str = "https://api-testnet.bybit.com";
pub const DEFAULT_RECV_WINDOW: u64 = 5000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONFIG_FILE: &str = "klinelab.toml";

pub const ENV_API_KEY: &str = "KLINELAB_API_KEY";
pub const ENV_API_SECRET: &str = "KLINELAB_API_SECRET";
pub const ENV_BASE_URL: &str = "KLINELAB_BASE_URL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Milliseconds a signed request stays valid on the server.
    pub recv_window: u64,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            recv_window: DEFAULT_RECV_WINDOW,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// API key pair. `Debug` never prints the secret.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

impl Credentials {
    pub fn is_complete(&self) -> bool {
        !self.api_key.is_empty() && !self.api_secret.is_empty()
    }

    /// Copy with the secret masked, for display.
    pub fn redacted(&self) -> Self {
        Self {
            api_key: self.api_key.clone(),
            api_secret: if self.api_secret.is_empty() {
                String::new()
            } else {
                "********".to_string()
            },
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
}

impl AppConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, DataError> {
        toml::from_str(text).map_err(|e| DataError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, DataError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| DataError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Load `path` if given, else `klinelab.toml` when it exists, else
    /// defaults. Environment overrides are applied last.
    pub fn resolve(path: Option<&Path>) -> Result<Self, DataError> {
        let config = match path {
            Some(p) => Self::load(p)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::load(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    /// Apply overrides from a variable lookup. Empty values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_BASE_URL) {
            self.api.base_url = url;
        }
        let key = get(ENV_API_KEY);
        let secret = get(ENV_API_SECRET);
        if key.is_some() || secret.is_some() {
            let creds = self.credentials.get_or_insert_with(Credentials::default);
            if let Some(k) = key {
                creds.api_key = k;
            }
            if let Some(s) = secret {
                creds.api_secret = s;
            }
        }
        self
    }

    pub fn to_toml_string(&self) -> Result<String, DataError> {
        toml::to_string_pretty(self).map_err(|e| DataError::Config(e.to_string()))
    }

    /// Effective configuration with the secret masked.
    pub fn redacted(&self) -> Self {
        Self {
            api: self.api.clone(),
            credentials: self.credentials.as_ref().map(Credentials::redacted),
        }
    }

    /// Starter file written by `klinelab config init`.
    pub fn template() -> String {
        format!(
            "[api]\n\
             base_url = \"{DEFAULT_BASE_URL}\"\n\
             recv_window = {DEFAULT_RECV_WINDOW}\n\
             timeout_secs = {DEFAULT_TIMEOUT_SECS}\n\
             \n\
             # The kline endpoint is public; credentials are optional.\n\
             [credentials]\n\
             api_key = \"\"\n\
             api_secret = \"\"\n"
        )
    }
}
