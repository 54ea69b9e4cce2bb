//! Connection configuration for the Algolia backend.
//!
//! Configuration can be built programmatically, deserialized with `serde`,
//! or read from a host-framework style option map with
//! [`AlgoliaConfig::from_options`].
//!
//! # Options
//!
//! | Option | Required | Description |
//! |--------|----------|-------------|
//! | `APP_ID` | yes | Algolia application id |
//! | `API_KEY` | yes | Secret API key |
//! | `INDEX_NAME` | one of | Single index shared by every model |
//! | `INDEX_NAME_PREFIX` | one of | Prefix of per-model index names (may be empty) |
//! | `OPTIONAL_WORDS` | no | Words that are optional in every query |
//!
//! # Example
//!
//! ```
//! use haystack_algolia::AlgoliaConfig;
//!
//! let config = AlgoliaConfig {
//!     app_id: "APPID".to_string(),
//!     api_key: "secret".to_string(),
//!     index_name_prefix: Some("prod_".to_string()),
//!     ..Default::default()
//! };
//! assert!(config.validate("default").is_ok());
//! ```

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::ConfigurationError;

/// How model names map to remote index names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexNaming {
    /// Every model shares this one index.
    Single(String),
    /// Each model gets `{prefix}{app_label}.{model_name}`.
    Prefixed(String),
}

/// Configuration for the Algolia backend.
#[derive(Clone, Serialize, Deserialize)]
pub struct AlgoliaConfig {
    /// Algolia application id.
    #[serde(default)]
    pub app_id: String,

    /// Algolia API key with write access.
    #[serde(default)]
    pub api_key: String,

    /// Single index name. Takes precedence over `index_name_prefix`.
    #[serde(default)]
    pub index_name: Option<String>,

    /// Prefix used to derive per-model index names.
    #[serde(default)]
    pub index_name_prefix: Option<String>,

    /// Words treated as optional in every query.
    #[serde(default)]
    pub optional_words: Option<Vec<String>>,

    /// Request timeout in milliseconds (default: 30000).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Connect timeout in milliseconds (default: 5000).
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Ask the service for per-hit ranking information (default: false).
    #[serde(default)]
    pub get_ranking_info: bool,

    /// Override of the read host (default: `https://{app_id}-dsn.algolia.net`).
    #[serde(default)]
    pub read_host: Option<String>,

    /// Override of the write host (default: `https://{app_id}.algolia.net`).
    #[serde(default)]
    pub write_host: Option<String>,
}

fn default_request_timeout_ms() -> u64 {
    30000
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

impl Default for AlgoliaConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            api_key: String::new(),
            index_name: None,
            index_name_prefix: None,
            optional_words: None,
            request_timeout_ms: default_request_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            get_ranking_info: false,
            read_host: None,
            write_host: None,
        }
    }
}

impl fmt::Debug for AlgoliaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlgoliaConfig")
            .field("app_id", &self.app_id)
            .field("api_key", &"<redacted>")
            .field("index_name", &self.index_name)
            .field("index_name_prefix", &self.index_name_prefix)
            .field("optional_words", &self.optional_words)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("get_ranking_info", &self.get_ranking_info)
            .field("read_host", &self.read_host)
            .field("write_host", &self.write_host)
            .finish()
    }
}

impl AlgoliaConfig {
    /// Builds a configuration from a host-framework option map.
    pub fn from_options(
        alias: &str,
        options: &HashMap<String, Value>,
    ) -> Result<Self, ConfigurationError> {
        let text = |key: &str| -> Result<Option<String>, ConfigurationError> {
            match options.get(key) {
                None | Some(Value::Null) => Ok(None),
                Some(Value::String(s)) => Ok(Some(s.clone())),
                Some(other) => Err(ConfigurationError::InvalidValue {
                    key: key.to_string(),
                    alias: alias.to_string(),
                    message: format!("expected a string, got {}", other),
                }),
            }
        };

        let app_id = text("APP_ID")?.ok_or_else(|| missing("APP_ID", alias))?;
        let api_key = text("API_KEY")?.ok_or_else(|| missing("API_KEY", alias))?;
        let index_name = text("INDEX_NAME")?;
        let index_name_prefix = if options.contains_key("INDEX_NAME_PREFIX") {
            Some(text("INDEX_NAME_PREFIX")?.unwrap_or_default())
        } else {
            None
        };

        let optional_words = match options.get("OPTIONAL_WORDS") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(vec![s.clone()]),
            Some(Value::Array(items)) => Some(
                items
                    .iter()
                    .map(|item| {
                        item.as_str().map(String::from).ok_or_else(|| {
                            ConfigurationError::InvalidValue {
                                key: "OPTIONAL_WORDS".to_string(),
                                alias: alias.to_string(),
                                message: format!("expected a string, got {}", item),
                            }
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Some(other) => {
                return Err(ConfigurationError::InvalidValue {
                    key: "OPTIONAL_WORDS".to_string(),
                    alias: alias.to_string(),
                    message: format!("expected a list of strings, got {}", other),
                });
            }
        };

        let config = Self {
            app_id,
            api_key,
            index_name,
            index_name_prefix,
            optional_words,
            ..Default::default()
        };
        config.validate(alias)?;
        Ok(config)
    }

    /// Checks that every required connection parameter is present.
    pub fn validate(&self, alias: &str) -> Result<(), ConfigurationError> {
        if self.app_id.trim().is_empty() {
            return Err(missing("APP_ID", alias));
        }
        if self.api_key.trim().is_empty() {
            return Err(missing("API_KEY", alias));
        }
        if self.index_name.is_none() && self.index_name_prefix.is_none() {
            return Err(missing("INDEX_NAME_PREFIX", alias));
        }
        if matches!(self.index_name.as_deref(), Some(name) if name.trim().is_empty()) {
            return Err(ConfigurationError::InvalidValue {
                key: "INDEX_NAME".to_string(),
                alias: alias.to_string(),
                message: "index name cannot be empty".to_string(),
            });
        }
        for (key, host) in [("READ_HOST", self.read_base()), ("WRITE_HOST", self.write_base())] {
            parse_host(&host).map_err(|message| ConfigurationError::InvalidValue {
                key: key.to_string(),
                alias: alias.to_string(),
                message,
            })?;
        }
        Ok(())
    }

    /// Returns how model names map to remote index names.
    pub fn index_naming(&self) -> IndexNaming {
        match &self.index_name {
            Some(name) => IndexNaming::Single(name.clone()),
            None => IndexNaming::Prefixed(self.index_name_prefix.clone().unwrap_or_default()),
        }
    }

    /// Base URL for search requests.
    pub fn read_base(&self) -> String {
        self.read_host
            .clone()
            .unwrap_or_else(|| format!("https://{}-dsn.algolia.net", self.app_id))
    }

    /// Base URL for indexing and settings requests.
    pub fn write_base(&self) -> String {
        self.write_host
            .clone()
            .unwrap_or_else(|| format!("https://{}.algolia.net", self.app_id))
    }
}

fn missing(key: &str, alias: &str) -> ConfigurationError {
    ConfigurationError::MissingConfiguration {
        key: key.to_string(),
        alias: alias.to_string(),
    }
}

/// Parses a host base URL, accepting only `http` and `https`.
pub(crate) fn parse_host(host: &str) -> Result<Url, String> {
    let url = Url::parse(host).map_err(|e| format!("invalid URL '{}': {}", host, e))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(format!("unsupported host URL '{}'", host));
    }
    Ok(url)
}
