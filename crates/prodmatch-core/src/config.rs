//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nesting, e.g. `APP_MATCHING__MAX_RESULTS=10`). Every section
//! has defaults, so a missing file is a valid configuration.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Error;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?;
        Ok(config)
    }

    /// Wrap an already assembled figment, e.g. one built from a TOML string.
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment: Figment::from(Serialized::defaults(Settings::default())).merge(figment) }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Typed view of the whole configuration, validated.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub matching: MatchingSettings,
    pub notifications: NotificationSettings,
    pub catalog: CatalogSettings,
    pub extraction: ExtractionSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<(), Error> {
        if self.matching.direct_limit == 0 {
            return Err(Error::InvalidConfig("matching.direct_limit must be at least 1".into()));
        }
        if self.matching.search_timeout_ms == 0 {
            return Err(Error::InvalidConfig("matching.search_timeout_ms must be positive".into()));
        }
        if self.matching.max_in_flight == 0 {
            return Err(Error::InvalidConfig("matching.max_in_flight must be at least 1".into()));
        }
        if self.matching.cache_queries && (self.matching.cache_capacity == 0 || self.matching.cache_idle_secs == 0) {
            return Err(Error::InvalidConfig("matching.cache_capacity and cache_idle_secs must be positive".into()));
        }
        if self.extraction.timeout_secs == 0 {
            return Err(Error::InvalidConfig("extraction.timeout_secs must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingSettings {
    pub max_results: usize,
    pub direct_limit: usize,
    pub broad_extra: usize,
    pub search_timeout_ms: u64,
    pub cache_queries: bool,
    pub cache_capacity: u64,
    pub cache_idle_secs: u64,
    /// Catalog calls allowed to run at once, including ones past their deadline.
    pub max_in_flight: usize,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            max_results: 5,
            direct_limit: 8,
            broad_extra: 5,
            search_timeout_ms: 2_000,
            cache_queries: true,
            cache_capacity: 1_024,
            cache_idle_secs: 600,
            max_in_flight: 4,
        }
    }
}

impl MatchingSettings {
    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.search_timeout_ms)
    }

    pub fn cache_idle(&self) -> Duration {
        Duration::from_secs(self.cache_idle_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub enabled: bool,
    pub target: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    pub index_dir: Option<String>,
}

impl CatalogSettings {
    pub fn index_path(&self) -> Option<PathBuf> {
        self.index_dir.as_deref().map(expand_path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.0-flash-exp".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 90,
        }
    }
}

impl ExtractionSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub json: bool,
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

