//! Runtime configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. Values in the TOML file passed with `--config`
//! 2. Environment variables (`.env` is loaded into the environment first)
//! 3. Built-in defaults
//!
//! API keys are secrets and only ever come from the environment.
//!
//! | Variable                   | Default                          |
//! |----------------------------|----------------------------------|
//! | `LINEAR_API_KEY`           | required                         |
//! | `OPENAI_API_KEY`           | required                         |
//! | `TRIAGE_LINEAR_URL`        | `https://api.linear.app/graphql` |
//! | `TRIAGE_LINEAR_TEAM`       | first team                       |
//! | `TRIAGE_OPENAI_URL`        | `https://api.openai.com/v1`      |
//! | `TRIAGE_MODEL`             | `gpt-4-turbo-preview`            |
//! | `TRIAGE_POLL_INTERVAL_MS`  | 200                              |
//! | `TRIAGE_RUN_TIMEOUT_SECS`  | 120                              |
//! | `TRIAGE_MAX_ACTIVE_ISSUES` | 250                              |
//! | `TRIAGE_COMPARISON_FIELD`  | `description`                    |

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracker::{TrackerConfig, DEFAULT_LINEAR_ENDPOINT};

use crate::engine::assistants::{DEFAULT_MODEL, DEFAULT_OPENAI_BASE_URL};
use crate::engine::EngineConfig;
use crate::prompts::ComparisonField;

pub const ENV_LINEAR_API_KEY: &str = "LINEAR_API_KEY";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
const ENV_LINEAR_URL: &str = "TRIAGE_LINEAR_URL";
const ENV_LINEAR_TEAM: &str = "TRIAGE_LINEAR_TEAM";
const ENV_OPENAI_URL: &str = "TRIAGE_OPENAI_URL";
const ENV_MODEL: &str = "TRIAGE_MODEL";
const ENV_POLL_INTERVAL_MS: &str = "TRIAGE_POLL_INTERVAL_MS";
const ENV_RUN_TIMEOUT_SECS: &str = "TRIAGE_RUN_TIMEOUT_SECS";
const ENV_MAX_ACTIVE_ISSUES: &str = "TRIAGE_MAX_ACTIVE_ISSUES";
const ENV_COMPARISON_FIELD: &str = "TRIAGE_COMPARISON_FIELD";

const DEFAULT_POLL_INTERVAL_MS: u64 = 200;
const DEFAULT_RUN_TIMEOUT_SECS: u64 = 120;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_ACTIVE_ISSUES: usize = 250;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Non-secret settings. Every field may be set in the TOML overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub linear_url: String,
    /// Team name to file into; `None` uses the first team.
    pub linear_team: Option<String>,
    pub openai_url: String,
    pub model: String,
    pub poll_interval_ms: u64,
    pub run_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_active_issues: usize,
    pub comparison_field: ComparisonField,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            linear_url: env::var(ENV_LINEAR_URL)
                .unwrap_or_else(|_| DEFAULT_LINEAR_ENDPOINT.to_string()),
            linear_team: env::var(ENV_LINEAR_TEAM).ok().filter(|t| !t.is_empty()),
            openai_url: env::var(ENV_OPENAI_URL)
                .unwrap_or_else(|_| DEFAULT_OPENAI_BASE_URL.to_string()),
            model: env::var(ENV_MODEL).unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            poll_interval_ms: env_or(ENV_POLL_INTERVAL_MS, DEFAULT_POLL_INTERVAL_MS),
            run_timeout_secs: env_or(ENV_RUN_TIMEOUT_SECS, DEFAULT_RUN_TIMEOUT_SECS),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_active_issues: env_or(ENV_MAX_ACTIVE_ISSUES, DEFAULT_MAX_ACTIVE_ISSUES),
            comparison_field: env_or(ENV_COMPARISON_FIELD, ComparisonField::default()),
        }
    }
}

impl Settings {
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Parse an environment override, keeping `default` when unset or invalid.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "ignoring invalid environment override");
            default
        }),
        Err(_) => default,
    }
}

/// Settings plus the two API keys.
#[derive(Clone)]
pub struct TriageConfig {
    pub settings: Settings,
    linear_api_key: String,
    openai_api_key: String,
}

impl std::fmt::Debug for TriageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriageConfig")
            .field("settings", &self.settings)
            .field("linear_api_key", &"<redacted>")
            .field("openai_api_key", &"<redacted>")
            .finish()
    }
}

impl TriageConfig {
    /// Load from the process environment and an optional TOML overlay.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(config_path, |key| env::var(key).ok())
    }

    /// Like [`TriageConfig::load`], reading secrets through `lookup`.
    pub fn load_with(
        config_path: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let secret = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::MissingEnv(key))
        };
        let linear_api_key = secret(ENV_LINEAR_API_KEY)?;
        let openai_api_key = secret(ENV_OPENAI_API_KEY)?;

        let settings = match config_path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Settings::from_toml_str(&content).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            None => Settings::default(),
        };

        Ok(Self {
            settings,
            linear_api_key,
            openai_api_key,
        })
    }

    pub fn from_parts(
        settings: Settings,
        linear_api_key: impl Into<String>,
        openai_api_key: impl Into<String>,
    ) -> Self {
        Self {
            settings,
            linear_api_key: linear_api_key.into(),
            openai_api_key: openai_api_key.into(),
        }
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            endpoint: self.settings.linear_url.clone(),
            api_key: self.linear_api_key.clone(),
            team: self.settings.linear_team.clone(),
            max_active_issues: self.settings.max_active_issues,
            timeout: Duration::from_secs(self.settings.request_timeout_secs),
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            base_url: self.settings.openai_url.clone(),
            api_key: self.openai_api_key.clone(),
            model: self.settings.model.clone(),
            poll_interval: Duration::from_millis(self.settings.poll_interval_ms),
            run_timeout: Duration::from_secs(self.settings.run_timeout_secs),
            request_timeout: Duration::from_secs(self.settings.request_timeout_secs),
        }
    }
}
