//! Remote service configuration.
//!
//! Configuration can be loaded from:
//! - A TOML file named by `ALICE_INFERENCE_CONFIG`
//! - Environment variables (`ALICE_INFERENCE_*` prefixed)
//!
//! # Example
//!
//! ```rust,no_run
//! use alice_inference::config::InferenceConfig;
//!
//! // File if ALICE_INFERENCE_CONFIG is set, env vars otherwise
//! let config = InferenceConfig::load().expect("Failed to load config");
//!
//! // Or explicitly from a file
//! let config = InferenceConfig::from_file(std::path::Path::new("inference.toml")).expect("Failed to load");
//! ```
//!
//! A file looks like:
//!
//! ```toml
//! [inference]
//! base_url = "http://analysis.internal:8001"
//! timeout_secs = 600
//! routing = "thread"
//! ```
//!
//! `${VAR}` placeholders in the file are replaced from the environment.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use alice_core::defaults;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid routing policy: {0}")]
    InvalidRouting(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

impl From<ConfigError> for alice_core::Error {
    fn from(e: ConfigError) -> Self {
        alice_core::Error::Config(e.to_string())
    }
}

/// How chat turns choose between the generation and continuation paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoutingPolicy {
    /// Every turn goes to `generate_path`, thread id or not.
    #[default]
    Single,
    /// Turns carrying a thread id go to `continue_path`.
    Thread,
}

impl FromStr for RoutingPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "thread" => Ok(Self::Thread),
            _ => Err(ConfigError::InvalidRouting(s.to_string())),
        }
    }
}

impl fmt::Display for RoutingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::Thread => write!(f, "thread"),
        }
    }
}

/// Remote analysis/generation service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub base_url: String,
    pub analyze_path: String,
    pub generate_path: String,
    pub continue_path: String,
    pub toc_path: String,
    pub verify_path: String,
    pub compare_path: String,
    /// One budget for connect, write, and read of a single call.
    pub timeout_secs: u64,
    pub routing: RoutingPolicy,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::INFERENCE_URL.to_string(),
            analyze_path: defaults::ANALYZE_PATH.to_string(),
            generate_path: defaults::GENERATE_PATH.to_string(),
            continue_path: defaults::CONTINUE_PATH.to_string(),
            toc_path: defaults::TOC_PATH.to_string(),
            verify_path: defaults::VERIFY_PATH.to_string(),
            compare_path: defaults::COMPARE_PATH.to_string(),
            timeout_secs: defaults::INFERENCE_TIMEOUT_SECS,
            routing: RoutingPolicy::default(),
        }
    }
}

static ENV_PLACEHOLDER: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").ok());

impl InferenceConfig {
    /// Load from the file named by `ALICE_INFERENCE_CONFIG`, falling back to
    /// environment variables. The result is validated either way.
    pub fn load() -> ConfigResult<Self> {
        match env::var(defaults::ENV_INFERENCE_CONFIG) {
            Ok(path) if !path.trim().is_empty() => {
                info!(
                    subsystem = "inference",
                    component = "config",
                    path = %path,
                    "Loading inference config from file"
                );
                Self::from_file(Path::new(&path))
            }
            _ => {
                debug!(
                    subsystem = "inference",
                    component = "config",
                    "No config file set, using environment variables"
                );
                let config = Self::from_env()?;
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Load configuration from a TOML file with an `[inference]` table.
    /// Missing keys take their defaults.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let content = Self::substitute_env_vars(&content);

        #[derive(Deserialize)]
        struct TomlRoot {
            #[serde(default)]
            inference: InferenceConfig,
        }

        let root: TomlRoot = toml::from_str(&content)?;
        root.inference.validate()?;
        Ok(root.inference)
    }

    /// Load configuration from environment variables. Unset variables take
    /// their defaults; an unparseable timeout or routing value is an error.
    pub fn from_env() -> ConfigResult<Self> {
        let d = Self::default();
        let var = |name: &str, default: String| env::var(name).unwrap_or(default);

        let timeout_secs = match env::var(defaults::ENV_INFERENCE_TIMEOUT_SECS) {
            Ok(raw) => raw.trim().parse().map_err(|_| {
                ConfigError::Validation(format!(
                    "{} must be a whole number of seconds, got: {}",
                    defaults::ENV_INFERENCE_TIMEOUT_SECS,
                    raw
                ))
            })?,
            Err(_) => d.timeout_secs,
        };

        let routing = match env::var(defaults::ENV_CHAT_ROUTING) {
            Ok(raw) => raw.parse()?,
            Err(_) => d.routing,
        };

        Ok(Self {
            base_url: var(defaults::ENV_INFERENCE_URL, d.base_url),
            analyze_path: var(defaults::ENV_ANALYZE_PATH, d.analyze_path),
            generate_path: var(defaults::ENV_GENERATE_PATH, d.generate_path),
            continue_path: var(defaults::ENV_CONTINUE_PATH, d.continue_path),
            toc_path: var(defaults::ENV_TOC_PATH, d.toc_path),
            verify_path: var(defaults::ENV_VERIFY_PATH, d.verify_path),
            compare_path: var(defaults::ENV_COMPARE_PATH, d.compare_path),
            timeout_secs,
            routing,
        })
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.base_url.is_empty() {
            return Err(ConfigError::Validation(
                "base_url cannot be empty".to_string(),
            ));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "base_url must start with http:// or https://, got: {}",
                self.base_url
            )));
        }

        for (name, path) in [
            ("analyze_path", &self.analyze_path),
            ("generate_path", &self.generate_path),
            ("continue_path", &self.continue_path),
            ("toc_path", &self.toc_path),
            ("verify_path", &self.verify_path),
            ("compare_path", &self.compare_path),
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::Validation(format!(
                    "{} must start with '/', got: {:?}",
                    name, path
                )));
            }
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Absolute URL for an endpoint path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Replace `${VAR}` placeholders with environment values. Unset
    /// variables are left as written.
    fn substitute_env_vars(content: &str) -> String {
        let Some(re) = ENV_PLACEHOLDER.as_ref() else {
            return content.to_string();
        };
        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }
}
