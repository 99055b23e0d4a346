use crate::detector::CommandDetectorConfig;
use crate::engine::FuzzConfig;
use crate::path_source::GeminiSettings;
use crate::transport::TransportSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable consulted when the config file has no `api-key`.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML from config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("No API key: set `api-key` in the config file or the GEMINI_API_KEY environment variable")]
    MissingApiKey,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct FuzzingSettings {
    #[serde(default = "default_request_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,
    #[serde(default)]
    pub follow_redirects: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

pub fn default_request_timeout_ms() -> u64 {
    10_000
}
pub fn default_max_retries() -> u32 {
    3
}
pub fn default_concurrent_requests() -> usize {
    10
}
fn default_user_agent() -> String {
    concat!("aifuzz/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for FuzzingSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_request_timeout_ms(),
            max_retries: default_max_retries(),
            concurrent_requests: default_concurrent_requests(),
            follow_redirects: false,
            user_agent: default_user_agent(),
        }
    }
}

impl FuzzingSettings {
    pub fn fuzz_config(&self) -> FuzzConfig {
        FuzzConfig {
            timeout: Duration::from_millis(self.timeout_ms),
            max_retries: self.max_retries,
            concurrency_limit: self.concurrent_requests,
        }
    }

    pub fn transport_settings(&self) -> TransportSettings {
        TransportSettings {
            follow_redirects: self.follow_redirects,
            user_agent: self.user_agent.clone(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct GeneratorSettings {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_path_count")]
    pub path_count: usize,
    #[serde(default = "default_generator_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}
fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_path_count() -> usize {
    20
}
fn default_generator_timeout_ms() -> u64 {
    60_000
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            endpoint: default_endpoint(),
            path_count: default_path_count(),
            timeout_ms: default_generator_timeout_ms(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct DetectorSettings {
    #[serde(default = "default_detector_command")]
    pub command: String,
    #[serde(default = "default_detector_args")]
    pub args: Vec<String>,
    /// An empty list skips the availability check.
    #[serde(default = "default_version_args")]
    pub version_args: Vec<String>,
    #[serde(default = "default_detector_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_detector_command() -> String {
    "whatweb".to_string()
}
fn default_detector_args() -> Vec<String> {
    vec!["{}".to_string(), "-v".to_string()]
}
fn default_version_args() -> Vec<String> {
    vec!["--version".to_string()]
}
fn default_detector_timeout_ms() -> u64 {
    120_000
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            command: default_detector_command(),
            args: default_detector_args(),
            version_args: default_version_args(),
            timeout_ms: default_detector_timeout_ms(),
        }
    }
}

impl DetectorSettings {
    pub fn command_config(&self) -> CommandDetectorConfig {
        CommandDetectorConfig {
            program: self.command.clone(),
            args: self.args.clone(),
            version_args: (!self.version_args.is_empty()).then(|| self.version_args.clone()),
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct AifuzzConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub fuzzing: FuzzingSettings,
    #[serde(default)]
    pub generator: GeneratorSettings,
    #[serde(default)]
    pub detector: DetectorSettings,
}

impl AifuzzConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        log::debug!("Loaded configuration from {path:?}");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AifuzzConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fuzzing.concurrent_requests == 0 {
            return Err(ConfigError::Invalid(
                "fuzzing.concurrent-requests must be at least 1".to_string(),
            ));
        }
        if self.fuzzing.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "fuzzing.timeout-ms must be greater than 0".to_string(),
            ));
        }
        if self.generator.path_count == 0 {
            return Err(ConfigError::Invalid(
                "generator.path-count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The key from the file, falling back to the environment.
    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    fn resolve_api_key_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<String, ConfigError> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| lookup(API_KEY_ENV).filter(|key| !key.trim().is_empty()))
            .ok_or(ConfigError::MissingApiKey)
    }

    pub fn gemini_settings(&self) -> Result<GeminiSettings, ConfigError> {
        Ok(GeminiSettings {
            api_key: self.resolve_api_key()?,
            model: self.generator.model.clone(),
            endpoint: self.generator.endpoint.clone(),
            path_count: self.generator.path_count,
            timeout: Duration::from_millis(self.generator.timeout_ms),
        })
    }
}
