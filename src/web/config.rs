use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::astro::{ChartOptions, RetryPolicy, DEFAULT_ENDPOINTS};

const API_KEY_ENV: &str = "API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("no astrology API key: set astrology.api_key or the API_KEY variable")]
    MissingApiKey,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub astrology: AstrologyConfig,
    pub auth: AuthConfig,
    pub charts: ChartsConfig,
    #[serde(default)]
    pub users: UsersConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AstrologyConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<String>,
    #[serde(default = "default_timeout", deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
    #[serde(default = "default_backoff", deserialize_with = "deserialize_duration")]
    pub backoff: Duration,
    #[serde(default)]
    pub options: ChartOptions,
}

impl Default for AstrologyConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoints: default_endpoints(),
            timeout: default_timeout(),
            backoff: default_backoff(),
            options: ChartOptions::default(),
        }
    }
}

impl AstrologyConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            timeout: self.timeout,
            backoff: self.backoff,
        }
    }
}

fn default_endpoints() -> Vec<String> {
    DEFAULT_ENDPOINTS.iter().map(|e| e.to_string()).collect()
}

fn default_timeout() -> Duration {
    RetryPolicy::default().timeout
}

fn default_backoff() -> Duration {
    RetryPolicy::default().backoff
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl", deserialize_with = "deserialize_duration")]
    pub token_ttl: Duration,
}

fn default_token_ttl() -> Duration {
    Duration::from_secs(7 * 24 * 60 * 60)
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartsConfig {
    pub base_folder: PathBuf,
}

/// Account storage and the Argon2id cost applied to new password hashes.
#[derive(Debug, Clone, Deserialize)]
pub struct UsersConfig {
    #[serde(default = "default_users_folder")]
    pub base_folder: PathBuf,
    #[serde(default = "default_hash_memory_kib")]
    pub hash_memory_kib: u32,
    #[serde(default = "default_hash_iterations")]
    pub hash_iterations: u32,
}

impl Default for UsersConfig {
    fn default() -> Self {
        Self {
            base_folder: default_users_folder(),
            hash_memory_kib: default_hash_memory_kib(),
            hash_iterations: default_hash_iterations(),
        }
    }
}

fn default_users_folder() -> PathBuf {
    PathBuf::from("./data/users")
}

fn default_hash_memory_kib() -> u32 {
    argon2::Params::DEFAULT_M_COST
}

fn default_hash_iterations() -> u32 {
    argon2::Params::DEFAULT_T_COST
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Key from the config file, else from the `API_KEY` environment variable.
    pub fn api_key(&self) -> Result<String, ConfigError> {
        if let Some(key) = self.astrology.api_key.as_ref().filter(|k| !k.is_empty()) {
            return Ok(key.clone());
        }
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom)
}
