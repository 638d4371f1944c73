//! Configuration file schema
//!
//! Every section has serde defaults so a partial TOML file only overrides
//! what it names. Secrets prefer environment-variable indirection: each
//! provider section carries an `api_key_env` naming the variable and an
//! optional direct `api_key` override.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigValidationError {
    #[error("temperature {0} outside 0.0..=2.0")]
    InvalidTemperature(f64),

    #[error("cache similarity threshold {0} outside 0.0..=1.0")]
    InvalidSimilarityThreshold(f32),

    #[error("sandbox cpu limit {0} must be positive")]
    InvalidCpuLimit(f64),

    #[error("resilience max_attempts must be at least 1")]
    ZeroAttempts,
}

/// Root configuration, one section per concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub providers: FileProvidersConfig,
    pub sandbox: FileSandboxConfig,
    pub cache: FileCacheConfig,
    pub resilience: FileResilienceConfig,
    pub inference: FileInferenceConfig,
}

impl FileConfig {
    /// Reject values that would misbehave at runtime.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let t = self.inference.temperature;
        if !(0.0..=2.0).contains(&t) || t.is_nan() {
            return Err(ConfigValidationError::InvalidTemperature(t));
        }
        let s = self.cache.similarity_threshold;
        if !(0.0..=1.0).contains(&s) || s.is_nan() {
            return Err(ConfigValidationError::InvalidSimilarityThreshold(s));
        }
        if self.sandbox.cpu_limit <= 0.0 {
            return Err(ConfigValidationError::InvalidCpuLimit(self.sandbox.cpu_limit));
        }
        if self.resilience.max_attempts == 0 {
            return Err(ConfigValidationError::ZeroAttempts);
        }
        Ok(())
    }
}

/// `[providers]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProvidersConfig {
    /// Per-provider request deadline in seconds.
    pub request_timeout_secs: u64,
    pub openai: FileProviderConfig,
    pub groq: FileProviderConfig,
    pub gemini: FileProviderConfig,
    pub ollama: FileProviderConfig,
}

impl Default for FileProvidersConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            openai: FileProviderConfig {
                enabled: false,
                api_key_env: "OPENAI_API_KEY".to_string(),
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-4o-mini".to_string(),
                ..FileProviderConfig::empty()
            },
            groq: FileProviderConfig {
                enabled: true,
                api_key_env: "GROQ_API_KEY".to_string(),
                base_url: "https://api.groq.com/openai/v1".to_string(),
                model: "llama-3.3-70b-versatile".to_string(),
                requests_per_minute: Some(30),
                ..FileProviderConfig::empty()
            },
            gemini: FileProviderConfig {
                enabled: true,
                api_key_env: "GOOGLE_API_KEY".to_string(),
                base_url: "https://generativelanguage.googleapis.com".to_string(),
                model: "gemini-2.5-flash".to_string(),
                // Strict free-tier limit
                requests_per_minute: Some(6),
                ..FileProviderConfig::empty()
            },
            ollama: FileProviderConfig {
                enabled: false,
                api_key_env: String::new(),
                base_url: "http://localhost:11434".to_string(),
                model: "llama3".to_string(),
                ..FileProviderConfig::empty()
            },
        }
    }
}

/// One provider's connection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProviderConfig {
    pub enabled: bool,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Direct API key; prefer `api_key_env`.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    /// Token-bucket rate limit; `None` means unlimited.
    pub requests_per_minute: Option<u32>,
}

impl FileProviderConfig {
    fn empty() -> Self {
        Self {
            enabled: false,
            api_key_env: String::new(),
            api_key: None,
            base_url: String::new(),
            model: String::new(),
            max_tokens: 2048,
            requests_per_minute: None,
        }
    }

    /// Resolve the API key: direct value wins, then the named env var.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(key) = &self.api_key {
            if !key.is_empty() {
                return Some(key.clone());
            }
        }
        if self.api_key_env.is_empty() {
            return None;
        }
        std::env::var(&self.api_key_env).ok().filter(|k| !k.is_empty())
    }
}

/// `[sandbox]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSandboxConfig {
    /// `auto`, `container`, or `subprocess`.
    pub strategy: String,
    pub timeout_secs: u64,
    pub memory_mb: u64,
    pub cpu_limit: f64,
    pub max_output_kb: usize,
    pub python_image: String,
    pub javascript_image: String,
}

impl Default for FileSandboxConfig {
    fn default() -> Self {
        Self {
            strategy: "auto".to_string(),
            timeout_secs: 30,
            memory_mb: 256,
            cpu_limit: 0.5,
            max_output_kb: 1024,
            python_image: "python:3.12-slim".to_string(),
            javascript_image: "node:20-slim".to_string(),
        }
    }
}

/// `[cache]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCacheConfig {
    pub enabled: bool,
    pub capacity: usize,
    /// Cosine similarity a probe must reach to count as a hit.
    pub similarity_threshold: f32,
    pub ttl_secs: u64,
}

impl Default for FileCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 256,
            similarity_threshold: 0.95,
            ttl_secs: 3600,
        }
    }
}

/// `[resilience]` section: retry/backoff and circuit-breaker tunables
/// shared by every provider adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileResilienceConfig {
    pub max_attempts: u32,
    pub base_delay_secs: u64,
    pub max_delay_secs: u64,
    /// Consecutive failures before the breaker opens.
    pub failure_threshold: u32,
    /// Seconds the breaker stays open before probing.
    pub cooldown_secs: u64,
}

impl Default for FileResilienceConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 2,
            max_delay_secs: 10,
            failure_threshold: 5,
            cooldown_secs: 30,
        }
    }
}

/// `[inference]` section: pipeline defaults a request can override.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileInferenceConfig {
    pub default_language: String,
    pub execute_code: bool,
    pub verify: bool,
    pub temperature: f64,
    pub self_heal: bool,
    pub heal_temperature: f64,
}

impl Default for FileInferenceConfig {
    fn default() -> Self {
        Self {
            default_language: "python".to_string(),
            execute_code: true,
            verify: true,
            temperature: 0.7,
            self_heal: false,
            heal_temperature: 0.2,
        }
    }
}
