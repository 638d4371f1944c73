//! Provider identities
//!
//! Each remote completion service the gateway can dispatch to is identified
//! by a closed enum variant. The coordinator and judge only ever see this
//! identity, never a concrete adapter type.

use super::error::DomainError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Identity of a remote completion provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    /// OpenAI chat completions API
    Openai,
    /// Groq (OpenAI-compatible API, Llama models)
    Groq,
    /// Google Gemini (generateContent API)
    Gemini,
    /// Local Ollama instance
    Ollama,
}

impl ProviderId {
    /// All known providers, in default dispatch order.
    pub fn all() -> &'static [ProviderId] {
        &[
            ProviderId::Openai,
            ProviderId::Groq,
            ProviderId::Gemini,
            ProviderId::Ollama,
        ]
    }

    /// Stable lowercase name used in config files and output.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Openai => "openai",
            ProviderId::Groq => "groq",
            ProviderId::Gemini => "gemini",
            ProviderId::Ollama => "ollama",
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ProviderId::Openai),
            "groq" => Ok(ProviderId::Groq),
            "gemini" | "google" => Ok(ProviderId::Gemini),
            "ollama" => Ok(ProviderId::Ollama),
            other => Err(DomainError::UnknownProvider(other.to_string())),
        }
    }
}
