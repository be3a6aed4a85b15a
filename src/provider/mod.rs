//! Provider identities, credentials, client resolution and model catalogs.

pub mod catalog;
pub mod resolver;

use std::fmt;
use std::str::FromStr;

use crate::error::AiError;

pub use catalog::{CatalogFetcher, Model, list_models};
pub use resolver::{ClientHandle, resolve_client};

/// Fixed Gemini API root. Gemini is never addressed through a configurable URL.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Transport failure messages. Never include the request URL.
pub(crate) const GEMINI_CONNECT_FAILED: &str = "Failed to connect to Google AI.";
pub(crate) const COMPATIBLE_CONNECT_FAILED: &str = "Failed to connect to the AI provider.";

/// Supported AI providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenAi,
    XAi,
    OpenRouter,
    Gemini,
    Custom,
}

impl ProviderId {
    pub const ALL: [ProviderId; 5] = [
        ProviderId::OpenAi,
        ProviderId::XAi,
        ProviderId::OpenRouter,
        ProviderId::Gemini,
        ProviderId::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "openai",
            ProviderId::XAi => "xai",
            ProviderId::OpenRouter => "openrouter",
            ProviderId::Gemini => "gemini",
            ProviderId::Custom => "custom",
        }
    }

    /// Default base URL for OpenAI-compatible providers.
    ///
    /// `None` for Gemini (fixed host) and Custom (caller must supply one).
    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            ProviderId::OpenAi => Some("https://api.openai.com/v1"),
            ProviderId::OpenRouter => Some("https://openrouter.ai/api/v1"),
            ProviderId::XAi => Some("https://api.x.ai/v1"),
            ProviderId::Gemini | ProviderId::Custom => None,
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = AiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderId::ALL
            .into_iter()
            .find(|id| id.as_str() == s.trim())
            .ok_or_else(|| AiError::UnsupportedProvider(s.to_string()))
    }
}

/// An opaque API key.
///
/// `Debug` and `Display` never print the cleartext; use [`ApiKey::expose`]
/// only where the key goes on the wire.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        ApiKey(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Masked form for logs: `****` plus the last four characters.
    pub fn redacted(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 8 {
            return "****".to_string();
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("****{tail}")
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({})", self.redacted())
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

/// Per-call credentials. Persisting them is the settings layer's job.
#[derive(Debug, Clone)]
pub struct ProviderCredentials {
    pub provider: ProviderId,
    pub api_key: ApiKey,
    pub model: String,
    pub base_url: Option<String>,
}

impl ProviderCredentials {
    pub fn new(provider: ProviderId, api_key: ApiKey, model: impl Into<String>) -> Self {
        Self {
            provider,
            api_key,
            model: model.into(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}
