//! Provider client resolution.

use crate::error::AiError;

use super::{ApiKey, ProviderId};

/// Resolved endpoint for a provider, tagged by wire shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientHandle {
    /// Any provider speaking the OpenAI REST dialect.
    OpenAiCompatible {
        provider: ProviderId,
        base_url: String,
        api_key: ApiKey,
    },
    /// Google Gemini, addressed through its fixed host.
    Gemini { api_key: ApiKey },
}

impl ClientHandle {
    pub fn provider(&self) -> ProviderId {
        match self {
            ClientHandle::OpenAiCompatible { provider, .. } => *provider,
            ClientHandle::Gemini { .. } => ProviderId::Gemini,
        }
    }
}

/// Resolve a provider identity into a client handle.
///
/// Resolution order for the base URL: a non-empty override, then the
/// provider default. Gemini needs no URL and ignores the override. `custom`
/// without an override fails with [`AiError::MissingBaseUrl`]; no network
/// call is ever made here.
pub fn resolve_client(
    provider: ProviderId,
    api_key: &ApiKey,
    base_url_override: Option<&str>,
) -> Result<ClientHandle, AiError> {
    if provider == ProviderId::Gemini {
        return Ok(ClientHandle::Gemini {
            api_key: api_key.clone(),
        });
    }

    let base_url = base_url_override
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .or_else(|| provider.default_base_url())
        .ok_or(AiError::MissingBaseUrl)?;

    Ok(ClientHandle::OpenAiCompatible {
        provider,
        base_url: base_url.trim_end_matches('/').to_string(),
        api_key: api_key.clone(),
    })
}
