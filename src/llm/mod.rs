//! Model clients keyed by provider handle and model id.

pub mod gemini;
pub mod json;
pub mod openai;
mod sse;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use reqwest::Client;
use serde_json::Value;

use crate::error::AiError;
use crate::provider::{ClientHandle, GEMINI_API_BASE};
use crate::schema::ResponseSchema;

pub use gemini::GeminiModel;
pub use json::parse_object;
pub use openai::OpenAiCompatibleModel;

/// Prefix for every generation failure reported by a provider.
pub const GENERATION_CONTEXT: &str = "Failed to generate commit message";

pub(crate) use crate::provider::{COMPATIBLE_CONNECT_FAILED, GEMINI_CONNECT_FAILED};

/// Lazy, finite sequence of text deltas. Dropping it closes the connection.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, AiError>> + Send>>;

/// One provider call against one model.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Start a streamed completion. Resolves once the provider accepted the
    /// request; deltas arrive through the returned stream.
    async fn stream_text(&self, prompt: &str) -> Result<TextStream, AiError>;

    /// Request a JSON object constrained by `schema`. Returns the raw object;
    /// validation is the caller's job.
    async fn generate_object(&self, prompt: &str, schema: &ResponseSchema)
    -> Result<Value, AiError>;
}

/// Builds a [`LanguageModel`] for a resolved client handle.
#[cfg_attr(test, mockall::automock)]
pub trait ModelConnector: Send + Sync {
    fn connect(&self, client: &ClientHandle, model: &str) -> Box<dyn LanguageModel>;
}

/// Connector speaking the real vendor wire formats over HTTP.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    http: Client,
    gemini_base_url: String,
}

impl Default for HttpConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpConnector {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(http: Client) -> Self {
        Self {
            http,
            gemini_base_url: GEMINI_API_BASE.to_string(),
        }
    }

    /// Point Gemini requests at a different host (used against mock servers).
    pub fn with_gemini_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.gemini_base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

impl ModelConnector for HttpConnector {
    fn connect(&self, client: &ClientHandle, model: &str) -> Box<dyn LanguageModel> {
        match client {
            ClientHandle::OpenAiCompatible {
                base_url, api_key, ..
            } => Box::new(OpenAiCompatibleModel::new(
                self.http.clone(),
                base_url,
                api_key.clone(),
                model,
            )),
            ClientHandle::Gemini { api_key } => Box::new(GeminiModel::new(
                self.http.clone(),
                &self.gemini_base_url,
                api_key.clone(),
                model,
            )),
        }
    }
}

/// Log a request failure without its URL and map it to a transport error.
pub(crate) fn transport_failed(err: reqwest::Error, message: &str) -> AiError {
    tracing::debug!(error = %err.without_url(), "Generation request failed");
    AiError::Transport(message.to_string())
}

/// Read a non-streaming generation response body, mapping failure statuses.
pub(crate) async fn read_body(
    response: reqwest::Response,
    connect_message: &str,
) -> Result<String, AiError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| transport_failed(e, connect_message))?;
    if !status.is_success() {
        return Err(AiError::upstream(status.as_u16(), GENERATION_CONTEXT, &body));
    }
    Ok(body)
}
