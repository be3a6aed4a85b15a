//! Generation dispatcher: resolve, prompt, call the model under a deadline.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::diagnostics::Diagnostics;
use crate::error::AiError;
use crate::llm::{HttpConnector, ModelConnector, TextStream};
use crate::prompt::{CommitTypeCatalog, build_structured_prompt, build_text_prompt};
use crate::provider::{ProviderCredentials, resolve_client};
use crate::schema::{FieldFlags, ResponseSchema, StructuredCommitMessage};

/// Deadline for a provider call.
pub const GENERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything about a generation except who answers it.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub language: String,
    pub max_length: u32,
    /// Staged changes as unified diff text. Must not be empty.
    pub diff: String,
    pub catalog: CommitTypeCatalog,
    pub fields: FieldFlags,
    pub fixed_type: Option<String>,
}

#[derive(Serialize)]
struct RequestDump<'a> {
    provider: &'a str,
    model: &'a str,
    api_key: String,
    prompt: &'a str,
}

impl<'a> RequestDump<'a> {
    fn new(creds: &'a ProviderCredentials, prompt: &'a str) -> Self {
        Self {
            provider: creds.provider.as_str(),
            model: &creds.model,
            api_key: creds.api_key.redacted(),
            prompt,
        }
    }
}

/// Runs text and structured generations against a [`ModelConnector`].
#[derive(Debug, Clone)]
pub struct Generator<C = HttpConnector> {
    connector: C,
    diagnostics: Diagnostics,
}

impl Default for Generator<HttpConnector> {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator<HttpConnector> {
    pub fn new() -> Self {
        Self::with_connector(HttpConnector::new())
    }
}

impl<C: ModelConnector> Generator<C> {
    pub fn with_connector(connector: C) -> Self {
        Self {
            connector,
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Start a streamed free-text generation.
    ///
    /// The deadline covers opening the stream; deltas then flow until the
    /// provider finishes or the stream is dropped.
    pub async fn generate_text(
        &self,
        creds: &ProviderCredentials,
        request: &GenerationRequest,
        debug: bool,
    ) -> Result<TextStream, AiError> {
        let client = resolve_client(creds.provider, &creds.api_key, creds.base_url.as_deref())?;
        let prompt = build_text_prompt(
            &request.language,
            request.max_length,
            &request.diff,
            &request.catalog,
        );
        self.diagnostics
            .record(debug, "Stream Text Request", &RequestDump::new(creds, &prompt));

        info!(provider = %creds.provider, model = %creds.model, "Streaming commit message");
        let model = self.connector.connect(&client, &creds.model);
        with_deadline(model.stream_text(&prompt)).await
    }

    /// Generate a structured commit message and validate it.
    pub async fn generate_structured(
        &self,
        creds: &ProviderCredentials,
        request: &GenerationRequest,
        debug: bool,
    ) -> Result<StructuredCommitMessage, AiError> {
        let client = resolve_client(creds.provider, &creds.api_key, creds.base_url.as_deref())?;
        let prompt = build_structured_prompt(
            &request.language,
            request.max_length,
            &request.catalog,
            &request.diff,
            request.fields,
            request.fixed_type.as_deref(),
        );
        let schema = ResponseSchema::for_fields(request.fields);
        self.diagnostics
            .record(debug, "Generate Object Request", &RequestDump::new(creds, &prompt));

        info!(provider = %creds.provider, model = %creds.model, "Generating structured commit message");
        let model = self.connector.connect(&client, &creds.model);
        let raw = with_deadline(model.generate_object(&prompt, &schema)).await?;
        self.diagnostics.record(debug, "Generate Object Response", &raw);

        schema.validate(&raw).inspect_err(|e| {
            warn!(error = %e, "Structured response rejected");
        })
    }
}

async fn with_deadline<T>(call: impl Future<Output = Result<T, AiError>>) -> Result<T, AiError> {
    tokio::time::timeout(GENERATION_TIMEOUT, call)
        .await
        .map_err(|_| {
            warn!(seconds = GENERATION_TIMEOUT.as_secs(), "Provider call timed out");
            AiError::Timeout(GENERATION_TIMEOUT.as_secs())
        })?
}
