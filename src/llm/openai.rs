//! OpenAI-compatible chat completions (OpenAI, xAI, OpenRouter, custom).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::error::AiError;
use crate::provider::ApiKey;
use crate::schema::ResponseSchema;

use super::{
    COMPATIBLE_CONNECT_FAILED, LanguageModel, TextStream, parse_object, read_body, sse,
    transport_failed,
};

const SCHEMA_NAME: &str = "commit_message";

/// A model served through `POST {base_url}/chat/completions`.
pub struct OpenAiCompatibleModel {
    http: Client,
    endpoint: String,
    api_key: ApiKey,
    model: String,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Deserialize, Default)]
struct ChunkDelta {
    content: Option<String>,
}

impl OpenAiCompatibleModel {
    pub fn new(http: Client, base_url: &str, api_key: ApiKey, model: &str) -> Self {
        Self {
            http,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            model: model.to_string(),
        }
    }

    fn request<'a>(
        &'a self,
        prompt: &'a str,
        stream: bool,
        response_format: Option<Value>,
    ) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream,
            response_format,
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiCompatibleModel {
    async fn stream_text(&self, prompt: &str) -> Result<TextStream, AiError> {
        debug!(endpoint = %self.endpoint, model = %self.model, "Opening chat completion stream");
        let request = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose())
            .json(&self.request(prompt, true, None));

        sse::open(request, COMPATIBLE_CONNECT_FAILED, parse_chunk).await
    }

    async fn generate_object(
        &self,
        prompt: &str,
        schema: &ResponseSchema,
    ) -> Result<Value, AiError> {
        debug!(endpoint = %self.endpoint, model = %self.model, "Requesting structured completion");
        let response_format = json!({
            "type": "json_schema",
            "json_schema": {
                "name": SCHEMA_NAME,
                "schema": schema.to_json_schema(),
                "strict": false,
            }
        });

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose())
            .json(&self.request(prompt, false, Some(response_format)))
            .send()
            .await
            .map_err(|e| transport_failed(e, COMPATIBLE_CONNECT_FAILED))?;

        let body = read_body(response, COMPATIBLE_CONNECT_FAILED).await?;
        let completion: ChatCompletion = serde_json::from_str(&body).map_err(|e| {
            debug!(error = %e, "Chat completion did not match the expected shape");
            AiError::SchemaValidation("unreadable completion from the AI provider".to_string())
        })?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AiError::SchemaValidation("model returned no content".to_string()))?;

        parse_object(&content)
    }
}

fn parse_chunk(data: &str) -> Option<Result<String, AiError>> {
    match serde_json::from_str::<ChatChunk>(data) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|text| !text.is_empty())
            .map(Ok),
        Err(e) => {
            debug!(error = %e, "Skipping unreadable stream chunk");
            None
        }
    }
}
