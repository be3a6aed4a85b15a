//! Google Gemini `generateContent` / `streamGenerateContent`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::AiError;
use crate::provider::ApiKey;
use crate::schema::ResponseSchema;

use super::{
    GEMINI_CONNECT_FAILED, LanguageModel, TextStream, parse_object, read_body, sse,
    transport_failed,
};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// A Gemini model addressed as `{base}/models/{model}`.
pub struct GeminiModel {
    http: Client,
    model_url: String,
    api_key: ApiKey,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate's parts.
    fn text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl GeminiModel {
    pub fn new(http: Client, base_url: &str, api_key: ApiKey, model: &str) -> Self {
        let model = model.strip_prefix("models/").unwrap_or(model);
        Self {
            http,
            model_url: format!("{}/models/{}", base_url.trim_end_matches('/'), model),
            api_key,
        }
    }

    fn request<'a>(
        prompt: &'a str,
        generation_config: Option<GenerationConfig>,
    ) -> GenerateRequest<'a> {
        GenerateRequest {
            contents: [Content {
                role: "user",
                parts: [Part { text: prompt }],
            }],
            generation_config,
        }
    }
}

#[async_trait]
impl LanguageModel for GeminiModel {
    async fn stream_text(&self, prompt: &str) -> Result<TextStream, AiError> {
        let url = format!("{}:streamGenerateContent", self.model_url);
        debug!(url = %url, "Opening Gemini stream");
        let request = self
            .http
            .post(&url)
            .query(&[("alt", "sse")])
            .header(API_KEY_HEADER, self.api_key.expose())
            .json(&Self::request(prompt, None));

        sse::open(request, GEMINI_CONNECT_FAILED, parse_chunk).await
    }

    async fn generate_object(
        &self,
        prompt: &str,
        schema: &ResponseSchema,
    ) -> Result<Value, AiError> {
        let url = format!("{}:generateContent", self.model_url);
        debug!(url = %url, "Requesting structured Gemini completion");
        let config = GenerationConfig {
            response_mime_type: "application/json",
            response_schema: schema.to_gemini_schema(),
        };

        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, self.api_key.expose())
            .json(&Self::request(prompt, Some(config)))
            .send()
            .await
            .map_err(|e| transport_failed(e, GEMINI_CONNECT_FAILED))?;

        let body = read_body(response, GEMINI_CONNECT_FAILED).await?;
        let parsed: GenerateResponse = serde_json::from_str(&body).map_err(|e| {
            debug!(error = %e, "Gemini response did not match the expected shape");
            AiError::SchemaValidation("unreadable completion from Google AI".to_string())
        })?;

        parse_object(&parsed.text())
    }
}

fn parse_chunk(data: &str) -> Option<Result<String, AiError>> {
    match serde_json::from_str::<GenerateResponse>(data) {
        Ok(response) => Some(response.text()).filter(|text| !text.is_empty()).map(Ok),
        Err(e) => {
            debug!(error = %e, "Skipping unreadable Gemini chunk");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_model_prefix_is_accepted() {
        let a = GeminiModel::new(Client::new(), "https://g.test/v1beta", ApiKey::new("k"), "gemini-2.0-flash");
        let b = GeminiModel::new(
            Client::new(),
            "https://g.test/v1beta/",
            ApiKey::new("k"),
            "models/gemini-2.0-flash",
        );
        assert_eq!(a.model_url, "https://g.test/v1beta/models/gemini-2.0-flash");
        assert_eq!(a.model_url, b.model_url);
    }

    #[test]
    fn test_parse_chunk_joins_parts() {
        let data = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"fix: "},{"text":"typo"}]}}]}"#;
        assert_eq!(parse_chunk(data).unwrap().unwrap(), "fix: typo");
    }

    #[test]
    fn test_parse_chunk_without_text_is_skipped() {
        assert!(parse_chunk(r#"{"candidates":[{"finishReason":"STOP"}]}"#).is_none());
        assert!(parse_chunk(r#"{"usageMetadata":{}}"#).is_none());
    }

    #[test]
    fn test_structured_request_shape() {
        let schema = ResponseSchema::builder().build();
        let config = GenerationConfig {
            response_mime_type: "application/json",
            response_schema: schema.to_gemini_schema(),
        };
        let body = serde_json::to_value(GeminiModel::request("hello", Some(config))).unwrap();
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            json!("application/json")
        );
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }
}
