//! Model catalog fetching.
//!
//! Gemini and OpenAI-compatible providers list their models in different
//! shapes; both are normalized to [`Model`] and sorted by display name.

use std::cmp::Ordering;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AiError;

use super::resolver::{ClientHandle, resolve_client};
use super::{
    ApiKey, COMPATIBLE_CONNECT_FAILED, GEMINI_API_BASE, GEMINI_CONNECT_FAILED, ProviderId,
};

const GEMINI_CONTEXT: &str = "Failed to fetch Gemini models";
const COMPATIBLE_CONTEXT: &str = "Failed to fetch models";

/// A model offered by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Model {
    pub id: String,
    pub name: String,
}

#[derive(Deserialize)]
struct GeminiModelList {
    #[serde(default)]
    models: Vec<GeminiModel>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiModel {
    name: String,
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct CompatibleModelList {
    data: Vec<CompatibleModel>,
}

#[derive(Deserialize)]
struct CompatibleModel {
    id: String,
}

/// Lists models for any supported provider.
#[derive(Debug, Clone)]
pub struct CatalogFetcher {
    http: Client,
    gemini_base_url: String,
}

impl Default for CatalogFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogFetcher {
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

    /// Fetch the provider's models, sorted ascending by name.
    pub async fn list_models(
        &self,
        provider: ProviderId,
        api_key: &ApiKey,
        base_url_override: Option<&str>,
    ) -> Result<Vec<Model>, AiError> {
        let mut models = match resolve_client(provider, api_key, base_url_override)? {
            ClientHandle::Gemini { api_key } => self.gemini_models(&api_key).await?,
            ClientHandle::OpenAiCompatible {
                base_url, api_key, ..
            } => self.compatible_models(&base_url, &api_key).await?,
        };

        models.sort_by(|a, b| compare_names(&a.name, &b.name));
        debug!(provider = %provider, count = models.len(), "Fetched model catalog");
        Ok(models)
    }

    async fn gemini_models(&self, api_key: &ApiKey) -> Result<Vec<Model>, AiError> {
        let url = format!("{}/models", self.gemini_base_url);
        debug!(url = %url, "Fetching Gemini models");

        let response = self
            .http
            .get(&url)
            .query(&[("key", api_key.expose())])
            .send()
            .await
            .map_err(|e| connect_failed(e, GEMINI_CONNECT_FAILED))?;

        let list: GeminiModelList =
            read_json(response, GEMINI_CONTEXT, GEMINI_CONNECT_FAILED).await?;

        Ok(list
            .models
            .into_iter()
            .map(|model| Model {
                name: model.display_name.unwrap_or_else(|| model.name.clone()),
                id: model.name,
            })
            .collect())
    }

    async fn compatible_models(
        &self,
        base_url: &str,
        api_key: &ApiKey,
    ) -> Result<Vec<Model>, AiError> {
        let url = format!("{}/models", base_url);
        debug!(url = %url, "Fetching models");

        let response = self
            .http
            .get(&url)
            .bearer_auth(api_key.expose())
            .send()
            .await
            .map_err(|e| connect_failed(e, COMPATIBLE_CONNECT_FAILED))?;

        let list: CompatibleModelList =
            read_json(response, COMPATIBLE_CONTEXT, COMPATIBLE_CONNECT_FAILED).await?;

        Ok(list
            .data
            .into_iter()
            .map(|model| Model {
                name: model.id.clone(),
                id: model.id,
            })
            .collect())
    }
}

/// Fetch models with a default [`CatalogFetcher`].
pub async fn list_models(
    provider: ProviderId,
    api_key: &ApiKey,
    base_url_override: Option<&str>,
) -> Result<Vec<Model>, AiError> {
    CatalogFetcher::new()
        .list_models(provider, api_key, base_url_override)
        .await
}

/// Collation-like ordering: case-insensitive, then lowercase before uppercase.
fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

fn connect_failed(err: reqwest::Error, message: &str) -> AiError {
    // Strip the URL: Gemini carries the key in the query string.
    debug!(error = %err.without_url(), "Catalog request failed");
    AiError::Transport(message.to_string())
}

async fn read_json<T: DeserializeOwned>(
    response: Response,
    context: &str,
    connect_message: &str,
) -> Result<T, AiError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| connect_failed(e, connect_message))?;

    if !status.is_success() {
        return Err(AiError::upstream(status.as_u16(), context, &body));
    }

    serde_json::from_str(&body).map_err(|e| {
        debug!(error = %e, "Catalog response did not match the expected shape");
        AiError::UpstreamHttp {
            status: status.as_u16(),
            message: format!("{}: invalid response body", context),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_names_case_insensitive() {
        let mut names = vec!["gpt-4o", "Babbage", "ada", "GPT-3.5"];
        names.sort_by(|a, b| compare_names(a, b));
        assert_eq!(names, vec!["ada", "Babbage", "GPT-3.5", "gpt-4o"]);
    }

    #[test]
    fn test_compare_names_lowercase_first_on_tie() {
        let mut names = vec!["Model", "model"];
        names.sort_by(|a, b| compare_names(a, b));
        assert_eq!(names, vec!["model", "Model"]);
    }

    #[test]
    fn test_gemini_model_without_display_name_uses_id() {
        let list: GeminiModelList =
            serde_json::from_str(r#"{"models": [{"name": "models/embedding-001"}]}"#).unwrap();
        assert!(list.models[0].display_name.is_none());
    }

    #[tokio::test]
    async fn test_custom_without_base_url_fails_before_network() {
        let fetcher = CatalogFetcher::new();
        let result = fetcher
            .list_models(ProviderId::Custom, &ApiKey::new("k"), None)
            .await;
        assert!(matches!(result, Err(AiError::MissingBaseUrl)));
    }
}
