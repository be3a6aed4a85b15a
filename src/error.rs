//! Error types for commit-assist modules using thiserror.

use serde::Deserialize;
use thiserror::Error;

/// Fallback used when a vendor error body has no recognizable message.
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred";

/// Errors surfaced by the generation core (resolver, catalog, dispatcher).
///
/// Every public entry point of the core returns this type; raw transport or
/// decoding errors never escape unlabeled.
#[derive(Error, Debug)]
pub enum AiError {
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("Base URL not found for provider 'custom'. Set a base URL for custom providers.")]
    MissingBaseUrl,

    #[error("{message}")]
    UpstreamHttp { status: u16, message: String },

    #[error("{0}")]
    Transport(String),

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Model response failed schema validation: {0}")]
    SchemaValidation(String),
}

impl AiError {
    /// Build an `UpstreamHttp` error from a non-success response body.
    ///
    /// `context` identifies the failing call, e.g. "Failed to fetch models".
    pub fn upstream(status: u16, context: &str, body: &str) -> Self {
        AiError::UpstreamHttp {
            status,
            message: format!("{}: {}", context, extract_error_message(body)),
        }
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorPayload,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorPayload {
    Text(String),
    Detailed { message: String },
}

/// Pull a human-readable message out of a vendor error body.
///
/// Accepts `{"error": "..."}` and `{"error": {"message": "..."}}`. Anything
/// else, including bodies that are not JSON, yields [`UNKNOWN_ERROR_MESSAGE`].
pub fn extract_error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope {
            error: ErrorPayload::Text(message),
        })
        | Ok(ErrorEnvelope {
            error: ErrorPayload::Detailed { message },
        }) => message,
        Err(_) => UNKNOWN_ERROR_MESSAGE.to_string(),
    }
}

/// Errors from loading the settings blob.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings file {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings file {path}: {source}")]
    ParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid settings file {path}: max_length must be a positive number of characters")]
    InvalidMaxLength { path: String },

    #[error("No API key configured for provider '{0}'. Set it in the settings file, COMMIT_ASSIST_API_KEY, or --api-key")]
    MissingApiKey(String),

    #[error("No model configured for provider '{0}'. Set it in the settings file, COMMIT_ASSIST_MODEL, or --model")]
    MissingModel(String),

    #[error(transparent)]
    Provider(#[from] AiError),
}

/// Errors from reading staged changes.
#[derive(Error, Debug)]
pub enum DiffError {
    #[error("No staged changes found. Stage files with `git add` first.")]
    NoStagedChanges,

    #[error("Failed to open repository: {0}")]
    OpenRepository(#[source] git2::Error),

    #[error("Failed to collect staged diff: {0}")]
    DiffFailed(#[source] git2::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_error_message_from_object() {
        let body = r#"{"error": {"message": "rate limited", "type": "requests"}}"#;
        assert_eq!(extract_error_message(body), "rate limited");
    }

    #[test]
    fn test_extract_error_message_from_string() {
        let body = r#"{"error": "invalid api key"}"#;
        assert_eq!(extract_error_message(body), "invalid api key");
    }

    #[test]
    fn test_extract_error_message_unknown_shape() {
        assert_eq!(
            extract_error_message(r#"{"detail": "nope"}"#),
            UNKNOWN_ERROR_MESSAGE
        );
        assert_eq!(
            extract_error_message(r#"{"error": {"code": 500}}"#),
            UNKNOWN_ERROR_MESSAGE
        );
    }

    #[test]
    fn test_extract_error_message_not_json() {
        assert_eq!(
            extract_error_message("<html>Bad Gateway</html>"),
            UNKNOWN_ERROR_MESSAGE
        );
        assert_eq!(extract_error_message(""), UNKNOWN_ERROR_MESSAGE);
    }

    #[test]
    fn test_upstream_error_is_prefixed() {
        let err = AiError::upstream(
            429,
            "Failed to fetch Gemini models",
            r#"{"error": {"message": "quota exceeded"}}"#,
        );
        assert_eq!(
            err.to_string(),
            "Failed to fetch Gemini models: quota exceeded"
        );
        assert!(matches!(err, AiError::UpstreamHttp { status: 429, .. }));
    }

    #[test]
    fn test_timeout_message() {
        assert_eq!(
            AiError::Timeout(30).to_string(),
            "Request timed out after 30 seconds"
        );
    }
}
