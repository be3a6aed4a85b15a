//! Shared test utilities for integration tests.
//!
//! Not all functions are used by every test file, but they're shared across tests.
#![allow(dead_code)]

use serde_json::{Value, json};

use commit_assist::{
    ApiKey, CommitTypeCatalog, FieldFlags, GenerationRequest, ProviderCredentials, ProviderId,
};

pub const TEST_KEY: &str = "test-key-0000-abcd";

pub const DIFF: &str = "\
diff --git a/src/auth.rs b/src/auth.rs
index 1111111..2222222 100644
--- a/src/auth.rs
+++ b/src/auth.rs
@@ -1,3 +1,6 @@
+pub fn login(user: &str) -> bool {
+    !user.is_empty()
+}
";

/// Credentials for a provider, optionally pointed at a mock server.
pub fn credentials(provider: ProviderId, model: &str, base_url: Option<&str>) -> ProviderCredentials {
    let creds = ProviderCredentials::new(provider, ApiKey::new(TEST_KEY), model);
    match base_url {
        Some(url) => creds.with_base_url(url),
        None => creds,
    }
}

pub fn request(fields: FieldFlags) -> GenerationRequest {
    GenerationRequest {
        language: "English".to_string(),
        max_length: 72,
        diff: DIFF.to_string(),
        catalog: CommitTypeCatalog::Default,
        fields,
        fixed_type: None,
    }
}

/// Serialize payloads as an SSE body (`data: ...` frames).
pub fn sse_body<'a>(frames: impl IntoIterator<Item = &'a str>) -> String {
    frames
        .into_iter()
        .map(|frame| format!("data: {frame}\n\n"))
        .collect()
}

/// OpenAI chat-completion chunks for `deltas`, terminated by `[DONE]`.
pub fn openai_stream(deltas: &[&str]) -> String {
    let mut frames = vec![json!({"choices": [{"index": 0, "delta": {"role": "assistant"}}]}).to_string()];
    frames.extend(
        deltas
            .iter()
            .map(|d| json!({"choices": [{"index": 0, "delta": {"content": d}}]}).to_string()),
    );
    frames.push("[DONE]".to_string());
    sse_body(frames.iter().map(String::as_str))
}

/// Gemini streamGenerateContent chunks for `deltas`.
pub fn gemini_stream(deltas: &[&str]) -> String {
    let frames: Vec<String> = deltas
        .iter()
        .map(|d| {
            json!({"candidates": [{"content": {"role": "model", "parts": [{"text": d}]}}]})
                .to_string()
        })
        .collect();
    sse_body(frames.iter().map(String::as_str))
}

/// Non-streaming chat completion whose message content is `content`.
pub fn openai_completion(content: &Value) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content.to_string()},
            "finish_reason": "stop"
        }]
    })
}

/// Gemini generateContent response carrying `content` as text.
pub fn gemini_completion(content: &Value) -> Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": content.to_string()}]},
            "finishReason": "STOP"
        }]
    })
}
