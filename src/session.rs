//! Host-facing generation sessions.
//!
//! A session turns one dispatcher call into an ordered event sequence:
//! `Start`, then `Chunk`* (text) or `Data` (structured), an optional
//! `Error`, and always a final `End`.

use futures::StreamExt;
use tracing::debug;

use crate::dispatch::{GenerationRequest, Generator};
use crate::error::AiError;
use crate::llm::ModelConnector;
use crate::provider::ProviderCredentials;
use crate::schema::StructuredCommitMessage;

/// Event delivered to the host during a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationEvent {
    Start,
    Chunk(String),
    Data(StructuredCommitMessage),
    Error(String),
    End,
}

/// Emits `End` when dropped, including when the session future is dropped.
struct Emitter<F: FnMut(GenerationEvent)> {
    emit: F,
}

impl<F: FnMut(GenerationEvent)> Emitter<F> {
    fn start(mut emit: F) -> Self {
        emit(GenerationEvent::Start);
        Self { emit }
    }

    fn send(&mut self, event: GenerationEvent) {
        (self.emit)(event);
    }

    fn fail(&mut self, err: AiError) -> AiError {
        self.send(GenerationEvent::Error(err.to_string()));
        err
    }
}

impl<F: FnMut(GenerationEvent)> Drop for Emitter<F> {
    fn drop(&mut self) {
        (self.emit)(GenerationEvent::End);
    }
}

/// Stream a free-text commit message, emitting one `Chunk` per delta.
///
/// Yields to the executor after each chunk so the host can process it.
pub async fn run_text_session<C, F>(
    generator: &Generator<C>,
    creds: &ProviderCredentials,
    request: &GenerationRequest,
    debug: bool,
    emit: F,
) -> Result<(), AiError>
where
    C: ModelConnector,
    F: FnMut(GenerationEvent),
{
    let mut events = Emitter::start(emit);

    let mut stream = generator
        .generate_text(creds, request, debug)
        .await
        .map_err(|e| events.fail(e))?;

    let mut chunks = 0usize;
    while let Some(delta) = stream.next().await {
        let text = delta.map_err(|e| events.fail(e))?;
        events.send(GenerationEvent::Chunk(text));
        chunks += 1;
        tokio::task::yield_now().await;
    }

    debug!(chunks, "Text session finished");
    Ok(())
}

/// Generate a structured commit message, emitting it as a single `Data`.
pub async fn run_structured_session<C, F>(
    generator: &Generator<C>,
    creds: &ProviderCredentials,
    request: &GenerationRequest,
    debug: bool,
    emit: F,
) -> Result<StructuredCommitMessage, AiError>
where
    C: ModelConnector,
    F: FnMut(GenerationEvent),
{
    let mut events = Emitter::start(emit);

    let message = generator
        .generate_structured(creds, request, debug)
        .await
        .map_err(|e| events.fail(e))?;

    events.send(GenerationEvent::Data(message.clone()));
    Ok(message)
}

#[cfg(test)]
mod tests {
    use futures::stream;
    use serde_json::json;

    use super::*;
    use crate::llm::{MockLanguageModel, MockModelConnector};
    use crate::prompt::CommitTypeCatalog;
    use crate::provider::{ApiKey, ProviderId};
    use crate::schema::FieldFlags;

    fn creds() -> ProviderCredentials {
        ProviderCredentials::new(ProviderId::XAi, ApiKey::new("xai-key"), "grok-2")
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            language: "English".to_string(),
            max_length: 72,
            diff: "+added line\n".to_string(),
            catalog: CommitTypeCatalog::Default,
            fields: FieldFlags::default(),
            fixed_type: None,
        }
    }

    fn generator_with(model: MockLanguageModel) -> Generator<MockModelConnector> {
        let mut connector = MockModelConnector::new();
        connector
            .expect_connect()
            .return_once(move |_, _| Box::new(model));
        Generator::with_connector(connector)
    }

    #[tokio::test]
    async fn test_text_session_event_order() {
        let mut model = MockLanguageModel::new();
        model.expect_stream_text().returning(|_| {
            Ok(Box::pin(stream::iter(vec![
                Ok("docs: ".to_string()),
                Ok("update readme".to_string()),
            ])))
        });

        let mut events = Vec::new();
        run_text_session(&generator_with(model), &creds(), &request(), false, |e| {
            events.push(e)
        })
        .await
        .unwrap();

        assert_eq!(
            events,
            vec![
                GenerationEvent::Start,
                GenerationEvent::Chunk("docs: ".to_string()),
                GenerationEvent::Chunk("update readme".to_string()),
                GenerationEvent::End,
            ]
        );
    }

    #[tokio::test]
    async fn test_text_session_mid_stream_error() {
        let mut model = MockLanguageModel::new();
        model.expect_stream_text().returning(|_| {
            Ok(Box::pin(stream::iter(vec![
                Ok("fix: ".to_string()),
                Err(AiError::Transport(
                    "Failed to connect to the AI provider.".to_string(),
                )),
                Ok("never delivered".to_string()),
            ])))
        });

        let mut events = Vec::new();
        let result = run_text_session(&generator_with(model), &creds(), &request(), false, |e| {
            events.push(e)
        })
        .await;

        assert!(matches!(result, Err(AiError::Transport(_))));
        assert_eq!(
            events,
            vec![
                GenerationEvent::Start,
                GenerationEvent::Chunk("fix: ".to_string()),
                GenerationEvent::Error("Failed to connect to the AI provider.".to_string()),
                GenerationEvent::End,
            ]
        );
    }

    #[tokio::test]
    async fn test_structured_session_success() {
        let mut model = MockLanguageModel::new();
        model
            .expect_generate_object()
            .returning(|_, _| Ok(json!({ "type": "test", "description": "cover parser" })));

        let mut events = Vec::new();
        let message =
            run_structured_session(&generator_with(model), &creds(), &request(), false, |e| {
                events.push(e)
            })
            .await
            .unwrap();

        assert_eq!(message.commit_type, "test");
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], GenerationEvent::Start);
        assert_eq!(events[1], GenerationEvent::Data(message));
        assert_eq!(events[2], GenerationEvent::End);
    }

    #[tokio::test]
    async fn test_structured_session_failure() {
        let mut model = MockLanguageModel::new();
        model
            .expect_generate_object()
            .returning(|_, _| Ok(json!({ "type": "test" })));

        let mut events = Vec::new();
        let result =
            run_structured_session(&generator_with(model), &creds(), &request(), false, |e| {
                events.push(e)
            })
            .await;

        assert!(matches!(result, Err(AiError::SchemaValidation(_))));
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[1], GenerationEvent::Error(msg) if msg.contains("description")));
        assert_eq!(events[2], GenerationEvent::End);
    }

    #[tokio::test]
    async fn test_end_emitted_when_session_dropped() {
        let mut model = MockLanguageModel::new();
        model
            .expect_stream_text()
            .returning(|_| Ok(Box::pin(stream::pending())));

        let generator = generator_with(model);
        let creds = creds();
        let request = request();
        let mut events = Vec::new();
        {
            let session = run_text_session(&generator, &creds, &request, false, |e| events.push(e));
            let _ = tokio::time::timeout(std::time::Duration::from_millis(10), session).await;
        }

        assert_eq!(events, vec![GenerationEvent::Start, GenerationEvent::End]);
    }
}
