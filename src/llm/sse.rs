//! Server-sent event plumbing shared by the streaming clients.

use futures::{StreamExt, future};
use reqwest::RequestBuilder;
use reqwest_eventsource::{Error as EventSourceError, Event, RequestBuilderExt, retry::Never};
use tracing::debug;

use crate::error::AiError;

use super::{GENERATION_CONTEXT, TextStream};

const DONE_MARKER: &str = "[DONE]";

/// Open an SSE stream and wait until the provider accepts it.
///
/// A non-success status is read and reported as `UpstreamHttp`. Once open,
/// each `data:` payload goes through `parse`; `None` skips the event. The
/// stream ends at `[DONE]` or when the server closes the connection.
pub(crate) async fn open<F>(
    request: RequestBuilder,
    connect_message: &'static str,
    parse: F,
) -> Result<TextStream, AiError>
where
    F: Fn(&str) -> Option<Result<String, AiError>> + Send + 'static,
{
    let mut source = request.eventsource().map_err(|e| {
        debug!(error = %e, "Could not build event source");
        AiError::Transport(connect_message.to_string())
    })?;
    // Exactly one provider call per generation.
    source.set_retry_policy(Box::new(Never));

    match source.next().await {
        Some(Ok(Event::Open)) => {}
        Some(Ok(Event::Message(message))) => {
            debug!(data = %message.data, "Message received before open event");
        }
        Some(Err(err)) => {
            source.close();
            return Err(open_error(err, connect_message).await);
        }
        None => return Err(AiError::Transport(connect_message.to_string())),
    }
    debug!("Event stream opened");

    let deltas = source
        .take_while(|event| {
            future::ready(match event {
                Err(EventSourceError::StreamEnded) => false,
                Ok(Event::Message(message)) => message.data.trim() != DONE_MARKER,
                _ => true,
            })
        })
        .filter_map(move |event| {
            future::ready(match event {
                Ok(Event::Open) => None,
                Ok(Event::Message(message)) => parse(&message.data),
                Err(err) => Some(Err(stream_error(err, connect_message))),
            })
        })
        // The event source closes itself after an error; stop here too.
        .scan(false, |failed, item| {
            if *failed {
                return future::ready(None);
            }
            *failed = item.is_err();
            future::ready(Some(item))
        });

    Ok(Box::pin(deltas))
}

async fn open_error(err: EventSourceError, connect_message: &str) -> AiError {
    match err {
        EventSourceError::InvalidStatusCode(status, response) => {
            let body = response.text().await.unwrap_or_default();
            AiError::upstream(status.as_u16(), GENERATION_CONTEXT, &body)
        }
        EventSourceError::InvalidContentType(content_type, response) => {
            let status = response.status().as_u16();
            debug!(?content_type, status, "Provider did not answer with an event stream");
            let body = response.text().await.unwrap_or_default();
            AiError::upstream(status, GENERATION_CONTEXT, &body)
        }
        other => stream_error(other, connect_message),
    }
}

fn stream_error(err: EventSourceError, connect_message: &str) -> AiError {
    match err {
        EventSourceError::Transport(e) => {
            debug!(error = %e.without_url(), "Event stream transport failure");
        }
        other => {
            debug!(error = %other, "Event stream failure");
        }
    }
    AiError::Transport(connect_message.to_string())
}
