//! Relays upstream deltas to the HTTP response body.
//!
//! Each relay moves through `Requesting → Streaming → Completed | Errored`
//! (the `Requesting` phase is the handler awaiting `LlmClient::stream`).
//! If the client disconnects, the body stream is dropped, which drops the
//! upstream response and closes that connection too.

use std::fmt;

use axum::{body::Body, http::header, response::Response};
use bytes::Bytes;
use futures_util::StreamExt;
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::llm_client::DeltaStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayPhase {
    Streaming,
    Completed,
    Errored,
}

impl fmt::Display for RelayPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RelayPhase::Streaming => "streaming",
            RelayPhase::Completed => "completed",
            RelayPhase::Errored => "errored",
        };
        f.write_str(s)
    }
}

/// Frame kinds of the chatbot's line-prefixed stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Content,
    Reasoning,
    Error,
}

impl FrameKind {
    fn prefix(&self) -> &'static str {
        match self {
            FrameKind::Content => "0:",
            FrameKind::Reasoning => "r:",
            FrameKind::Error => "e:",
        }
    }
}

/// `<prefix><json string>\n`. JSON-encoding keeps embedded newlines on one line.
pub fn encode_frame(kind: FrameKind, text: &str) -> String {
    let encoded = serde_json::Value::String(text.to_string()).to_string();
    format!("{}{}\n", kind.prefix(), encoded)
}

fn stream_response(content_type: &'static str, body: Body) -> Result<Response, AppError> {
    Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, "no-cache")
        .header("x-content-type-options", "nosniff")
        .body(body)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to build stream response: {e}")))
}

/// Raw `text/plain` relay of content deltas. Reasoning is dropped.
/// A mid-stream failure aborts the body so the client sees a broken stream
/// rather than a silently truncated component.
pub fn plain_text_response(mut deltas: DeltaStream, label: &'static str) -> Result<Response, AppError> {
    debug!(relay = label, phase = %RelayPhase::Streaming, "Relay started");

    let body = async_stream::stream! {
        let mut chunks = 0usize;
        let mut bytes_sent = 0usize;
        let mut phase = RelayPhase::Completed;

        while let Some(item) = deltas.next().await {
            match item {
                Ok(delta) => {
                    if let Some(text) = delta.content.filter(|t| !t.is_empty()) {
                        chunks += 1;
                        bytes_sent += text.len();
                        yield Ok::<_, std::io::Error>(Bytes::from(text));
                    }
                }
                Err(e) => {
                    warn!(relay = label, "Upstream stream failed after {chunks} chunks: {e}");
                    phase = RelayPhase::Errored;
                    yield Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
                    break;
                }
            }
        }

        info!(relay = label, phase = %phase, chunks, bytes_sent, "Relay finished");
    };

    stream_response("text/plain; charset=utf-8", Body::from_stream(body))
}

/// Line-prefixed relay for the chatbot: `0:` content, `r:` reasoning,
/// `e:` error (after which the stream ends normally).
pub fn chat_frames_response(mut deltas: DeltaStream) -> Result<Response, AppError> {
    debug!(relay = "chatbot", phase = %RelayPhase::Streaming, "Relay started");

    let body = async_stream::stream! {
        let mut frames = 0usize;
        let mut phase = RelayPhase::Completed;

        while let Some(item) = deltas.next().await {
            match item {
                Ok(delta) => {
                    if let Some(reasoning) = delta.reasoning.filter(|t| !t.is_empty()) {
                        frames += 1;
                        yield Ok::<_, std::io::Error>(Bytes::from(encode_frame(FrameKind::Reasoning, &reasoning)));
                    }
                    if let Some(content) = delta.content.filter(|t| !t.is_empty()) {
                        frames += 1;
                        yield Ok(Bytes::from(encode_frame(FrameKind::Content, &content)));
                    }
                }
                Err(e) => {
                    warn!(relay = "chatbot", "Upstream stream failed after {frames} frames: {e}");
                    phase = RelayPhase::Errored;
                    yield Ok(Bytes::from(encode_frame(FrameKind::Error, &e.to_string())));
                    break;
                }
            }
        }

        info!(relay = "chatbot", phase = %phase, frames, "Relay finished");
    };

    stream_response("text/plain; charset=utf-8", Body::from_stream(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::{Delta, LlmError};

    fn deltas(items: Vec<Result<Delta, LlmError>>) -> DeltaStream {
        Box::pin(futures_util::stream::iter(items))
    }

    fn content(text: &str) -> Result<Delta, LlmError> {
        Ok(Delta {
            content: Some(text.to_string()),
            reasoning: None,
        })
    }

    #[test]
    fn test_encode_frames() {
        assert_eq!(encode_frame(FrameKind::Content, "hi"), "0:\"hi\"\n");
        assert_eq!(encode_frame(FrameKind::Reasoning, "a\nb"), "r:\"a\\nb\"\n");
        assert_eq!(encode_frame(FrameKind::Error, "boom"), "e:\"boom\"\n");
    }

    #[tokio::test]
    async fn test_plain_text_concatenates_content() {
        let resp = plain_text_response(
            deltas(vec![
                content("<file path=\"App.tsx\">"),
                Ok(Delta {
                    content: None,
                    reasoning: Some("hidden".into()),
                }),
                content("x</file>"),
            ]),
            "test",
        )
        .unwrap();
        assert_eq!(
            resp.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"<file path=\"App.tsx\">x</file>");
    }

    #[tokio::test]
    async fn test_plain_text_errors_midstream() {
        let resp = plain_text_response(
            deltas(vec![
                content("partial"),
                Err(LlmError::Api {
                    status: 502,
                    message: "upstream died".into(),
                }),
            ]),
            "test",
        )
        .unwrap();
        assert!(axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_chat_frames_order_and_error() {
        let resp = chat_frames_response(deltas(vec![
            Ok(Delta {
                content: Some("Hello".into()),
                reasoning: Some("greet".into()),
            }),
            Err(LlmError::EmptyContent),
            content("never sent"),
        ]))
        .unwrap();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(
            std::str::from_utf8(&body).unwrap(),
            "r:\"greet\"\n0:\"Hello\"\ne:\"LLM returned empty content\"\n"
        );
    }
}
