//! LLM client: the single entry point for all text-generation calls.
//!
//! Talks to an OpenAI-compatible chat completions gateway. The model id is
//! supplied per call because it is chosen at runtime by the AI config resolver.

use std::pin::Pin;
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;
pub mod sse;

use sse::{SseDecoder, SseEvent};

pub const DEFAULT_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const MAX_TOKENS: u32 = 8192;
const MAX_RETRIES: u32 = 3;
/// Total deadline for a non-streaming completion, body included.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One conversation turn. Unknown roles fail deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Per-call knobs for non-streaming completions.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompletionOptions {
    pub seed: Option<u64>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    error: Option<GatewayErrorBody>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

/// One incremental piece of a streamed completion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Delta {
    pub content: Option<String>,
    pub reasoning: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GatewayError {
    error: GatewayErrorBody,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorBody {
    message: String,
    code: Option<serde_json::Value>,
}

pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<Delta, LlmError>> + Send>>;

#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    api_url: String,
}

impl LlmClient {
    pub fn new(api_key: String, api_url: String) -> Result<Self, LlmError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!("shadway-api/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_key,
            api_url,
        })
    }

    fn request(&self, body: &ChatCompletionRequest<'_>) -> reqwest::RequestBuilder {
        self.client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(body)
    }

    /// Non-streaming completion returning the first choice's text.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    pub async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: CompletionOptions,
    ) -> Result<String, LlmError> {
        let body = ChatCompletionRequest {
            model,
            messages,
            max_tokens: MAX_TOKENS,
            stream: false,
            seed: options.seed,
            temperature: options.temperature,
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self.request(&body).timeout(REQUEST_TIMEOUT).send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let text = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, text);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: gateway_message(text),
                });
                continue;
            }

            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message: gateway_message(text),
                });
            }

            let completion: ChatCompletionResponse = response.json().await?;

            if let Some(usage) = &completion.usage {
                debug!(
                    "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                    usage.prompt_tokens, usage.completion_tokens
                );
            }

            return completion
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .filter(|text| !text.trim().is_empty())
                .ok_or(LlmError::EmptyContent);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }

    /// Opens a streaming completion. Single attempt: a non-2xx answer is
    /// returned as `LlmError::Api` before any delta is produced. No total
    /// deadline applies; a stream lives as long as the upstream keeps sending.
    ///
    /// Dropping the returned stream drops the HTTP response and closes the
    /// upstream connection.
    pub async fn stream(&self, model: &str, messages: &[ChatMessage]) -> Result<DeltaStream, LlmError> {
        let body = ChatCompletionRequest {
            model,
            messages,
            max_tokens: MAX_TOKENS,
            stream: true,
            seed: None,
            temperature: None,
        };

        let response = self.request(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: gateway_message(text),
            });
        }

        debug!(model, "LLM stream opened");

        let mut bytes = Box::pin(response.bytes_stream());
        let deltas = async_stream::stream! {
            let mut decoder = SseDecoder::default();
            let mut finished = false;

            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(LlmError::Http(e));
                        finished = true;
                        break;
                    }
                };

                for event in decoder.push(&chunk) {
                    match decode_event(event) {
                        Some(Ok(delta)) => yield Ok(delta),
                        Some(Err(e)) => {
                            yield Err(e);
                            finished = true;
                            break;
                        }
                        None => {}
                    }
                }
                if finished {
                    break;
                }
            }

            if !finished {
                if let Some(Some(item)) = decoder.finish().map(decode_event) {
                    yield item;
                }
            }
        };

        Ok(Box::pin(deltas))
    }
}

/// Turns one SSE event into a delta. `None` means "nothing to emit".
/// `[DONE]` is also `None`: the upstream closes the body right after it.
fn decode_event(event: SseEvent) -> Option<Result<Delta, LlmError>> {
    let SseEvent::Data(data) = event else {
        return None;
    };

    let chunk: StreamChunk = match serde_json::from_str(&data) {
        Ok(c) => c,
        Err(e) => {
            warn!("Skipping undecodable stream chunk: {e}");
            return None;
        }
    };

    if let Some(err) = chunk.error {
        let status = err
            .code
            .as_ref()
            .and_then(|c| c.as_u64())
            .and_then(|c| u16::try_from(c).ok())
            .unwrap_or(502);
        return Some(Err(LlmError::Api {
            status,
            message: err.message,
        }));
    }

    let delta = chunk.choices.into_iter().next()?.delta;
    if delta.content.as_deref().unwrap_or_default().is_empty()
        && delta.reasoning.as_deref().unwrap_or_default().is_empty()
    {
        return None;
    }
    Some(Ok(delta))
}

/// Extracts `error.message` from a gateway error body, falling back to the raw text.
fn gateway_message(body: String) -> String {
    serde_json::from_str::<GatewayError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answers one request with a chunked SSE body, one delta per `gap`.
    async fn slow_sse_gateway(deltas: usize, gap: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();

            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let content_length = text[..head_end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= head_end + 4 + content_length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }

            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ntransfer-encoding: chunked\r\n\r\n",
                )
                .await
                .unwrap();

            let mut events: Vec<String> = (0..deltas)
                .map(|i| format!("data: {{\"choices\":[{{\"delta\":{{\"content\":\"d{i}\"}}}}]}}\n\n"))
                .collect();
            events.push("data: [DONE]\n\n".to_string());

            for event in events {
                tokio::time::sleep(gap).await;
                let chunk = format!("{:x}\r\n{event}\r\n", event.len());
                socket.write_all(chunk.as_bytes()).await.unwrap();
            }
            socket.write_all(b"0\r\n\r\n").await.unwrap();
            socket.flush().await.unwrap();
        });

        format!("http://{addr}/v1/chat/completions")
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_outlives_request_timeout() {
        let url = slow_sse_gateway(8, Duration::from_secs(60)).await;
        let client = LlmClient::new("test-key".to_string(), url).unwrap();

        let started = tokio::time::Instant::now();
        let mut deltas = client
            .stream("openai/gpt-4o", &[ChatMessage::user("hero")])
            .await
            .unwrap();

        let mut received = Vec::new();
        while let Some(item) = deltas.next().await {
            received.push(item.unwrap().content.unwrap());
        }

        assert_eq!(received.len(), 8);
        assert_eq!(received[7], "d7");
        assert!(started.elapsed() > REQUEST_TIMEOUT);
    }

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n[\"a\", \"b\"]\n```";
        assert_eq!(strip_json_fences(input), "[\"a\", \"b\"]");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_role_rejects_unknown_value() {
        let parsed = serde_json::from_str::<ChatMessage>(r#"{"role":"tool","content":"x"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_decode_content_delta() {
        let event = SseEvent::Data(r#"{"choices":[{"delta":{"content":"<file"}}]}"#.into());
        let delta = decode_event(event).unwrap().unwrap();
        assert_eq!(delta.content.as_deref(), Some("<file"));
        assert_eq!(delta.reasoning, None);
    }

    #[test]
    fn test_decode_reasoning_delta() {
        let event =
            SseEvent::Data(r#"{"choices":[{"delta":{"content":"","reasoning":"thinking"}}]}"#.into());
        let delta = decode_event(event).unwrap().unwrap();
        assert_eq!(delta.reasoning.as_deref(), Some("thinking"));
    }

    #[test]
    fn test_decode_skips_empty_delta_and_done() {
        let empty = SseEvent::Data(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#.into());
        assert!(decode_event(empty).is_none());
        assert!(decode_event(SseEvent::Done).is_none());
    }

    #[test]
    fn test_decode_midstream_error() {
        let event = SseEvent::Data(r#"{"error":{"message":"overloaded","code":503}}"#.into());
        match decode_event(event) {
            Some(Err(LlmError::Api { status, message })) => {
                assert_eq!(status, 503);
                assert_eq!(message, "overloaded");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_gateway_message_extracts_error_body() {
        let body = r#"{"error":{"message":"No endpoints found","code":404}}"#.to_string();
        assert_eq!(gateway_message(body), "No endpoints found");
        assert_eq!(gateway_message("plain".to_string()), "plain");
    }

    #[test]
    fn test_request_serializes_without_optional_fields() {
        let messages = vec![ChatMessage::user("hi")];
        let body = ChatCompletionRequest {
            model: "openai/gpt-4o",
            messages: &messages,
            max_tokens: 10,
            stream: true,
            seed: None,
            temperature: None,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["messages"][0]["role"], "user");
        assert!(value.get("seed").is_none());
    }
}
