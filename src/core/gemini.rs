//! [`ModelEndpoint`] backed by the Gemini REST API.
//!
//! Replies are requested from `streamGenerateContent?alt=sse`. Each SSE
//! `data:` payload carries a text delta; deltas are folded into cumulative
//! snapshots. The chat handle keeps the conversation history client-side and
//! only records an exchange once its stream has completed cleanly.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::{stream, Stream, StreamExt};
use reqwest::Client;
use tracing::{debug, warn};

use crate::api::{
    Content, ErrorEnvelope, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
};
use crate::core::chat_stream::{accumulate_deltas, extract_data_payload, LineBuffer};
use crate::core::constants::API_KEY_ENV_VARS;
use crate::core::endpoint::{ChatConfig, EndpointError, ModelEndpoint, SnapshotStream};
use crate::utils::url::stream_generate_url;

const MAX_ERROR_SUMMARY_CHARS: usize = 300;

#[derive(Clone)]
pub struct GeminiEndpoint {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GeminiEndpoint {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }

    /// Reads the API key from the first populated variable in
    /// [`API_KEY_ENV_VARS`].
    pub fn from_env(base_url: impl Into<String>) -> Self {
        let api_key = API_KEY_ENV_VARS
            .iter()
            .find_map(|name| std::env::var(name).ok().filter(|v| !v.trim().is_empty()));
        Self::new(base_url, api_key)
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Client-side chat context: settings plus the committed history.
#[derive(Clone, Debug)]
pub struct GeminiChat {
    config: ChatConfig,
    history: Arc<Mutex<Vec<Content>>>,
}

impl GeminiChat {
    fn new(config: ChatConfig) -> Self {
        Self {
            config,
            history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn history(&self) -> Vec<Content> {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn record_exchange(&self, user_text: String, reply: String) {
        let mut history = self
            .history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        history.push(Content::user(user_text));
        history.push(Content::model(reply));
    }

    fn build_request(&self, message: &str) -> GenerateContentRequest {
        let mut contents = self.history();
        contents.push(Content::user(message));
        GenerateContentRequest {
            contents,
            system_instruction: Some(Content::instruction(&self.config.system_instruction)),
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
            },
        }
    }
}

#[async_trait]
impl ModelEndpoint for GeminiEndpoint {
    type Handle = GeminiChat;

    fn create_session(&self, config: &ChatConfig) -> Result<GeminiChat, EndpointError> {
        if self.api_key.is_none() {
            return Err(EndpointError::MissingApiKey);
        }
        Ok(GeminiChat::new(config.clone()))
    }

    async fn stream_send(
        &self,
        handle: &GeminiChat,
        message: &str,
    ) -> Result<SnapshotStream, EndpointError> {
        let api_key = self.api_key.as_deref().ok_or(EndpointError::MissingApiKey)?;
        let url = stream_generate_url(&self.base_url, &handle.config.model);
        let request = handle.build_request(message);
        debug!(model = %handle.config.model, turns = request.contents.len(), "opening stream");

        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            warn!(status = status.as_u16(), "model endpoint rejected request");
            return Err(EndpointError::Http {
                status: status.as_u16(),
                message: summarize_error_body(&body),
            });
        }

        let snapshots = accumulate_deltas(sse_deltas(response.bytes_stream()));
        Ok(record_on_completion(
            snapshots,
            handle.clone(),
            message.to_string(),
        ))
    }
}

/// Parses one SSE line. `None` means the line carries no text.
fn parse_sse_line(line: &str) -> Option<Result<String, EndpointError>> {
    let payload = extract_data_payload(line)?;
    if payload.is_empty() || payload == "[DONE]" {
        return None;
    }

    match serde_json::from_str::<GenerateContentResponse>(payload) {
        Ok(response) => {
            if let Some(error) = response.error.as_ref() {
                return Some(Err(EndpointError::Api(error.summary())));
            }
            response.delta_text().map(Ok)
        }
        Err(e) => Some(Err(EndpointError::Decode(format!(
            "{e}: {}",
            truncate(payload, MAX_ERROR_SUMMARY_CHARS)
        )))),
    }
}

struct SseState<S> {
    bytes: std::pin::Pin<Box<S>>,
    lines: LineBuffer,
    exhausted: bool,
}

/// Text deltas carried by an SSE byte stream. The stream ends after the first
/// error.
fn sse_deltas<S, B, E>(bytes: S) -> impl Stream<Item = Result<String, EndpointError>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<EndpointError> + Send + 'static,
{
    let state = SseState {
        bytes: Box::pin(bytes),
        lines: LineBuffer::default(),
        exhausted: false,
    };

    stream::unfold(Some(state), |state| async move {
        let mut state = state?;
        loop {
            if let Some(line) = state.lines.next_line() {
                match parse_sse_line(&line) {
                    Some(Ok(delta)) => return Some((Ok(delta), Some(state))),
                    Some(Err(err)) => return Some((Err(err), None)),
                    None => continue,
                }
            }

            if state.exhausted {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => state.lines.push(chunk.as_ref()),
                Some(Err(err)) => return Some((Err(err.into()), None)),
                None => {
                    state.exhausted = true;
                    if let Some(rest) = state.lines.take_remainder() {
                        state.lines.push(rest.as_bytes());
                        state.lines.push(b"\n");
                    }
                }
            }
        }
    })
}

struct RecordState {
    snapshots: SnapshotStream,
    chat: GeminiChat,
    message: String,
    last: String,
}

/// Passes snapshots through and commits the exchange to the chat history once
/// the stream ends without error.
fn record_on_completion(
    snapshots: SnapshotStream,
    chat: GeminiChat,
    message: String,
) -> SnapshotStream {
    let state = RecordState {
        snapshots,
        chat,
        message,
        last: String::new(),
    };

    Box::pin(stream::unfold(Some(state), |state| async move {
        let mut state = state?;
        match state.snapshots.next().await {
            Some(Ok(snapshot)) => {
                state.last.clone_from(&snapshot);
                Some((Ok(snapshot), Some(state)))
            }
            Some(Err(err)) => Some((Err(err), None)),
            None => {
                if !state.last.is_empty() {
                    state.chat.record_exchange(state.message, state.last);
                }
                None
            }
        }
    }))
}

fn summarize_error_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(trimmed) {
        return envelope.error.summary();
    }
    let collapsed = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate(&collapsed, MAX_ERROR_SUMMARY_CHARS)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}
