use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use memchr::memchr;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::endpoint::{EndpointError, ModelEndpoint, SnapshotStream};

#[derive(Clone, Debug, PartialEq)]
pub enum StreamMessage {
    /// Full reply text received so far.
    Snapshot(String),
    Error(String),
    End,
}

/// Everything needed to run one send against the endpoint.
pub struct StreamRequest<H> {
    /// The chat handle, or the reason one could not be created.
    pub target: Result<H, EndpointError>,
    pub message: String,
    pub cancel_token: CancellationToken,
    pub stream_id: u64,
}

/// Turns a stream of text deltas into a stream of cumulative snapshots.
/// Empty deltas are dropped; errors pass through unchanged.
pub fn accumulate_deltas<S>(deltas: S) -> SnapshotStream
where
    S: Stream<Item = Result<String, EndpointError>> + Send + 'static,
{
    let mut full_text = String::new();
    Box::pin(deltas.filter_map(move |item| {
        let out = match item {
            Ok(delta) if delta.is_empty() => None,
            Ok(delta) => {
                full_text.push_str(&delta);
                Some(Ok(full_text.clone()))
            }
            Err(err) => Some(Err(err)),
        };
        std::future::ready(out)
    }))
}

/// Splits a byte stream into trimmed text lines.
#[derive(Default)]
pub struct LineBuffer {
    buffer: Vec<u8>,
}

impl LineBuffer {
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Next complete line, if one is buffered. Lines that are not valid UTF-8
    /// are skipped.
    pub fn next_line(&mut self) -> Option<String> {
        loop {
            let newline_pos = memchr(b'\n', &self.buffer)?;
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            match std::str::from_utf8(&line) {
                Ok(s) => return Some(s.trim().to_string()),
                Err(e) => {
                    debug!("skipping invalid UTF-8 in stream: {e}");
                    continue;
                }
            }
        }
    }

    /// Whatever is left once the byte stream has ended.
    pub fn take_remainder(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        let text = String::from_utf8_lossy(&rest).trim().to_string();
        (!text.is_empty()).then_some(text)
    }
}

pub fn extract_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

/// Runs one send to completion, reporting progress through `emit`.
///
/// Exactly one terminal message is emitted: `End` on success, or `Error`
/// followed by `End` on failure. Nothing further is emitted once the request's
/// cancel token fires.
pub async fn run_stream<E, F>(endpoint: &E, request: StreamRequest<E::Handle>, mut emit: F)
where
    E: ModelEndpoint,
    F: FnMut(StreamMessage),
{
    let StreamRequest {
        target,
        message,
        cancel_token,
        stream_id,
    } = request;

    let outcome = tokio::select! {
        outcome = async {
            let handle = target?;
            let mut snapshots = endpoint.stream_send(&handle, &message).await?;
            while let Some(snapshot) = snapshots.next().await {
                if cancel_token.is_cancelled() {
                    return Ok(false);
                }
                emit(StreamMessage::Snapshot(snapshot?));
            }
            Ok::<bool, EndpointError>(true)
        } => outcome,
        _ = cancel_token.cancelled() => Ok(false),
    };

    match outcome {
        Ok(true) => emit(StreamMessage::End),
        Ok(false) => debug!(stream_id, "stream cancelled"),
        Err(err) => {
            if cancel_token.is_cancelled() {
                return;
            }
            emit(StreamMessage::Error(err.to_string()));
            emit(StreamMessage::End);
        }
    }
}

/// Runs sends on background tasks and funnels their messages, tagged with
/// the stream id, into one channel.
pub struct ChatStreamService<E: ModelEndpoint> {
    endpoint: Arc<E>,
    tx: mpsc::UnboundedSender<(StreamMessage, u64)>,
}

impl<E: ModelEndpoint> Clone for ChatStreamService<E> {
    fn clone(&self) -> Self {
        Self {
            endpoint: Arc::clone(&self.endpoint),
            tx: self.tx.clone(),
        }
    }
}

impl<E: ModelEndpoint> ChatStreamService<E> {
    pub fn new(endpoint: Arc<E>) -> (Self, mpsc::UnboundedReceiver<(StreamMessage, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { endpoint, tx }, rx)
    }

    pub fn spawn_stream(&self, request: StreamRequest<E::Handle>) {
        let endpoint = Arc::clone(&self.endpoint);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let stream_id = request.stream_id;
            run_stream(endpoint.as_ref(), request, |message| {
                let _ = tx.send((message, stream_id));
            })
            .await;
        });
    }
}
