use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::stream;

use crate::core::endpoint::{ChatConfig, EndpointError, ModelEndpoint, SnapshotStream};
use crate::core::session::ConversationSession;

/// What the scripted endpoint does for one `stream_send` call.
pub enum ScriptedReply {
    Snapshots(Vec<String>),
    FailAfter(Vec<String>, EndpointError),
    Reject(EndpointError),
    /// A stream that never yields.
    Hang,
}

impl ScriptedReply {
    pub fn chunks(snapshots: &[&str]) -> Self {
        ScriptedReply::Snapshots(snapshots.iter().map(|s| s.to_string()).collect())
    }

    pub fn fail_after(snapshots: &[&str], err: EndpointError) -> Self {
        ScriptedReply::FailAfter(snapshots.iter().map(|s| s.to_string()).collect(), err)
    }
}

/// In-memory endpoint that replays scripted replies in order. Handles are the
/// sequence number of the session that created them.
#[derive(Default)]
pub struct ScriptedEndpoint {
    replies: Mutex<VecDeque<ScriptedReply>>,
    sent: Mutex<Vec<String>>,
    sessions_created: AtomicU64,
    fail_create: AtomicBool,
    last_config: Mutex<Option<ChatConfig>>,
}

impl ScriptedEndpoint {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        }
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn sent_messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sessions_created(&self) -> u64 {
        self.sessions_created.load(Ordering::SeqCst)
    }

    pub fn last_config(&self) -> Option<ChatConfig> {
        self.last_config.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelEndpoint for ScriptedEndpoint {
    type Handle = u64;

    fn create_session(&self, config: &ChatConfig) -> Result<u64, EndpointError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(EndpointError::MissingApiKey);
        }
        *self.last_config.lock().unwrap() = Some(config.clone());
        Ok(self.sessions_created.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn stream_send(
        &self,
        _handle: &u64,
        message: &str,
    ) -> Result<SnapshotStream, EndpointError> {
        self.sent.lock().unwrap().push(message.to_string());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| EndpointError::Transport("no scripted reply left".to_string()))?;

        match reply {
            ScriptedReply::Snapshots(snapshots) => {
                Ok(Box::pin(stream::iter(
                    snapshots.into_iter().map(Ok::<String, EndpointError>),
                )))
            }
            ScriptedReply::FailAfter(snapshots, err) => {
                let items: Vec<Result<String, EndpointError>> = snapshots
                    .into_iter()
                    .map(Ok)
                    .chain(std::iter::once(Err(err)))
                    .collect();
                Ok(Box::pin(stream::iter(items)))
            }
            ScriptedReply::Reject(err) => Err(err),
            ScriptedReply::Hang => Ok(Box::pin(stream::pending::<Result<String, EndpointError>>())),
        }
    }
}

/// A started session over a scripted endpoint.
pub fn create_test_session(
    replies: Vec<ScriptedReply>,
) -> (ConversationSession<ScriptedEndpoint>, Arc<ScriptedEndpoint>) {
    let endpoint = Arc::new(ScriptedEndpoint::new(replies));
    let mut session =
        ConversationSession::new(Arc::clone(&endpoint), ChatConfig::tutor("test-model"));
    session.start();
    (session, endpoint)
}
