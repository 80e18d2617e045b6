//! The conversation session: transcript, chat handle, and the single
//! in-flight send.
//!
//! A send either runs inline through [`ConversationSession::send`], or is
//! split in two for the event loop: [`ConversationSession::begin_send`]
//! records the user turn and returns a [`StreamRequest`] to run elsewhere, and
//! every message that request produces is fed back through
//! [`ConversationSession::apply_stream_message`]. Messages from a stream that
//! is no longer current (after a reset) are ignored.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::chat_stream::{run_stream, StreamMessage, StreamRequest};
use crate::core::constants::{FALLBACK_REPLY, RESET_GREETING, WELCOME_GREETING};
use crate::core::endpoint::{ChatConfig, EndpointError, ModelEndpoint};
use crate::core::message::{Originator, Turn, TurnIdGenerator};
use crate::core::topics::Topic;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Empty text, or another send was already in flight.
    Ignored,
    Completed,
    /// The fallback reply was committed.
    Failed,
}

/// Effect of feeding one stream message into the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamUpdate {
    /// The message belonged to a stream that is no longer current.
    Stale,
    Progress,
    Finished(SendOutcome),
}

pub struct ConversationSession<E: ModelEndpoint> {
    endpoint: Arc<E>,
    config: ChatConfig,
    handle: Option<E::Handle>,
    transcript: Vec<Turn>,
    ids: TurnIdGenerator,
    streaming: Option<String>,
    in_flight: bool,
    current_stream_id: u64,
    cancel_token: Option<CancellationToken>,
}

impl<E: ModelEndpoint> ConversationSession<E> {
    /// A session with no handle and an empty transcript; call
    /// [`start`](Self::start) before use.
    pub fn new(endpoint: Arc<E>, config: ChatConfig) -> Self {
        Self {
            endpoint,
            config,
            handle: None,
            transcript: Vec::new(),
            ids: TurnIdGenerator::default(),
            streaming: None,
            in_flight: false,
            current_stream_id: 0,
            cancel_token: None,
        }
    }

    pub fn start(&mut self) {
        self.restart(WELCOME_GREETING);
    }

    /// Drops the chat context and transcript, leaving only a greeting. Any
    /// in-flight stream is cancelled and its late results are ignored.
    pub fn reset(&mut self) {
        info!("resetting conversation");
        self.restart(RESET_GREETING);
    }

    pub fn dispose(&mut self) {
        self.cancel_current_stream();
        self.handle = None;
    }

    fn restart(&mut self, greeting: &str) {
        self.cancel_current_stream();
        self.handle = self.create_handle().ok();
        self.transcript.clear();
        self.push_turn(Originator::Assistant, greeting);
    }

    fn create_handle(&self) -> Result<E::Handle, EndpointError> {
        self.endpoint.create_session(&self.config).inspect_err(|err| {
            warn!("chat session creation failed, deferring to next send: {err}");
        })
    }

    fn cancel_current_stream(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        if self.in_flight {
            debug!(stream_id = self.current_stream_id, "abandoning in-flight stream");
        }
        self.current_stream_id += 1;
        self.in_flight = false;
        self.streaming = None;
    }

    fn push_turn(&mut self, originator: Originator, body: impl Into<String>) {
        let id = self.ids.next_id();
        self.transcript.push(Turn::new(id, originator, body));
    }

    /// Records the user turn and hands back the stream to run, or `None` when
    /// the text is blank or a send is already in flight.
    pub fn begin_send(&mut self, user_text: &str) -> Option<StreamRequest<E::Handle>> {
        if user_text.trim().is_empty() {
            return None;
        }
        if self.in_flight {
            debug!("send ignored while another is in flight");
            return None;
        }

        self.push_turn(Originator::User, user_text);

        let target = match self.handle.clone() {
            Some(handle) => Ok(handle),
            None => self.create_handle().inspect(|handle| {
                self.handle = Some(handle.clone());
            }),
        };

        self.current_stream_id += 1;
        let token = CancellationToken::new();
        self.cancel_token = Some(token.clone());
        self.in_flight = true;
        self.streaming = Some(String::new());

        Some(StreamRequest {
            target,
            message: user_text.to_string(),
            cancel_token: token,
            stream_id: self.current_stream_id,
        })
    }

    pub fn apply_stream_message(&mut self, message: StreamMessage, stream_id: u64) -> StreamUpdate {
        if !self.is_current_stream(stream_id) || !self.in_flight {
            return StreamUpdate::Stale;
        }

        match message {
            StreamMessage::Snapshot(text) => {
                self.streaming = Some(text);
                StreamUpdate::Progress
            }
            StreamMessage::Error(err) => {
                warn!(stream_id, "reply stream failed: {err}");
                self.finish(FALLBACK_REPLY.to_string());
                StreamUpdate::Finished(SendOutcome::Failed)
            }
            StreamMessage::End => {
                let text = self.streaming.take().unwrap_or_default();
                if text.is_empty() {
                    warn!(stream_id, "reply stream ended without text");
                    self.finish(FALLBACK_REPLY.to_string());
                    StreamUpdate::Finished(SendOutcome::Failed)
                } else {
                    self.finish(text);
                    StreamUpdate::Finished(SendOutcome::Completed)
                }
            }
        }
    }

    fn finish(&mut self, body: String) {
        self.push_turn(Originator::Assistant, body);
        self.streaming = None;
        self.in_flight = false;
        self.cancel_token = None;
    }

    /// Sends `user_text` and streams the reply inline. `on_snapshot` receives
    /// the cumulative reply text each time it grows.
    pub async fn send<F>(&mut self, user_text: &str, mut on_snapshot: F) -> SendOutcome
    where
        F: FnMut(&str),
    {
        let Some(request) = self.begin_send(user_text) else {
            return SendOutcome::Ignored;
        };
        let stream_id = request.stream_id;
        let endpoint = Arc::clone(&self.endpoint);
        let mut outcome = SendOutcome::Failed;

        run_stream(endpoint.as_ref(), request, |message| {
            match self.apply_stream_message(message, stream_id) {
                StreamUpdate::Progress => {
                    if let Some(text) = self.streaming_text() {
                        on_snapshot(text);
                    }
                }
                StreamUpdate::Finished(result) => outcome = result,
                StreamUpdate::Stale => {}
            }
        })
        .await;

        outcome
    }

    pub async fn send_topic<F>(&mut self, topic: &Topic, on_snapshot: F) -> SendOutcome
    where
        F: FnMut(&str),
    {
        self.send(&topic.prompt(), on_snapshot).await
    }

    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }

    /// The reply received so far for the in-flight send.
    pub fn streaming_text(&self) -> Option<&str> {
        self.streaming.as_deref()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn is_current_stream(&self, stream_id: u64) -> bool {
        self.current_stream_id == stream_id
    }

    pub fn has_handle(&self) -> bool {
        self.handle.is_some()
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }
}

impl<E: ModelEndpoint> Drop for ConversationSession<E> {
    fn drop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chat_stream::ChatStreamService;
    use crate::core::topics::find_topic;
    use crate::utils::test_utils::{create_test_session, ScriptedReply};

    fn transport_error() -> EndpointError {
        EndpointError::Transport("connection reset".to_string())
    }

    #[test]
    fn start_leaves_single_welcome_turn() {
        let (session, endpoint) = create_test_session(vec![]);
        assert_eq!(session.transcript().len(), 1);
        assert!(session.transcript()[0].is_assistant());
        assert_eq!(session.transcript()[0].body, WELCOME_GREETING);
        assert!(session.has_handle());
        assert!(!session.is_in_flight());

        let config = endpoint.last_config().expect("session created");
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.model, "test-model");
    }

    #[tokio::test]
    async fn topic_scenario_commits_final_snapshot() {
        let chunks = ["Arr", "Arrays are", "Arrays are contiguous..."];
        let (mut session, endpoint) = create_test_session(vec![ScriptedReply::chunks(&chunks)]);
        let topic = find_topic("arrays").unwrap();

        let mut seen = Vec::new();
        let outcome = session
            .send_topic(topic, |text| seen.push(text.to_string()))
            .await;

        assert_eq!(outcome, SendOutcome::Completed);
        assert_eq!(seen, chunks);
        assert_eq!(endpoint.sent_messages(), vec!["Tell me about Arrays & Strings"]);

        let transcript = session.transcript();
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[0].body, WELCOME_GREETING);
        assert_eq!(transcript[1].originator, Originator::User);
        assert_eq!(transcript[1].body, "Tell me about Arrays & Strings");
        assert_eq!(transcript[2].originator, Originator::Assistant);
        assert_eq!(transcript[2].body, "Arrays are contiguous...");
        assert!(session.streaming_text().is_none());
        assert!(!session.is_in_flight());
    }

    #[tokio::test]
    async fn snapshots_grow_and_end_at_committed_body() {
        let (mut session, _) =
            create_test_session(vec![ScriptedReply::chunks(&["a", "ab", "ab", "abc d"])]);
        let mut seen: Vec<String> = Vec::new();
        session.send("go", |text| seen.push(text.to_string())).await;

        assert!(seen.windows(2).all(|w| w[0].len() <= w[1].len()));
        assert_eq!(
            seen.last().map(String::as_str),
            session.transcript().last().map(|t| t.body.as_str())
        );
    }

    #[tokio::test]
    async fn mid_stream_failure_commits_fallback() {
        let (mut session, _) = create_test_session(vec![ScriptedReply::fail_after(
            &["Hel"],
            transport_error(),
        )]);

        let outcome = session.send("hi", |_| {}).await;

        assert_eq!(outcome, SendOutcome::Failed);
        let transcript = session.transcript();
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[1].body, "hi");
        assert!(transcript[2].is_assistant());
        assert_eq!(transcript[2].body, FALLBACK_REPLY);
        assert!(!session.is_in_flight());
        assert!(session.streaming_text().is_none());
    }

    #[tokio::test]
    async fn rejected_request_commits_fallback() {
        let (mut session, _) = create_test_session(vec![ScriptedReply::Reject(
            EndpointError::Http {
                status: 500,
                message: "boom".to_string(),
            },
        )]);
        assert_eq!(session.send("hi", |_| {}).await, SendOutcome::Failed);
        assert_eq!(session.transcript().last().unwrap().body, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn empty_reply_commits_fallback() {
        let (mut session, _) = create_test_session(vec![ScriptedReply::chunks(&[])]);
        assert_eq!(session.send("hi", |_| {}).await, SendOutcome::Failed);
        assert_eq!(session.transcript().len(), 3);
        assert_eq!(session.transcript()[2].body, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn whitespace_reply_is_committed_verbatim() {
        let (mut session, _) =
            create_test_session(vec![ScriptedReply::chunks(&["\n", "\n\n"])]);
        let mut last_seen = None;
        let outcome = session
            .send("hi", |text| last_seen = Some(text.to_string()))
            .await;

        assert_eq!(outcome, SendOutcome::Completed);
        assert_eq!(last_seen.as_deref(), Some("\n\n"));
        assert_eq!(session.transcript()[2].body, "\n\n");
    }

    #[tokio::test]
    async fn each_send_adds_two_turns() {
        let (mut session, _) = create_test_session(vec![
            ScriptedReply::chunks(&["one"]),
            ScriptedReply::fail_after(&[], transport_error()),
            ScriptedReply::chunks(&["t", "three"]),
        ]);

        for (i, text) in ["first", "second", "third"].iter().enumerate() {
            session.send(text, |_| {}).await;
            assert_eq!(session.transcript().len(), 1 + 2 * (i + 1));
        }
        let bodies: Vec<_> = session.transcript().iter().map(|t| t.body.as_str()).collect();
        assert_eq!(
            bodies,
            vec![WELCOME_GREETING, "first", "one", "second", FALLBACK_REPLY, "third", "three"]
        );
    }

    #[tokio::test]
    async fn blank_text_is_a_no_op() {
        let (mut session, endpoint) = create_test_session(vec![ScriptedReply::chunks(&["x"])]);
        for text in ["", "   ", "\n\t"] {
            assert_eq!(session.send(text, |_| {}).await, SendOutcome::Ignored);
        }
        assert_eq!(session.transcript().len(), 1);
        assert_eq!(endpoint.send_count(), 0);
        assert!(!session.is_in_flight());
    }

    #[tokio::test]
    async fn second_send_while_in_flight_is_dropped() {
        let (mut session, endpoint) = create_test_session(vec![ScriptedReply::chunks(&["x"])]);
        let request = session.begin_send("first").expect("first send starts");
        assert!(session.is_in_flight());

        assert!(session.begin_send("second").is_none());
        assert_eq!(session.send("third", |_| {}).await, SendOutcome::Ignored);

        let users: Vec<_> = session
            .transcript()
            .iter()
            .filter(|t| t.is_user())
            .map(|t| t.body.as_str())
            .collect();
        assert_eq!(users, vec!["first"]);
        assert_eq!(endpoint.send_count(), 0);
        assert_eq!(request.message, "first");
    }

    #[test]
    fn reset_always_leaves_one_greeting() {
        let (mut session, endpoint) = create_test_session(vec![]);
        session.begin_send("pending question");
        assert!(session.is_in_flight());

        session.reset();
        assert_eq!(session.transcript().len(), 1);
        assert_eq!(session.transcript()[0].body, RESET_GREETING);
        assert!(session.transcript()[0].is_assistant());
        assert!(!session.is_in_flight());
        assert!(session.streaming_text().is_none());
        assert_eq!(endpoint.sessions_created(), 2);

        session.reset();
        assert_eq!(session.transcript().len(), 1);
    }

    #[test]
    fn late_messages_from_reset_stream_are_ignored() {
        let (mut session, _) = create_test_session(vec![]);
        let request = session.begin_send("question").unwrap();
        let stale_id = request.stream_id;
        assert_eq!(
            session.apply_stream_message(StreamMessage::Snapshot("par".into()), stale_id),
            StreamUpdate::Progress
        );

        session.reset();
        assert!(request.cancel_token.is_cancelled());

        for message in [
            StreamMessage::Snapshot("partial answer".into()),
            StreamMessage::Error("late".into()),
            StreamMessage::End,
        ] {
            assert_eq!(
                session.apply_stream_message(message, stale_id),
                StreamUpdate::Stale
            );
        }
        assert_eq!(session.transcript().len(), 1);
        assert!(session.streaming_text().is_none());
    }

    #[test]
    fn end_after_error_is_ignored() {
        let (mut session, _) = create_test_session(vec![]);
        let id = session.begin_send("q").unwrap().stream_id;
        assert_eq!(
            session.apply_stream_message(StreamMessage::Error("boom".into()), id),
            StreamUpdate::Finished(SendOutcome::Failed)
        );
        assert_eq!(
            session.apply_stream_message(StreamMessage::End, id),
            StreamUpdate::Stale
        );
        assert_eq!(session.transcript().len(), 3);
    }

    #[tokio::test]
    async fn creation_failure_surfaces_on_next_send() {
        let endpoint = Arc::new(crate::utils::test_utils::ScriptedEndpoint::new(vec![
            ScriptedReply::chunks(&["recovered"]),
        ]));
        endpoint.set_fail_create(true);
        let mut session =
            ConversationSession::new(Arc::clone(&endpoint), ChatConfig::tutor("m"));
        session.start();
        assert_eq!(session.transcript().len(), 1);
        assert!(!session.has_handle());

        assert_eq!(session.send("hi", |_| {}).await, SendOutcome::Failed);
        assert_eq!(session.transcript().last().unwrap().body, FALLBACK_REPLY);
        assert_eq!(endpoint.send_count(), 0);

        endpoint.set_fail_create(false);
        assert_eq!(session.send("again", |_| {}).await, SendOutcome::Completed);
        assert!(session.has_handle());
        assert_eq!(session.transcript().last().unwrap().body, "recovered");
    }

    #[test]
    fn dispose_cancels_and_drops_handle() {
        let (mut session, _) = create_test_session(vec![]);
        let request = session.begin_send("q").unwrap();
        session.dispose();
        assert!(request.cancel_token.is_cancelled());
        assert!(!session.has_handle());
        assert!(!session.is_in_flight());
    }

    #[tokio::test]
    async fn background_stream_feeds_session() {
        let (mut session, endpoint) =
            create_test_session(vec![ScriptedReply::chunks(&["Big", "Big O"])]);
        let (service, mut rx) = ChatStreamService::new(endpoint);

        let request = session.begin_send("complexity?").unwrap();
        service.spawn_stream(request);

        loop {
            let (message, stream_id) = rx.recv().await.expect("stream message");
            if let StreamUpdate::Finished(outcome) =
                session.apply_stream_message(message, stream_id)
            {
                assert_eq!(outcome, SendOutcome::Completed);
                break;
            }
        }
        assert_eq!(session.transcript().last().unwrap().body, "Big O");
    }
}
