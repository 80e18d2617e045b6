//! Contract between the conversation session and the hosted model.
//!
//! A [`ModelEndpoint`] creates opaque chat handles and streams replies for a
//! handle as a sequence of *cumulative* text snapshots: every item carries the
//! full reply text received so far, so consumers can overwrite instead of
//! append.

use std::error::Error;
use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use crate::core::constants::{CHAT_TEMPERATURE, SYSTEM_INSTRUCTION};

/// Settings a chat handle is created with.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    pub model: String,
    pub system_instruction: String,
    pub temperature: f32,
}

impl ChatConfig {
    /// The tutor's fixed instruction and temperature for the given model.
    pub fn tutor(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            temperature: CHAT_TEMPERATURE,
        }
    }
}

pub type SnapshotStream = Pin<Box<dyn Stream<Item = Result<String, EndpointError>> + Send>>;

#[async_trait]
pub trait ModelEndpoint: Send + Sync + 'static {
    /// Server-side conversational context; cheap to clone.
    type Handle: Clone + Send + Sync + 'static;

    fn create_session(&self, config: &ChatConfig) -> Result<Self::Handle, EndpointError>;

    async fn stream_send(
        &self,
        handle: &Self::Handle,
        message: &str,
    ) -> Result<SnapshotStream, EndpointError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum EndpointError {
    MissingApiKey,
    Transport(String),
    Http { status: u16, message: String },
    Api(String),
    Decode(String),
}

impl fmt::Display for EndpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointError::MissingApiKey => write!(
                f,
                "no API key configured; set GEMINI_API_KEY (or API_KEY) in the environment"
            ),
            EndpointError::Transport(message) => write!(f, "transport error: {message}"),
            EndpointError::Http { status, message } => {
                write!(f, "HTTP {status}: {message}")
            }
            EndpointError::Api(message) => write!(f, "API error: {message}"),
            EndpointError::Decode(message) => write!(f, "malformed response: {message}"),
        }
    }
}

impl Error for EndpointError {}

impl From<reqwest::Error> for EndpointError {
    fn from(err: reqwest::Error) -> Self {
        EndpointError::Transport(err.to_string())
    }
}
