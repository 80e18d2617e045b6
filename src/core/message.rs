use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Originator {
    User,
    Assistant,
}

impl Originator {
    pub fn as_str(self) -> &'static str {
        match self {
            Originator::User => "user",
            Originator::Assistant => "assistant",
        }
    }

    pub fn is_user(self) -> bool {
        self == Originator::User
    }

    pub fn is_assistant(self) -> bool {
        self == Originator::Assistant
    }
}

impl TryFrom<&str> for Originator {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(Originator::User),
            "assistant" => Ok(Originator::Assistant),
            _ => Err(format!("invalid originator: {value}")),
        }
    }
}

impl TryFrom<String> for Originator {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<Originator> for String {
    fn from(value: Originator) -> Self {
        value.as_str().to_string()
    }
}

/// Identifier of a turn, unique within one session's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TurnId(pub u64);

/// One committed message in the conversation. Turns never change after they
/// are appended to a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: TurnId,
    pub originator: Originator,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(id: TurnId, originator: Originator, body: impl Into<String>) -> Self {
        Self {
            id,
            originator,
            body: body.into(),
            created_at: Utc::now(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.originator.is_user()
    }

    pub fn is_assistant(&self) -> bool {
        self.originator.is_assistant()
    }
}

/// Hands out monotonically increasing turn ids.
#[derive(Debug, Default)]
pub struct TurnIdGenerator {
    next: u64,
}

impl TurnIdGenerator {
    pub fn next_id(&mut self) -> TurnId {
        let id = TurnId(self.next);
        self.next += 1;
        id
    }
}
