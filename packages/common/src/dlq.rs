use serde::{Deserialize, Serialize};

/// Why a queue message ended up in the dead-letter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeadLetterReason {
    /// All retry attempts exhausted.
    MaxRetriesExceeded,
    /// A processor rejected the message permanently.
    Rejected,
    /// No processor is registered for the message topic.
    UnknownTopic,
    /// The stored payload could not be decoded.
    MalformedPayload,
}

impl DeadLetterReason {
    pub const ALL: &'static [DeadLetterReason] = &[
        Self::MaxRetriesExceeded,
        Self::Rejected,
        Self::UnknownTopic,
        Self::MalformedPayload,
    ];

    /// Returns the string representation stored in the queue table.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MaxRetriesExceeded => "MAX_RETRIES_EXCEEDED",
            Self::Rejected => "REJECTED",
            Self::UnknownTopic => "UNKNOWN_TOPIC",
            Self::MalformedPayload => "MALFORMED_PAYLOAD",
        }
    }
}

impl std::fmt::Display for DeadLetterReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DeadLetterReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|reason| reason.as_str() == s)
            .copied()
            .ok_or_else(|| format!("Invalid dead letter reason '{}'", s))
    }
}
