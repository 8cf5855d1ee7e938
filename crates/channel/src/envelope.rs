use serde::Deserialize;
use thiserror::Error;

/// One inbound conversational message. Everything beyond `message` is
/// optional and only meaningful on the first message of a turn.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ChatEnvelope {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub apikey: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("malformed chat envelope: {0}")]
    Malformed(String),
}

/// Parses one channel text frame into an envelope. A malformed frame aborts
/// the current turn but the connection stays open for the next message.
pub fn parse_envelope(raw: &str) -> Result<ChatEnvelope, EnvelopeError> {
    serde_json::from_str(raw).map_err(|error| EnvelopeError::Malformed(error.to_string()))
}

/// Outbound control sentinels the frontend transport layer reacts to after
/// the conversation text. Sent verbatim as channel text. The chat engine
/// emits `Quit` on farewell and `NavigateError` on a collaborator failure;
/// `Navigate` belongs to the frontend's account-setup transition and is part
/// of the shared wire vocabulary only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlSignal {
    /// Proceed to the follow-up screen.
    Navigate,
    /// Proceed to the error screen.
    NavigateError,
    /// End the session cleanly.
    Quit,
}

impl ControlSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Navigate => "navigate",
            Self::NavigateError => "navigateerror",
            Self::Quit => "quit",
        }
    }
}

impl std::fmt::Display for ControlSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
