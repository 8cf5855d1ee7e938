use async_trait::async_trait;
use indexmap::IndexMap;
use parley_core::{DraftPayload, ProjectDescriptor};
use thiserror::Error;

/// Outcome of intent classification. The classifier either names a project or
/// admits it found none; a hallucinated name is normalized to `NoMatch` by the
/// resolver before it can reach the registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IntentOutcome {
    Match(String),
    NoMatch,
}

/// Structured failure channel for collaborator calls, bucketed by response
/// status. Collaborator errors are never retried automatically; the user must
/// re-issue input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("language service rejected the request (status {status})")]
    Rejected { status: u16 },
    #[error("language service credentials were rejected")]
    Unauthorized,
    #[error("language service failed upstream (status {status})")]
    Upstream { status: u16 },
    #[error("language service returned an undecodable response: {0}")]
    Malformed(String),
    #[error("language service transport failed: {0}")]
    Transport(String),
}

impl CollaboratorError {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthorized,
            status if status >= 500 => Self::Upstream { status },
            status => Self::Rejected { status },
        }
    }

    /// Text shown to the user when a turn aborts on this error.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Rejected { .. } => {
                "The language service could not process that request. Please try again."
            }
            Self::Unauthorized => {
                "The language service rejected the configured credentials. Check your API key."
            }
            Self::Upstream { .. } => {
                "The language service is having trouble right now. Please try again shortly."
            }
            Self::Malformed(_) | Self::Transport(_) => {
                "Failed to process the response from the language service."
            }
        }
    }
}

/// The three LLM-backed collaborators the engine depends on. All are treated
/// as opaque, possibly-wrong oracles; every value they return is re-validated
/// before it can influence a request.
#[async_trait]
pub trait LanguageService: Send + Sync {
    /// Maps a free-text query to one of the given project names, or NoMatch.
    async fn classify_intent(
        &self,
        query: &str,
        descriptions: &IndexMap<String, String>,
    ) -> Result<IntentOutcome, CollaboratorError>;

    /// Proposes draft values for the project's fields from the query. The
    /// sentinel is collapsed to absence before the draft leaves the service.
    async fn fill_slots(
        &self,
        query: &str,
        project: &ProjectDescriptor,
    ) -> Result<DraftPayload, CollaboratorError>;

    /// Renders a structured backend result as one human sentence.
    async fn summarize(
        &self,
        result: &serde_json::Value,
        payload: &serde_json::Value,
    ) -> Result<String, CollaboratorError>;
}

#[cfg(test)]
mod tests {
    use super::CollaboratorError;

    #[test]
    fn status_buckets_follow_the_taxonomy() {
        assert_eq!(CollaboratorError::from_status(401), CollaboratorError::Unauthorized);
        assert_eq!(CollaboratorError::from_status(429), CollaboratorError::Rejected { status: 429 });
        assert_eq!(CollaboratorError::from_status(404), CollaboratorError::Rejected { status: 404 });
        assert_eq!(CollaboratorError::from_status(500), CollaboratorError::Upstream { status: 500 });
        assert_eq!(CollaboratorError::from_status(503), CollaboratorError::Upstream { status: 503 });
    }

    #[test]
    fn user_messages_distinguish_credential_problems() {
        assert!(CollaboratorError::Unauthorized.user_message().contains("API key"));
        assert!(!CollaboratorError::Upstream { status: 502 }.user_message().contains("API key"));
    }
}
