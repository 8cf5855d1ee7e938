use parley_channel::{ChannelError, EnvelopeError};
use parley_core::SchemaError;
use thiserror::Error;

use crate::collaborator::CollaboratorError;
use crate::dispatch::DispatchError;

/// Failure modes that end a conversation turn early. Validation problems are
/// deliberately absent: they are always recovered in-dialogue by re-prompting.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error("could not resolve the request to a known project after {attempts} attempts")]
    IntentUnresolved { attempts: u32 },
    #[error("project `{0}` is not configured")]
    UnknownProject(String),
}
