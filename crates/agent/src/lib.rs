//! Conversational engine that turns free-text requests into validated
//! backend CRUD calls.
//!
//! A turn flows through a fixed pipeline: the intent resolver maps the query
//! to a configured project, the slot extractor proposes field values, the
//! payload validator nulls everything invalid, the dialogue engine fills the
//! gaps one prompt at a time, and the dispatcher executes the final call.
//! Update requests take a detour through the reconciler, which decides
//! between a direct partial update and a guided field selection.
//!
//! Every LLM collaborator sits behind the [`collaborator::LanguageService`]
//! trait and every backend call behind [`dispatch::Backend`], so the full
//! pipeline runs against scripted doubles in tests.

pub mod collaborator;
pub mod dialogue;
pub mod dispatch;
pub mod errors;
pub mod extract;
pub mod groq;
pub mod intent;
pub mod reconcile;
pub mod runtime;
pub mod table;

#[cfg(test)]
mod testing;

pub use collaborator::{CollaboratorError, IntentOutcome, LanguageService};
pub use dispatch::{Backend, BackendResponse, DispatchError, DispatchOutcome, HttpBackend};
pub use errors::EngineError;
pub use groq::GroqClient;
pub use runtime::{run_turn, Runtime, TurnStatus};
