use std::time::Duration;

use async_trait::async_trait;
use parley_channel::{parse_envelope, Channel, ChatEnvelope, ControlSignal};
use parley_core::{validate_payload, AppConfig, HttpMethod, SchemaRegistry};
use secrecy::SecretString;
use tracing::{debug, info, warn};

use crate::collaborator::LanguageService;
use crate::dialogue::resolve_missing;
use crate::dispatch::{dispatch, Backend, DispatchError, DispatchOutcome, HttpBackend};
use crate::errors::EngineError;
use crate::extract::extract;
use crate::groq::GroqClient;
use crate::intent::resolve;
use crate::reconcile::reconcile_update;

const DEFAULT_ROLE: &str = "employee";
const COURTESY: &str = "Is there anything else I can help you with?";
const GOODBYE: &str = "Goodbye! Have a great day.";

/// Default pause between the last conversational message and a control
/// sentinel, giving the user time to read before the frontend reacts.
const SENTINEL_GRACE: Duration = Duration::from_secs(3);

const FAREWELLS: &[&str] = &["bye", "goodbye", "quit", "exit"];

/// How a completed turn ended. Both outcomes leave the conversation open;
/// the distinction exists for callers and logs, not for sentinel routing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnStatus {
    Completed,
    Rejected,
}

/// Runs one full conversation turn: intent, extraction, validation, dialogue,
/// dispatch, and the terminal user-facing reply. Collaborators and the
/// backend arrive as trait objects so the whole turn is scriptable in tests.
pub async fn run_turn(
    channel: &dyn Channel,
    service: &dyn LanguageService,
    backend: &dyn Backend,
    registry: &SchemaRegistry,
    envelope: &ChatEnvelope,
    max_intent_retries: u32,
) -> Result<TurnStatus, EngineError> {
    let descriptions = registry.descriptions();
    let intent =
        resolve(channel, service, &envelope.message, &descriptions, max_intent_retries).await?;
    let project = registry
        .project(&intent.project)
        .ok_or_else(|| EngineError::UnknownProject(intent.project.clone()))?;

    let draft = extract(service, &intent.query, project).await?;
    let descriptor = validate_payload(project, &draft);

    let descriptor = match project.method {
        HttpMethod::Put => reconcile_update(channel, project, descriptor).await?,
        HttpMethod::Get | HttpMethod::Post | HttpMethod::Delete => {
            resolve_missing(channel, project, descriptor).await?
        }
    };

    match dispatch(backend, channel, &descriptor, envelope.token.as_deref()).await? {
        DispatchOutcome::TableRendered => {
            channel.send_text(COURTESY).await?;
            Ok(TurnStatus::Completed)
        }
        DispatchOutcome::Completed { body, payload } => {
            let summary = service.summarize(&body, &payload).await?;
            channel.send_text(&format!("{summary} {COURTESY}")).await?;
            Ok(TurnStatus::Completed)
        }
        DispatchOutcome::Rejected { status, body } => {
            channel
                .send_text(&format!("The request was not accepted (status {status}): {body}"))
                .await?;
            Ok(TurnStatus::Rejected)
        }
    }
}

/// Seam between the connection loop and one conversation turn. The runtime
/// builds live collaborators behind it; tests script the turn outcomes.
#[async_trait]
trait TurnHandler: Send + Sync {
    async fn run(
        &self,
        channel: &dyn Channel,
        envelope: &ChatEnvelope,
    ) -> Result<TurnStatus, EngineError>;
}

/// Owns the per-process configuration and a shared HTTP client, and drives
/// conversations over any channel. Per-turn collaborators are built from the
/// envelope so the credential and model always travel with the request.
pub struct Runtime {
    config: AppConfig,
    http: reqwest::Client,
    grace: Duration,
}

impl Runtime {
    pub fn new(config: AppConfig) -> Self {
        Self { config, http: reqwest::Client::new(), grace: SENTINEL_GRACE }
    }

    /// Overrides the pause before control sentinels.
    pub fn grace_period(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Conversation loop for one connection. Ends on disconnect or an
    /// explicit farewell; a malformed envelope aborts only the current turn.
    pub async fn run_conversation(&self, channel: &dyn Channel) {
        conversation_loop(channel, self, self.grace).await;
    }

    async fn run_envelope_turn(
        &self,
        channel: &dyn Channel,
        envelope: &ChatEnvelope,
    ) -> Result<TurnStatus, EngineError> {
        let role = envelope.role.as_deref().unwrap_or(DEFAULT_ROLE);
        let registry = SchemaRegistry::load(role, &self.config.schema.dir)?;

        let api_key = envelope
            .apikey
            .clone()
            .map(SecretString::from)
            .or_else(|| self.config.llm.api_key.clone());
        let Some(api_key) = api_key else {
            channel
                .send_text("No language service credential is configured for this session.")
                .await?;
            return Ok(TurnStatus::Rejected);
        };
        let model = envelope.model.as_deref().unwrap_or(&self.config.llm.model);

        let service =
            GroqClient::new(self.http.clone(), &self.config.llm.base_url, api_key, model);
        let backend = HttpBackend::new(self.http.clone(), self.config.backend.timeout_secs);

        run_turn(
            channel,
            &service,
            &backend,
            &registry,
            envelope,
            self.config.llm.max_intent_retries,
        )
        .await
    }
}

#[async_trait]
impl TurnHandler for Runtime {
    async fn run(
        &self,
        channel: &dyn Channel,
        envelope: &ChatEnvelope,
    ) -> Result<TurnStatus, EngineError> {
        self.run_envelope_turn(channel, envelope).await
    }
}

/// Per-connection loop. Sentinel policy: `quit` only on an explicit farewell,
/// `navigateerror` only when a collaborator call fails. Completed and
/// backend-rejected turns send their text and the conversation simply
/// continues with the next envelope.
async fn conversation_loop(channel: &dyn Channel, turns: &dyn TurnHandler, grace: Duration) {
    loop {
        let raw = match channel.recv_text().await {
            Ok(raw) => raw,
            Err(error) => {
                info!(
                    event_name = "engine.conversation.closed",
                    reason = %error,
                    "channel closed"
                );
                return;
            }
        };

        let envelope = match parse_envelope(&raw) {
            Ok(envelope) => envelope,
            Err(error) => {
                warn!(
                    event_name = "engine.conversation.bad_envelope",
                    reason = %error,
                    "dropping malformed envelope"
                );
                if channel
                    .send_text("I couldn't read that message. Please try again.")
                    .await
                    .is_err()
                {
                    return;
                }
                continue;
            }
        };

        if is_farewell(&envelope.message) {
            let _ = channel.send_text(GOODBYE).await;
            tokio::time::sleep(grace).await;
            let _ = channel.send_text(ControlSignal::Quit.as_str()).await;
            return;
        }

        match turns.run(channel, &envelope).await {
            Ok(status) => {
                debug!(event_name = "engine.turn.finished", status = ?status, "turn finished");
            }
            Err(EngineError::Channel(error)) => {
                info!(
                    event_name = "engine.conversation.closed",
                    reason = %error,
                    "channel closed mid-turn"
                );
                return;
            }
            Err(EngineError::Collaborator(error)) => {
                warn!(
                    event_name = "engine.turn.collaborator_failed",
                    reason = %error,
                    "collaborator call failed"
                );
                if channel.send_text(error.user_message()).await.is_err() {
                    return;
                }
                tokio::time::sleep(grace).await;
                if channel.send_text(ControlSignal::NavigateError.as_str()).await.is_err() {
                    return;
                }
            }
            Err(error) => {
                warn!(
                    event_name = "engine.turn.failed",
                    reason = %error,
                    "turn ended in error"
                );
                if channel.send_text(user_text_for(&error)).await.is_err() {
                    return;
                }
            }
        }
    }
}

fn is_farewell(message: &str) -> bool {
    let normalized = message.trim().to_lowercase();
    FAREWELLS.contains(&normalized.as_str())
}

/// Text shown to the user when a turn aborts on an engine error. The wording
/// never leaks internals; details go to the log instead.
fn user_text_for(error: &EngineError) -> &'static str {
    match error {
        EngineError::Collaborator(error) => error.user_message(),
        EngineError::Schema(_) => {
            "The configuration for your role could not be loaded. Please contact an administrator."
        }
        EngineError::IntentUnresolved { .. } | EngineError::UnknownProject(_) => {
            "I couldn't work out what you need from that. Please start over."
        }
        EngineError::Dispatch(DispatchError::Template { .. }) => {
            "The request could not be built from the provided details."
        }
        EngineError::Dispatch(DispatchError::Transport(_)) => {
            "The backend service could not be reached. Please try again later."
        }
        EngineError::Envelope(_) => "I couldn't read that message. Please try again.",
        EngineError::Channel(_) => "The connection was interrupted.",
    }
}
