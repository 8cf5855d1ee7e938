use std::collections::VecDeque;

use async_trait::async_trait;
use indexmap::IndexMap;
use parley_core::{DraftPayload, HttpMethod, ProjectDescriptor};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::collaborator::{CollaboratorError, IntentOutcome, LanguageService};
use crate::dispatch::{Backend, BackendResponse, DispatchError};

/// Scripted language-service double. Each call pops the next queued result
/// for its kind; an exhausted queue reads as a malformed response.
#[derive(Default)]
pub(crate) struct ScriptedLanguageService {
    intents: Mutex<VecDeque<Result<IntentOutcome, CollaboratorError>>>,
    slots: Mutex<VecDeque<Result<DraftPayload, CollaboratorError>>>,
    summaries: Mutex<VecDeque<Result<String, CollaboratorError>>>,
}

impl ScriptedLanguageService {
    pub(crate) fn with_intent(self, result: Result<IntentOutcome, CollaboratorError>) -> Self {
        self.intents.try_lock().unwrap().push_back(result);
        self
    }

    pub(crate) fn with_slots(self, result: Result<DraftPayload, CollaboratorError>) -> Self {
        self.slots.try_lock().unwrap().push_back(result);
        self
    }

    pub(crate) fn with_summary(self, result: Result<String, CollaboratorError>) -> Self {
        self.summaries.try_lock().unwrap().push_back(result);
        self
    }
}

#[async_trait]
impl LanguageService for ScriptedLanguageService {
    async fn classify_intent(
        &self,
        _query: &str,
        _descriptions: &IndexMap<String, String>,
    ) -> Result<IntentOutcome, CollaboratorError> {
        self.intents
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(CollaboratorError::Malformed("intent script exhausted".to_string())))
    }

    async fn fill_slots(
        &self,
        _query: &str,
        _project: &ProjectDescriptor,
    ) -> Result<DraftPayload, CollaboratorError> {
        self.slots
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(CollaboratorError::Malformed("slot script exhausted".to_string())))
    }

    async fn summarize(
        &self,
        _result: &Value,
        _payload: &Value,
    ) -> Result<String, CollaboratorError> {
        self.summaries
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(CollaboratorError::Malformed("summary script exhausted".to_string())))
    }
}

/// One recorded backend call made through [`ScriptedBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordedCall {
    pub(crate) method: HttpMethod,
    pub(crate) url: String,
    pub(crate) token: Option<String>,
    pub(crate) payload: IndexMap<String, String>,
}

/// Scripted backend double. Records every call and replays queued responses;
/// an exhausted queue reads as a transport failure.
#[derive(Default)]
pub(crate) struct ScriptedBackend {
    responses: Mutex<VecDeque<Result<BackendResponse, DispatchError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedBackend {
    pub(crate) fn with_response(status: u16, body: &str) -> Self {
        Self::default().and_response(status, body)
    }

    pub(crate) fn and_response(self, status: u16, body: &str) -> Self {
        self.responses
            .try_lock()
            .unwrap()
            .push_back(Ok(BackendResponse { status, body: body.to_string() }));
        self
    }

    pub(crate) async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn execute(
        &self,
        method: HttpMethod,
        url: &str,
        token: Option<&str>,
        payload: &IndexMap<String, String>,
    ) -> Result<BackendResponse, DispatchError> {
        self.calls.lock().await.push(RecordedCall {
            method,
            url: url.to_string(),
            token: token.map(str::to_string),
            payload: payload.clone(),
        });
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(DispatchError::Transport("backend script exhausted".to_string())))
    }
}
