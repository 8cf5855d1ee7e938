use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use parley_channel::Channel;
use parley_core::{HttpMethod, RequestDescriptor};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::errors::EngineError;
use crate::table::render_table;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("url template placeholder `{placeholder}` has no payload value")]
    Template { placeholder: String },
    #[error("backend transport failed: {0}")]
    Transport(String),
}

/// Raw result of one backend call, before outcome classification.
pub struct BackendResponse {
    pub status: u16,
    pub body: String,
}

/// Seam between the dispatcher and the HTTP stack. The scripted test double
/// lives behind this same trait.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn execute(
        &self,
        method: HttpMethod,
        url: &str,
        token: Option<&str>,
        payload: &IndexMap<String, String>,
    ) -> Result<BackendResponse, DispatchError>;
}

/// Classified outcome of a dispatch. `TableRendered` means the dispatcher
/// already sent the terminal reply itself; the caller must not summarize.
#[derive(Debug)]
pub enum DispatchOutcome {
    Rejected { status: u16, body: String },
    TableRendered,
    Completed { body: Value, payload: Value },
}

/// Builds and executes the final backend call for a fully resolved request.
/// Null fields are excluded from the outgoing payload; the bearer token is
/// attached when present.
pub async fn dispatch(
    backend: &dyn Backend,
    channel: &dyn Channel,
    descriptor: &RequestDescriptor,
    token: Option<&str>,
) -> Result<DispatchOutcome, EngineError> {
    let payload: IndexMap<String, String> = descriptor
        .payload
        .iter()
        .filter_map(|(name, value)| value.clone().map(|value| (name.clone(), value)))
        .collect();

    let url = render_url(&descriptor.url_template, &payload)?;
    info!(
        event_name = "engine.dispatch.request",
        project = %descriptor.project,
        method = %descriptor.method,
        "dispatching backend request"
    );

    let response = backend.execute(descriptor.method, &url, token, &payload).await?;

    if response.status >= 400 {
        debug!(
            event_name = "engine.dispatch.rejected",
            status = response.status,
            "backend rejected the request"
        );
        return Ok(DispatchOutcome::Rejected { status: response.status, body: response.body });
    }

    match descriptor.method {
        HttpMethod::Get => {
            // GET replies are terminal here: the table goes straight to the
            // channel and the caller skips summarization.
            let rendered = serde_json::from_str::<Value>(&response.body)
                .ok()
                .as_ref()
                .and_then(render_table)
                .unwrap_or(response.body);
            channel.send_text(&rendered).await?;
            Ok(DispatchOutcome::TableRendered)
        }
        HttpMethod::Post | HttpMethod::Put | HttpMethod::Delete => {
            let body = serde_json::from_str::<Value>(&response.body)
                .unwrap_or(Value::String(response.body));
            let payload_value = serde_json::to_value(&payload)
                .map_err(|error| DispatchError::Transport(error.to_string()))?;
            Ok(DispatchOutcome::Completed { body, payload: payload_value })
        }
    }
}

/// Substitutes `{field}` placeholders from the payload. A placeholder with no
/// payload value is terminal for the dispatch attempt.
fn render_url(template: &str, payload: &IndexMap<String, String>) -> Result<String, DispatchError> {
    let mut url = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        url.push_str(&rest[..start]);
        let after = &rest[start..];
        let Some(end) = after.find('}') else {
            url.push_str(after);
            return Ok(url);
        };
        let placeholder = &after[1..end];
        let value = payload
            .get(placeholder)
            .ok_or_else(|| DispatchError::Template { placeholder: placeholder.to_string() })?;
        url.push_str(value);
        rest = &after[end + 1..];
    }

    url.push_str(rest);
    Ok(url)
}

/// Reqwest-backed production backend. One request per dispatch with a fixed
/// deadline; GET payloads travel as query parameters, everything else as a
/// JSON body.
pub struct HttpBackend {
    http: reqwest::Client,
    timeout: Duration,
}

impl HttpBackend {
    pub fn new(http: reqwest::Client, timeout_secs: u64) -> Self {
        Self { http, timeout: Duration::from_secs(timeout_secs) }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn execute(
        &self,
        method: HttpMethod,
        url: &str,
        token: Option<&str>,
        payload: &IndexMap<String, String>,
    ) -> Result<BackendResponse, DispatchError> {
        let mut request = match method {
            HttpMethod::Get => self.http.get(url).query(payload),
            HttpMethod::Post => self.http.post(url).json(payload),
            HttpMethod::Put => self.http.put(url).json(payload),
            HttpMethod::Delete => self.http.delete(url).json(payload),
        }
        .timeout(self.timeout);

        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|error| DispatchError::Transport(error.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|error| DispatchError::Transport(error.to_string()))?;

        Ok(BackendResponse { status, body })
    }
}
