use async_trait::async_trait;
use indexmap::IndexMap;
use parley_core::{collapse_sentinel, DraftPayload, FieldKind, ProjectDescriptor};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::collaborator::{CollaboratorError, IntentOutcome, LanguageService};

/// Marker the model is instructed to fence its JSON block with. Everything
/// outside the fence is prose and ignored.
const FENCE: &str = "~~~";

/// Chat-completions client for a Groq-style OpenAI-compatible endpoint. The
/// credential and model are threaded in per turn; nothing is read from
/// ambient process state.
pub struct GroqClient {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    model: String,
}

impl GroqClient {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: SecretString, model: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
        }
    }

    async fn chat(&self, system: String, user: String) -> Result<String, CollaboratorError> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });

        // No client-side timeout here: LLM latency is bounded by the
        // collaborator, and a mid-dialogue deadline would drop the turn.
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|error| CollaboratorError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::from_status(status.as_u16()));
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|error| CollaboratorError::Malformed(error.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or_else(|| CollaboratorError::Malformed("completion had no choices".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[async_trait]
impl LanguageService for GroqClient {
    async fn classify_intent(
        &self,
        query: &str,
        descriptions: &IndexMap<String, String>,
    ) -> Result<IntentOutcome, CollaboratorError> {
        let catalog = serde_json::to_string(descriptions)
            .map_err(|error| CollaboratorError::Malformed(error.to_string()))?;

        let system = format!(
            "You are an assistant that matches a user query to one project name \
             based on project descriptions.\n\
             1. Correct any grammatical or spelling errors in the query.\n\
             2. Review the project descriptions: {catalog}\n\
             3. If one project clearly matches the query, return its exact name.\n\
             4. If no project matches or the query is unclear, return \"None\".\n\
             5. Respond with a single JSON object of the form \
             {FENCE}{{\"project\": \"<name or None>\"}}{FENCE} and nothing else."
        );
        let user = format!("Query: {query}");

        let response_text = self.chat(system, user).await?;
        debug!(event_name = "collaborator.intent.response", "intent classifier responded");

        let Some(block) = fenced_json(&response_text) else {
            return Ok(IntentOutcome::NoMatch);
        };
        match block.get("project").and_then(Value::as_str) {
            Some(name) if !name.trim().is_empty() && !name.trim().eq_ignore_ascii_case("none") => {
                Ok(IntentOutcome::Match(name.trim().to_string()))
            }
            _ => Ok(IntentOutcome::NoMatch),
        }
    }

    async fn fill_slots(
        &self,
        query: &str,
        project: &ProjectDescriptor,
    ) -> Result<DraftPayload, CollaboratorError> {
        let field_config = field_configuration(project);
        let system = format!(
            "You fill payload values from a user query using a field configuration.\n\
             1. Capture values strictly from the user query; never infer or assume.\n\
             2. When the query holds no valid value for a field, use the field's \
             assigned value from the configuration, or \"None\" when there is none.\n\
             3. Respond with exactly one JSON object of the form \
             {FENCE}{{\"payload\": {{\"<field>\": \"<value or None>\"}}}}{FENCE} \
             and nothing else.\n\
             Field configuration: {field_config}"
        );
        let user = format!("Query: {query}");

        let response_text = self.chat(system, user).await?;
        debug!(event_name = "collaborator.slots.response", "slot filler responded");

        let mut draft = DraftPayload::new();
        let extracted = fenced_json(&response_text)
            .and_then(|block| block.get("payload").cloned())
            .unwrap_or(Value::Null);

        for name in project.fields.keys() {
            let raw = extracted.get(name).map(scalar_to_string);
            draft.insert(name.clone(), collapse_sentinel(raw.flatten()));
        }

        Ok(draft)
    }

    async fn summarize(
        &self,
        result: &Value,
        payload: &Value,
    ) -> Result<String, CollaboratorError> {
        let system = "You explain CRUD operation results in simple, friendly terms. \
                      Summarize the outcome in under 40 words, mention the relevant \
                      payload values, and avoid technical jargon."
            .to_string();
        let user =
            format!("The API response is: {result}. The payload is: {payload}. Summarize it.");

        self.chat(system, user).await
    }
}

/// Extracts the single fenced JSON object from a model response. Returns
/// `None` when the fence or the object is missing or unparseable; callers
/// treat that as an empty result, never an error.
pub fn fenced_json(response_text: &str) -> Option<Value> {
    let start = response_text.find(FENCE)? + FENCE.len();
    let end = response_text.rfind(FENCE)?;
    if end <= start {
        return None;
    }

    let fenced = &response_text[start..end];
    let object_start = fenced.find('{')?;
    let object_end = fenced.rfind('}')?;
    if object_end < object_start {
        return None;
    }

    // Some models escape underscores in field names inside the block.
    let candidate = fenced[object_start..=object_end].replace("\\_", "_");
    serde_json::from_str(&candidate).ok()
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn field_configuration(project: &ProjectDescriptor) -> String {
    let fields: Vec<Value> = project
        .fields
        .iter()
        .map(|(name, spec)| {
            let mut entry = json!({
                "field": name,
                "datatype": spec.kind.name(),
                "required": spec.required,
                "description": spec.description,
            });
            match &spec.kind {
                FieldKind::Choice { options } => entry["choices"] = json!(options),
                FieldKind::Date { formats } if !formats.is_empty() => {
                    entry["formats"] = json!(formats)
                }
                FieldKind::Pattern { pattern } => entry["format"] = json!(pattern),
                _ => {}
            }
            if let Some(assigned) = &spec.assigned {
                entry["assigned"] = json!(assigned);
            }
            entry
        })
        .collect();

    Value::Array(fields).to_string()
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use parley_core::{FieldKind, FieldSpec, HttpMethod, ProjectDescriptor};
    use serde_json::json;

    use super::{fenced_json, field_configuration};

    #[test]
    fn fenced_block_is_extracted_from_surrounding_prose() {
        let response = "Sure, here you go:\n~~~\n{\"project\": \"Leave Records\"}\n~~~\nanything else?";
        let block = fenced_json(response).expect("block should parse");
        assert_eq!(block, json!({"project": "Leave Records"}));
    }

    #[test]
    fn missing_fence_reads_as_empty() {
        assert_eq!(fenced_json("{\"project\": \"Leave\"}"), None);
        assert_eq!(fenced_json("no json at all"), None);
        assert_eq!(fenced_json("~~~ nothing here ~~~"), None);
    }

    #[test]
    fn malformed_block_reads_as_empty() {
        assert_eq!(fenced_json("~~~ {\"project\": ~~~"), None);
    }

    #[test]
    fn escaped_underscores_are_unescaped() {
        let response = "~~~{\"payload\": {\"employee\\_id\": \"17\"}}~~~";
        let block = fenced_json(response).expect("block should parse");
        assert_eq!(block["payload"]["employee_id"], json!("17"));
    }

    #[test]
    fn field_configuration_carries_kind_parameters() {
        let mut fields = IndexMap::new();
        fields.insert(
            "month".to_string(),
            FieldSpec {
                kind: FieldKind::Choice { options: vec!["january".to_string()] },
                required: false,
                description: "leave month".to_string(),
                assigned: Some("january".to_string()),
            },
        );
        let project = ProjectDescriptor {
            name: "Leave".to_string(),
            description: "leave".to_string(),
            url_template: "/leave".to_string(),
            method: HttpMethod::Get,
            fields,
        };

        let rendered = field_configuration(&project);
        assert!(rendered.contains("\"choices\""));
        assert!(rendered.contains("\"assigned\""));
        assert!(rendered.contains("leave month"));
    }
}
