use indexmap::IndexMap;
use parley_channel::Channel;
use tracing::{debug, warn};

use crate::collaborator::{IntentOutcome, LanguageService};
use crate::dialogue::next_message;
use crate::errors::EngineError;

/// A query successfully mapped to a configured project. The query travels
/// with the result because clarification replies replace it mid-resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedIntent {
    pub query: String,
    pub project: String,
}

/// Maps a free-text query to a known project name, re-prompting over the
/// channel when the classifier comes up empty. The loop is bounded: once the
/// retry budget is spent the turn ends in a terminal unresolved outcome
/// instead of prompting forever.
pub async fn resolve(
    channel: &dyn Channel,
    service: &dyn LanguageService,
    query: &str,
    descriptions: &IndexMap<String, String>,
    max_retries: u32,
) -> Result<ResolvedIntent, EngineError> {
    let mut query = query.to_string();

    for attempt in 0..=max_retries {
        let outcome = service.classify_intent(&query, descriptions).await?;

        match outcome {
            IntentOutcome::Match(name) if descriptions.contains_key(&name) => {
                debug!(
                    event_name = "engine.intent.resolved",
                    project = %name,
                    attempt,
                    "intent resolved"
                );
                return Ok(ResolvedIntent { query, project: name });
            }
            IntentOutcome::Match(name) => {
                // Classifier invented a name not in the catalog; same as no match.
                warn!(
                    event_name = "engine.intent.hallucinated",
                    project = %name,
                    attempt,
                    "classifier returned an unknown project name"
                );
            }
            IntentOutcome::NoMatch => {}
        }

        if attempt == max_retries {
            break;
        }

        let catalog = descriptions.keys().cloned().collect::<Vec<_>>().join(", ");
        channel
            .send_text(&format!(
                "I couldn't match that to anything I can help with. \
                 Ask about one of these: {catalog}"
            ))
            .await?;
        query = next_message(channel).await?;
    }

    Err(EngineError::IntentUnresolved { attempts: max_retries + 1 })
}
