use parley_core::{DraftPayload, ProjectDescriptor};
use tracing::debug;

use crate::collaborator::LanguageService;
use crate::errors::EngineError;

/// Asks the slot filler for draft values and then reconciles each one against
/// the literal query. A proposed value survives only when the user actually
/// said it or when it is the field's schema-assigned constant; anything else
/// is an invention and is dropped back to absent.
pub async fn extract(
    service: &dyn LanguageService,
    query: &str,
    project: &ProjectDescriptor,
) -> Result<DraftPayload, EngineError> {
    let mut draft = service.fill_slots(query, project).await?;

    let query_tokens = tokenize(query);
    for (name, slot) in draft.iter_mut() {
        let Some(value) = slot.as_deref() else {
            continue;
        };

        let grounded_in_query = {
            let value_tokens = tokenize(value);
            !value_tokens.is_empty()
                && value_tokens.iter().all(|token| query_tokens.contains(token))
        };
        let schema_assigned = project
            .fields
            .get(name)
            .and_then(|spec| spec.assigned.as_deref())
            .is_some_and(|assigned| assigned.eq_ignore_ascii_case(value));

        if !grounded_in_query && !schema_assigned {
            debug!(
                event_name = "engine.extract.value_dropped",
                field = %name,
                "proposed value not present in query; dropping"
            );
            *slot = None;
        }
    }

    Ok(draft)
}

/// Lowercased alphanumeric word tokens. Punctuation splits words.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}
