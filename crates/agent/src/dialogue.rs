use parley_channel::{parse_envelope, Channel};
use parley_core::{validate_field, FieldKind, FieldSpec, ProjectDescriptor, RequestDescriptor};
use tracing::debug;

use crate::errors::EngineError;

/// Receives the next channel frame and unwraps the envelope's message text.
/// Mid-dialogue replies arrive as full envelopes; only the message matters.
pub(crate) async fn next_message(channel: &dyn Channel) -> Result<String, EngineError> {
    let raw = channel.recv_text().await?;
    let envelope = parse_envelope(&raw)?;
    Ok(envelope.message)
}

fn normalize_reply(reply: &str) -> String {
    reply.trim().to_lowercase()
}

/// Builds the prompt for one missing field: its description plus whatever
/// guidance the datatype calls for.
fn prompt_for(spec: &FieldSpec) -> String {
    let description = &spec.description;
    match &spec.kind {
        FieldKind::Choice { options } => {
            format!("Please provide {description}. Choices are: {}", options.join(", "))
        }
        FieldKind::Date { formats } if !formats.is_empty() => {
            format!("Please provide {description} (expected date format: {})", formats.join(" or "))
        }
        FieldKind::Date { .. } => {
            format!("Please provide {description} (for example 2024-09-13)")
        }
        FieldKind::Pattern { pattern } => {
            format!("Please provide {description} (expected format: {pattern})")
        }
        FieldKind::Mobile => {
            format!("Please provide {description} (a 10-digit mobile number)")
        }
        FieldKind::Text | FieldKind::Integer => format!("Please provide {description}"),
    }
}

/// Turn-based slot filling: for every field still holding no value, in schema
/// declaration order, prompt the user, take exactly one reply, re-validate,
/// and repeat the same field until it holds a valid value. One field per
/// prompt, never batched. The per-field retry loop is unbounded on purpose:
/// every iteration is driven by an explicit human answer.
pub async fn resolve_missing(
    channel: &dyn Channel,
    project: &ProjectDescriptor,
    mut descriptor: RequestDescriptor,
) -> Result<RequestDescriptor, EngineError> {
    for field_name in descriptor.missing_fields() {
        let Some(spec) = project.fields.get(&field_name) else {
            continue;
        };

        loop {
            channel.send_text(&prompt_for(spec)).await?;
            let reply = next_message(channel).await?;
            let normalized = normalize_reply(&reply);

            match validate_field(spec, Some(&normalized)) {
                Some(valid) => {
                    debug!(
                        event_name = "engine.dialogue.field_filled",
                        field = %field_name,
                        "field filled from dialogue"
                    );
                    descriptor.payload.insert(field_name.clone(), Some(valid));
                    break;
                }
                None => {
                    debug!(
                        event_name = "engine.dialogue.field_retry",
                        field = %field_name,
                        "reply failed validation; repeating prompt"
                    );
                }
            }
        }
    }

    Ok(descriptor)
}
