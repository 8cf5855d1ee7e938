use parley_channel::Channel;
use parley_core::{ProjectDescriptor, RequestDescriptor};
use tracing::debug;

use crate::dialogue::{next_message, resolve_missing};
use crate::errors::EngineError;

/// Below or at this many total fields the selection prompt is skipped and
/// every field is resolved directly.
const SELECTION_THRESHOLD: usize = 2;

/// Decides how an update request gets its payload. When the user already
/// supplied at least one value, the non-null subset is sent as-is and no
/// dialogue happens. When everything is null, the user picks which optional
/// fields to touch and the dialogue engine fills the selection.
pub async fn reconcile_update(
    channel: &dyn Channel,
    project: &ProjectDescriptor,
    mut descriptor: RequestDescriptor,
) -> Result<RequestDescriptor, EngineError> {
    if descriptor.has_any_value() {
        debug!(
            event_name = "engine.update.direct_partial",
            project = %descriptor.project,
            "payload holds user-supplied values; sending the non-null subset"
        );
        descriptor.retain_present();
        return Ok(descriptor);
    }

    let required: Vec<String> = project
        .fields
        .iter()
        .filter(|(_, spec)| spec.required)
        .map(|(name, _)| name.clone())
        .collect();
    let optional: Vec<String> = project
        .fields
        .iter()
        .filter(|(_, spec)| !spec.required)
        .map(|(name, _)| name.clone())
        .collect();

    let selected = if optional.is_empty() || project.fields.len() <= SELECTION_THRESHOLD {
        project.fields.keys().cloned().collect::<Vec<_>>()
    } else {
        channel
            .send_text(&format!(
                "Which fields would you like to update? Reply \"All\" or a \
                 comma-separated subset of: {}",
                optional.join(", ")
            ))
            .await?;
        let reply = next_message(channel).await?;

        let mut chosen = required.clone();
        chosen.extend(parse_selection(&reply, &optional));
        chosen
    };

    debug!(
        event_name = "engine.update.guided_selection",
        project = %descriptor.project,
        fields = selected.len(),
        "resolving the selected field set via dialogue"
    );

    descriptor.payload.retain(|name, _| selected.contains(name));
    resolve_missing(channel, project, descriptor).await
}

/// Parses the selection reply: "all" means every optional field; anything
/// else is split on commas and filtered against the known optional names.
/// Unknown names are silently ignored.
fn parse_selection(reply: &str, optional: &[String]) -> Vec<String> {
    if reply.trim().eq_ignore_ascii_case("all") {
        return optional.to_vec();
    }

    reply
        .split(',')
        .map(str::trim)
        .filter_map(|token| optional.iter().find(|name| name.eq_ignore_ascii_case(token)))
        .cloned()
        .collect()
}
