use chrono::NaiveDate;
use regex::Regex;

use crate::model::{
    collapse_sentinel, DraftPayload, FieldKind, FieldSpec, ProjectDescriptor, RequestDescriptor,
};

/// Fallback patterns tried when a date field configures no formats of its own.
const DEFAULT_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y %b %d"];

/// Type-directed validation of a single field value. Absent input, the "none"
/// sentinel, and anything failing its datatype check all come back as `None`
/// so callers treat "needs a prompt" uniformly. Never panics, never errors.
pub fn validate_field(spec: &FieldSpec, value: Option<&str>) -> Option<String> {
    let value = collapse_sentinel(value.map(str::to_string))?;

    match &spec.kind {
        FieldKind::Text => Some(value),
        FieldKind::Pattern { pattern } => {
            let anchored = format!("^(?:{pattern})$");
            let compiled = Regex::new(&anchored).ok()?;
            compiled.is_match(&value).then_some(value)
        }
        FieldKind::Date { formats } => {
            let trimmed = value.trim().to_string();
            let configured: Vec<&str> = if formats.is_empty() {
                DEFAULT_DATE_FORMATS.to_vec()
            } else {
                formats.iter().map(String::as_str).collect()
            };
            configured
                .iter()
                .any(|format| NaiveDate::parse_from_str(&trimmed, format).is_ok())
                .then_some(trimmed)
        }
        FieldKind::Choice { options } => options.iter().any(|option| option == &value).then_some(value),
        FieldKind::Integer => value.parse::<i64>().ok().map(|_| value),
        FieldKind::Mobile => {
            let parsed = value.parse::<i64>().ok()?;
            (parsed.to_string().len() == 10).then_some(value)
        }
    }
}

/// Runs the field validator over every field the project schema declares.
/// Draft entries outside the schema are ignored; schema fields with no draft
/// value land as `None`. The single choke point every payload passes through
/// before dispatch, whether it came from the slot filler or a user reply.
pub fn validate_payload(project: &ProjectDescriptor, draft: &DraftPayload) -> RequestDescriptor {
    let mut payload = indexmap::IndexMap::with_capacity(project.fields.len());
    for (name, spec) in &project.fields {
        let raw = draft.get(name).and_then(|value| value.as_deref());
        payload.insert(name.clone(), validate_field(spec, raw));
    }

    RequestDescriptor {
        project: project.name.clone(),
        url_template: project.url_template.clone(),
        method: project.method,
        payload,
    }
}
