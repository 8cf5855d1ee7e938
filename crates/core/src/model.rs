use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Collapses the "None" placeholder collaborators use for "no value
/// provided" (and empty input) to true absence. Applied at every ingestion
/// point; the placeholder is never stored in a descriptor.
pub fn collapse_sentinel(value: Option<String>) -> Option<String> {
    value.filter(|raw| !raw.trim().is_empty() && !raw.trim().eq_ignore_ascii_case("None"))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed datatype set for payload fields. Every variant carries its own
/// parameters so validation is an exhaustive match, not a string-keyed chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Mobile,
    Date { formats: Vec<String> },
    Pattern { pattern: String },
    Choice { options: Vec<String> },
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Text => "string",
            Self::Integer => "integer",
            Self::Mobile => "mobile",
            Self::Date { .. } => "date",
            Self::Pattern { .. } => "regex",
            Self::Choice { .. } => "choices",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    pub kind: FieldKind,
    pub required: bool,
    pub description: String,
    /// Configured default the slot filler is allowed to echo back verbatim.
    pub assigned: Option<String>,
}

/// One named CRUD operation: URL template, HTTP method, and typed field
/// specifications in declaration order. Read-only after load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectDescriptor {
    pub name: String,
    pub description: String,
    pub url_template: String,
    pub method: HttpMethod,
    pub fields: IndexMap<String, FieldSpec>,
}

/// Unvalidated field-value mapping proposed by the slot filler, after the
/// sentinel has been collapsed to absence.
pub type DraftPayload = IndexMap<String, Option<String>>;

/// Validated, dispatch-ready representation of one request. Mutated in place
/// by the dialogue engine and update reconciler, consumed once by dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub project: String,
    pub url_template: String,
    pub method: HttpMethod,
    pub payload: IndexMap<String, Option<String>>,
}

impl RequestDescriptor {
    /// Field names currently holding no value, in schema declaration order.
    pub fn missing_fields(&self) -> Vec<String> {
        self.payload
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn has_any_value(&self) -> bool {
        self.payload.values().any(Option::is_some)
    }

    /// Drops absent entries, leaving only the fields the user supplied.
    pub fn retain_present(&mut self) {
        self.payload.retain(|_, value| value.is_some());
    }
}
