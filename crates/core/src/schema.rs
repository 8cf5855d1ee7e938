use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

use crate::model::{FieldKind, FieldSpec, HttpMethod, ProjectDescriptor};

/// Roles with a configuration group on disk. A conversation selects exactly
/// one of these; anything else is rejected before any file IO happens.
pub const ROLES: &[&str] = &["admin", "employee", "teamlead"];

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("unknown role `{0}` (expected one of admin|employee|teamlead)")]
    UnknownRole(String),
    #[error("could not read schema file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse schema file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: serde_json::Error },
    #[error("project `{project}` field `{field}`: unsupported datatype `{datatype}`")]
    UnsupportedDatatype { project: String, field: String, datatype: String },
    #[error("project `{project}` field `{field}`: datatype `{datatype}` is missing its `{parameter}` parameter")]
    MissingParameter { project: String, field: String, datatype: String, parameter: String },
    #[error("project `{project}` field `{field}`: invalid regex pattern: {source}")]
    InvalidPattern { project: String, field: String, source: regex::Error },
}

/// Immutable per-role view of the configured projects. Loaded once when a
/// conversation turn begins and shared read-only from there on.
#[derive(Clone, Debug)]
pub struct SchemaRegistry {
    role: String,
    projects: IndexMap<String, ProjectDescriptor>,
}

impl SchemaRegistry {
    /// Loads `<role>.json` from the schema directory.
    pub fn load(role: &str, schema_dir: &Path) -> Result<Self, SchemaError> {
        let normalized = role.trim().to_ascii_lowercase();
        if !ROLES.contains(&normalized.as_str()) {
            return Err(SchemaError::UnknownRole(role.to_string()));
        }

        let path = schema_dir.join(format!("{normalized}.json"));
        let raw = fs::read_to_string(&path)
            .map_err(|source| SchemaError::ReadFile { path: path.clone(), source })?;
        let file: IndexMap<String, RawProject> = serde_json::from_str(&raw)
            .map_err(|source| SchemaError::ParseFile { path: path.clone(), source })?;

        let mut projects = IndexMap::with_capacity(file.len());
        for (name, raw_project) in file {
            let descriptor = raw_project.into_descriptor(&name)?;
            projects.insert(name, descriptor);
        }

        Ok(Self { role: normalized, projects })
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    /// Project name → description pairs handed to the intent classifier.
    pub fn descriptions(&self) -> IndexMap<String, String> {
        self.projects
            .iter()
            .map(|(name, project)| (name.clone(), project.description.clone()))
            .collect()
    }

    pub fn project(&self, name: &str) -> Option<&ProjectDescriptor> {
        self.projects.get(name)
    }

    pub fn project_names(&self) -> impl Iterator<Item = &str> {
        self.projects.keys().map(String::as_str)
    }
}

#[derive(Debug, Deserialize)]
struct RawProject {
    #[serde(rename = "project description")]
    description: String,
    url: String,
    method: HttpMethod,
    #[serde(default)]
    payload: IndexMap<String, RawField>,
}

#[derive(Debug, Deserialize)]
struct RawField {
    datatype: String,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    description: String,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    formats: Option<Vec<String>>,
    #[serde(default)]
    choices: Option<Vec<String>>,
    #[serde(default)]
    assigned: Option<String>,
}

impl RawProject {
    fn into_descriptor(self, project_name: &str) -> Result<ProjectDescriptor, SchemaError> {
        let mut fields = IndexMap::with_capacity(self.payload.len());
        for (field_name, raw_field) in self.payload {
            let spec = raw_field.into_spec(project_name, &field_name)?;
            fields.insert(field_name, spec);
        }

        Ok(ProjectDescriptor {
            name: project_name.to_string(),
            description: self.description,
            url_template: self.url,
            method: self.method,
            fields,
        })
    }
}

impl RawField {
    fn into_spec(self, project: &str, field: &str) -> Result<FieldSpec, SchemaError> {
        let kind = match self.datatype.trim().to_ascii_lowercase().as_str() {
            "string" => FieldKind::Text,
            "integer" => FieldKind::Integer,
            "mobile" => FieldKind::Mobile,
            "date" => FieldKind::Date { formats: self.formats.unwrap_or_default() },
            "regex" => {
                let pattern = self.format.ok_or_else(|| SchemaError::MissingParameter {
                    project: project.to_string(),
                    field: field.to_string(),
                    datatype: "regex".to_string(),
                    parameter: "format".to_string(),
                })?;
                regex::Regex::new(&pattern).map_err(|source| SchemaError::InvalidPattern {
                    project: project.to_string(),
                    field: field.to_string(),
                    source,
                })?;
                FieldKind::Pattern { pattern }
            }
            "choices" => {
                let options = self.choices.ok_or_else(|| SchemaError::MissingParameter {
                    project: project.to_string(),
                    field: field.to_string(),
                    datatype: "choices".to_string(),
                    parameter: "choices".to_string(),
                })?;
                FieldKind::Choice { options }
            }
            other => {
                return Err(SchemaError::UnsupportedDatatype {
                    project: project.to_string(),
                    field: field.to_string(),
                    datatype: other.to_string(),
                })
            }
        };

        Ok(FieldSpec {
            kind,
            required: self.required,
            description: self.description,
            assigned: self.assigned,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::{SchemaError, SchemaRegistry};
    use crate::model::{FieldKind, HttpMethod};

    const EMPLOYEE_SCHEMA: &str = r#"{
        "Leave Records": {
            "project description": "Fetch leave records for an employee",
            "url": "/leave/{employee_id}",
            "method": "GET",
            "payload": {
                "employee_id": {
                    "datatype": "integer",
                    "required": true,
                    "description": "your employee id"
                },
                "month": {
                    "datatype": "choices",
                    "required": false,
                    "description": "leave month",
                    "choices": ["january", "february", "march"]
                }
            }
        },
        "Update Leave": {
            "project description": "Update an existing leave record",
            "url": "/leave/{employee_id}",
            "method": "PUT",
            "payload": {
                "employee_id": {
                    "datatype": "integer",
                    "required": true,
                    "description": "your employee id"
                },
                "start_date": {
                    "datatype": "date",
                    "required": false,
                    "description": "leave start date",
                    "formats": ["%d-%m-%Y"]
                }
            }
        }
    }"#;

    fn write_schema(dir: &TempDir, role: &str, body: &str) {
        fs::write(dir.path().join(format!("{role}.json")), body).expect("schema write");
    }

    #[test]
    fn loads_projects_in_file_order() {
        let dir = TempDir::new().expect("tempdir");
        write_schema(&dir, "employee", EMPLOYEE_SCHEMA);

        let registry = SchemaRegistry::load("employee", dir.path()).expect("registry should load");

        let names: Vec<&str> = registry.project_names().collect();
        assert_eq!(names, vec!["Leave Records", "Update Leave"]);

        let leave = registry.project("Leave Records").expect("project");
        assert_eq!(leave.method, HttpMethod::Get);
        let field_names: Vec<&String> = leave.fields.keys().collect();
        assert_eq!(field_names, vec!["employee_id", "month"]);
        assert!(matches!(leave.fields["month"].kind, FieldKind::Choice { .. }));
    }

    #[test]
    fn descriptions_cover_every_project() {
        let dir = TempDir::new().expect("tempdir");
        write_schema(&dir, "employee", EMPLOYEE_SCHEMA);

        let registry = SchemaRegistry::load("employee", dir.path()).expect("registry should load");
        let descriptions = registry.descriptions();

        assert_eq!(descriptions.len(), 2);
        assert_eq!(
            descriptions.get("Update Leave").map(String::as_str),
            Some("Update an existing leave record")
        );
    }

    #[test]
    fn unknown_role_is_rejected_without_file_io() {
        let dir = TempDir::new().expect("tempdir");
        let error = SchemaRegistry::load("superuser", dir.path()).expect_err("unknown role");
        assert!(matches!(error, SchemaError::UnknownRole(_)));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = TempDir::new().expect("tempdir");
        let error = SchemaRegistry::load("admin", dir.path()).expect_err("missing file");
        assert!(matches!(error, SchemaError::ReadFile { .. }));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let dir = TempDir::new().expect("tempdir");
        write_schema(&dir, "teamlead", "{ not json");
        let error = SchemaRegistry::load("teamlead", dir.path()).expect_err("malformed file");
        assert!(matches!(error, SchemaError::ParseFile { .. }));
    }

    #[test]
    fn choices_without_options_fail_load() {
        let dir = TempDir::new().expect("tempdir");
        write_schema(
            &dir,
            "admin",
            r#"{
                "Broken": {
                    "project description": "broken schema",
                    "url": "/x",
                    "method": "POST",
                    "payload": {
                        "field": { "datatype": "choices", "required": true, "description": "d" }
                    }
                }
            }"#,
        );
        let error = SchemaRegistry::load("admin", dir.path()).expect_err("incomplete datatype");
        assert!(matches!(error, SchemaError::MissingParameter { .. }));
    }

    #[test]
    fn invalid_regex_pattern_fails_load() {
        let dir = TempDir::new().expect("tempdir");
        write_schema(
            &dir,
            "admin",
            r#"{
                "Broken": {
                    "project description": "broken schema",
                    "url": "/x",
                    "method": "POST",
                    "payload": {
                        "field": {
                            "datatype": "regex",
                            "required": true,
                            "description": "d",
                            "format": "["
                        }
                    }
                }
            }"#,
        );
        let error = SchemaRegistry::load("admin", dir.path()).expect_err("bad pattern");
        assert!(matches!(error, SchemaError::InvalidPattern { .. }));
    }
}
