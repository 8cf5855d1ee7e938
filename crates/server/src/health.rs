use std::path::PathBuf;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use parley_core::{SchemaRegistry, ROLES};
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    schema_dir: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub schemas: HealthCheck,
    pub checked_at: String,
}

pub fn router(schema_dir: PathBuf) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { schema_dir })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let schemas = schema_check(&state.schema_dir);
    let ready = schemas.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "parley-server runtime initialized".to_string(),
        },
        schemas,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

/// Readiness means every role schema loads. No request can proceed without
/// its role's schema, so a broken file degrades the whole service.
fn schema_check(schema_dir: &PathBuf) -> HealthCheck {
    for role in ROLES {
        if let Err(error) = SchemaRegistry::load(role, schema_dir) {
            return HealthCheck {
                status: "degraded",
                detail: format!("schema for role `{role}` failed to load: {error}"),
            };
        }
    }

    HealthCheck {
        status: "ready",
        detail: format!("{} role schemas loaded", ROLES.len()),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use axum::{extract::State, http::StatusCode, Json};

    use crate::health::{health, HealthState};

    const MINIMAL_SCHEMA: &str = r#"{
        "Holidays": {
            "project description": "List upcoming holidays",
            "url": "https://api.example.com/holidays",
            "method": "GET",
            "payload": {}
        }
    }"#;

    #[tokio::test]
    async fn health_returns_ready_when_all_role_schemas_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        for role in parley_core::ROLES {
            fs::write(dir.path().join(format!("{role}.json")), MINIMAL_SCHEMA)
                .expect("fixture write");
        }

        let (status, Json(payload)) =
            health(State(HealthState { schema_dir: dir.path().to_path_buf() })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.schemas.status, "ready");
        assert_eq!(payload.service.status, "ready");
    }

    #[tokio::test]
    async fn health_degrades_when_a_role_schema_is_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("employee.json"), MINIMAL_SCHEMA).expect("fixture write");

        let (status, Json(payload)) =
            health(State(HealthState { schema_dir: dir.path().to_path_buf() })).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.schemas.status, "degraded");
        assert_eq!(payload.service.status, "ready");
    }
}
