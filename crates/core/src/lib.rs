pub mod config;
pub mod model;
pub mod schema;
pub mod validate;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use model::{
    collapse_sentinel, DraftPayload, FieldKind, FieldSpec, HttpMethod, ProjectDescriptor,
    RequestDescriptor,
};
pub use schema::{SchemaError, SchemaRegistry, ROLES};
pub use validate::{validate_field, validate_payload};
