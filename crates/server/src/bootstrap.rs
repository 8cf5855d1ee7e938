use std::sync::Arc;

use axum::Router;

use crate::{health, ws};
use parley_agent::Runtime;
use parley_core::config::{AppConfig, ConfigError, LoadOptions};
use thiserror::Error;
use tracing::info;

/// Fully assembled server: configuration plus the shared conversation
/// runtime every websocket connection borrows.
pub struct Application {
    config: AppConfig,
    runtime: Arc<Runtime>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    Ok(bootstrap_with_config(config))
}

pub fn bootstrap_with_config(config: AppConfig) -> Application {
    info!(
        event_name = "system.bootstrap.start",
        schema_dir = %config.schema.dir.display(),
        "starting application bootstrap"
    );

    let runtime = Arc::new(Runtime::new(config.clone()));
    Application { config, runtime }
}

impl Application {
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn router(&self) -> Router {
        Router::new()
            .merge(health::router(self.config.schema.dir.clone()))
            .merge(ws::router(self.runtime.clone()))
    }

    pub async fn serve(self) -> std::io::Result<()> {
        let address = format!("{}:{}", self.config.server.bind_address, self.config.server.port);
        let listener = tokio::net::TcpListener::bind(&address).await?;

        info!(
            event_name = "system.server.listening",
            bind_address = %address,
            "accepting connections"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(wait_for_shutdown())
            .await
    }
}

async fn wait_for_shutdown() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod tests {
    use parley_core::config::{AppConfig, ConfigOverrides, LoadOptions};

    use crate::bootstrap::{bootstrap, bootstrap_with_config};

    #[test]
    fn bootstrap_carries_the_loaded_config() {
        let app = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                llm_model: Some("llama-3.1-8b-instant".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("bootstrap should succeed with defaults");

        assert_eq!(app.config().llm.model, "llama-3.1-8b-instant");
    }

    #[test]
    fn router_is_buildable_without_a_listener() {
        let app = bootstrap_with_config(AppConfig::default());
        let _ = app.router();
    }
}
