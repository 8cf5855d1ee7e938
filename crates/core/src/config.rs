use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub backend: BackendConfig,
    pub schema: SchemaConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub base_url: String,
    /// Default credential; an envelope-level api key takes precedence per turn.
    pub api_key: Option<SecretString>,
    pub model: String,
    pub max_intent_retries: u32,
}

#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct SchemaConfig {
    pub dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub schema_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                base_url: "https://api.groq.com/openai/v1".to_string(),
                api_key: None,
                model: "llama-3.1-70b-versatile".to_string(),
                max_intent_retries: 3,
            },
            backend: BackendConfig { timeout_secs: 30 },
            schema: SchemaConfig { dir: PathBuf::from("schemas") },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 8080 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("parley.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(api_key_value) = llm.api_key {
                self.llm.api_key = Some(api_key_value.into());
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(max_intent_retries) = llm.max_intent_retries {
                self.llm.max_intent_retries = max_intent_retries;
            }
        }

        if let Some(backend) = patch.backend {
            if let Some(timeout_secs) = backend.timeout_secs {
                self.backend.timeout_secs = timeout_secs;
            }
        }

        if let Some(schema) = patch.schema {
            if let Some(dir) = schema.dir {
                self.schema.dir = dir;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("PARLEY_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("PARLEY_LLM_API_KEY") {
            self.llm.api_key = Some(value.into());
        }
        if let Some(value) = read_env("PARLEY_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("PARLEY_LLM_MAX_INTENT_RETRIES") {
            self.llm.max_intent_retries = parse_u32("PARLEY_LLM_MAX_INTENT_RETRIES", &value)?;
        }
        if let Some(value) = read_env("PARLEY_BACKEND_TIMEOUT_SECS") {
            self.backend.timeout_secs = parse_u64("PARLEY_BACKEND_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("PARLEY_SCHEMA_DIR") {
            self.schema.dir = PathBuf::from(value);
        }
        if let Some(value) = read_env("PARLEY_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("PARLEY_SERVER_PORT") {
            self.server.port = parse_u16("PARLEY_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("PARLEY_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("PARLEY_LOG_FORMAT") {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = llm_base_url;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(schema_dir) = overrides.schema_dir {
            self.schema.dir = schema_dir;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.llm.base_url.starts_with("http://") && !self.llm.base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "llm.base_url must start with http:// or https://".to_string(),
            ));
        }
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
        }
        if self.llm.max_intent_retries == 0 {
            return Err(ConfigError::Validation(
                "llm.max_intent_retries must be greater than zero".to_string(),
            ));
        }
        if let Some(api_key) = &self.llm.api_key {
            if api_key.expose_secret().trim().is_empty() {
                return Err(ConfigError::Validation(
                    "llm.api_key must not be blank when set".to_string(),
                ));
            }
        }
        if self.backend.timeout_secs == 0 || self.backend.timeout_secs > 300 {
            return Err(ConfigError::Validation(
                "backend.timeout_secs must be in range 1..=300".to_string(),
            ));
        }
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port must be greater than zero".to_string(),
            ));
        }

        let level = self.logging.level.trim().to_ascii_lowercase();
        match level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            _ => Err(ConfigError::Validation(
                "logging.level must be one of trace|debug|info|warn|error".to_string(),
            )),
        }
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("parley.toml"), PathBuf::from("config/parley.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str::<ConfigPatch>(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    backend: Option<BackendPatch>,
    schema: Option<SchemaPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    base_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    max_intent_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct BackendPatch {
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SchemaPatch {
    dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    #[test]
    fn defaults_validate() {
        let _guard = env_lock().lock().expect("env lock");
        clear_vars(&["PARLEY_LOG_LEVEL", "PARLEY_LLM_MODEL"]);
        let config = AppConfig::load(LoadOptions::default()).expect("defaults should load");
        assert_eq!(config.llm.max_intent_retries, 3);
        assert_eq!(config.backend.timeout_secs, 30);
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn precedence_defaults_file_env_overrides() {
        let _guard = env_lock().lock().expect("env lock");
        env::set_var("PARLEY_LLM_MODEL", "model-from-env");

        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("parley.toml");
        fs::write(
            &path,
            r#"
[llm]
model = "model-from-file"
max_intent_retries = 5

[logging]
level = "warn"
"#,
        )
        .expect("config write");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(path),
            overrides: ConfigOverrides {
                log_level: Some("debug".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("config should load");

        clear_vars(&["PARLEY_LLM_MODEL"]);

        assert_eq!(config.llm.model, "model-from-env");
        assert_eq!(config.llm.max_intent_retries, 5);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let _guard = env_lock().lock().expect("env lock");
        let dir = TempDir::new().expect("tempdir");
        let error = AppConfig::load(LoadOptions {
            config_path: Some(dir.path().join("absent.toml")),
            require_file: true,
            ..LoadOptions::default()
        })
        .expect_err("absent required file");
        assert!(matches!(error, ConfigError::MissingConfigFile(_)));
    }

    #[test]
    fn validation_rejects_zero_retry_bound() {
        let _guard = env_lock().lock().expect("env lock");
        env::set_var("PARLEY_LLM_MAX_INTENT_RETRIES", "0");
        let error = AppConfig::load(LoadOptions::default()).expect_err("zero retries");
        clear_vars(&["PARLEY_LLM_MAX_INTENT_RETRIES"]);
        assert!(matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("max_intent_retries")
        ));
    }

    #[test]
    fn invalid_env_number_is_reported_with_key() {
        let _guard = env_lock().lock().expect("env lock");
        env::set_var("PARLEY_SERVER_PORT", "not-a-port");
        let error = AppConfig::load(LoadOptions::default()).expect_err("bad port");
        clear_vars(&["PARLEY_SERVER_PORT"]);
        assert!(matches!(
            error,
            ConfigError::InvalidEnvOverride { ref key, .. } if key == "PARLEY_SERVER_PORT"
        ));
    }
}
