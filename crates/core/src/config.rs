use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub policy: PolicyConfig,
    pub agent: AgentConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl LlmConfig {
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_ref().is_some_and(|key| !key.expose_secret().trim().is_empty())
    }
}

#[derive(Clone, Debug)]
pub struct PolicyConfig {
    pub directory: PathBuf,
}

#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub enforce_refund_prerequisites: bool,
    pub precedent_backend: PrecedentBackend,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecedentBackend {
    Sqlite,
    Memory,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
    pub policy_directory: Option<PathBuf>,
    pub enforce_refund_prerequisites: Option<bool>,
    pub precedent_backend: Option<PrecedentBackend>,
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
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://data/precedents.db?mode=rwc".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            llm: LlmConfig {
                api_key: None,
                base_url: "https://api.anthropic.com".to_string(),
                model: "claude-sonnet-4-5-20250929".to_string(),
                max_tokens: 1024,
                temperature: 0.0,
                timeout_secs: 60,
            },
            policy: PolicyConfig { directory: PathBuf::from("policies") },
            agent: AgentConfig {
                enforce_refund_prerequisites: false,
                precedent_backend: PrecedentBackend::Sqlite,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
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

impl std::str::FromStr for PrecedentBackend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::Validation(format!(
                "unsupported precedent backend `{other}` (expected sqlite|memory)"
            ))),
        }
    }
}

impl PrecedentBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Memory => "memory",
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
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("resolute.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(max_tokens) = llm.max_tokens {
                self.llm.max_tokens = max_tokens;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(policy) = patch.policy {
            if let Some(directory) = policy.directory {
                self.policy.directory = directory;
            }
        }

        if let Some(agent) = patch.agent {
            if let Some(enforce) = agent.enforce_refund_prerequisites {
                self.agent.enforce_refund_prerequisites = enforce;
            }
            if let Some(backend) = agent.precedent_backend {
                self.agent.precedent_backend = backend;
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
        if let Some(value) = read_env("RESOLUTE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("RESOLUTE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("RESOLUTE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("RESOLUTE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("RESOLUTE_DATABASE_TIMEOUT_SECS", &value)?;
        }

        let api_key = read_env("RESOLUTE_LLM_API_KEY").or_else(|| read_env("ANTHROPIC_API_KEY"));
        if let Some(value) = api_key {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("RESOLUTE_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("RESOLUTE_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("RESOLUTE_LLM_MAX_TOKENS") {
            self.llm.max_tokens = parse_u32("RESOLUTE_LLM_MAX_TOKENS", &value)?;
        }
        if let Some(value) = read_env("RESOLUTE_LLM_TEMPERATURE") {
            self.llm.temperature = parse_f32("RESOLUTE_LLM_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("RESOLUTE_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("RESOLUTE_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("RESOLUTE_POLICY_DIRECTORY") {
            self.policy.directory = PathBuf::from(value);
        }

        if let Some(value) = read_env("RESOLUTE_AGENT_ENFORCE_REFUND_PREREQUISITES") {
            self.agent.enforce_refund_prerequisites =
                parse_bool("RESOLUTE_AGENT_ENFORCE_REFUND_PREREQUISITES", &value)?;
        }
        if let Some(value) = read_env("RESOLUTE_AGENT_PRECEDENT_BACKEND") {
            self.agent.precedent_backend = value.parse()?;
        }

        let log_level =
            read_env("RESOLUTE_LOGGING_LEVEL").or_else(|| read_env("RESOLUTE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("RESOLUTE_LOGGING_FORMAT").or_else(|| read_env("RESOLUTE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(directory) = overrides.policy_directory {
            self.policy.directory = directory;
        }
        if let Some(enforce) = overrides.enforce_refund_prerequisites {
            self.agent.enforce_refund_prerequisites = enforce;
        }
        if let Some(backend) = overrides.precedent_backend {
            self.agent.precedent_backend = backend;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_llm(&self.llm)?;
        validate_policy(&self.policy)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// Locates the config file that `load` would read, if any.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("resolute.toml"), PathBuf::from("config/resolute.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if llm.max_tokens == 0 {
        return Err(ConfigError::Validation(
            "llm.max_tokens must be greater than zero".to_string(),
        ));
    }

    if !llm.temperature.is_finite() || !(0.0..=1.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=1.0".to_string(),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    let base_url = llm.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "llm.base_url must start with http:// or https://".to_string(),
        ));
    }

    Ok(())
}

fn validate_policy(policy: &PolicyConfig) -> Result<(), ConfigError> {
    if policy.directory.as_os_str().is_empty() {
        return Err(ConfigError::Validation("policy.directory must not be empty".to_string()));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
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

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.parse::<f32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    llm: Option<LlmPatch>,
    policy: Option<PolicyPatch>,
    agent: Option<AgentPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PolicyPatch {
    directory: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentPatch {
    enforce_refund_prerequisites: Option<bool>,
    precedent_backend: Option<PrecedentBackend>,
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
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat, PrecedentBackend};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    const MANAGED_VARS: &[&str] = &[
        "RESOLUTE_LLM_API_KEY",
        "ANTHROPIC_API_KEY",
        "RESOLUTE_DATABASE_URL",
        "RESOLUTE_LOG_LEVEL",
        "RESOLUTE_LOG_FORMAT",
        "RESOLUTE_LLM_TEMPERATURE",
        "RESOLUTE_AGENT_PRECEDENT_BACKEND",
        "TEST_RESOLUTE_API_KEY",
    ];

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_validate_without_api_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(!config.llm.has_api_key(), "no api key should be configured by default")?;
        ensure(config.llm.max_tokens == 1024, "default max tokens should be 1024")?;
        ensure(config.llm.temperature == 0.0, "default temperature should be deterministic")?;
        ensure(
            config.agent.precedent_backend == PrecedentBackend::Sqlite,
            "sqlite backend should be the default",
        )?;
        ensure(
            !config.agent.enforce_refund_prerequisites,
            "refund prerequisite enforcement should be opt-in",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);
        env::set_var("TEST_RESOLUTE_API_KEY", "sk-from-interpolation");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("resolute.toml");
            fs::write(
                &path,
                r#"
[llm]
api_key = "${TEST_RESOLUTE_API_KEY}"

[agent]
enforce_refund_prerequisites = true
precedent_backend = "memory"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.llm.api_key.as_ref().map(|key| key.expose_secret())
                    == Some("sk-from-interpolation"),
                "api key should be interpolated from environment",
            )?;
            ensure(config.agent.enforce_refund_prerequisites, "agent flag should load from file")?;
            ensure(
                config.agent.precedent_backend == PrecedentBackend::Memory,
                "precedent backend should load from file",
            )
        })();

        clear_vars(MANAGED_VARS);
        result
    }

    #[test]
    fn anthropic_key_is_used_as_fallback() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);
        env::set_var("ANTHROPIC_API_KEY", "sk-ant-fallback");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            ensure(
                config.llm.api_key.as_ref().map(|key| key.expose_secret())
                    == Some("sk-ant-fallback"),
                "ANTHROPIC_API_KEY should populate llm.api_key",
            )?;

            env::set_var("RESOLUTE_LLM_API_KEY", "sk-resolute");
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            ensure(
                config.llm.api_key.as_ref().map(|key| key.expose_secret()) == Some("sk-resolute"),
                "prefixed key should win over the fallback",
            )
        })();

        clear_vars(MANAGED_VARS);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);
        env::set_var("RESOLUTE_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("RESOLUTE_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("resolute.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[logging]
level = "warn"
format = "json"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-env.db",
                "env database url should win over file",
            )?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "env log format should win over file",
            )?;
            ensure(config.logging.level == "debug", "explicit override should win over file")
        })();

        clear_vars(MANAGED_VARS);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);
        env::set_var("RESOLUTE_LLM_TEMPERATURE", "1.5");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("llm.temperature")
            );
            ensure(has_message, "validation failure should mention llm.temperature")
        })();

        clear_vars(MANAGED_VARS);
        result
    }

    #[test]
    fn invalid_env_values_are_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);
        env::set_var("RESOLUTE_AGENT_PRECEDENT_BACKEND", "graph");

        let result = match AppConfig::load(LoadOptions::default()) {
            Err(ConfigError::Validation(message)) if message.contains("precedent backend") => {
                Ok(())
            }
            Err(other) => Err(format!("unexpected error: {other}")),
            Ok(_) => Err("unsupported backend should fail".to_string()),
        };

        clear_vars(MANAGED_VARS);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(MANAGED_VARS);
        env::set_var("RESOLUTE_LLM_API_KEY", "sk-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("sk-secret-value"), "debug output should not contain api key")?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )
        })();

        clear_vars(MANAGED_VARS);
        result
    }
}
