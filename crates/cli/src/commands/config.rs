use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use resolute_core::config::{resolve_config_path, AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run(options: LoadOptions) -> String {
    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let api_key = match &config.llm.api_key {
        Some(key) => redact_key(key.expose_secret()),
        None => "<unset>".to_string(),
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    let mut push = |key: &str, value: &str, env_keys: &[&str]| {
        let source =
            field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key, value, source));
    };

    push("database.url", &config.database.url, &["RESOLUTE_DATABASE_URL"]);
    push(
        "database.max_connections",
        &config.database.max_connections.to_string(),
        &["RESOLUTE_DATABASE_MAX_CONNECTIONS"],
    );
    push(
        "database.timeout_secs",
        &config.database.timeout_secs.to_string(),
        &["RESOLUTE_DATABASE_TIMEOUT_SECS"],
    );
    push("llm.api_key", &api_key, &["RESOLUTE_LLM_API_KEY", "ANTHROPIC_API_KEY"]);
    push("llm.base_url", &config.llm.base_url, &["RESOLUTE_LLM_BASE_URL"]);
    push("llm.model", &config.llm.model, &["RESOLUTE_LLM_MODEL"]);
    push("llm.max_tokens", &config.llm.max_tokens.to_string(), &["RESOLUTE_LLM_MAX_TOKENS"]);
    push("llm.temperature", &config.llm.temperature.to_string(), &["RESOLUTE_LLM_TEMPERATURE"]);
    push("llm.timeout_secs", &config.llm.timeout_secs.to_string(), &["RESOLUTE_LLM_TIMEOUT_SECS"]);
    push(
        "policy.directory",
        &config.policy.directory.display().to_string(),
        &["RESOLUTE_POLICY_DIRECTORY"],
    );
    push(
        "agent.enforce_refund_prerequisites",
        &config.agent.enforce_refund_prerequisites.to_string(),
        &["RESOLUTE_AGENT_ENFORCE_REFUND_PREREQUISITES"],
    );
    push(
        "agent.precedent_backend",
        config.agent.precedent_backend.as_str(),
        &["RESOLUTE_AGENT_PRECEDENT_BACKEND"],
    );
    push("logging.level", &config.logging.level, &["RESOLUTE_LOGGING_LEVEL", "RESOLUTE_LOG_LEVEL"]);
    push(
        "logging.format",
        &format!("{:?}", config.logging.format).to_ascii_lowercase(),
        &["RESOLUTE_LOGGING_FORMAT", "RESOLUTE_LOG_FORMAT"],
    );

    lines.join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("config file"));
            return format!("file ({})", file_path.display());
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_key(key: &str) -> String {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }
    match trimmed.split_once('-') {
        Some((prefix, _)) => format!("{prefix}-***"),
        None => "<redacted>".to_string(),
    }
}
