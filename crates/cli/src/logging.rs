use resolute_core::config::{AppConfig, LogFormat};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Logs go to stderr so stdout carries only
/// chat replies and command payloads. `RUST_LOG` takes precedence over the
/// configured level when set.
pub fn init_logging(config: &AppConfig) {
    let level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if result.is_err() {
        tracing::debug!(event_name = "system.logging.already_initialized", "subscriber already set");
    }
}
