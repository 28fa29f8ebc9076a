use std::sync::Arc;

use resolute_agent::{
    AgentRuntime, GuardrailPolicy, LlmClient, LlmError, MessagesApiClient, RegistryError,
    ToolDispatcher, ToolRegistry,
};
use resolute_core::audit::TracingAuditSink;
use resolute_core::config::{AppConfig, PrecedentBackend};
use resolute_core::precedent::{InMemoryPrecedentIndex, PrecedentIndex};
use resolute_core::services::{FsPolicyLibrary, MockEnterpriseServices};
use resolute_db::{connect_with_settings, migrations, DbPool, PrecedentRepository, SqlPrecedentIndex};
use thiserror::Error;
use tracing::{info, warn};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: Option<DbPool>,
    pub agent_runtime: AgentRuntime,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("llm.api_key is not set (use RESOLUTE_LLM_API_KEY or ANTHROPIC_API_KEY)")]
    MissingApiKey,
    #[error("reasoning engine client could not be built: {0}")]
    Llm(#[source] LlmError),
    #[error("tool registry is invalid: {0}")]
    Registry(#[from] RegistryError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

impl BootstrapError {
    /// `(error_class, exit_code)` for the command payload.
    pub fn classify(&self) -> (&'static str, u8) {
        match self {
            Self::MissingApiKey => ("config_validation", 2),
            Self::Llm(_) | Self::Registry(_) => ("runtime_init", 3),
            Self::DatabaseConnect(_) => ("db_connectivity", 4),
            Self::Migration(_) => ("migration", 5),
        }
    }
}

/// Wires the production reasoning engine client.
pub async fn bootstrap(config: AppConfig) -> Result<Application, BootstrapError> {
    if !config.llm.has_api_key() {
        return Err(BootstrapError::MissingApiKey);
    }
    let client = MessagesApiClient::from_config(&config.llm).map_err(BootstrapError::Llm)?;
    info!(
        event_name = "system.bootstrap.llm_client_ready",
        correlation_id = "bootstrap",
        model = client.model(),
        "reasoning engine client configured"
    );
    bootstrap_with_client(config, Arc::new(client)).await
}

pub async fn bootstrap_with_client(
    config: AppConfig,
    llm: Arc<dyn LlmClient>,
) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        precedent_backend = config.agent.precedent_backend.as_str(),
        enforce_refund_prerequisites = config.agent.enforce_refund_prerequisites,
        "starting application bootstrap"
    );

    let (db_pool, precedents): (Option<DbPool>, Arc<dyn PrecedentIndex>) =
        match config.agent.precedent_backend {
            PrecedentBackend::Memory => (None, Arc::new(InMemoryPrecedentIndex::canonical())),
            PrecedentBackend::Sqlite => {
                let pool = connect_with_settings(
                    &config.database.url,
                    config.database.max_connections,
                    config.database.timeout_secs,
                )
                .await
                .map_err(BootstrapError::DatabaseConnect)?;
                migrations::run_pending(&pool).await.map_err(BootstrapError::Migration)?;

                let index = SqlPrecedentIndex::new(pool.clone());
                match index.list_cases().await {
                    Ok(cases) if cases.is_empty() => warn!(
                        event_name = "system.bootstrap.precedents_empty",
                        correlation_id = "bootstrap",
                        "precedent graph is empty; run `resolute seed`"
                    ),
                    Ok(cases) => info!(
                        event_name = "system.bootstrap.precedents_loaded",
                        correlation_id = "bootstrap",
                        cases = cases.len(),
                        "precedent graph available"
                    ),
                    Err(error) => warn!(
                        event_name = "system.bootstrap.precedents_unreadable",
                        correlation_id = "bootstrap",
                        error = %error,
                        "precedent graph could not be listed"
                    ),
                }
                (Some(pool), Arc::new(index))
            }
        };

    let policies = Arc::new(FsPolicyLibrary::new(config.policy.directory.clone()));
    let dispatcher = ToolDispatcher::new(
        Arc::new(ToolRegistry::standard()?),
        Arc::new(MockEnterpriseServices::new(policies)),
        precedents,
        GuardrailPolicy::new(config.agent.enforce_refund_prerequisites),
        Arc::new(TracingAuditSink),
    );

    Ok(Application { config, db_pool, agent_runtime: AgentRuntime::new(llm, dispatcher) })
}
