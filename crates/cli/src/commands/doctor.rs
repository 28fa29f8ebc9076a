use resolute_core::config::{AppConfig, LoadOptions, PrecedentBackend};
use resolute_core::domain::policy::PolicyTopic;
use resolute_core::services::{FsPolicyLibrary, PolicyLibrary};
use resolute_db::{connect_with_settings, migrations, PrecedentSeed};
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn skipped(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Skipped, details: details.into() }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

/// Exit code 0 when every check passes or is skipped, 6 otherwise.
pub fn run(options: LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options);
    let exit_code = if report.overall_status == CheckStatus::Fail { 6 } else { 0 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report(options: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_api_key(&config));
            match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => {
                    checks.push(runtime.block_on(check_policy_documents(&config)));
                    checks.extend(runtime.block_on(check_precedent_store(&config)));
                }
                Err(error) => {
                    for name in ["policy_documents", "database_connectivity", "precedent_graph"] {
                        checks.push(DoctorCheck {
                            name,
                            status: CheckStatus::Fail,
                            details: format!("failed to initialize async runtime: {error}"),
                        });
                    }
                }
            }
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in
                ["llm_api_key", "policy_documents", "database_connectivity", "precedent_graph"]
            {
                checks.push(DoctorCheck::skipped(
                    name,
                    "skipped because configuration did not load",
                ));
            }
        }
    }

    let any_failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if any_failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if any_failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_api_key(config: &AppConfig) -> DoctorCheck {
    if config.llm.has_api_key() {
        DoctorCheck {
            name: "llm_api_key",
            status: CheckStatus::Pass,
            details: format!("api key present for model `{}`", config.llm.model),
        }
    } else {
        DoctorCheck {
            name: "llm_api_key",
            status: CheckStatus::Fail,
            details: "set RESOLUTE_LLM_API_KEY or ANTHROPIC_API_KEY".to_string(),
        }
    }
}

async fn check_policy_documents(config: &AppConfig) -> DoctorCheck {
    let library = FsPolicyLibrary::new(config.policy.directory.clone());
    let mut missing = Vec::new();
    for topic in PolicyTopic::ALL {
        if library.fetch(topic).await.is_err() {
            missing.push(library.path_for(topic).display().to_string());
        }
    }

    if missing.is_empty() {
        DoctorCheck {
            name: "policy_documents",
            status: CheckStatus::Pass,
            details: format!("all policy documents readable in `{}`", library.directory().display()),
        }
    } else {
        DoctorCheck {
            name: "policy_documents",
            status: CheckStatus::Fail,
            details: format!("missing or empty: {}", missing.join(", ")),
        }
    }
}

async fn check_precedent_store(config: &AppConfig) -> Vec<DoctorCheck> {
    if config.agent.precedent_backend == PrecedentBackend::Memory {
        return vec![
            DoctorCheck::skipped("database_connectivity", "precedent backend is `memory`"),
            DoctorCheck::skipped("precedent_graph", "precedent backend is `memory`"),
        ];
    }

    let pool = match connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    {
        Ok(pool) => pool,
        Err(error) => {
            return vec![
                DoctorCheck {
                    name: "database_connectivity",
                    status: CheckStatus::Fail,
                    details: format!("failed to connect to database: {error}"),
                },
                DoctorCheck::skipped("precedent_graph", "skipped because database is unreachable"),
            ];
        }
    };

    let connectivity = DoctorCheck {
        name: "database_connectivity",
        status: CheckStatus::Pass,
        details: format!("connected using `{}`", config.database.url),
    };

    let graph = match migrations::run_pending(&pool).await {
        Err(error) => DoctorCheck {
            name: "precedent_graph",
            status: CheckStatus::Fail,
            details: format!("migration failed: {error}"),
        },
        Ok(()) => match PrecedentSeed::verify(&pool).await {
            Ok(verification) if verification.all_present => DoctorCheck {
                name: "precedent_graph",
                status: CheckStatus::Pass,
                details: format!("{} seed checks passed", verification.checks.len()),
            },
            Ok(_) => DoctorCheck {
                name: "precedent_graph",
                status: CheckStatus::Fail,
                details: "precedent graph is not seeded; run `resolute seed`".to_string(),
            },
            Err(error) => DoctorCheck {
                name: "precedent_graph",
                status: CheckStatus::Fail,
                details: format!("verification failed: {error}"),
            },
        },
    };

    pool.close().await;
    vec![connectivity, graph]
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
