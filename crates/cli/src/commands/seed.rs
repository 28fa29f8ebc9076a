use crate::commands::{build_runtime, load_config, CommandResult};
use resolute_core::config::LoadOptions;
use resolute_db::{connect_with_settings, migrations, CaseSeedInfo, PrecedentSeed};

pub fn run(options: LoadOptions) -> CommandResult {
    let config = match load_config("seed", options) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let runtime = match build_runtime("seed") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let seed_result = PrecedentSeed::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = PrecedentSeed::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let run_result: Result<Vec<CaseSeedInfo>, (&'static str, String, u8)> =
            if verification.all_present {
                Ok(seed_result.cases_seeded)
            } else {
                let failed = verification
                    .checks
                    .iter()
                    .filter_map(|(check, passed)| (!passed).then_some(check.as_str()))
                    .collect::<Vec<_>>();
                Err(("seed_verification", verification_failure_message(&failed), 6u8))
            };

        pool.close().await;
        run_result
    });

    match result {
        Ok(cases) => {
            let lines = cases
                .iter()
                .map(|case| format!("  - {} ({}, {} tags)", case.case_id, case.decision, case.tag_count))
                .collect::<Vec<_>>();
            CommandResult::success(
                "seed",
                format!("precedent graph seeded with {} cases:\n{}", cases.len(), lines.join("\n")),
            )
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn verification_failure_message(failed_checks: &[&str]) -> String {
    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
