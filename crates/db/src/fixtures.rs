use resolute_core::domain::precedent::{PrecedentCase, QueryTagSet};
use resolute_core::precedent::{canonical_cases, PrecedentIndex};
use tracing::info;

use crate::connection::DbPool;
use crate::repositories::{PrecedentRepository, RepositoryError, SqlPrecedentIndex};

/// Canonical precedent graph for the support agent.
///
/// Loading replaces whatever graph is stored, so running it twice leaves the
/// same three cases behind:
/// 1. VIP Final Sale apparel courtesy
/// 2. Extended December holiday gift window
/// 3. High-value opened electronics return
pub struct PrecedentSeed;

impl PrecedentSeed {
    pub fn cases() -> Vec<PrecedentCase> {
        canonical_cases()
    }

    /// Replace the stored graph with the canonical cases in one transaction.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let cases = Self::cases();
        let repository = SqlPrecedentIndex::new(pool.clone());
        let tag_links = repository.replace_all(&cases).await?;

        let cases_seeded = cases
            .iter()
            .map(|case| CaseSeedInfo {
                case_id: case.id.0.clone(),
                decision: case.decision.as_str().to_string(),
                tag_count: case.tags.len(),
            })
            .collect::<Vec<_>>();

        info!(
            event_name = "precedent.seed.loaded",
            cases = cases_seeded.len(),
            tag_links,
            "precedent graph seeded"
        );
        Ok(SeedResult { cases_seeded, tag_links })
    }

    /// Check every canonical case is stored intact and wins a query built from its own tags.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let index = SqlPrecedentIndex::new(pool.clone());
        let mut checks = Vec::new();

        for case in Self::cases() {
            let stored: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM support_case WHERE id = ?1 AND decision = ?2 AND rationale = ?3)",
            )
            .bind(&case.id.0)
            .bind(case.decision.as_str())
            .bind(&case.rationale)
            .fetch_one(pool)
            .await?;
            checks.push((format!("{}:stored", case.id), stored == 1));

            let tag_count: i64 =
                sqlx::query_scalar("SELECT COUNT(1) FROM case_tag WHERE case_id = ?1")
                    .bind(&case.id.0)
                    .fetch_one(pool)
                    .await?;
            checks.push((format!("{}:tags", case.id), tag_count as usize == case.tags.len()));

            let own_tags = case.tags.iter().cloned().collect::<QueryTagSet>();
            let winner = index
                .best_match(&own_tags)
                .await
                .map_err(|error| RepositoryError::Decode(error.to_string()))?;
            let wins = winner.is_some_and(|found| found.precedent_id == case.id);
            checks.push((format!("{}:self-match", case.id), wins));
        }

        let expected_total = Self::cases().len() as i64;
        let stored_total: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM support_case").fetch_one(pool).await?;
        checks.push(("case-count".to_string(), stored_total == expected_total));

        let all_present = checks.iter().all(|(_, passed)| *passed);
        Ok(VerificationResult { all_present, checks })
    }
}

#[derive(Debug)]
pub struct SeedResult {
    pub cases_seeded: Vec<CaseSeedInfo>,
    pub tag_links: usize,
}

#[derive(Debug)]
pub struct CaseSeedInfo {
    pub case_id: String,
    pub decision: String,
    pub tag_count: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(String, bool)>,
}
