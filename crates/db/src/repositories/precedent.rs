use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use resolute_core::domain::precedent::{
    PrecedentCase, PrecedentCaseId, PrecedentDecision, PrecedentMatch, QueryTagSet, Tag,
};
use resolute_core::precedent::{PrecedentIndex, PrecedentIndexError};
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite};
use tracing::debug;

use super::{PrecedentRepository, RepositoryError};
use crate::DbPool;

/// Precedent lookup answered by one aggregate query over `case_tag`.
///
/// Query tags are bound as parameters, never spliced into the SQL text.
#[derive(Clone, Debug)]
pub struct SqlPrecedentIndex {
    pool: DbPool,
}

impl SqlPrecedentIndex {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl PrecedentIndex for SqlPrecedentIndex {
    async fn best_match(
        &self,
        query: &QueryTagSet,
    ) -> Result<Option<PrecedentMatch>, PrecedentIndexError> {
        if query.is_empty() {
            return Ok(None);
        }

        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT c.id, c.decision, c.rationale, COUNT(ct.tag_name) AS score \
             FROM support_case c \
             JOIN case_tag ct ON ct.case_id = c.id \
             WHERE ct.tag_name IN (",
        );
        let mut separated = builder.separated(", ");
        for tag in query.iter() {
            separated.push_bind(tag.as_str().to_string());
        }
        separated.push_unseparated(
            ") GROUP BY c.id, c.decision, c.rationale \
             HAVING score > 0 \
             ORDER BY score DESC, c.id ASC \
             LIMIT 1",
        );

        let row = builder
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| PrecedentIndexError::Unavailable(error.to_string()))?;

        let found = row.map(|row| match_from_row(&row)).transpose()?;
        debug!(
            event_name = "precedent.sql.best_match",
            query_tags = query.len(),
            matched = found.as_ref().map_or("none", |found| found.precedent_id.0.as_str()),
            "precedent query evaluated"
        );
        Ok(found)
    }
}

#[async_trait]
impl PrecedentRepository for SqlPrecedentIndex {
    async fn list_cases(&self) -> Result<Vec<PrecedentCase>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.decision, c.rationale, ct.tag_name
            FROM support_case c
            LEFT JOIN case_tag ct ON ct.case_id = c.id
            ORDER BY c.id ASC, ct.tag_name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut cases: BTreeMap<String, PrecedentCase> = BTreeMap::new();
        for row in rows {
            let id: String = row.try_get("id")?;
            let tag_name: Option<String> = row.try_get("tag_name")?;

            if !cases.contains_key(&id) {
                let decision: String = row.try_get("decision")?;
                let rationale: String = row.try_get("rationale")?;
                cases.insert(
                    id.clone(),
                    PrecedentCase {
                        id: PrecedentCaseId(id.clone()),
                        decision: PrecedentDecision::parse(&decision),
                        rationale,
                        tags: BTreeSet::new(),
                    },
                );
            }

            if let (Some(tag_name), Some(case)) = (tag_name, cases.get_mut(&id)) {
                let tag = Tag::parse(&tag_name).ok_or_else(|| {
                    RepositoryError::Decode(format!("blank tag linked to case `{id}`"))
                })?;
                case.tags.insert(tag);
            }
        }

        Ok(cases.into_values().collect())
    }

    async fn replace_all(&self, cases: &[PrecedentCase]) -> Result<usize, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM case_tag").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM tag").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM support_case").execute(&mut *tx).await?;

        let mut links = 0usize;
        for case in cases {
            sqlx::query("INSERT INTO support_case (id, decision, rationale) VALUES (?, ?, ?)")
                .bind(&case.id.0)
                .bind(case.decision.as_str())
                .bind(&case.rationale)
                .execute(&mut *tx)
                .await?;

            for tag in &case.tags {
                sqlx::query("INSERT OR IGNORE INTO tag (name) VALUES (?)")
                    .bind(tag.as_str())
                    .execute(&mut *tx)
                    .await?;
                sqlx::query("INSERT INTO case_tag (case_id, tag_name) VALUES (?, ?)")
                    .bind(&case.id.0)
                    .bind(tag.as_str())
                    .execute(&mut *tx)
                    .await?;
                links += 1;
            }
        }

        tx.commit().await?;
        Ok(links)
    }
}

fn match_from_row(row: &SqliteRow) -> Result<PrecedentMatch, PrecedentIndexError> {
    let decode = |error: sqlx::Error| PrecedentIndexError::Corrupt(error.to_string());

    let id: String = row.try_get("id").map_err(decode)?;
    let decision: String = row.try_get("decision").map_err(decode)?;
    let rationale: String = row.try_get("rationale").map_err(decode)?;
    let score: i64 = row.try_get("score").map_err(decode)?;
    let match_score = usize::try_from(score)
        .map_err(|_| PrecedentIndexError::Corrupt(format!("negative score for case `{id}`")))?;

    Ok(PrecedentMatch {
        precedent_id: PrecedentCaseId(id),
        decision: PrecedentDecision::parse(&decision),
        rationale,
        match_score,
    })
}

#[cfg(test)]
mod tests {
    use resolute_core::domain::precedent::{PrecedentCase, PrecedentDecision, QueryTagSet};
    use resolute_core::precedent::{PrecedentIndex, PrecedentIndexError};

    use crate::repositories::{PrecedentRepository, SqlPrecedentIndex};
    use crate::{connect_with_settings, migrations};

    async fn index_with(cases: &[PrecedentCase]) -> SqlPrecedentIndex {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        let index = SqlPrecedentIndex::new(pool);
        index.replace_all(cases).await.expect("seed cases");
        index
    }

    #[tokio::test]
    async fn sql_index_prefers_highest_overlap() {
        let index = index_with(&[
            PrecedentCase::new("A", PrecedentDecision::Approve, "socks", ["vip", "socks"]),
            PrecedentCase::new(
                "B",
                PrecedentDecision::Approve,
                "opened tech",
                ["vip", "electronics", "opened"],
            ),
        ])
        .await;

        let found = index
            .best_match(&QueryTagSet::from_text("vip opened electronics"))
            .await
            .expect("query")
            .expect("match");
        assert_eq!(found.precedent_id.0, "B");
        assert_eq!(found.match_score, 3);
    }

    #[tokio::test]
    async fn sql_index_reports_not_found_without_overlap() {
        let index = index_with(&[PrecedentCase::new(
            "A",
            PrecedentDecision::Approve,
            "socks",
            ["vip", "socks"],
        )])
        .await;

        assert_eq!(index.best_match(&QueryTagSet::from_text("unrelated xyz")).await, Ok(None));
        assert_eq!(index.best_match(&QueryTagSet::from_text("")).await, Ok(None));
    }

    #[tokio::test]
    async fn sql_index_breaks_ties_by_case_id() {
        let index = index_with(&[
            PrecedentCase::new("PREC-Z", PrecedentDecision::Deny, "z", ["vip"]),
            PrecedentCase::new("PREC-A", PrecedentDecision::Approve, "a", ["vip"]),
        ])
        .await;

        let found = index
            .best_match(&QueryTagSet::from_text("vip"))
            .await
            .expect("query")
            .expect("match");
        assert_eq!(found.precedent_id.0, "PREC-A");
    }

    #[tokio::test]
    async fn quotes_in_tags_are_bound_not_interpolated() {
        let index = index_with(&[PrecedentCase::new(
            "PREC-QUOTE",
            PrecedentDecision::Approve,
            "odd tag",
            ["o'brien"],
        )])
        .await;

        let found = index
            .best_match(&QueryTagSet::from_text("O'Brien ') OR 1=1 --"))
            .await
            .expect("query")
            .expect("match");
        assert_eq!(found.precedent_id.0, "PREC-QUOTE");
        assert_eq!(found.match_score, 1);
    }

    #[tokio::test]
    async fn closed_pool_surfaces_as_unavailable() {
        let index = index_with(&[]).await;
        index.pool().close().await;

        let result = index.best_match(&QueryTagSet::from_text("vip")).await;
        assert!(matches!(result, Err(PrecedentIndexError::Unavailable(_))));
    }

    #[tokio::test]
    async fn replace_all_swaps_the_graph() {
        let index = index_with(&[PrecedentCase::new(
            "OLD",
            PrecedentDecision::Deny,
            "old",
            ["legacy"],
        )])
        .await;

        let links = index
            .replace_all(&[PrecedentCase::new(
                "NEW",
                PrecedentDecision::Approve,
                "new",
                ["fresh", "vip"],
            )])
            .await
            .expect("replace");
        assert_eq!(links, 2);

        let cases = index.list_cases().await.expect("list");
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].id.0, "NEW");
        assert_eq!(cases[0].tags.len(), 2);
        assert_eq!(index.best_match(&QueryTagSet::from_text("legacy")).await, Ok(None));
    }
}
