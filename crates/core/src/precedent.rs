//! Tag-overlap precedent matching.
//!
//! A precedent query is a bag of free-text keywords. Every stored case is
//! scored by how many of its tags appear in the query and the single highest
//! scoring case wins. Equal scores resolve to the lexicographically smallest
//! case id so repeated queries always return the same precedent. A case that
//! shares no tag with the query is never a match.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::precedent::{
    PrecedentCase, PrecedentCaseId, PrecedentDecision, PrecedentMatch, QueryTagSet, Tag,
};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PrecedentIndexError {
    #[error("precedent index unavailable: {0}")]
    Unavailable(String),
    #[error("precedent index returned corrupt row: {0}")]
    Corrupt(String),
}

/// Read-only lookup over the precedent case graph.
///
/// Implementations must tolerate concurrent readers; writes only happen while
/// seeding, which callers serialize against queries.
#[async_trait]
pub trait PrecedentIndex: Send + Sync {
    async fn best_match(
        &self,
        query: &QueryTagSet,
    ) -> Result<Option<PrecedentMatch>, PrecedentIndexError>;
}

/// Picks the winning `(case, score)` pair. Zero scores are discarded.
pub fn select_best<'a, I>(scored: I) -> Option<PrecedentMatch>
where
    I: IntoIterator<Item = (&'a PrecedentCase, usize)>,
{
    scored
        .into_iter()
        .filter(|(_, score)| *score > 0)
        .min_by(|(left_case, left_score), (right_case, right_score)| {
            right_score.cmp(left_score).then_with(|| left_case.id.cmp(&right_case.id))
        })
        .map(|(case, score)| PrecedentMatch {
            precedent_id: case.id.clone(),
            decision: case.decision.clone(),
            rationale: case.rationale.clone(),
            match_score: score,
        })
}

/// In-process inverted index from tag to the cases carrying it.
#[derive(Clone, Debug, Default)]
pub struct InMemoryPrecedentIndex {
    cases: BTreeMap<PrecedentCaseId, PrecedentCase>,
    postings: HashMap<Tag, BTreeSet<PrecedentCaseId>>,
}

impl InMemoryPrecedentIndex {
    /// Builds the index. A repeated case id keeps the last definition.
    pub fn from_cases(cases: impl IntoIterator<Item = PrecedentCase>) -> Self {
        let cases = cases
            .into_iter()
            .map(|case| (case.id.clone(), case))
            .collect::<BTreeMap<_, _>>();

        let mut postings: HashMap<Tag, BTreeSet<PrecedentCaseId>> = HashMap::new();
        for case in cases.values() {
            for tag in &case.tags {
                postings.entry(tag.clone()).or_default().insert(case.id.clone());
            }
        }

        Self { cases, postings }
    }

    /// The three exception scenarios the support team has ruled on.
    pub fn canonical() -> Self {
        Self::from_cases(canonical_cases())
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Postings narrow the candidates; each candidate is then scored by its
    /// full overlap with the query.
    pub fn lookup(&self, query: &QueryTagSet) -> Option<PrecedentMatch> {
        let candidates = query
            .iter()
            .filter_map(|tag| self.postings.get(tag))
            .flatten()
            .collect::<BTreeSet<_>>();

        select_best(
            candidates
                .into_iter()
                .filter_map(|case_id| self.cases.get(case_id))
                .map(|case| (case, case.overlap(query))),
        )
    }
}

#[async_trait]
impl PrecedentIndex for InMemoryPrecedentIndex {
    async fn best_match(
        &self,
        query: &QueryTagSet,
    ) -> Result<Option<PrecedentMatch>, PrecedentIndexError> {
        Ok(self.lookup(query))
    }
}

pub fn canonical_cases() -> Vec<PrecedentCase> {
    vec![
        PrecedentCase::new(
            "PREC-VIP-001",
            PrecedentDecision::Approve,
            "VIP customers are allowed to return Final Sale apparel as a one-time loyalty courtesy.",
            ["socks", "vip", "exception", "apparel"],
        ),
        PrecedentCase::new(
            "PREC-HOL-002",
            PrecedentDecision::Approve,
            "Holiday gifts purchased in Dec have an extended 60-day return window.",
            ["holiday", "gift", "late", "extension", "december"],
        ),
        PrecedentCase::new(
            "PREC-TECH-003",
            PrecedentDecision::Approve,
            "High-Value customers (> $5k spend) allowed one opened tech return per year.",
            ["monitor", "electronics", "opened", "high_value", "tech"],
        ),
    ]
}
