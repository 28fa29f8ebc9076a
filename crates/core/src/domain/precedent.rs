use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrecedentCaseId(pub String);

impl fmt::Display for PrecedentCaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A normalized descriptive tag: trimmed and lower-cased, never empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Tag(String);

impl Tag {
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase();
        (!normalized.is_empty()).then_some(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Tag {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Tag::parse(&value).ok_or_else(|| "tag must not be blank".to_string())
    }
}

impl From<Tag> for String {
    fn from(value: Tag) -> Self {
        value.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PrecedentDecision {
    Approve,
    Deny,
    Other(String),
}

impl PrecedentDecision {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Approve => "APPROVE",
            Self::Deny => "DENY",
            Self::Other(value) => value,
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "APPROVE" => Self::Approve,
            "DENY" => Self::Deny,
            _ => Self::Other(value.trim().to_string()),
        }
    }
}

impl From<String> for PrecedentDecision {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<PrecedentDecision> for String {
    fn from(value: PrecedentDecision) -> Self {
        value.as_str().to_string()
    }
}

/// Historical human decision plus the tags describing its context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecedentCase {
    pub id: PrecedentCaseId,
    pub decision: PrecedentDecision,
    pub rationale: String,
    pub tags: BTreeSet<Tag>,
}

impl PrecedentCase {
    pub fn new<'a>(
        id: impl Into<String>,
        decision: PrecedentDecision,
        rationale: impl Into<String>,
        tags: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self {
            id: PrecedentCaseId(id.into()),
            decision,
            rationale: rationale.into(),
            tags: tags.into_iter().filter_map(Tag::parse).collect(),
        }
    }

    /// Tag-overlap score against a query: `|tags ∩ query|`.
    pub fn overlap(&self, query: &QueryTagSet) -> usize {
        self.tags.intersection(&query.tags).count()
    }
}

/// Tags derived from the reasoning engine's free-text query.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryTagSet {
    tags: BTreeSet<Tag>,
}

impl QueryTagSet {
    /// Splits on whitespace and normalizes each token; duplicates collapse.
    pub fn from_text(raw: &str) -> Self {
        Self { tags: raw.split_whitespace().filter_map(Tag::parse).collect() }
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.tags.iter()
    }
}

impl FromIterator<Tag> for QueryTagSet {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        Self { tags: iter.into_iter().collect() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecedentMatch {
    pub precedent_id: PrecedentCaseId,
    pub decision: PrecedentDecision,
    pub rationale: String,
    pub match_score: usize,
}

#[cfg(test)]
mod tests {
    use super::{PrecedentCase, PrecedentDecision, QueryTagSet, Tag};

    #[test]
    fn tags_are_trimmed_and_lowercased() {
        assert_eq!(Tag::parse("  VIP ").map(|tag| tag.to_string()), Some("vip".to_string()));
        assert_eq!(Tag::parse("   "), None);
    }

    #[test]
    fn query_collapses_duplicates_and_case() {
        let query = QueryTagSet::from_text("VIP vip  Socks\treturn");
        let tags = query.iter().map(Tag::as_str).collect::<Vec<_>>();
        assert_eq!(tags, vec!["return", "socks", "vip"]);
    }

    #[test]
    fn overlap_counts_each_shared_tag_once() {
        let case = PrecedentCase::new(
            "PREC-1",
            PrecedentDecision::Approve,
            "ok",
            ["vip", "electronics", "opened"],
        );
        assert_eq!(case.overlap(&QueryTagSet::from_text("vip VIP opened unrelated")), 2);
    }

    #[test]
    fn decision_round_trips_through_strings() {
        assert_eq!(PrecedentDecision::parse("approve"), PrecedentDecision::Approve);
        assert_eq!(
            PrecedentDecision::parse("PARTIAL_CREDIT"),
            PrecedentDecision::Other("PARTIAL_CREDIT".to_string())
        );
        assert_eq!(String::from(PrecedentDecision::Approve), "APPROVE");
    }
}
