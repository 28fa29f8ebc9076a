use serde_json::{json, Value};
use thiserror::Error;

use crate::domain::policy::PolicyTopic;
use crate::precedent::PrecedentIndexError;

/// Failure of a decision service. These are reported back to the reasoning
/// engine as tool-result content; they never end a turn.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Order ID not found in system.")]
    OrderNotFound { order_id: Option<String> },
    #[error("A policy_type is required. Expected one of: returns, shipping, privacy.")]
    MissingPolicyTopic,
    #[error("Unknown policy type '{requested}'. Expected one of: returns, shipping, privacy.")]
    UnknownPolicyTopic { requested: String },
    #[error("Policy document for '{topic}' is unavailable.")]
    PolicyUnavailable { topic: PolicyTopic, detail: String },
    #[error(transparent)]
    PrecedentIndex(#[from] PrecedentIndexError),
}

impl ServiceError {
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::OrderNotFound { .. } => "order_not_found",
            Self::MissingPolicyTopic => "policy_topic_missing",
            Self::UnknownPolicyTopic { .. } => "policy_topic_unknown",
            Self::PolicyUnavailable { .. } => "policy_unavailable",
            Self::PrecedentIndex(_) => "precedent_index_unavailable",
        }
    }

    /// Tool-result payload the reasoning engine sees.
    pub fn to_payload(&self) -> Value {
        json!({ "error": self.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::policy::PolicyTopic;
    use crate::errors::ServiceError;
    use crate::precedent::PrecedentIndexError;

    #[test]
    fn order_not_found_payload_matches_oms_wording() {
        let payload = ServiceError::OrderNotFound { order_id: Some("ORD-000".to_string()) }
            .to_payload();
        assert_eq!(payload, serde_json::json!({ "error": "Order ID not found in system." }));
    }

    #[test]
    fn policy_errors_name_the_topic() {
        let error = ServiceError::PolicyUnavailable {
            topic: PolicyTopic::Shipping,
            detail: "No such file or directory".to_string(),
        };
        assert_eq!(error.to_string(), "Policy document for 'shipping' is unavailable.");
        assert_eq!(error.reason_code(), "policy_unavailable");
    }

    #[test]
    fn index_failures_keep_their_own_reason_code() {
        let error = ServiceError::from(PrecedentIndexError::Unavailable("pool closed".to_string()));
        assert_eq!(error.reason_code(), "precedent_index_unavailable");
        assert!(error.to_payload()["error"]
            .as_str()
            .is_some_and(|message| message.contains("pool closed")));
    }
}
