use resolute_core::domain::order::OrderId;

use crate::session::RefundLedger;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailIntent {
    ExecuteRefund { order_id: Option<String> },
}

impl GuardrailIntent {
    pub fn action_key(&self) -> &'static str {
        match self {
            Self::ExecuteRefund { .. } => "refund.execute",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Allow,
    Deny { reason_code: &'static str, user_message: String, fallback_path: &'static str },
}

/// Server-side checks applied before an effectful tool runs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GuardrailPolicy {
    /// Refunds require a successful lookup of the order and a later read of the returns policy.
    pub enforce_refund_prerequisites: bool,
}

impl GuardrailPolicy {
    pub fn new(enforce_refund_prerequisites: bool) -> Self {
        Self { enforce_refund_prerequisites }
    }

    pub fn evaluate(&self, intent: &GuardrailIntent, ledger: &RefundLedger) -> GuardrailDecision {
        match intent {
            GuardrailIntent::ExecuteRefund { .. } if !self.enforce_refund_prerequisites => {
                GuardrailDecision::Allow
            }
            GuardrailIntent::ExecuteRefund { order_id } => {
                let order_id = order_id.as_deref().map(OrderId::new);
                let missing = match &order_id {
                    Some(order_id) => ledger.missing_prerequisites(order_id),
                    None => vec!["order_id"],
                };
                if missing.is_empty() {
                    return GuardrailDecision::Allow;
                }

                GuardrailDecision::Deny {
                    reason_code: "refund_prerequisites_missing",
                    user_message: format!(
                        "Refund blocked for order '{}': missing {}. Look up the order, then read the returns policy, before executing a return.",
                        order_id.as_ref().map_or("unknown", OrderId::as_str),
                        missing.join(", "),
                    ),
                    fallback_path: "look_up_order_then_returns_policy",
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use resolute_core::domain::order::OrderId;
    use resolute_core::domain::policy::PolicyTopic;

    use super::{GuardrailDecision, GuardrailIntent, GuardrailPolicy};
    use crate::session::RefundLedger;

    fn refund(order_id: &str) -> GuardrailIntent {
        GuardrailIntent::ExecuteRefund { order_id: Some(order_id.to_string()) }
    }

    #[test]
    fn advisory_mode_allows_refund_without_history() {
        let policy = GuardrailPolicy::default();
        let decision = policy.evaluate(&refund("ORD-123"), &RefundLedger::default());
        assert_eq!(decision, GuardrailDecision::Allow);
    }

    #[test]
    fn enforced_mode_denies_refund_before_lookup() {
        let policy = GuardrailPolicy::new(true);
        let decision = policy.evaluate(&refund("ORD-123"), &RefundLedger::default());

        let (reason_code, user_message, fallback_path) = match decision {
            GuardrailDecision::Deny { reason_code, user_message, fallback_path } => {
                (reason_code, user_message, fallback_path)
            }
            _ => ("", String::new(), ""),
        };

        assert_eq!(reason_code, "refund_prerequisites_missing");
        assert!(user_message.contains("order_lookup"));
        assert!(user_message.contains("returns_policy"));
        assert_eq!(fallback_path, "look_up_order_then_returns_policy");
    }

    #[test]
    fn enforced_mode_requires_policy_read_after_lookup() {
        let policy = GuardrailPolicy::new(true);
        let mut ledger = RefundLedger::default();

        ledger.record_policy_read(PolicyTopic::Returns);
        ledger.record_order_lookup(OrderId::new("ORD-123"));
        assert!(matches!(
            policy.evaluate(&refund("ORD-123"), &ledger),
            GuardrailDecision::Deny { .. }
        ));

        ledger.record_policy_read(PolicyTopic::Returns);
        assert_eq!(policy.evaluate(&refund("ORD-123"), &ledger), GuardrailDecision::Allow);
        assert!(matches!(
            policy.evaluate(&refund("ORD-456"), &ledger),
            GuardrailDecision::Deny { .. }
        ));
    }

    #[test]
    fn enforced_mode_denies_refund_without_order_id() {
        let policy = GuardrailPolicy::new(true);
        let decision = policy
            .evaluate(&GuardrailIntent::ExecuteRefund { order_id: None }, &RefundLedger::default());
        assert!(matches!(decision, GuardrailDecision::Deny { user_message, .. } if user_message.contains("'unknown'")));
        assert_eq!(GuardrailIntent::ExecuteRefund { order_id: None }.action_key(), "refund.execute");
    }
}
