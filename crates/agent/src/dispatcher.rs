//! Tool Dispatcher: one tool request in, one tool result out.
//!
//! Nothing in here returns an error to the caller. Unknown tools, guardrail
//! denials and service failures all become `{"error": ...}` payloads that the
//! reasoning engine reads on its next round.

use std::sync::Arc;

use resolute_core::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use resolute_core::domain::order::OrderId;
use resolute_core::domain::policy::PolicyTopic;
use resolute_core::domain::precedent::QueryTagSet;
use resolute_core::errors::ServiceError;
use resolute_core::precedent::PrecedentIndex;
use resolute_core::services::DecisionServices;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::conversation::{ToolRequest, ToolResult};
use crate::guardrails::{GuardrailDecision, GuardrailIntent, GuardrailPolicy};
use crate::session::RefundLedger;
use crate::tools::{ToolCall, ToolRegistry};

pub const NO_PRECEDENT_MESSAGE: &str = "No relevant precedents found.";

pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    services: Arc<dyn DecisionServices>,
    precedents: Arc<dyn PrecedentIndex>,
    guardrails: GuardrailPolicy,
    audit: Arc<dyn AuditSink>,
}

impl ToolDispatcher {
    pub fn new(
        registry: Arc<ToolRegistry>,
        services: Arc<dyn DecisionServices>,
        precedents: Arc<dyn PrecedentIndex>,
        guardrails: GuardrailPolicy,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self { registry, services, precedents, guardrails, audit }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub async fn dispatch(
        &self,
        request: &ToolRequest,
        ledger: &mut RefundLedger,
        context: &AuditContext,
    ) -> ToolResult {
        info!(
            event_name = "agent.tool.selected",
            session_id = %context.session_id,
            correlation_id = %context.correlation_id,
            tool = %request.name,
            tool_use_id = %request.id,
            input = %request.input,
            "agent selected tool"
        );

        let Some(name) = self.registry.resolve(&request.name) else {
            warn!(
                event_name = "agent.tool.unknown",
                session_id = %context.session_id,
                correlation_id = %context.correlation_id,
                tool = %request.name,
                "unknown tool called"
            );
            self.audit.emit(
                AuditEvent::new(context, "tool.unknown", AuditCategory::Tooling, AuditOutcome::Rejected)
                    .with_metadata("tool", request.name.clone())
                    .with_metadata("tool_use_id", request.id.clone()),
            );
            return ToolResult::new(
                &request.id,
                &json!({ "error": format!("Tool '{}' not found.", request.name) }),
            );
        };

        let call = ToolCall::parse(name, &request.input);
        let (payload, reason_code) = match self.run(&call, ledger, context).await {
            Ok(payload) => (payload, None),
            Err(error) => {
                warn!(
                    event_name = "agent.tool.service_failed",
                    session_id = %context.session_id,
                    correlation_id = %context.correlation_id,
                    tool = name.as_str(),
                    reason_code = error.reason_code(),
                    error = %error,
                    "decision service returned an error"
                );
                (error.to_payload(), Some(error.reason_code()))
            }
        };
        let outcome = if payload.get("error").is_some() {
            AuditOutcome::Failed
        } else {
            AuditOutcome::Success
        };
        let mut event = AuditEvent::new(context, "tool.dispatched", AuditCategory::Tooling, outcome)
            .with_order(call.order_id().map(OrderId::new))
            .with_metadata("tool", name.as_str())
            .with_metadata("tool_use_id", request.id.clone());
        if let Some(reason_code) = reason_code {
            event = event.with_metadata("reason_code", reason_code);
        }
        self.audit.emit(event);

        ToolResult::new(&request.id, &payload)
    }

    /// Runs one parsed call. Guardrail denials come back as `Ok` payloads
    /// carrying their own `reason_code`; service failures come back as `Err`.
    async fn run(
        &self,
        call: &ToolCall,
        ledger: &mut RefundLedger,
        context: &AuditContext,
    ) -> Result<Value, ServiceError> {
        match call {
            ToolCall::LookUpOrder { order_id } => {
                let record = self.services.look_up_order(order_id.as_deref()).await?;
                if let Some(order_id) = order_id {
                    ledger.record_order_lookup(OrderId::new(order_id.as_str()));
                }
                Ok(to_payload(&record))
            }
            ToolCall::GetPolicyInfo { policy_type } => {
                let document = self.services.get_policy_info(policy_type.as_deref()).await?;
                if let Some(topic) = policy_type.as_deref().and_then(PolicyTopic::parse) {
                    ledger.record_policy_read(topic);
                }
                Ok(to_payload(&document))
            }
            ToolCall::ExecuteOrderReturn { order_id, reason } => {
                let intent = GuardrailIntent::ExecuteRefund { order_id: order_id.clone() };
                if let GuardrailDecision::Deny { reason_code, user_message, fallback_path } =
                    self.guardrails.evaluate(&intent, ledger)
                {
                    warn!(
                        event_name = "agent.guardrail.denied",
                        session_id = %context.session_id,
                        correlation_id = %context.correlation_id,
                        action = intent.action_key(),
                        reason_code,
                        "tool call rejected by guardrail"
                    );
                    self.audit.emit(
                        AuditEvent::new(
                            context,
                            "tool.rejected",
                            AuditCategory::Guardrail,
                            AuditOutcome::Rejected,
                        )
                        .with_order(order_id.as_deref().map(OrderId::new))
                        .with_metadata("reason_code", reason_code)
                        .with_metadata("fallback_path", fallback_path),
                    );
                    return Ok(json!({ "error": user_message, "reason_code": reason_code }));
                }

                let receipt =
                    self.services.execute_refund(order_id.as_deref(), reason.as_deref()).await?;
                self.audit.emit(
                    AuditEvent::new(context, "refund.executed", AuditCategory::Refund, AuditOutcome::Success)
                        .with_order(order_id.as_deref().map(OrderId::new))
                        .with_metadata("transaction_id", receipt.transaction_id.clone()),
                );
                Ok(to_payload(&receipt))
            }
            ToolCall::EscalateToHuman { order_id, reason } => {
                let ticket =
                    self.services.escalate_to_human(order_id.as_deref(), reason.as_deref()).await?;
                self.audit.emit(
                    AuditEvent::new(
                        context,
                        "escalation.created",
                        AuditCategory::Escalation,
                        AuditOutcome::Success,
                    )
                    .with_order(order_id.as_deref().map(OrderId::new))
                    .with_metadata("ticket_id", ticket.ticket_id.clone())
                    .with_metadata("reason", reason.clone().unwrap_or_default()),
                );
                Ok(to_payload(&ticket))
            }
            ToolCall::CheckPrecedents { query_tags } => {
                let query = QueryTagSet::from_text(query_tags.as_deref().unwrap_or_default());
                let Some(found) = self.precedents.best_match(&query).await? else {
                    return Ok(json!({ "found": false, "message": NO_PRECEDENT_MESSAGE }));
                };
                self.audit.emit(
                    AuditEvent::new(context, "precedent.matched", AuditCategory::Precedent, AuditOutcome::Success)
                        .with_metadata("precedent_id", found.precedent_id.to_string())
                        .with_metadata("match_score", found.match_score.to_string()),
                );
                Ok(json!({
                    "found": true,
                    "precedent_id": found.precedent_id,
                    "decision": found.decision,
                    "rationale": found.rationale,
                    "match_score": found.match_score,
                }))
            }
        }
    }
}

fn to_payload<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value)
        .unwrap_or_else(|error| json!({ "error": format!("could not encode tool result: {error}") }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use resolute_core::audit::{AuditCategory, AuditContext, AuditOutcome, InMemoryAuditSink};
    use resolute_core::domain::policy::PolicyTopic;
    use resolute_core::domain::precedent::{PrecedentMatch, QueryTagSet};
    use resolute_core::precedent::{InMemoryPrecedentIndex, PrecedentIndex, PrecedentIndexError};
    use resolute_core::services::{InMemoryPolicyLibrary, MockEnterpriseServices};
    use serde_json::{json, Value};

    use super::ToolDispatcher;
    use crate::conversation::ToolRequest;
    use crate::guardrails::GuardrailPolicy;
    use crate::session::RefundLedger;
    use crate::tools::ToolRegistry;

    struct OfflineIndex;

    #[async_trait]
    impl PrecedentIndex for OfflineIndex {
        async fn best_match(
            &self,
            _query: &QueryTagSet,
        ) -> Result<Option<PrecedentMatch>, PrecedentIndexError> {
            Err(PrecedentIndexError::Unavailable("connection refused".to_string()))
        }
    }

    fn dispatcher_with(
        precedents: Arc<dyn PrecedentIndex>,
        guardrails: GuardrailPolicy,
    ) -> (ToolDispatcher, InMemoryAuditSink) {
        let policies = InMemoryPolicyLibrary::default()
            .with_document(PolicyTopic::Returns, "Opened electronics are non-returnable.");
        let audit = InMemoryAuditSink::default();
        let dispatcher = ToolDispatcher::new(
            Arc::new(ToolRegistry::standard().expect("registry")),
            Arc::new(MockEnterpriseServices::new(Arc::new(policies))),
            precedents,
            guardrails,
            Arc::new(audit.clone()),
        );
        (dispatcher, audit)
    }

    fn dispatcher() -> (ToolDispatcher, InMemoryAuditSink) {
        dispatcher_with(Arc::new(InMemoryPrecedentIndex::canonical()), GuardrailPolicy::default())
    }

    fn request(id: &str, name: &str, input: Value) -> ToolRequest {
        ToolRequest { id: id.to_string(), name: name.to_string(), input }
    }

    fn context() -> AuditContext {
        AuditContext::new("session-1", "corr-1", "support-agent")
    }

    #[tokio::test]
    async fn unknown_tool_degrades_to_error_payload() {
        let (dispatcher, audit) = dispatcher();
        let result = dispatcher
            .dispatch(&request("toolu_9", "delete_all_orders", json!({})), &mut RefundLedger::default(), &context())
            .await;

        assert_eq!(result.tool_use_id, "toolu_9");
        assert_eq!(result.payload(), Some(json!({ "error": "Tool 'delete_all_orders' not found." })));
        assert_eq!(audit.event_types(), vec!["tool.unknown"]);
    }

    #[tokio::test]
    async fn order_lookup_routes_to_oms() {
        let (dispatcher, _) = dispatcher();
        let mut ledger = RefundLedger::default();

        let found = dispatcher
            .dispatch(&request("a", "look_up_order", json!({ "order_id": "ORD-999" })), &mut ledger, &context())
            .await;
        assert_eq!(
            found.payload(),
            Some(json!({
                "status": "processing",
                "items": ["4K Monitor"],
                "eligible_for_return": true,
                "customer_sentiment": "angry"
            }))
        );

        let missing = dispatcher
            .dispatch(&request("b", "look_up_order", json!({ "order_id": "ORD-000" })), &mut ledger, &context())
            .await;
        assert_eq!(missing.payload(), Some(json!({ "error": "Order ID not found in system." })));
    }

    #[tokio::test]
    async fn missing_arguments_reach_the_service_as_absent() {
        let (dispatcher, _) = dispatcher();
        let result = dispatcher
            .dispatch(&request("a", "look_up_order", json!({})), &mut RefundLedger::default(), &context())
            .await;
        assert_eq!(result.payload(), Some(json!({ "error": "Order ID not found in system." })));
    }

    #[tokio::test]
    async fn precedent_results_report_found_and_not_found() {
        let (dispatcher, audit) = dispatcher();
        let mut ledger = RefundLedger::default();

        let hit = dispatcher
            .dispatch(
                &request("a", "check_precedents", json!({ "query_tags_str": "VIP socks return" })),
                &mut ledger,
                &context(),
            )
            .await
            .payload()
            .expect("json payload");
        assert_eq!(hit["found"], true);
        assert_eq!(hit["precedent_id"], "PREC-VIP-001");
        assert_eq!(hit["decision"], "APPROVE");
        assert_eq!(hit["match_score"], 2);

        let miss = dispatcher
            .dispatch(
                &request("b", "check_precedents", json!({ "query_tags_str": "unrelated xyz" })),
                &mut ledger,
                &context(),
            )
            .await;
        assert_eq!(
            miss.payload(),
            Some(json!({ "found": false, "message": "No relevant precedents found." }))
        );
        assert_eq!(
            audit.event_types(),
            vec!["precedent.matched", "tool.dispatched", "tool.dispatched"]
        );
        let matched = &audit.events()[0];
        assert_eq!(matched.category, AuditCategory::Precedent);
        assert_eq!(matched.metadata.get("precedent_id").map(String::as_str), Some("PREC-VIP-001"));
        assert_eq!(matched.metadata.get("match_score").map(String::as_str), Some("2"));
    }

    #[tokio::test]
    async fn service_failures_carry_their_reason_code_into_the_audit_trail() {
        let (dispatcher, audit) = dispatcher();
        let result = dispatcher
            .dispatch(
                &request("a", "get_policy_info", json!({ "policy_type": "warranty" })),
                &mut RefundLedger::default(),
                &context(),
            )
            .await;

        assert_eq!(
            result.payload(),
            Some(json!({
                "error": "Unknown policy type 'warranty'. Expected one of: returns, shipping, privacy."
            }))
        );
        let events = audit.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].outcome, AuditOutcome::Failed);
        assert_eq!(
            events[0].metadata.get("reason_code").map(String::as_str),
            Some("policy_topic_unknown")
        );
    }

    #[tokio::test]
    async fn precedent_index_failure_is_a_tool_error() {
        let (dispatcher, audit) = dispatcher_with(Arc::new(OfflineIndex), GuardrailPolicy::default());
        let result = dispatcher
            .dispatch(
                &request("a", "check_precedents", json!({ "query_tags_str": "vip" })),
                &mut RefundLedger::default(),
                &context(),
            )
            .await;
        assert_eq!(
            result.payload(),
            Some(json!({ "error": "precedent index unavailable: connection refused" }))
        );
        assert_eq!(
            audit.events()[0].metadata.get("reason_code").map(String::as_str),
            Some("precedent_index_unavailable")
        );
    }

    #[tokio::test]
    async fn enforced_guardrail_blocks_out_of_order_refund() {
        let (dispatcher, audit) = dispatcher_with(
            Arc::new(InMemoryPrecedentIndex::canonical()),
            GuardrailPolicy::new(true),
        );
        let mut ledger = RefundLedger::default();
        let refund = request("r", "execute_order_return", json!({ "order_id": "ORD-123", "reason": "changed mind" }));

        let blocked = dispatcher.dispatch(&refund, &mut ledger, &context()).await.payload().expect("json");
        assert_eq!(blocked["reason_code"], "refund_prerequisites_missing");
        assert!(audit.event_types().contains(&"tool.rejected".to_string()));

        dispatcher
            .dispatch(&request("l", "look_up_order", json!({ "order_id": "ORD-123" })), &mut ledger, &context())
            .await;
        dispatcher
            .dispatch(&request("p", "get_policy_info", json!({ "policy_type": "returns" })), &mut ledger, &context())
            .await;

        let processed = dispatcher.dispatch(&refund, &mut ledger, &context()).await.payload().expect("json");
        assert_eq!(processed["status"], "success");
        assert!(processed["transaction_id"].as_str().is_some_and(|id| id.starts_with("txn_")));
        assert_eq!(audit.event_types().last().map(String::as_str), Some("tool.dispatched"));
        assert!(audit.event_types().contains(&"refund.executed".to_string()));
    }

    #[tokio::test]
    async fn escalation_is_audited() {
        let (dispatcher, audit) = dispatcher();
        let result = dispatcher
            .dispatch(
                &request(
                    "e",
                    "escalate_to_human",
                    json!({ "order_id": "ORD-999", "reason": "customer is angry" }),
                ),
                &mut RefundLedger::default(),
                &context(),
            )
            .await
            .payload()
            .expect("json");

        assert_eq!(result["status"], "escalated");
        let events = audit.events();
        assert_eq!(events[0].event_type, "escalation.created");
        assert_eq!(events[0].order_id.as_ref().map(|id| id.as_str()), Some("ORD-999"));
        assert_eq!(events[1].event_type, "tool.dispatched");
    }
}
