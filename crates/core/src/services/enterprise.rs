use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use tracing::{info, warn};

use crate::domain::order::{
    CustomerSentiment, EscalationStatus, EscalationTicket, OrderId, OrderRecord, OrderStatus,
    RefundReceipt, RefundStatus,
};
use crate::domain::policy::{PolicyDocument, PolicyTopic};
use crate::errors::ServiceError;
use crate::services::policy_library::PolicyLibrary;
use crate::services::DecisionServices;

/// Stand-in for the order management, payments and ticketing systems.
pub struct MockEnterpriseServices {
    orders: BTreeMap<OrderId, OrderRecord>,
    policies: Arc<dyn PolicyLibrary>,
}

impl MockEnterpriseServices {
    pub fn new(policies: Arc<dyn PolicyLibrary>) -> Self {
        Self { orders: demo_orders(), policies }
    }
}

#[async_trait]
impl DecisionServices for MockEnterpriseServices {
    async fn look_up_order(&self, order_id: Option<&str>) -> Result<OrderRecord, ServiceError> {
        let order_id = order_id.map(OrderId::new);
        info!(
            event_name = "service.oms.lookup_requested",
            order_id = order_id.as_ref().map_or("unknown", OrderId::as_str),
            "querying order management system"
        );

        match order_id.as_ref().and_then(|id| self.orders.get(id)) {
            Some(record) => {
                info!(
                    event_name = "service.oms.lookup_succeeded",
                    order_id = order_id.as_ref().map_or("unknown", OrderId::as_str),
                    status = record.status.as_str(),
                    "order found"
                );
                Ok(record.clone())
            }
            None => {
                warn!(
                    event_name = "service.oms.lookup_failed",
                    order_id = order_id.as_ref().map_or("unknown", OrderId::as_str),
                    "order lookup failed"
                );
                Err(ServiceError::OrderNotFound { order_id: order_id.map(|id| id.0) })
            }
        }
    }

    async fn get_policy_info(
        &self,
        policy_type: Option<&str>,
    ) -> Result<PolicyDocument, ServiceError> {
        let requested = policy_type.ok_or(ServiceError::MissingPolicyTopic)?;
        let topic = PolicyTopic::parse(requested)
            .ok_or_else(|| ServiceError::UnknownPolicyTopic { requested: requested.to_string() })?;

        info!(event_name = "service.policy.fetch_requested", topic = topic.as_str(), "reading policy");
        let policy_text = self.policies.fetch(topic).await.map_err(|error| {
            warn!(
                event_name = "service.policy.fetch_failed",
                topic = topic.as_str(),
                error = %error,
                "policy document unavailable"
            );
            error
        })?;

        Ok(PolicyDocument { policy_text })
    }

    async fn execute_refund(
        &self,
        order_id: Option<&str>,
        reason: Option<&str>,
    ) -> Result<RefundReceipt, ServiceError> {
        info!(
            event_name = "service.payments.refund_requested",
            order_id = order_id.unwrap_or("unknown"),
            reason = reason.unwrap_or("unknown"),
            "initiating refund"
        );

        let transaction_id = format!("txn_{}", rand::thread_rng().gen_range(10_000..=99_999));
        Ok(RefundReceipt {
            status: RefundStatus::Success,
            transaction_id,
            message: "Refund processed to original payment method.".to_string(),
        })
    }

    async fn escalate_to_human(
        &self,
        order_id: Option<&str>,
        reason: Option<&str>,
    ) -> Result<EscalationTicket, ServiceError> {
        warn!(
            event_name = "service.ticketing.escalation_triggered",
            order_id = order_id.unwrap_or("unknown"),
            reason = reason.unwrap_or("unknown"),
            "escalation triggered"
        );

        let ticket_id = format!("TKT-{}", rand::thread_rng().gen_range(100..=999));
        Ok(EscalationTicket {
            status: EscalationStatus::Escalated,
            ticket_id,
            message: "Agent requested human intervention.".to_string(),
        })
    }
}

fn demo_orders() -> BTreeMap<OrderId, OrderRecord> {
    BTreeMap::from([
        (
            OrderId::new("ORD-123"),
            OrderRecord {
                status: OrderStatus::Shipped,
                items: vec!["Wireless Headphones".to_string()],
                eligible_for_return: true,
                return_reason: None,
                customer_sentiment: CustomerSentiment::Neutral,
            },
        ),
        (
            OrderId::new("ORD-456"),
            OrderRecord {
                status: OrderStatus::Delivered,
                items: vec!["Gaming Mouse".to_string()],
                eligible_for_return: false,
                return_reason: Some("window_expired".to_string()),
                customer_sentiment: CustomerSentiment::Neutral,
            },
        ),
        (
            OrderId::new("ORD-999"),
            OrderRecord {
                status: OrderStatus::Processing,
                items: vec!["4K Monitor".to_string()],
                eligible_for_return: true,
                return_reason: None,
                customer_sentiment: CustomerSentiment::Angry,
            },
        ),
    ])
}
