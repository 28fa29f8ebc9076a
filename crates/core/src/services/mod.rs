//! Decision services: the effectful backends a support turn may call.

pub mod enterprise;
pub mod policy_library;

use async_trait::async_trait;

use crate::domain::order::{EscalationTicket, OrderRecord, RefundReceipt};
use crate::domain::policy::PolicyDocument;
use crate::errors::ServiceError;

pub use enterprise::MockEnterpriseServices;
pub use policy_library::{FsPolicyLibrary, InMemoryPolicyLibrary, PolicyLibrary};

/// Arguments arrive straight from the reasoning engine, so every one of them
/// may be absent. Implementations decide whether an absent value is fatal.
#[async_trait]
pub trait DecisionServices: Send + Sync {
    async fn look_up_order(&self, order_id: Option<&str>) -> Result<OrderRecord, ServiceError>;

    async fn get_policy_info(
        &self,
        policy_type: Option<&str>,
    ) -> Result<PolicyDocument, ServiceError>;

    async fn execute_refund(
        &self,
        order_id: Option<&str>,
        reason: Option<&str>,
    ) -> Result<RefundReceipt, ServiceError>;

    async fn escalate_to_human(
        &self,
        order_id: Option<&str>,
        reason: Option<&str>,
    ) -> Result<EscalationTicket, ServiceError>;
}
