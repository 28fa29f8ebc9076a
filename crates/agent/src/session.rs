//! Per-conversation state owned by the chat transport.

use std::collections::BTreeSet;

use resolute_core::domain::order::OrderId;
use resolute_core::domain::policy::PolicyTopic;
use uuid::Uuid;

use crate::conversation::Conversation;
use crate::turn_flow::{FlowTransitionError, TransitionOutcome, TurnEvent, TurnFlow, TurnState};

/// One customer conversation. Sessions share nothing with each other.
#[derive(Clone, Debug)]
pub struct Session {
    id: Uuid,
    pub conversation: Conversation,
    pub ledger: RefundLedger,
    state: TurnState,
}

impl Session {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    pub fn with_id(id: Uuid) -> Self {
        Self {
            id,
            conversation: Conversation::new(),
            ledger: RefundLedger::default(),
            state: TurnState::AwaitUser,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &TurnState {
        &self.state
    }

    /// Applies `event`; the state is left untouched when the transition is rejected.
    pub fn advance(
        &mut self,
        flow: &TurnFlow,
        event: TurnEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        let outcome = flow.apply(&self.state, &event)?;
        self.state = outcome.to.clone();
        Ok(outcome)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Which refund prerequisites this session has satisfied.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RefundLedger {
    looked_up: BTreeSet<OrderId>,
    policy_checked: BTreeSet<OrderId>,
}

impl RefundLedger {
    /// A fresh lookup invalidates any earlier policy read for that order.
    pub fn record_order_lookup(&mut self, order_id: OrderId) {
        self.policy_checked.remove(&order_id);
        self.looked_up.insert(order_id);
    }

    /// Reading the returns policy covers every order looked up so far.
    pub fn record_policy_read(&mut self, topic: PolicyTopic) {
        if topic == PolicyTopic::Returns {
            self.policy_checked.extend(self.looked_up.iter().cloned());
        }
    }

    pub fn missing_prerequisites(&self, order_id: &OrderId) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.looked_up.contains(order_id) {
            missing.push("order_lookup");
        }
        if !self.policy_checked.contains(order_id) {
            missing.push("returns_policy");
        }
        missing
    }

    pub fn ready_for_refund(&self, order_id: &OrderId) -> bool {
        self.missing_prerequisites(order_id).is_empty()
    }
}
