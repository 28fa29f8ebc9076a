use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReasoningRound {
    Initial,
    Final,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnState {
    AwaitUser,
    Reasoning { round: ReasoningRound },
    Dispatching,
    TerminalResponse,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnEvent {
    UserInputReceived,
    ToolRequestsReceived,
    FinalTextReceived,
    ToolResultsSubmitted,
    ResponseDelivered,
    EngineFailed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnAction {
    InvokeReasoningEngine,
    DispatchToolRequests,
    DeliverFinalText,
    AbandonTurn,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: TurnState,
    pub to: TurnState,
    pub event: TurnEvent,
    pub actions: Vec<TurnAction>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: TurnState, event: TurnEvent },
}

/// Lifecycle of one user turn.
///
/// Tool requests are only accepted in the initial reasoning round. After one
/// dispatch the engine is consulted a single time more and its answer is final.
#[derive(Clone, Copy, Debug, Default)]
pub struct TurnFlow;

impl TurnFlow {
    pub fn initial_state(&self) -> TurnState {
        TurnState::AwaitUser
    }

    pub fn apply(
        &self,
        current: &TurnState,
        event: &TurnEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        use ReasoningRound::{Final, Initial};
        use TurnAction::{
            AbandonTurn, DeliverFinalText, DispatchToolRequests, InvokeReasoningEngine,
        };
        use TurnEvent::{
            EngineFailed, FinalTextReceived, ResponseDelivered, ToolRequestsReceived,
            ToolResultsSubmitted, UserInputReceived,
        };
        use TurnState::{AwaitUser, Dispatching, Reasoning, TerminalResponse};

        let (to, actions) = match (current, event) {
            (AwaitUser, UserInputReceived) => {
                (Reasoning { round: Initial }, vec![InvokeReasoningEngine])
            }
            (Reasoning { round: Initial }, ToolRequestsReceived) => {
                (Dispatching, vec![DispatchToolRequests])
            }
            (Reasoning { .. }, FinalTextReceived) => (TerminalResponse, vec![DeliverFinalText]),
            (Dispatching, ToolResultsSubmitted) => {
                (Reasoning { round: Final }, vec![InvokeReasoningEngine])
            }
            (TerminalResponse, ResponseDelivered) => (AwaitUser, Vec::new()),
            (Reasoning { .. }, EngineFailed) | (Dispatching, EngineFailed) => {
                (AwaitUser, vec![AbandonTurn])
            }
            _ => {
                return Err(FlowTransitionError::InvalidTransition {
                    state: current.clone(),
                    event: event.clone(),
                });
            }
        };

        Ok(TransitionOutcome { from: current.clone(), to, event: event.clone(), actions })
    }
}
