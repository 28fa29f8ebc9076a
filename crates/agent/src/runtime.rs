use std::sync::Arc;

use resolute_core::audit::AuditContext;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::dispatcher::ToolDispatcher;
use crate::llm::{LlmClient, LlmError, ReasoningRequest, ReasoningResponse};
use crate::prompt::SUPPORT_SOP;
use crate::session::Session;
use crate::tools::ToolSpec;
use crate::turn_flow::{FlowTransitionError, ReasoningRound, TurnEvent, TurnFlow};

const ACTOR: &str = "support-agent";

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("reasoning engine call failed: {0}")]
    Engine(#[from] LlmError),
    #[error("reasoning engine returned no text in the {round:?} round")]
    MissingText { round: ReasoningRound },
    #[error(transparent)]
    Flow(#[from] FlowTransitionError),
}

/// Drives one user turn through at most two reasoning rounds.
pub struct AgentRuntime {
    llm: Arc<dyn LlmClient>,
    dispatcher: ToolDispatcher,
    tools: Vec<ToolSpec>,
    system_prompt: String,
    flow: TurnFlow,
}

impl AgentRuntime {
    pub fn new(llm: Arc<dyn LlmClient>, dispatcher: ToolDispatcher) -> Self {
        let tools = dispatcher.registry().specs();
        Self { llm, dispatcher, tools, system_prompt: SUPPORT_SOP.to_string(), flow: TurnFlow }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    /// Runs the turn to completion and returns the text shown to the user.
    ///
    /// A failed turn leaves the session ready for the next input; turns already
    /// appended to the conversation stay there.
    pub async fn handle_turn(
        &self,
        session: &mut Session,
        user_input: &str,
    ) -> Result<String, TurnError> {
        let context =
            AuditContext::new(session.id().to_string(), Uuid::new_v4().to_string(), ACTOR);
        session.advance(&self.flow, TurnEvent::UserInputReceived)?;
        info!(
            event_name = "agent.turn.user_input",
            session_id = %context.session_id,
            correlation_id = %context.correlation_id,
            input = user_input,
            "user input received"
        );

        match self.run_turn(session, user_input, &context).await {
            Ok(text) => {
                session.advance(&self.flow, TurnEvent::ResponseDelivered)?;
                Ok(text)
            }
            Err(error) => {
                warn!(
                    event_name = "agent.turn.failed",
                    session_id = %context.session_id,
                    correlation_id = %context.correlation_id,
                    error = %error,
                    "turn abandoned"
                );
                session.advance(&self.flow, TurnEvent::EngineFailed)?;
                Err(error)
            }
        }
    }

    async fn run_turn(
        &self,
        session: &mut Session,
        user_input: &str,
        context: &AuditContext,
    ) -> Result<String, TurnError> {
        session.conversation.push_user_text(user_input);

        let first = self.reason(session, ReasoningRound::Initial, context).await?;

        let requests = first.tool_requests();
        if requests.is_empty() {
            // The raw response is the answer turn; a response without text is
            // never stored.
            let text = final_text(&first, ReasoningRound::Initial)?;
            session.advance(&self.flow, TurnEvent::FinalTextReceived)?;
            session.conversation.push_assistant_blocks(first.content.clone());
            info!(
                event_name = "agent.turn.complete",
                session_id = %context.session_id,
                correlation_id = %context.correlation_id,
                tools_dispatched = 0,
                "sent text response"
            );
            return Ok(text);
        }

        session.advance(&self.flow, TurnEvent::ToolRequestsReceived)?;
        session.conversation.push_assistant_blocks(first.content.clone());
        let mut results = Vec::with_capacity(requests.len());
        for request in &requests {
            results.push(self.dispatcher.dispatch(request, &mut session.ledger, context).await);
        }
        session.conversation.push_tool_results(results);
        session.advance(&self.flow, TurnEvent::ToolResultsSubmitted)?;

        let second = self.reason(session, ReasoningRound::Final, context).await?;
        let ignored = second.tool_requests().len();
        if ignored > 0 {
            warn!(
                event_name = "agent.turn.tool_requests_ignored",
                session_id = %context.session_id,
                correlation_id = %context.correlation_id,
                ignored,
                "final round requested more tools; only its text is used"
            );
        }

        let text = final_text(&second, ReasoningRound::Final)?;
        session.advance(&self.flow, TurnEvent::FinalTextReceived)?;
        session.conversation.push_assistant_text(text.clone());
        info!(
            event_name = "agent.turn.complete",
            session_id = %context.session_id,
            correlation_id = %context.correlation_id,
            tools_dispatched = requests.len(),
            "sent final response after tool use"
        );
        Ok(text)
    }

    #[instrument(
        name = "reasoning_round",
        skip_all,
        fields(
            round = ?round,
            session_id = %context.session_id,
            correlation_id = %context.correlation_id,
        )
    )]
    async fn reason(
        &self,
        session: &Session,
        round: ReasoningRound,
        context: &AuditContext,
    ) -> Result<ReasoningResponse, TurnError> {
        let request = ReasoningRequest {
            system: &self.system_prompt,
            conversation: &session.conversation,
            tools: &self.tools,
        };
        let response = self.llm.complete(&request).await?;
        info!(
            event_name = "agent.reasoning.completed",
            session_id = %context.session_id,
            correlation_id = %context.correlation_id,
            round = ?round,
            blocks = response.content.len(),
            tool_requests = response.tool_requests().len(),
            "reasoning round completed"
        );
        Ok(response)
    }
}

fn final_text(response: &ReasoningResponse, round: ReasoningRound) -> Result<String, TurnError> {
    response.first_text().map(str::to_string).ok_or(TurnError::MissingText { round })
}
