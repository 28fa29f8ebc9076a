//! Agent Runtime - tool orchestration for the support agent
//!
//! This crate drives a customer conversation against a reasoning engine:
//! - Keeps the append-only transcript for each session
//! - Declares the tools the engine may call and resolves its requests
//! - Dispatches tool requests to the decision services and precedent index
//! - Enforces the optional refund guardrail
//!
//! # Architecture
//!
//! One user turn follows a bounded loop:
//! 1. **Reasoning** (`llm`) - send the transcript, directive and tool declarations
//! 2. **Dispatch** (`dispatcher`) - answer every tool request, in response order
//! 3. **Final reasoning** - resubmit once; the first text block is the answer
//!
//! The turn lifecycle is checked by the `turn_flow` state machine, so a second
//! dispatch round inside one turn is rejected rather than silently performed.
//!
//! # Key Types
//!
//! - `AgentRuntime` - the orchestration loop (see `runtime` module)
//! - `LlmClient` - reasoning-engine seam, with `MessagesApiClient` over HTTP
//! - `ToolDispatcher` - tool request to tool result, never an error
//! - `Session` - caller-owned conversation state
//!
//! # Safety Principle
//!
//! The engine is instructed to look up the order and read the policy before a
//! refund, but nothing guarantees it. `GuardrailPolicy` can enforce that order
//! server-side.

pub mod conversation;
pub mod dispatcher;
pub mod guardrails;
pub mod llm;
pub mod prompt;
pub mod runtime;
pub mod session;
pub mod tools;
pub mod turn_flow;

pub use conversation::{ContentBlock, Conversation, Role, ToolRequest, ToolResult, Turn};
pub use dispatcher::ToolDispatcher;
pub use guardrails::{GuardrailDecision, GuardrailIntent, GuardrailPolicy};
pub use llm::{LlmClient, LlmError, MessagesApiClient, ReasoningRequest, ReasoningResponse};
pub use runtime::{AgentRuntime, TurnError};
pub use session::{RefundLedger, Session};
pub use tools::{RegistryError, ToolCall, ToolName, ToolRegistry, ToolSpec};
pub use turn_flow::{FlowTransitionError, TurnFlow, TurnState};
