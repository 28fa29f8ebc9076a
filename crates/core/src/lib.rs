//! Domain core for the support resolution agent: orders, policies, precedent
//! cases, the decision services the agent calls, and shared configuration.

pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod precedent;
pub mod services;

pub use audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
pub use domain::order::{OrderId, OrderRecord};
pub use domain::policy::PolicyTopic;
pub use domain::precedent::{PrecedentCase, PrecedentMatch, QueryTagSet, Tag};
pub use errors::ServiceError;
pub use precedent::{InMemoryPrecedentIndex, PrecedentIndex, PrecedentIndexError};
pub use services::DecisionServices;
