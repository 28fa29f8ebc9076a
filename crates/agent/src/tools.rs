//! Tool registry and typed tool calls.
//!
//! The registry is the single declaration of what the reasoning engine may
//! call. It is validated when built, so a name the engine invents resolves to
//! `None` instead of falling through a string match.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToolName {
    LookUpOrder,
    GetPolicyInfo,
    ExecuteOrderReturn,
    EscalateToHuman,
    CheckPrecedents,
}

impl ToolName {
    pub const ALL: [ToolName; 5] = [
        Self::LookUpOrder,
        Self::GetPolicyInfo,
        Self::ExecuteOrderReturn,
        Self::EscalateToHuman,
        Self::CheckPrecedents,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LookUpOrder => "look_up_order",
            Self::GetPolicyInfo => "get_policy_info",
            Self::ExecuteOrderReturn => "execute_order_return",
            Self::EscalateToHuman => "escalate_to_human",
            Self::CheckPrecedents => "check_precedents",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the reasoning engine is shown for one tool.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tool `{0}` is declared twice")]
    Duplicate(&'static str),
    #[error("tool `{0}` has no declaration")]
    Undeclared(&'static str),
    #[error("tool `{tool}` has an invalid input schema: {detail}")]
    InvalidSchema { tool: &'static str, detail: String },
}

#[derive(Clone, Debug)]
pub struct ToolRegistry {
    specs: BTreeMap<ToolName, ToolSpec>,
}

impl ToolRegistry {
    /// The five support tools.
    pub fn standard() -> Result<Self, RegistryError> {
        Self::from_specs(ToolName::ALL.iter().map(|name| (*name, standard_spec(*name))))
    }

    /// Builds a registry, checking every known tool is declared exactly once
    /// with an object schema whose required fields are all declared properties.
    pub fn from_specs(
        specs: impl IntoIterator<Item = (ToolName, ToolSpec)>,
    ) -> Result<Self, RegistryError> {
        let mut declared = BTreeMap::new();
        for (name, spec) in specs {
            validate_spec(name, &spec)?;
            if declared.insert(name, spec).is_some() {
                return Err(RegistryError::Duplicate(name.as_str()));
            }
        }

        if let Some(missing) = ToolName::ALL.iter().find(|name| !declared.contains_key(*name)) {
            return Err(RegistryError::Undeclared(missing.as_str()));
        }

        Ok(Self { specs: declared })
    }

    pub fn resolve(&self, name: &str) -> Option<ToolName> {
        self.specs.keys().copied().find(|tool| tool.as_str() == name)
    }

    /// Declarations in a stable order, as sent to the reasoning engine.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.specs.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

fn validate_spec(name: ToolName, spec: &ToolSpec) -> Result<(), RegistryError> {
    let invalid = |detail: &str| RegistryError::InvalidSchema {
        tool: name.as_str(),
        detail: detail.to_string(),
    };

    if spec.name != name.as_str() {
        return Err(invalid("declared name does not match the tool"));
    }
    if spec.input_schema.get("type").and_then(Value::as_str) != Some("object") {
        return Err(invalid("schema type must be `object`"));
    }
    let properties = spec
        .input_schema
        .get("properties")
        .and_then(Value::as_object)
        .ok_or_else(|| invalid("schema has no properties"))?;
    let required = spec.input_schema.get("required").and_then(Value::as_array);
    for field in required.into_iter().flatten() {
        let field = field.as_str().ok_or_else(|| invalid("required entries must be strings"))?;
        if !properties.contains_key(field) {
            return Err(invalid(&format!("required field `{field}` is not a property")));
        }
    }
    Ok(())
}

fn standard_spec(name: ToolName) -> ToolSpec {
    let (description, input_schema) = match name {
        ToolName::LookUpOrder => (
            "Fetch the order record from the order management system. Always the first step for any order question.",
            json!({
                "type": "object",
                "properties": { "order_id": { "type": "string" } },
                "required": ["order_id"]
            }),
        ),
        ToolName::GetPolicyInfo => (
            "Read the official policy text for one topic. Required before any refund is processed.",
            json!({
                "type": "object",
                "properties": {
                    "policy_type": {
                        "type": "string",
                        "enum": ["returns", "shipping", "privacy"],
                        "description": "Which policy document to read."
                    }
                },
                "required": ["policy_type"]
            }),
        ),
        ToolName::ExecuteOrderReturn => (
            "Process a refund. Only allowed when eligible_for_return is true and the policy text permits the return.",
            json!({
                "type": "object",
                "properties": {
                    "order_id": { "type": "string" },
                    "reason": { "type": "string" }
                },
                "required": ["order_id", "reason"]
            }),
        ),
        ToolName::EscalateToHuman => (
            "Hand the case to a human agent. Use when the customer is upset or the request falls outside policy.",
            json!({
                "type": "object",
                "properties": {
                    "order_id": { "type": "string", "description": "Order the escalation concerns, if known." },
                    "reason": { "type": "string" },
                    "policy_check_confirmation": {
                        "type": "string",
                        "enum": ["verified_compliant"],
                        "description": "Confirms the policy was read and the item is not on the exclusion list."
                    }
                },
                "required": ["order_id", "reason", "policy_check_confirmation"]
            }),
        ),
        ToolName::CheckPrecedents => (
            "Search past human decisions for a matching exception. Use when the customer asks for an exception such as VIP treatment.",
            json!({
                "type": "object",
                "properties": {
                    "query_tags_str": {
                        "type": "string",
                        "description": "Space-separated keywords describing the situation, e.g. 'socks vip return'."
                    }
                },
                "required": ["query_tags_str"]
            }),
        ),
    };

    ToolSpec { name: name.as_str(), description, input_schema }
}

/// A resolved tool invocation with its arguments extracted.
///
/// Arguments are lenient: anything missing or not a string becomes `None` and
/// the service decides what an absent value means.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolCall {
    LookUpOrder { order_id: Option<String> },
    GetPolicyInfo { policy_type: Option<String> },
    ExecuteOrderReturn { order_id: Option<String>, reason: Option<String> },
    EscalateToHuman { order_id: Option<String>, reason: Option<String> },
    CheckPrecedents { query_tags: Option<String> },
}

impl ToolCall {
    pub fn parse(name: ToolName, input: &Value) -> Self {
        let arg = |key: &str| input.get(key).and_then(Value::as_str).map(str::to_string);
        match name {
            ToolName::LookUpOrder => Self::LookUpOrder { order_id: arg("order_id") },
            ToolName::GetPolicyInfo => Self::GetPolicyInfo { policy_type: arg("policy_type") },
            ToolName::ExecuteOrderReturn => {
                Self::ExecuteOrderReturn { order_id: arg("order_id"), reason: arg("reason") }
            }
            ToolName::EscalateToHuman => {
                Self::EscalateToHuman { order_id: arg("order_id"), reason: arg("reason") }
            }
            ToolName::CheckPrecedents => Self::CheckPrecedents { query_tags: arg("query_tags_str") },
        }
    }

    pub fn name(&self) -> ToolName {
        match self {
            Self::LookUpOrder { .. } => ToolName::LookUpOrder,
            Self::GetPolicyInfo { .. } => ToolName::GetPolicyInfo,
            Self::ExecuteOrderReturn { .. } => ToolName::ExecuteOrderReturn,
            Self::EscalateToHuman { .. } => ToolName::EscalateToHuman,
            Self::CheckPrecedents { .. } => ToolName::CheckPrecedents,
        }
    }

    pub fn order_id(&self) -> Option<&str> {
        match self {
            Self::LookUpOrder { order_id }
            | Self::ExecuteOrderReturn { order_id, .. }
            | Self::EscalateToHuman { order_id, .. } => order_id.as_deref(),
            Self::GetPolicyInfo { .. } | Self::CheckPrecedents { .. } => None,
        }
    }
}
