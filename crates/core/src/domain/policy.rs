use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyTopic {
    Returns,
    Shipping,
    Privacy,
}

impl PolicyTopic {
    pub const ALL: [PolicyTopic; 3] = [Self::Returns, Self::Shipping, Self::Privacy];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Returns => "returns",
            Self::Shipping => "shipping",
            Self::Privacy => "privacy",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "returns" => Some(Self::Returns),
            "shipping" => Some(Self::Shipping),
            "privacy" => Some(Self::Privacy),
            _ => None,
        }
    }

    /// File name of the policy document inside the policy directory.
    pub fn file_name(&self) -> String {
        format!("{}.md", self.as_str())
    }
}

impl fmt::Display for PolicyTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDocument {
    pub policy_text: String,
}
