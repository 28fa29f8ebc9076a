use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Processing,
    Shipped,
    Delivered,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerSentiment {
    Neutral,
    Annoyed,
    Disappointed,
    Angry,
}

impl CustomerSentiment {
    /// Sentiments the operating procedure routes to a human.
    pub fn warrants_escalation(&self) -> bool {
        !matches!(self, Self::Neutral)
    }
}

/// Order record as returned by the order management system.
///
/// `return_reason` is only present when the system has already decided the
/// order is not returnable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub status: OrderStatus,
    pub items: Vec<String>,
    pub eligible_for_return: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_reason: Option<String>,
    pub customer_sentiment: CustomerSentiment,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Success,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundReceipt {
    pub status: RefundStatus,
    pub transaction_id: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationStatus {
    Escalated,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationTicket {
    pub status: EscalationStatus,
    pub ticket_id: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::{CustomerSentiment, OrderId, OrderRecord, OrderStatus};

    #[test]
    fn order_id_is_trimmed() {
        assert_eq!(OrderId::new("  ORD-123 ").as_str(), "ORD-123");
    }

    #[test]
    fn record_omits_absent_return_reason() {
        let record = OrderRecord {
            status: OrderStatus::Shipped,
            items: vec!["Wireless Headphones".to_string()],
            eligible_for_return: true,
            return_reason: None,
            customer_sentiment: CustomerSentiment::Neutral,
        };

        let value = serde_json::to_value(&record).expect("serialize");
        assert_eq!(value["status"], "shipped");
        assert_eq!(value["customer_sentiment"], "neutral");
        assert!(value.get("return_reason").is_none());
    }

    #[test]
    fn only_neutral_sentiment_stays_with_agent() {
        assert!(!CustomerSentiment::Neutral.warrants_escalation());
        assert!(CustomerSentiment::Angry.warrants_escalation());
        assert!(CustomerSentiment::Disappointed.warrants_escalation());
    }
}
