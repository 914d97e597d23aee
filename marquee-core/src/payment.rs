use serde::{Deserialize, Serialize};

/// Outcome signal delivered by the payment collaborator. The gateway
/// protocol itself lives outside the core; only this result crosses in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResult {
    pub success: bool,
    pub transaction_id: Option<String>,
    pub amount: i32,
}

impl PaymentResult {
    pub fn succeeded(transaction_id: impl Into<String>, amount: i32) -> Self {
        Self {
            success: true,
            transaction_id: Some(transaction_id.into()),
            amount,
        }
    }

    pub fn declined(amount: i32) -> Self {
        Self {
            success: false,
            transaction_id: None,
            amount,
        }
    }
}
