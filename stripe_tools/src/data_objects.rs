use serde::{Deserialize, Serialize};

/// The payment-intent statuses Stripe reports. Anything other than `succeeded` or `processing` means the money is
/// not committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    Succeeded,
    Processing,
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    RequiresCapture,
    Canceled,
}

impl IntentStatus {
    pub fn is_committed(&self) -> bool {
        matches!(self, IntentStatus::Succeeded | IntentStatus::Processing)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub status: IntentStatus,
    pub amount: i64,
    pub latest_charge: Option<String>,
    pub transfer_group: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transfer {
    pub id: String,
    pub amount: i64,
    pub destination: Option<String>,
    pub transfer_group: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferReversal {
    pub id: String,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    pub id: String,
    pub amount: i64,
    pub status: Option<String>,
}

/// Stripe's standard list envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct List<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}
