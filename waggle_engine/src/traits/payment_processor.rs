use std::fmt::Display;

use thiserror::Error;
use wgl_common::Cents;

/// The narrow settlement surface of the third-party payment processor.
///
/// Every call takes a `tag` (always the engagement id) which the implementation must use both as the processor
/// idempotency key and as the transfer-group correlation tag, so that a retried capture or refund after a crash
/// neither double-charges nor double-refunds.
#[allow(async_fn_in_trait)]
pub trait PaymentProcessor: Clone {
    /// Authorizes and captures `amount` from the customer's default payment method, with an immediate split that
    /// routes `amount − fee` to the payee's connected payout account, keeping `fee` for the platform. The transfer
    /// leg is tagged with `tag` as its transfer group.
    async fn capture_with_split(
        &self,
        customer_ref: &str,
        amount: Cents,
        payee_account_ref: &str,
        fee: Cents,
        tag: &str,
    ) -> Result<CaptureOutcome, ProcessorError>;

    /// Looks up the payout transfer previously created under the given transfer-group tag.
    async fn find_transfer_by_group(&self, tag: &str) -> Result<Option<String>, ProcessorError>;

    /// Reverses `amount` of the given transfer, pulling it back from the payee's connected account.
    async fn reverse_transfer(&self, transfer_ref: &str, amount: Cents, tag: &str) -> Result<(), ProcessorError>;

    /// Refunds `amount` of the given charge to the customer.
    async fn refund_charge(&self, charge_ref: &str, amount: Cents, tag: &str) -> Result<(), ProcessorError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStatus {
    Succeeded,
    /// The processor accepted the capture but settlement is still in flight. Treated as success; the funds are
    /// committed.
    Processing,
    Declined,
}

impl CaptureStatus {
    pub fn is_committed(&self) -> bool {
        matches!(self, CaptureStatus::Succeeded | CaptureStatus::Processing)
    }
}

impl Display for CaptureStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureStatus::Succeeded => write!(f, "succeeded"),
            CaptureStatus::Processing => write!(f, "processing"),
            CaptureStatus::Declined => write!(f, "declined"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CaptureOutcome {
    pub status: CaptureStatus,
    pub charge_ref: String,
}

#[derive(Debug, Clone, Error)]
pub enum ProcessorError {
    #[error("Payment processor rejected the request: {0}")]
    Rejected(String),
    #[error("Payment processor is unreachable: {0}")]
    Unavailable(String),
    #[error("Payment processor response could not be interpreted: {0}")]
    InvalidResponse(String),
}
