use stripe_tools::{IntentStatus, StripeApi, StripeApiError, StripeConfig};
use waggle_engine::{CaptureOutcome, CaptureStatus, PaymentProcessor, ProcessorError};
use wgl_common::Cents;

use crate::config::ServerConfig;

/// The production [`PaymentProcessor`]: Waggle settlement semantics expressed as Stripe destination charges.
#[derive(Clone)]
pub struct StripeProcessor {
    api: StripeApi,
}

impl StripeProcessor {
    pub fn new(config: &ServerConfig) -> Result<Self, StripeApiError> {
        let mut stripe = StripeConfig::new("");
        stripe.secret_key = config.stripe_secret_key.clone();
        if let Some(base) = &config.stripe_api_base {
            stripe = stripe.with_api_base(base.clone());
        }
        Ok(Self { api: StripeApi::new(stripe)? })
    }
}

impl PaymentProcessor for StripeProcessor {
    async fn capture_with_split(
        &self,
        customer_ref: &str,
        amount: Cents,
        payee_account_ref: &str,
        fee: Cents,
        tag: &str,
    ) -> Result<CaptureOutcome, ProcessorError> {
        let intent = self
            .api
            .create_payment_intent(customer_ref, amount, payee_account_ref, fee, tag)
            .await
            .map_err(to_processor_error)?;
        let status = match intent.status {
            IntentStatus::Succeeded => CaptureStatus::Succeeded,
            IntentStatus::Processing => CaptureStatus::Processing,
            _ => CaptureStatus::Declined,
        };
        // the charge is what refunds are issued against later; fall back to the intent id for in-flight captures
        let charge_ref = intent.latest_charge.unwrap_or(intent.id);
        Ok(CaptureOutcome { status, charge_ref })
    }

    async fn find_transfer_by_group(&self, tag: &str) -> Result<Option<String>, ProcessorError> {
        let transfer = self.api.find_transfer_by_group(tag).await.map_err(to_processor_error)?;
        Ok(transfer.map(|t| t.id))
    }

    async fn reverse_transfer(&self, transfer_ref: &str, amount: Cents, tag: &str) -> Result<(), ProcessorError> {
        self.api.reverse_transfer(transfer_ref, amount, tag).await.map_err(to_processor_error)?;
        Ok(())
    }

    async fn refund_charge(&self, charge_ref: &str, amount: Cents, tag: &str) -> Result<(), ProcessorError> {
        self.api.refund_charge(charge_ref, amount, tag).await.map_err(to_processor_error)?;
        Ok(())
    }
}

fn to_processor_error(e: StripeApiError) -> ProcessorError {
    match e {
        StripeApiError::RequestError(m) => ProcessorError::Unavailable(m),
        StripeApiError::JsonError(m) => ProcessorError::InvalidResponse(m),
        StripeApiError::Initialization(m) => ProcessorError::Unavailable(m),
        StripeApiError::QueryError { status, message } if status >= 500 => ProcessorError::Unavailable(message),
        StripeApiError::QueryError { message, .. } => ProcessorError::Rejected(message),
    }
}
