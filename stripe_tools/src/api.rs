use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::de::DeserializeOwned;
use wgl_common::Cents;

use crate::{
    config::StripeConfig,
    data_objects::{List, PaymentIntent, Refund, Transfer, TransferReversal},
    StripeApiError,
};

#[derive(Clone)]
pub struct StripeApi {
    config: StripeConfig,
    client: Arc<Client>,
}

impl StripeApi {
    pub fn new(config: StripeConfig) -> Result<Self, StripeApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        let bearer = format!("Bearer {}", config.secret_key.reveal());
        let mut auth = HeaderValue::from_str(&bearer).map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        auth.set_sensitive(true);
        headers.insert("Authorization", auth);
        let client =
            Client::builder().default_headers(headers).build().map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    /// Sends one form-encoded request to Stripe. `idempotency_key`, when given, makes a network-level retry of
    /// the same logical operation a no-op on Stripe's side.
    pub async fn form_query<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        form: &[(&str, String)],
        idempotency_key: Option<&str>,
    ) -> Result<T, StripeApiError> {
        let url = self.url(path);
        trace!("Sending Stripe query: {method} {url}");
        let mut req = self.client.request(method, url);
        if !params.is_empty() {
            req = req.query(params);
        }
        if !form.is_empty() {
            req = req.form(form);
        }
        if let Some(key) = idempotency_key {
            req = req.header("Idempotency-Key", key);
        }
        let response = req.send().await.map_err(|e| StripeApiError::RequestError(e.to_string()))?;
        if response.status().is_success() {
            trace!("Stripe query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| StripeApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| StripeApiError::RequestError(e.to_string()))?;
            Err(StripeApiError::QueryError { status, message })
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/v1{path}", self.config.api_base)
    }

    /// Creates and confirms a destination-charge payment intent: `amount` is captured from the customer's default
    /// payment method, `fee` stays with the platform, and the remainder transfers to the payee's connected
    /// account under the given transfer group. The group tag doubles as the idempotency key.
    pub async fn create_payment_intent(
        &self,
        customer_ref: &str,
        amount: Cents,
        payee_account_ref: &str,
        fee: Cents,
        transfer_group: &str,
    ) -> Result<PaymentIntent, StripeApiError> {
        debug!("Creating payment intent of {amount} for group {transfer_group}");
        let form = [
            ("amount", amount.value().to_string()),
            ("currency", "usd".to_string()),
            ("customer", customer_ref.to_string()),
            ("confirm", "true".to_string()),
            ("off_session", "true".to_string()),
            ("transfer_data[destination]", payee_account_ref.to_string()),
            ("application_fee_amount", fee.value().to_string()),
            ("transfer_group", transfer_group.to_string()),
        ];
        let intent = self
            .form_query::<PaymentIntent>(Method::POST, "/payment_intents", &[], &form, Some(transfer_group))
            .await?;
        info!("Payment intent {} is {:?}", intent.id, intent.status);
        Ok(intent)
    }

    /// Finds the payout transfer created under a transfer group, if any.
    pub async fn find_transfer_by_group(&self, transfer_group: &str) -> Result<Option<Transfer>, StripeApiError> {
        let params = [("transfer_group", transfer_group), ("limit", "1")];
        let list = self.form_query::<List<Transfer>>(Method::GET, "/transfers", &params, &[], None).await?;
        Ok(list.data.into_iter().next())
    }

    /// Reverses part of a transfer, pulling `amount` back from the connected account.
    pub async fn reverse_transfer(
        &self,
        transfer_ref: &str,
        amount: Cents,
        idempotency_key: &str,
    ) -> Result<TransferReversal, StripeApiError> {
        debug!("Reversing {amount} of transfer {transfer_ref}");
        let path = format!("/transfers/{transfer_ref}/reversals");
        let form = [("amount", amount.value().to_string())];
        let key = format!("{idempotency_key}-reversal");
        let reversal =
            self.form_query::<TransferReversal>(Method::POST, &path, &[], &form, Some(&key)).await?;
        info!("Reversed {amount} of transfer {transfer_ref} ({})", reversal.id);
        Ok(reversal)
    }

    /// Refunds part of a charge back to the customer.
    pub async fn refund_charge(
        &self,
        charge_ref: &str,
        amount: Cents,
        idempotency_key: &str,
    ) -> Result<Refund, StripeApiError> {
        debug!("Refunding {amount} of charge {charge_ref}");
        let form = [("charge", charge_ref.to_string()), ("amount", amount.value().to_string())];
        let key = format!("{idempotency_key}-refund");
        let refund = self.form_query::<Refund>(Method::POST, "/refunds", &[], &form, Some(&key)).await?;
        info!("Refunded {amount} of charge {charge_ref} ({})", refund.id);
        Ok(refund)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn urls_are_rooted_at_v1() {
        let api = StripeApi::new(StripeConfig::new("sk_test_x")).unwrap();
        assert_eq!(api.url("/payment_intents"), "https://api.stripe.com/v1/payment_intents");
    }

    #[test]
    fn intent_statuses_deserialize_from_stripe_casing() {
        let intent: PaymentIntent = serde_json::from_str(
            r#"{"id":"pi_1","status":"requires_payment_method","amount":3897,"latest_charge":null,"transfer_group":"eng-1"}"#,
        )
        .unwrap();
        assert!(!intent.status.is_committed());
        let intent: PaymentIntent = serde_json::from_str(
            r#"{"id":"pi_2","status":"succeeded","amount":3897,"latest_charge":"ch_1","transfer_group":null}"#,
        )
        .unwrap();
        assert!(intent.status.is_committed());
    }
}
