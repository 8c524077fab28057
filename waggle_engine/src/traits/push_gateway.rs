use serde_json::Value;

/// Fire-and-forget device notification.
///
/// Delivery failure is reported as a plain `false`, never as an error: the push service is allowed to be flaky and
/// the caller decides what an undelivered message means for the flow.
#[allow(async_fn_in_trait)]
pub trait PushGateway: Clone {
    async fn push_message(&self, device_token: &str, title: &str, body: &str, data: Value) -> bool;
}
