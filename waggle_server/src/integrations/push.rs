use log::*;
use reqwest::Client;
use serde_json::{json, Value};
use waggle_engine::PushGateway;

/// Forwards walk-request pushes to the notification relay as a single fire-and-forget webhook call. Delivery
/// mechanics (APNs/FCM fan-out, token management) are the relay's problem; this side only reports whether the
/// message was handed over.
#[derive(Clone)]
pub struct PushRelay {
    relay_url: Option<String>,
    client: Client,
}

impl PushRelay {
    pub fn new(relay_url: Option<String>) -> Self {
        Self { relay_url, client: Client::new() }
    }
}

impl PushGateway for PushRelay {
    async fn push_message(&self, device_token: &str, title: &str, body: &str, data: Value) -> bool {
        let Some(url) = self.relay_url.as_deref() else {
            // development mode: no relay, log the message and call it delivered
            info!("🔔️ Push (unrelayed) for {device_token}: {title} / {body}");
            return true;
        };
        let payload = json!({ "to": device_token, "title": title, "body": body, "data": data });
        match self.client.post(url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                warn!("🔔️ Push relay returned {} for {device_token}", response.status());
                false
            },
            Err(e) => {
                warn!("🔔️ Push relay unreachable: {e}");
                false
            },
        }
    }
}
