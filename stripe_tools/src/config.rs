use wgl_common::Secret;

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

#[derive(Clone, Debug, Default)]
pub struct StripeConfig {
    /// The platform's secret key (`sk_live_…` / `sk_test_…`).
    pub secret_key: Secret<String>,
    /// Override for tests and mock servers.
    pub api_base: String,
}

impl StripeConfig {
    pub fn new<S: Into<String>>(secret_key: S) -> Self {
        Self { secret_key: Secret::new(secret_key.into()), api_base: DEFAULT_API_BASE.to_string() }
    }

    pub fn with_api_base<S: Into<String>>(mut self, api_base: S) -> Self {
        self.api_base = api_base.into();
        self
    }
}
