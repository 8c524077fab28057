use std::env;

use log::*;
use wgl_common::Secret;

const DEFAULT_WGL_HOST: &str = "127.0.0.1";
const DEFAULT_WGL_PORT: u16 = 8480;
const DEFAULT_EVENT_BUFFER: usize = 64;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Stripe platform credentials.
    pub stripe_secret_key: Secret<String>,
    /// Override for the Stripe API host; used by tests and mock servers.
    pub stripe_api_base: Option<String>,
    /// Webhook that relays walk-request pushes to devices. When unset, pushes are logged and treated as
    /// delivered, which keeps local development working without a push provider.
    pub push_relay_url: Option<String>,
    /// Bound of the lifecycle event channel between the engine and each subscriber hub.
    pub event_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_WGL_HOST.to_string(),
            port: DEFAULT_WGL_PORT,
            database_url: String::default(),
            stripe_secret_key: Secret::default(),
            stripe_api_base: None,
            push_relay_url: None,
            event_buffer_size: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("WGL_HOST").ok().unwrap_or_else(|| DEFAULT_WGL_HOST.into());
        let port = env::var("WGL_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for WGL_PORT. {e} Using the default, {DEFAULT_WGL_PORT}, \
                         instead."
                    );
                    DEFAULT_WGL_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_WGL_PORT);
        let database_url = env::var("WGL_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ WGL_DATABASE_URL is not set. Using an in-memory database; data will not survive a restart.");
            "sqlite::memory:".into()
        });
        let stripe_secret_key = env::var("WGL_STRIPE_SECRET_KEY")
            .map(Secret::new)
            .unwrap_or_else(|_| {
                warn!("🪛️ WGL_STRIPE_SECRET_KEY is not set. Settlement calls will be rejected by Stripe.");
                Secret::default()
            });
        let stripe_api_base = env::var("WGL_STRIPE_API_BASE").ok();
        let push_relay_url = env::var("WGL_PUSH_RELAY_URL").ok();
        let event_buffer_size = env::var("WGL_EVENT_BUFFER_SIZE")
            .ok()
            .and_then(|s| {
                s.parse::<usize>()
                    .map_err(|e| {
                        error!("🪛️ {s} is not a valid WGL_EVENT_BUFFER_SIZE. {e} Using the default instead.");
                        e
                    })
                    .ok()
            })
            .unwrap_or(DEFAULT_EVENT_BUFFER);
        Self {
            host,
            port,
            database_url,
            stripe_secret_key,
            stripe_api_base,
            push_relay_url,
            event_buffer_size,
        }
    }
}
