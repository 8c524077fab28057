//! A minimal Stripe REST client covering exactly the settlement surface Waggle needs: destination-charge capture
//! with an application fee, transfer lookup by transfer group, transfer reversal, and partial refunds. Everything
//! else Stripe offers is deliberately out of reach.
mod api;
mod config;
mod data_objects;
mod error;

pub use api::StripeApi;
pub use config::StripeConfig;
pub use data_objects::{IntentStatus, List, PaymentIntent, Refund, Transfer, TransferReversal};
pub use error::StripeApiError;
