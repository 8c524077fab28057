mod money;

pub mod op;
mod secret;

pub use money::{Cents, CentsConversionError, FEE_RATE_PERCENT};
pub use secret::Secret;
