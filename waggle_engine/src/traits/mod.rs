//! Interface contracts for the engine's external collaborators.
//!
//! The lifecycle engine never talks to a concrete database, payment processor or push service; it is generic over
//! the traits defined here.
//!
//! * [`MarketplaceDatabase`] defines the storage behaviour a backend must expose: quote persistence with an atomic
//!   promotion claim, engagement persistence with guarded status transitions, and the participant back-reference
//!   compare-and-set that enforces the one-active-engagement invariant.
//! * [`PaymentProcessor`] defines the narrow settlement surface: capture-with-split, transfer lookup by group tag,
//!   transfer reversal and partial refund. Every call carries an idempotency tag so retries are safe.
//! * [`PushGateway`] defines fire-and-forget device notification.
mod data_objects;
mod marketplace_database;
mod payment_processor;
mod push_gateway;

pub use data_objects::{SettlementUpdate, SideEffect};
pub use marketplace_database::{MarketplaceDatabase, StoreError};
pub use payment_processor::{CaptureOutcome, CaptureStatus, PaymentProcessor, ProcessorError};
pub use push_gateway::PushGateway;
