//! Waggle Lifecycle Engine
//!
//! Waggle is a two-sided marketplace connecting dog owners with dog walkers. This library contains the core logic
//! for the walk-request lifecycle: pricing a walk, dispatching a request to a walker, and carrying the resulting
//! engagement through acceptance (with payment capture and split), denial, cancellation (with refund), start and
//! completion.
//!
//! The library is divided into three main sections:
//! 1. Backend traits ([`mod@traits`]). The engine is generic over its collaborators: the marketplace database, the
//!    payment processor and the push gateway. SQLite is the supported database backend; you should never need to
//!    access it directly. The data types it stores are defined in the `db_types` module and are public.
//! 2. The lifecycle API ([`mod@engagement_flow`]). [`EngagementFlowApi`] is the only component that mutates
//!    engagements or the participant back-references that enforce the one-active-engagement-per-participant
//!    invariant.
//! 3. Events ([`mod@events`]). Every lifecycle transition is published to a room keyed by the engagement id so that
//!    the two connected participants can follow the walk in real time. Delivery is best-effort; the engine never
//!    blocks on a listener.
mod db;

pub mod db_types;
pub mod engagement_flow;
pub mod events;
pub mod pricing;
pub mod settlement;
pub mod traits;

#[cfg(feature = "sqlite")]
pub use db::sqlite::SqliteDatabase;
pub use engagement_flow::{EngagementFlowApi, EngagementFlowError};
pub use settlement::{SettlementApi, SettlementError};
pub use traits::{
    CaptureOutcome,
    CaptureStatus,
    MarketplaceDatabase,
    PaymentProcessor,
    ProcessorError,
    PushGateway,
    StoreError,
};
