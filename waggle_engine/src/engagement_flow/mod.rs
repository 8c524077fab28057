//! The walk-request lifecycle engine.
//!
//! [`EngagementFlowApi`] owns every transition of the request/engagement state machine:
//!
//! ```text
//! quoted ─dispatch→ pending ─accept→ accepted ─start→ inProgress ─complete→ completed
//!                      │                  │
//!                      ├─deny→ requestDenied        accepted ─cancel→ cancelled
//!                      ├─(push failure)→ invalidRequest
//!                      └─(capture failure at accept)→ paymentFailure
//! ```
//!
//! It is the only writer of engagement records and of the participant back-references that guarantee at most one
//! active engagement per owner and per walker.
mod api;
mod errors;

pub use api::EngagementFlowApi;
pub use errors::EngagementFlowError;
