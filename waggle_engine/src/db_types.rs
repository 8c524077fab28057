use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;
use uuid::Uuid;
use wgl_common::Cents;

//--------------------------------------      QuoteId       ----------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct QuoteId(pub String);

impl QuoteId {
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for QuoteId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for QuoteId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for QuoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------    EngagementId    ----------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct EngagementId(pub String);

impl EngagementId {
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for EngagementId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for EngagementId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for EngagementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------   ParticipantId    ----------------------------------------------------------
/// A lightweight wrapper around a string identifying an owner or walker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl<S: Into<String>> From<S> for ParticipantId {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------        Role        ----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Walker,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Owner => write!(f, "owner"),
            Role::Walker => write!(f, "walker"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid role: {0}")]
pub struct InvalidRole(String);

impl FromStr for Role {
    type Err = InvalidRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Self::Owner),
            "walker" => Ok(Self::Walker),
            s => Err(InvalidRole(s.to_string())),
        }
    }
}

//--------------------------------------      WalkTier      ----------------------------------------------------------
/// The bookable walk durations. Walks come in exactly three lengths; anything else is a caller error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[repr(i32)]
#[serde(try_from = "i64", into = "i64")]
pub enum WalkTier {
    Quarter = 15,
    Half = 30,
    Hour = 60,
}

impl WalkTier {
    pub fn minutes(&self) -> i64 {
        *self as i64
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid walk duration: {0} minutes")]
pub struct InvalidDuration(pub i64);

impl TryFrom<i64> for WalkTier {
    type Error = InvalidDuration;

    fn try_from(minutes: i64) -> Result<Self, Self::Error> {
        match minutes {
            15 => Ok(Self::Quarter),
            30 => Ok(Self::Half),
            60 => Ok(Self::Hour),
            m => Err(InvalidDuration(m)),
        }
    }
}

impl From<WalkTier> for i64 {
    fn from(tier: WalkTier) -> Self {
        tier.minutes()
    }
}

impl Display for WalkTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} min", self.minutes())
    }
}

//--------------------------------------  EngagementStatus  ----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum EngagementStatus {
    /// The request has been dispatched to the walker, who has not yet responded.
    Pending,
    /// The walker accepted and the owner's payment has been captured.
    Accepted,
    /// The walk is underway.
    InProgress,
    /// The walk finished normally.
    Completed,
    /// An accepted engagement was called off and the walker payout refunded.
    Cancelled,
    /// The walker (or the owner, retracting) turned the request down before payment.
    RequestDenied,
    /// The request could not be delivered to the walker.
    InvalidRequest,
    /// Payment capture failed at acceptance time.
    PaymentFailure,
}

impl EngagementStatus {
    /// Terminal states admit no further transitions and free both participants.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EngagementStatus::Completed
                | EngagementStatus::Cancelled
                | EngagementStatus::RequestDenied
                | EngagementStatus::InvalidRequest
                | EngagementStatus::PaymentFailure
        )
    }
}

impl Display for EngagementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngagementStatus::Pending => write!(f, "pending"),
            EngagementStatus::Accepted => write!(f, "accepted"),
            EngagementStatus::InProgress => write!(f, "inProgress"),
            EngagementStatus::Completed => write!(f, "completed"),
            EngagementStatus::Cancelled => write!(f, "cancelled"),
            EngagementStatus::RequestDenied => write!(f, "requestDenied"),
            EngagementStatus::InvalidRequest => write!(f, "invalidRequest"),
            EngagementStatus::PaymentFailure => write!(f, "paymentFailure"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid engagement status: {0}")]
pub struct InvalidStatus(String);

impl FromStr for EngagementStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "inProgress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "requestDenied" => Ok(Self::RequestDenied),
            "invalidRequest" => Ok(Self::InvalidRequest),
            "paymentFailure" => Ok(Self::PaymentFailure),
            s => Err(InvalidStatus(s.to_string())),
        }
    }
}

//--------------------------------------   CostBreakdown    ----------------------------------------------------------
/// The itemized price of a walk. Produced only by the pricing engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub tier: WalkTier,
    pub dog_count: u32,
    /// The flat rate for the duration tier.
    pub base: Cents,
    /// The per-dog surcharge, totalled over the whole pack.
    pub surcharge: Cents,
    pub total: Cents,
}

//--------------------------------------      NewQuote      ----------------------------------------------------------
/// The caller's request for a priced estimate. Not yet binding and not yet validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQuote {
    pub owner_id: ParticipantId,
    pub walker_id: ParticipantId,
    pub dog_count: u32,
    pub duration_minutes: i64,
    pub origin_lat: f64,
    pub origin_lng: f64,
}

//--------------------------------------       Quote        ----------------------------------------------------------
/// A priced estimate. Immutable once created, apart from the `dispatched` claim flag that guarantees at-most-once
/// promotion into an engagement. A quote that is never promoted can be discarded freely; creating it touched no
/// external state.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub owner_id: ParticipantId,
    pub walker_id: ParticipantId,
    pub dog_count: u32,
    pub tier: WalkTier,
    pub base: Cents,
    pub surcharge: Cents,
    pub total: Cents,
    pub origin_lat: f64,
    pub origin_lng: f64,
    pub dispatched: bool,
    pub created_at: DateTime<Utc>,
}

impl Quote {
    pub fn cost(&self) -> CostBreakdown {
        CostBreakdown {
            tier: self.tier,
            dog_count: self.dog_count,
            base: self.base,
            surcharge: self.surcharge,
            total: self.total,
        }
    }
}

//--------------------------------------    EngagementRef   ----------------------------------------------------------
/// The back-reference a participant record holds to its current engagement. Non-empty if and only if the
/// participant has an engagement in a non-terminal state. Set and cleared exclusively by the lifecycle engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementRef {
    pub engagement_id: EngagementId,
    pub status: EngagementStatus,
}

impl EngagementRef {
    pub fn new(engagement_id: EngagementId, status: EngagementStatus) -> Self {
        Self { engagement_id, status }
    }
}

//--------------------------------------     Engagement     ----------------------------------------------------------
/// The binding, stateful record of a walk request, from dispatch through its terminal state. Participant and cost
/// details are denormalized at creation so the record stands on its own for history and display. Engagements are
/// never deleted.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Engagement {
    pub engagement_id: EngagementId,
    pub quote_id: QuoteId,
    pub owner_id: ParticipantId,
    pub owner_name: String,
    pub owner_rating: f64,
    pub walker_id: ParticipantId,
    pub walker_name: String,
    pub walker_rating: f64,
    pub dog_count: u32,
    pub tier: WalkTier,
    pub total: Cents,
    pub service_fee: Cents,
    pub walker_payout: Cents,
    pub status: EngagementStatus,
    /// The processor charge reference. Present if and only if the engagement has passed through `accepted`.
    pub charge_ref: Option<String>,
    /// The transfer-group tag used to locate the walker payout for reversal. Always the engagement id.
    pub transfer_group: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Engagement {
    pub fn participant_id(&self, role: Role) -> &ParticipantId {
        match role {
            Role::Owner => &self.owner_id,
            Role::Walker => &self.walker_id,
        }
    }
}

//--------------------------------------   NewParticipant   ----------------------------------------------------------
/// Profile fields for the participant store veneer. Account management proper lives outside this crate; the engine
/// only needs enough of a record to snapshot names and ratings and to anchor the engagement back-reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewParticipant {
    pub participant_id: ParticipantId,
    pub name: String,
    pub role: Role,
    pub rating: f64,
    pub device_token: String,
    /// The processor customer reference. Owners must have one before a request can be accepted.
    pub customer_ref: Option<String>,
    /// The processor connected payout account. Walkers must have one before a request can be accepted.
    pub payout_account_ref: Option<String>,
}

//--------------------------------------     Participant    ----------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Participant {
    pub participant_id: ParticipantId,
    pub name: String,
    pub role: Role,
    pub rating: f64,
    pub device_token: String,
    pub customer_ref: Option<String>,
    pub payout_account_ref: Option<String>,
    pub current_engagement_id: Option<EngagementId>,
    pub current_engagement_status: Option<EngagementStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Participant {
    pub fn engagement_ref(&self) -> Option<EngagementRef> {
        match (&self.current_engagement_id, self.current_engagement_status) {
            (Some(id), Some(status)) => Some(EngagementRef::new(id.clone(), status)),
            _ => None,
        }
    }

    pub fn is_engaged(&self) -> bool {
        self.current_engagement_id.is_some()
    }
}
