//! Walk pricing.
//!
//! Pure and deterministic: a (dog count, duration) pair always prices to the same itemized breakdown, there is no
//! I/O, and the function is safe to call unboundedly. Quoting never locks a participant or touches external state.
use thiserror::Error;
use wgl_common::Cents;

use crate::db_types::{CostBreakdown, WalkTier};

/// Added to the base rate for every dog on the walk.
pub const PER_DOG_SURCHARGE: Cents = Cents::new(499);
/// One walker can handle at most this many dogs per engagement.
pub const MAX_DOGS_PER_WALK: u32 = 4;

const BASE_QUARTER: Cents = Cents::new(1899);
const BASE_HALF: Cents = Cents::new(2899);
const BASE_HOUR: Cents = Cents::new(4899);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("Invalid walk duration: {0} minutes. Walks are 15, 30 or 60 minutes.")]
    InvalidDuration(i64),
    #[error("A walk must include between 1 and {MAX_DOGS_PER_WALK} dogs, not {0}")]
    InvalidDogCount(u32),
}

pub fn base_rate(tier: WalkTier) -> Cents {
    match tier {
        WalkTier::Quarter => BASE_QUARTER,
        WalkTier::Half => BASE_HALF,
        WalkTier::Hour => BASE_HOUR,
    }
}

/// Prices a walk: `total = base(tier) + surcharge × dog_count`.
///
/// Rejecting a bad dog count or duration here is caller input validation, not a system fault; `dispatch` never
/// re-validates these.
pub fn quote_price(dog_count: u32, duration_minutes: i64) -> Result<CostBreakdown, PricingError> {
    let tier =
        WalkTier::try_from(duration_minutes).map_err(|_| PricingError::InvalidDuration(duration_minutes))?;
    if dog_count == 0 || dog_count > MAX_DOGS_PER_WALK {
        return Err(PricingError::InvalidDogCount(dog_count));
    }
    let base = base_rate(tier);
    let surcharge = PER_DOG_SURCHARGE * i64::from(dog_count);
    Ok(CostBreakdown { tier, dog_count, base, surcharge, total: base + surcharge })
}
