use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db_types::{Engagement, EngagementId, EngagementStatus};

/// A lifecycle transition, addressed to the event room shared by the two participants of one engagement.
///
/// The room key is always the engagement id; the event name is the camel-case status the engagement just entered.
/// The payload carries the full engagement snapshot so clients never need a follow-up fetch to render the change.
#[derive(Debug, Clone, Serialize)]
pub struct LifecycleEvent {
    pub room: EngagementId,
    pub name: String,
    pub status: EngagementStatus,
    pub engagement: Engagement,
    pub at: DateTime<Utc>,
}

impl LifecycleEvent {
    pub fn new(engagement: Engagement) -> Self {
        Self {
            room: engagement.engagement_id.clone(),
            name: engagement.status.to_string(),
            status: engagement.status,
            at: Utc::now(),
            engagement,
        }
    }
}
