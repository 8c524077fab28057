use serde::Deserialize;
use waggle_engine::db_types::{NewQuote, ParticipantId};

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteRequest {
    pub owner_id: String,
    pub walker_id: String,
    pub dog_count: u32,
    pub duration_minutes: i64,
    pub origin_lat: f64,
    pub origin_lng: f64,
}

impl From<QuoteRequest> for NewQuote {
    fn from(req: QuoteRequest) -> Self {
        NewQuote {
            owner_id: ParticipantId::from(req.owner_id),
            walker_id: ParticipantId::from(req.walker_id),
            dog_count: req.dog_count,
            duration_minutes: req.duration_minutes,
            origin_lat: req.origin_lat,
            origin_lng: req.origin_lng,
        }
    }
}
