use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Show {
    pub id: Uuid,
    pub title: String,
}

/// A single scheduled performance of a show at a venue. Read-only reference
/// for the reservation core; every hold and booking is keyed against one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowSchedule {
    pub id: Uuid,
    pub show_id: Uuid,
    pub venue_id: Uuid,
    pub starts_at: DateTime<Utc>,
}
