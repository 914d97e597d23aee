use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Seat categories offered across venues
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatCategory {
    Standard,
    Premium,
    Box,
    Accessible,
}

/// A physical seat inside a venue. Seats are static reference data; the
/// reservation core never creates or destroys them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seat {
    pub id: Uuid,
    pub venue_id: Uuid,
    pub row: String,
    pub number: i32,
    pub category: SeatCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Venue {
    pub id: Uuid,
    pub name: String,
    pub city: Option<String>,
}
