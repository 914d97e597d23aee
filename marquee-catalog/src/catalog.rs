use crate::schedule::{Show, ShowSchedule};
use crate::seat::{Seat, Venue};
use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Read-only lookup seam the reservation core consumes. Unknown ids fail
/// with `NotFound`; the core never mutates catalog data through this trait.
#[async_trait]
pub trait SeatDirectory: Send + Sync {
    async fn seat(&self, seat_id: Uuid) -> Result<Seat, CatalogError>;

    /// All seats of a venue, ordered by row then seat number.
    async fn seats_for_venue(&self, venue_id: Uuid) -> Result<Vec<Seat>, CatalogError>;

    async fn schedule(&self, schedule_id: Uuid) -> Result<ShowSchedule, CatalogError>;
}

/// In-memory seat catalog. Populated once at startup, then shared behind an
/// `Arc` as immutable reference data.
pub struct SeatCatalog {
    venues: HashMap<Uuid, Venue>,
    seats: HashMap<Uuid, Seat>,
    seats_by_venue: HashMap<Uuid, Vec<Uuid>>,
    shows: HashMap<Uuid, Show>,
    schedules: HashMap<Uuid, ShowSchedule>,
}

impl SeatCatalog {
    pub fn new() -> Self {
        Self {
            venues: HashMap::new(),
            seats: HashMap::new(),
            seats_by_venue: HashMap::new(),
            shows: HashMap::new(),
            schedules: HashMap::new(),
        }
    }

    pub fn add_venue(&mut self, venue: Venue) {
        self.seats_by_venue.entry(venue.id).or_default();
        self.venues.insert(venue.id, venue);
    }

    pub fn add_seat(&mut self, seat: Seat) {
        self.seats_by_venue
            .entry(seat.venue_id)
            .or_default()
            .push(seat.id);
        self.seats.insert(seat.id, seat);
    }

    pub fn add_show(&mut self, show: Show) {
        self.shows.insert(show.id, show);
    }

    pub fn add_schedule(&mut self, schedule: ShowSchedule) {
        self.schedules.insert(schedule.id, schedule);
    }

    pub fn venue(&self, venue_id: &Uuid) -> Result<&Venue, CatalogError> {
        self.venues
            .get(venue_id)
            .ok_or_else(|| CatalogError::NotFound(format!("venue {venue_id}")))
    }

    pub fn show(&self, show_id: &Uuid) -> Result<&Show, CatalogError> {
        self.shows
            .get(show_id)
            .ok_or_else(|| CatalogError::NotFound(format!("show {show_id}")))
    }
}

impl Default for SeatCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SeatDirectory for SeatCatalog {
    async fn seat(&self, seat_id: Uuid) -> Result<Seat, CatalogError> {
        self.seats
            .get(&seat_id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("seat {seat_id}")))
    }

    async fn seats_for_venue(&self, venue_id: Uuid) -> Result<Vec<Seat>, CatalogError> {
        let ids = self
            .seats_by_venue
            .get(&venue_id)
            .ok_or_else(|| CatalogError::NotFound(format!("venue {venue_id}")))?;

        let mut seats: Vec<Seat> = ids
            .iter()
            .filter_map(|id| self.seats.get(id).cloned())
            .collect();
        seats.sort_by(|a, b| a.row.cmp(&b.row).then(a.number.cmp(&b.number)));
        Ok(seats)
    }

    async fn schedule(&self, schedule_id: Uuid) -> Result<ShowSchedule, CatalogError> {
        self.schedules
            .get(&schedule_id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("schedule {schedule_id}")))
    }
}
