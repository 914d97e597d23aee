use crate::error::BookingError;
use chrono::Utc;
use marquee_catalog::{Seat, SeatDirectory};
use marquee_core::LedgerStore;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Capacity counters for display surfaces. All three numbers come from the
/// same ledger snapshot, so they always add up to the venue's seat count.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CapacitySummary {
    pub available: usize,
    pub reserved: usize,
    pub booked: usize,
}

/// Computes which seats are sellable for a schedule: the venue's catalog
/// minus unexpired holds minus blocking bookings. "Available" is always
/// derived from a single consistent claims snapshot, never stored.
pub struct AvailabilityResolver {
    catalog: Arc<dyn SeatDirectory>,
    ledger: Arc<dyn LedgerStore>,
}

impl AvailabilityResolver {
    pub fn new(catalog: Arc<dyn SeatDirectory>, ledger: Arc<dyn LedgerStore>) -> Self {
        Self { catalog, ledger }
    }

    pub async fn available_seats(
        &self,
        venue_id: Uuid,
        schedule_id: Uuid,
    ) -> Result<Vec<Seat>, BookingError> {
        let (seats, claims) = self.snapshot(venue_id, schedule_id).await?;
        Ok(seats
            .into_iter()
            .filter(|seat| !claims.blocks(seat.id))
            .collect())
    }

    pub async fn capacity(
        &self,
        venue_id: Uuid,
        schedule_id: Uuid,
    ) -> Result<CapacitySummary, BookingError> {
        let (seats, claims) = self.snapshot(venue_id, schedule_id).await?;
        let blocked = seats.iter().filter(|seat| claims.blocks(seat.id)).count();
        Ok(CapacitySummary {
            available: seats.len() - blocked,
            reserved: claims.held.len(),
            booked: claims.booked.len(),
        })
    }

    async fn snapshot(
        &self,
        venue_id: Uuid,
        schedule_id: Uuid,
    ) -> Result<(Vec<Seat>, marquee_core::ScheduleClaims), BookingError> {
        let schedule = self.catalog.schedule(schedule_id).await?;
        if schedule.venue_id != venue_id {
            return Err(BookingError::NotFound(format!(
                "schedule {schedule_id} at venue {venue_id}"
            )));
        }
        let seats = self.catalog.seats_for_venue(venue_id).await?;
        let claims = self.ledger.claims(schedule_id, Utc::now()).await?;
        Ok((seats, claims))
    }
}
