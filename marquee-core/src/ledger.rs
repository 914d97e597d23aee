use crate::booking::{Booking, BookingStatus};
use crate::reservation::{Holder, Reservation};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("seats already claimed: {0:?}")]
    Conflict(Vec<Uuid>),

    #[error("reservations missing or expired: {0:?}")]
    ReservationGone(Vec<Uuid>),

    #[error("reservations belong to a different schedule: {0:?}")]
    WrongSchedule(Vec<Uuid>),

    #[error("reservation held by a different party")]
    HolderMismatch,

    #[error("booking not found: {0}")]
    BookingNotFound(Uuid),

    #[error("booking number already in use: {0}")]
    DuplicateNumber(String),

    /// Transient storage failure; callers retry with bounded attempts.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Everything needed to materialize a booking when holds are promoted.
/// The store assigns the row id and derives the seat entries from the
/// consumed reservations.
#[derive(Debug, Clone)]
pub struct BookingDraft {
    pub booking_number: String,
    pub schedule_id: Uuid,
    pub status: BookingStatus,
    pub total_amount: i32,
    pub currency: String,
}

/// Consistent point-in-time view of every claim against one schedule.
/// Both sets come from a single atomic read so a seat can never appear
/// free while a concurrent writer is mid-flight.
#[derive(Debug, Clone, Default)]
pub struct ScheduleClaims {
    /// Seats under an unexpired reservation.
    pub held: HashSet<Uuid>,
    /// Seats under a booking in a blocking status.
    pub booked: HashSet<Uuid>,
}

impl ScheduleClaims {
    pub fn blocks(&self, seat_id: Uuid) -> bool {
        self.held.contains(&seat_id) || self.booked.contains(&seat_id)
    }
}

/// Persistence seam for the reservation and booking ledgers. Every mutating
/// method executes as one atomic unit: concurrent calls for the same
/// (seat, schedule) key are linearized by the implementation, and a failed
/// call leaves no partial rows behind.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Create unexpired reservations for every requested seat, or none.
    /// `seat_ids` must be distinct; callers dedupe before reaching the
    /// store. Expired rows on the requested seats are reclaimed in the same
    /// unit. Fails with `Conflict` listing the seats that were not free.
    async fn try_hold(
        &self,
        seat_ids: &[Uuid],
        schedule_id: Uuid,
        holder: &Holder,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Vec<Reservation>, LedgerError>;

    async fn reservation(&self, reservation_id: Uuid) -> Result<Option<Reservation>, LedgerError>;

    /// Delete a reservation. Returns the removed row, or `None` when it was
    /// already gone.
    async fn release(&self, reservation_id: Uuid) -> Result<Option<Reservation>, LedgerError>;

    /// Promote reservations into a booking: verify every referenced row is
    /// present, unexpired, on the draft's schedule and owned by one holder
    /// of `user_id`, then create the booking with its seat entries and
    /// delete the consumed reservations — all in one atomic unit.
    async fn promote(
        &self,
        reservation_ids: &[Uuid],
        user_id: Uuid,
        draft: BookingDraft,
        now: DateTime<Utc>,
    ) -> Result<Booking, LedgerError>;

    async fn booking(&self, booking_id: Uuid) -> Result<Option<Booking>, LedgerError>;

    async fn booking_by_number(&self, booking_number: &str) -> Result<Option<Booking>, LedgerError>;

    /// Move a booking to `status`, updating seat blocking derivationally.
    async fn update_booking_status(
        &self,
        booking_id: Uuid,
        status: BookingStatus,
        now: DateTime<Utc>,
    ) -> Result<Booking, LedgerError>;

    /// Snapshot of all claims against a schedule, taken atomically.
    async fn claims(
        &self,
        schedule_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ScheduleClaims, LedgerError>;

    /// Bulk-delete every reservation with `expires_at < now`, returning the
    /// removed rows. Idempotent; safe to run concurrently with promotions.
    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<Vec<Reservation>, LedgerError>;
}
