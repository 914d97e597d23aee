use marquee_catalog::CatalogError;
use marquee_core::LedgerError;
use uuid::Uuid;

/// User-facing failure taxonomy for the reservation core. Everything here
/// is returned as a typed result; only `CoordinatorUnavailable` doubles as
/// an operational alert.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    /// The requested seats are held or booked by someone else; retry with
    /// different seats.
    #[error("seats unavailable: {conflicting:?}")]
    SeatUnavailable { conflicting: Vec<Uuid> },

    /// The hold lapsed before confirmation; restart the hold flow.
    #[error("reservation expired or no longer held")]
    ReservationExpired,

    /// The caller does not own the reservation. Not retryable.
    #[error("caller does not hold this reservation")]
    NotHolder,

    /// Payment was declined; no state changed, retry payment within the
    /// hold's remaining TTL.
    #[error("payment was not successful")]
    PaymentFailed,

    #[error("not found: {0}")]
    NotFound(String),

    /// Storage kept failing after bounded retries. The whole operation is
    /// safe to retry since no partial state was committed.
    #[error("booking service unavailable: {0}")]
    CoordinatorUnavailable(String),
}

impl From<CatalogError> for BookingError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(what) => BookingError::NotFound(what),
        }
    }
}

impl From<LedgerError> for BookingError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Conflict(conflicting) => BookingError::SeatUnavailable { conflicting },
            LedgerError::ReservationGone(_) => BookingError::ReservationExpired,
            LedgerError::WrongSchedule(ids) => {
                BookingError::NotFound(format!("reservations {ids:?} for this schedule"))
            }
            LedgerError::HolderMismatch => BookingError::NotHolder,
            LedgerError::BookingNotFound(id) => BookingError::NotFound(format!("booking {id}")),
            LedgerError::DuplicateNumber(number) => BookingError::CoordinatorUnavailable(format!(
                "booking number collision persisted: {number}"
            )),
            LedgerError::Unavailable(reason) => {
                tracing::error!(%reason, "ledger unavailable after retries");
                BookingError::CoordinatorUnavailable(reason)
            }
        }
    }
}
