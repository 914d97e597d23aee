use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Booking status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Expired,
    Refunded,
}

impl BookingStatus {
    /// Blocking statuses make the booked seats unavailable to others.
    pub fn is_blocking(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Expired => "EXPIRED",
            BookingStatus::Refunded => "REFUNDED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(BookingStatus::Pending),
            "CONFIRMED" => Some(BookingStatus::Confirmed),
            "CANCELLED" => Some(BookingStatus::Cancelled),
            "EXPIRED" => Some(BookingStatus::Expired),
            "REFUNDED" => Some(BookingStatus::Refunded),
            _ => None,
        }
    }
}

/// Why a booking is being cancelled; decides the terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    CustomerRequest,
    PaymentReversal,
}

impl CancelReason {
    pub fn target_status(&self) -> BookingStatus {
        match self {
            CancelReason::CustomerRequest => BookingStatus::Cancelled,
            CancelReason::PaymentReversal => BookingStatus::Refunded,
        }
    }
}

/// Join row tying a seat to the booking that claims it. A booking owns its
/// seat entries for its whole lifetime; they are never reassigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatBooking {
    pub booking_id: Uuid,
    pub seat_id: Uuid,
}

/// A finalized (or payment-pending) purchase owning one or more seats for a
/// single show schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub booking_number: String,
    pub user_id: Uuid,
    pub schedule_id: Uuid,
    pub seats: Vec<SeatBooking>,
    pub status: BookingStatus,
    pub total_amount: i32,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn seat_ids(&self) -> Vec<Uuid> {
        self.seats.iter().map(|s| s.seat_id).collect()
    }

    pub fn update_status(&mut self, status: BookingStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }
}
