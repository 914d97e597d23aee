use uuid::Uuid;

/// Published after a booking commits; consumed by the notification service.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingConfirmedEvent {
    pub booking_id: Uuid,
    pub booking_number: String,
    pub user_id: Uuid,
    pub schedule_id: Uuid,
    pub seat_ids: Vec<Uuid>,
    pub confirmed_at: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingCancelledEvent {
    pub booking_id: Uuid,
    pub booking_number: String,
    pub schedule_id: Uuid,
    pub seat_ids: Vec<Uuid>,
    /// True when the cancellation is a post-payment reversal.
    pub refunded: bool,
    pub cancelled_at: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct ReservationExpiredEvent {
    pub reservation_id: Uuid,
    pub seat_id: Uuid,
    pub schedule_id: Uuid,
    pub session_id: String,
    pub expired_at: i64,
}
