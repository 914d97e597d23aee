use crate::error::BookingError;
use crate::events::{EventBus, TicketingEvent};
use chrono::Utc;
use marquee_catalog::SeatDirectory;
use marquee_core::{
    Booking, BookingDraft, BookingNumberGenerator, BookingStatus, CancelReason, Holder,
    LedgerError, LedgerStore, PaymentResult, Reservation,
};
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// How often a transient ledger failure is retried before the operation is
/// surfaced as `CoordinatorUnavailable`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: std::time::Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: std::time::Duration::from_millis(50),
        }
    }
}

const NUMBER_ATTEMPTS: u32 = 3;

async fn retrying<T, F, Fut>(policy: &RetryPolicy, op: &'static str, mut call: F) -> Result<T, LedgerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LedgerError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match call().await {
            Ok(value) => return Ok(value),
            Err(LedgerError::Unavailable(reason)) if attempt < policy.attempts => {
                warn!(op, attempt, %reason, "transient ledger failure, retrying");
                tokio::time::sleep(policy.backoff).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// The reservation/booking state machine. Per (seat, schedule):
/// FREE → HELD → {FREE, CLAIMED}; CLAIMED → FREE on cancel/refund.
/// The atomicity of each transition lives in the `LedgerStore`; the
/// coordinator validates references, sequences the steps and maps storage
/// conflicts into the user-facing taxonomy.
pub struct BookingCoordinator {
    catalog: Arc<dyn SeatDirectory>,
    ledger: Arc<dyn LedgerStore>,
    events: EventBus,
    numbers: BookingNumberGenerator,
    currency: String,
    retry: RetryPolicy,
}

impl BookingCoordinator {
    pub fn new(
        catalog: Arc<dyn SeatDirectory>,
        ledger: Arc<dyn LedgerStore>,
        events: EventBus,
        numbers: BookingNumberGenerator,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            ledger,
            events,
            numbers,
            currency: currency.into(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Atomically hold every requested seat for `ttl`, or none of them.
    pub async fn place_hold(
        &self,
        seat_ids: &[Uuid],
        schedule_id: Uuid,
        holder: &Holder,
        ttl: chrono::Duration,
    ) -> Result<Vec<Reservation>, BookingError> {
        let schedule = self.catalog.schedule(schedule_id).await?;

        let mut requested: Vec<Uuid> = Vec::with_capacity(seat_ids.len());
        for &seat_id in seat_ids {
            if !requested.contains(&seat_id) {
                requested.push(seat_id);
            }
        }
        if requested.is_empty() {
            return Ok(Vec::new());
        }

        for &seat_id in &requested {
            let seat = self.catalog.seat(seat_id).await?;
            if seat.venue_id != schedule.venue_id {
                return Err(BookingError::NotFound(format!(
                    "seat {seat_id} at the venue of schedule {schedule_id}"
                )));
            }
        }

        let now = Utc::now();
        let expires_at = now + ttl;
        let reservations = retrying(&self.retry, "place_hold", || {
            self.ledger
                .try_hold(&requested, schedule_id, holder, now, expires_at)
        })
        .await?;

        info!(
            schedule_id = %schedule_id,
            session_id = %holder.session_id,
            seats = reservations.len(),
            %expires_at,
            "placed hold"
        );
        Ok(reservations)
    }

    /// Release a hold. Releasing a reservation that is already gone or
    /// expired is a no-op; only the holder may release a live one.
    pub async fn release_hold(
        &self,
        reservation_id: Uuid,
        holder: &Holder,
    ) -> Result<(), BookingError> {
        let existing = retrying(&self.retry, "release_hold", || {
            self.ledger.reservation(reservation_id)
        })
        .await?;

        let Some(reservation) = existing else {
            return Ok(());
        };
        if !reservation.holder.same_party(holder) {
            return Err(BookingError::NotHolder);
        }

        retrying(&self.retry, "release_hold", || {
            self.ledger.release(reservation_id)
        })
        .await?;

        info!(%reservation_id, session_id = %holder.session_id, "released hold");
        Ok(())
    }

    /// Promote held seats into a booking. This is the linearization point:
    /// the ledger's atomic unit decides the single winner for each seat.
    pub async fn confirm_booking(
        &self,
        reservation_ids: &[Uuid],
        user_id: Uuid,
        schedule_id: Uuid,
        payment: &PaymentResult,
    ) -> Result<Booking, BookingError> {
        let reservation_ids: Vec<Uuid> = {
            let mut deduped = Vec::with_capacity(reservation_ids.len());
            for &id in reservation_ids {
                if !deduped.contains(&id) {
                    deduped.push(id);
                }
            }
            deduped
        };
        if reservation_ids.is_empty() {
            return Err(BookingError::NotFound("no reservations referenced".to_string()));
        }
        if !payment.success {
            info!(%schedule_id, %user_id, "payment declined, holds left intact");
            return Err(BookingError::PaymentFailed);
        }

        let now = Utc::now();
        let mut number_attempt = 0;
        loop {
            number_attempt += 1;
            let draft = BookingDraft {
                booking_number: self.numbers.next(),
                schedule_id,
                status: BookingStatus::Confirmed,
                total_amount: payment.amount,
                currency: self.currency.clone(),
            };

            match retrying(&self.retry, "confirm_booking", || {
                self.ledger
                    .promote(&reservation_ids, user_id, draft.clone(), now)
            })
            .await
            {
                Ok(booking) => {
                    info!(
                        booking_number = %booking.booking_number,
                        %schedule_id,
                        seats = booking.seats.len(),
                        "booking confirmed"
                    );
                    self.events
                        .publish(TicketingEvent::BookingConfirmed(
                            marquee_shared::BookingConfirmedEvent {
                                booking_id: booking.id,
                                booking_number: booking.booking_number.clone(),
                                user_id,
                                schedule_id,
                                seat_ids: booking.seat_ids(),
                                confirmed_at: now.timestamp(),
                            },
                        ));
                    return Ok(booking);
                }
                Err(LedgerError::DuplicateNumber(number)) if number_attempt < NUMBER_ATTEMPTS => {
                    warn!(%number, "booking number collision, regenerating");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Cancel or refund a booking; its seats become free derivationally.
    /// Cancelling a booking already in a non-blocking status is a no-op.
    pub async fn cancel_booking(
        &self,
        booking_id: Uuid,
        reason: CancelReason,
    ) -> Result<Booking, BookingError> {
        let existing = retrying(&self.retry, "cancel_booking", || {
            self.ledger.booking(booking_id)
        })
        .await?;
        let Some(booking) = existing else {
            return Err(BookingError::NotFound(format!("booking {booking_id}")));
        };
        if !booking.status.is_blocking() {
            return Ok(booking);
        }

        let target = reason.target_status();
        let now = Utc::now();
        let updated = retrying(&self.retry, "cancel_booking", || {
            self.ledger.update_booking_status(booking_id, target, now)
        })
        .await?;

        info!(
            booking_number = %updated.booking_number,
            status = updated.status.as_str(),
            "booking cancelled"
        );
        self.events
            .publish(TicketingEvent::BookingCancelled(
                marquee_shared::BookingCancelledEvent {
                    booking_id: updated.id,
                    booking_number: updated.booking_number.clone(),
                    schedule_id: updated.schedule_id,
                    seat_ids: updated.seat_ids(),
                    refunded: target == BookingStatus::Refunded,
                    cancelled_at: now.timestamp(),
                },
            ));
        Ok(updated)
    }

    pub async fn booking(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        let found = retrying(&self.retry, "booking", || self.ledger.booking(booking_id)).await?;
        found.ok_or_else(|| BookingError::NotFound(format!("booking {booking_id}")))
    }

    pub async fn booking_by_number(&self, booking_number: &str) -> Result<Booking, BookingError> {
        let found = retrying(&self.retry, "booking_by_number", || {
            self.ledger.booking_by_number(booking_number)
        })
        .await?;
        found.ok_or_else(|| BookingError::NotFound(format!("booking {booking_number}")))
    }
}
