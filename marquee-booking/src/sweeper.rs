use crate::error::BookingError;
use crate::events::{EventBus, TicketingEvent};
use chrono::{DateTime, Utc};
use marquee_core::LedgerStore;
use marquee_shared::ReservationExpiredEvent;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{error, info};

/// Reclaims lapsed holds on a fixed interval. Purely corrective: the
/// availability computation already ignores expired holds, so sweeper
/// latency only bounds ledger growth and counter staleness, never
/// correctness. A reservation being swept and promoted concurrently is
/// settled by the ledger's atomic unit; the loser sees the row gone.
pub struct ExpirySweeper {
    ledger: Arc<dyn LedgerStore>,
    events: EventBus,
    interval: std::time::Duration,
}

impl ExpirySweeper {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        events: EventBus,
        interval: std::time::Duration,
    ) -> Self {
        Self {
            ledger,
            events,
            interval,
        }
    }

    /// One sweep pass; returns how many holds were reclaimed.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<usize, BookingError> {
        let reclaimed = self.ledger.sweep_expired(now).await?;

        for reservation in &reclaimed {
            self.events
                .publish(TicketingEvent::ReservationExpired(ReservationExpiredEvent {
                    reservation_id: reservation.id,
                    seat_id: reservation.seat_id,
                    schedule_id: reservation.schedule_id,
                    session_id: reservation.holder.session_id.clone(),
                    expired_at: reservation.expires_at.timestamp(),
                }));
        }

        if !reclaimed.is_empty() {
            info!(count = reclaimed.len(), "reclaimed expired holds");
        }
        Ok(reclaimed.len())
    }

    /// Run forever on the configured interval. Spawn as a background task.
    pub async fn run(&self) {
        info!(interval_secs = self.interval.as_secs(), "expiry sweeper started");
        loop {
            sleep(self.interval).await;
            if let Err(err) = self.sweep(Utc::now()).await {
                error!(%err, "sweep pass failed");
            }
        }
    }
}
