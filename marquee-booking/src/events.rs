use marquee_shared::{BookingCancelledEvent, BookingConfirmedEvent, ReservationExpiredEvent};
use tokio::sync::broadcast;

#[derive(Debug, Clone)]
pub enum TicketingEvent {
    BookingConfirmed(BookingConfirmedEvent),
    BookingCancelled(BookingCancelledEvent),
    ReservationExpired(ReservationExpiredEvent),
}

/// Fire-and-forget fan-out to notification consumers. The core never blocks
/// on delivery; events published with no subscribers are dropped.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TicketingEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TicketingEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: TicketingEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(128)
    }
}
