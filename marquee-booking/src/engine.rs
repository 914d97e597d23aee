use crate::availability::AvailabilityResolver;
use crate::coordinator::BookingCoordinator;
use crate::events::EventBus;
use crate::sweeper::ExpirySweeper;
use marquee_catalog::SeatDirectory;
use marquee_core::{BookingNumberGenerator, LedgerStore};
use marquee_store::{BusinessRules, MemoryLedger};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Composition root wiring the coordinator, resolver, sweeper and event bus
/// over one catalog and one ledger. The presentation layer talks to these
/// handles; the notification collaborator subscribes to `events`.
pub struct TicketingEngine {
    pub coordinator: Arc<BookingCoordinator>,
    pub availability: AvailabilityResolver,
    pub sweeper: Arc<ExpirySweeper>,
    pub events: EventBus,
}

impl TicketingEngine {
    pub fn in_memory(catalog: Arc<dyn SeatDirectory>, rules: &BusinessRules) -> Self {
        Self::with_ledger(catalog, Arc::new(MemoryLedger::new()), rules)
    }

    pub fn with_ledger(
        catalog: Arc<dyn SeatDirectory>,
        ledger: Arc<dyn LedgerStore>,
        rules: &BusinessRules,
    ) -> Self {
        let events = EventBus::default();
        let coordinator = Arc::new(BookingCoordinator::new(
            catalog.clone(),
            ledger.clone(),
            events.clone(),
            BookingNumberGenerator::new(rules.booking_number_prefix.clone()),
            rules.currency.clone(),
        ));
        let availability = AvailabilityResolver::new(catalog, ledger.clone());
        let sweeper = Arc::new(ExpirySweeper::new(
            ledger,
            events.clone(),
            rules.sweep_interval(),
        ));

        Self {
            coordinator,
            availability,
            sweeper,
            events,
        }
    }

    /// Start the background sweeper loop.
    pub fn start_sweeper(&self) -> JoinHandle<()> {
        let sweeper = self.sweeper.clone();
        tokio::spawn(async move { sweeper.run().await })
    }
}
