pub mod availability;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod events;
pub mod sweeper;

pub use availability::{AvailabilityResolver, CapacitySummary};
pub use coordinator::{BookingCoordinator, RetryPolicy};
pub use engine::TicketingEngine;
pub use error::BookingError;
pub use events::{EventBus, TicketingEvent};
pub use sweeper::ExpirySweeper;
