pub mod catalog;
pub mod schedule;
pub mod seat;

pub use catalog::{CatalogError, SeatCatalog, SeatDirectory};
pub use schedule::{Show, ShowSchedule};
pub use seat::{Seat, SeatCategory, Venue};
