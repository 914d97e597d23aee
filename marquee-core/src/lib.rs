pub mod booking;
pub mod ledger;
pub mod payment;
pub mod reservation;
pub mod sequence;

pub use booking::{Booking, BookingStatus, CancelReason, SeatBooking};
pub use ledger::{BookingDraft, LedgerError, LedgerStore, ScheduleClaims};
pub use payment::PaymentResult;
pub use reservation::{Holder, Reservation};
pub use sequence::BookingNumberGenerator;
