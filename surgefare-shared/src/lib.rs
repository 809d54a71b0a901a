pub mod models;
pub mod pii;

pub use models::{Attempt, Booking, BookingHold, DomainEvent, Flight, User};
