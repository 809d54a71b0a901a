pub mod attempt;
pub mod booking;
pub mod events;
pub mod flight;
pub mod user;

pub use attempt::Attempt;
pub use booking::{Booking, BookingHold};
pub use events::DomainEvent;
pub use flight::Flight;
pub use user::User;
