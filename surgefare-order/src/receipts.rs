use std::sync::Arc;
use uuid::Uuid;
use surgefare_core::repository::BookingRepository;
use surgefare_core::CoreResult;
use surgefare_shared::Booking;

/// Read side of confirmed bookings. Writes only happen through `BookingManager`.
pub struct ReceiptStore {
    bookings: Arc<dyn BookingRepository>,
}

impl ReceiptStore {
    pub fn new(bookings: Arc<dyn BookingRepository>) -> Self {
        Self { bookings }
    }

    /// Confirmed bookings for the user, newest `booking_time` first.
    pub async fn history(&self, user_id: Uuid) -> CoreResult<Vec<Booking>> {
        self.bookings.list_bookings(user_id).await
    }
}
