pub mod manager;
pub mod pnr;
pub mod receipts;
pub mod sweeper;

pub use manager::{BookingManager, BookingSettings};
pub use pnr::{PnrSource, RandomPnr};
pub use receipts::ReceiptStore;
pub use sweeper::HoldSweeper;
