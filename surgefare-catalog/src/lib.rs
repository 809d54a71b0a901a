pub mod pricing;
pub mod retention;

pub use pricing::{Quote, SurgePricingEngine};
pub use retention::LedgerRetention;
