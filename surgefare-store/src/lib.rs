pub mod app_config;
pub mod attempt_repo;
pub mod booking_repo;
pub mod database;
#[cfg(feature = "kafka")]
pub mod events;
pub mod flight_repo;
pub mod memory;
pub mod user_repo;

pub use attempt_repo::PgAttemptLedger;
pub use booking_repo::PgBookingRepository;
pub use database::DbClient;
#[cfg(feature = "kafka")]
pub use events::KafkaEventPublisher;
pub use flight_repo::PgFlightRepository;
pub use memory::InMemoryStore;
pub use user_repo::PgUserRepository;
