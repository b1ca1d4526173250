pub mod app_config;
pub mod directory;
pub mod memory;

pub use directory::{StaticBookingDirectory, StaticTripDirectory};
pub use memory::MemoryLedger;
