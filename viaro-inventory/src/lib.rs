pub mod manager;
pub mod sweeper;

pub use manager::{HeldSeats, HoldManager};
pub use sweeper::{start_sweeper, start_sweeper_with_rules};
