pub mod catalog;
pub mod layout;

pub use catalog::SeatCatalog;
pub use layout::generate_labels;

use uuid::Uuid;
use viaro_domain::ReservationError;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Seat count must be at least 1")]
    EmptyLayout,

    #[error("Seats already exist for vehicle {0}")]
    AlreadyProvisioned(Uuid),

    #[error(transparent)]
    Store(#[from] ReservationError),
}
