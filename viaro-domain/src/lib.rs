pub mod events;
pub mod repository;
pub mod reservation;
pub mod seat;

pub use events::ReservationEvent;
pub use repository::{BookingDirectory, ReservationStore, SeatStore, TripDirectory};
pub use reservation::{
    InitOutcome, ReservationRecord, SeatMapEntry, SeatState, TransitionExtra,
};
pub use seat::{ParseSeatLabelError, Seat, SeatLabel};

use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error("Seats not found: {}", labels.join(", "))]
    SeatNotFound { labels: Vec<String> },

    #[error("Seats not available: {}", labels.join(", "))]
    SeatUnavailable { labels: Vec<String> },

    #[error("Hold expired or missing for the requested seats")]
    HoldExpiredOrMissing,

    #[error("Invalid state transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: SeatState,
        to: SeatState,
    },

    #[error("Seat inventory not initialized for trip {0}")]
    TripNotInitialized(Uuid),

    #[error("No vehicle bound to trip {0}")]
    TripNotFound(Uuid),

    #[error("No seats provisioned for vehicle {0}")]
    VehicleNotProvisioned(Uuid),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

pub type ReservationResult<T> = Result<T, ReservationError>;
