use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reservation lifecycle events fanned out to interested listeners
/// (seat-map streams, analytics). Timestamps are Unix seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReservationEvent {
    SeatsHeld {
        trip_id: Uuid,
        labels: Vec<String>,
        expires_at: i64,
    },
    SeatsReleased {
        trip_id: Uuid,
        released: u64,
    },
    BookingConfirmed {
        trip_id: Uuid,
        labels: Vec<String>,
        booking_ref: Uuid,
    },
    BookingCancelled {
        trip_id: Uuid,
        cancelled: u64,
    },
    HoldsExpired {
        trip_id: Option<Uuid>,
        reclaimed: u64,
    },
}
