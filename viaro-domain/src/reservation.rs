use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::seat::{Seat, SeatLabel};

/// Lifecycle state of one seat on one trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatState {
    Available,
    Held,
    Booked,
}

impl SeatState {
    /// Legal transitions of the reservation state machine. Everything
    /// else is a programming error, not a normal flow outcome.
    pub fn can_transition_to(self, to: SeatState) -> bool {
        matches!(
            (self, to),
            (SeatState::Available, SeatState::Held)
                | (SeatState::Held, SeatState::Available)
                | (SeatState::Held, SeatState::Booked)
                | (SeatState::Booked, SeatState::Available)
        )
    }
}

/// One record per (trip, seat) pair; the single source of truth for
/// whether a seat can be sold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationRecord {
    pub trip_id: Uuid,
    pub seat_id: Uuid,
    pub state: SeatState,
    pub hold_expires_at: Option<DateTime<Utc>>,
    pub booking_ref: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReservationRecord {
    pub fn new(trip_id: Uuid, seat_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            trip_id,
            seat_id,
            state: SeatState::Available,
            hold_expires_at: None,
            booking_ref: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A hold whose TTL elapsed but which no sweep has reclaimed yet.
    /// Logically available, physically still Held.
    pub fn is_stale_hold(&self, now: DateTime<Utc>) -> bool {
        self.state == SeatState::Held
            && self.hold_expires_at.map(|at| at < now).unwrap_or(true)
    }
}

/// Payload accompanying a state transition: the hold expiry for moves
/// into Held, the booking reference for moves into Booked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionExtra {
    None,
    Hold { expires_at: DateTime<Utc> },
    Booking { booking_ref: Uuid },
}

impl TransitionExtra {
    /// Whether this payload matches the target state.
    pub fn fits(&self, to: SeatState) -> bool {
        match to {
            SeatState::Held => matches!(self, TransitionExtra::Hold { .. }),
            SeatState::Booked => matches!(self, TransitionExtra::Booking { .. }),
            SeatState::Available => matches!(self, TransitionExtra::None),
        }
    }
}

/// Display row for seat maps: record state flattened into the booleans
/// the booking UI renders, plus an optional customer name for booked
/// seats.
#[derive(Debug, Clone, Serialize)]
pub struct SeatMapEntry {
    pub seat_id: Uuid,
    pub label: SeatLabel,
    pub state: SeatState,
    pub is_available: bool,
    pub is_selected: bool,
    pub is_booked: bool,
    pub hold_expires_at: Option<DateTime<Utc>>,
    pub booking_ref: Option<Uuid>,
    pub booked_by: Option<String>,
}

impl SeatMapEntry {
    pub fn new(seat: &Seat, record: &ReservationRecord) -> Self {
        Self {
            seat_id: seat.id,
            label: seat.label,
            state: record.state,
            is_available: record.state == SeatState::Available,
            is_selected: record.state == SeatState::Held,
            is_booked: record.state == SeatState::Booked,
            hold_expires_at: record.hold_expires_at,
            booking_ref: record.booking_ref,
            booked_by: None,
        }
    }
}

/// Result of bulk inventory initialization. Re-initializing a trip is a
/// no-op, signalled rather than errored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InitOutcome {
    Initialized { count: usize },
    AlreadyInitialized,
}
