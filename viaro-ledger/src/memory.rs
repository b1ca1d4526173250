use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;
use viaro_domain::{
    InitOutcome, ReservationError, ReservationRecord, ReservationResult, ReservationStore, Seat,
    SeatLabel, SeatMapEntry, SeatState, SeatStore, TransitionExtra,
};

#[derive(Default)]
struct LedgerState {
    /// vehicle id -> seats in canonical label order
    seats_by_vehicle: HashMap<Uuid, Vec<Seat>>,
    /// seat id -> seat, for joining records back to labels
    seats_by_id: HashMap<Uuid, Seat>,
    /// trip id -> seat id -> record
    records: HashMap<Uuid, HashMap<Uuid, ReservationRecord>>,
}

/// Reference in-memory ledger. The entire state sits behind one mutex,
/// so a compare-and-transition verifies every seat and applies every
/// write under a single lock acquisition -- the in-process equivalent of
/// a state-filtered multi-record update in a transactional store.
pub struct MemoryLedger {
    state: Mutex<LedgerState>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
        }
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply a transition to a record. The caller has already validated the
/// (from, to) pair and that `extra` fits the target state.
fn apply(record: &mut ReservationRecord, to: SeatState, extra: TransitionExtra, now: DateTime<Utc>) {
    record.state = to;
    record.hold_expires_at = match extra {
        TransitionExtra::Hold { expires_at } => Some(expires_at),
        _ => None,
    };
    record.booking_ref = match extra {
        TransitionExtra::Booking { booking_ref } => Some(booking_ref),
        _ => None,
    };
    record.updated_at = now;
}

fn validate(from: SeatState, to: SeatState, extra: &TransitionExtra) -> ReservationResult<()> {
    if !from.can_transition_to(to) || !extra.fits(to) {
        return Err(ReservationError::InvalidTransition { from, to });
    }
    Ok(())
}

fn entries_sorted<'a>(
    state: &LedgerState,
    records: impl Iterator<Item = &'a ReservationRecord>,
) -> ReservationResult<Vec<SeatMapEntry>> {
    let mut entries = Vec::new();
    for record in records {
        let seat = state.seats_by_id.get(&record.seat_id).ok_or_else(|| {
            ReservationError::StorageUnavailable(format!(
                "record references unknown seat {}",
                record.seat_id
            ))
        })?;
        entries.push(SeatMapEntry::new(seat, record));
    }
    entries.sort_by_key(|e| e.label);
    Ok(entries)
}

#[async_trait]
impl SeatStore for MemoryLedger {
    async fn insert_seats(&self, vehicle_id: Uuid, seats: Vec<Seat>) -> ReservationResult<()> {
        let mut state = self.state.lock().await;
        if state.seats_by_vehicle.contains_key(&vehicle_id) {
            // Mirrors the unique (vehicle, label) index of a real store.
            return Err(ReservationError::StorageUnavailable(format!(
                "unique index violation: seats already exist for vehicle {}",
                vehicle_id
            )));
        }
        let mut sorted = seats;
        sorted.sort_by_key(|s| s.label);
        for seat in &sorted {
            state.seats_by_id.insert(seat.id, seat.clone());
        }
        info!("Stored {} seats for vehicle {}", sorted.len(), vehicle_id);
        state.seats_by_vehicle.insert(vehicle_id, sorted);
        Ok(())
    }

    async fn seats_for_vehicle(&self, vehicle_id: Uuid) -> ReservationResult<Vec<Seat>> {
        let state = self.state.lock().await;
        Ok(state
            .seats_by_vehicle
            .get(&vehicle_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn resolve_labels(
        &self,
        vehicle_id: Uuid,
        labels: &[SeatLabel],
    ) -> ReservationResult<Vec<Seat>> {
        let state = self.state.lock().await;
        let seats = match state.seats_by_vehicle.get(&vehicle_id) {
            Some(seats) => seats,
            None => return Ok(Vec::new()),
        };
        Ok(seats
            .iter()
            .filter(|s| labels.contains(&s.label))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ReservationStore for MemoryLedger {
    async fn initialize(&self, trip_id: Uuid, seat_ids: &[Uuid]) -> ReservationResult<InitOutcome> {
        let mut state = self.state.lock().await;
        if state.records.contains_key(&trip_id) {
            return Ok(InitOutcome::AlreadyInitialized);
        }
        let mut records = HashMap::with_capacity(seat_ids.len());
        for seat_id in seat_ids {
            records.insert(*seat_id, ReservationRecord::new(trip_id, *seat_id));
        }
        let count = records.len();
        state.records.insert(trip_id, records);
        info!("Initialized {} seat records for trip {}", count, trip_id);
        Ok(InitOutcome::Initialized { count })
    }

    async fn find_by_trip(&self, trip_id: Uuid) -> ReservationResult<Vec<SeatMapEntry>> {
        let state = self.state.lock().await;
        let records = state
            .records
            .get(&trip_id)
            .ok_or(ReservationError::TripNotInitialized(trip_id))?;
        entries_sorted(&state, records.values())
    }

    async fn find_by_seats(
        &self,
        trip_id: Uuid,
        seat_ids: &[Uuid],
    ) -> ReservationResult<Vec<SeatMapEntry>> {
        let state = self.state.lock().await;
        let records = state
            .records
            .get(&trip_id)
            .ok_or(ReservationError::TripNotInitialized(trip_id))?;
        entries_sorted(
            &state,
            seat_ids.iter().filter_map(|id| records.get(id)),
        )
    }

    async fn compare_and_transition(
        &self,
        trip_id: Uuid,
        seat_ids: &[Uuid],
        from: SeatState,
        to: SeatState,
        extra: TransitionExtra,
    ) -> ReservationResult<bool> {
        validate(from, to, &extra)?;
        let mut state = self.state.lock().await;
        let records = state
            .records
            .get_mut(&trip_id)
            .ok_or(ReservationError::TripNotInitialized(trip_id))?;

        // Verify first: every seat must match `from`, or nothing moves.
        for seat_id in seat_ids {
            match records.get(seat_id) {
                Some(record) if record.state == from => {}
                _ => return Ok(false),
            }
        }

        let now = Utc::now();
        for seat_id in seat_ids {
            if let Some(record) = records.get_mut(seat_id) {
                apply(record, to, extra, now);
            }
        }
        Ok(true)
    }

    async fn transition_where(
        &self,
        trip_id: Uuid,
        seat_ids: &[Uuid],
        from: SeatState,
        to: SeatState,
        extra: TransitionExtra,
    ) -> ReservationResult<u64> {
        validate(from, to, &extra)?;
        let mut state = self.state.lock().await;
        let records = state
            .records
            .get_mut(&trip_id)
            .ok_or(ReservationError::TripNotInitialized(trip_id))?;

        let now = Utc::now();
        let mut moved = 0;
        for seat_id in seat_ids {
            if let Some(record) = records.get_mut(seat_id) {
                if record.state == from {
                    apply(record, to, extra, now);
                    moved += 1;
                }
            }
        }
        Ok(moved)
    }

    async fn sweep_expired(
        &self,
        trip_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> ReservationResult<u64> {
        let mut state = self.state.lock().await;
        let mut reclaimed = 0;
        let trips: Vec<Uuid> = match trip_id {
            // A trip with no inventory has nothing to reclaim.
            Some(id) => state.records.keys().filter(|t| **t == id).copied().collect(),
            None => state.records.keys().copied().collect(),
        };
        for trip in trips {
            if let Some(records) = state.records.get_mut(&trip) {
                for record in records.values_mut() {
                    if record.is_stale_hold(now) {
                        apply(record, SeatState::Available, TransitionExtra::None, now);
                        reclaimed += 1;
                    }
                }
            }
        }
        Ok(reclaimed)
    }
}
