use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::reservation::{InitOutcome, SeatMapEntry, SeatState, TransitionExtra};
use crate::seat::{Seat, SeatLabel};
use crate::ReservationResult;

/// Storage for the physical seats of a vehicle.
#[async_trait]
pub trait SeatStore: Send + Sync {
    /// Persist generated seats for a vehicle. Fails if the vehicle
    /// already has seats (provisioning is one-time).
    async fn insert_seats(&self, vehicle_id: Uuid, seats: Vec<Seat>) -> ReservationResult<()>;

    /// All seats of a vehicle in canonical label order.
    async fn seats_for_vehicle(&self, vehicle_id: Uuid) -> ReservationResult<Vec<Seat>>;

    /// Resolve labels to seats, scoped to one vehicle. Returns only the
    /// seats that exist; the caller decides whether misses are an error.
    async fn resolve_labels(
        &self,
        vehicle_id: Uuid,
        labels: &[SeatLabel],
    ) -> ReservationResult<Vec<Seat>>;
}

/// The reservation ledger: per-(trip, seat) lifecycle records and the
/// atomic transition primitives every booking operation is built on.
///
/// `compare_and_transition` is the only place mutual exclusion lives.
/// Implementations MUST apply the state check and the write as one
/// atomic storage operation (a single state-filtered multi-record
/// update, or an equivalent transaction). Reading state, checking it in
/// application memory and writing back is a race and is forbidden.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Bulk-create one Available record per seat. Idempotent: if any
    /// record already exists for the trip, nothing is written and
    /// `AlreadyInitialized` is returned.
    async fn initialize(&self, trip_id: Uuid, seat_ids: &[Uuid]) -> ReservationResult<InitOutcome>;

    /// All records of a trip in canonical seat order.
    /// `TripNotInitialized` if the trip has no records.
    async fn find_by_trip(&self, trip_id: Uuid) -> ReservationResult<Vec<SeatMapEntry>>;

    /// Records for a subset of seats, canonical order. Used to report
    /// which exact seats lost a race.
    async fn find_by_seats(
        &self,
        trip_id: Uuid,
        seat_ids: &[Uuid],
    ) -> ReservationResult<Vec<SeatMapEntry>>;

    /// All-or-nothing transition: moves EVERY listed seat from `from` to
    /// `to` and returns Ok(true), or changes nothing and returns
    /// Ok(false) if any seat is not currently in `from`. An illegal
    /// (from, to) pair is `InvalidTransition`.
    async fn compare_and_transition(
        &self,
        trip_id: Uuid,
        seat_ids: &[Uuid],
        from: SeatState,
        to: SeatState,
        extra: TransitionExtra,
    ) -> ReservationResult<bool>;

    /// Best-effort variant: transitions only the listed seats currently
    /// in `from`, skipping the rest, and returns the count moved. Backs
    /// idempotent release.
    async fn transition_where(
        &self,
        trip_id: Uuid,
        seat_ids: &[Uuid],
        from: SeatState,
        to: SeatState,
        extra: TransitionExtra,
    ) -> ReservationResult<u64>;

    /// Reclaim every Held record whose expiry is before `now`, globally
    /// or scoped to one trip. Returns the count reclaimed.
    async fn sweep_expired(
        &self,
        trip_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> ReservationResult<u64>;
}

/// Collaborator resolving which vehicle serves a trip. Seat labels are
/// only meaningful per vehicle, so every label lookup goes through this
/// binding first.
#[async_trait]
pub trait TripDirectory: Send + Sync {
    async fn vehicle_for_trip(&self, trip_id: Uuid) -> ReservationResult<Option<Uuid>>;
}

/// Optional collaborator mapping a booking reference to a display name
/// for the seat map. Absence or failure degrades to no name.
#[async_trait]
pub trait BookingDirectory: Send + Sync {
    async fn display_name(&self, booking_ref: Uuid) -> ReservationResult<Option<String>>;
}
