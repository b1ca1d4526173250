use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;
use viaro_domain::{
    BookingDirectory, InitOutcome, ReservationError, ReservationEvent, ReservationResult,
    ReservationStore, Seat, SeatLabel, SeatMapEntry, SeatState, SeatStore, TransitionExtra,
    TripDirectory,
};
use viaro_ledger::app_config::BusinessRules;

/// A successful seat selection: the labels now held and the instant the
/// hold lapses unless confirmed.
#[derive(Debug, Clone, Serialize)]
pub struct HeldSeats {
    pub labels: Vec<SeatLabel>,
    pub expires_at: DateTime<Utc>,
}

/// The booking-facing state machine over the reservation ledger.
///
/// Holds no seat state of its own and takes no in-process locks; every
/// mutation funnels into the ledger's atomic compare-and-transition, and
/// every operation starts with an expiry sweep so stale holds never
/// block a live caller.
#[derive(Clone)]
pub struct HoldManager {
    ledger: Arc<dyn ReservationStore>,
    seats: Arc<dyn SeatStore>,
    trips: Arc<dyn TripDirectory>,
    bookings: Option<Arc<dyn BookingDirectory>>,
    hold_ttl: Duration,
    events: Option<broadcast::Sender<ReservationEvent>>,
}

impl HoldManager {
    pub fn new(
        ledger: Arc<dyn ReservationStore>,
        seats: Arc<dyn SeatStore>,
        trips: Arc<dyn TripDirectory>,
    ) -> Self {
        Self {
            ledger,
            seats,
            trips,
            bookings: None,
            hold_ttl: Duration::minutes(BusinessRules::default().seat_hold_minutes as i64),
            events: None,
        }
    }

    /// Enrich booked seats on the seat map with customer display names.
    pub fn with_booking_directory(mut self, bookings: Arc<dyn BookingDirectory>) -> Self {
        self.bookings = Some(bookings);
        self
    }

    pub fn with_business_rules(mut self, rules: &BusinessRules) -> Self {
        self.hold_ttl = Duration::minutes(rules.seat_hold_minutes as i64);
        self
    }

    /// Fan reservation lifecycle events out to the given channel.
    pub fn with_event_channel(mut self, events: broadcast::Sender<ReservationEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Create the Available records for a trip once its vehicle is
    /// assigned. Idempotent: a second call reports `AlreadyInitialized`
    /// and writes nothing.
    pub async fn initialize_inventory(
        &self,
        trip_id: Uuid,
        vehicle_id: Uuid,
    ) -> ReservationResult<InitOutcome> {
        let seats = self.seats.seats_for_vehicle(vehicle_id).await?;
        if seats.is_empty() {
            return Err(ReservationError::VehicleNotProvisioned(vehicle_id));
        }
        let seat_ids: Vec<Uuid> = seats.iter().map(|s| s.id).collect();
        let outcome = self.ledger.initialize(trip_id, &seat_ids).await?;
        if outcome == InitOutcome::AlreadyInitialized {
            info!("Seat inventory already initialized for trip {}", trip_id);
        }
        Ok(outcome)
    }

    /// Hold seats for the caller. On success the seats are Held until
    /// `expires_at`; the caller must confirm (or release) before then.
    ///
    /// Losing a race for a seat is a normal outcome, reported as
    /// `SeatUnavailable` naming exactly the seats that were not
    /// Available, so the caller can re-fetch the map and pick again.
    pub async fn select_seats(
        &self,
        trip_id: Uuid,
        labels: &[SeatLabel],
        ttl: Option<Duration>,
    ) -> ReservationResult<HeldSeats> {
        self.sweep_expired(Some(trip_id)).await?;
        let seats = self.resolve_seats(trip_id, labels).await?;
        let seat_ids: Vec<Uuid> = seats.iter().map(|s| s.id).collect();

        let expires_at = Utc::now() + ttl.unwrap_or(self.hold_ttl);
        let moved = self
            .ledger
            .compare_and_transition(
                trip_id,
                &seat_ids,
                SeatState::Available,
                SeatState::Held,
                TransitionExtra::Hold { expires_at },
            )
            .await?;

        if !moved {
            // Lost the race. Re-query so the caller learns which seats.
            let entries = self.ledger.find_by_seats(trip_id, &seat_ids).await?;
            let mut conflicts: Vec<String> = entries
                .iter()
                .filter(|e| e.state != SeatState::Available)
                .map(|e| e.label.to_string())
                .collect();
            if conflicts.is_empty() {
                // The winning hold was already released again before the
                // re-query; name the requested seats rather than nothing.
                conflicts = seats.iter().map(|s| s.label.to_string()).collect();
            }
            return Err(ReservationError::SeatUnavailable { labels: conflicts });
        }

        let labels: Vec<SeatLabel> = seats.iter().map(|s| s.label).collect();
        info!(
            "Held {} seats on trip {} until {}",
            labels.len(),
            trip_id,
            expires_at
        );
        self.emit(ReservationEvent::SeatsHeld {
            trip_id,
            labels: labels.iter().map(|l| l.to_string()).collect(),
            expires_at: expires_at.timestamp(),
        });
        Ok(HeldSeats { labels, expires_at })
    }

    /// Give held seats back. Best-effort cleanup: seats that are not
    /// currently Held (never selected, or already reclaimed) are
    /// silently skipped, as are labels that do not resolve.
    pub async fn release_seats(&self, trip_id: Uuid, labels: &[SeatLabel]) -> ReservationResult<u64> {
        self.sweep_expired(Some(trip_id)).await?;
        let vehicle_id = self.vehicle_for(trip_id).await?;
        let seats = self.seats.resolve_labels(vehicle_id, labels).await?;
        let seat_ids: Vec<Uuid> = seats.iter().map(|s| s.id).collect();

        let released = self
            .ledger
            .transition_where(
                trip_id,
                &seat_ids,
                SeatState::Held,
                SeatState::Available,
                TransitionExtra::None,
            )
            .await?;
        if released > 0 {
            info!("Released {} seats on trip {}", released, trip_id);
            self.emit(ReservationEvent::SeatsReleased { trip_id, released });
        }
        Ok(released)
    }

    /// Turn a live hold into a booking. Fails with `HoldExpiredOrMissing`
    /// unless every seat is still Held -- the leading sweep reclaims
    /// lapsed holds first, so an expired hold cannot be confirmed even
    /// if nobody swept in between.
    pub async fn confirm_booking(
        &self,
        trip_id: Uuid,
        labels: &[SeatLabel],
        booking_ref: Uuid,
    ) -> ReservationResult<()> {
        self.sweep_expired(Some(trip_id)).await?;
        let seats = self.resolve_seats(trip_id, labels).await?;
        let seat_ids: Vec<Uuid> = seats.iter().map(|s| s.id).collect();

        let moved = self
            .ledger
            .compare_and_transition(
                trip_id,
                &seat_ids,
                SeatState::Held,
                SeatState::Booked,
                TransitionExtra::Booking { booking_ref },
            )
            .await?;
        if !moved {
            return Err(ReservationError::HoldExpiredOrMissing);
        }

        info!(
            "Confirmed booking {} for {} seats on trip {}",
            booking_ref,
            seat_ids.len(),
            trip_id
        );
        self.emit(ReservationEvent::BookingConfirmed {
            trip_id,
            labels: seats.iter().map(|s| s.label.to_string()).collect(),
            booking_ref,
        });
        Ok(())
    }

    /// Return booked seats to the pool after an external cancellation or
    /// refund. Cancelling a seat that is not Booked is a defect in the
    /// caller, surfaced as `InvalidTransition` with the seat's actual
    /// state.
    pub async fn cancel_booking(&self, trip_id: Uuid, labels: &[SeatLabel]) -> ReservationResult<u64> {
        self.sweep_expired(Some(trip_id)).await?;
        let seats = self.resolve_seats(trip_id, labels).await?;
        let seat_ids: Vec<Uuid> = seats.iter().map(|s| s.id).collect();

        let moved = self
            .ledger
            .compare_and_transition(
                trip_id,
                &seat_ids,
                SeatState::Booked,
                SeatState::Available,
                TransitionExtra::None,
            )
            .await?;
        if !moved {
            let entries = self.ledger.find_by_seats(trip_id, &seat_ids).await?;
            let from = entries
                .iter()
                .find(|e| e.state != SeatState::Booked)
                .map(|e| e.state)
                .unwrap_or(SeatState::Available);
            return Err(ReservationError::InvalidTransition {
                from,
                to: SeatState::Available,
            });
        }

        let cancelled = seat_ids.len() as u64;
        info!("Cancelled booking for {} seats on trip {}", cancelled, trip_id);
        self.emit(ReservationEvent::BookingCancelled { trip_id, cancelled });
        Ok(cancelled)
    }

    /// Full annotated seat list for a trip in canonical order, with
    /// customer names on booked seats when a booking directory is
    /// configured. Directory failures degrade to a nameless entry.
    pub async fn get_seat_map(&self, trip_id: Uuid) -> ReservationResult<Vec<SeatMapEntry>> {
        self.sweep_expired(Some(trip_id)).await?;
        let mut entries = self.ledger.find_by_trip(trip_id).await?;
        if let Some(bookings) = &self.bookings {
            for entry in entries.iter_mut().filter(|e| e.is_booked) {
                if let Some(booking_ref) = entry.booking_ref {
                    entry.booked_by = bookings.display_name(booking_ref).await.ok().flatten();
                }
            }
        }
        Ok(entries)
    }

    /// Currently-Held seats of a trip, optionally narrowed to a label
    /// subset. Callers use this to verify their hold is still live
    /// before proceeding to payment.
    pub async fn get_selected_seats(
        &self,
        trip_id: Uuid,
        labels: Option<&[SeatLabel]>,
    ) -> ReservationResult<Vec<SeatMapEntry>> {
        self.sweep_expired(Some(trip_id)).await?;
        let entries = match labels {
            Some(labels) => {
                let seats = self.resolve_seats(trip_id, labels).await?;
                let seat_ids: Vec<Uuid> = seats.iter().map(|s| s.id).collect();
                self.ledger.find_by_seats(trip_id, &seat_ids).await?
            }
            None => self.ledger.find_by_trip(trip_id).await?,
        };
        Ok(entries.into_iter().filter(|e| e.is_selected).collect())
    }

    /// Reclaim lapsed holds, trip-scoped or globally. Public so an
    /// out-of-band scheduler can bound staleness for maps nobody is
    /// actively querying.
    pub async fn sweep_expired(&self, trip_id: Option<Uuid>) -> ReservationResult<u64> {
        let reclaimed = self.ledger.sweep_expired(trip_id, Utc::now()).await?;
        if reclaimed > 0 {
            info!("Reclaimed {} expired holds", reclaimed);
            self.emit(ReservationEvent::HoldsExpired { trip_id, reclaimed });
        }
        Ok(reclaimed)
    }

    async fn vehicle_for(&self, trip_id: Uuid) -> ReservationResult<Uuid> {
        self.trips
            .vehicle_for_trip(trip_id)
            .await?
            .ok_or(ReservationError::TripNotFound(trip_id))
    }

    /// Resolve labels against the trip's vehicle, failing with
    /// `SeatNotFound` naming every label that does not exist there.
    /// Duplicate labels in the request are collapsed.
    async fn resolve_seats(
        &self,
        trip_id: Uuid,
        labels: &[SeatLabel],
    ) -> ReservationResult<Vec<Seat>> {
        let vehicle_id = self.vehicle_for(trip_id).await?;
        let mut wanted: Vec<SeatLabel> = Vec::with_capacity(labels.len());
        for label in labels {
            if !wanted.contains(label) {
                wanted.push(*label);
            }
        }

        let seats = self.seats.resolve_labels(vehicle_id, &wanted).await?;
        if seats.len() != wanted.len() {
            let missing = wanted
                .iter()
                .filter(|l| !seats.iter().any(|s| s.label == **l))
                .map(|l| l.to_string())
                .collect();
            return Err(ReservationError::SeatNotFound { labels: missing });
        }
        Ok(seats)
    }

    fn emit(&self, event: ReservationEvent) {
        if let Some(events) = &self.events {
            // Nobody listening is fine.
            let _ = events.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viaro_ledger::{MemoryLedger, StaticTripDirectory};

    async fn setup(seat_count: u32) -> (HoldManager, Uuid) {
        let ledger = Arc::new(MemoryLedger::new());
        let trips = Arc::new(StaticTripDirectory::new());
        let vehicle_id = Uuid::new_v4();
        let trip_id = Uuid::new_v4();

        let seats: Vec<Seat> = (1..=seat_count)
            .map(|n| Seat::new(vehicle_id, SeatLabel::new('A', n)))
            .collect();
        SeatStore::insert_seats(ledger.as_ref(), vehicle_id, seats)
            .await
            .unwrap();
        trips.bind(trip_id, vehicle_id).await;

        let manager = HoldManager::new(ledger.clone(), ledger, trips);
        manager
            .initialize_inventory(trip_id, vehicle_id)
            .await
            .unwrap();
        (manager, trip_id)
    }

    fn labels(raw: &[&str]) -> Vec<SeatLabel> {
        raw.iter().map(|s| s.parse().unwrap()).collect()
    }

    #[tokio::test]
    async fn test_unknown_label_is_seat_not_found() {
        let (manager, trip_id) = setup(4).await;
        let err = manager
            .select_seats(trip_id, &labels(&["A1", "Z9"]), None)
            .await
            .unwrap_err();
        match err {
            ReservationError::SeatNotFound { labels } => assert_eq!(labels, vec!["Z9"]),
            other => panic!("expected SeatNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unbound_trip_is_trip_not_found() {
        let (manager, _) = setup(4).await;
        let err = manager
            .select_seats(Uuid::new_v4(), &labels(&["A1"]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::TripNotFound(_)));
    }

    #[tokio::test]
    async fn test_duplicate_labels_collapse_to_one_hold() {
        let (manager, trip_id) = setup(4).await;
        let held = manager
            .select_seats(trip_id, &labels(&["A1", "A1"]), None)
            .await
            .unwrap();
        assert_eq!(held.labels, labels(&["A1"]));
    }

    #[tokio::test]
    async fn test_vehicle_without_seats_cannot_be_initialized() {
        let ledger = Arc::new(MemoryLedger::new());
        let trips = Arc::new(StaticTripDirectory::new());
        let manager = HoldManager::new(ledger.clone(), ledger, trips);
        let err = manager
            .initialize_inventory(Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::VehicleNotProvisioned(_)));
    }

    #[tokio::test]
    async fn test_selected_seats_filter_by_label_subset() {
        let (manager, trip_id) = setup(4).await;
        manager
            .select_seats(trip_id, &labels(&["A1", "A2"]), None)
            .await
            .unwrap();

        let all = manager.get_selected_seats(trip_id, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let one = manager
            .get_selected_seats(trip_id, Some(&labels(&["A2"])))
            .await
            .unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].label.to_string(), "A2");
    }

    #[tokio::test]
    async fn test_business_rules_set_the_default_ttl() {
        let (manager, trip_id) = setup(2).await;
        let rules = BusinessRules {
            seat_hold_minutes: 5,
            ..BusinessRules::default()
        };
        let manager = manager.with_business_rules(&rules);

        let before = Utc::now();
        let held = manager
            .select_seats(trip_id, &labels(&["A1"]), None)
            .await
            .unwrap();
        let after = Utc::now();
        assert!(held.expires_at >= before + Duration::minutes(5));
        assert!(held.expires_at <= after + Duration::minutes(5));
    }

    /// Ledger that loses every race: compare-and-transition rejects, but
    /// by the time the re-query runs the winning hold is gone again.
    struct ContendedLedger(Arc<MemoryLedger>);

    #[async_trait::async_trait]
    impl ReservationStore for ContendedLedger {
        async fn initialize(
            &self,
            trip_id: Uuid,
            seat_ids: &[Uuid],
        ) -> ReservationResult<InitOutcome> {
            self.0.initialize(trip_id, seat_ids).await
        }

        async fn find_by_trip(&self, trip_id: Uuid) -> ReservationResult<Vec<SeatMapEntry>> {
            self.0.find_by_trip(trip_id).await
        }

        async fn find_by_seats(
            &self,
            trip_id: Uuid,
            seat_ids: &[Uuid],
        ) -> ReservationResult<Vec<SeatMapEntry>> {
            self.0.find_by_seats(trip_id, seat_ids).await
        }

        async fn compare_and_transition(
            &self,
            _trip_id: Uuid,
            _seat_ids: &[Uuid],
            _from: SeatState,
            _to: SeatState,
            _extra: TransitionExtra,
        ) -> ReservationResult<bool> {
            Ok(false)
        }

        async fn transition_where(
            &self,
            trip_id: Uuid,
            seat_ids: &[Uuid],
            from: SeatState,
            to: SeatState,
            extra: TransitionExtra,
        ) -> ReservationResult<u64> {
            self.0.transition_where(trip_id, seat_ids, from, to, extra).await
        }

        async fn sweep_expired(
            &self,
            trip_id: Option<Uuid>,
            now: DateTime<Utc>,
        ) -> ReservationResult<u64> {
            self.0.sweep_expired(trip_id, now).await
        }
    }

    #[tokio::test]
    async fn test_lost_race_with_no_visible_conflict_names_the_request() {
        let ledger = Arc::new(MemoryLedger::new());
        let trips = Arc::new(StaticTripDirectory::new());
        let vehicle_id = Uuid::new_v4();
        let trip_id = Uuid::new_v4();

        let seats: Vec<Seat> = (1..=2)
            .map(|n| Seat::new(vehicle_id, SeatLabel::new('A', n)))
            .collect();
        ledger.insert_seats(vehicle_id, seats).await.unwrap();
        trips.bind(trip_id, vehicle_id).await;

        let manager = HoldManager::new(
            Arc::new(ContendedLedger(ledger.clone())),
            ledger,
            trips,
        );
        manager
            .initialize_inventory(trip_id, vehicle_id)
            .await
            .unwrap();

        // The re-query sees only Available seats, yet the error still
        // tells the caller which seats the request was about.
        let err = manager
            .select_seats(trip_id, &labels(&["A1", "A2"]), None)
            .await
            .unwrap_err();
        match err {
            ReservationError::SeatUnavailable { labels } => {
                assert_eq!(labels, vec!["A1", "A2"]);
            }
            other => panic!("expected SeatUnavailable, got {:?}", other),
        }
    }
}
