use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;
use viaro_domain::{BookingDirectory, ReservationResult, TripDirectory};

/// In-memory trip -> vehicle binding, for embedders that keep their trip
/// schedule elsewhere and for tests.
pub struct StaticTripDirectory {
    bindings: RwLock<HashMap<Uuid, Uuid>>,
}

impl StaticTripDirectory {
    pub fn new() -> Self {
        Self {
            bindings: RwLock::new(HashMap::new()),
        }
    }

    /// Bind a trip to the vehicle serving it.
    pub async fn bind(&self, trip_id: Uuid, vehicle_id: Uuid) {
        self.bindings.write().await.insert(trip_id, vehicle_id);
    }
}

impl Default for StaticTripDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TripDirectory for StaticTripDirectory {
    async fn vehicle_for_trip(&self, trip_id: Uuid) -> ReservationResult<Option<Uuid>> {
        Ok(self.bindings.read().await.get(&trip_id).copied())
    }
}

/// In-memory booking reference -> customer display name mapping.
pub struct StaticBookingDirectory {
    names: RwLock<HashMap<Uuid, String>>,
}

impl StaticBookingDirectory {
    pub fn new() -> Self {
        Self {
            names: RwLock::new(HashMap::new()),
        }
    }

    pub async fn record(&self, booking_ref: Uuid, name: impl Into<String>) {
        self.names.write().await.insert(booking_ref, name.into());
    }
}

impl Default for StaticBookingDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BookingDirectory for StaticBookingDirectory {
    async fn display_name(&self, booking_ref: Uuid) -> ReservationResult<Option<String>> {
        Ok(self.names.read().await.get(&booking_ref).cloned())
    }
}
