use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use viaro_domain::{Seat, SeatStore};

use crate::layout::generate_labels;
use crate::CatalogError;

/// One-time seat provisioning for vehicles. Generates the deterministic
/// label set for a vehicle's seat count and persists it through the
/// seat store.
pub struct SeatCatalog {
    seats: Arc<dyn SeatStore>,
}

impl SeatCatalog {
    pub fn new(seats: Arc<dyn SeatStore>) -> Self {
        Self { seats }
    }

    /// Create the seats for a newly registered vehicle. Runs once per
    /// vehicle: a second call fails with `AlreadyProvisioned`.
    pub async fn provision_vehicle(
        &self,
        vehicle_id: Uuid,
        seat_count: u32,
    ) -> Result<Vec<Seat>, CatalogError> {
        let existing = self.seats.seats_for_vehicle(vehicle_id).await?;
        if !existing.is_empty() {
            return Err(CatalogError::AlreadyProvisioned(vehicle_id));
        }

        let labels = generate_labels(seat_count)?;
        let seats: Vec<Seat> = labels
            .into_iter()
            .map(|label| Seat::new(vehicle_id, label))
            .collect();

        self.seats.insert_seats(vehicle_id, seats.clone()).await?;
        info!("Provisioned {} seats for vehicle {}", seats.len(), vehicle_id);
        Ok(seats)
    }

    /// All seats of a vehicle, canonical order.
    pub async fn seats_for_vehicle(&self, vehicle_id: Uuid) -> Result<Vec<Seat>, CatalogError> {
        Ok(self.seats.seats_for_vehicle(vehicle_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viaro_ledger::MemoryLedger;

    fn catalog() -> SeatCatalog {
        SeatCatalog::new(Arc::new(MemoryLedger::new()))
    }

    #[tokio::test]
    async fn test_provision_persists_canonical_layout() {
        let catalog = catalog();
        let vehicle_id = Uuid::new_v4();

        let seats = catalog.provision_vehicle(vehicle_id, 45).await.unwrap();
        assert_eq!(seats.len(), 45);

        let stored = catalog.seats_for_vehicle(vehicle_id).await.unwrap();
        assert_eq!(stored.len(), 45);
        assert_eq!(stored[0].label.to_string(), "A1");
        assert_eq!(stored[44].label.to_string(), "B22");
        assert!(stored.iter().all(|s| s.vehicle_id == vehicle_id));
    }

    #[tokio::test]
    async fn test_provision_is_one_time() {
        let catalog = catalog();
        let vehicle_id = Uuid::new_v4();

        catalog.provision_vehicle(vehicle_id, 4).await.unwrap();
        let err = catalog.provision_vehicle(vehicle_id, 4).await.unwrap_err();
        assert!(matches!(err, CatalogError::AlreadyProvisioned(v) if v == vehicle_id));

        // The first layout is untouched.
        assert_eq!(catalog.seats_for_vehicle(vehicle_id).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_provision_rejects_empty_layout() {
        let catalog = catalog();
        let err = catalog
            .provision_vehicle(Uuid::new_v4(), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::EmptyLayout));
    }
}
