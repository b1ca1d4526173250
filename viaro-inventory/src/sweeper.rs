use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use viaro_domain::ReservationStore;
use viaro_ledger::app_config::BusinessRules;

/// Spawn the periodic out-of-band sweep. Lazy sweeping inside the hold
/// manager is what guarantees correctness; this task only bounds how
/// stale an idle trip's seat map can get. Abort the handle to stop it.
pub fn start_sweeper(ledger: Arc<dyn ReservationStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it.
        ticker.tick().await;
        info!("Expiry sweeper started, interval {:?}", every);
        loop {
            ticker.tick().await;
            match ledger.sweep_expired(None, Utc::now()).await {
                Ok(0) => {}
                Ok(reclaimed) => info!("Expiry sweep reclaimed {} stale holds", reclaimed),
                // Transient storage trouble; keep ticking.
                Err(e) => warn!("Expiry sweep failed: {}", e),
            }
        }
    })
}

pub fn start_sweeper_with_rules(
    ledger: Arc<dyn ReservationStore>,
    rules: &BusinessRules,
) -> JoinHandle<()> {
    start_sweeper(ledger, Duration::from_secs(rules.sweep_interval_seconds))
}
