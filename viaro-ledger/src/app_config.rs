use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub business_rules: BusinessRules,
}

/// Tunables of the reservation flow. Defaults match the booking UX:
/// ten minutes to pay for a selection, stale holds swept once a minute.
#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    #[serde(default = "default_hold_minutes")]
    pub seat_hold_minutes: u64,
    #[serde(default = "default_sweep_seconds")]
    pub sweep_interval_seconds: u64,
}

fn default_hold_minutes() -> u64 {
    10
}

fn default_sweep_seconds() -> u64 {
    60
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            seat_hold_minutes: default_hold_minutes(),
            sweep_interval_seconds: default_sweep_seconds(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `VIARO__BUSINESS_RULES__SEAT_HOLD_MINUTES=5`
            .add_source(config::Environment::with_prefix("VIARO").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
