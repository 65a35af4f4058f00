use serde::Deserialize;
use std::env;

use brandkart_catalog::delivery::DeliveryRates;
use brandkart_shared::money::Bps;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub business_rules: BusinessRules,
    pub delivery: DeliveryRates,
    pub gateway: GatewayConfig,
    pub worker: WorkerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    /// Shared secret used to verify gateway callback signatures.
    pub webhook_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    /// GST rate applied to merchandise, in basis points (1800 = 18%).
    pub gst_rate_bps: Bps,
    /// Warehouse state used for the CGST/SGST vs IGST decision.
    pub seller_state_code: String,
    /// A payment not settled within this window is expired.
    #[serde(default = "default_payment_expiry_minutes")]
    pub payment_expiry_minutes: i64,
    /// Fallback platform commission when no category or partner rate applies.
    pub default_commission_bps: Bps,
    /// Length of a settlement period.
    #[serde(default = "default_settlement_period_days")]
    pub settlement_period_days: i64,
}

fn default_payment_expiry_minutes() -> i64 {
    15
}

fn default_settlement_period_days() -> i64 {
    7
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkerConfig {
    pub payment_sweep_interval_secs: u64,
    pub settlement_interval_secs: u64,
    /// Partners the settlement loop batches for. Empty disables the loop.
    #[serde(default)]
    pub settlement_partners: Vec<uuid::Uuid>,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Environment-specific file, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // BRANDKART__BUSINESS_RULES__GST_RATE_BPS=1800 etc.
            .add_source(config::Environment::with_prefix("BRANDKART").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
