use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use brandkart_shared::money::Paise;

/// Delivery options offered at checkout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryOption {
    Standard,
    Express,
}

/// Charges and transit-day ranges per delivery option, read from config.
/// Kept as data so the option enum stays a plain tag (no embedded charges).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRates {
    pub standard_charge_paise: Paise,
    pub standard_days_min: i64,
    pub standard_days_max: i64,
    pub express_charge_paise: Paise,
    pub express_days_min: i64,
    pub express_days_max: i64,
}

impl Default for DeliveryRates {
    fn default() -> Self {
        Self {
            standard_charge_paise: 5_000,
            standard_days_min: 5,
            standard_days_max: 7,
            express_charge_paise: 15_000,
            express_days_min: 2,
            express_days_max: 3,
        }
    }
}

impl DeliveryOption {
    /// Base delivery charge under the given rate card.
    pub fn charge_paise(&self, rates: &DeliveryRates) -> Paise {
        match self {
            DeliveryOption::Standard => rates.standard_charge_paise,
            DeliveryOption::Express => rates.express_charge_paise,
        }
    }

    /// Estimated delivery window starting from `placed_at`.
    pub fn estimate(
        &self,
        rates: &DeliveryRates,
        placed_at: DateTime<Utc>,
    ) -> (DateTime<Utc>, DateTime<Utc>) {
        let (min, max) = match self {
            DeliveryOption::Standard => (rates.standard_days_min, rates.standard_days_max),
            DeliveryOption::Express => (rates.express_days_min, rates.express_days_max),
        };
        (placed_at + Duration::days(min), placed_at + Duration::days(max))
    }
}
