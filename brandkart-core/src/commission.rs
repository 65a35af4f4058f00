use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use brandkart_shared::money::Bps;

use crate::CoreResult;

/// Versioned commission configuration, read once per settlement run so a
/// mid-run config change cannot split one batch across two rate sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionSnapshot {
    pub version: u64,
    pub default_bps: Bps,
    /// Category-level rates keyed by category slug.
    pub category_bps: HashMap<String, Bps>,
    /// Partner-negotiated overrides, highest precedence.
    pub partner_override_bps: HashMap<Uuid, Bps>,
}

impl CommissionSnapshot {
    /// Rate for one settled order: partner override, else the order's
    /// category rate, else the global default.
    pub fn resolve(&self, partner_id: Uuid, category_slug: Option<&str>) -> Bps {
        if let Some(rate) = self.partner_override_bps.get(&partner_id) {
            return *rate;
        }
        if let Some(rate) = category_slug.and_then(|slug| self.category_bps.get(slug)) {
            return *rate;
        }
        self.default_bps
    }
}

/// Source of the active commission configuration.
#[async_trait]
pub trait CommissionSource: Send + Sync {
    async fn active_snapshot(&self) -> CoreResult<CommissionSnapshot>;
}

/// Fixed snapshot source for tests and the worker demo.
pub struct FixedCommissionSource {
    snapshot: CommissionSnapshot,
}

impl FixedCommissionSource {
    pub fn new(snapshot: CommissionSnapshot) -> Self {
        Self { snapshot }
    }
}

#[async_trait]
impl CommissionSource for FixedCommissionSource {
    async fn active_snapshot(&self) -> CoreResult<CommissionSnapshot> {
        Ok(self.snapshot.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brandkart_shared::money::percent;

    #[test]
    fn test_resolution_precedence() {
        let partner = Uuid::new_v4();
        let other = Uuid::new_v4();
        let snapshot = CommissionSnapshot {
            version: 3,
            default_bps: percent(20),
            category_bps: HashMap::from([("apparel".to_string(), percent(18))]),
            partner_override_bps: HashMap::from([(partner, percent(12))]),
        };

        assert_eq!(snapshot.resolve(partner, Some("apparel")), percent(12));
        assert_eq!(snapshot.resolve(other, Some("apparel")), percent(18));
        assert_eq!(snapshot.resolve(other, Some("drinkware")), percent(20));
        assert_eq!(snapshot.resolve(other, None), percent(20));
    }
}
