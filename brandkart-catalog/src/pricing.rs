//! Quantity-tiered pricing.
//!
//! Pure arithmetic: the same tiers, quantity, discount and fee always yield
//! the same quote. Nothing here touches a repository or a clock.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use brandkart_shared::money::{less_bps, Bps, Paise};

use crate::product::PricingTier;

/// Orders above this quantity go through a manual quote, not the engine.
pub const MAX_ORDER_QTY: u32 = 10_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("Quantity {0} outside the allowed range 1..={MAX_ORDER_QTY}")]
    InvalidQuantity(u32),

    #[error("No pricing tier covers quantity {0}")]
    NoMatchingTier(u32),
}

/// Result of pricing one line at a given quantity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriceQuote {
    /// Tier price after discount, per unit.
    pub unit_price_paise: Paise,
    /// Discounted unit price × quantity.
    pub subtotal_paise: Paise,
    /// Customization fee × quantity.
    pub customization_total_paise: Paise,
    /// Subtotal plus customization total.
    pub total_paise: Paise,
}

/// Price `quantity` units against a tier table.
///
/// Selects the tier covering the quantity; a quantity above every bounded
/// tier lands in the last tier only if that tier is open-ended. The discount
/// applies to the tier price per unit, then the per-unit customization fee
/// is added on top.
pub fn quote(
    quantity: u32,
    tiers: &[PricingTier],
    discount_bps: Bps,
    customization_fee_paise: Paise,
) -> Result<PriceQuote, PricingError> {
    if quantity < 1 || quantity > MAX_ORDER_QTY {
        return Err(PricingError::InvalidQuantity(quantity));
    }

    let tier = tiers
        .iter()
        .find(|t| t.covers(quantity))
        .ok_or(PricingError::NoMatchingTier(quantity))?;

    let unit_price_paise = less_bps(tier.unit_price_paise, discount_bps);
    let subtotal_paise = unit_price_paise * quantity as Paise;
    let customization_total_paise = customization_fee_paise * quantity as Paise;

    Ok(PriceQuote {
        unit_price_paise,
        subtotal_paise,
        customization_total_paise,
        total_paise: subtotal_paise + customization_total_paise,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use brandkart_shared::money::percent;

    fn sample_tiers() -> Vec<PricingTier> {
        vec![
            PricingTier::new(1, Some(9), 10_000),
            PricingTier::new(10, Some(49), 9_000),
            PricingTier::new(50, None, 8_000),
        ]
    }

    #[test]
    fn test_tier_selection_boundaries() {
        let tiers = sample_tiers();
        assert_eq!(quote(9, &tiers, 0, 0).unwrap().unit_price_paise, 10_000);
        assert_eq!(quote(10, &tiers, 0, 0).unwrap().unit_price_paise, 9_000);
        assert_eq!(quote(1_000, &tiers, 0, 0).unwrap().unit_price_paise, 8_000);
    }

    #[test]
    fn test_discount_and_customization_fee() {
        // 20 × (90.00 × 0.9 + 5.00) = 1720.00
        let tiers = sample_tiers();
        let q = quote(20, &tiers, percent(10), 500).unwrap();
        assert_eq!(q.unit_price_paise, 8_100);
        assert_eq!(q.subtotal_paise, 162_000);
        assert_eq!(q.customization_total_paise, 10_000);
        assert_eq!(q.total_paise, 172_000);
    }

    #[test]
    fn test_quantity_out_of_range() {
        let tiers = sample_tiers();
        assert_eq!(
            quote(0, &tiers, 0, 0),
            Err(PricingError::InvalidQuantity(0))
        );
        assert_eq!(
            quote(10_001, &tiers, 0, 0),
            Err(PricingError::InvalidQuantity(10_001))
        );
    }

    #[test]
    fn test_malformed_tier_table() {
        // Bounded top tier: quantities above it have no price
        let tiers = vec![
            PricingTier::new(1, Some(9), 10_000),
            PricingTier::new(10, Some(49), 9_000),
        ];
        assert_eq!(quote(50, &tiers, 0, 0), Err(PricingError::NoMatchingTier(50)));
    }

    #[test]
    fn test_deterministic() {
        let tiers = sample_tiers();
        let a = quote(25, &tiers, percent(5), 250).unwrap();
        let b = quote(25, &tiers, percent(5), 250).unwrap();
        assert_eq!(a, b);
    }
}
