use serde::{Deserialize, Serialize};
use uuid::Uuid;

use brandkart_shared::money::{Bps, Paise};

/// Merchandise categories carried by the marketplace
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductCategory {
    Apparel,
    Drinkware,
    Stationery,
    Bags,
    TechAccessories,
    Packaging,
}

/// One row of a product's quantity-tiered price table.
///
/// Tiers are kept ascending and non-overlapping; the top tier is open-ended
/// when `max_qty` is `None`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PricingTier {
    pub min_qty: u32,
    pub max_qty: Option<u32>,
    pub unit_price_paise: Paise,
}

impl PricingTier {
    pub fn new(min_qty: u32, max_qty: Option<u32>, unit_price_paise: Paise) -> Self {
        Self {
            min_qty,
            max_qty,
            unit_price_paise,
        }
    }

    /// Whether a quantity falls inside this tier.
    pub fn covers(&self, qty: u32) -> bool {
        qty >= self.min_qty && self.max_qty.map_or(true, |max| qty <= max)
    }
}

/// Catalog product as read at checkout time. Orders snapshot the fields they
/// need; later catalog edits never reach historical orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub category: ProductCategory,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub base_price_paise: Paise,
    pub tiers: Vec<PricingTier>,
    /// Partner-negotiated discount applied on top of the tier price.
    pub partner_discount_bps: Option<Bps>,
    /// Per-unit fee for logo customization, zero when not customizable.
    pub customization_fee_paise: Paise,
    pub is_active: bool,
}

impl Product {
    /// Discount to apply at pricing time; absent means none.
    pub fn discount_bps(&self) -> Bps {
        self.partner_discount_bps.unwrap_or(0)
    }
}
