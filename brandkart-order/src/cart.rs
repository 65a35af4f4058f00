use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use brandkart_catalog::pricing::{quote, PricingError};
use brandkart_catalog::product::Product;
use brandkart_shared::money::{Bps, Paise};

/// A cart belongs to a signed-in user or a guest session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CartOwner {
    User(String),
    Guest(String),
}

#[derive(Debug, Error)]
pub enum CartError {
    #[error("Cart is empty")]
    Empty,

    #[error("Cart item not found: {0}")]
    ItemNotFound(Uuid),

    #[error("Cart item {0} does not reference product {1}")]
    ProductMismatch(Uuid, Uuid),

    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// One line in the cart. Priced through the catalog pricing engine; the
/// subtotal is recomputed on every mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_slug: String,
    pub category_slug: String,
    pub image_url: Option<String>,
    pub customization_id: Option<Uuid>,
    pub quantity: u32,
    pub tier_unit_price_paise: Paise,
    pub unit_price_paise: Paise,
    pub discount_bps: Bps,
    pub customization_fee_paise: Paise,
    pub subtotal_paise: Paise,
}

impl CartItem {
    fn reprice(&mut self, product: &Product, quantity: u32) -> Result<(), CartError> {
        let q = quote(
            quantity,
            &product.tiers,
            product.discount_bps(),
            product.customization_fee_paise,
        )?;
        // Tier price before discount, for the order's discount breakdown
        let tier = product
            .tiers
            .iter()
            .find(|t| t.covers(quantity))
            .map(|t| t.unit_price_paise)
            .unwrap_or(q.unit_price_paise);
        self.quantity = quantity;
        self.tier_unit_price_paise = tier;
        self.unit_price_paise = q.unit_price_paise;
        self.discount_bps = product.discount_bps();
        self.customization_fee_paise = product.customization_fee_paise;
        self.subtotal_paise = q.total_paise;
        Ok(())
    }
}

/// Mutable pre-checkout collection of line items. One per owner; created on
/// first add, emptied after checkout, never deleted in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub id: Uuid,
    pub owner: CartOwner,
    pub items: Vec<CartItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn new(owner: CartOwner) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Add `quantity` units of a product. An existing line with the same
    /// (product, customization) pair is incremented instead of duplicated.
    pub fn add_item(
        &mut self,
        product: &Product,
        customization_id: Option<Uuid>,
        quantity: u32,
    ) -> Result<&CartItem, CartError> {
        let existing = self
            .items
            .iter()
            .position(|i| i.product_id == product.id && i.customization_id == customization_id);

        let idx = match existing {
            Some(idx) => {
                let merged_qty = self.items[idx].quantity + quantity;
                self.items[idx].reprice(product, merged_qty)?;
                idx
            }
            None => {
                let mut item = CartItem {
                    id: Uuid::new_v4(),
                    product_id: product.id,
                    product_name: product.name.clone(),
                    product_slug: product.slug.clone(),
                    category_slug: slug_for(product),
                    image_url: product.image_url.clone(),
                    customization_id,
                    quantity: 0,
                    tier_unit_price_paise: 0,
                    unit_price_paise: 0,
                    discount_bps: 0,
                    customization_fee_paise: 0,
                    subtotal_paise: 0,
                };
                item.reprice(product, quantity)?;
                self.items.push(item);
                self.items.len() - 1
            }
        };
        self.updated_at = Utc::now();
        Ok(&self.items[idx])
    }

    /// Change a line's quantity, repricing it through the engine.
    pub fn update_quantity(
        &mut self,
        item_id: Uuid,
        quantity: u32,
        product: &Product,
    ) -> Result<(), CartError> {
        let item = self
            .items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or(CartError::ItemNotFound(item_id))?;
        if item.product_id != product.id {
            return Err(CartError::ProductMismatch(item_id, product.id));
        }
        item.reprice(product, quantity)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn remove_item(&mut self, item_id: Uuid) -> Result<(), CartError> {
        let idx = self
            .items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or(CartError::ItemNotFound(item_id))?;
        self.items.remove(idx);
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn subtotal_paise(&self) -> Paise {
        self.items.iter().map(|i| i.subtotal_paise).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Read-only snapshot for checkout. Does not mutate the cart; the
    /// caller clears it separately once the order is persisted.
    pub fn checkout_snapshot(&self) -> Result<Vec<CartItem>, CartError> {
        if self.items.is_empty() {
            return Err(CartError::Empty);
        }
        Ok(self.items.clone())
    }

    /// Empty the cart after a successful checkout.
    pub fn clear(&mut self) {
        self.items.clear();
        self.updated_at = Utc::now();
    }
}

fn slug_for(product: &Product) -> String {
    format!("{:?}", product.category).to_lowercase()
}
