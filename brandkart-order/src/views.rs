//! Boundary output types.
//!
//! Two distinct structs instead of field-level hiding on one shared type:
//! a field added to `Order` stays internal until someone deliberately maps
//! it into `ClientOrderView`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use brandkart_catalog::delivery::DeliveryOption;
use brandkart_catalog::tax::GstBreakdown;
use brandkart_shared::money::Paise;

use crate::models::{DeliveryAddress, Order, OrderItem, PartnerAssignment};

/// One history entry as shown to the customer. Carries the display name
/// and public description only; internal notes never reach this type.
#[derive(Debug, Clone, Serialize)]
pub struct ClientHistoryEntry {
    pub status: &'static str,
    pub description: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientOrderItemView {
    pub product_name: String,
    pub product_slug: String,
    pub image_url: Option<String>,
    pub customized: bool,
    pub quantity: u32,
    pub unit_price_paise: Paise,
    pub subtotal_paise: Paise,
}

/// What the customer sees. No partner reference, no version counter, no
/// internal notes, and statuses in display vocabulary.
#[derive(Debug, Clone, Serialize)]
pub struct ClientOrderView {
    pub order_number: String,
    pub status: &'static str,
    pub items: Vec<ClientOrderItemView>,
    pub delivery_address: DeliveryAddress,
    pub delivery_option: DeliveryOption,
    pub estimated_delivery_from: DateTime<Utc>,
    pub estimated_delivery_to: DateTime<Utc>,
    pub original_subtotal_paise: Paise,
    pub discount_paise: Paise,
    pub subtotal_paise: Paise,
    pub gst: GstBreakdown,
    pub delivery_charge_paise: Paise,
    pub total_paise: Paise,
    pub history: Vec<ClientHistoryEntry>,
    pub created_at: DateTime<Utc>,
}

impl ClientOrderView {
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_number: order.order_number.clone(),
            status: order.status.display_name(),
            items: order.items.iter().map(client_item).collect(),
            delivery_address: order.delivery_address.clone(),
            delivery_option: order.delivery_option,
            estimated_delivery_from: order.estimated_delivery_from,
            estimated_delivery_to: order.estimated_delivery_to,
            original_subtotal_paise: order.original_subtotal_paise,
            discount_paise: order.discount_paise,
            subtotal_paise: order.subtotal_paise,
            gst: order.gst.clone(),
            delivery_charge_paise: order.delivery_charge_paise,
            total_paise: order.total_paise,
            history: order
                .history
                .iter()
                .map(|h| ClientHistoryEntry {
                    status: h.status.display_name(),
                    description: h.description.clone(),
                    at: h.created_at,
                })
                .collect(),
            created_at: order.created_at,
        }
    }
}

fn client_item(item: &OrderItem) -> ClientOrderItemView {
    ClientOrderItemView {
        product_name: item.product_name.clone(),
        product_slug: item.product_slug.clone(),
        image_url: item.image_url.clone(),
        customized: item.customization_id.is_some(),
        quantity: item.quantity,
        unit_price_paise: item.unit_price_paise,
        subtotal_paise: item.subtotal_paise,
    }
}

/// Admin/ops view: the full order plus the live partner assignment.
#[derive(Debug, Clone, Serialize)]
pub struct InternalOrderView {
    pub order: Order,
    pub partner_id: Option<Uuid>,
    pub live_assignment: Option<PartnerAssignment>,
}

impl InternalOrderView {
    pub fn new(order: Order, live_assignment: Option<PartnerAssignment>) -> Self {
        Self {
            partner_id: order.partner_id,
            order,
            live_assignment,
        }
    }
}
