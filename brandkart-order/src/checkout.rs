use std::sync::Arc;
use chrono::Utc;
use uuid::Uuid;

use brandkart_catalog::delivery::{DeliveryOption, DeliveryRates};
use brandkart_catalog::tax::{compute_gst, TaxContext};
use brandkart_core::{CoreError, CoreResult};
use brandkart_shared::money::Paise;

use crate::cart::{Cart, CartError};
use crate::models::{
    format_order_number, Actor, DeliveryAddress, Order, OrderItem, OrderStatus,
    OrderStatusHistory,
};
use crate::repository::OrderRepository;

/// Converts a cart snapshot into an immutable order in PENDING_PAYMENT.
///
/// The cart itself is left untouched; callers clear it once the order has
/// been persisted. Double submits are caught by the idempotency-key
/// constraint in the order repository.
pub struct CheckoutService {
    orders: Arc<dyn OrderRepository>,
}

impl CheckoutService {
    pub fn new(orders: Arc<dyn OrderRepository>) -> Self {
        Self { orders }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn checkout(
        &self,
        cart: &Cart,
        customer_id: &str,
        address: DeliveryAddress,
        delivery_option: DeliveryOption,
        delivery_rates: &DeliveryRates,
        tax: &TaxContext,
        idempotency_key: &str,
    ) -> CoreResult<Order> {
        let snapshot = cart.checkout_snapshot().map_err(|e| match e {
            CartError::Empty => CoreError::StateConflict("Cannot check out an empty cart".to_string()),
            other => CoreError::Validation(other.to_string()),
        })?;

        let now = Utc::now();
        let order_id = Uuid::new_v4();

        let items: Vec<OrderItem> = snapshot
            .into_iter()
            .map(|line| OrderItem {
                id: Uuid::new_v4(),
                order_id,
                product_id: line.product_id,
                product_name: line.product_name,
                product_slug: line.product_slug,
                category_slug: line.category_slug,
                image_url: line.image_url,
                customization_id: line.customization_id,
                quantity: line.quantity,
                tier_unit_price_paise: line.tier_unit_price_paise,
                unit_price_paise: line.unit_price_paise,
                discount_bps: line.discount_bps,
                customization_fee_paise: line.customization_fee_paise,
                subtotal_paise: line.subtotal_paise,
            })
            .collect();

        let original_subtotal: Paise = items
            .iter()
            .map(|i| {
                (i.tier_unit_price_paise + i.customization_fee_paise) * i.quantity as Paise
            })
            .sum();
        let subtotal: Paise = items.iter().map(|i| i.subtotal_paise).sum();
        let discount = original_subtotal - subtotal;

        let gst = compute_gst(subtotal, tax);
        let delivery_charge = delivery_option.charge_paise(delivery_rates);
        let total = subtotal + gst.total_paise() + delivery_charge;

        let seq = self.orders.next_order_seq(now.date_naive()).await?;
        let order_number = format_order_number(now.date_naive(), seq);
        let (eta_from, eta_to) = delivery_option.estimate(delivery_rates, now);

        let order = Order {
            id: order_id,
            order_number: order_number.clone(),
            version: 0,
            customer_id: customer_id.to_string(),
            items,
            delivery_address: address,
            delivery_option,
            delivery_charge_paise: delivery_charge,
            estimated_delivery_from: eta_from,
            estimated_delivery_to: eta_to,
            original_subtotal_paise: original_subtotal,
            discount_paise: discount,
            subtotal_paise: subtotal,
            gst,
            total_paise: total,
            currency: "INR".to_string(),
            status: OrderStatus::PendingPayment,
            payment_id: None,
            partner_id: None,
            cancel_reason: None,
            cancelled_by: None,
            cancelled_at: None,
            history: vec![OrderStatusHistory {
                id: Uuid::new_v4(),
                order_id,
                status: OrderStatus::PendingPayment,
                description: "Order placed, awaiting payment".to_string(),
                internal_note: None,
                actor: Actor::Customer,
                created_at: now,
            }],
            created_at: now,
            updated_at: now,
        };

        self.orders.insert(&order, idempotency_key).await?;
        tracing::info!(order_number = %order_number, total_paise = total, "Order created");
        Ok(order)
    }
}
