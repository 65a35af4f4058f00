use std::sync::Arc;
use uuid::Uuid;

use brandkart_core::{CoreError, CoreResult};

use crate::models::{Actor, Order, OrderStatus};
use crate::repository::OrderRepository;

/// Drives client-facing order status transitions.
///
/// Every applied transition appends exactly one history row and saves the
/// order under an optimistic version check, so a racing webhook and poll
/// cannot both win the same transition.
pub struct OrderManager {
    orders: Arc<dyn OrderRepository>,
}

impl OrderManager {
    pub fn new(orders: Arc<dyn OrderRepository>) -> Self {
        Self { orders }
    }

    pub async fn get(&self, order_id: Uuid) -> CoreResult<Order> {
        self.orders.get(order_id).await
    }

    /// Apply `to` with a status-guard check. Returns the updated order.
    pub async fn transition(
        &self,
        order_id: Uuid,
        to: OrderStatus,
        description: &str,
        internal_note: Option<String>,
        actor: Actor,
    ) -> CoreResult<Order> {
        let mut order = self.orders.get(order_id).await?;
        self.apply(&mut order, to, description, internal_note, actor)
            .await?;
        Ok(order)
    }

    /// `PENDING_PAYMENT → CONFIRMED`, idempotent: confirming an already
    /// confirmed order is a no-op and appends no second history row
    /// (duplicate-webhook safety).
    pub async fn confirm(&self, order_id: Uuid, actor: Actor) -> CoreResult<Order> {
        let mut order = self.orders.get(order_id).await?;
        if order.status == OrderStatus::Confirmed {
            return Ok(order);
        }
        self.apply(
            &mut order,
            OrderStatus::Confirmed,
            "Payment received, order confirmed",
            None,
            actor,
        )
        .await?;
        Ok(order)
    }

    /// Cancel from any non-final state, recording reason and actor.
    pub async fn cancel(
        &self,
        order_id: Uuid,
        reason: &str,
        actor: Actor,
    ) -> CoreResult<Order> {
        let mut order = self.orders.get(order_id).await?;
        if !order.status.can_transition_to(OrderStatus::Cancelled) {
            return Err(CoreError::StateConflict(format!(
                "Order {} in state {:?} cannot be cancelled",
                order.order_number, order.status
            )));
        }
        order.cancel_reason = Some(reason.to_string());
        order.cancelled_by = Some(actor);
        order.cancelled_at = Some(chrono::Utc::now());
        self.apply(
            &mut order,
            OrderStatus::Cancelled,
            "Order cancelled",
            Some(format!("Cancellation reason: {reason}")),
            actor,
        )
        .await?;
        Ok(order)
    }

    /// Record a payment id on the order without a status change.
    pub async fn attach_payment(&self, order_id: Uuid, payment_id: Uuid) -> CoreResult<Order> {
        let mut order = self.orders.get(order_id).await?;
        let expected = order.version;
        order.payment_id = Some(payment_id);
        order.version += 1;
        order.updated_at = chrono::Utc::now();
        self.orders.save(&order, expected).await?;
        Ok(order)
    }

    /// Record the internal partner reference on the order.
    pub async fn attach_partner(&self, order_id: Uuid, partner_id: Uuid) -> CoreResult<Order> {
        let mut order = self.orders.get(order_id).await?;
        let expected = order.version;
        order.partner_id = Some(partner_id);
        order.version += 1;
        order.updated_at = chrono::Utc::now();
        self.orders.save(&order, expected).await?;
        Ok(order)
    }

    /// Mirror a partner-side milestone into the client status machine.
    /// Partner-reported delivery collapses the courier leg: a SHIPPED order
    /// steps through OUT_FOR_DELIVERY before DELIVERED.
    pub async fn mirror_partner_status(
        &self,
        order_id: Uuid,
        to: OrderStatus,
        internal_note: Option<String>,
    ) -> CoreResult<Order> {
        let mut order = self.orders.get(order_id).await?;
        if order.status == to {
            return Ok(order);
        }
        if to == OrderStatus::Delivered && order.status == OrderStatus::Shipped {
            self.apply(
                &mut order,
                OrderStatus::OutForDelivery,
                OrderStatus::OutForDelivery.display_name(),
                None,
                Actor::Partner,
            )
            .await?;
        }
        self.apply(&mut order, to, to.display_name(), internal_note, Actor::Partner)
            .await?;
        Ok(order)
    }

    async fn apply(
        &self,
        order: &mut Order,
        to: OrderStatus,
        description: &str,
        internal_note: Option<String>,
        actor: Actor,
    ) -> CoreResult<()> {
        if !order.status.can_transition_to(to) {
            return Err(CoreError::StateConflict(format!(
                "Order {} cannot move from {:?} to {:?}",
                order.order_number, order.status, to
            )));
        }
        let expected = order.version;
        order.record_transition(to, description, internal_note, actor);
        order.version += 1;
        self.orders.save(order, expected).await?;
        tracing::info!(
            order_number = %order.order_number,
            status = ?to,
            "Order transitioned"
        );
        Ok(())
    }
}
