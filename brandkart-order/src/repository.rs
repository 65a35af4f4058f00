//! Data-access seams for the order engine.
//!
//! Implementations (see brandkart-store) own the concurrency guards: the
//! checkout idempotency-key constraint, the optimistic order version check,
//! the single-live-assignment rule and the settlement order-claim
//! constraint all live behind these traits.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use brandkart_core::CoreResult;

use crate::cart::{Cart, CartOwner};
use crate::models::{Invoice, Order, PartnerAssignment, Payment, Refund, Settlement};

#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Load the owner's cart, creating an empty one on first use.
    async fn get_or_create(&self, owner: &CartOwner) -> CoreResult<Cart>;

    async fn save(&self, cart: &Cart) -> CoreResult<()>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert a new order. Fails with `Conflict` when the idempotency key
    /// has already been used (double-submit of checkout).
    async fn insert(&self, order: &Order, idempotency_key: &str) -> CoreResult<()>;

    async fn get(&self, id: Uuid) -> CoreResult<Order>;

    /// Persist a mutated order. Fails with `Conflict` unless the stored
    /// version equals `expected_version` (lost-update guard).
    async fn save(&self, order: &Order, expected_version: u64) -> CoreResult<()>;

    async fn list_by_customer(&self, customer_id: &str) -> CoreResult<Vec<Order>>;

    /// Next per-day sequence for order numbers.
    async fn next_order_seq(&self, date: NaiveDate) -> CoreResult<u32>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn insert(&self, payment: &Payment) -> CoreResult<()>;

    async fn get(&self, id: Uuid) -> CoreResult<Payment>;

    async fn get_by_gateway_order(&self, gateway_order_id: &str) -> CoreResult<Payment>;

    /// The non-terminal payment for an order, if one exists.
    async fn get_open_for_order(&self, order_id: Uuid) -> CoreResult<Option<Payment>>;

    async fn save(&self, payment: &Payment) -> CoreResult<()>;

    /// Non-terminal payments whose expiry window has passed.
    async fn list_overdue(&self, now: DateTime<Utc>) -> CoreResult<Vec<Payment>>;
}

#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// Insert a new assignment. Fails with `Conflict` when the order
    /// already has a live assignment or this (order, partner) pair exists.
    async fn insert(&self, assignment: &PartnerAssignment) -> CoreResult<()>;

    async fn get(&self, id: Uuid) -> CoreResult<PartnerAssignment>;

    async fn get_live_for_order(&self, order_id: Uuid) -> CoreResult<Option<PartnerAssignment>>;

    async fn save(&self, assignment: &PartnerAssignment) -> CoreResult<()>;

    /// Assignments for a partner delivered within `[start, end)`.
    async fn list_delivered_in(
        &self,
        partner_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CoreResult<Vec<PartnerAssignment>>;
}

#[async_trait]
pub trait RefundRepository: Send + Sync {
    async fn insert(&self, refund: &Refund) -> CoreResult<()>;

    async fn get(&self, id: Uuid) -> CoreResult<Refund>;

    async fn list_for_payment(&self, payment_id: Uuid) -> CoreResult<Vec<Refund>>;

    async fn save(&self, refund: &Refund) -> CoreResult<()>;
}

#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Insert a new invoice. Fails with `Conflict` when the order already
    /// has one (1:1 constraint).
    async fn insert(&self, invoice: &Invoice) -> CoreResult<()>;

    async fn get_by_order(&self, order_id: Uuid) -> CoreResult<Option<Invoice>>;

    async fn save(&self, invoice: &Invoice) -> CoreResult<()>;

    async fn next_invoice_seq(&self, date: NaiveDate) -> CoreResult<u32>;
}

#[async_trait]
pub trait SettlementRepository: Send + Sync {
    /// Order ids, out of the given candidates, already claimed by any
    /// existing settlement.
    async fn filter_claimed(&self, order_ids: &[Uuid]) -> CoreResult<Vec<Uuid>>;

    /// Insert a settlement and claim its orders atomically. Fails with
    /// `Conflict` when any child order is already claimed, so a racing
    /// second batch run loses cleanly.
    async fn insert_claiming(&self, settlement: &Settlement) -> CoreResult<()>;

    async fn get(&self, id: Uuid) -> CoreResult<Settlement>;

    async fn save(&self, settlement: &Settlement) -> CoreResult<()>;

    async fn list_by_partner(&self, partner_id: Uuid) -> CoreResult<Vec<Settlement>>;
}
