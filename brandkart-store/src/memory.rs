//! In-memory repositories.
//!
//! Back the order engine's repository traits with `RwLock`ed maps. The
//! correctness guards live here: idempotency-key uniqueness, optimistic
//! order versions, the single-live-assignment rule and settlement order
//! claims are all checked under one write lock, so racing callers resolve
//! to first-writer-wins with a `Conflict` for the loser.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use brandkart_core::{CoreError, CoreResult};
use brandkart_order::cart::{Cart, CartOwner};
use brandkart_order::models::{Invoice, Order, PartnerAssignment, Payment, Refund, Settlement};
use brandkart_order::repository::{
    AssignmentRepository, CartRepository, InvoiceRepository, OrderRepository, PaymentRepository,
    RefundRepository, SettlementRepository,
};

#[derive(Default)]
pub struct InMemoryCartRepo {
    carts: RwLock<HashMap<CartOwner, Cart>>,
}

impl InMemoryCartRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartRepository for InMemoryCartRepo {
    async fn get_or_create(&self, owner: &CartOwner) -> CoreResult<Cart> {
        let mut carts = self.carts.write().await;
        Ok(carts
            .entry(owner.clone())
            .or_insert_with(|| Cart::new(owner.clone()))
            .clone())
    }

    async fn save(&self, cart: &Cart) -> CoreResult<()> {
        self.carts
            .write()
            .await
            .insert(cart.owner.clone(), cart.clone());
        Ok(())
    }
}

#[derive(Default)]
struct OrderStore {
    orders: HashMap<Uuid, Order>,
    idempotency_keys: HashMap<String, Uuid>,
    daily_seq: HashMap<NaiveDate, u32>,
}

#[derive(Default)]
pub struct InMemoryOrderRepo {
    inner: RwLock<OrderStore>,
}

impl InMemoryOrderRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepo {
    async fn insert(&self, order: &Order, idempotency_key: &str) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.idempotency_keys.contains_key(idempotency_key) {
            return Err(CoreError::Conflict(format!(
                "Checkout already submitted with key {idempotency_key}"
            )));
        }
        inner
            .idempotency_keys
            .insert(idempotency_key.to_string(), order.id);
        inner.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> CoreResult<Order> {
        self.inner
            .read()
            .await
            .orders
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("Order {id}")))
    }

    async fn save(&self, order: &Order, expected_version: u64) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .orders
            .get_mut(&order.id)
            .ok_or_else(|| CoreError::NotFound(format!("Order {}", order.id)))?;
        if stored.version != expected_version {
            return Err(CoreError::Conflict(format!(
                "Order {} version {} does not match expected {}",
                order.id, stored.version, expected_version
            )));
        }
        *stored = order.clone();
        Ok(())
    }

    async fn list_by_customer(&self, customer_id: &str) -> CoreResult<Vec<Order>> {
        let inner = self.inner.read().await;
        let mut orders: Vec<Order> = inner
            .orders
            .values()
            .filter(|o| o.customer_id == customer_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn next_order_seq(&self, date: NaiveDate) -> CoreResult<u32> {
        let mut inner = self.inner.write().await;
        let seq = inner.daily_seq.entry(date).or_insert(0);
        *seq += 1;
        Ok(*seq)
    }
}

#[derive(Default)]
pub struct InMemoryPaymentRepo {
    payments: RwLock<HashMap<Uuid, Payment>>,
}

impl InMemoryPaymentRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepo {
    async fn insert(&self, payment: &Payment) -> CoreResult<()> {
        self.payments
            .write()
            .await
            .insert(payment.id, payment.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> CoreResult<Payment> {
        self.payments
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("Payment {id}")))
    }

    async fn get_by_gateway_order(&self, gateway_order_id: &str) -> CoreResult<Payment> {
        let payments = self.payments.read().await;
        let mut matching: Vec<&Payment> = payments
            .values()
            .filter(|p| p.gateway_order_id.as_deref() == Some(gateway_order_id))
            .collect();
        // Live attempt first, then newest: a retained failed or expired
        // attempt must never shadow the one a callback belongs to.
        matching.sort_by_key(|p| (p.status.is_terminal(), std::cmp::Reverse(p.initiated_at)));
        matching
            .first()
            .map(|p| (*p).clone())
            .ok_or_else(|| {
                CoreError::NotFound(format!("Payment for gateway order {gateway_order_id}"))
            })
    }

    async fn get_open_for_order(&self, order_id: Uuid) -> CoreResult<Option<Payment>> {
        Ok(self
            .payments
            .read()
            .await
            .values()
            .find(|p| p.order_id == order_id && !p.status.is_terminal())
            .cloned())
    }

    async fn save(&self, payment: &Payment) -> CoreResult<()> {
        self.payments
            .write()
            .await
            .insert(payment.id, payment.clone());
        Ok(())
    }

    async fn list_overdue(&self, now: DateTime<Utc>) -> CoreResult<Vec<Payment>> {
        Ok(self
            .payments
            .read()
            .await
            .values()
            .filter(|p| p.is_expired(now))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryAssignmentRepo {
    assignments: RwLock<HashMap<Uuid, PartnerAssignment>>,
}

impl InMemoryAssignmentRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AssignmentRepository for InMemoryAssignmentRepo {
    async fn insert(&self, assignment: &PartnerAssignment) -> CoreResult<()> {
        let mut assignments = self.assignments.write().await;
        for existing in assignments.values() {
            if existing.order_id != assignment.order_id {
                continue;
            }
            if existing.status.is_live() {
                return Err(CoreError::Conflict(format!(
                    "Order {} already has a live assignment",
                    assignment.order_id
                )));
            }
            if existing.partner_id == assignment.partner_id {
                return Err(CoreError::Conflict(format!(
                    "Partner {} was already assigned order {}",
                    assignment.partner_id, assignment.order_id
                )));
            }
        }
        assignments.insert(assignment.id, assignment.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> CoreResult<PartnerAssignment> {
        self.assignments
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("Assignment {id}")))
    }

    async fn get_live_for_order(&self, order_id: Uuid) -> CoreResult<Option<PartnerAssignment>> {
        Ok(self
            .assignments
            .read()
            .await
            .values()
            .find(|a| a.order_id == order_id && a.status.is_live())
            .cloned())
    }

    async fn save(&self, assignment: &PartnerAssignment) -> CoreResult<()> {
        let mut assignments = self.assignments.write().await;
        if !assignments.contains_key(&assignment.id) {
            return Err(CoreError::NotFound(format!("Assignment {}", assignment.id)));
        }
        assignments.insert(assignment.id, assignment.clone());
        Ok(())
    }

    async fn list_delivered_in(
        &self,
        partner_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CoreResult<Vec<PartnerAssignment>> {
        Ok(self
            .assignments
            .read()
            .await
            .values()
            .filter(|a| {
                a.partner_id == partner_id
                    && a.delivered_at
                        .map_or(false, |at| at >= start && at < end)
            })
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryRefundRepo {
    refunds: RwLock<HashMap<Uuid, Refund>>,
}

impl InMemoryRefundRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefundRepository for InMemoryRefundRepo {
    async fn insert(&self, refund: &Refund) -> CoreResult<()> {
        self.refunds.write().await.insert(refund.id, refund.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> CoreResult<Refund> {
        self.refunds
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("Refund {id}")))
    }

    async fn list_for_payment(&self, payment_id: Uuid) -> CoreResult<Vec<Refund>> {
        Ok(self
            .refunds
            .read()
            .await
            .values()
            .filter(|r| r.payment_id == payment_id)
            .cloned()
            .collect())
    }

    async fn save(&self, refund: &Refund) -> CoreResult<()> {
        self.refunds.write().await.insert(refund.id, refund.clone());
        Ok(())
    }
}

#[derive(Default)]
struct InvoiceStore {
    invoices: HashMap<Uuid, Invoice>,
    by_order: HashMap<Uuid, Uuid>,
    daily_seq: HashMap<NaiveDate, u32>,
}

#[derive(Default)]
pub struct InMemoryInvoiceRepo {
    inner: RwLock<InvoiceStore>,
}

impl InMemoryInvoiceRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InvoiceRepository for InMemoryInvoiceRepo {
    async fn insert(&self, invoice: &Invoice) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.by_order.contains_key(&invoice.order_id) {
            return Err(CoreError::Conflict(format!(
                "Order {} already has an invoice",
                invoice.order_id
            )));
        }
        inner.by_order.insert(invoice.order_id, invoice.id);
        inner.invoices.insert(invoice.id, invoice.clone());
        Ok(())
    }

    async fn get_by_order(&self, order_id: Uuid) -> CoreResult<Option<Invoice>> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_order
            .get(&order_id)
            .and_then(|id| inner.invoices.get(id))
            .cloned())
    }

    async fn save(&self, invoice: &Invoice) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.invoices.contains_key(&invoice.id) {
            return Err(CoreError::NotFound(format!("Invoice {}", invoice.id)));
        }
        inner.invoices.insert(invoice.id, invoice.clone());
        Ok(())
    }

    async fn next_invoice_seq(&self, date: NaiveDate) -> CoreResult<u32> {
        let mut inner = self.inner.write().await;
        let seq = inner.daily_seq.entry(date).or_insert(0);
        *seq += 1;
        Ok(*seq)
    }
}

#[derive(Default)]
struct SettlementStore {
    settlements: HashMap<Uuid, Settlement>,
    claimed_orders: HashSet<Uuid>,
}

#[derive(Default)]
pub struct InMemorySettlementRepo {
    inner: RwLock<SettlementStore>,
}

impl InMemorySettlementRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettlementRepository for InMemorySettlementRepo {
    async fn filter_claimed(&self, order_ids: &[Uuid]) -> CoreResult<Vec<Uuid>> {
        let inner = self.inner.read().await;
        Ok(order_ids
            .iter()
            .filter(|id| inner.claimed_orders.contains(id))
            .copied()
            .collect())
    }

    async fn insert_claiming(&self, settlement: &Settlement) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        // Check-then-insert under one lock: no order joins two settlements
        for row in &settlement.orders {
            if inner.claimed_orders.contains(&row.order_id) {
                return Err(CoreError::Conflict(format!(
                    "Order {} is already part of a settlement",
                    row.order_id
                )));
            }
        }
        for row in &settlement.orders {
            inner.claimed_orders.insert(row.order_id);
        }
        inner.settlements.insert(settlement.id, settlement.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> CoreResult<Settlement> {
        self.inner
            .read()
            .await
            .settlements
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("Settlement {id}")))
    }

    async fn save(&self, settlement: &Settlement) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.settlements.contains_key(&settlement.id) {
            return Err(CoreError::NotFound(format!("Settlement {}", settlement.id)));
        }
        inner.settlements.insert(settlement.id, settlement.clone());
        Ok(())
    }

    async fn list_by_partner(&self, partner_id: Uuid) -> CoreResult<Vec<Settlement>> {
        let mut settlements: Vec<Settlement> = self
            .inner
            .read()
            .await
            .settlements
            .values()
            .filter(|s| s.partner_id == partner_id)
            .cloned()
            .collect();
        settlements.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(settlements)
    }
}
