use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use brandkart_catalog::delivery::DeliveryOption;
use brandkart_catalog::tax::GstBreakdown;
use brandkart_shared::money::{Bps, Paise};
use brandkart_shared::pii::Masked;

/// Client-facing order status.
///
/// The happy path runs left to right; `PaymentFailed`, `Cancelled` and the
/// refund pair are side branches. Raw partner vocabulary never appears
/// here; partner states are mapped in before they reach a client view.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    PendingPayment,
    Confirmed,
    Accepted,
    InProduction,
    ReadyToShip,
    Shipped,
    OutForDelivery,
    Delivered,
    PaymentFailed,
    Cancelled,
    RefundInitiated,
    Refunded,
}

impl OrderStatus {
    /// Address and items may still change in these states.
    pub fn is_modifiable(&self) -> bool {
        matches!(self, OrderStatus::PendingPayment | OrderStatus::PaymentFailed)
    }

    /// Terminal states: no transition out, ever.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Refunded
        )
    }

    /// Paid and moving, i.e. anywhere between CONFIRMED and OUT_FOR_DELIVERY.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            OrderStatus::Confirmed
                | OrderStatus::Accepted
                | OrderStatus::InProduction
                | OrderStatus::ReadyToShip
                | OrderStatus::Shipped
                | OrderStatus::OutForDelivery
        )
    }

    /// What the customer sees. ACCEPTED is internal vocabulary and always
    /// displays as "Processing".
    pub fn display_name(&self) -> &'static str {
        match self {
            OrderStatus::PendingPayment => "Pending Payment",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Accepted => "Processing",
            OrderStatus::InProduction => "In Production",
            OrderStatus::ReadyToShip => "Ready to Ship",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::OutForDelivery => "Out for Delivery",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::PaymentFailed => "Payment Failed",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::RefundInitiated => "Refund Initiated",
            OrderStatus::Refunded => "Refunded",
        }
    }

    /// Whether `self → to` is a legal transition.
    pub fn can_transition_to(&self, to: OrderStatus) -> bool {
        use OrderStatus::*;
        if self.is_final() {
            return false;
        }
        // Any non-final state may be cancelled.
        if to == Cancelled {
            return true;
        }
        // Any paid, non-final state may enter the refund branch.
        if to == RefundInitiated {
            return self.is_active();
        }
        matches!(
            (self, to),
            (PendingPayment, Confirmed)
                | (PendingPayment, PaymentFailed)
                | (Confirmed, PaymentFailed)
                | (PaymentFailed, Confirmed)
                | (Confirmed, Accepted)
                | (Accepted, InProduction)
                | (InProduction, ReadyToShip)
                | (ReadyToShip, Shipped)
                | (Shipped, OutForDelivery)
                | (OutForDelivery, Delivered)
                | (RefundInitiated, Refunded)
        )
    }
}

/// Who drove a transition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Actor {
    Customer,
    Admin,
    Partner,
    System,
}

/// Append-only audit row, one per transition. The internal note must never
/// be surfaced in client-facing output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusHistory {
    pub id: Uuid,
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub description: String,
    pub internal_note: Option<String>,
    pub actor: Actor,
    pub created_at: DateTime<Utc>,
}

/// Shipping address frozen onto the order at checkout. Contact fields are
/// masked in Debug output so orders can be logged safely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub recipient_name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state_code: String,
    pub pincode: String,
    pub phone: Masked<String>,
    pub email: Masked<String>,
}

/// Immutable line-item snapshot of a cart item at order time. Catalog edits
/// after checkout never reach these fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_slug: String,
    pub category_slug: String,
    pub image_url: Option<String>,
    pub customization_id: Option<Uuid>,
    pub quantity: u32,
    /// Tier price before discount, per unit.
    pub tier_unit_price_paise: Paise,
    /// Price actually charged per unit, after discount.
    pub unit_price_paise: Paise,
    pub discount_bps: Bps,
    pub customization_fee_paise: Paise,
    /// `(unit_price + customization_fee) × quantity`.
    pub subtotal_paise: Paise,
}

/// The single source of truth for a purchase. Immutable snapshot once
/// created; only status-transition operations touch it afterwards, and it
/// is never hard-deleted (kept for audit and invoicing).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    /// Optimistic-concurrency version, bumped on every saved mutation.
    pub version: u64,
    pub customer_id: String,
    pub items: Vec<OrderItem>,
    pub delivery_address: DeliveryAddress,
    pub delivery_option: DeliveryOption,
    pub delivery_charge_paise: Paise,
    pub estimated_delivery_from: DateTime<Utc>,
    pub estimated_delivery_to: DateTime<Utc>,
    /// Sum of tier prices before discount.
    pub original_subtotal_paise: Paise,
    /// Total discount given across items.
    pub discount_paise: Paise,
    /// Post-discount item total, customization fees included, pre-tax.
    pub subtotal_paise: Paise,
    pub gst: GstBreakdown,
    pub total_paise: Paise,
    pub currency: String,
    pub status: OrderStatus,
    pub payment_id: Option<Uuid>,
    /// Internal only. Never serialized into client-facing views.
    pub partner_id: Option<Uuid>,
    pub cancel_reason: Option<String>,
    pub cancelled_by: Option<Actor>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub history: Vec<OrderStatusHistory>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Apply a transition and append its audit row. Callers are expected to
    /// have checked `can_transition_to`; this only records.
    pub fn record_transition(
        &mut self,
        to: OrderStatus,
        description: impl Into<String>,
        internal_note: Option<String>,
        actor: Actor,
    ) {
        let now = Utc::now();
        self.status = to;
        self.updated_at = now;
        self.history.push(OrderStatusHistory {
            id: Uuid::new_v4(),
            order_id: self.id,
            status: to,
            description: description.into(),
            internal_note,
            actor,
            created_at: now,
        });
    }

    /// History rows recorded for a given status, oldest first.
    pub fn history_for(&self, status: OrderStatus) -> usize {
        self.history.iter().filter(|h| h.status == status).count()
    }

    /// Category slug of the first line, used for category-level commission.
    pub fn primary_category(&self) -> Option<&str> {
        self.items.first().map(|i| i.category_slug.as_str())
    }
}

/// Order number in the `BK-YYYYMMDD-XXX` format.
pub fn format_order_number(date: NaiveDate, daily_seq: u32) -> String {
    format!("BK-{}-{:03}", date.format("%Y%m%d"), daily_seq)
}

/// Invoice number in the `INV-YYYYMMDD-XXXX` format.
pub fn format_invoice_number(date: NaiveDate, daily_seq: u32) -> String {
    format!("INV-{}-{:04}", date.format("%Y%m%d"), daily_seq)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Success,
    Failed,
    Expired,
    Refunded,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending | PaymentStatus::Processing)
    }
}

/// One payment attempt. At most one active (non-terminal) payment exists
/// per order; failed and expired attempts are retained for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub gateway: String,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub gateway_signature: Option<String>,
    pub amount_paise: Paise,
    pub currency: String,
    pub method: Option<String>,
    pub status: PaymentStatus,
    pub failure_reason: Option<String>,
    pub initiated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Payment {
    /// Lazy expiry check: an attempt that never reached a terminal state
    /// within its window counts as expired on the next read.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        !self.status.is_terminal() && now >= self.expires_at
    }
}

/// Partner-facing fulfillment status. Independent of `OrderStatus`; a
/// mapping layer translates it before anything reaches a client.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartnerOrderStatus {
    AwaitingAcceptance,
    Accepted,
    InProduction,
    ReadyToShip,
    Shipped,
    Delivered,
    Rejected,
}

impl PartnerOrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PartnerOrderStatus::Delivered | PartnerOrderStatus::Rejected)
    }

    /// An assignment stays live until the partner rejects it.
    pub fn is_live(&self) -> bool {
        *self != PartnerOrderStatus::Rejected
    }

    pub fn can_transition_to(&self, to: PartnerOrderStatus) -> bool {
        use PartnerOrderStatus::*;
        matches!(
            (self, to),
            (AwaitingAcceptance, Accepted)
                | (AwaitingAcceptance, Rejected)
                | (Accepted, InProduction)
                | (InProduction, ReadyToShip)
                | (ReadyToShip, Shipped)
                | (Shipped, Delivered)
        )
    }

    /// Client-facing status this partner state mirrors to, if any.
    /// `AwaitingAcceptance` and `Rejected` never cross the boundary.
    pub fn client_status(&self) -> Option<OrderStatus> {
        match self {
            PartnerOrderStatus::Accepted => Some(OrderStatus::Accepted),
            PartnerOrderStatus::InProduction => Some(OrderStatus::InProduction),
            PartnerOrderStatus::ReadyToShip => Some(OrderStatus::ReadyToShip),
            PartnerOrderStatus::Shipped => Some(OrderStatus::Shipped),
            PartnerOrderStatus::Delivered => Some(OrderStatus::Delivered),
            PartnerOrderStatus::AwaitingAcceptance | PartnerOrderStatus::Rejected => None,
        }
    }
}

/// Internal-only assignment of an order to a fulfillment partner. Unique
/// per (order, partner) pair; at most one live row per order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerAssignment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub partner_id: Uuid,
    pub status: PartnerOrderStatus,
    pub rejection_reason: Option<String>,
    pub assigned_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub production_started_at: Option<DateTime<Utc>>,
    pub ready_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
}

impl PartnerAssignment {
    pub fn new(order_id: Uuid, partner_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            partner_id,
            status: PartnerOrderStatus::AwaitingAcceptance,
            rejection_reason: None,
            assigned_at: Utc::now(),
            accepted_at: None,
            production_started_at: None,
            ready_at: None,
            shipped_at: None,
            delivered_at: None,
            rejected_at: None,
        }
    }

    /// Advance the partner machine, stamping the milestone timestamp once.
    /// Timestamps are monotonic: a field already set is never rewritten.
    pub fn advance(&mut self, to: PartnerOrderStatus) -> bool {
        if !self.status.can_transition_to(to) {
            return false;
        }
        let now = Utc::now();
        let slot = match to {
            PartnerOrderStatus::Accepted => &mut self.accepted_at,
            PartnerOrderStatus::InProduction => &mut self.production_started_at,
            PartnerOrderStatus::ReadyToShip => &mut self.ready_at,
            PartnerOrderStatus::Shipped => &mut self.shipped_at,
            PartnerOrderStatus::Delivered => &mut self.delivered_at,
            PartnerOrderStatus::Rejected => &mut self.rejected_at,
            PartnerOrderStatus::AwaitingAcceptance => return false,
        };
        if slot.is_none() {
            *slot = Some(now);
        }
        self.status = to;
        true
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundStatus {
    Initiated,
    Processing,
    Success,
    Failed,
}

/// One refund attempt against a successful payment. Failure is terminal
/// per attempt; a fresh row is required to try again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub order_id: Uuid,
    pub amount_paise: Paise,
    pub status: RefundStatus,
    pub reason: String,
    pub failure_reason: Option<String>,
    pub initiated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// 1:1 invoice record. Immutable once generated, except the PDF pointer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub order_id: Uuid,
    pub invoice_number: String,
    pub is_generated: bool,
    pub pdf_url: Option<String>,
    pub storage_key: Option<String>,
    pub generated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// One order's share inside a settlement. The commission rate is frozen
/// here at settlement time; later config changes never touch it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementOrder {
    pub id: Uuid,
    pub settlement_id: Uuid,
    pub order_id: Uuid,
    pub product_amount_paise: Paise,
    pub commission_bps: Bps,
    pub platform_commission_paise: Paise,
    pub partner_earnings_paise: Paise,
}

/// Aggregation of a partner's fulfilled orders over one period. Totals are
/// always sums over the child rows, never edited independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    pub id: Uuid,
    pub partner_id: Uuid,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub status: SettlementStatus,
    pub orders: Vec<SettlementOrder>,
    pub total_product_amount_paise: Paise,
    pub total_platform_commission_paise: Paise,
    pub total_partner_earnings_paise: Paise,
    /// Version of the commission snapshot the whole batch was priced with.
    pub commission_version: u64,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Settlement {
    pub fn new(partner_id: Uuid, period_start: DateTime<Utc>, period_end: DateTime<Utc>, commission_version: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            partner_id,
            period_start,
            period_end,
            status: SettlementStatus::Pending,
            orders: Vec::new(),
            total_product_amount_paise: 0,
            total_platform_commission_paise: 0,
            total_partner_earnings_paise: 0,
            commission_version,
            failure_reason: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Attach a child row and fold it into the totals.
    pub fn push_order(&mut self, mut row: SettlementOrder) {
        row.settlement_id = self.id;
        self.total_product_amount_paise += row.product_amount_paise;
        self.total_platform_commission_paise += row.platform_commission_paise;
        self.total_partner_earnings_paise += row.partner_earnings_paise;
        self.orders.push(row);
    }
}
