use uuid::Uuid;

use crate::money::Paise;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct OrderConfirmedEvent {
    pub order_id: Uuid,
    pub order_number: String,
    pub customer_id: String,
    pub total_paise: Paise,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct PaymentFailedEvent {
    pub order_id: Uuid,
    pub payment_id: Uuid,
    pub reason: String,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct PartnerAssignedEvent {
    pub order_id: Uuid,
    pub assignment_id: Uuid,
    pub partner_id: Uuid,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct OrderShippedEvent {
    pub order_id: Uuid,
    pub order_number: String,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct RefundCompletedEvent {
    pub refund_id: Uuid,
    pub order_id: Uuid,
    pub payment_id: Uuid,
    pub amount_paise: Paise,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct SettlementCompletedEvent {
    pub settlement_id: Uuid,
    pub partner_id: Uuid,
    pub partner_earnings_paise: Paise,
    pub order_count: usize,
    pub timestamp: i64,
}

/// Union of everything the notification dispatcher can be handed.
/// Delivery is fire-and-forget; the core never waits on these.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DomainEvent {
    OrderConfirmed(OrderConfirmedEvent),
    PaymentFailed(PaymentFailedEvent),
    PartnerAssigned(PartnerAssignedEvent),
    OrderShipped(OrderShippedEvent),
    RefundCompleted(RefundCompletedEvent),
    SettlementCompleted(SettlementCompletedEvent),
}
