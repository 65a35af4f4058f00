use std::sync::Arc;
use chrono::Utc;
use uuid::Uuid;

use brandkart_core::notify::NotificationDispatcher;
use brandkart_core::{CoreError, CoreResult};
use brandkart_shared::events::{DomainEvent, RefundCompletedEvent};
use brandkart_shared::money::Paise;

use crate::manager::OrderManager;
use crate::models::{Actor, OrderStatus, PaymentStatus, Refund, RefundStatus};
use crate::repository::{PaymentRepository, RefundRepository};

/// Initiates, tracks and finalizes refunds against successful payments.
///
/// A refund attempt that fails is terminal; remediation means a new refund
/// row, never an in-place retry.
pub struct RefundProcessor {
    refunds: Arc<dyn RefundRepository>,
    payments: Arc<dyn PaymentRepository>,
    manager: Arc<OrderManager>,
    notifier: Arc<dyn NotificationDispatcher>,
}

impl RefundProcessor {
    pub fn new(
        refunds: Arc<dyn RefundRepository>,
        payments: Arc<dyn PaymentRepository>,
        manager: Arc<OrderManager>,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            refunds,
            payments,
            manager,
            notifier,
        }
    }

    /// Open a refund. All preconditions are checked before any state is
    /// touched: the payment must have succeeded, the amount must fit
    /// within it, and no other refund may be open or settled against it.
    pub async fn initiate(
        &self,
        payment_id: Uuid,
        amount_paise: Paise,
        reason: &str,
    ) -> CoreResult<Refund> {
        let payment = self.payments.get(payment_id).await?;

        if amount_paise <= 0 {
            return Err(CoreError::Validation(
                "Refund amount must be positive".to_string(),
            ));
        }
        if amount_paise > payment.amount_paise {
            return Err(CoreError::Validation(format!(
                "Refund amount {} exceeds payment amount {}",
                amount_paise, payment.amount_paise
            )));
        }
        if payment.status != PaymentStatus::Success {
            return Err(CoreError::StateConflict(format!(
                "Payment {} is {:?}, only successful payments can be refunded",
                payment.id, payment.status
            )));
        }
        let prior = self.refunds.list_for_payment(payment_id).await?;
        if prior
            .iter()
            .any(|r| !matches!(r.status, RefundStatus::Failed))
        {
            return Err(CoreError::StateConflict(format!(
                "Payment {} already has a refund in flight or settled",
                payment.id
            )));
        }

        let refund = Refund {
            id: Uuid::new_v4(),
            payment_id,
            order_id: payment.order_id,
            amount_paise,
            status: RefundStatus::Initiated,
            reason: reason.to_string(),
            failure_reason: None,
            initiated_at: Utc::now(),
            completed_at: None,
        };
        self.refunds.insert(&refund).await?;

        self.manager
            .transition(
                payment.order_id,
                OrderStatus::RefundInitiated,
                "Refund initiated",
                Some(format!("Refund {} opened: {reason}", refund.id)),
                Actor::Admin,
            )
            .await?;

        tracing::info!(refund_id = %refund.id, amount_paise, "Refund initiated");
        Ok(refund)
    }

    /// Gateway picked the refund up.
    pub async fn mark_processing(&self, refund_id: Uuid) -> CoreResult<Refund> {
        let mut refund = self.refunds.get(refund_id).await?;
        if refund.status != RefundStatus::Initiated {
            return Err(CoreError::StateConflict(format!(
                "Refund {} is {:?}, expected INITIATED",
                refund.id, refund.status
            )));
        }
        refund.status = RefundStatus::Processing;
        self.refunds.save(&refund).await?;
        Ok(refund)
    }

    /// Refund settled. A full refund flips the payment to REFUNDED and the
    /// order to REFUNDED; a partial one leaves the order in
    /// REFUND_INITIATED for follow-up.
    pub async fn complete(&self, refund_id: Uuid) -> CoreResult<Refund> {
        let mut refund = self.refunds.get(refund_id).await?;
        if refund.status != RefundStatus::Processing {
            return Err(CoreError::StateConflict(format!(
                "Refund {} is {:?}, expected PROCESSING",
                refund.id, refund.status
            )));
        }
        let now = Utc::now();
        refund.status = RefundStatus::Success;
        refund.completed_at = Some(now);
        self.refunds.save(&refund).await?;

        let mut payment = self.payments.get(refund.payment_id).await?;
        let full_refund = refund.amount_paise == payment.amount_paise;
        if full_refund {
            payment.status = PaymentStatus::Refunded;
            self.payments.save(&payment).await?;
            self.manager
                .transition(
                    refund.order_id,
                    OrderStatus::Refunded,
                    "Refund completed",
                    None,
                    Actor::System,
                )
                .await?;
        }

        if let Err(e) = self
            .notifier
            .dispatch(DomainEvent::RefundCompleted(RefundCompletedEvent {
                refund_id: refund.id,
                order_id: refund.order_id,
                payment_id: refund.payment_id,
                amount_paise: refund.amount_paise,
                timestamp: now.timestamp(),
            }))
            .await
        {
            tracing::warn!(error = %e, "Refund-completed notification failed");
        }

        Ok(refund)
    }

    /// Refund attempt failed; the order stays in REFUND_INITIATED and an
    /// admin opens a fresh refund to try again.
    pub async fn fail(&self, refund_id: Uuid, reason: &str) -> CoreResult<Refund> {
        let mut refund = self.refunds.get(refund_id).await?;
        if matches!(refund.status, RefundStatus::Success | RefundStatus::Failed) {
            return Err(CoreError::StateConflict(format!(
                "Refund {} is already settled as {:?}",
                refund.id, refund.status
            )));
        }
        refund.status = RefundStatus::Failed;
        refund.failure_reason = Some(reason.to_string());
        refund.completed_at = Some(Utc::now());
        self.refunds.save(&refund).await?;
        tracing::warn!(refund_id = %refund.id, reason, "Refund failed");
        Ok(refund)
    }
}
