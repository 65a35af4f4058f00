use std::sync::Arc;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use brandkart_core::gateway::{GatewayCallback, PaymentGateway};
use brandkart_core::invoice::InvoiceGenerator;
use brandkart_core::notify::NotificationDispatcher;
use brandkart_core::{CoreError, CoreResult};
use brandkart_shared::events::{DomainEvent, OrderConfirmedEvent, PaymentFailedEvent};

use crate::manager::OrderManager;
use crate::models::{
    format_invoice_number, Actor, Invoice, Order, OrderStatus, Payment, PaymentStatus,
};
use crate::repository::{InvoiceRepository, PaymentRepository};

/// Bridges orders to the payment gateway.
///
/// Owns the payment attempt lifecycle: initiation, the success/failure
/// callback (signature-verified, idempotent), lazy and swept expiry, and
/// the best-effort side effects after confirmation.
pub struct PaymentOrchestrator {
    payments: Arc<dyn PaymentRepository>,
    invoices: Arc<dyn InvoiceRepository>,
    manager: Arc<OrderManager>,
    gateway: Arc<dyn PaymentGateway>,
    invoice_generator: Arc<dyn InvoiceGenerator>,
    notifier: Arc<dyn NotificationDispatcher>,
    expiry: Duration,
}

impl PaymentOrchestrator {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        invoices: Arc<dyn InvoiceRepository>,
        manager: Arc<OrderManager>,
        gateway: Arc<dyn PaymentGateway>,
        invoice_generator: Arc<dyn InvoiceGenerator>,
        notifier: Arc<dyn NotificationDispatcher>,
        expiry_minutes: i64,
    ) -> Self {
        Self {
            payments,
            invoices,
            manager,
            gateway,
            invoice_generator,
            notifier,
            expiry: Duration::minutes(expiry_minutes),
        }
    }

    /// Create a payment attempt for an order awaiting payment. Also serves
    /// retry after PAYMENT_FAILED; earlier attempts are retained untouched.
    pub async fn initiate(&self, order_id: Uuid) -> CoreResult<Payment> {
        let order = self.manager.get(order_id).await?;
        if !order.status.is_modifiable() {
            return Err(CoreError::StateConflict(format!(
                "Order {} in state {:?} is not awaiting payment",
                order.order_number, order.status
            )));
        }

        let now = Utc::now();
        if let Some(open) = self.payments.get_open_for_order(order.id).await? {
            if !open.is_expired(now) {
                return Err(CoreError::StateConflict(format!(
                    "Order {} already has an active payment attempt",
                    order.order_number
                )));
            }
            // Lazily retire the stale attempt before opening a new one
            self.expire_payment(open).await?;
        }

        let gateway_order = self
            .gateway
            .create_gateway_order(order.id, order.total_paise, &order.currency)
            .await?;

        let payment = Payment {
            id: Uuid::new_v4(),
            order_id: order.id,
            gateway: "razorpay".to_string(),
            gateway_order_id: Some(gateway_order.gateway_order_id),
            gateway_payment_id: None,
            gateway_signature: None,
            // Amount is pinned to the order total at creation time
            amount_paise: order.total_paise,
            currency: order.currency.clone(),
            method: None,
            status: PaymentStatus::Pending,
            failure_reason: None,
            initiated_at: now,
            expires_at: now + self.expiry,
            completed_at: None,
        };
        self.payments.insert(&payment).await?;
        self.manager.attach_payment(order.id, payment.id).await?;

        tracing::info!(order_number = %order.order_number, payment_id = %payment.id, "Payment initiated");
        Ok(payment)
    }

    /// Process a gateway callback. The signature is verified before
    /// anything else is trusted; a duplicate success callback is a no-op.
    pub async fn handle_callback(&self, callback: &GatewayCallback) -> CoreResult<Order> {
        // Security check first, before any state is read or written
        self.gateway.verify_signature(callback)?;

        let mut payment = self
            .payments
            .get_by_gateway_order(&callback.gateway_order_id)
            .await?;

        if payment.status == PaymentStatus::Success {
            // Duplicate webhook; confirm() is idempotent as well. Still
            // retry the invoice render in case the first attempt failed.
            let order = self.manager.get(payment.order_id).await?;
            self.generate_invoice(&order).await;
            return Ok(order);
        }
        if payment.status.is_terminal() {
            return Err(CoreError::StateConflict(format!(
                "Payment {} already settled as {:?}",
                payment.id, payment.status
            )));
        }

        let now = Utc::now();
        if payment.is_expired(now) {
            let order_id = payment.order_id;
            self.expire_payment(payment).await?;
            return Err(CoreError::StateConflict(format!(
                "Payment window for order {order_id} has expired"
            )));
        }

        if callback.success {
            payment.status = PaymentStatus::Success;
            payment.gateway_payment_id = Some(callback.gateway_payment_id.clone());
            payment.gateway_signature = Some(callback.gateway_signature.clone());
            payment.completed_at = Some(now);
            self.payments.save(&payment).await?;

            let order = self.manager.confirm(payment.order_id, Actor::System).await?;

            // Best-effort side effects; neither may fail the confirmation
            self.generate_invoice(&order).await;
            self.dispatch(DomainEvent::OrderConfirmed(OrderConfirmedEvent {
                order_id: order.id,
                order_number: order.order_number.clone(),
                customer_id: order.customer_id.clone(),
                total_paise: order.total_paise,
                timestamp: now.timestamp(),
            }))
            .await;

            Ok(order)
        } else {
            let reason = callback
                .failure_reason
                .clone()
                .unwrap_or_else(|| "Payment declined by gateway".to_string());
            payment.status = PaymentStatus::Failed;
            payment.failure_reason = Some(reason.clone());
            payment.completed_at = Some(now);
            self.payments.save(&payment).await?;

            // A retry that fails again finds the order already in
            // PAYMENT_FAILED; only the first failure transitions.
            let mut order = self.manager.get(payment.order_id).await?;
            if order.status != OrderStatus::PaymentFailed {
                order = self
                    .manager
                    .transition(
                        payment.order_id,
                        OrderStatus::PaymentFailed,
                        "Payment failed",
                        Some(reason.clone()),
                        Actor::System,
                    )
                    .await?;
            }

            self.dispatch(DomainEvent::PaymentFailed(PaymentFailedEvent {
                order_id: order.id,
                payment_id: payment.id,
                reason,
                timestamp: now.timestamp(),
            }))
            .await;

            Ok(order)
        }
    }

    /// Cancel an order. One whose payment already succeeded must go through
    /// the refund path instead, so captured money never strands on a
    /// CANCELLED order.
    pub async fn cancel_order(
        &self,
        order_id: Uuid,
        reason: &str,
        actor: Actor,
    ) -> CoreResult<Order> {
        let order = self.manager.get(order_id).await?;
        if let Some(payment_id) = order.payment_id {
            let payment = self.payments.get(payment_id).await?;
            if payment.status == PaymentStatus::Success {
                return Err(CoreError::StateConflict(format!(
                    "Order {} is paid; initiate a refund instead of cancelling",
                    order.order_number
                )));
            }
        }
        self.manager.cancel(order_id, reason, actor).await
    }

    /// Sweep for the worker: expire every overdue attempt. Returns how many
    /// were retired.
    pub async fn expire_overdue(&self, now: DateTime<Utc>) -> CoreResult<usize> {
        let overdue = self.payments.list_overdue(now).await?;
        let count = overdue.len();
        for payment in overdue {
            self.expire_payment(payment).await?;
        }
        Ok(count)
    }

    async fn expire_payment(&self, mut payment: Payment) -> CoreResult<()> {
        payment.status = PaymentStatus::Expired;
        payment.completed_at = Some(Utc::now());
        self.payments.save(&payment).await?;

        let order = self.manager.get(payment.order_id).await?;
        if order.status == OrderStatus::PendingPayment {
            self.manager
                .transition(
                    order.id,
                    OrderStatus::PaymentFailed,
                    "Payment window expired",
                    Some(format!("Payment {} expired", payment.id)),
                    Actor::System,
                )
                .await?;
        }
        tracing::info!(payment_id = %payment.id, "Payment expired");
        Ok(())
    }

    /// Create the 1:1 invoice record and render the PDF. Best-effort: a
    /// generator failure leaves the record ungenerated and is only logged.
    async fn generate_invoice(&self, order: &Order) {
        let result = self.try_generate_invoice(order).await;
        if let Err(e) = result {
            tracing::warn!(
                order_number = %order.order_number,
                error = %e,
                "Invoice generation failed, order confirmation unaffected"
            );
        }
    }

    async fn try_generate_invoice(&self, order: &Order) -> CoreResult<()> {
        // A record may exist from an earlier attempt whose render failed;
        // keep its number and render again instead of giving up.
        if let Some(existing) = self.invoices.get_by_order(order.id).await? {
            if existing.is_generated {
                return Ok(());
            }
            return self.render_invoice(existing).await;
        }
        let now = Utc::now();
        let seq = self.invoices.next_invoice_seq(now.date_naive()).await?;
        let invoice = Invoice {
            id: Uuid::new_v4(),
            order_id: order.id,
            invoice_number: format_invoice_number(now.date_naive(), seq),
            is_generated: false,
            pdf_url: None,
            storage_key: None,
            generated_at: None,
            created_at: now,
        };
        self.invoices.insert(&invoice).await?;
        self.render_invoice(invoice).await
    }

    async fn render_invoice(&self, mut invoice: Invoice) -> CoreResult<()> {
        let rendered = self
            .invoice_generator
            .generate(invoice.order_id, &invoice.invoice_number)
            .await?;
        invoice.pdf_url = Some(rendered.pdf_url);
        invoice.storage_key = Some(rendered.storage_key);
        invoice.is_generated = true;
        invoice.generated_at = Some(Utc::now());
        self.invoices.save(&invoice).await
    }

    async fn dispatch(&self, event: DomainEvent) {
        if let Err(e) = self.notifier.dispatch(event).await {
            tracing::warn!(error = %e, "Notification dispatch failed");
        }
    }
}
