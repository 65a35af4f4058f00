//! End-to-end lifecycle tests against the in-memory store: checkout,
//! payment callbacks, partner fulfillment, refunds and settlement.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use brandkart_catalog::delivery::{DeliveryOption, DeliveryRates};
use brandkart_catalog::product::{PricingTier, Product, ProductCategory};
use brandkart_catalog::tax::TaxContext;
use brandkart_core::commission::{CommissionSnapshot, FixedCommissionSource};
use brandkart_core::gateway::{GatewayCallback, MockGateway};
use brandkart_core::invoice::{InvoiceGenerator, MockInvoiceGenerator, RenderedInvoice};
use brandkart_core::notify::LogDispatcher;
use brandkart_core::{CoreError, CoreResult};
use brandkart_order::repository::{AssignmentRepository, InvoiceRepository, PaymentRepository};
use brandkart_order::{
    Cart, CartOwner, CheckoutService, DeliveryAddress, Order, OrderManager, OrderStatus,
    PartnerAssignmentService, PartnerOrderStatus, Payment, PaymentOrchestrator, PaymentStatus,
    RefundProcessor, SettlementBatcher,
};
use brandkart_shared::money::percent;
use brandkart_shared::pii::Masked;
use brandkart_store::{
    InMemoryAssignmentRepo, InMemoryInvoiceRepo, InMemoryOrderRepo, InMemoryPaymentRepo,
    InMemoryRefundRepo, InMemorySettlementRepo,
};

struct Harness {
    invoices: Arc<InMemoryInvoiceRepo>,
    assignments: Arc<InMemoryAssignmentRepo>,
    payments: Arc<InMemoryPaymentRepo>,
    gateway: Arc<MockGateway>,
    manager: Arc<OrderManager>,
    checkout: CheckoutService,
    orchestrator: PaymentOrchestrator,
    fulfillment: PartnerAssignmentService,
    refunds: RefundProcessor,
    batcher: SettlementBatcher,
}

fn harness() -> Harness {
    let orders = Arc::new(InMemoryOrderRepo::new());
    let payments = Arc::new(InMemoryPaymentRepo::new());
    let assignments = Arc::new(InMemoryAssignmentRepo::new());
    let invoices = Arc::new(InMemoryInvoiceRepo::new());
    let refund_repo = Arc::new(InMemoryRefundRepo::new());
    let settlements = Arc::new(InMemorySettlementRepo::new());

    let gateway = Arc::new(MockGateway::new("test-secret"));
    let manager = Arc::new(OrderManager::new(orders.clone()));
    let notifier = Arc::new(LogDispatcher);

    let commission = Arc::new(FixedCommissionSource::new(CommissionSnapshot {
        version: 1,
        default_bps: percent(20),
        category_bps: HashMap::new(),
        partner_override_bps: HashMap::new(),
    }));

    Harness {
        invoices: invoices.clone(),
        assignments: assignments.clone(),
        payments: payments.clone(),
        gateway: gateway.clone(),
        manager: manager.clone(),
        checkout: CheckoutService::new(orders.clone()),
        orchestrator: PaymentOrchestrator::new(
            payments.clone(),
            invoices,
            manager.clone(),
            gateway,
            Arc::new(MockInvoiceGenerator),
            notifier.clone(),
            15,
        ),
        fulfillment: PartnerAssignmentService::new(
            assignments.clone(),
            manager.clone(),
            notifier.clone(),
        ),
        refunds: RefundProcessor::new(refund_repo, payments, manager, notifier.clone()),
        batcher: SettlementBatcher::new(assignments, orders, settlements, commission, notifier),
    }
}

fn tee() -> Product {
    Product {
        id: Uuid::new_v4(),
        category: ProductCategory::Apparel,
        slug: "classic-tee".to_string(),
        name: "Classic Tee".to_string(),
        description: None,
        image_url: None,
        base_price_paise: 10_000,
        tiers: vec![
            PricingTier::new(1, Some(9), 10_000),
            PricingTier::new(10, Some(49), 9_000),
            PricingTier::new(50, None, 8_000),
        ],
        partner_discount_bps: Some(percent(10)),
        customization_fee_paise: 500,
        is_active: true,
    }
}

fn address() -> DeliveryAddress {
    DeliveryAddress {
        recipient_name: "A. Buyer".to_string(),
        line1: "1 MG Road".to_string(),
        line2: None,
        city: "Mumbai".to_string(),
        state_code: "MH".to_string(),
        pincode: "400001".to_string(),
        phone: Masked("9876543210".to_string()),
        email: Masked("buyer@example.com".to_string()),
    }
}

fn tax() -> TaxContext {
    TaxContext {
        seller_state_code: "KA".to_string(),
        buyer_state_code: "MH".to_string(),
        gst_rate_bps: percent(18),
    }
}

/// Cart with 20 customized tees: 20 × (90.00 + 5.00) = 1,720.00.
async fn place_order(h: &Harness, idempotency_key: &str) -> Order {
    let product = tee();
    let mut cart = Cart::new(CartOwner::User("u1".to_string()));
    cart.add_item(&product, Some(Uuid::new_v4()), 20).unwrap();

    h.checkout
        .checkout(
            &cart,
            "u1",
            address(),
            DeliveryOption::Standard,
            &DeliveryRates::default(),
            &tax(),
            idempotency_key,
        )
        .await
        .unwrap()
}

fn success_callback(h: &Harness, payment: &Payment) -> GatewayCallback {
    let gateway_order_id = payment.gateway_order_id.clone().unwrap();
    let gateway_payment_id = format!("gw_pay_{}", payment.id.simple());
    GatewayCallback {
        gateway_signature: h.gateway.sign(&gateway_order_id, &gateway_payment_id),
        gateway_order_id,
        gateway_payment_id,
        success: true,
        failure_reason: None,
    }
}

async fn pay(h: &Harness, order: &Order) -> Payment {
    let payment = h.orchestrator.initiate(order.id).await.unwrap();
    h.orchestrator
        .handle_callback(&success_callback(h, &payment))
        .await
        .unwrap();
    payment
}

/// Walk the partner machine to DELIVERED and return the assignment id.
async fn fulfill(h: &Harness, order_id: Uuid, partner_id: Uuid) -> Uuid {
    let assignment = h.fulfillment.assign(order_id, partner_id).await.unwrap();
    h.fulfillment.accept(assignment.id).await.unwrap();
    h.fulfillment.start_production(assignment.id).await.unwrap();
    h.fulfillment.ready_to_ship(assignment.id).await.unwrap();
    h.fulfillment.mark_shipped(assignment.id).await.unwrap();
    h.fulfillment.mark_delivered(assignment.id).await.unwrap();
    assignment.id
}

#[tokio::test]
async fn test_checkout_prices_bulk_order() {
    let h = harness();
    let order = place_order(&h, "key-1").await;

    // Tier 10-49 at 90.00, 10% off → 81.00, plus 5.00 customization
    assert_eq!(order.subtotal_paise, 172_000);
    assert_eq!(order.original_subtotal_paise, 190_000);
    assert_eq!(order.discount_paise, 18_000);

    // KA seller, MH buyer: inter-state, full 18% as IGST
    assert_eq!(order.gst.igst_paise, 30_960);
    assert_eq!(order.gst.cgst_paise, 0);
    assert_eq!(order.gst.sgst_paise, 0);
    assert_eq!(order.total_paise, 172_000 + 30_960 + 5_000);

    assert!(order.order_number.starts_with("BK-"));
    assert_eq!(order.status, OrderStatus::PendingPayment);
    assert_eq!(order.history.len(), 1);
}

#[tokio::test]
async fn test_payment_success_confirms_exactly_once() {
    let h = harness();
    let order = place_order(&h, "key-1").await;

    let payment = h.orchestrator.initiate(order.id).await.unwrap();
    assert_eq!(payment.amount_paise, order.total_paise);

    let callback = success_callback(&h, &payment);
    let confirmed = h.orchestrator.handle_callback(&callback).await.unwrap();
    assert_eq!(confirmed.status, OrderStatus::Confirmed);
    assert_eq!(confirmed.payment_id, Some(payment.id));

    // Duplicate webhook delivery is a no-op
    let again = h.orchestrator.handle_callback(&callback).await.unwrap();
    assert_eq!(again.status, OrderStatus::Confirmed);
    assert_eq!(again.history_for(OrderStatus::Confirmed), 1);

    // Confirmation also produced the 1:1 invoice record
    let invoice = h.invoices.get_by_order(order.id).await.unwrap().unwrap();
    assert!(invoice.is_generated);
    assert!(invoice.invoice_number.starts_with("INV-"));
}

/// Generator that fails its first render, then behaves like the mock.
struct FlakyInvoiceGenerator {
    fail_first: std::sync::atomic::AtomicBool,
}

#[async_trait::async_trait]
impl InvoiceGenerator for FlakyInvoiceGenerator {
    async fn generate(&self, order_id: Uuid, invoice_number: &str) -> CoreResult<RenderedInvoice> {
        if self
            .fail_first
            .swap(false, std::sync::atomic::Ordering::SeqCst)
        {
            return Err(CoreError::ExternalDependency(
                "PDF render service unavailable".to_string(),
            ));
        }
        let storage_key = format!("invoices/{}/{}.pdf", order_id, invoice_number);
        Ok(RenderedInvoice {
            pdf_url: format!("https://cdn.brandkart.example/{storage_key}"),
            storage_key,
        })
    }
}

#[tokio::test]
async fn test_duplicate_callback_retries_failed_invoice_render() {
    let orders = Arc::new(InMemoryOrderRepo::new());
    let payments = Arc::new(InMemoryPaymentRepo::new());
    let invoices = Arc::new(InMemoryInvoiceRepo::new());
    let gateway = Arc::new(MockGateway::new("test-secret"));
    let manager = Arc::new(OrderManager::new(orders.clone()));
    let checkout = CheckoutService::new(orders);
    let orchestrator = PaymentOrchestrator::new(
        payments,
        invoices.clone(),
        manager,
        gateway.clone(),
        Arc::new(FlakyInvoiceGenerator {
            fail_first: std::sync::atomic::AtomicBool::new(true),
        }),
        Arc::new(LogDispatcher),
        15,
    );

    let product = tee();
    let mut cart = Cart::new(CartOwner::User("u1".to_string()));
    cart.add_item(&product, None, 20).unwrap();
    let order = checkout
        .checkout(
            &cart,
            "u1",
            address(),
            DeliveryOption::Standard,
            &DeliveryRates::default(),
            &tax(),
            "key-1",
        )
        .await
        .unwrap();

    let payment = orchestrator.initiate(order.id).await.unwrap();
    let gateway_order_id = payment.gateway_order_id.clone().unwrap();
    let gateway_payment_id = format!("gw_pay_{}", payment.id.simple());
    let callback = GatewayCallback {
        gateway_signature: gateway.sign(&gateway_order_id, &gateway_payment_id),
        gateway_order_id,
        gateway_payment_id,
        success: true,
        failure_reason: None,
    };

    // Confirmation survives the render failure; the record stays ungenerated
    let confirmed = orchestrator.handle_callback(&callback).await.unwrap();
    assert_eq!(confirmed.status, OrderStatus::Confirmed);
    let invoice = invoices.get_by_order(order.id).await.unwrap().unwrap();
    assert!(!invoice.is_generated);
    assert!(invoice.pdf_url.is_none());

    // The duplicate webhook re-attempts the render and keeps the number
    let again = orchestrator.handle_callback(&callback).await.unwrap();
    assert_eq!(again.status, OrderStatus::Confirmed);
    let invoice_now = invoices.get_by_order(order.id).await.unwrap().unwrap();
    assert!(invoice_now.is_generated);
    assert!(invoice_now.pdf_url.is_some());
    assert_eq!(invoice_now.invoice_number, invoice.invoice_number);
}

#[tokio::test]
async fn test_forged_signature_is_rejected_before_state_changes() {
    let h = harness();
    let order = place_order(&h, "key-1").await;
    let payment = h.orchestrator.initiate(order.id).await.unwrap();

    let mut callback = success_callback(&h, &payment);
    callback.gateway_signature = "sig:forged".to_string();

    let err = h.orchestrator.handle_callback(&callback).await.unwrap_err();
    assert!(matches!(err, CoreError::Security));

    let order = h.manager.get(order.id).await.unwrap();
    assert_eq!(order.status, OrderStatus::PendingPayment);
}

#[tokio::test]
async fn test_failed_payment_can_be_retried() {
    let h = harness();
    let order = place_order(&h, "key-1").await;

    let first = h.orchestrator.initiate(order.id).await.unwrap();
    let mut callback = success_callback(&h, &first);
    callback.success = false;
    callback.failure_reason = Some("Card declined".to_string());

    let failed = h.orchestrator.handle_callback(&callback).await.unwrap();
    assert_eq!(failed.status, OrderStatus::PaymentFailed);

    // A second attempt while the order is in PAYMENT_FAILED. The retained
    // failed attempt keeps its own gateway order id, so the retry's
    // callback can never resolve to the dead row.
    let retry = h.orchestrator.initiate(order.id).await.unwrap();
    assert_ne!(retry.id, first.id);
    assert_ne!(retry.gateway_order_id, first.gateway_order_id);
    let confirmed = h
        .orchestrator
        .handle_callback(&success_callback(&h, &retry))
        .await
        .unwrap();
    assert_eq!(confirmed.status, OrderStatus::Confirmed);
}

#[tokio::test]
async fn test_sweep_expires_overdue_payment_and_fails_the_order() {
    let h = harness();
    let order = place_order(&h, "key-1").await;
    let payment = h.orchestrator.initiate(order.id).await.unwrap();

    let mut stale = h.payments.get(payment.id).await.unwrap();
    stale.expires_at = Utc::now() - Duration::minutes(1);
    h.payments.save(&stale).await.unwrap();

    let swept = h.orchestrator.expire_overdue(Utc::now()).await.unwrap();
    assert_eq!(swept, 1);

    let payment_now = h.payments.get(payment.id).await.unwrap();
    assert_eq!(payment_now.status, PaymentStatus::Expired);

    let order_now = h.manager.get(order.id).await.unwrap();
    assert_eq!(order_now.status, OrderStatus::PaymentFailed);
    assert_eq!(order_now.history_for(OrderStatus::PaymentFailed), 1);

    // A late callback for the swept attempt is refused
    let err = h
        .orchestrator
        .handle_callback(&success_callback(&h, &payment))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::StateConflict(_)));

    // The customer can still retry
    let retry = h.orchestrator.initiate(order.id).await.unwrap();
    let confirmed = h
        .orchestrator
        .handle_callback(&success_callback(&h, &retry))
        .await
        .unwrap();
    assert_eq!(confirmed.status, OrderStatus::Confirmed);
}

#[tokio::test]
async fn test_double_initiate_conflicts_while_attempt_open() {
    let h = harness();
    let order = place_order(&h, "key-1").await;

    h.orchestrator.initiate(order.id).await.unwrap();
    let err = h.orchestrator.initiate(order.id).await.unwrap_err();
    assert!(matches!(err, CoreError::StateConflict(_)));
}

#[tokio::test]
async fn test_partner_milestones_mirror_to_client_chain() {
    let h = harness();
    let order = place_order(&h, "key-1").await;
    pay(&h, &order).await;

    fulfill(&h, order.id, Uuid::new_v4()).await;

    let order = h.manager.get(order.id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Delivered);

    // Partner DELIVERED arrives with no OUT_FOR_DELIVERY milestone of its
    // own; the client chain still records the intermediate step.
    assert_eq!(order.history_for(OrderStatus::OutForDelivery), 1);
    assert_eq!(order.history_for(OrderStatus::Delivered), 1);

    // Delivered is terminal
    let err = h
        .manager
        .cancel(order.id, "changed my mind", brandkart_order::Actor::Customer)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::StateConflict(_)));
}

#[tokio::test]
async fn test_rejection_frees_order_for_a_different_partner() {
    let h = harness();
    let order = place_order(&h, "key-1").await;
    pay(&h, &order).await;

    let p1 = Uuid::new_v4();
    let p2 = Uuid::new_v4();
    let first = h.fulfillment.assign(order.id, p1).await.unwrap();

    // Reason is mandatory
    let err = h.fulfillment.reject(first.id, "  ").await.unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));

    h.fulfillment
        .reject(first.id, "Out of blank stock")
        .await
        .unwrap();

    // Order stayed CONFIRMED; rejection never reaches the client chain
    let order_now = h.manager.get(order.id).await.unwrap();
    assert_eq!(order_now.status, OrderStatus::Confirmed);

    // Same partner cannot be handed the same order again
    let err = h.fulfillment.assign(order.id, p1).await.unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));

    let second = h.fulfillment.assign(order.id, p2).await.unwrap();
    assert_eq!(second.status, PartnerOrderStatus::AwaitingAcceptance);

    // The ops view reflects the new live assignment, not the rejected one
    let live = h.assignments.get_live_for_order(order.id).await.unwrap();
    let view = brandkart_order::InternalOrderView::new(
        h.manager.get(order.id).await.unwrap(),
        live,
    );
    assert_eq!(view.partner_id, Some(p2));
    assert_eq!(view.live_assignment.unwrap().partner_id, p2);
}

#[tokio::test]
async fn test_order_items_are_immune_to_catalog_edits() {
    let h = harness();
    let mut product = tee();
    let mut cart = Cart::new(CartOwner::User("u1".to_string()));
    cart.add_item(&product, None, 20).unwrap();

    let order = h
        .checkout
        .checkout(
            &cart,
            "u1",
            address(),
            DeliveryOption::Standard,
            &DeliveryRates::default(),
            &tax(),
            "key-1",
        )
        .await
        .unwrap();

    // Reprice the catalog after checkout
    product.tiers = vec![PricingTier::new(1, None, 20_000)];
    product.customization_fee_paise = 1_000;

    let stored = h.manager.get(order.id).await.unwrap();
    assert_eq!(stored.items[0].unit_price_paise, 8_100);
    assert_eq!(stored.items[0].subtotal_paise, 172_000);
    assert_eq!(stored.subtotal_paise, 172_000);
}

#[tokio::test]
async fn test_settlement_claims_each_order_once() {
    let h = harness();
    let partner_id = Uuid::new_v4();

    let order = place_order(&h, "key-1").await;
    pay(&h, &order).await;
    fulfill(&h, order.id, partner_id).await;

    let start = Utc::now() - Duration::hours(1);
    let end = Utc::now() + Duration::hours(1);

    let settlement = h
        .batcher
        .run(partner_id, start, end)
        .await
        .unwrap()
        .expect("delivered order should settle");

    assert_eq!(settlement.orders.len(), 1);
    let row = &settlement.orders[0];
    // Commission off the pre-tax product amount at the 20% default
    assert_eq!(row.product_amount_paise, 172_000);
    assert_eq!(row.platform_commission_paise, 34_400);
    assert_eq!(row.partner_earnings_paise, 137_600);
    assert_eq!(settlement.total_partner_earnings_paise, 137_600);
    assert_eq!(settlement.commission_version, 1);

    // Re-running the same window finds nothing left to claim
    let rerun = h.batcher.run(partner_id, start, end).await.unwrap();
    assert!(rerun.is_none());
}

#[tokio::test]
async fn test_paid_order_must_refund_not_cancel() {
    let h = harness();
    let order = place_order(&h, "key-1").await;

    // Unpaid orders cancel directly
    let other = place_order(&h, "key-2").await;
    let cancelled = h
        .orchestrator
        .cancel_order(other.id, "Ordered by mistake", brandkart_order::Actor::Customer)
        .await
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.cancel_reason.as_deref(), Some("Ordered by mistake"));

    // Once the payment succeeded, cancellation is routed to the refund path
    pay(&h, &order).await;
    let err = h
        .orchestrator
        .cancel_order(order.id, "Changed my mind", brandkart_order::Actor::Customer)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::StateConflict(_)));
}

#[tokio::test]
async fn test_full_refund_flow() {
    let h = harness();
    let order = place_order(&h, "key-1").await;
    let payment = pay(&h, &order).await;

    // Amount must fit within the payment
    let err = h
        .refunds
        .initiate(payment.id, order.total_paise + 1, "Overcharge")
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));

    let refund = h
        .refunds
        .initiate(payment.id, order.total_paise, "Damaged in production")
        .await
        .unwrap();

    let order_now = h.manager.get(order.id).await.unwrap();
    assert_eq!(order_now.status, OrderStatus::RefundInitiated);

    // Only one refund may be open per payment
    let err = h
        .refunds
        .initiate(payment.id, 1_000, "Second thoughts")
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::StateConflict(_)));

    h.refunds.mark_processing(refund.id).await.unwrap();
    h.refunds.complete(refund.id).await.unwrap();

    let order_now = h.manager.get(order.id).await.unwrap();
    assert_eq!(order_now.status, OrderStatus::Refunded);
    assert!(order_now.status.is_final());

    let payment_now = h.payments.get(payment.id).await.unwrap();
    assert_eq!(payment_now.status, PaymentStatus::Refunded);
}

#[tokio::test]
async fn test_partial_refund_leaves_order_parked() {
    let h = harness();
    let order = place_order(&h, "key-1").await;
    let payment = pay(&h, &order).await;

    let refund = h
        .refunds
        .initiate(payment.id, 50_000, "One damaged carton")
        .await
        .unwrap();
    h.refunds.mark_processing(refund.id).await.unwrap();
    h.refunds.complete(refund.id).await.unwrap();

    // Partial refunds keep the order in REFUND_INITIATED for follow-up
    let order_now = h.manager.get(order.id).await.unwrap();
    assert_eq!(order_now.status, OrderStatus::RefundInitiated);
    assert_eq!(order_now.payment_id, Some(payment.id));

    // Settled payment is not swept
    let swept = h.orchestrator.expire_overdue(Utc::now()).await.unwrap();
    assert_eq!(swept, 0);
}
