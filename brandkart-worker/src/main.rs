use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use brandkart_core::commission::{CommissionSnapshot, CommissionSource, FixedCommissionSource};
use brandkart_core::gateway::MockGateway;
use brandkart_core::invoice::MockInvoiceGenerator;
use brandkart_core::notify::LogDispatcher;
use brandkart_order::manager::OrderManager;
use brandkart_order::orchestrator::PaymentOrchestrator;
use brandkart_order::settlement::SettlementBatcher;
use brandkart_store::{
    Config, InMemoryAssignmentRepo, InMemoryInvoiceRepo, InMemoryOrderRepo, InMemoryPaymentRepo,
    InMemorySettlementRepo,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "brandkart_worker=debug,brandkart_order=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().expect("Failed to load config");
    info!(
        sweep_secs = config.worker.payment_sweep_interval_secs,
        settlement_secs = config.worker.settlement_interval_secs,
        "Starting BrandKart worker"
    );

    let orders = Arc::new(InMemoryOrderRepo::new());
    let payments = Arc::new(InMemoryPaymentRepo::new());
    let assignments = Arc::new(InMemoryAssignmentRepo::new());
    let invoices = Arc::new(InMemoryInvoiceRepo::new());
    let settlements = Arc::new(InMemorySettlementRepo::new());

    let manager = Arc::new(OrderManager::new(orders.clone()));
    let notifier = Arc::new(LogDispatcher);

    let orchestrator = Arc::new(PaymentOrchestrator::new(
        payments,
        invoices,
        manager.clone(),
        Arc::new(MockGateway::new(config.gateway.webhook_secret.clone())),
        Arc::new(MockInvoiceGenerator),
        notifier.clone(),
        config.business_rules.payment_expiry_minutes,
    ));

    let commission: Arc<dyn CommissionSource> = Arc::new(FixedCommissionSource::new(
        CommissionSnapshot {
            version: 1,
            default_bps: config.business_rules.default_commission_bps,
            category_bps: HashMap::new(),
            partner_override_bps: HashMap::new(),
        },
    ));
    let batcher = Arc::new(SettlementBatcher::new(
        assignments,
        orders,
        settlements,
        commission,
        notifier,
    ));

    let sweep = tokio::spawn(payment_sweep_loop(
        orchestrator,
        config.worker.payment_sweep_interval_secs,
    ));
    let settle = tokio::spawn(settlement_loop(
        batcher,
        config.worker.settlement_interval_secs,
        config.business_rules.settlement_period_days,
        config.worker.settlement_partners.clone(),
    ));

    let _ = tokio::join!(sweep, settle);
}

/// Periodically expire payment attempts whose window has lapsed, rolling
/// their orders to PaymentFailed so the customer can retry.
async fn payment_sweep_loop(orchestrator: Arc<PaymentOrchestrator>, interval_secs: u64) {
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
    loop {
        ticker.tick().await;
        match orchestrator.expire_overdue(Utc::now()).await {
            Ok(0) => {}
            Ok(count) => info!(count, "Expired overdue payment attempts"),
            Err(e) => error!("Payment expiry sweep failed: {}", e),
        }
    }
}

/// Periodically run settlement for each configured partner over the most
/// recent period. Re-runs are safe: already-claimed orders are skipped and
/// an empty batch produces no settlement.
async fn settlement_loop(
    batcher: Arc<SettlementBatcher>,
    interval_secs: u64,
    period_days: i64,
    partners: Vec<Uuid>,
) {
    if partners.is_empty() {
        info!("No settlement partners configured, settlement loop idle");
        return;
    }

    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
    loop {
        ticker.tick().await;
        let period_end = Utc::now();
        let period_start = period_end - Duration::days(period_days);
        for partner_id in &partners {
            match batcher.run(*partner_id, period_start, period_end).await {
                Ok(Some(settlement)) => info!(
                    %partner_id,
                    settlement_id = %settlement.id,
                    orders = settlement.orders.len(),
                    earnings_paise = settlement.total_partner_earnings_paise,
                    "Settlement batch created"
                ),
                Ok(None) => {}
                Err(e) => error!(%partner_id, "Settlement run failed: {}", e),
            }
        }
    }
}
