use std::sync::Arc;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use brandkart_core::commission::CommissionSource;
use brandkart_core::notify::NotificationDispatcher;
use brandkart_core::{CoreError, CoreResult};
use brandkart_shared::events::{DomainEvent, SettlementCompletedEvent};
use brandkart_shared::money::apply_bps;

use crate::models::{Settlement, SettlementOrder, SettlementStatus};
use crate::repository::{AssignmentRepository, OrderRepository, SettlementRepository};

/// Periodically rolls a partner's delivered orders into a settlement with
/// a frozen commission split.
///
/// The commission snapshot is read exactly once per run, so a config
/// change mid-batch cannot split one settlement across two rate sets. The
/// (settlement, order) claim constraint in the repository is the guard
/// against double-counting across runs.
pub struct SettlementBatcher {
    assignments: Arc<dyn AssignmentRepository>,
    orders: Arc<dyn OrderRepository>,
    settlements: Arc<dyn SettlementRepository>,
    commission: Arc<dyn CommissionSource>,
    notifier: Arc<dyn NotificationDispatcher>,
}

impl SettlementBatcher {
    pub fn new(
        assignments: Arc<dyn AssignmentRepository>,
        orders: Arc<dyn OrderRepository>,
        settlements: Arc<dyn SettlementRepository>,
        commission: Arc<dyn CommissionSource>,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            assignments,
            orders,
            settlements,
            commission,
            notifier,
        }
    }

    /// Run one batch for `partner` over `[start, end)`. Returns `None` when
    /// every eligible order is already claimed (typically a re-run).
    pub async fn run(
        &self,
        partner_id: Uuid,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> CoreResult<Option<Settlement>> {
        if period_end <= period_start {
            return Err(CoreError::Validation(
                "Settlement period end must be after its start".to_string(),
            ));
        }

        let snapshot = self.commission.active_snapshot().await?;

        let delivered = self
            .assignments
            .list_delivered_in(partner_id, period_start, period_end)
            .await?;
        let candidate_ids: Vec<Uuid> = delivered.iter().map(|a| a.order_id).collect();
        if candidate_ids.is_empty() {
            return Ok(None);
        }

        let claimed = self.settlements.filter_claimed(&candidate_ids).await?;
        let eligible: Vec<Uuid> = candidate_ids
            .into_iter()
            .filter(|id| !claimed.contains(id))
            .collect();
        if eligible.is_empty() {
            return Ok(None);
        }

        let mut settlement =
            Settlement::new(partner_id, period_start, period_end, snapshot.version);
        for order_id in eligible {
            let order = self.orders.get(order_id).await?;
            // Product amount: post line-item discount, pre-tax, pre-delivery
            let product_amount = order.subtotal_paise;
            let rate = snapshot.resolve(partner_id, order.primary_category());
            let commission = apply_bps(product_amount, rate);
            settlement.push_order(SettlementOrder {
                id: Uuid::new_v4(),
                settlement_id: settlement.id,
                order_id,
                product_amount_paise: product_amount,
                commission_bps: rate,
                platform_commission_paise: commission,
                partner_earnings_paise: product_amount - commission,
            });
        }

        // Claims are re-checked and taken under one repository lock; a
        // racing run for the same window loses with a conflict.
        self.settlements.insert_claiming(&settlement).await?;

        tracing::info!(
            settlement_id = %settlement.id,
            partner_id = %partner_id,
            orders = settlement.orders.len(),
            earnings_paise = settlement.total_partner_earnings_paise,
            "Settlement created"
        );
        Ok(Some(settlement))
    }

    /// Payout initiated.
    pub async fn mark_processing(&self, settlement_id: Uuid) -> CoreResult<Settlement> {
        let mut settlement = self.settlements.get(settlement_id).await?;
        if settlement.status != SettlementStatus::Pending {
            return Err(CoreError::StateConflict(format!(
                "Settlement {} is {:?}, expected PENDING",
                settlement.id, settlement.status
            )));
        }
        settlement.status = SettlementStatus::Processing;
        self.settlements.save(&settlement).await?;
        Ok(settlement)
    }

    /// Payout landed.
    pub async fn complete(&self, settlement_id: Uuid) -> CoreResult<Settlement> {
        let mut settlement = self.settlements.get(settlement_id).await?;
        if settlement.status != SettlementStatus::Processing {
            return Err(CoreError::StateConflict(format!(
                "Settlement {} is {:?}, expected PROCESSING",
                settlement.id, settlement.status
            )));
        }
        let now = Utc::now();
        settlement.status = SettlementStatus::Completed;
        settlement.completed_at = Some(now);
        self.settlements.save(&settlement).await?;

        if let Err(e) = self
            .notifier
            .dispatch(DomainEvent::SettlementCompleted(SettlementCompletedEvent {
                settlement_id: settlement.id,
                partner_id: settlement.partner_id,
                partner_earnings_paise: settlement.total_partner_earnings_paise,
                order_count: settlement.orders.len(),
                timestamp: now.timestamp(),
            }))
            .await
        {
            tracing::warn!(error = %e, "Settlement-completed notification failed");
        }
        Ok(settlement)
    }

    /// Payout failed. Line items are retained; remediation is a fresh
    /// settlement or a manual payout, never an in-place retry.
    pub async fn fail(&self, settlement_id: Uuid, reason: &str) -> CoreResult<Settlement> {
        let mut settlement = self.settlements.get(settlement_id).await?;
        if matches!(
            settlement.status,
            SettlementStatus::Completed | SettlementStatus::Failed
        ) {
            return Err(CoreError::StateConflict(format!(
                "Settlement {} is already settled as {:?}",
                settlement.id, settlement.status
            )));
        }
        settlement.status = SettlementStatus::Failed;
        settlement.failure_reason = Some(reason.to_string());
        self.settlements.save(&settlement).await?;
        tracing::warn!(settlement_id = %settlement.id, reason, "Settlement failed");
        Ok(settlement)
    }
}
