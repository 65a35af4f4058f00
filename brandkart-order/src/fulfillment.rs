use std::sync::Arc;
use chrono::Utc;
use uuid::Uuid;

use brandkart_core::notify::NotificationDispatcher;
use brandkart_core::{CoreError, CoreResult};
use brandkart_shared::events::{DomainEvent, OrderShippedEvent, PartnerAssignedEvent};

use crate::manager::OrderManager;
use crate::models::{PartnerAssignment, PartnerOrderStatus};
use crate::repository::AssignmentRepository;

/// Runs the internal partner-side fulfillment machine.
///
/// Assignments are internal only; each milestone here is translated into
/// client vocabulary through the order manager, and raw partner states
/// never leave this layer.
pub struct PartnerAssignmentService {
    assignments: Arc<dyn AssignmentRepository>,
    manager: Arc<OrderManager>,
    notifier: Arc<dyn NotificationDispatcher>,
}

impl PartnerAssignmentService {
    pub fn new(
        assignments: Arc<dyn AssignmentRepository>,
        manager: Arc<OrderManager>,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            assignments,
            manager,
            notifier,
        }
    }

    /// Assign a partner to a paid order. The repository enforces both the
    /// single-live-assignment rule (first writer wins, second gets a
    /// conflict) and (order, partner) pair uniqueness, so a rejected
    /// partner cannot be assigned the same order twice.
    pub async fn assign(&self, order_id: Uuid, partner_id: Uuid) -> CoreResult<PartnerAssignment> {
        let order = self.manager.get(order_id).await?;
        if !order.status.is_active() {
            return Err(CoreError::StateConflict(format!(
                "Order {} in state {:?} cannot be assigned to a partner",
                order.order_number, order.status
            )));
        }

        let assignment = PartnerAssignment::new(order_id, partner_id);
        self.assignments.insert(&assignment).await?;
        self.manager.attach_partner(order_id, partner_id).await?;

        if let Err(e) = self
            .notifier
            .dispatch(DomainEvent::PartnerAssigned(PartnerAssignedEvent {
                order_id,
                assignment_id: assignment.id,
                partner_id,
                timestamp: Utc::now().timestamp(),
            }))
            .await
        {
            tracing::warn!(error = %e, "Partner-assigned notification failed");
        }

        tracing::info!(order_id = %order_id, partner_id = %partner_id, "Partner assigned");
        Ok(assignment)
    }

    /// Partner accepts the job. Mirrors to the client as "Processing".
    pub async fn accept(&self, assignment_id: Uuid) -> CoreResult<PartnerAssignment> {
        self.advance(assignment_id, PartnerOrderStatus::Accepted).await
    }

    /// Partner declines; a reason is mandatory. The order stays CONFIRMED
    /// and awaits reassignment to a different partner.
    pub async fn reject(&self, assignment_id: Uuid, reason: &str) -> CoreResult<PartnerAssignment> {
        if reason.trim().is_empty() {
            return Err(CoreError::Validation(
                "A rejection reason is required".to_string(),
            ));
        }
        let mut assignment = self.assignments.get(assignment_id).await?;
        if !assignment.advance(PartnerOrderStatus::Rejected) {
            return Err(CoreError::StateConflict(format!(
                "Assignment {} in state {:?} cannot be rejected",
                assignment.id, assignment.status
            )));
        }
        assignment.rejection_reason = Some(reason.to_string());
        self.assignments.save(&assignment).await?;
        tracing::info!(assignment_id = %assignment.id, "Assignment rejected");
        Ok(assignment)
    }

    pub async fn start_production(&self, assignment_id: Uuid) -> CoreResult<PartnerAssignment> {
        self.advance(assignment_id, PartnerOrderStatus::InProduction).await
    }

    pub async fn ready_to_ship(&self, assignment_id: Uuid) -> CoreResult<PartnerAssignment> {
        self.advance(assignment_id, PartnerOrderStatus::ReadyToShip).await
    }

    pub async fn mark_shipped(&self, assignment_id: Uuid) -> CoreResult<PartnerAssignment> {
        let assignment = self.advance(assignment_id, PartnerOrderStatus::Shipped).await?;
        let order = self.manager.get(assignment.order_id).await?;
        if let Err(e) = self
            .notifier
            .dispatch(DomainEvent::OrderShipped(OrderShippedEvent {
                order_id: order.id,
                order_number: order.order_number.clone(),
                timestamp: Utc::now().timestamp(),
            }))
            .await
        {
            tracing::warn!(error = %e, "Order-shipped notification failed");
        }
        Ok(assignment)
    }

    pub async fn mark_delivered(&self, assignment_id: Uuid) -> CoreResult<PartnerAssignment> {
        self.advance(assignment_id, PartnerOrderStatus::Delivered).await
    }

    async fn advance(
        &self,
        assignment_id: Uuid,
        to: PartnerOrderStatus,
    ) -> CoreResult<PartnerAssignment> {
        let mut assignment = self.assignments.get(assignment_id).await?;
        if !assignment.advance(to) {
            return Err(CoreError::StateConflict(format!(
                "Assignment {} cannot move from {:?} to {:?}",
                assignment.id, assignment.status, to
            )));
        }
        self.assignments.save(&assignment).await?;

        if let Some(client_status) = to.client_status() {
            self.manager
                .mirror_partner_status(
                    assignment.order_id,
                    client_status,
                    Some(format!(
                        "Partner {} reported {:?}",
                        assignment.partner_id, to
                    )),
                )
                .await?;
        }
        Ok(assignment)
    }
}
