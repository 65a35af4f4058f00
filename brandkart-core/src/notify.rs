use async_trait::async_trait;

use brandkart_shared::events::DomainEvent;

use crate::CoreResult;

/// Notification/email dispatch contract. Fire-and-forget from the core's
/// point of view: callers log a failure and move on.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, event: DomainEvent) -> CoreResult<()>;
}

/// Dispatcher that only logs, used in tests and the worker demo.
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn dispatch(&self, event: DomainEvent) -> CoreResult<()> {
        tracing::info!(?event, "Dispatching notification");
        Ok(())
    }
}
