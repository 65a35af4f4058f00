pub mod commission;
pub mod gateway;
pub mod invoice;
pub mod notify;

/// Error taxonomy shared by every service in the engine.
///
/// `Validation` and `StateConflict` carry enough detail for the caller to
/// correct the request. `Security` deliberately carries no gateway
/// internals. `ExternalDependency` on non-critical side effects is logged
/// at the call site and never propagated.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("State conflict: {0}")]
    StateConflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Optimistic-concurrency loser or uniqueness-constraint violation.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Security check failed")]
    Security,

    #[error("External dependency failed: {0}")]
    ExternalDependency(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
