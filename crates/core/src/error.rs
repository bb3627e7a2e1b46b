use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Optimistic-lock failure that survived the internal retry.
    #[error("Card {card_id} was modified concurrently; retry the review")]
    ConcurrencyConflict { card_id: DbId },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether the caller may resubmit the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::ConcurrencyConflict { .. })
    }
}
