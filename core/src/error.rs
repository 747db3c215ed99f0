//! Error types for registration and payment operations.

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Error taxonomy for the registration lifecycle and payment
/// reconciliation core.
///
/// Every variant except [`CoreError::Storage`] is a recoverable outcome
/// surfaced to the caller; a storage failure rolls back the whole
/// operation it interrupted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    // ═══════════════════════════════════════════════════════════
    // Lookup & state errors
    // ═══════════════════════════════════════════════════════════

    /// A referenced entity does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of the missing entity.
        entity: &'static str,
        /// Its id.
        id: String,
    },

    /// The operation is not valid for the entity's current status.
    #[error("invalid state: {reason}")]
    InvalidState {
        /// What was violated.
        reason: String,
    },

    /// A uniqueness or already-completed constraint was violated.
    #[error("conflict: {reason}")]
    Conflict {
        /// What conflicted.
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════
    // Registration-window errors
    // ═══════════════════════════════════════════════════════════

    /// The registration deadline has passed.
    #[error("registration deadline has passed")]
    DeadlinePassed,

    /// The event has no free participant slot.
    #[error("event is full")]
    CapacityExhausted,

    // ═══════════════════════════════════════════════════════════
    // Payment errors
    // ═══════════════════════════════════════════════════════════

    /// A payment or webhook signature failed verification.
    #[error("invalid payment signature")]
    InvalidSignature,

    /// The external gateway call failed or timed out.
    #[error("payment gateway error: {reason}")]
    Gateway {
        /// Gateway failure description.
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════
    // Authorization & system errors
    // ═══════════════════════════════════════════════════════════

    /// The actor lacks a required capability.
    #[error("insufficient permissions: {required}")]
    Forbidden {
        /// The missing capability.
        required: &'static str,
    },

    /// The persistence layer failed mid-operation; the transaction was
    /// rolled back.
    #[error("storage error: {reason}")]
    Storage {
        /// Storage failure description.
        reason: String,
    },
}

impl CoreError {
    /// Shorthand for a [`CoreError::NotFound`].
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for a [`CoreError::InvalidState`].
    #[must_use]
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`CoreError::Conflict`].
    #[must_use]
    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`CoreError::Gateway`].
    #[must_use]
    pub fn gateway(reason: impl Into<String>) -> Self {
        Self::Gateway {
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`CoreError::Storage`].
    #[must_use]
    pub fn storage(reason: impl Into<String>) -> Self {
        Self::Storage {
            reason: reason.into(),
        }
    }
}
