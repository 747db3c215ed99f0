//! Audit trail queries.
//!
//! Recording happens inside the other services, transactionally with the
//! change each entry describes. This service only reads the trail back,
//! behind the `view_audit_log` capability.

use crate::audit::AuditFilter;
use crate::error::Result;
use crate::providers::RegistrationStore;
use crate::services::registrations::require;
use crate::state::{Actor, AuditEntry, Capability};

/// Audit trail query service.
#[derive(Debug, Clone)]
pub struct AuditService<S> {
    store: S,
}

impl<S> AuditService<S>
where
    S: RegistrationStore,
{
    /// Create the service.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Query the audit trail, newest entries first.
    ///
    /// # Errors
    ///
    /// `Forbidden` or `Storage`.
    pub async fn trail(&self, actor: Actor, filter: AuditFilter) -> Result<Vec<AuditEntry>> {
        require(actor, Capability::ViewAuditLog)?;
        self.store.audit_entries(&filter).await
    }
}
