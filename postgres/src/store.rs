//! [`RegistrationStore`] implementation.

use crate::rows::{
    AuditRow, EventRow, PaymentRow, RegistrationRow, AUDIT_COLS, EVENT_COLS, PAYMENT_COLS,
    REGISTRATION_COLS,
};
use crate::PostgresStore;
use rsvp_core::audit::{AuditFilter, NewAuditEntry};
use rsvp_core::providers::{
    CapacityReconciliation, ConfirmOutcome, Confirmation, RegistrationStore, TransitionOutcome,
};
use rsvp_core::{
    AttemptStatus, AuditEntry, ConfirmationChannel, CoreError, Event, EventId, PaymentAttempt,
    PaymentStatus, Registration, RegistrationId, RegistrationStatus, Result,
};
use uuid::Uuid;

fn storage(context: &str) -> impl FnOnce(sqlx::Error) -> CoreError + '_ {
    move |e| CoreError::storage(format!("{context}: {e}"))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Append an audit entry on the given connection (inside a transaction,
/// the entry commits with the state change or not at all).
async fn insert_audit(conn: &mut sqlx::PgConnection, entry: &NewAuditEntry) -> Result<()> {
    sqlx::query(
        "INSERT INTO audit_log \
             (id, actor_id, action, target_type, target_id, details, ip_address, user_agent) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(Uuid::new_v4())
    .bind(entry.actor_id.0)
    .bind(&entry.action)
    .bind(entry.target_type)
    .bind(entry.target_id)
    .bind(&entry.details)
    .bind(entry.provenance.ip_address.map(|ip| ip.to_string()))
    .bind(&entry.provenance.user_agent)
    .execute(conn)
    .await
    .map_err(storage("failed to insert audit entry"))?;
    Ok(())
}

impl RegistrationStore for PostgresStore {
    async fn event(&self, id: EventId) -> Result<Option<Event>> {
        let row: Option<EventRow> =
            sqlx::query_as(&format!("SELECT {EVENT_COLS} FROM events WHERE id = $1"))
                .bind(id.0)
                .fetch_optional(self.pool())
                .await
                .map_err(storage("failed to fetch event"))?;
        row.map(Event::try_from).transpose()
    }

    async fn insert_event(&self, event: &Event, audit: NewAuditEntry) -> Result<Event> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(storage("failed to start transaction"))?;

        sqlx::query(
            "INSERT INTO events \
                 (id, title, description, event_date, registration_deadline, is_paid, \
                  price_minor, max_participants, current_participants, status, created_by, \
                  form_schema, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(event.id.0)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.event_date)
        .bind(event.registration_deadline)
        .bind(event.is_paid)
        .bind(event.price.minor_units())
        .bind(event.max_participants.map(i64::from))
        .bind(i64::from(event.current_participants))
        .bind(event.status.as_str())
        .bind(event.created_by.0)
        .bind(&event.form_schema)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(storage("failed to insert event"))?;

        insert_audit(&mut tx, &audit).await?;
        tx.commit()
            .await
            .map_err(storage("failed to commit event insert"))?;
        Ok(event.clone())
    }

    async fn update_event(&self, event: &Event, audit: NewAuditEntry) -> Result<Event> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(storage("failed to start transaction"))?;

        // current_participants is deliberately absent: the ledger owns it.
        let result = sqlx::query(
            "UPDATE events SET \
                 title = $2, description = $3, event_date = $4, registration_deadline = $5, \
                 is_paid = $6, price_minor = $7, max_participants = $8, status = $9, \
                 form_schema = $10, updated_at = $11 \
             WHERE id = $1",
        )
        .bind(event.id.0)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.event_date)
        .bind(event.registration_deadline)
        .bind(event.is_paid)
        .bind(event.price.minor_units())
        .bind(event.max_participants.map(i64::from))
        .bind(event.status.as_str())
        .bind(&event.form_schema)
        .bind(event.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(storage("failed to update event"))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::not_found("event", event.id));
        }

        insert_audit(&mut tx, &audit).await?;

        let row: EventRow =
            sqlx::query_as(&format!("SELECT {EVENT_COLS} FROM events WHERE id = $1"))
                .bind(event.id.0)
                .fetch_one(&mut *tx)
                .await
                .map_err(storage("failed to reload event"))?;
        tx.commit()
            .await
            .map_err(storage("failed to commit event update"))?;
        row.try_into()
    }

    async fn registration(&self, id: RegistrationId) -> Result<Option<Registration>> {
        let row: Option<RegistrationRow> = sqlx::query_as(&format!(
            "SELECT {REGISTRATION_COLS} FROM registrations WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(self.pool())
        .await
        .map_err(storage("failed to fetch registration"))?;
        row.map(Registration::try_from).transpose()
    }

    async fn insert_registration(&self, registration: &Registration) -> Result<Registration> {
        // No pre-check: the (event_id, user_id) constraint is the
        // duplicate guard, so concurrent identical requests cannot both
        // pass.
        sqlx::query(
            "INSERT INTO registrations \
                 (id, event_id, user_id, status, payment_status, form_data, \
                  payment_order_id, payment_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(registration.id.0)
        .bind(registration.event_id.0)
        .bind(registration.user_id.0)
        .bind(registration.status.as_str())
        .bind(registration.payment_status.as_str())
        .bind(&registration.form_data)
        .bind(&registration.payment_order_id)
        .bind(&registration.payment_id)
        .bind(registration.created_at)
        .bind(registration.updated_at)
        .execute(self.pool())
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CoreError::conflict("already registered for this event")
            } else {
                CoreError::storage(format!("failed to insert registration: {e}"))
            }
        })?;
        Ok(registration.clone())
    }

    async fn transition_registration(
        &self,
        id: RegistrationId,
        new_status: RegistrationStatus,
        payment_status: Option<PaymentStatus>,
        audit: NewAuditEntry,
    ) -> Result<TransitionOutcome> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(storage("failed to start transaction"))?;

        // Row lock serializes concurrent transitions on the same
        // registration; the boundary decision below uses the locked
        // status, not the caller's stale read.
        let row: Option<RegistrationRow> = sqlx::query_as(&format!(
            "SELECT {REGISTRATION_COLS} FROM registrations WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.0)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage("failed to lock registration"))?;
        let row = row.ok_or_else(|| CoreError::not_found("registration", id))?;
        let old_status = RegistrationStatus::parse(&row.status).ok_or_else(|| {
            CoreError::storage(format!("unknown registration status {:?}", row.status))
        })?;
        let event_id = row.event_id;

        sqlx::query(
            "UPDATE registrations SET \
                 status = $2, payment_status = COALESCE($3, payment_status), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id.0)
        .bind(new_status.as_str())
        .bind(payment_status.map(PaymentStatus::as_str))
        .execute(&mut *tx)
        .await
        .map_err(storage("failed to update registration"))?;

        let was_accepted = old_status == RegistrationStatus::Accepted;
        let now_accepted = new_status == RegistrationStatus::Accepted;
        if was_accepted != now_accepted {
            let delta: i32 = if now_accepted { 1 } else { -1 };
            // Atomic adjustment with a zero floor; a decrement below zero
            // indicates prior drift and is clamped, not raised.
            sqlx::query(
                "UPDATE events SET \
                     current_participants = GREATEST(current_participants + $2, 0), \
                     updated_at = NOW() \
                 WHERE id = $1",
            )
            .bind(event_id)
            .bind(delta)
            .execute(&mut *tx)
            .await
            .map_err(storage("failed to adjust capacity"))?;
        }

        insert_audit(&mut tx, &audit).await?;

        let updated: RegistrationRow = sqlx::query_as(&format!(
            "SELECT {REGISTRATION_COLS} FROM registrations WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_one(&mut *tx)
        .await
        .map_err(storage("failed to reload registration"))?;
        tx.commit()
            .await
            .map_err(storage("failed to commit transition"))?;

        Ok(TransitionOutcome {
            registration: updated.try_into()?,
            old_status,
        })
    }

    async fn active_attempt(
        &self,
        registration_id: RegistrationId,
    ) -> Result<Option<PaymentAttempt>> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {PAYMENT_COLS} FROM payments \
             WHERE registration_id = $1 AND status IN ('created', 'paid')"
        ))
        .bind(registration_id.0)
        .fetch_optional(self.pool())
        .await
        .map_err(storage("failed to fetch active attempt"))?;
        row.map(PaymentAttempt::try_from).transpose()
    }

    async fn insert_attempt(&self, attempt: &PaymentAttempt) -> Result<PaymentAttempt> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(storage("failed to start transaction"))?;

        let existing: Option<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {PAYMENT_COLS} FROM payments \
             WHERE registration_id = $1 AND status IN ('created', 'paid') FOR UPDATE"
        ))
        .bind(attempt.registration_id.0)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage("failed to check active attempt"))?;
        if let Some(row) = existing {
            tx.rollback()
                .await
                .map_err(storage("failed to roll back"))?;
            return row.try_into();
        }

        let inserted = sqlx::query(
            "INSERT INTO payments \
                 (id, registration_id, order_id, payment_id, signature, amount_minor, \
                  currency, status, webhook_received, webhook_verified, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(attempt.id.0)
        .bind(attempt.registration_id.0)
        .bind(&attempt.order_id)
        .bind(&attempt.payment_id)
        .bind(&attempt.signature)
        .bind(attempt.amount.minor_units())
        .bind(&attempt.currency)
        .bind(attempt.status.as_str())
        .bind(attempt.webhook_received)
        .bind(attempt.webhook_verified)
        .bind(attempt.created_at)
        .bind(attempt.updated_at)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            // A concurrent create won the partial-index race between our
            // check and our insert; converge on the surviving attempt.
            if is_unique_violation(&e) {
                tx.rollback()
                    .await
                    .map_err(storage("failed to roll back"))?;
                return self
                    .active_attempt(attempt.registration_id)
                    .await?
                    .ok_or_else(|| CoreError::conflict("order id already exists"));
            }
            return Err(CoreError::storage(format!(
                "failed to insert payment attempt: {e}"
            )));
        }

        sqlx::query(
            "UPDATE registrations SET \
                 payment_order_id = $2, payment_status = 'pending', updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(attempt.registration_id.0)
        .bind(&attempt.order_id)
        .execute(&mut *tx)
        .await
        .map_err(storage("failed to mark registration pending payment"))?;

        tx.commit()
            .await
            .map_err(storage("failed to commit attempt insert"))?;
        Ok(attempt.clone())
    }

    async fn confirm_attempt(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: Option<&str>,
        channel: ConfirmationChannel,
    ) -> Result<Confirmation> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(storage("failed to start transaction"))?;

        // The lock serializes the checkout and webhook channels; whoever
        // gets here second sees 'paid' and re-confirms as a no-op.
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {PAYMENT_COLS} FROM payments WHERE order_id = $1 FOR UPDATE"
        ))
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage("failed to lock payment attempt"))?;
        let row = row.ok_or_else(|| CoreError::not_found("payment attempt", order_id))?;
        let status = AttemptStatus::parse(&row.status).ok_or_else(|| {
            CoreError::storage(format!("unknown attempt status {:?}", row.status))
        })?;

        let outcome = match status {
            AttemptStatus::Created => {
                sqlx::query(
                    "UPDATE payments SET \
                         status = 'paid', payment_id = $2, \
                         signature = COALESCE($3, signature), updated_at = NOW() \
                     WHERE id = $1 AND status = 'created'",
                )
                .bind(row.id)
                .bind(payment_id)
                .bind(signature)
                .execute(&mut *tx)
                .await
                .map_err(storage("failed to mark attempt paid"))?;
                ConfirmOutcome::Applied
            }
            AttemptStatus::Paid => ConfirmOutcome::AlreadyPaid,
            AttemptStatus::Failed | AttemptStatus::Refunded => {
                return Err(CoreError::invalid_state(
                    "payment attempt is no longer confirmable",
                ));
            }
        };

        if channel == ConfirmationChannel::Webhook {
            sqlx::query(
                "UPDATE payments SET \
                     webhook_received = TRUE, webhook_verified = TRUE, updated_at = NOW() \
                 WHERE id = $1",
            )
            .bind(row.id)
            .execute(&mut *tx)
            .await
            .map_err(storage("failed to record webhook provenance"))?;
        }

        // Idempotent on re-confirm: the registration is already completed
        // and keeps the first writer's payment id.
        sqlx::query(
            "UPDATE registrations SET \
                 payment_status = 'completed', payment_id = COALESCE(payment_id, $2), \
                 updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(row.registration_id)
        .bind(payment_id)
        .execute(&mut *tx)
        .await
        .map_err(storage("failed to complete registration payment"))?;

        let confirmed: PaymentRow = sqlx::query_as(&format!(
            "SELECT {PAYMENT_COLS} FROM payments WHERE id = $1"
        ))
        .bind(row.id)
        .fetch_one(&mut *tx)
        .await
        .map_err(storage("failed to reload payment attempt"))?;
        tx.commit()
            .await
            .map_err(storage("failed to commit confirmation"))?;

        Ok(Confirmation {
            attempt: confirmed.try_into()?,
            outcome,
        })
    }

    async fn adjust_capacity(&self, event_id: EventId, delta: i32) -> Result<u32> {
        let current: Option<i32> = sqlx::query_scalar(
            "UPDATE events SET \
                 current_participants = GREATEST(current_participants + $2, 0), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING current_participants",
        )
        .bind(event_id.0)
        .bind(delta)
        .fetch_optional(self.pool())
        .await
        .map_err(storage("failed to adjust capacity"))?;
        let current = current.ok_or_else(|| CoreError::not_found("event", event_id))?;
        Ok(u32::try_from(current).unwrap_or(0))
    }

    async fn recount_accepted(&self, event_id: EventId) -> Result<u32> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM registrations WHERE event_id = $1 AND status = 'accepted'",
        )
        .bind(event_id.0)
        .fetch_one(self.pool())
        .await
        .map_err(storage("failed to recount accepted registrations"))?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn reconcile_capacity(
        &self,
        event_id: EventId,
        audit: NewAuditEntry,
    ) -> Result<CapacityReconciliation> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(storage("failed to start transaction"))?;

        let stored: Option<i32> = sqlx::query_scalar(
            "SELECT current_participants FROM events WHERE id = $1 FOR UPDATE",
        )
        .bind(event_id.0)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage("failed to lock event"))?;
        let stored = stored.ok_or_else(|| CoreError::not_found("event", event_id))?;
        let stored = u32::try_from(stored).unwrap_or(0);

        let actual: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM registrations WHERE event_id = $1 AND status = 'accepted'",
        )
        .bind(event_id.0)
        .fetch_one(&mut *tx)
        .await
        .map_err(storage("failed to recount accepted registrations"))?;
        let actual = u32::try_from(actual).unwrap_or(u32::MAX);

        let repaired = stored != actual;
        if repaired {
            sqlx::query(
                "UPDATE events SET current_participants = $2, updated_at = NOW() WHERE id = $1",
            )
            .bind(event_id.0)
            .bind(i64::from(actual))
            .execute(&mut *tx)
            .await
            .map_err(storage("failed to repair capacity"))?;

            let mut audit = audit;
            if let Some(details) = audit.details.as_object_mut() {
                details.insert("stored".into(), serde_json::json!(stored));
                details.insert("actual".into(), serde_json::json!(actual));
            }
            insert_audit(&mut tx, &audit).await?;
        }

        tx.commit()
            .await
            .map_err(storage("failed to commit reconciliation"))?;
        Ok(CapacityReconciliation {
            stored,
            actual,
            repaired,
        })
    }

    async fn record_audit(&self, entry: NewAuditEntry) -> Result<AuditEntry> {
        let row: AuditRow = sqlx::query_as(&format!(
            "INSERT INTO audit_log \
                 (id, actor_id, action, target_type, target_id, details, ip_address, user_agent) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {AUDIT_COLS}"
        ))
        .bind(Uuid::new_v4())
        .bind(entry.actor_id.0)
        .bind(&entry.action)
        .bind(entry.target_type)
        .bind(entry.target_id)
        .bind(&entry.details)
        .bind(entry.provenance.ip_address.map(|ip| ip.to_string()))
        .bind(&entry.provenance.user_agent)
        .fetch_one(self.pool())
        .await
        .map_err(storage("failed to record audit entry"))?;
        Ok(row.into())
    }

    async fn audit_entries(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        let limit = i64::from(filter.limit.unwrap_or(100));
        let rows: Vec<AuditRow> = sqlx::query_as(&format!(
            "SELECT {AUDIT_COLS} FROM audit_log \
             WHERE ($1::UUID IS NULL OR actor_id = $1) \
               AND ($2::VARCHAR IS NULL OR action = $2) \
               AND ($3::VARCHAR IS NULL OR target_type = $3) \
             ORDER BY created_at DESC \
             LIMIT $4"
        ))
        .bind(filter.actor_id.map(|a| a.0))
        .bind(&filter.action)
        .bind(&filter.target_type)
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(storage("failed to query audit trail"))?;
        Ok(rows.into_iter().map(AuditEntry::from).collect())
    }
}
