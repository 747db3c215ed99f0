//! Registration lifecycle and capacity ledger flows.

#![allow(clippy::unwrap_used)]

mod common;

use chrono::Duration;
use proptest::prelude::*;
use rsvp_core::{
    CoreError, EventStatus, PaymentStatus, Provenance, RegistrationStatus, RegistrationStore,
};

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let env = common::env();
    let event_id = common::seed_published(&env, None, false);
    let actor = common::client();

    env.registrations
        .register(actor, event_id, common::form())
        .await
        .unwrap();
    let err = env
        .registrations
        .register(actor, event_id, common::form())
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Conflict { .. }));
}

#[tokio::test]
async fn registration_closes_at_the_deadline() {
    let env = common::env();
    let event_id = common::seed_published(&env, None, false);

    env.clock.advance(Duration::days(7));
    let on_deadline = env
        .registrations
        .register(common::client(), event_id, common::form())
        .await;
    assert!(on_deadline.is_ok(), "the deadline instant is still open");

    env.clock.advance(Duration::seconds(1));
    let err = env
        .registrations
        .register(common::client(), event_id, common::form())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::DeadlinePassed));
}

#[tokio::test]
async fn draft_events_are_not_open() {
    let env = common::env();
    let event_id = common::seed_published(&env, None, false);
    {
        let mut event = env.store.event(event_id).await.unwrap().unwrap();
        event.status = EventStatus::Draft;
        env.store.seed_event(event);
    }

    let err = env
        .registrations
        .register(common::client(), event_id, common::form())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidState { .. }));
}

#[tokio::test]
async fn acceptance_moves_the_counter_exactly_on_boundary_crossings() {
    let env = common::env();
    let event_id = common::seed_published(&env, Some(5), false);
    let admin = common::admin();

    let reg = env
        .registrations
        .register(common::client(), event_id, common::form())
        .await
        .unwrap();

    // Pending -> Accepted: +1.
    env.registrations
        .transition(admin, reg.id, RegistrationStatus::Accepted, Provenance::default())
        .await
        .unwrap();
    assert_eq!(
        env.store.event(event_id).await.unwrap().unwrap().current_participants,
        1
    );

    // Accepted -> Accepted: no-op, still audited.
    env.registrations
        .transition(admin, reg.id, RegistrationStatus::Accepted, Provenance::default())
        .await
        .unwrap();
    assert_eq!(
        env.store.event(event_id).await.unwrap().unwrap().current_participants,
        1
    );
    assert_eq!(env.store.audit_count("registration_accepted"), 2);

    // Accepted -> Rejected: -1.
    env.registrations
        .transition(admin, reg.id, RegistrationStatus::Rejected, Provenance::default())
        .await
        .unwrap();
    assert_eq!(
        env.store.event(event_id).await.unwrap().unwrap().current_participants,
        0
    );

    // Rejected -> Pending: no boundary crossing.
    env.registrations
        .transition(admin, reg.id, RegistrationStatus::Pending, Provenance::default())
        .await
        .unwrap();
    assert_eq!(
        env.store.event(event_id).await.unwrap().unwrap().current_participants,
        0
    );
}

#[tokio::test]
async fn full_event_frees_a_slot_on_rejection() {
    let env = common::env();
    let event_id = common::seed_published(&env, Some(1), false);
    let admin = common::admin();
    let first = common::client();
    let second = common::client();

    let reg_a = env
        .registrations
        .register(first, event_id, common::form())
        .await
        .unwrap();
    env.registrations
        .transition(admin, reg_a.id, RegistrationStatus::Accepted, Provenance::default())
        .await
        .unwrap();

    // The event is now full.
    let err = env
        .registrations
        .register(second, event_id, common::form())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::CapacityExhausted));

    // Rejecting the accepted registration frees the slot.
    env.registrations
        .transition(admin, reg_a.id, RegistrationStatus::Rejected, Provenance::default())
        .await
        .unwrap();
    assert_eq!(
        env.store.event(event_id).await.unwrap().unwrap().current_participants,
        0
    );

    env.registrations
        .register(second, event_id, common::form())
        .await
        .unwrap();
}

#[tokio::test]
async fn override_may_overbook() {
    let env = common::env();
    let event_id = common::seed_published(&env, Some(1), false);
    let admin = common::admin();
    let dev = common::developer();

    // Both registrations land while the event still has the free slot.
    let reg_a = env
        .registrations
        .register(common::client(), event_id, common::form())
        .await
        .unwrap();
    let reg_b = env
        .registrations
        .register(common::client(), event_id, common::form())
        .await
        .unwrap();
    env.registrations
        .transition(admin, reg_a.id, RegistrationStatus::Accepted, Provenance::default())
        .await
        .unwrap();

    // The event is full; the override accepts regardless and the
    // counter follows.
    env.registrations
        .override_transition(dev, reg_b.id, RegistrationStatus::Accepted, Provenance::default())
        .await
        .unwrap();

    let event = env.store.event(event_id).await.unwrap().unwrap();
    assert_eq!(event.current_participants, 2);
    assert_eq!(env.store.audit_count("registration_override_accepted"), 1);
}

#[tokio::test]
async fn acceptance_opens_the_payment_window_on_paid_events() {
    let env = common::env();
    let event_id = common::seed_published(&env, None, true);
    let admin = common::admin();

    let reg = env
        .registrations
        .register(common::client(), event_id, common::form())
        .await
        .unwrap();
    assert_eq!(reg.payment_status, PaymentStatus::NotRequired);

    let outcome = env
        .registrations
        .transition(admin, reg.id, RegistrationStatus::Accepted, Provenance::default())
        .await
        .unwrap();
    assert_eq!(outcome.registration.payment_status, PaymentStatus::Pending);

    let outcome = env
        .registrations
        .transition(admin, reg.id, RegistrationStatus::Rejected, Provenance::default())
        .await
        .unwrap();
    assert_eq!(
        outcome.registration.payment_status,
        PaymentStatus::NotRequired
    );
}

#[tokio::test]
async fn reconcile_repairs_counter_drift_once() {
    let env = common::env();
    let event_id = common::seed_published(&env, Some(10), false);
    let dev = common::developer();

    // Manufacture drift below the ledger.
    env.store.adjust_capacity(event_id, 3).await.unwrap();

    let report = env
        .registrations
        .reconcile_capacity(dev, event_id, Provenance::default())
        .await
        .unwrap();
    assert_eq!(report.stored, 3);
    assert_eq!(report.actual, 0);
    assert!(report.repaired);
    assert_eq!(env.store.audit_count("capacity_reconciled"), 1);

    // A clean counter reconciles silently.
    let report = env
        .registrations
        .reconcile_capacity(dev, event_id, Provenance::default())
        .await
        .unwrap();
    assert!(!report.repaired);
    assert_eq!(env.store.audit_count("capacity_reconciled"), 1);
}

#[tokio::test]
async fn any_role_may_register_itself() {
    let env = common::env();
    let event_id = common::seed_published(&env, None, false);

    env.registrations
        .register(common::admin(), event_id, common::form())
        .await
        .unwrap();
    env.registrations
        .register(common::developer(), event_id, common::form())
        .await
        .unwrap();
}

#[tokio::test]
async fn client_cannot_transition() {
    let env = common::env();
    let event_id = common::seed_published(&env, None, false);
    let actor = common::client();

    let reg = env
        .registrations
        .register(actor, event_id, common::form())
        .await
        .unwrap();
    let err = env
        .registrations
        .transition(actor, reg.id, RegistrationStatus::Accepted, Provenance::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Forbidden { .. }));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The stored participant counter always equals the number of
    /// registrations in accepted status, whatever sequence of admin
    /// transitions ran.
    #[test]
    fn counter_always_matches_accepted_count(
        ops in proptest::collection::vec((0usize..4, 0u8..3), 1..40)
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            let env = common::env();
            let event_id = common::seed_published(&env, None, false);
            let admin = common::admin();

            let mut regs = Vec::new();
            for _ in 0..4 {
                let reg = env
                    .registrations
                    .register(common::client(), event_id, common::form())
                    .await
                    .unwrap();
                regs.push(reg.id);
            }

            for (idx, status) in ops {
                let status = match status {
                    0 => RegistrationStatus::Pending,
                    1 => RegistrationStatus::Accepted,
                    _ => RegistrationStatus::Rejected,
                };
                env.registrations
                    .transition(admin, regs[idx], status, Provenance::default())
                    .await
                    .unwrap();
            }

            let event = env.store.event(event_id).await.unwrap().unwrap();
            let accepted = env.store.recount_accepted(event_id).await.unwrap();
            assert_eq!(event.current_participants, accepted);
        });
    }
}
