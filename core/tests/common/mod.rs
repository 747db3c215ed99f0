//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use chrono::{Duration, Utc};
use rsvp_core::{
    Actor, AuditService, Clock, Event, EventId, EventService, EventStatus, Money, PaymentService,
    Provenance, RegistrationService, Role, UserId,
};
use rsvp_testing::{FixedClock, InMemoryStore, MockGateway};

pub struct TestEnv {
    pub store: InMemoryStore,
    pub gateway: MockGateway,
    pub clock: FixedClock,
    pub registrations: RegistrationService<InMemoryStore, FixedClock>,
    pub payments: PaymentService<InMemoryStore, MockGateway, FixedClock>,
    pub events: EventService<InMemoryStore, FixedClock>,
    pub audit: AuditService<InMemoryStore>,
}

pub fn env() -> TestEnv {
    let store = InMemoryStore::new();
    let gateway = MockGateway::default();
    let clock = FixedClock::at(Utc::now());
    TestEnv {
        registrations: RegistrationService::new(store.clone(), clock.clone()),
        payments: PaymentService::new(store.clone(), gateway.clone(), clock.clone()),
        events: EventService::new(store.clone(), clock.clone()),
        audit: AuditService::new(store.clone()),
        store,
        gateway,
        clock,
    }
}

pub fn client() -> Actor {
    Actor::new(UserId::new(), Role::Client)
}

pub fn admin() -> Actor {
    Actor::new(UserId::new(), Role::Admin)
}

pub fn developer() -> Actor {
    Actor::new(UserId::new(), Role::Developer)
}

pub fn no_provenance() -> Provenance {
    Provenance::default()
}

/// Seed a published event, deadline a week out.
pub fn seed_published(env: &TestEnv, max_participants: Option<u32>, is_paid: bool) -> EventId {
    let now = env.clock.now();
    let event = Event {
        id: EventId::new(),
        title: "Annual Meetup".to_string(),
        description: None,
        event_date: now + Duration::days(30),
        registration_deadline: now + Duration::days(7),
        is_paid,
        price: if is_paid {
            Money::from_major(750)
        } else {
            Money::ZERO
        },
        max_participants,
        current_participants: 0,
        status: EventStatus::Published,
        created_by: UserId::new(),
        form_schema: None,
        created_at: now,
        updated_at: now,
    };
    let id = event.id;
    env.store.seed_event(event);
    id
}

pub fn form() -> serde_json::Value {
    serde_json::json!({ "name": "A. Participant" })
}
