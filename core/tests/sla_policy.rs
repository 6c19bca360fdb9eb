//! SLA deadline policy tests: creation-time deadlines and the
//! replace-on-reprioritize rule.

use chrono::{Duration, TimeZone, Utc};
use grievance_core::clock::{Clock, ManualClock};
use grievance_core::complaint::{Department, Locality, Priority};
use grievance_core::config::EngineConfig;
use grievance_core::engine::{GrievanceEngine, NewComplaint};
use grievance_core::store::GrievanceStore;
use std::sync::Arc;

fn engine() -> (GrievanceEngine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
    ));
    let store = GrievanceStore::in_memory().unwrap();
    store.migrate().unwrap();
    (
        GrievanceEngine::with_clock(store, EngineConfig::default(), clock.clone()),
        clock,
    )
}

fn request(title: &str, description: &str) -> NewComplaint {
    NewComplaint {
        title: title.into(),
        description: description.into(),
        department: Some(Department::Water),
        locality: Locality::Warangal,
        location: None,
    }
}

/// Two urgent keywords make a high-priority complaint, and high gets
/// the 24-hour window anchored at submission time.
#[test]
fn high_priority_gets_24h_deadline() {
    let (engine, clock) = engine();
    let c = engine
        .create_complaint(request(
            "Urgent: burst pipeline",
            "Water flooding the whole lane",
        ))
        .unwrap();
    assert_eq!(c.priority, Priority::High);
    assert_eq!(c.sla_deadline, Some(clock.now() + Duration::hours(24)));
}

/// Bland text stays low priority with the one-week window.
#[test]
fn low_priority_gets_168h_deadline() {
    let (engine, clock) = engine();
    let c = engine
        .create_complaint(request("Faded crossing", "Please repaint the zebra crossing"))
        .unwrap();
    assert_eq!(c.priority, Priority::Low);
    assert_eq!(c.sla_deadline, Some(clock.now() + Duration::hours(168)));
}

/// Reprioritizing recomputes the deadline from "now" with the new
/// tier's window; the old deadline is replaced, never extended.
#[test]
fn reprioritize_replaces_the_deadline() {
    let (engine, clock) = engine();
    let c = engine
        .create_complaint(request("Faded crossing", "Please repaint the zebra crossing"))
        .unwrap();
    let original = c.sla_deadline.unwrap();

    clock.advance(Duration::hours(6));
    let updated = engine
        .update_priority(&c.complaint_id, Priority::High)
        .unwrap();

    assert_eq!(updated.priority, Priority::High);
    assert_eq!(updated.sla_deadline, Some(clock.now() + Duration::hours(24)));
    assert_ne!(updated.sla_deadline, Some(original));
}

/// Validation rejects empty content before any classification runs.
#[test]
fn empty_title_or_description_is_rejected() {
    let (engine, _) = engine();
    assert!(engine.create_complaint(request("   ", "something")).is_err());
    assert!(engine.create_complaint(request("something", "")).is_err());
}
