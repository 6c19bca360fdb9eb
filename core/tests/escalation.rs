//! Escalation sweep: tier ladder, cool-down, starvation, the senior
//! ceiling, and SLA backfill.

use chrono::{Duration, TimeZone, Utc};
use grievance_core::clock::{Clock, ManualClock};
use grievance_core::complaint::{Department, Locality, StaffTier, StaffUser, Status};
use grievance_core::config::EngineConfig;
use grievance_core::engine::{GrievanceEngine, NewComplaint};
use grievance_core::sla::sla_deadline;
use grievance_core::store::GrievanceStore;
use std::sync::Arc;

fn engine_with_config(config: EngineConfig) -> (GrievanceEngine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
    ));
    let store = GrievanceStore::in_memory().unwrap();
    store.migrate().unwrap();
    (
        GrievanceEngine::with_clock(store, config, clock.clone()),
        clock,
    )
}

fn engine() -> (GrievanceEngine, Arc<ManualClock>) {
    engine_with_config(EngineConfig::default())
}

fn staff(id: &str, locality: Locality, tier: StaffTier) -> StaffUser {
    StaffUser {
        staff_id: id.into(),
        name: format!("Officer {id}"),
        email: format!("{id}@city.gov"),
        department: Department::Water,
        locality,
        tier,
    }
}

fn high_priority_request() -> NewComplaint {
    NewComplaint {
        title: "Urgent: burst water main".into(),
        description: "Severe flooding on the street".into(),
        department: Some(Department::Water),
        locality: Locality::Warangal,
        location: None,
    }
}

/// Seed only a junior so intake assigns the bottom of the ladder, then
/// add the higher tiers for the sweep to climb.
fn seeded_breach(engine: &GrievanceEngine) -> String {
    engine
        .store
        .insert_staff(&staff("w-jr", Locality::Warangal, StaffTier::Junior))
        .unwrap();
    let c = engine.create_complaint(high_priority_request()).unwrap();
    assert_eq!(c.assigned_to.as_deref(), Some("w-jr"));
    engine
        .store
        .insert_staff(&staff("w-mid", Locality::Warangal, StaffTier::Mid))
        .unwrap();
    engine
        .store
        .insert_staff(&staff("w-sr", Locality::Warangal, StaffTier::Senior))
        .unwrap();
    c.complaint_id
}

/// One breach, one sweep: the complaint climbs junior → mid with the
/// full audit trail.
#[test]
fn breach_escalates_one_tier_with_audit_entry() {
    let (engine, clock) = engine();
    let id = seeded_breach(&engine);

    // High priority: 24h window. 25h later the deadline has passed.
    clock.advance(Duration::hours(25));
    let report = engine.run_sweep_once().unwrap();
    assert_eq!(report.scanned, 1);
    assert_eq!(report.escalated, 1);
    assert!(!report.skipped_overlapping);

    let c = engine.get(&id).unwrap();
    assert_eq!(c.assigned_to.as_deref(), Some("w-mid"));
    assert_eq!(c.status, Status::Escalated);
    assert_eq!(c.escalation_level, 1);
    assert_eq!(c.escalation_risk, 100);
    assert_eq!(c.escalation_history.len(), 1);
    let entry = &c.escalation_history[0];
    assert_eq!(entry.level, 1);
    assert_eq!(entry.escalated_at, clock.now());
    assert_eq!(
        entry.reason,
        "SLA breach - escalated from junior to mid staff (Officer w-mid)"
    );
}

/// A second sweep inside the cool-down window changes nothing.
#[test]
fn cooldown_blocks_back_to_back_escalation() {
    let (engine, clock) = engine();
    let id = seeded_breach(&engine);

    clock.advance(Duration::hours(25));
    engine.run_sweep_once().unwrap();

    clock.advance(Duration::minutes(10));
    let report = engine.run_sweep_once().unwrap();
    assert_eq!(report.escalated, 0);
    assert_eq!(report.cooldown_skipped, 1);

    let c = engine.get(&id).unwrap();
    assert_eq!(c.escalation_level, 1);
    assert_eq!(c.escalation_history.len(), 1);
}

/// Once the cool-down lapses the ladder continues: mid → senior, and
/// a senior holder caps out instead of escalating again.
#[test]
fn ladder_climbs_to_senior_then_caps() {
    let (engine, clock) = engine();
    let id = seeded_breach(&engine);

    clock.advance(Duration::hours(25));
    engine.run_sweep_once().unwrap();

    clock.advance(Duration::hours(2));
    let report = engine.run_sweep_once().unwrap();
    assert_eq!(report.escalated, 1);
    let c = engine.get(&id).unwrap();
    assert_eq!(c.assigned_to.as_deref(), Some("w-sr"));
    assert_eq!(c.escalation_level, 2);
    assert_eq!(c.escalation_history.len(), 2);

    clock.advance(Duration::hours(2));
    let report = engine.run_sweep_once().unwrap();
    assert_eq!(report.escalated, 0);
    assert_eq!(report.at_ceiling, 1);
    let c = engine.get(&id).unwrap();
    assert_eq!(c.escalation_level, 2);
    assert_eq!(c.assigned_to.as_deref(), Some("w-sr"));
}

/// The configured level ceiling stops the ladder even when higher
/// tiers have staff available.
#[test]
fn level_ceiling_is_enforced() {
    let config = EngineConfig {
        max_escalation_level: 1,
        ..EngineConfig::default()
    };
    let (engine, clock) = engine_with_config(config);
    let id = seeded_breach(&engine);

    clock.advance(Duration::hours(25));
    engine.run_sweep_once().unwrap();

    clock.advance(Duration::hours(2));
    let report = engine.run_sweep_once().unwrap();
    assert_eq!(report.escalated, 0);
    assert_eq!(report.at_ceiling, 1);
    assert_eq!(engine.get(&id).unwrap().escalation_level, 1);
}

/// No staff at the next tier in this department and locality: the
/// breach is reported as starved and nothing changes. A mid in another
/// locality does not count.
#[test]
fn missing_next_tier_starves_the_escalation() {
    let (engine, clock) = engine();
    engine
        .store
        .insert_staff(&staff("w-jr", Locality::Warangal, StaffTier::Junior))
        .unwrap();
    let c = engine.create_complaint(high_priority_request()).unwrap();
    engine
        .store
        .insert_staff(&staff("j-mid", Locality::Jangaon, StaffTier::Mid))
        .unwrap();

    clock.advance(Duration::hours(25));
    let report = engine.run_sweep_once().unwrap();
    assert_eq!(report.escalated, 0);
    assert_eq!(report.starved, 1);

    let c = engine.get(&c.complaint_id).unwrap();
    assert_eq!(c.assigned_to.as_deref(), Some("w-jr"));
    assert_eq!(c.escalation_level, 0);
    assert_eq!(c.escalation_history.len(), 0);
}

/// Resolved complaints never appear in the sweep, no matter how old.
#[test]
fn resolved_complaints_are_never_escalated() {
    let (engine, clock) = engine();
    let id = seeded_breach(&engine);
    engine.resolve(&id, "w-jr", "Valve replaced", vec![]).unwrap();

    clock.advance(Duration::days(10));
    let report = engine.run_sweep_once().unwrap();
    assert_eq!(report.scanned, 0);
    assert_eq!(report.escalated, 0);
    assert_eq!(engine.get(&id).unwrap().escalation_level, 0);
}

/// Unassigned breaches are not on the ladder and are left alone.
#[test]
fn unassigned_breaches_are_skipped() {
    let (engine, clock) = engine();
    let c = engine.create_complaint(high_priority_request()).unwrap();
    assert_eq!(c.assigned_to, None);

    clock.advance(Duration::hours(25));
    let report = engine.run_sweep_once().unwrap();
    assert_eq!(report.scanned, 0);
    assert_eq!(report.escalated, 0);
}

/// The stored breach-risk score grows with age on refresh, and an
/// escalated complaint stays pinned at 100.
#[test]
fn risk_refresh_tracks_complaint_age() {
    let (engine, clock) = engine();
    let c = engine.create_complaint(high_priority_request()).unwrap();
    // High priority (40) + workload (20) + still submitted (10).
    assert_eq!(c.escalation_risk, 70);

    clock.advance(Duration::hours(25));
    let c = engine.refresh_escalation_risk(&c.complaint_id).unwrap();
    assert_eq!(c.escalation_risk, 85);

    clock.advance(Duration::hours(25));
    let c = engine.refresh_escalation_risk(&c.complaint_id).unwrap();
    assert_eq!(c.escalation_risk, 100);
}

/// Backfill anchors the deadline at the original submission time, so a
/// long-overdue legacy complaint becomes sweep-eligible immediately.
#[test]
fn backfill_assigns_missing_deadlines() {
    let (engine, clock) = engine();
    let id = seeded_breach(&engine);

    // Simulate a legacy row from before the SLA policy.
    let mut legacy = engine.get(&id).unwrap();
    legacy.sla_deadline = None;
    engine.store.update_complaint(&legacy).unwrap();

    let updated = engine.backfill_sla_deadlines().unwrap();
    assert_eq!(updated, 1);

    let c = engine.get(&id).unwrap();
    assert_eq!(c.sla_deadline, Some(sla_deadline(c.priority, c.created_at)));

    clock.advance(Duration::hours(25));
    let report = engine.run_sweep_once().unwrap();
    assert_eq!(report.escalated, 1);
}
