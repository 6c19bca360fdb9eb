//! grievance-runner: headless escalation scheduler for the civic
//! grievance platform.
//!
//! Usage:
//!   grievance-runner --db grievance.db --seed-staff
//!   grievance-runner --db grievance.db --config engine.json --once

use anyhow::Result;
use grievance_core::{
    complaint::{Department, Locality, StaffTier, StaffUser},
    config::EngineConfig,
    engine::GrievanceEngine,
    store::GrievanceStore,
};
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db = args
        .windows(2)
        .find(|w| w[0] == "--db")
        .map(|w| w[1].as_str())
        .unwrap_or("grievance.db");
    let config_path = args
        .windows(2)
        .find(|w| w[0] == "--config")
        .map(|w| w[1].as_str());
    let seed_staff = args.iter().any(|a| a == "--seed-staff");
    let once = args.iter().any(|a| a == "--once");

    let config = match config_path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    println!("grievance-runner");
    println!("  db:       {db}");
    println!("  config:   {}", config_path.unwrap_or("(defaults)"));
    println!("  interval: {}m", config.sweep_interval_minutes);
    println!();

    let store = GrievanceStore::open(db)?;
    store.migrate()?;

    let engine = GrievanceEngine::new(store, config);

    if seed_staff {
        seed_staff_roster(&engine)?;
    }

    let backfilled = engine.backfill_sla_deadlines()?;
    if backfilled > 0 {
        println!("backfilled SLA deadlines for {backfilled} complaints");
    }

    // Immediate sweep shortly after startup, so a restart never leaves
    // breached complaints waiting a full interval.
    std::thread::sleep(engine.config().startup_sweep_delay());
    run_and_report(&engine)?;

    if once {
        print_summary(&engine)?;
        return Ok(());
    }

    loop {
        std::thread::sleep(engine.config().sweep_interval());
        // A failed sweep must not kill the daemon; the next interval
        // retries from scratch.
        if let Err(e) = run_and_report(&engine) {
            log::error!("escalation sweep failed: {e}");
        }
    }
}

fn run_and_report(engine: &GrievanceEngine) -> Result<()> {
    let report = engine.run_sweep_once()?;
    println!("sweep: {}", serde_json::to_string(&report)?);
    Ok(())
}

fn print_summary(engine: &GrievanceEngine) -> Result<()> {
    let total = engine.store.complaint_count()?;
    let escalated = engine.store.escalated_count()?;
    let open = engine.store.open_complaints()?;

    println!();
    println!("=== GRIEVANCE SUMMARY ===");
    println!("  staff:      {}", engine.store.staff_count()?);
    println!("  complaints: {total}");
    println!("  escalated:  {escalated}");
    println!("  open:       {}", open.len());
    for c in open.iter().take(20) {
        println!(
            "  {} | {} | {} | {} | assignee: {}",
            c.complaint_id,
            c.department.as_str(),
            c.priority.as_str(),
            c.status,
            c.assigned_to.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

/// Seed a demo staff roster: one member per tier for every department
/// in every locality. Idempotent: members already present are left
/// untouched, so re-running with --seed-staff is safe.
fn seed_staff_roster(engine: &GrievanceEngine) -> Result<()> {
    let departments = [
        Department::Roads,
        Department::Water,
        Department::Sanitation,
        Department::Electricity,
        Department::Municipal,
    ];
    let localities = [
        Locality::Jangaon,
        Locality::Warangal,
        Locality::Narapally,
        Locality::Pocharam,
        Locality::Karimnagar,
    ];
    let tiers = [StaffTier::Junior, StaffTier::Mid, StaffTier::Senior];

    let mut seeded = 0;
    for locality in localities {
        for department in departments {
            for tier in tiers {
                let staff_id = format!(
                    "{}-{}-{}",
                    locality.as_str(),
                    department.as_str(),
                    tier.as_str()
                );
                let inserted = engine.store.insert_staff_if_absent(&StaffUser {
                    staff_id: staff_id.clone(),
                    name: format!(
                        "{} {} ({})",
                        capitalize(department.as_str()),
                        capitalize(tier.as_str()),
                        capitalize(locality.as_str())
                    ),
                    email: format!("{staff_id}@city.gov"),
                    department,
                    locality,
                    tier,
                })?;
                if inserted {
                    seeded += 1;
                }
            }
        }
    }
    println!("seeded {seeded} staff members");
    Ok(())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
