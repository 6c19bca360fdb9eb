//! SLA-breach escalation sweep.
//!
//! The sweep scans open, assigned complaints whose deadline has passed
//! and moves each one tier up the staffing ladder, same department and
//! locality. RULE: one level per sweep, with a cool-down between
//! consecutive escalations of the same complaint, and senior staff are
//! the ceiling — a breach already held by a senior is reported, never
//! reassigned.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::complaint::{Complaint, EscalationEntry, Status};
use crate::config::EngineConfig;
use crate::error::{GrievanceError, GrievanceResult};
use crate::sla::sla_deadline;
use crate::store::GrievanceStore;

/// What one sweep did, for logging and operator visibility.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    /// Overdue complaints examined.
    pub scanned: usize,
    /// Complaints moved up a tier.
    pub escalated: usize,
    /// Skipped: escalated too recently.
    pub cooldown_skipped: usize,
    /// Skipped: no staff at the next tier in this department/locality.
    pub starved: usize,
    /// Skipped: already held by senior staff or at the level ceiling.
    pub at_ceiling: usize,
    /// Per-complaint failures (logged and skipped, sweep continues).
    pub failed: usize,
    /// The whole run was skipped because another sweep was in flight.
    pub skipped_overlapping: bool,
}

enum Outcome {
    Escalated,
    Cooldown,
    Starved,
    AtCeiling,
    Skipped,
}

/// Sweep every overdue complaint once. Per-complaint failures are
/// logged and counted; they never abort the rest of the run.
pub fn sweep(
    store: &GrievanceStore,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> GrievanceResult<SweepReport> {
    let overdue = store.overdue_unresolved(now)?;
    let mut report = SweepReport {
        scanned: overdue.len(),
        ..SweepReport::default()
    };

    for complaint in overdue {
        let id = complaint.complaint_id.clone();
        match escalate_one(store, complaint, now, config) {
            Ok(Outcome::Escalated) => report.escalated += 1,
            Ok(Outcome::Cooldown) => report.cooldown_skipped += 1,
            Ok(Outcome::Starved) => report.starved += 1,
            Ok(Outcome::AtCeiling) => report.at_ceiling += 1,
            Ok(Outcome::Skipped) => {}
            // A racing writer got there first; the next sweep re-reads.
            Err(GrievanceError::VersionConflict { .. }) => {
                log::debug!("complaint {id} changed mid-sweep; skipping");
            }
            Err(e) => {
                log::error!("escalation of complaint {id} failed: {e}");
                report.failed += 1;
            }
        }
    }

    log::info!(
        "escalation sweep: {} scanned, {} escalated, {} cooling down, {} starved, {} at ceiling, {} failed",
        report.scanned,
        report.escalated,
        report.cooldown_skipped,
        report.starved,
        report.at_ceiling,
        report.failed
    );
    Ok(report)
}

fn escalate_one(
    store: &GrievanceStore,
    mut complaint: Complaint,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> GrievanceResult<Outcome> {
    // The overdue query filters terminal statuses, but a resolve may
    // have landed between query and processing.
    if complaint.status.is_terminal() {
        return Ok(Outcome::Skipped);
    }

    if let Some(last) = complaint.escalation_history.last() {
        if now - last.escalated_at < config.escalation_cooldown() {
            log::debug!(
                "complaint {} escalated at {}; still cooling down",
                complaint.complaint_id,
                last.escalated_at
            );
            return Ok(Outcome::Cooldown);
        }
    }

    if complaint.escalation_level >= config.max_escalation_level {
        log::warn!(
            "complaint {} is at the escalation ceiling (level {})",
            complaint.complaint_id,
            complaint.escalation_level
        );
        return Ok(Outcome::AtCeiling);
    }

    let current_id = match &complaint.assigned_to {
        Some(id) => id.clone(),
        // Unassigned breaches cannot climb a ladder they are not on.
        None => return Ok(Outcome::Skipped),
    };
    let current = store.get_staff(&current_id)?;

    let next_tier = match current.tier.next() {
        Some(t) => t,
        None => {
            log::warn!(
                "complaint {} breached SLA but is already held by senior staff {}",
                complaint.complaint_id,
                current.staff_id
            );
            return Ok(Outcome::AtCeiling);
        }
    };

    let target = match store.find_staff_at_tier(complaint.department, complaint.locality, next_tier)?
    {
        Some(s) => s,
        None => {
            log::info!(
                "no {} {} staff in {} to escalate complaint {} to",
                next_tier,
                complaint.department.as_str(),
                complaint.locality.as_str(),
                complaint.complaint_id
            );
            return Ok(Outcome::Starved);
        }
    };

    let entry = EscalationEntry {
        level: complaint.escalation_level + 1,
        escalated_at: now,
        reason: format!(
            "SLA breach - escalated from {} to {} staff ({})",
            current.tier, next_tier, target.name
        ),
    };

    complaint.assigned_to = Some(target.staff_id.clone());
    complaint.escalation_level += 1;
    complaint.status = Status::Escalated;
    complaint.escalation_risk = 100;
    store.escalate_complaint(&complaint, &entry)?;

    log::info!(
        "complaint {} escalated to level {}: {} -> {} ({})",
        complaint.complaint_id,
        complaint.escalation_level,
        current.staff_id,
        target.staff_id,
        next_tier
    );
    Ok(Outcome::Escalated)
}

/// Assign deadlines to complaints created before the SLA policy,
/// anchored at their original submission time so long-overdue ones
/// become sweep-eligible immediately.
pub fn backfill_sla_deadlines(store: &GrievanceStore) -> GrievanceResult<usize> {
    let missing = store.missing_sla_deadline()?;
    let mut updated = 0;
    for mut complaint in missing {
        complaint.sla_deadline = Some(sla_deadline(complaint.priority, complaint.created_at));
        store.update_complaint(&complaint)?;
        updated += 1;
    }
    if updated > 0 {
        log::info!("backfilled SLA deadlines for {updated} complaints");
    }
    Ok(updated)
}
