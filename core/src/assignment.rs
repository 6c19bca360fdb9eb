//! Locality/department-aware auto-assignment.
//!
//! Pure selection over a snapshot of the staff pool; the caller applies
//! the result through the complaint state machine.

use crate::complaint::{Priority, StaffTier, StaffUser};

/// Minimum tier allowed to handle a complaint of `priority`.
pub fn required_tier(priority: Priority) -> StaffTier {
    match priority {
        Priority::High => StaffTier::Senior,
        Priority::Medium => StaffTier::Mid,
        Priority::Low => StaffTier::Junior,
    }
}

/// Pick an assignee from `pool` (already filtered to the complaint's
/// department and locality).
///
/// Prefers the most senior tier-eligible member; falls back to any
/// available staff when nobody meets the tier; returns `None` on an
/// empty pool, leaving the complaint unassigned.
pub fn select_assignee(pool: &[StaffUser], priority: Priority) -> Option<&StaffUser> {
    let mut ranked: Vec<&StaffUser> = pool.iter().collect();
    // Senior first; ties broken by pool order (first found).
    ranked.sort_by(|a, b| b.tier.cmp(&a.tier));

    let needed = required_tier(priority);
    ranked
        .iter()
        .find(|s| s.tier >= needed)
        .copied()
        .or_else(|| ranked.first().copied())
}
