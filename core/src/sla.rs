//! Priority → SLA deadline policy.
//!
//! A static table: high resolves in 24h, medium in 72h, low in a week.
//! Invoked at creation and on every priority change — the new deadline
//! replaces (never stacks on) the previous one.

use chrono::{DateTime, Duration, Utc};

use crate::complaint::Priority;

/// Fixed resolution window per priority tier.
pub fn sla_offset(priority: Priority) -> Duration {
    match priority {
        Priority::High => Duration::hours(24),
        Priority::Medium => Duration::hours(72),
        Priority::Low => Duration::hours(168),
    }
}

/// Deadline for a complaint of `priority` anchored at `reference`.
/// Pure and total; no failure modes.
pub fn sla_deadline(priority: Priority, reference: DateTime<Utc>) -> DateTime<Utc> {
    reference + sla_offset(priority)
}

/// Like [`sla_deadline`], for callers that may not have settled on a
/// priority yet: a missing one gets the medium window.
pub fn sla_deadline_or_default(
    priority: Option<Priority>,
    reference: DateTime<Utc>,
) -> DateTime<Utc> {
    sla_deadline(priority.unwrap_or(Priority::Medium), reference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn offsets_match_policy_table() {
        assert_eq!(sla_offset(Priority::High), Duration::hours(24));
        assert_eq!(sla_offset(Priority::Medium), Duration::hours(72));
        assert_eq!(sla_offset(Priority::Low), Duration::hours(168));
    }

    #[test]
    fn deadline_is_reference_plus_offset() {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        for p in [Priority::Low, Priority::Medium, Priority::High] {
            assert_eq!(sla_deadline(p, t0) - t0, sla_offset(p));
        }
    }

    #[test]
    fn missing_priority_defaults_to_medium_window() {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        assert_eq!(
            sla_deadline_or_default(None, t0),
            sla_deadline(Priority::Medium, t0)
        );
        assert_eq!(
            sla_deadline_or_default(Some(Priority::High), t0),
            sla_deadline(Priority::High, t0)
        );
    }
}
