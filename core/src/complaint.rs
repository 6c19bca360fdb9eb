//! Complaint domain model, staff model, and the status state machine.
//!
//! RULE: direct status changes requested by staff/admin flow through
//! `Status::can_transition`. Assignment, resolution, re-triage and
//! escalation are dedicated operations with their own guards and never
//! consult this table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{ComplaintId, StaffId};

// ── Enumerations ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Department {
    Roads,
    Water,
    Sanitation,
    Electricity,
    Municipal,
    Others,
}

impl Department {
    pub fn as_str(self) -> &'static str {
        match self {
            Department::Roads => "roads",
            Department::Water => "water",
            Department::Sanitation => "sanitation",
            Department::Electricity => "electricity",
            Department::Municipal => "municipal",
            Department::Others => "others",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "roads" => Some(Department::Roads),
            "water" => Some(Department::Water),
            "sanitation" => Some(Department::Sanitation),
            "electricity" => Some(Department::Electricity),
            "municipal" => Some(Department::Municipal),
            "others" => Some(Department::Others),
            _ => None,
        }
    }
}

/// Whether the department was chosen by the citizen or by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepartmentSource {
    Manual,
    Auto,
}

impl DepartmentSource {
    pub fn as_str(self) -> &'static str {
        match self {
            DepartmentSource::Manual => "manual",
            DepartmentSource::Auto => "auto",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(DepartmentSource::Manual),
            "auto" => Some(DepartmentSource::Auto),
            _ => None,
        }
    }
}

/// Priority tiers, ordered so that `High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "submitted")]
    Submitted,
    #[serde(rename = "triaged")]
    Triaged,
    #[serde(rename = "assigned")]
    Assigned,
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "resolved")]
    Resolved,
    #[serde(rename = "closed")]
    Closed,
    #[serde(rename = "escalated")]
    Escalated,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Submitted => "submitted",
            Status::Triaged => "triaged",
            Status::Assigned => "assigned",
            Status::InProgress => "in-progress",
            Status::Resolved => "resolved",
            Status::Closed => "closed",
            Status::Escalated => "escalated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "submitted" => Some(Status::Submitted),
            "triaged" => Some(Status::Triaged),
            "assigned" => Some(Status::Assigned),
            "in-progress" => Some(Status::InProgress),
            "resolved" => Some(Status::Resolved),
            "closed" => Some(Status::Closed),
            "escalated" => Some(Status::Escalated),
            _ => None,
        }
    }

    /// Resolved and closed complaints accept no further mutation
    /// (closing a resolved complaint being the one exception).
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Resolved | Status::Closed)
    }

    pub fn is_open(self) -> bool {
        !self.is_terminal()
    }

    /// Transitions staff/admin may request directly via `update_status`.
    ///
    /// Forward moves only. Assignment (`assign`/`unassign`), resolution
    /// (`resolve`), department-change re-triage and scheduler escalation
    /// all go through their dedicated operations instead.
    pub fn can_transition(self, to: Status) -> bool {
        use Status::*;
        matches!(
            (self, to),
            (Submitted, Triaged)
                | (Assigned, InProgress)
                | (Escalated, InProgress)
                // Repeated in-progress updates are idempotent.
                | (InProgress, InProgress)
                | (Resolved, Closed)
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed service regions. Complaints inherit the submitting citizen's
/// locality and never move; staff serve exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locality {
    Jangaon,
    Warangal,
    Narapally,
    Pocharam,
    Karimnagar,
}

impl Locality {
    pub fn as_str(self) -> &'static str {
        match self {
            Locality::Jangaon => "jangaon",
            Locality::Warangal => "warangal",
            Locality::Narapally => "narapally",
            Locality::Pocharam => "pocharam",
            Locality::Karimnagar => "karimnagar",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "jangaon" => Some(Locality::Jangaon),
            "warangal" => Some(Locality::Warangal),
            "narapally" => Some(Locality::Narapally),
            "pocharam" => Some(Locality::Pocharam),
            "karimnagar" => Some(Locality::Karimnagar),
            _ => None,
        }
    }
}

/// Staff seniority, ordered so that `Senior > Mid > Junior`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaffTier {
    Junior,
    Mid,
    Senior,
}

impl StaffTier {
    pub fn as_str(self) -> &'static str {
        match self {
            StaffTier::Junior => "junior",
            StaffTier::Mid => "mid",
            StaffTier::Senior => "senior",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "junior" => Some(StaffTier::Junior),
            "mid" => Some(StaffTier::Mid),
            "senior" => Some(StaffTier::Senior),
            _ => None,
        }
    }

    /// The tier a breached complaint escalates to. Senior is the ceiling.
    pub fn next(self) -> Option<StaffTier> {
        match self {
            StaffTier::Junior => Some(StaffTier::Mid),
            StaffTier::Mid => Some(StaffTier::Senior),
            StaffTier::Senior => None,
        }
    }
}

impl fmt::Display for StaffTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Records ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// One escalation audit entry. The history is append-only and ordered;
/// consumers rely on entries carrying exactly {level, escalated_at, reason}.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationEntry {
    pub level: u8,
    pub escalated_at: DateTime<Utc>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Complaint {
    pub complaint_id: ComplaintId,
    pub title: String,
    pub description: String,
    pub department: Department,
    pub department_source: DepartmentSource,
    pub priority: Priority,
    pub status: Status,
    pub locality: Locality,
    pub location: Option<GeoPoint>,
    pub assigned_to: Option<StaffId>,
    pub duplicate_of: Option<ComplaintId>,
    pub is_hotspot: bool,
    pub hotspot_count: u32,
    pub escalation_level: u8,
    /// Predicted SLA-breach likelihood, 0–100. Set to 100 on escalation.
    pub escalation_risk: u8,
    pub escalation_history: Vec<EscalationEntry>,
    pub citizen_rating: Option<u8>,
    pub citizen_feedback: Option<String>,
    pub rated_at: Option<DateTime<Utc>>,
    pub staff_remark: Option<String>,
    /// URLs of media attached by the resolving staff member.
    pub resolution_media: Vec<String>,
    pub sla_deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub in_progress_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    /// Optimistic-concurrency counter; bumped by every versioned write.
    pub version: i64,
}

impl Complaint {
    pub fn is_rated(&self) -> bool {
        self.citizen_rating.is_some()
    }
}

/// A departmental staff member. Staff are long-lived and externally
/// managed; the engine only reads them (and the runner seeds them).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffUser {
    pub staff_id: StaffId,
    pub name: String,
    pub email: String,
    pub department: Department,
    pub locality: Locality,
    pub tier: StaffTier,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses_are_resolved_and_closed() {
        assert!(Status::Resolved.is_terminal());
        assert!(Status::Closed.is_terminal());
        for s in [
            Status::Submitted,
            Status::Triaged,
            Status::Assigned,
            Status::InProgress,
            Status::Escalated,
        ] {
            assert!(s.is_open(), "{s} should be open");
        }
    }

    #[test]
    fn no_backward_transitions() {
        assert!(!Status::InProgress.can_transition(Status::Assigned));
        assert!(!Status::Resolved.can_transition(Status::InProgress));
        assert!(!Status::Closed.can_transition(Status::Resolved));
        assert!(!Status::Triaged.can_transition(Status::Submitted));
    }

    #[test]
    fn tier_ladder_tops_out_at_senior() {
        assert_eq!(StaffTier::Junior.next(), Some(StaffTier::Mid));
        assert_eq!(StaffTier::Mid.next(), Some(StaffTier::Senior));
        assert_eq!(StaffTier::Senior.next(), None);
    }

    #[test]
    fn tier_order_is_monotone_with_seniority() {
        assert!(StaffTier::Junior < StaffTier::Mid);
        assert!(StaffTier::Mid < StaffTier::Senior);
    }

    #[test]
    fn enum_round_trips() {
        for d in [
            Department::Roads,
            Department::Water,
            Department::Sanitation,
            Department::Electricity,
            Department::Municipal,
            Department::Others,
        ] {
            assert_eq!(Department::parse(d.as_str()), Some(d));
        }
        for s in [
            Status::Submitted,
            Status::Triaged,
            Status::Assigned,
            Status::InProgress,
            Status::Resolved,
            Status::Closed,
            Status::Escalated,
        ] {
            assert_eq!(Status::parse(s.as_str()), Some(s));
        }
    }
}
