//! The grievance engine: complaint intake and every lifecycle
//! operation staff, admins and citizens can perform.
//!
//! RULE: every mutation loads the complaint, applies its guard, and
//! writes back through the store's versioned update. A concurrent
//! writer surfaces as `VersionConflict`; callers retry by re-reading.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use uuid::Uuid;

use crate::assignment::select_assignee;
use crate::classifier::{estimate_escalation_risk, estimate_priority, ClassifierStack};
use crate::clock::{Clock, SystemClock};
use crate::complaint::{
    Complaint, Department, DepartmentSource, GeoPoint, Locality, Priority, Status,
};
use crate::config::EngineConfig;
use crate::duplicate::DuplicateDetector;
use crate::error::{GrievanceError, GrievanceResult};
use crate::escalation::{self, SweepReport};
use crate::sla::sla_deadline;
use crate::store::GrievanceStore;
use crate::types::ComplaintId;

/// Intake request for a new complaint. `department` is the citizen's
/// manual choice; `None` (or `others`) hands the decision to the
/// classifier stack.
#[derive(Debug, Clone)]
pub struct NewComplaint {
    pub title: String,
    pub description: String,
    pub department: Option<Department>,
    pub locality: Locality,
    pub location: Option<GeoPoint>,
}

pub struct GrievanceEngine {
    pub store: GrievanceStore,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    classifiers: ClassifierStack,
    detector: DuplicateDetector,
    sweep_active: AtomicBool,
}

impl GrievanceEngine {
    /// Production engine: system clock, local classifier and embedder.
    pub fn new(store: GrievanceStore, config: EngineConfig) -> Self {
        Self::with_components(
            store,
            config,
            Arc::new(SystemClock),
            ClassifierStack::local(),
            DuplicateDetector::local(),
        )
    }

    /// Engine with an injected clock (tests drive time manually).
    pub fn with_clock(store: GrievanceStore, config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_components(
            store,
            config,
            clock,
            ClassifierStack::local(),
            DuplicateDetector::local(),
        )
    }

    pub fn with_components(
        store: GrievanceStore,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
        classifiers: ClassifierStack,
        detector: DuplicateDetector,
    ) -> Self {
        Self {
            store,
            clock,
            config,
            classifiers,
            detector,
            sweep_active: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ── Intake ─────────────────────────────────────────────────────

    /// Create a complaint. Intake order is fixed: validate, classify,
    /// estimate priority, duplicate/hotspot scan, SLA deadline,
    /// auto-assign, persist.
    pub fn create_complaint(&self, request: NewComplaint) -> GrievanceResult<Complaint> {
        let title = request.title.trim();
        let description = request.description.trim();
        if title.is_empty() {
            return Err(GrievanceError::Validation("title must not be empty".into()));
        }
        if description.is_empty() {
            return Err(GrievanceError::Validation(
                "description must not be empty".into(),
            ));
        }
        let now = self.clock.now();

        // A concrete manual choice wins; "others" and None defer to the
        // classifier stack.
        let (department, department_source) = match request.department {
            Some(d) if d != Department::Others => (d, DepartmentSource::Manual),
            _ => (
                self.classifiers.classify(title, description),
                DepartmentSource::Auto,
            ),
        };

        let priority = estimate_priority(title, description);

        let scan = self.detector.scan(
            &self.store,
            title,
            description,
            request.location,
            now,
            &self.config,
        );

        let mut complaint = Complaint {
            complaint_id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            description: description.to_string(),
            department,
            department_source,
            priority,
            status: Status::Submitted,
            locality: request.locality,
            location: request.location,
            assigned_to: None,
            duplicate_of: scan.duplicate.as_ref().map(|m| m.complaint_id.clone()),
            is_hotspot: scan.hotspot_count.is_some(),
            hotspot_count: scan.hotspot_count.unwrap_or(0),
            escalation_level: 0,
            escalation_risk: 0,
            escalation_history: Vec::new(),
            citizen_rating: None,
            citizen_feedback: None,
            rated_at: None,
            staff_remark: None,
            resolution_media: Vec::new(),
            sla_deadline: Some(sla_deadline(priority, now)),
            created_at: now,
            assigned_at: None,
            in_progress_at: None,
            resolved_at: None,
            closed_at: None,
            version: 0,
        };

        let pool = self.store.staff_pool(department, request.locality)?;
        match select_assignee(&pool, priority) {
            Some(staff) => {
                complaint.assigned_to = Some(staff.staff_id.clone());
                complaint.status = Status::Assigned;
                complaint.assigned_at = Some(now);
                log::info!(
                    "complaint {} auto-assigned to {} ({} {})",
                    complaint.complaint_id,
                    staff.staff_id,
                    staff.tier,
                    department.as_str()
                );
            }
            None => {
                log::info!(
                    "no {} staff in {}; complaint {} left unassigned",
                    department.as_str(),
                    request.locality.as_str(),
                    complaint.complaint_id
                );
            }
        }

        complaint.escalation_risk = estimate_escalation_risk(&complaint, now);

        self.store.insert_complaint(&complaint)?;
        Ok(complaint)
    }

    // ── Lifecycle operations ───────────────────────────────────────

    pub fn get(&self, complaint_id: &str) -> GrievanceResult<Complaint> {
        self.store.get_complaint(complaint_id)
    }

    /// Direct status change requested by staff/admin. Gated by the
    /// state machine's transition table.
    pub fn update_status(&self, complaint_id: &str, to: Status) -> GrievanceResult<Complaint> {
        let mut complaint = self.store.get_complaint(complaint_id)?;
        if !complaint.status.can_transition(to) {
            return Err(GrievanceError::InvalidTransition {
                from: complaint.status,
                to,
            });
        }
        let now = self.clock.now();
        complaint.status = to;
        if to == Status::InProgress && complaint.in_progress_at.is_none() {
            complaint.in_progress_at = Some(now);
        }
        if to == Status::Closed && complaint.closed_at.is_none() {
            complaint.closed_at = Some(now);
        }
        self.store.update_complaint(&complaint)?;
        self.store.get_complaint(complaint_id)
    }

    /// Re-prioritize an open complaint. The SLA deadline is recomputed
    /// from "now" with the new tier's window, replacing the old one.
    pub fn update_priority(
        &self,
        complaint_id: &str,
        priority: Priority,
    ) -> GrievanceResult<Complaint> {
        let mut complaint = self.store.get_complaint(complaint_id)?;
        if complaint.status.is_terminal() {
            return Err(GrievanceError::TerminalState(complaint_id.to_string()));
        }
        let now = self.clock.now();
        complaint.priority = priority;
        complaint.sla_deadline = Some(sla_deadline(priority, now));
        self.store.update_complaint(&complaint)?;
        self.store.get_complaint(complaint_id)
    }

    /// Manually assign a staff member. Only unclaimed complaints
    /// (submitted or triaged) can be assigned, and the staff member
    /// must belong to the complaint's department.
    pub fn assign(&self, complaint_id: &str, staff_id: &str) -> GrievanceResult<Complaint> {
        let mut complaint = self.store.get_complaint(complaint_id)?;
        let staff = self.store.get_staff(staff_id)?;
        if staff.department != complaint.department {
            return Err(GrievanceError::Validation(format!(
                "staff '{}' belongs to {}, complaint is {}",
                staff_id,
                staff.department.as_str(),
                complaint.department.as_str()
            )));
        }
        if !matches!(complaint.status, Status::Submitted | Status::Triaged) {
            return Err(GrievanceError::InvalidTransition {
                from: complaint.status,
                to: Status::Assigned,
            });
        }
        complaint.assigned_to = Some(staff.staff_id.clone());
        complaint.status = Status::Assigned;
        if complaint.assigned_at.is_none() {
            complaint.assigned_at = Some(self.clock.now());
        }
        self.store.update_complaint(&complaint)?;
        self.store.get_complaint(complaint_id)
    }

    /// Release the current assignee and return the complaint to the
    /// triage queue.
    pub fn unassign(&self, complaint_id: &str) -> GrievanceResult<Complaint> {
        let mut complaint = self.store.get_complaint(complaint_id)?;
        if complaint.status.is_terminal() {
            return Err(GrievanceError::TerminalState(complaint_id.to_string()));
        }
        if complaint.assigned_to.is_none() {
            return Err(GrievanceError::NotAssigned(complaint_id.to_string()));
        }
        complaint.assigned_to = None;
        complaint.status = Status::Triaged;
        self.store.update_complaint(&complaint)?;
        self.store.get_complaint(complaint_id)
    }

    /// Mark a complaint resolved. Only the current assignee may
    /// resolve, and a non-empty remark is mandatory.
    pub fn resolve(
        &self,
        complaint_id: &str,
        acting_staff: &str,
        remark: &str,
        media: Vec<String>,
    ) -> GrievanceResult<Complaint> {
        let mut complaint = self.store.get_complaint(complaint_id)?;
        let assignee = complaint
            .assigned_to
            .clone()
            .ok_or_else(|| GrievanceError::NotAssigned(complaint_id.to_string()))?;
        if assignee != acting_staff {
            return Err(GrievanceError::Unauthorized(complaint_id.to_string()));
        }
        if !matches!(
            complaint.status,
            Status::Assigned | Status::InProgress | Status::Escalated
        ) {
            return Err(GrievanceError::InvalidTransition {
                from: complaint.status,
                to: Status::Resolved,
            });
        }
        if remark.trim().is_empty() {
            return Err(GrievanceError::MissingRemark);
        }
        complaint.status = Status::Resolved;
        complaint.resolved_at = Some(self.clock.now());
        complaint.staff_remark = Some(remark.trim().to_string());
        complaint.resolution_media = media;
        self.store.update_complaint(&complaint)?;
        self.store.get_complaint(complaint_id)
    }

    /// Admin reroute to a different department. The source becomes
    /// manual, and an assignee from the wrong department is released
    /// back to triage.
    pub fn change_department(
        &self,
        complaint_id: &str,
        department: Department,
    ) -> GrievanceResult<Complaint> {
        let mut complaint = self.store.get_complaint(complaint_id)?;
        if complaint.status.is_terminal() {
            return Err(GrievanceError::TerminalState(complaint_id.to_string()));
        }
        complaint.department = department;
        complaint.department_source = DepartmentSource::Manual;
        if let Some(staff_id) = complaint.assigned_to.clone() {
            let staff = self.store.get_staff(&staff_id)?;
            if staff.department != department {
                complaint.assigned_to = None;
                complaint.status = Status::Triaged;
                log::info!(
                    "complaint {} rerouted to {}; assignee {} released",
                    complaint_id,
                    department.as_str(),
                    staff_id
                );
            }
        }
        self.store.update_complaint(&complaint)?;
        self.store.get_complaint(complaint_id)
    }

    /// Citizen rating: 1–5, only on a resolved complaint, at most once.
    pub fn rate(
        &self,
        complaint_id: &str,
        rating: u8,
        feedback: Option<String>,
    ) -> GrievanceResult<Complaint> {
        if !(1..=5).contains(&rating) {
            return Err(GrievanceError::InvalidRating(rating));
        }
        let mut complaint = self.store.get_complaint(complaint_id)?;
        if complaint.status != Status::Resolved {
            return Err(GrievanceError::NotResolved(complaint_id.to_string()));
        }
        if complaint.is_rated() {
            return Err(GrievanceError::AlreadyRated(complaint_id.to_string()));
        }
        complaint.citizen_rating = Some(rating);
        complaint.citizen_feedback = feedback;
        complaint.rated_at = Some(self.clock.now());
        self.store.update_complaint(&complaint)?;
        self.store.get_complaint(complaint_id)
    }

    /// Permanently remove a complaint. Only terminal complaints may be
    /// deleted; open ones must be resolved or closed first.
    pub fn delete_complaint(&self, complaint_id: &str) -> GrievanceResult<()> {
        let complaint = self.store.get_complaint(complaint_id)?;
        if !complaint.status.is_terminal() {
            return Err(GrievanceError::Validation(format!(
                "complaint '{}' is {}; only resolved or closed complaints can be deleted",
                complaint_id, complaint.status
            )));
        }
        self.store.delete_complaint(complaint_id)
    }

    // ── Scheduled maintenance ──────────────────────────────────────

    /// Run one escalation sweep. Re-entrant calls are rejected, not
    /// queued: if a sweep is already in flight the report comes back
    /// with `skipped_overlapping` set and nothing else touched.
    pub fn run_sweep_once(&self) -> GrievanceResult<SweepReport> {
        if self.sweep_active.swap(true, Ordering::SeqCst) {
            log::warn!("escalation sweep already in flight; skipping this run");
            return Ok(SweepReport {
                skipped_overlapping: true,
                ..SweepReport::default()
            });
        }
        let result = escalation::sweep(&self.store, self.clock.now(), &self.config);
        self.sweep_active.store(false, Ordering::SeqCst);
        result
    }

    /// Assign SLA deadlines to complaints that pre-date the policy.
    /// Returns the number of complaints updated.
    pub fn backfill_sla_deadlines(&self) -> GrievanceResult<usize> {
        escalation::backfill_sla_deadlines(&self.store)
    }

    /// Recompute the stored breach-risk score for one complaint from
    /// the current time. Escalated complaints stay pinned at 100.
    pub fn refresh_escalation_risk(&self, complaint_id: &ComplaintId) -> GrievanceResult<Complaint> {
        let mut complaint = self.store.get_complaint(complaint_id)?;
        if complaint.escalation_level == 0 {
            complaint.escalation_risk = estimate_escalation_risk(&complaint, self.clock.now());
            self.store.update_complaint(&complaint)?;
        }
        self.store.get_complaint(complaint_id)
    }
}
