//! Complaint table access: versioned writes, range queries for the
//! sweep and the duplicate scan, and the escalation audit log.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::GrievanceStore;
use crate::complaint::{Complaint, EscalationEntry, GeoPoint};
use crate::duplicate::CandidateRow;
use crate::error::{GrievanceError, GrievanceResult};
use crate::types::ComplaintId;

const COMPLAINT_COLUMNS: &str = "complaint_id, title, description, department, \
     department_source, priority, status, locality, lat, lng, assigned_to, \
     duplicate_of, is_hotspot, hotspot_count, escalation_level, escalation_risk, \
     citizen_rating, citizen_feedback, rated_at, staff_remark, resolution_media, \
     sla_deadline, created_at, assigned_at, in_progress_at, resolved_at, \
     closed_at, version";

fn complaint_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<Complaint> {
    let lat: Option<f64> = row.get(8)?;
    let lng: Option<f64> = row.get(9)?;
    let media_json: String = row.get(20)?;
    let resolution_media: Vec<String> = serde_json::from_str(&media_json).unwrap_or_default();
    Ok(Complaint {
        complaint_id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        department: row.get(3)?,
        department_source: row.get(4)?,
        priority: row.get(5)?,
        status: row.get(6)?,
        locality: row.get(7)?,
        location: match (lat, lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
            _ => None,
        },
        assigned_to: row.get(10)?,
        duplicate_of: row.get(11)?,
        is_hotspot: row.get::<_, i32>(12)? != 0,
        hotspot_count: row.get::<_, i64>(13)? as u32,
        escalation_level: row.get::<_, i64>(14)? as u8,
        escalation_risk: row.get::<_, i64>(15)? as u8,
        // History is loaded separately from escalation_history.
        escalation_history: Vec::new(),
        citizen_rating: row.get::<_, Option<i64>>(16)?.map(|r| r as u8),
        citizen_feedback: row.get(17)?,
        rated_at: row.get(18)?,
        staff_remark: row.get(19)?,
        resolution_media,
        sla_deadline: row.get(21)?,
        created_at: row.get(22)?,
        assigned_at: row.get(23)?,
        in_progress_at: row.get(24)?,
        resolved_at: row.get(25)?,
        closed_at: row.get(26)?,
        version: row.get(27)?,
    })
}

impl GrievanceStore {
    // ── Complaint CRUD ─────────────────────────────────────────────

    pub fn insert_complaint(&self, c: &Complaint) -> GrievanceResult<()> {
        let media_json = serde_json::to_string(&c.resolution_media)?;
        self.conn().execute(
            "INSERT INTO complaint (
                complaint_id, title, description, department, department_source,
                priority, status, locality, lat, lng, assigned_to, duplicate_of,
                is_hotspot, hotspot_count, escalation_level, escalation_risk,
                citizen_rating, citizen_feedback, rated_at, staff_remark,
                resolution_media, sla_deadline, created_at, assigned_at,
                in_progress_at, resolved_at, closed_at, version
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                       ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24,
                       ?25, ?26, ?27, ?28)",
            params![
                &c.complaint_id,
                &c.title,
                &c.description,
                c.department,
                c.department_source,
                c.priority,
                c.status,
                c.locality,
                c.location.map(|p| p.lat),
                c.location.map(|p| p.lng),
                c.assigned_to.as_deref(),
                c.duplicate_of.as_deref(),
                if c.is_hotspot { 1i32 } else { 0i32 },
                c.hotspot_count as i64,
                c.escalation_level as i64,
                c.escalation_risk as i64,
                c.citizen_rating.map(|r| r as i64),
                c.citizen_feedback.as_deref(),
                c.rated_at,
                c.staff_remark.as_deref(),
                media_json,
                c.sla_deadline,
                c.created_at,
                c.assigned_at,
                c.in_progress_at,
                c.resolved_at,
                c.closed_at,
                c.version,
            ],
        )?;
        Ok(())
    }

    pub fn get_complaint(&self, complaint_id: &str) -> GrievanceResult<Complaint> {
        let sql = format!("SELECT {COMPLAINT_COLUMNS} FROM complaint WHERE complaint_id = ?1");
        let mut complaint = self
            .conn()
            .query_row(&sql, params![complaint_id], complaint_row_mapper)
            .optional()?
            .ok_or_else(|| GrievanceError::ComplaintNotFound(complaint_id.to_string()))?;
        complaint.escalation_history = self.escalation_history(complaint_id)?;
        Ok(complaint)
    }

    pub fn complaint_exists(&self, complaint_id: &str) -> GrievanceResult<bool> {
        complaint_exists_in(self.conn(), complaint_id)
    }

    /// Versioned full-row update (optimistic concurrency).
    ///
    /// Writes only when the stored version equals `c.version`, bumping
    /// the version in the same statement; a concurrent writer therefore
    /// surfaces as [`GrievanceError::VersionConflict`] rather than a
    /// silent lost update. Escalation history is not written here — it
    /// is append-only via [`GrievanceStore::append_escalation`].
    pub fn update_complaint(&self, c: &Complaint) -> GrievanceResult<()> {
        update_complaint_row(self.conn(), c)
    }

    /// Escalation write pair: the versioned complaint update and the
    /// audit-log append commit together or not at all. A half-written
    /// escalation would defeat the history-based cool-down check.
    pub fn escalate_complaint(
        &self,
        c: &Complaint,
        entry: &EscalationEntry,
    ) -> GrievanceResult<()> {
        let tx = self.conn().unchecked_transaction()?;
        update_complaint_row(&tx, c)?;
        insert_escalation_row(&tx, &c.complaint_id, entry)?;
        tx.commit()?;
        Ok(())
    }

    /// Hard deletion; the engine guards that only resolved/closed
    /// complaints reach this. History rows cascade.
    pub fn delete_complaint(&self, complaint_id: &str) -> GrievanceResult<()> {
        let rows = self.conn().execute(
            "DELETE FROM complaint WHERE complaint_id = ?1",
            params![complaint_id],
        )?;
        if rows == 0 {
            return Err(GrievanceError::ComplaintNotFound(complaint_id.to_string()));
        }
        Ok(())
    }

    // ── Duplicate-scan queries ─────────────────────────────────────

    /// Candidates for the embedding scan: created since `since`, not
    /// themselves flagged as duplicates, most recent first.
    pub fn recent_candidates(
        &self,
        since: DateTime<Utc>,
        limit: u32,
    ) -> GrievanceResult<Vec<CandidateRow>> {
        let mut stmt = self.conn().prepare(
            "SELECT complaint_id, title, description, lat, lng, hotspot_count
             FROM complaint
             WHERE created_at >= ?1 AND duplicate_of IS NULL
             ORDER BY created_at DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![since, limit as i64], candidate_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Smaller recency-ordered sample for the token-overlap fallback.
    pub fn latest_candidates(&self, limit: u32) -> GrievanceResult<Vec<CandidateRow>> {
        let mut stmt = self.conn().prepare(
            "SELECT complaint_id, title, description, lat, lng, hotspot_count
             FROM complaint
             ORDER BY created_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], candidate_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Flag an existing complaint as part of a hotspot cluster.
    ///
    /// Deliberately unversioned: two concurrent hotspot writes on the
    /// same target race harmlessly (last-write-wins on the count).
    pub fn mark_hotspot(&self, complaint_id: &str, count: u32) -> GrievanceResult<()> {
        self.conn().execute(
            "UPDATE complaint SET is_hotspot = 1, hotspot_count = ?2
             WHERE complaint_id = ?1",
            params![complaint_id, count as i64],
        )?;
        Ok(())
    }

    // ── Sweep queries ──────────────────────────────────────────────

    /// Complaints eligible for escalation: open, past their SLA
    /// deadline, and assigned. History is loaded for cool-down checks.
    pub fn overdue_unresolved(&self, now: DateTime<Utc>) -> GrievanceResult<Vec<Complaint>> {
        let sql = format!(
            "SELECT {COMPLAINT_COLUMNS} FROM complaint
             WHERE status NOT IN ('resolved', 'closed')
               AND sla_deadline IS NOT NULL AND sla_deadline <= ?1
               AND assigned_to IS NOT NULL
             ORDER BY sla_deadline ASC"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![now], complaint_row_mapper)?;
        let mut complaints = rows.collect::<Result<Vec<_>, _>>()?;
        for complaint in &mut complaints {
            complaint.escalation_history = self.escalation_history(&complaint.complaint_id)?;
        }
        Ok(complaints)
    }

    /// Complaints that pre-date guaranteed SLA assignment.
    pub fn missing_sla_deadline(&self) -> GrievanceResult<Vec<Complaint>> {
        let sql = format!("SELECT {COMPLAINT_COLUMNS} FROM complaint WHERE sla_deadline IS NULL");
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map([], complaint_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// All non-terminal complaints, oldest first (runner display).
    pub fn open_complaints(&self) -> GrievanceResult<Vec<Complaint>> {
        let sql = format!(
            "SELECT {COMPLAINT_COLUMNS} FROM complaint
             WHERE status NOT IN ('resolved', 'closed')
             ORDER BY created_at ASC"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map([], complaint_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn complaint_count(&self) -> GrievanceResult<i64> {
        self.conn()
            .query_row("SELECT COUNT(*) FROM complaint", [], |row| row.get(0))
            .map_err(Into::into)
    }

    pub fn escalated_count(&self) -> GrievanceResult<i64> {
        self.conn()
            .query_row(
                "SELECT COUNT(*) FROM complaint WHERE escalation_level > 0",
                [],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    // ── Escalation audit log ───────────────────────────────────────

    pub fn append_escalation(
        &self,
        complaint_id: &ComplaintId,
        entry: &EscalationEntry,
    ) -> GrievanceResult<()> {
        insert_escalation_row(self.conn(), complaint_id, entry)
    }

    /// Ordered, append-only history for one complaint.
    pub fn escalation_history(
        &self,
        complaint_id: &str,
    ) -> GrievanceResult<Vec<EscalationEntry>> {
        let mut stmt = self.conn().prepare(
            "SELECT level, escalated_at, reason FROM escalation_history
             WHERE complaint_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![complaint_id], |row| {
            Ok(EscalationEntry {
                level: row.get::<_, i64>(0)? as u8,
                escalated_at: row.get(1)?,
                reason: row.get(2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

fn complaint_exists_in(conn: &Connection, complaint_id: &str) -> GrievanceResult<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM complaint WHERE complaint_id = ?1",
            params![complaint_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn update_complaint_row(conn: &Connection, c: &Complaint) -> GrievanceResult<()> {
    let media_json = serde_json::to_string(&c.resolution_media)?;
    let rows = conn.execute(
        "UPDATE complaint SET
            title = ?1, description = ?2, department = ?3,
            department_source = ?4, priority = ?5, status = ?6,
            lat = ?7, lng = ?8, assigned_to = ?9, duplicate_of = ?10,
            is_hotspot = ?11, hotspot_count = ?12, escalation_level = ?13,
            escalation_risk = ?14, citizen_rating = ?15,
            citizen_feedback = ?16, rated_at = ?17, staff_remark = ?18,
            resolution_media = ?19, sla_deadline = ?20, assigned_at = ?21,
            in_progress_at = ?22, resolved_at = ?23, closed_at = ?24,
            version = version + 1
         WHERE complaint_id = ?25 AND version = ?26",
        params![
            &c.title,
            &c.description,
            c.department,
            c.department_source,
            c.priority,
            c.status,
            c.location.map(|p| p.lat),
            c.location.map(|p| p.lng),
            c.assigned_to.as_deref(),
            c.duplicate_of.as_deref(),
            if c.is_hotspot { 1i32 } else { 0i32 },
            c.hotspot_count as i64,
            c.escalation_level as i64,
            c.escalation_risk as i64,
            c.citizen_rating.map(|r| r as i64),
            c.citizen_feedback.as_deref(),
            c.rated_at,
            c.staff_remark.as_deref(),
            media_json,
            c.sla_deadline,
            c.assigned_at,
            c.in_progress_at,
            c.resolved_at,
            c.closed_at,
            &c.complaint_id,
            c.version,
        ],
    )?;
    if rows == 0 {
        if complaint_exists_in(conn, &c.complaint_id)? {
            return Err(GrievanceError::VersionConflict {
                id: c.complaint_id.clone(),
                expected: c.version,
            });
        }
        return Err(GrievanceError::ComplaintNotFound(c.complaint_id.clone()));
    }
    Ok(())
}

fn insert_escalation_row(
    conn: &Connection,
    complaint_id: &str,
    entry: &EscalationEntry,
) -> GrievanceResult<()> {
    conn.execute(
        "INSERT INTO escalation_history (complaint_id, level, escalated_at, reason)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            complaint_id,
            entry.level as i64,
            entry.escalated_at,
            &entry.reason
        ],
    )?;
    Ok(())
}

fn candidate_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<CandidateRow> {
    let lat: Option<f64> = row.get(3)?;
    let lng: Option<f64> = row.get(4)?;
    Ok(CandidateRow {
        complaint_id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        location: match (lat, lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
            _ => None,
        },
        hotspot_count: row.get::<_, i64>(5)? as u32,
    })
}
