//! Staff directory access.

use rusqlite::{params, OptionalExtension};

use super::GrievanceStore;
use crate::complaint::{Department, Locality, StaffTier, StaffUser};
use crate::error::{GrievanceError, GrievanceResult};

fn staff_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<StaffUser> {
    Ok(StaffUser {
        staff_id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        department: row.get(3)?,
        locality: row.get(4)?,
        tier: row.get(5)?,
    })
}

impl GrievanceStore {
    pub fn insert_staff(&self, staff: &StaffUser) -> GrievanceResult<()> {
        self.conn().execute(
            "INSERT INTO staff (staff_id, name, email, department, locality, tier)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                &staff.staff_id,
                &staff.name,
                &staff.email,
                staff.department,
                staff.locality,
                staff.tier,
            ],
        )?;
        Ok(())
    }

    /// Idempotent insert for roster seeding: an existing staff_id is
    /// left untouched. Returns whether a row was actually written.
    pub fn insert_staff_if_absent(&self, staff: &StaffUser) -> GrievanceResult<bool> {
        let rows = self.conn().execute(
            "INSERT OR IGNORE INTO staff (staff_id, name, email, department, locality, tier)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                &staff.staff_id,
                &staff.name,
                &staff.email,
                staff.department,
                staff.locality,
                staff.tier,
            ],
        )?;
        Ok(rows > 0)
    }

    pub fn get_staff(&self, staff_id: &str) -> GrievanceResult<StaffUser> {
        self.conn()
            .query_row(
                "SELECT staff_id, name, email, department, locality, tier
                 FROM staff WHERE staff_id = ?1",
                params![staff_id],
                staff_row_mapper,
            )
            .optional()?
            .ok_or_else(|| GrievanceError::StaffNotFound(staff_id.to_string()))
    }

    /// Pool of candidate assignees for a complaint: same department and
    /// the same locality. Stable order (insertion order) so tie-breaks
    /// are deterministic.
    pub fn staff_pool(
        &self,
        department: Department,
        locality: Locality,
    ) -> GrievanceResult<Vec<StaffUser>> {
        let mut stmt = self.conn().prepare(
            "SELECT staff_id, name, email, department, locality, tier
             FROM staff WHERE department = ?1 AND locality = ?2
             ORDER BY rowid ASC",
        )?;
        let rows = stmt.query_map(params![department, locality], staff_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// First staff member at exactly `tier` in the pool, if any. Used by
    /// the escalation sweep, which moves up one tier at a time.
    pub fn find_staff_at_tier(
        &self,
        department: Department,
        locality: Locality,
        tier: StaffTier,
    ) -> GrievanceResult<Option<StaffUser>> {
        self.conn()
            .query_row(
                "SELECT staff_id, name, email, department, locality, tier
                 FROM staff
                 WHERE department = ?1 AND locality = ?2 AND tier = ?3
                 ORDER BY rowid ASC LIMIT 1",
                params![department, locality, tier],
                staff_row_mapper,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn staff_count(&self) -> GrievanceResult<i64> {
        self.conn()
            .query_row("SELECT COUNT(*) FROM staff", [], |row| row.get(0))
            .map_err(Into::into)
    }
}
