//! SQLite persistence layer.
//!
//! RULE: only the store talks to the database. Engine code and the
//! sweep call store methods — they never execute SQL directly.

mod complaint;
mod staff;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::Connection;

use crate::complaint::{Department, DepartmentSource, Locality, Priority, StaffTier, Status};
use crate::error::GrievanceResult;

pub struct GrievanceStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for a file
}

impl GrievanceStore {
    /// Open (or create) the grievance database at `path`.
    pub fn open(path: &str) -> GrievanceResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (:memory: ignores it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> GrievanceResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database. For in-memory
    /// databases this returns a fresh, isolated database.
    pub fn reopen(&self) -> GrievanceResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> GrievanceResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}

// Domain enums are stored as their canonical text form.
macro_rules! sql_text_enum {
    ($($t:ty),* $(,)?) => {$(
        impl ToSql for $t {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $t {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let s = value.as_str()?;
                <$t>::parse(s).ok_or_else(|| {
                    FromSqlError::Other(
                        format!("invalid {} value: {s}", stringify!($t)).into(),
                    )
                })
            }
        }
    )*};
}

sql_text_enum!(Department, DepartmentSource, Priority, Status, Locality, StaffTier);
