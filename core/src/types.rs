//! Shared primitive types used across the entire engine.

/// A stable, unique complaint identifier (UUID v4, string form).
pub type ComplaintId = String;

/// A stable, unique staff identifier.
pub type StaffId = String;
