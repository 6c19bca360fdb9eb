use crate::complaint::Status;
use crate::types::{ComplaintId, StaffId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GrievanceError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Complaint '{0}' not found")]
    ComplaintNotFound(ComplaintId),

    #[error("Staff '{0}' not found")]
    StaffNotFound(StaffId),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Illegal status transition: {from} -> {to}")]
    InvalidTransition { from: Status, to: Status },

    #[error("Complaint '{id}' was modified concurrently (expected version {expected})")]
    VersionConflict { id: ComplaintId, expected: i64 },

    #[error("A non-empty resolution remark is required")]
    MissingRemark,

    #[error("Complaint '{0}' is not assigned to any staff")]
    NotAssigned(ComplaintId),

    #[error("Acting staff is not the assignee of complaint '{0}'")]
    Unauthorized(ComplaintId),

    #[error("Rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),

    #[error("Complaint '{0}' has already been rated")]
    AlreadyRated(ComplaintId),

    #[error("Complaint '{0}' is not resolved")]
    NotResolved(ComplaintId),

    #[error("Complaint '{0}' is in a terminal state and cannot be modified")]
    TerminalState(ComplaintId),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type GrievanceResult<T> = Result<T, GrievanceError>;
