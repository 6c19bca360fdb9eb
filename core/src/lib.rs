//! grievance-core — complaint lifecycle engine for the civic grievance
//! platform.
//!
//! INTAKE ORDER (fixed, documented, never reordered):
//!   1. Content validation
//!   2. Department classification
//!   3. Priority estimation
//!   4. Duplicate / hotspot scan
//!   5. SLA deadline
//!   6. Auto-assignment
//!   7. Persist
//!
//! The escalation sweep runs independently of intake: an external timer
//! (grievance-runner, or any orchestrator) calls
//! [`engine::GrievanceEngine::run_sweep_once`] at its own cadence.

pub mod assignment;
pub mod classifier;
pub mod clock;
pub mod complaint;
pub mod config;
pub mod duplicate;
pub mod engine;
pub mod error;
pub mod escalation;
pub mod sla;
pub mod store;
pub mod types;
