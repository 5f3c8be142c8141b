//! Enrollment and grade-record core of the gradebook sidecar.
//!
//! The binary in `main.rs` wraps these modules in a line-delimited JSON IPC
//! loop; tests drive them directly against an in-memory store.

pub mod analytics;
pub mod calc;
pub mod config;
pub mod db;
pub mod enrollment;
pub mod error;
pub mod ipc;
pub mod logging;
pub mod model;
pub mod recorder;
pub mod store;

pub use analytics::GradeAnalytics;
pub use enrollment::EnrollmentManager;
pub use error::{GradeError, Result};
pub use recorder::{BatchReport, GradeRecorder};
pub use store::{EnrollmentStore, SqliteStore};
