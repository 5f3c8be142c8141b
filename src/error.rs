//! Error kinds surfaced by the enrollment and grade core.
//!
//! Every variant maps onto a stable snake_case `code()` that the IPC layer
//! puts in the error envelope, so clients can branch on the kind without
//! parsing messages.

use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;

use crate::model::{CourseId, RecordId, StudentId};

pub type Result<T> = std::result::Result<T, GradeError>;

#[derive(Error, Debug)]
pub enum GradeError {
    #[error("student not found: {0}")]
    StudentNotFound(StudentId),

    #[error("course not found: {0}")]
    CourseNotFound(CourseId),

    #[error("grade record not found: {0}")]
    RecordNotFound(RecordId),

    #[error("student {student_id} is not enrolled in course {course_id}")]
    EnrollmentNotFound {
        student_id: StudentId,
        course_id: CourseId,
    },

    #[error("student {student_id} already enrolled in course {course_id}")]
    AlreadyEnrolled {
        student_id: StudentId,
        course_id: CourseId,
    },

    #[error("course {course_id} is full ({max_students} students)")]
    CourseFull {
        course_id: CourseId,
        max_students: i64,
    },

    #[error("grade record {0} is confirmed and cannot be changed")]
    GradeConfirmed(RecordId),

    #[error("grade record {0} has no entered scores")]
    NotEntered(RecordId),

    #[error("grade record {0} is already confirmed")]
    AlreadyConfirmed(RecordId),

    #[error("invalid {field}: {}", describe_score(.value))]
    InvalidScore {
        field: &'static str,
        value: Option<Decimal>,
    },

    #[error("bad params: {0}")]
    BadParams(String),

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("store lock poisoned")]
    StoreLock,
}

fn describe_score(value: &Option<Decimal>) -> String {
    match value {
        Some(v) => format!("{} is outside [0, 100]", v),
        None => "score is required".to_string(),
    }
}

impl GradeError {
    pub fn code(&self) -> &'static str {
        match self {
            GradeError::StudentNotFound(_)
            | GradeError::CourseNotFound(_)
            | GradeError::RecordNotFound(_)
            | GradeError::EnrollmentNotFound { .. } => "not_found",
            GradeError::AlreadyEnrolled { .. } => "already_enrolled",
            GradeError::CourseFull { .. } => "course_full",
            GradeError::GradeConfirmed(_) => "grade_confirmed",
            GradeError::NotEntered(_) => "not_entered",
            GradeError::AlreadyConfirmed(_) => "already_confirmed",
            GradeError::InvalidScore { .. } => "invalid_score",
            GradeError::BadParams(_) => "bad_params",
            GradeError::Store(_) | GradeError::StoreLock => "store_error",
        }
    }

    /// Identifiers relevant to the failure, for the `details` slot of the
    /// error envelope.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            GradeError::StudentNotFound(id) => Some(json!({ "studentId": id })),
            GradeError::CourseNotFound(id) => Some(json!({ "courseId": id })),
            GradeError::RecordNotFound(id)
            | GradeError::GradeConfirmed(id)
            | GradeError::NotEntered(id)
            | GradeError::AlreadyConfirmed(id) => Some(json!({ "id": id })),
            GradeError::EnrollmentNotFound {
                student_id,
                course_id,
            }
            | GradeError::AlreadyEnrolled {
                student_id,
                course_id,
            } => Some(json!({ "studentId": student_id, "courseId": course_id })),
            GradeError::CourseFull {
                course_id,
                max_students,
            } => Some(json!({ "courseId": course_id, "maxStudents": max_students })),
            GradeError::InvalidScore { field, .. } => Some(json!({ "field": field })),
            GradeError::BadParams(_) | GradeError::Store(_) | GradeError::StoreLock => None,
        }
    }
}
