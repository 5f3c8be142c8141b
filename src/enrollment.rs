//! Student-course enrollment with capacity discipline.

use tracing::{info, instrument, warn};

use crate::error::{GradeError, Result};
use crate::model::{CourseId, GradeRecord, NewGradeRecord, StudentId};
use crate::store::EnrollmentStore;

pub struct EnrollmentManager<'a, S: EnrollmentStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: EnrollmentStore + ?Sized> EnrollmentManager<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Enroll a student in a course.
    ///
    /// The checks here give precise errors for the common case; the store's
    /// composite write re-checks uniqueness and capacity under its own
    /// transaction, so a racing select still fails cleanly.
    #[instrument(level = "debug", skip(self))]
    pub fn select(&self, student_id: StudentId, course_id: CourseId) -> Result<GradeRecord> {
        let result = self.try_select(student_id, course_id);
        match &result {
            Ok(rec) => info!(
                record_id = rec.id,
                student_id,
                course_id,
                "Enrollment created."
            ),
            Err(e) => warn!(student_id, course_id, code = e.code(), "Enrollment refused: {}", e),
        }
        result
    }

    fn try_select(&self, student_id: StudentId, course_id: CourseId) -> Result<GradeRecord> {
        if self.store.exists_enrollment(student_id, course_id)? {
            return Err(GradeError::AlreadyEnrolled {
                student_id,
                course_id,
            });
        }
        if self.store.find_student(student_id)?.is_none() {
            return Err(GradeError::StudentNotFound(student_id));
        }
        let Some(course) = self.store.find_course(course_id)? else {
            return Err(GradeError::CourseNotFound(course_id));
        };
        let capacity = course.capacity();
        if capacity.is_full() {
            return Err(GradeError::CourseFull {
                course_id,
                max_students: capacity.max_students,
            });
        }

        self.store.create_record_and_increment_course(&NewGradeRecord {
            student_id,
            course_id,
            semester: capacity.semester,
        })
    }

    /// Withdraw a student from a course. Confirmed grades pin the enrollment.
    #[instrument(level = "debug", skip(self))]
    pub fn drop(&self, student_id: StudentId, course_id: CourseId) -> Result<()> {
        let result = self.try_drop(student_id, course_id);
        match &result {
            Ok(record_id) => info!(
                record_id = *record_id,
                student_id,
                course_id,
                "Enrollment dropped."
            ),
            Err(e) => warn!(student_id, course_id, code = e.code(), "Drop refused: {}", e),
        }
        result.map(|_| ())
    }

    fn try_drop(&self, student_id: StudentId, course_id: CourseId) -> Result<i64> {
        let Some(rec) = self.store.find_record(student_id, course_id)? else {
            return Err(GradeError::EnrollmentNotFound {
                student_id,
                course_id,
            });
        };
        if rec.is_confirmed() {
            return Err(GradeError::GradeConfirmed(rec.id));
        }
        match self.store.delete_record_and_decrement_course(rec.id) {
            Ok(()) => Ok(rec.id),
            // Deleted by someone else between the read and the transaction.
            Err(GradeError::RecordNotFound(_)) => Err(GradeError::EnrollmentNotFound {
                student_id,
                course_id,
            }),
            Err(e) => Err(e),
        }
    }
}
