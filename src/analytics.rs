//! Read-side statistics over confirmed grade records.
//!
//! Every figure here delegates to the store's aggregate methods, whose default
//! bodies compute from the confirmed-record lists and whose SQLite overrides
//! push the same filter down into SQL.

use rust_decimal::Decimal;

use crate::error::Result;
use crate::model::{CourseId, CourseScore, PassFail, ScoreDistribution, StudentId};
use crate::store::EnrollmentStore;

pub struct GradeAnalytics<'a, S: EnrollmentStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: EnrollmentStore + ?Sized> GradeAnalytics<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Mean total score; `None` when the student has no confirmed records.
    pub fn average_score(&self, student_id: StudentId) -> Result<Option<Decimal>> {
        self.store.aggregate_student_average(student_id)
    }

    pub fn average_gpa(&self, student_id: StudentId) -> Result<Option<Decimal>> {
        self.store.aggregate_student_gpa(student_id)
    }

    pub fn course_average(&self, course_id: CourseId) -> Result<Option<Decimal>> {
        self.store.aggregate_course_average(course_id)
    }

    pub fn scores_by_course(&self, student_id: StudentId) -> Result<Vec<CourseScore>> {
        self.store.scores_by_course_for_student(student_id)
    }

    /// Counts for the five bands, highest first. Empty bands count 0.
    pub fn score_distribution(&self, course_id: CourseId) -> Result<ScoreDistribution> {
        self.store.distribution_by_course(course_id)
    }

    pub fn pass_fail(&self, course_id: CourseId) -> Result<PassFail> {
        self.store.pass_fail_by_course(course_id)
    }
}
