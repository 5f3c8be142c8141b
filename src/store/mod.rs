//! Storage seam for the enrollment and grade core.
//!
//! Managers only talk to an [`EnrollmentStore`]. The two composite writes
//! (`create_record_and_increment_course`, `delete_record_and_decrement_course`)
//! must be atomic in every implementation; everything else is a plain read or
//! a single-row write.
//!
//! The aggregate methods have default bodies that compute from the
//! confirmed-record lists, so a store only overrides them when it can push
//! the aggregation down. Overrides must apply the same CONFIRMED filter.

mod sqlite;

pub use sqlite::SqliteStore;

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::calc;
use crate::error::Result;
use crate::model::{
    Course, CourseId, CourseScore, GradeRecord, NewGradeRecord, PassFail, RecordId,
    ScoreDistribution, Student, StudentId,
};

pub trait EnrollmentStore: Send + Sync {
    fn find_student(&self, student_id: StudentId) -> Result<Option<Student>>;

    fn find_course(&self, course_id: CourseId) -> Result<Option<Course>>;

    fn find_record(&self, student_id: StudentId, course_id: CourseId)
        -> Result<Option<GradeRecord>>;

    fn find_record_by_id(&self, id: RecordId) -> Result<Option<GradeRecord>>;

    fn exists_enrollment(&self, student_id: StudentId, course_id: CourseId) -> Result<bool> {
        Ok(self.find_record(student_id, course_id)?.is_some())
    }

    /// Insert the record and bump the course's `current_students` as one unit.
    /// Fails with `CourseFull` when the bump would pass `max_students` and with
    /// `AlreadyEnrolled` when the pair already has a record; neither write
    /// persists in either case.
    fn create_record_and_increment_course(&self, record: &NewGradeRecord) -> Result<GradeRecord>;

    /// Overwrite scores, status and remark of a non-confirmed record. A record
    /// that is confirmed at commit time is refused with `GradeConfirmed`.
    fn update_record(&self, record: &GradeRecord) -> Result<GradeRecord>;

    /// Move an ENTERED record with a total to CONFIRMED, touching nothing but
    /// status and `updated_at`. Zero matching rows become `RecordNotFound`,
    /// `AlreadyConfirmed` or `NotEntered` according to the current row.
    fn confirm_record(&self, id: RecordId) -> Result<GradeRecord>;

    /// Delete a non-confirmed record and decrement its course (floored at 0)
    /// as one unit.
    fn delete_record_and_decrement_course(&self, id: RecordId) -> Result<()>;

    fn list_confirmed_by_student(&self, student_id: StudentId) -> Result<Vec<GradeRecord>>;

    fn list_confirmed_by_course(&self, course_id: CourseId) -> Result<Vec<GradeRecord>>;

    fn aggregate_student_average(&self, student_id: StudentId) -> Result<Option<Decimal>> {
        let rows = self.list_confirmed_by_student(student_id)?;
        Ok(calc::mean(rows.iter().filter_map(|r| r.total_score)))
    }

    fn aggregate_student_gpa(&self, student_id: StudentId) -> Result<Option<Decimal>> {
        let rows = self.list_confirmed_by_student(student_id)?;
        Ok(calc::mean(rows.iter().filter_map(|r| r.gpa)))
    }

    fn aggregate_course_average(&self, course_id: CourseId) -> Result<Option<Decimal>> {
        let rows = self.list_confirmed_by_course(course_id)?;
        Ok(calc::mean(rows.iter().filter_map(|r| r.total_score)))
    }

    fn distribution_by_course(&self, course_id: CourseId) -> Result<ScoreDistribution> {
        let rows = self.list_confirmed_by_course(course_id)?;
        Ok(calc::distribution(rows.iter().filter_map(|r| r.total_score)))
    }

    fn pass_fail_by_course(&self, course_id: CourseId) -> Result<PassFail> {
        let rows = self.list_confirmed_by_course(course_id)?;
        let mut out = PassFail::default();
        for total in rows.iter().filter_map(|r| r.total_score) {
            if calc::is_pass(total) {
                out.passed += 1;
            } else {
                out.failed += 1;
            }
        }
        Ok(out)
    }

    /// Per-course average of the student's confirmed totals, ordered by
    /// course id.
    fn scores_by_course_for_student(&self, student_id: StudentId) -> Result<Vec<CourseScore>> {
        let rows = self.list_confirmed_by_student(student_id)?;
        let mut by_course: BTreeMap<CourseId, Vec<Decimal>> = BTreeMap::new();
        for r in &rows {
            if let Some(total) = r.total_score {
                by_course.entry(r.course_id).or_default().push(total);
            }
        }

        let mut out = Vec::with_capacity(by_course.len());
        for (course_id, totals) in by_course {
            let Some(average_score) = calc::mean(totals) else {
                continue;
            };
            let course_name = self
                .find_course(course_id)?
                .map(|c| c.course_name)
                .unwrap_or_else(|| "unknown".to_string());
            out.push(CourseScore {
                course_name,
                average_score,
            });
        }
        Ok(out)
    }
}
