//! Score lifecycle of an existing enrollment: enter, confirm, delete.

use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use crate::calc;
use crate::error::{GradeError, Result};
use crate::model::{GradeRecord, GradeStatus, RecordId, ScoreEntry};
use crate::store::EnrollmentStore;

/// One failed item of a batch entry.
#[derive(Debug)]
pub struct BatchFailure {
    pub index: usize,
    pub record_id: RecordId,
    pub error: GradeError,
}

/// Outcome of [`GradeRecorder::batch_enter_report`]. Items are processed in
/// order and successes persist regardless of later failures.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub updated: usize,
    pub skipped: usize,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn first_error(self) -> Option<GradeError> {
        self.failures.into_iter().next().map(|f| f.error)
    }
}

pub struct GradeRecorder<'a, S: EnrollmentStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: EnrollmentStore + ?Sized> GradeRecorder<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    fn load(&self, id: RecordId) -> Result<GradeRecord> {
        self.store
            .find_record_by_id(id)?
            .ok_or(GradeError::RecordNotFound(id))
    }

    /// Record all three partial scores, deriving total and GPA.
    ///
    /// A `None` remark leaves the stored remark untouched.
    #[instrument(level = "debug", skip(self, remark))]
    pub fn enter(
        &self,
        id: RecordId,
        usual: Option<Decimal>,
        midterm: Option<Decimal>,
        final_exam: Option<Decimal>,
        remark: Option<&str>,
    ) -> Result<GradeRecord> {
        let result = self.try_enter(id, usual, midterm, final_exam, remark);
        match &result {
            Ok(rec) => info!(
                record_id = id,
                student_id = rec.student_id,
                course_id = rec.course_id,
                "Scores entered."
            ),
            Err(e) => warn!(record_id = id, code = e.code(), "Score entry refused: {}", e),
        }
        result
    }

    fn try_enter(
        &self,
        id: RecordId,
        usual: Option<Decimal>,
        midterm: Option<Decimal>,
        final_exam: Option<Decimal>,
        remark: Option<&str>,
    ) -> Result<GradeRecord> {
        let mut rec = self.load(id)?;
        if rec.is_confirmed() {
            return Err(GradeError::GradeConfirmed(id));
        }

        let partials = calc::validate_partials(usual, midterm, final_exam)?;
        let total = calc::weighted_total(&partials);

        rec.usual_score = Some(partials.usual);
        rec.midterm_score = Some(partials.midterm);
        rec.final_score = Some(partials.final_exam);
        rec.total_score = Some(total);
        rec.gpa = Some(calc::gpa_of(Some(total)));
        rec.status = GradeStatus::Entered;
        if let Some(r) = remark {
            rec.remark = Some(r.to_string());
        }

        // The store refuses the write if a confirm committed since `load`.
        self.store.update_record(&rec)
    }

    /// Apply `enter` to every item, skipping items without a record id.
    pub fn batch_enter_report(&self, entries: &[ScoreEntry]) -> BatchReport {
        let mut report = BatchReport::default();
        for (index, entry) in entries.iter().enumerate() {
            let Some(record_id) = entry.record_id else {
                report.skipped += 1;
                continue;
            };
            match self.enter(
                record_id,
                entry.usual_score,
                entry.midterm_score,
                entry.final_score,
                entry.remark.as_deref(),
            ) {
                Ok(_) => report.updated += 1,
                Err(error) => report.failures.push(BatchFailure {
                    index,
                    record_id,
                    error,
                }),
            }
        }
        report
    }

    /// Best-effort batch entry. Every item is attempted; the first failure,
    /// if any, is returned once the whole batch has been processed.
    pub fn batch_enter(&self, entries: &[ScoreEntry]) -> Result<()> {
        match self.batch_enter_report(entries).first_error() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Freeze the entered scores.
    #[instrument(level = "debug", skip(self))]
    pub fn confirm(&self, id: RecordId) -> Result<GradeRecord> {
        let result = self.try_confirm(id);
        match &result {
            Ok(rec) => info!(
                record_id = id,
                student_id = rec.student_id,
                course_id = rec.course_id,
                "Grade confirmed."
            ),
            Err(e) => warn!(record_id = id, code = e.code(), "Confirm refused: {}", e),
        }
        result
    }

    fn try_confirm(&self, id: RecordId) -> Result<GradeRecord> {
        let rec = self.load(id)?;
        match rec.status {
            GradeStatus::Confirmed => return Err(GradeError::AlreadyConfirmed(id)),
            GradeStatus::Enrolled => return Err(GradeError::NotEntered(id)),
            GradeStatus::Entered => {}
        }
        if rec.total_score.is_none() {
            return Err(GradeError::NotEntered(id));
        }

        // Status-only write; scores committed after `load` are kept.
        self.store.confirm_record(id)
    }

    /// Remove a non-confirmed record and release its seat.
    #[instrument(level = "debug", skip(self))]
    pub fn delete(&self, id: RecordId) -> Result<()> {
        let result = self.try_delete(id);
        match &result {
            Ok(rec) => info!(
                record_id = id,
                student_id = rec.student_id,
                course_id = rec.course_id,
                "Grade record deleted."
            ),
            Err(e) => warn!(record_id = id, code = e.code(), "Delete refused: {}", e),
        }
        result.map(|_| ())
    }

    fn try_delete(&self, id: RecordId) -> Result<GradeRecord> {
        let rec = self.load(id)?;
        if rec.is_confirmed() {
            return Err(GradeError::GradeConfirmed(id));
        }
        self.store.delete_record_and_decrement_course(id)?;
        Ok(rec)
    }
}
