use rusqlite::types::Value;
use rusqlite::{
    ffi, params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior,
};
use rust_decimal::Decimal;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::EnrollmentStore;
use crate::calc;
use crate::db;
use crate::error::{GradeError, Result};
use crate::model::{
    Course, CourseId, CourseScore, GradeFilter, GradeRecord, GradeStatus, GradeView,
    NewCourse, NewGradeRecord, NewStudent, Page, PassFail, RecordId, ScoreDistribution,
    Student, StudentId,
};

const RECORD_COLUMNS: &str = "g.id, g.student_id, g.course_id, g.semester,
    g.usual_score, g.midterm_score, g.final_score, g.total_score, g.gpa,
    g.status, g.remark, g.created_at, g.updated_at";

const VIEW_FROM: &str = "FROM grade_records g
    JOIN students s ON s.id = g.student_id
    JOIN courses c ON c.id = g.course_id";

const COURSE_COLUMNS: &str =
    "id, course_code, course_name, credit, semester, max_students, current_students";

/// SQLite-backed [`EnrollmentStore`].
///
/// One connection behind a mutex; composite writes run in `BEGIN IMMEDIATE`
/// transactions so they also serialize against other processes sharing the
/// workspace file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn opt_hundredths(v: Option<Decimal>) -> Result<Option<i64>> {
    v.map(calc::to_hundredths).transpose()
}

fn constraint_code(e: &rusqlite::Error) -> Option<i32> {
    match e {
        rusqlite::Error::SqliteFailure(f, _) if f.code == rusqlite::ErrorCode::ConstraintViolation => {
            Some(f.extended_code)
        }
        _ => None,
    }
}

fn record_from_row(r: &Row<'_>) -> rusqlite::Result<GradeRecord> {
    let status_code: i64 = r.get(9)?;
    let status = GradeStatus::from_code(status_code)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(9, status_code))?;
    Ok(GradeRecord {
        id: r.get(0)?,
        student_id: r.get(1)?,
        course_id: r.get(2)?,
        semester: r.get(3)?,
        usual_score: r.get::<_, Option<i64>>(4)?.map(calc::from_hundredths),
        midterm_score: r.get::<_, Option<i64>>(5)?.map(calc::from_hundredths),
        final_score: r.get::<_, Option<i64>>(6)?.map(calc::from_hundredths),
        total_score: r.get::<_, Option<i64>>(7)?.map(calc::from_hundredths),
        gpa: r.get::<_, Option<i64>>(8)?.map(calc::from_hundredths),
        status,
        remark: r.get(10)?,
        created_at: r.get(11)?,
        updated_at: r.get(12)?,
    })
}

fn view_from_row(r: &Row<'_>) -> rusqlite::Result<GradeView> {
    Ok(GradeView {
        record: record_from_row(r)?,
        student_no: r.get(13)?,
        student_name: r.get(14)?,
        course_code: r.get(15)?,
        course_name: r.get(16)?,
        credit: r.get::<_, Option<i64>>(17)?.map(calc::from_hundredths),
    })
}

fn course_from_row(r: &Row<'_>) -> rusqlite::Result<Course> {
    Ok(Course {
        id: r.get(0)?,
        course_code: r.get(1)?,
        course_name: r.get(2)?,
        credit: r.get::<_, Option<i64>>(3)?.map(calc::from_hundredths),
        semester: r.get(4)?,
        max_students: r.get(5)?,
        current_students: r.get(6)?,
    })
}

fn load_record(conn: &Connection, id: RecordId) -> rusqlite::Result<Option<GradeRecord>> {
    conn.query_row(
        &format!("SELECT {} FROM grade_records g WHERE g.id = ?", RECORD_COLUMNS),
        [id],
        record_from_row,
    )
    .optional()
}

fn filter_clause(filter: &GradeFilter) -> (String, Vec<Value>) {
    let mut clauses: Vec<&str> = Vec::new();
    let mut binds: Vec<Value> = Vec::new();
    if let Some(sid) = filter.student_id {
        clauses.push("g.student_id = ?");
        binds.push(Value::Integer(sid));
    }
    if let Some(cid) = filter.course_id {
        clauses.push("g.course_id = ?");
        binds.push(Value::Integer(cid));
    }
    if let Some(sem) = filter.semester.as_ref().filter(|s| !s.trim().is_empty()) {
        clauses.push("g.semester = ?");
        binds.push(Value::Text(sem.trim().to_string()));
    }
    if clauses.is_empty() {
        (String::new(), binds)
    } else {
        (format!("WHERE {}", clauses.join(" AND ")), binds)
    }
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        Ok(Self::new(db::open_db(workspace)?))
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        Ok(Self::new(db::open_in_memory()?))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| GradeError::StoreLock)
    }

    pub fn create_student(&self, student: &NewStudent) -> Result<Student> {
        let conn = self.lock()?;
        let res = conn.execute(
            "INSERT INTO students(student_no, name, created_at) VALUES(?, ?, ?)",
            params![student.student_no, student.name, now()],
        );
        if let Err(e) = res {
            if constraint_code(&e) == Some(ffi::SQLITE_CONSTRAINT_UNIQUE) {
                return Err(GradeError::BadParams(format!(
                    "student number already exists: {}",
                    student.student_no
                )));
            }
            return Err(e.into());
        }
        Ok(Student {
            id: conn.last_insert_rowid(),
            student_no: student.student_no.clone(),
            name: student.name.clone(),
        })
    }

    pub fn create_course(&self, course: &NewCourse) -> Result<Course> {
        if course.max_students <= 0 {
            return Err(GradeError::BadParams(
                "maxStudents must be positive".to_string(),
            ));
        }
        let credit = opt_hundredths(course.credit)?;
        let conn = self.lock()?;
        let res = conn.execute(
            "INSERT INTO courses(course_code, course_name, credit, semester, max_students, current_students, created_at)
             VALUES(?, ?, ?, ?, ?, 0, ?)",
            params![
                course.course_code,
                course.course_name,
                credit,
                course.semester,
                course.max_students,
                now()
            ],
        );
        if let Err(e) = res {
            if constraint_code(&e) == Some(ffi::SQLITE_CONSTRAINT_UNIQUE) {
                return Err(GradeError::BadParams(format!(
                    "course code already exists: {}",
                    course.course_code
                )));
            }
            return Err(e.into());
        }
        Ok(Course {
            id: conn.last_insert_rowid(),
            course_code: course.course_code.clone(),
            course_name: course.course_name.clone(),
            credit: credit.map(calc::from_hundredths),
            semester: course.semester.clone(),
            max_students: course.max_students,
            current_students: 0,
        })
    }

    /// Courses that still have a free seat.
    pub fn available_courses(&self) -> Result<Vec<Course>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM courses WHERE current_students < max_students ORDER BY id",
            COURSE_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], course_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn grade_view(&self, id: RecordId) -> Result<Option<GradeView>> {
        let conn = self.lock()?;
        let view = conn
            .query_row(
                &format!(
                    "SELECT {}, s.student_no, s.name, c.course_code, c.course_name, c.credit {} WHERE g.id = ?",
                    RECORD_COLUMNS, VIEW_FROM
                ),
                [id],
                view_from_row,
            )
            .optional()?;
        Ok(view)
    }

    /// All records matching the filter, any status, newest first.
    pub fn list_views(&self, filter: &GradeFilter) -> Result<Vec<GradeView>> {
        let (where_sql, binds) = filter_clause(filter);
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {}, s.student_no, s.name, c.course_code, c.course_name, c.credit {} {}
             ORDER BY g.created_at DESC, g.id DESC",
            RECORD_COLUMNS, VIEW_FROM, where_sql
        ))?;
        let rows = stmt
            .query_map(params_from_iter(binds), view_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// One page (1-based) of records matching the filter, newest first.
    pub fn list_page(&self, filter: &GradeFilter, page: i64, size: i64) -> Result<Page<GradeView>> {
        if page < 1 || size < 1 {
            return Err(GradeError::BadParams(
                "page and size must be >= 1".to_string(),
            ));
        }
        let (where_sql, binds) = filter_clause(filter);
        let conn = self.lock()?;

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) {} {}", VIEW_FROM, where_sql),
            params_from_iter(binds.iter()),
            |r| r.get(0),
        )?;

        let mut page_binds = binds;
        page_binds.push(Value::Integer(size));
        page_binds.push(Value::Integer((page - 1).saturating_mul(size)));
        let mut stmt = conn.prepare(&format!(
            "SELECT {}, s.student_no, s.name, c.course_code, c.course_name, c.credit {} {}
             ORDER BY g.created_at DESC, g.id DESC
             LIMIT ? OFFSET ?",
            RECORD_COLUMNS, VIEW_FROM, where_sql
        ))?;
        let records = stmt
            .query_map(params_from_iter(page_binds), view_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Page {
            records,
            total,
            page,
            size,
        })
    }

    /// Number of grade records held for a course, whatever their status.
    pub fn count_records_for_course(&self, course_id: CourseId) -> Result<i64> {
        let conn = self.lock()?;
        let n = conn.query_row(
            "SELECT COUNT(*) FROM grade_records WHERE course_id = ?",
            [course_id],
            |r| r.get(0),
        )?;
        Ok(n)
    }

    fn list_confirmed(&self, column: &str, id: i64) -> Result<Vec<GradeRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM grade_records g WHERE g.{} = ? AND g.status = 2 ORDER BY g.course_id, g.id",
            RECORD_COLUMNS, column
        ))?;
        let rows = stmt
            .query_map([id], record_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn confirmed_mean(&self, value_column: &str, key_column: &str, id: i64) -> Result<Option<Decimal>> {
        let conn = self.lock()?;
        let (sum, count): (i64, i64) = conn.query_row(
            &format!(
                "SELECT COALESCE(SUM({v}), 0), COUNT({v})
                 FROM grade_records
                 WHERE {k} = ? AND status = 2",
                v = value_column,
                k = key_column
            ),
            [id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;
        Ok(calc::mean_of_hundredths(sum, count))
    }
}

impl EnrollmentStore for SqliteStore {
    fn find_student(&self, student_id: StudentId) -> Result<Option<Student>> {
        let conn = self.lock()?;
        let student = conn
            .query_row(
                "SELECT id, student_no, name FROM students WHERE id = ?",
                [student_id],
                |r| {
                    Ok(Student {
                        id: r.get(0)?,
                        student_no: r.get(1)?,
                        name: r.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(student)
    }

    fn find_course(&self, course_id: CourseId) -> Result<Option<Course>> {
        let conn = self.lock()?;
        let course = conn
            .query_row(
                &format!("SELECT {} FROM courses WHERE id = ?", COURSE_COLUMNS),
                [course_id],
                course_from_row,
            )
            .optional()?;
        Ok(course)
    }

    fn find_record(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<Option<GradeRecord>> {
        let conn = self.lock()?;
        let rec = conn
            .query_row(
                &format!(
                    "SELECT {} FROM grade_records g WHERE g.student_id = ? AND g.course_id = ?",
                    RECORD_COLUMNS
                ),
                [student_id, course_id],
                record_from_row,
            )
            .optional()?;
        Ok(rec)
    }

    fn find_record_by_id(&self, id: RecordId) -> Result<Option<GradeRecord>> {
        let conn = self.lock()?;
        Ok(load_record(&conn, id)?)
    }

    fn exists_enrollment(&self, student_id: StudentId, course_id: CourseId) -> Result<bool> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM grade_records WHERE student_id = ? AND course_id = ?",
            [student_id, course_id],
            |r| r.get(0),
        )?;
        Ok(n > 0)
    }

    fn create_record_and_increment_course(&self, record: &NewGradeRecord) -> Result<GradeRecord> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let max_students: Option<i64> = tx
            .query_row(
                "SELECT max_students FROM courses WHERE id = ?",
                [record.course_id],
                |r| r.get(0),
            )
            .optional()?;
        let Some(max_students) = max_students else {
            return Err(GradeError::CourseNotFound(record.course_id));
        };

        let ts = now();
        let inserted = tx.execute(
            "INSERT INTO grade_records(student_id, course_id, semester, status, created_at, updated_at)
             VALUES(?, ?, ?, 0, ?, ?)",
            params![record.student_id, record.course_id, record.semester, ts, ts],
        );
        if let Err(e) = inserted {
            // Dropping `tx` rolls back.
            return Err(match constraint_code(&e) {
                Some(ffi::SQLITE_CONSTRAINT_UNIQUE) => GradeError::AlreadyEnrolled {
                    student_id: record.student_id,
                    course_id: record.course_id,
                },
                Some(ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => {
                    GradeError::StudentNotFound(record.student_id)
                }
                _ => e.into(),
            });
        }
        let id = tx.last_insert_rowid();

        // Compare-and-set on the seat count.
        let bumped = tx.execute(
            "UPDATE courses SET current_students = current_students + 1
             WHERE id = ? AND current_students < max_students",
            [record.course_id],
        )?;
        if bumped == 0 {
            return Err(GradeError::CourseFull {
                course_id: record.course_id,
                max_students,
            });
        }

        let created = load_record(&tx, id)?.ok_or(GradeError::RecordNotFound(id))?;
        tx.commit()?;
        Ok(created)
    }

    fn update_record(&self, record: &GradeRecord) -> Result<GradeRecord> {
        let usual = opt_hundredths(record.usual_score)?;
        let midterm = opt_hundredths(record.midterm_score)?;
        let final_exam = opt_hundredths(record.final_score)?;
        let total = opt_hundredths(record.total_score)?;
        let gpa = opt_hundredths(record.gpa)?;

        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE grade_records SET
               usual_score = ?, midterm_score = ?, final_score = ?,
               total_score = ?, gpa = ?, status = ?, remark = ?, updated_at = ?
             WHERE id = ? AND status != 2",
            params![
                usual,
                midterm,
                final_exam,
                total,
                gpa,
                record.status.code(),
                record.remark,
                now(),
                record.id
            ],
        )?;
        if changed == 0 {
            return Err(match load_record(&tx, record.id)? {
                None => GradeError::RecordNotFound(record.id),
                Some(_) => GradeError::GradeConfirmed(record.id),
            });
        }
        let updated = load_record(&tx, record.id)?.ok_or(GradeError::RecordNotFound(record.id))?;
        tx.commit()?;
        Ok(updated)
    }

    fn confirm_record(&self, id: RecordId) -> Result<GradeRecord> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE grade_records SET status = 2, updated_at = ?
             WHERE id = ? AND status = 1 AND total_score IS NOT NULL",
            params![now(), id],
        )?;
        if changed == 0 {
            return Err(match load_record(&tx, id)? {
                None => GradeError::RecordNotFound(id),
                Some(rec) if rec.is_confirmed() => GradeError::AlreadyConfirmed(id),
                Some(_) => GradeError::NotEntered(id),
            });
        }
        let confirmed = load_record(&tx, id)?.ok_or(GradeError::RecordNotFound(id))?;
        tx.commit()?;
        Ok(confirmed)
    }

    fn delete_record_and_decrement_course(&self, id: RecordId) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let row: Option<(CourseId, i64)> = tx
            .query_row(
                "SELECT course_id, status FROM grade_records WHERE id = ?",
                [id],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;
        let Some((course_id, status)) = row else {
            return Err(GradeError::RecordNotFound(id));
        };
        if status == GradeStatus::Confirmed.code() {
            return Err(GradeError::GradeConfirmed(id));
        }

        tx.execute("DELETE FROM grade_records WHERE id = ?", [id])?;
        tx.execute(
            "UPDATE courses SET current_students = MAX(current_students - 1, 0) WHERE id = ?",
            [course_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn list_confirmed_by_student(&self, student_id: StudentId) -> Result<Vec<GradeRecord>> {
        self.list_confirmed("student_id", student_id)
    }

    fn list_confirmed_by_course(&self, course_id: CourseId) -> Result<Vec<GradeRecord>> {
        self.list_confirmed("course_id", course_id)
    }

    fn aggregate_student_average(&self, student_id: StudentId) -> Result<Option<Decimal>> {
        self.confirmed_mean("total_score", "student_id", student_id)
    }

    fn aggregate_student_gpa(&self, student_id: StudentId) -> Result<Option<Decimal>> {
        self.confirmed_mean("gpa", "student_id", student_id)
    }

    fn aggregate_course_average(&self, course_id: CourseId) -> Result<Option<Decimal>> {
        self.confirmed_mean("total_score", "course_id", course_id)
    }

    fn distribution_by_course(&self, course_id: CourseId) -> Result<ScoreDistribution> {
        let conn = self.lock()?;
        let counts: [i64; 5] = conn.query_row(
            "SELECT
               COALESCE(SUM(CASE WHEN total_score >= 9000 THEN 1 ELSE 0 END), 0),
               COALESCE(SUM(CASE WHEN total_score >= 8000 AND total_score < 9000 THEN 1 ELSE 0 END), 0),
               COALESCE(SUM(CASE WHEN total_score >= 7000 AND total_score < 8000 THEN 1 ELSE 0 END), 0),
               COALESCE(SUM(CASE WHEN total_score >= 6000 AND total_score < 7000 THEN 1 ELSE 0 END), 0),
               COALESCE(SUM(CASE WHEN total_score < 6000 THEN 1 ELSE 0 END), 0)
             FROM grade_records
             WHERE course_id = ? AND status = 2 AND total_score IS NOT NULL",
            [course_id],
            |r| Ok([r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?]),
        )?;
        Ok(ScoreDistribution { counts })
    }

    fn pass_fail_by_course(&self, course_id: CourseId) -> Result<PassFail> {
        let conn = self.lock()?;
        let (passed, failed): (i64, i64) = conn.query_row(
            "SELECT
               COALESCE(SUM(CASE WHEN total_score >= 6000 THEN 1 ELSE 0 END), 0),
               COALESCE(SUM(CASE WHEN total_score < 6000 THEN 1 ELSE 0 END), 0)
             FROM grade_records
             WHERE course_id = ? AND status = 2 AND total_score IS NOT NULL",
            [course_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;
        Ok(PassFail { passed, failed })
    }

    fn scores_by_course_for_student(&self, student_id: StudentId) -> Result<Vec<CourseScore>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT c.course_name, SUM(g.total_score), COUNT(g.total_score)
             FROM grade_records g
             JOIN courses c ON c.id = g.course_id
             WHERE g.student_id = ? AND g.status = 2 AND g.total_score IS NOT NULL
             GROUP BY c.id, c.course_name
             ORDER BY c.id",
        )?;
        let rows = stmt
            .query_map([student_id], |r| {
                Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?, r.get::<_, i64>(2)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows
            .into_iter()
            .filter_map(|(course_name, sum, count)| {
                calc::mean_of_hundredths(sum, count).map(|average_score| CourseScore {
                    course_name,
                    average_score,
                })
            })
            .collect())
    }
}
