use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

pub type RecordId = i64;
pub type StudentId = i64;
pub type CourseId = i64;

/// Lifecycle state of a grade record. Ordered so `status >= Entered` reads
/// the way the invariants are phrased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GradeStatus {
    Enrolled,
    Entered,
    Confirmed,
}

impl GradeStatus {
    pub fn code(self) -> i64 {
        match self {
            GradeStatus::Enrolled => 0,
            GradeStatus::Entered => 1,
            GradeStatus::Confirmed => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(GradeStatus::Enrolled),
            1 => Some(GradeStatus::Entered),
            2 => Some(GradeStatus::Confirmed),
            _ => None,
        }
    }
}

// Clients expect the integer form.
impl Serialize for GradeStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRecord {
    pub id: RecordId,
    pub student_id: StudentId,
    pub course_id: CourseId,
    pub semester: Option<String>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub usual_score: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub midterm_score: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub final_score: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub total_score: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub gpa: Option<Decimal>,
    pub status: GradeStatus,
    pub remark: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl GradeRecord {
    pub fn is_confirmed(&self) -> bool {
        self.status == GradeStatus::Confirmed
    }

    /// All three partials, when every one of them has been entered.
    pub fn partials(&self) -> Option<Partials> {
        Some(Partials {
            usual: self.usual_score?,
            midterm: self.midterm_score?,
            final_exam: self.final_score?,
        })
    }
}

/// Insert payload for a fresh enrollment; the store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGradeRecord {
    pub student_id: StudentId,
    pub course_id: CourseId,
    pub semester: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partials {
    pub usual: Decimal,
    pub midterm: Decimal,
    pub final_exam: Decimal,
}

/// One `enter` request. Partials stay optional here so a missing value is
/// reported as an invalid score instead of a parse failure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreEntry {
    pub record_id: Option<RecordId>,
    pub usual_score: Option<Decimal>,
    pub midterm_score: Option<Decimal>,
    pub final_score: Option<Decimal>,
    pub remark: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: StudentId,
    pub student_no: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewStudent {
    pub student_no: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    pub course_code: String,
    pub course_name: String,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub credit: Option<Decimal>,
    pub semester: Option<String>,
    pub max_students: i64,
    pub current_students: i64,
}

impl Course {
    pub fn capacity(&self) -> CourseCapacity {
        CourseCapacity {
            course_id: self.id,
            max_students: self.max_students,
            current_students: self.current_students,
            semester: self.semester.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCourse {
    pub course_code: String,
    pub course_name: String,
    pub credit: Option<Decimal>,
    pub semester: Option<String>,
    pub max_students: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseCapacity {
    pub course_id: CourseId,
    pub max_students: i64,
    pub current_students: i64,
    pub semester: Option<String>,
}

impl CourseCapacity {
    pub fn is_full(&self) -> bool {
        self.current_students >= self.max_students
    }
}

/// A grade record joined with the student and course fields clients display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeView {
    #[serde(flatten)]
    pub record: GradeRecord,
    pub student_no: String,
    pub student_name: String,
    pub course_code: String,
    pub course_name: String,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub credit: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradeFilter {
    pub student_id: Option<StudentId>,
    pub course_id: Option<CourseId>,
    pub semester: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub records: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub size: i64,
}

/// Score bands of the course distribution, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreBand {
    Excellent,
    Good,
    Medium,
    Pass,
    Fail,
}

impl ScoreBand {
    pub const ALL: [ScoreBand; 5] = [
        ScoreBand::Excellent,
        ScoreBand::Good,
        ScoreBand::Medium,
        ScoreBand::Pass,
        ScoreBand::Fail,
    ];

    pub fn index(self) -> usize {
        match self {
            ScoreBand::Excellent => 0,
            ScoreBand::Good => 1,
            ScoreBand::Medium => 2,
            ScoreBand::Pass => 3,
            ScoreBand::Fail => 4,
        }
    }

    /// Fixed labels existing clients match on.
    pub fn label(self) -> &'static str {
        match self {
            ScoreBand::Excellent => "优秀(90-100)",
            ScoreBand::Good => "良好(80-89)",
            ScoreBand::Medium => "中等(70-79)",
            ScoreBand::Pass => "及格(60-69)",
            ScoreBand::Fail => "不及格(<60)",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreDistribution {
    pub counts: [i64; 5],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BandCount {
    pub name: &'static str,
    pub value: i64,
}

impl ScoreDistribution {
    pub fn count(&self, band: ScoreBand) -> i64 {
        self.counts[band.index()]
    }

    pub fn total(&self) -> i64 {
        self.counts.iter().sum()
    }

    /// Labelled counts in band order; empty bands are kept as zero.
    pub fn entries(&self) -> Vec<BandCount> {
        ScoreBand::ALL
            .iter()
            .map(|b| BandCount {
                name: b.label(),
                value: self.count(*b),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseScore {
    pub course_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub average_score: Decimal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassFail {
    pub passed: i64,
    pub failed: i64,
}
