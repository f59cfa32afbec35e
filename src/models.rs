use serde::Serialize;

/// One spreadsheet row: Arabic header name -> cell value.
pub type RawRow = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Achievement {
    pub achieved: f64,
    pub required: f64,
    pub formatted: String,
    pub index: f64,
}

impl Achievement {
    pub fn new(achieved: f64, required: f64) -> Self {
        let index = if required > 0.0 { achieved / required } else { 0.0 };
        Self {
            achieved,
            required,
            formatted: format!("{} / {}", achieved, required),
            index,
        }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Same requirement, nothing achieved.
    pub fn zeroed(&self) -> Self {
        Self::new(0.0, self.required)
    }
}

impl Default for Achievement {
    fn default() -> Self {
        Self::zero()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentRecord {
    pub username: String,
    pub name: String,
    pub circle: String,
    pub circle_time: String,
    pub teacher: String,
    pub program: String,
    pub memorization: Achievement,
    pub review: Achievement,
    pub consolidation: Achievement,
    pub memorization_lessons: String,
    pub review_lessons: String,
    pub attendance: f64,
    pub total_points: f64,
    pub guardian_mobile: String,
    pub week: Option<String>,
    pub day: Option<String>,
    pub has_multiple_entries: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircleAggregate {
    pub circle: String,
    pub student_count: usize,
    pub total_memorization: f64,
    pub total_review: f64,
    pub total_consolidation: f64,
    pub avg_memorization_index: f64,
    pub avg_review_index: f64,
    pub avg_consolidation_index: f64,
    pub avg_general_index: f64,
    pub avg_attendance: f64,
    pub total_points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExcellenceAggregate {
    #[serde(flatten)]
    pub circle: CircleAggregate,
    pub excellence_score: f64,
    pub rank: usize,
}

/// Lightweight summary for groupings other than circle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub key: String,
    pub student_count: usize,
    pub avg_memorization_index: f64,
    pub avg_review_index: f64,
    pub avg_consolidation_index: f64,
    pub avg_attendance: f64,
    pub total_points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationRecord {
    pub circle: String,
    pub teacher: String,
    pub discipline: f64,
    pub memorization: f64,
    pub review: f64,
    pub consolidation: f64,
    pub attendance: f64,
    pub general_index: f64,
    pub overall: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupervisorRecord {
    pub name: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub circles: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Late,
    Excused,
    Absent,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceEntry {
    pub student: String,
    pub circle: String,
    pub date: String,
    pub week: Option<String>,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceSummary {
    pub circle: String,
    pub present: usize,
    pub late: usize,
    pub excused: usize,
    pub absent: usize,
    pub unknown: usize,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExamRecord {
    pub student: String,
    pub circle: String,
    pub teacher: String,
    pub exam: String,
    pub score: f64,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExamSummary {
    pub circle: String,
    pub exam_count: usize,
    pub avg_score: f64,
    pub passed: usize,
}
