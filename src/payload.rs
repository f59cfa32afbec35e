use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::aggregate;
use crate::assemble;
use crate::config::Config;
use crate::models::{
    AttendanceEntry, AttendanceSummary, CircleAggregate, EvaluationRecord, ExamRecord,
    ExamSummary, ExcellenceAggregate, RawRow, StudentRecord, SupervisorRecord,
};
use crate::text::normalize_text;

#[derive(Debug, Error, PartialEq)]
pub enum PayloadError {
    #[error("payload must be a JSON object keyed by sheet name")]
    NotAnObject,
}

/// The fetch response: sheet name -> rows.
#[derive(Debug, Clone, Default)]
pub struct SheetPayload {
    sheets: Map<String, Value>,
}

impl SheetPayload {
    pub fn from_value(value: Value) -> Result<Self, PayloadError> {
        match value {
            Value::Object(sheets) => Ok(Self { sheets }),
            _ => Err(PayloadError::NotAnObject),
        }
    }

    /// Rows of one sheet. Missing sheets are empty; a non-array sheet is
    /// skipped, as are non-object rows inside it.
    pub fn rows(&self, sheet: &str) -> Vec<RawRow> {
        let Some(value) = self.sheets.get(sheet) else {
            tracing::debug!(sheet, "sheet missing from payload");
            return Vec::new();
        };
        let Value::Array(rows) = value else {
            tracing::warn!(sheet, "sheet is not an array of rows, skipping");
            return Vec::new();
        };
        rows.iter()
            .filter_map(|row| row.as_object().cloned())
            .collect()
    }
}

/// Everything the report views read, built in one pass from a payload.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Dataset {
    pub students: Vec<StudentRecord>,
    pub evaluations: Vec<EvaluationRecord>,
    pub supervisors: Vec<SupervisorRecord>,
    pub attendance: Vec<AttendanceEntry>,
    pub exams: Vec<ExamRecord>,
}

impl Dataset {
    pub fn from_payload(payload: &SheetPayload, config: &Config) -> Self {
        let sheets = &config.sheets;
        let columns = &config.columns;
        let dataset = Self {
            students: assemble::assemble_students(&payload.rows(&sheets.students), config),
            evaluations: assemble::assemble_evaluations(&payload.rows(&sheets.evaluations), columns),
            supervisors: aggregate::aggregate_supervisors(&payload.rows(&sheets.supervisors), config),
            attendance: assemble::assemble_attendance(&payload.rows(&sheets.attendance), columns),
            exams: assemble::assemble_exams(&payload.rows(&sheets.exams), columns),
        };
        tracing::info!(
            students = dataset.students.len(),
            evaluations = dataset.evaluations.len(),
            supervisors = dataset.supervisors.len(),
            attendance = dataset.attendance.len(),
            exams = dataset.exams.len(),
            "dataset assembled"
        );
        dataset
    }

    pub fn circles(&self, config: &Config) -> Vec<CircleAggregate> {
        aggregate::aggregate_by_circle(&self.students, config)
    }

    pub fn excellence(&self, config: &Config) -> Vec<ExcellenceAggregate> {
        aggregate::aggregate_excellence(&self.students, config)
    }

    pub fn attendance_summary(&self) -> Vec<AttendanceSummary> {
        aggregate::summarize_attendance(&self.attendance)
    }

    pub fn exam_summary(&self, config: &Config) -> Vec<ExamSummary> {
        aggregate::summarize_exams(&self.exams, config.exam_pass_mark)
    }

    /// Last evaluation row for the circle wins.
    pub fn evaluation_for_circle(&self, circle: &str) -> Option<&EvaluationRecord> {
        let circle = normalize_text(circle);
        self.evaluations.iter().rev().find(|e| e.circle == circle)
    }

    /// Plaintext check against the fetched supervisor rows.
    pub fn authenticate(&self, name: &str, password: &str) -> Option<&SupervisorRecord> {
        let name = normalize_text(name);
        self.supervisors
            .iter()
            .find(|s| s.name == name && !s.password.is_empty() && s.password == password.trim())
    }

    pub fn students_for_supervisor(&self, supervisor: &SupervisorRecord) -> Vec<StudentRecord> {
        self.students
            .iter()
            .filter(|s| supervisor.circles.contains(&s.circle))
            .cloned()
            .collect()
    }
}
