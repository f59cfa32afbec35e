use std::collections::HashMap;

use serde_json::Value;

use crate::config::{Columns, Config};
use crate::models::{
    AttendanceEntry, AttendanceStatus, EvaluationRecord, ExamRecord, RawRow, StudentRecord,
};
use crate::parse::{parse_achievement_pair, parse_number, parse_percentage_like};
use crate::text::{normalize_cell, normalize_text};

/// Cell lookup by header. Falls back to comparing normalized headers, since
/// sheet headers sometimes carry stray spaces or invisible marks.
pub fn field<'a>(row: &'a RawRow, header: &str) -> Option<&'a Value> {
    row.get(header).or_else(|| {
        let wanted = normalize_text(header);
        row.iter()
            .find(|(key, _)| normalize_text(key) == wanted)
            .map(|(_, value)| value)
    })
}

fn text(row: &RawRow, header: &str) -> String {
    normalize_cell(field(row, header))
}

fn optional_text(row: &RawRow, header: &str) -> Option<String> {
    Some(text(row, header)).filter(|value| !value.is_empty())
}

/// Fold state for student rows: records in first-seen order, an index by
/// username, and the record continuation rows attach to.
#[derive(Debug, Default)]
pub struct StudentAssembly {
    records: Vec<StudentRecord>,
    by_username: HashMap<String, usize>,
    current: Option<usize>,
}

impl StudentAssembly {
    pub fn absorb(mut self, row: &RawRow, config: &Config) -> Self {
        let columns = &config.columns;
        let name = text(row, &columns.student_name);
        let username = text(row, &columns.username);

        if !name.is_empty() && !username.is_empty() {
            let record = build_student(row, name, username, config);
            let slot = self.upsert(record);
            self.current = Some(slot);
            return self;
        }

        if let Some(record) = self.current.and_then(|slot| self.records.get_mut(slot)) {
            let memorization = text(row, &columns.memorization_lessons);
            if !memorization.is_empty() {
                record.memorization_lessons.push_str(", ");
                record.memorization_lessons.push_str(&memorization);
                record.has_multiple_entries = true;
            }
            let review = text(row, &columns.review_lessons);
            if !review.is_empty() {
                record.review_lessons.push_str(", ");
                record.review_lessons.push_str(&review);
                record.has_multiple_entries = true;
            }
        }

        self
    }

    /// A later primary row for the same username replaces the earlier record.
    fn upsert(&mut self, record: StudentRecord) -> usize {
        match self.by_username.get(&record.username) {
            Some(&slot) => {
                self.records[slot] = record;
                slot
            }
            None => {
                let slot = self.records.len();
                self.by_username.insert(record.username.clone(), slot);
                self.records.push(record);
                slot
            }
        }
    }

    pub fn finish(self) -> Vec<StudentRecord> {
        self.records
    }
}

fn build_student(row: &RawRow, name: String, username: String, config: &Config) -> StudentRecord {
    let columns = &config.columns;
    let circle = text(row, &columns.circle);
    let mut memorization = parse_achievement_pair(field(row, &columns.memorization));
    let mut review = parse_achievement_pair(field(row, &columns.review));
    let mut consolidation = parse_achievement_pair(field(row, &columns.consolidation));

    if config.is_marker_circle(&circle) {
        memorization = memorization.zeroed();
        review = review.zeroed();
        consolidation = consolidation.zeroed();
    }

    StudentRecord {
        username,
        name,
        circle,
        circle_time: text(row, &columns.circle_time),
        teacher: text(row, &columns.teacher),
        program: text(row, &columns.program),
        memorization,
        review,
        consolidation,
        memorization_lessons: text(row, &columns.memorization_lessons),
        review_lessons: text(row, &columns.review_lessons),
        attendance: parse_percentage_like(field(row, &columns.attendance)),
        total_points: parse_number(field(row, &columns.total_points)),
        guardian_mobile: text(row, &columns.guardian_mobile),
        week: optional_text(row, &columns.week),
        day: optional_text(row, &columns.day),
        has_multiple_entries: false,
    }
}

pub fn assemble_students(rows: &[RawRow], config: &Config) -> Vec<StudentRecord> {
    rows.iter()
        .fold(StudentAssembly::default(), |assembly, row| {
            assembly.absorb(row, config)
        })
        .finish()
}

pub fn assemble_evaluations(rows: &[RawRow], columns: &Columns) -> Vec<EvaluationRecord> {
    rows.iter()
        .filter_map(|row| {
            let circle = text(row, &columns.circle);
            if circle.is_empty() {
                return None;
            }
            let percent = |header: &str| parse_percentage_like(field(row, header));
            Some(EvaluationRecord {
                circle,
                teacher: text(row, &columns.teacher),
                discipline: percent(&columns.discipline),
                memorization: percent(&columns.memorization),
                review: percent(&columns.review),
                consolidation: percent(&columns.consolidation),
                attendance: percent(&columns.attendance),
                general_index: percent(&columns.general_index),
                overall: percent(&columns.overall),
            })
        })
        .collect()
}

pub fn parse_attendance_status(label: &str) -> AttendanceStatus {
    match normalize_text(label).as_str() {
        "حاضر" | "حضر" | "present" => AttendanceStatus::Present,
        "متأخر" | "تأخر" | "late" => AttendanceStatus::Late,
        "مستأذن" | "معتذر" | "بعذر" | "excused" => AttendanceStatus::Excused,
        "غائب" | "غياب" | "absent" => AttendanceStatus::Absent,
        _ => AttendanceStatus::Unknown,
    }
}

pub fn assemble_attendance(rows: &[RawRow], columns: &Columns) -> Vec<AttendanceEntry> {
    rows.iter()
        .filter_map(|row| {
            let student = text(row, &columns.student_name);
            if student.is_empty() {
                return None;
            }
            Some(AttendanceEntry {
                student,
                circle: text(row, &columns.circle),
                date: text(row, &columns.date),
                week: optional_text(row, &columns.week),
                status: parse_attendance_status(&text(row, &columns.status)),
            })
        })
        .collect()
}

pub fn assemble_exams(rows: &[RawRow], columns: &Columns) -> Vec<ExamRecord> {
    rows.iter()
        .filter_map(|row| {
            let student = text(row, &columns.student_name);
            if student.is_empty() {
                return None;
            }
            Some(ExamRecord {
                student,
                circle: text(row, &columns.circle),
                teacher: text(row, &columns.teacher),
                exam: text(row, &columns.exam),
                score: parse_percentage_like(field(row, &columns.score)),
                notes: text(row, &columns.notes),
            })
        })
        .collect()
}
