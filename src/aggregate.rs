use std::collections::HashMap;

use crate::assemble::field;
use crate::config::Config;
use crate::models::{
    AttendanceEntry, AttendanceStatus, AttendanceSummary, CircleAggregate, ExamRecord,
    ExamSummary, ExcellenceAggregate, GroupSummary, RawRow, StudentRecord, SupervisorRecord,
};
use crate::parse::cell_text;
use crate::text::normalize_cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    Circle,
    Teacher,
    CircleTime,
    Week,
}

impl GroupKey {
    fn of(self, record: &StudentRecord) -> Option<&str> {
        let key = match self {
            GroupKey::Circle => record.circle.as_str(),
            GroupKey::Teacher => record.teacher.as_str(),
            GroupKey::CircleTime => record.circle_time.as_str(),
            GroupKey::Week => record.week.as_deref().unwrap_or(""),
        };
        Some(key).filter(|k| !k.is_empty())
    }
}

/// Groups in first-seen order. Every returned group has at least one member.
fn group_by<'a, T, K>(items: impl IntoIterator<Item = &'a T>, key: K) -> Vec<(String, Vec<&'a T>)>
where
    T: 'a,
    K: Fn(&T) -> Option<&str>,
{
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<&T>)> = Vec::new();

    for item in items {
        let Some(k) = key(item) else { continue };
        match slots.get(k) {
            Some(&slot) => groups[slot].1.push(item),
            None => {
                slots.insert(k.to_string(), groups.len());
                groups.push((k.to_string(), vec![item]));
            }
        }
    }

    groups
}

#[derive(Debug, Default)]
struct Totals {
    count: usize,
    achieved: [f64; 3],
    index: [f64; 3],
    attendance: f64,
    points: f64,
}

impl Totals {
    fn of(members: &[&StudentRecord]) -> Self {
        members.iter().fold(Totals::default(), |mut acc, s| {
            acc.count += 1;
            for (i, a) in [&s.memorization, &s.review, &s.consolidation].into_iter().enumerate() {
                acc.achieved[i] += a.achieved;
                acc.index[i] += a.index;
            }
            acc.attendance += s.attendance;
            acc.points += s.total_points;
            acc
        })
    }

    /// Simple mean of per-student indices, not a ratio of summed pages.
    fn mean_index(&self, i: usize) -> f64 {
        self.index[i] / self.count as f64
    }

    fn mean_attendance(&self) -> f64 {
        self.attendance / self.count as f64
    }
}

fn circle_aggregate(circle: String, members: &[&StudentRecord], config: &Config) -> Option<CircleAggregate> {
    let totals = Totals::of(members);
    if totals.count == 0 {
        return None;
    }

    let mut indices = [totals.mean_index(0), totals.mean_index(1), totals.mean_index(2)];
    if config.is_marker_circle(&circle) {
        indices = [1.0; 3];
    }

    Some(CircleAggregate {
        student_count: totals.count,
        total_memorization: totals.achieved[0],
        total_review: totals.achieved[1],
        total_consolidation: totals.achieved[2],
        avg_memorization_index: indices[0],
        avg_review_index: indices[1],
        avg_consolidation_index: indices[2],
        avg_general_index: indices.iter().sum::<f64>() / 3.0,
        avg_attendance: totals.mean_attendance(),
        total_points: totals.points,
        circle,
    })
}

/// One aggregate per circle, in first-seen order. Callers sort. Students
/// with a blank circle form their own group rather than being dropped.
pub fn aggregate_by_circle(records: &[StudentRecord], config: &Config) -> Vec<CircleAggregate> {
    group_by(records, |r| Some(r.circle.as_str()))
        .into_iter()
        .filter_map(|(circle, members)| circle_aggregate(circle, &members, config))
        .collect()
}

/// Ranked circles of the configured time slot. The marker circle never ranks.
pub fn aggregate_excellence(records: &[StudentRecord], config: &Config) -> Vec<ExcellenceAggregate> {
    let eligible = records.iter().filter(|r| {
        r.circle_time == config.excellence_time_slot && !config.is_marker_circle(&r.circle)
    });

    let mut ranked: Vec<ExcellenceAggregate> = group_by(eligible, |r| Some(r.circle.as_str()))
        .into_iter()
        .filter_map(|(circle, members)| circle_aggregate(circle, &members, config))
        .map(|circle| ExcellenceAggregate {
            excellence_score: (circle.avg_memorization_index + circle.avg_attendance) / 2.0,
            rank: 0,
            circle,
        })
        .collect();

    // sort_by is stable: equal scores keep group order
    ranked.sort_by(|a, b| {
        b.excellence_score
            .partial_cmp(&a.excellence_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    for (position, entry) in ranked.iter_mut().enumerate() {
        entry.rank = position + 1;
    }
    ranked
}

pub fn aggregate_by(records: &[StudentRecord], key: GroupKey) -> Vec<GroupSummary> {
    group_by(records, |r| key.of(r))
        .into_iter()
        .filter_map(|(key, members)| {
            let totals = Totals::of(&members);
            if totals.count == 0 {
                return None;
            }
            Some(GroupSummary {
                key,
                student_count: totals.count,
                avg_memorization_index: totals.mean_index(0),
                avg_review_index: totals.mean_index(1),
                avg_consolidation_index: totals.mean_index(2),
                avg_attendance: totals.mean_attendance(),
                total_points: totals.points,
            })
        })
        .collect()
}

/// One record per supervisor name; circles are distinct, in first-seen order.
pub fn aggregate_supervisors(rows: &[RawRow], config: &Config) -> Vec<SupervisorRecord> {
    let columns = &config.columns;
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut supervisors: Vec<SupervisorRecord> = Vec::new();

    for row in rows {
        let name = normalize_cell(field(row, &columns.supervisor));
        if name.is_empty() {
            continue;
        }
        let slot = *slots.entry(name.clone()).or_insert_with(|| {
            supervisors.push(SupervisorRecord {
                name,
                password: String::new(),
                circles: Vec::new(),
            });
            supervisors.len() - 1
        });
        let supervisor = &mut supervisors[slot];

        if supervisor.password.is_empty() {
            let password = cell_text(field(row, &columns.password));
            supervisor.password = password.trim().to_string();
        }

        let circle = normalize_cell(field(row, &columns.circle));
        if !circle.is_empty() && !supervisor.circles.contains(&circle) {
            supervisor.circles.push(circle);
        }
    }

    supervisors
}

pub fn summarize_attendance(entries: &[AttendanceEntry]) -> Vec<AttendanceSummary> {
    group_by(entries, |e| Some(e.circle.as_str()).filter(|c| !c.is_empty()))
        .into_iter()
        .map(|(circle, members)| {
            let mut summary = AttendanceSummary {
                circle,
                present: 0,
                late: 0,
                excused: 0,
                absent: 0,
                unknown: 0,
                rate: 0.0,
            };
            for entry in members {
                match entry.status {
                    AttendanceStatus::Present => summary.present += 1,
                    AttendanceStatus::Late => summary.late += 1,
                    AttendanceStatus::Excused => summary.excused += 1,
                    AttendanceStatus::Absent => summary.absent += 1,
                    AttendanceStatus::Unknown => summary.unknown += 1,
                }
            }
            let counted = summary.present + summary.late + summary.absent + summary.unknown;
            if counted > 0 {
                summary.rate = (summary.present + summary.late) as f64 / counted as f64;
            }
            summary
        })
        .collect()
}

pub fn summarize_exams(exams: &[ExamRecord], pass_mark: f64) -> Vec<ExamSummary> {
    group_by(exams, |e| Some(e.circle.as_str()).filter(|c| !c.is_empty()))
        .into_iter()
        .map(|(circle, members)| {
            let total: f64 = members.iter().map(|e| e.score).sum();
            ExamSummary {
                circle,
                exam_count: members.len(),
                avg_score: total / members.len() as f64,
                passed: members.iter().filter(|e| e.score >= pass_mark).count(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Achievement;
    use serde_json::json;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn student(username: &str, circle: &str, time: &str, mem: (f64, f64), attendance: f64) -> StudentRecord {
        StudentRecord {
            username: username.to_string(),
            name: format!("student {username}"),
            circle: circle.to_string(),
            circle_time: time.to_string(),
            teacher: "أحمد".to_string(),
            program: String::new(),
            memorization: Achievement::new(mem.0, mem.1),
            review: Achievement::new(1.0, 2.0),
            consolidation: Achievement::new(1.0, 1.0),
            memorization_lessons: String::new(),
            review_lessons: String::new(),
            attendance,
            total_points: 10.0,
            guardian_mobile: String::new(),
            week: None,
            day: None,
            has_multiple_entries: false,
        }
    }

    #[test]
    fn averages_are_means_of_student_indices() {
        let records = vec![
            student("1", "الفجر", "عصر", (5.0, 10.0), 1.0),
            student("2", "الفجر", "عصر", (4.0, 4.0), 0.5),
        ];
        let circles = aggregate_by_circle(&records, &Config::default());
        assert_eq!(circles.len(), 1);
        let c = &circles[0];
        assert_eq!(c.student_count, 2);
        assert!(close(c.avg_memorization_index, 0.75));
        assert!(close(c.total_memorization, 9.0));
        assert!(close(c.avg_review_index, 0.5));
        assert!(close(c.avg_consolidation_index, 1.0));
        assert!(close(c.avg_general_index, 0.75));
        assert!(close(c.avg_attendance, 0.75));
        assert!(close(c.total_points, 20.0));
    }

    #[test]
    fn marker_circle_indices_are_forced_to_full() {
        let mut zeroed = student("1", "حلقة التلقين", "عصر", (0.0, 10.0), 0.4);
        zeroed.review = zeroed.review.zeroed();
        zeroed.consolidation = zeroed.consolidation.zeroed();
        let circles = aggregate_by_circle(&[zeroed], &Config::default());
        let c = &circles[0];
        assert_eq!(c.avg_memorization_index, 1.0);
        assert_eq!(c.avg_review_index, 1.0);
        assert_eq!(c.avg_consolidation_index, 1.0);
        assert_eq!(c.avg_general_index, 1.0);
        assert!(close(c.avg_attendance, 0.4));
        assert_eq!(c.total_memorization, 0.0);
    }

    #[test]
    fn excellence_ranks_by_score_and_skips_marker() {
        let records = vec![
            student("1", "أ", "عصر", (9.0, 10.0), 0.9),
            student("2", "ب", "عصر", (7.0, 10.0), 0.7),
            student("3", "ج", "عصر", (8.0, 10.0), 0.8),
            student("4", "حلقة التلقين", "عصر", (0.0, 10.0), 1.0),
            student("5", "د", "فجر", (10.0, 10.0), 1.0),
        ];
        let ranked = aggregate_excellence(&records, &Config::default());
        let order: Vec<(&str, usize)> = ranked
            .iter()
            .map(|r| (r.circle.circle.as_str(), r.rank))
            .collect();
        assert_eq!(order, vec![("أ", 1), ("ج", 2), ("ب", 3)]);
        assert!(close(ranked[0].excellence_score, 0.9));
        assert!(close(ranked[1].excellence_score, 0.8));
        assert!(close(ranked[2].excellence_score, 0.7));
    }

    #[test]
    fn excellence_ties_keep_group_order() {
        let records = vec![
            student("1", "ب", "عصر", (5.0, 10.0), 0.5),
            student("2", "أ", "عصر", (5.0, 10.0), 0.5),
        ];
        let ranked = aggregate_excellence(&records, &Config::default());
        assert_eq!(ranked[0].circle.circle, "ب");
        assert_eq!(ranked[1].circle.circle, "أ");
    }

    #[test]
    fn blank_circle_students_still_count() {
        let records = vec![
            student("1", "", "عصر", (5.0, 10.0), 1.0),
            student("2", "أ", "عصر", (2.0, 4.0), 0.5),
        ];
        let circles = aggregate_by_circle(&records, &Config::default());
        assert_eq!(circles.len(), 2);
        assert_eq!(circles[0].circle, "");
        assert_eq!(circles[0].student_count, 1);
        assert!(close(circles[0].total_points, 10.0));
        assert!(close(circles[0].avg_memorization_index, 0.5));
    }

    #[test]
    fn group_by_week_skips_untagged_records() {
        let mut tagged = student("1", "أ", "عصر", (1.0, 2.0), 1.0);
        tagged.week = Some("الأسبوع 1".to_string());
        let untagged = student("2", "أ", "عصر", (1.0, 2.0), 1.0);
        let weeks = aggregate_by(&[tagged, untagged], GroupKey::Week);
        assert_eq!(weeks.len(), 1);
        assert_eq!(weeks[0].key, "الأسبوع 1");
        assert_eq!(weeks[0].student_count, 1);

        let teachers = aggregate_by(&[student("3", "ب", "عصر", (1.0, 2.0), 1.0)], GroupKey::Teacher);
        assert_eq!(teachers[0].key, "أحمد");
        assert!(close(teachers[0].avg_memorization_index, 0.5));
    }

    #[test]
    fn supervisors_collapse_into_one_record() {
        let rows: Vec<RawRow> = [
            json!({ "المشرف": "خالد", "كلمة المرور": "", "الحلقة": "أ" }),
            json!({ "المشرف": " خالد ", "كلمة المرور": 1234, "الحلقة": "ب" }),
            json!({ "المشرف": "خالد", "كلمة المرور": "other", "الحلقة": "أ" }),
            json!({ "المشرف": "سعيد", "كلمة المرور": "s", "الحلقة": "ج" }),
            json!({ "المشرف": "", "الحلقة": "د" }),
        ]
        .into_iter()
        .filter_map(|v| v.as_object().cloned())
        .collect();

        let supervisors = aggregate_supervisors(&rows, &Config::default());
        assert_eq!(supervisors.len(), 2);
        assert_eq!(supervisors[0].name, "خالد");
        assert_eq!(supervisors[0].password, "1234");
        assert_eq!(supervisors[0].circles, vec!["أ", "ب"]);
        assert_eq!(supervisors[1].circles, vec!["ج"]);
    }

    #[test]
    fn attendance_rate_excludes_excused() {
        let entry = |status| AttendanceEntry {
            student: "A".to_string(),
            circle: "أ".to_string(),
            date: String::new(),
            week: None,
            status,
        };
        let entries = vec![
            entry(AttendanceStatus::Present),
            entry(AttendanceStatus::Late),
            entry(AttendanceStatus::Excused),
            entry(AttendanceStatus::Absent),
        ];
        let summary = &summarize_attendance(&entries)[0];
        assert_eq!(summary.excused, 1);
        assert!(close(summary.rate, 2.0 / 3.0));

        let only_excused = summarize_attendance(&[entry(AttendanceStatus::Excused)]);
        assert_eq!(only_excused[0].rate, 0.0);
    }

    #[test]
    fn exam_summary_counts_passes() {
        let exam = |score| ExamRecord {
            student: "A".to_string(),
            circle: "أ".to_string(),
            teacher: String::new(),
            exam: "جزء عم".to_string(),
            score,
            notes: String::new(),
        };
        let summaries = summarize_exams(&[exam(0.9), exam(0.5), exam(0.6)], 0.6);
        assert_eq!(summaries[0].exam_count, 3);
        assert_eq!(summaries[0].passed, 2);
        assert!(close(summaries[0].avg_score, 2.0 / 3.0));
    }
}
