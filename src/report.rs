use std::fmt::Write;
use std::io;

use chrono::NaiveDate;

use crate::config::Config;
use crate::filter::{locale_compare, FilterState};
use crate::models::CircleAggregate;
use crate::payload::Dataset;

fn percent(value: f64) -> String {
    format!("{:.0}%", value * 100.0)
}

fn scope_label(filters: &FilterState) -> String {
    let parts: Vec<String> = [
        ("week", filters.week.as_deref()),
        ("day", filters.day.as_deref()),
        ("time", filters.circle_time.as_deref()),
        ("teacher", filters.teacher.as_deref()),
        ("circle", filters.circle.as_deref()),
        ("search", Some(filters.search.as_str()).filter(|s| !s.is_empty())),
    ]
    .into_iter()
    .filter_map(|(label, value)| value.map(|v| format!("{label}: {v}")))
    .collect();

    if parts.is_empty() {
        "all circles".to_string()
    } else {
        parts.join(", ")
    }
}

pub fn sorted_circles(mut circles: Vec<CircleAggregate>) -> Vec<CircleAggregate> {
    circles.sort_by(|a, b| locale_compare(&a.circle, &b.circle));
    circles
}

pub fn build_report(
    dataset: &Dataset,
    filters: &FilterState,
    config: &Config,
    generated_on: NaiveDate,
) -> String {
    let students = filters.apply(&dataset.students);
    let circles = sorted_circles(crate::aggregate::aggregate_by_circle(&students, config));
    let ranked = crate::aggregate::aggregate_excellence(&students, config);

    let mut output = String::new();

    let _ = writeln!(output, "# Circle Progress Report");
    let _ = writeln!(
        output,
        "Generated on {} for {} ({} students)",
        generated_on,
        scope_label(filters),
        students.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Circles");

    if circles.is_empty() {
        let _ = writeln!(output, "No students match these filters.");
    } else {
        let _ = writeln!(
            output,
            "| Circle | Students | Memorization | Review | Consolidation | General | Attendance | Points |"
        );
        let _ = writeln!(output, "|---|---|---|---|---|---|---|---|");
        for circle in circles.iter() {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} | {} | {} | {} | {} |",
                circle.circle,
                circle.student_count,
                percent(circle.avg_memorization_index),
                percent(circle.avg_review_index),
                percent(circle.avg_consolidation_index),
                percent(circle.avg_general_index),
                percent(circle.avg_attendance),
                circle.total_points
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Excellence Ranking ({})", config.excellence_time_slot);

    if ranked.is_empty() {
        let _ = writeln!(output, "No circles eligible for ranking.");
    } else {
        for entry in ranked.iter() {
            let _ = writeln!(
                output,
                "{}. {} score {} (memorization {}, attendance {})",
                entry.rank,
                entry.circle.circle,
                percent(entry.excellence_score),
                percent(entry.circle.avg_memorization_index),
                percent(entry.circle.avg_attendance)
            );
        }
    }

    let attendance = dataset.attendance_summary();
    let _ = writeln!(output);
    let _ = writeln!(output, "## Attendance");

    if attendance.is_empty() {
        let _ = writeln!(output, "No attendance recorded.");
    } else {
        for summary in attendance.iter() {
            let _ = writeln!(
                output,
                "- {}: {} (present {}, late {}, excused {}, absent {})",
                summary.circle,
                percent(summary.rate),
                summary.present,
                summary.late,
                summary.excused,
                summary.absent
            );
        }
    }

    let exams = dataset.exam_summary(config);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Exams");

    if exams.is_empty() {
        let _ = writeln!(output, "No exams recorded.");
    } else {
        for summary in exams.iter() {
            let _ = writeln!(
                output,
                "- {}: {} exams, average {}, {} passed",
                summary.circle,
                summary.exam_count,
                percent(summary.avg_score),
                summary.passed
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Supervisors");

    if dataset.supervisors.is_empty() {
        let _ = writeln!(output, "No supervisors listed.");
    } else {
        for supervisor in dataset.supervisors.iter() {
            let _ = writeln!(output, "- {}: {}", supervisor.name, supervisor.circles.join("، "));
        }
    }

    output
}

pub fn write_circles_csv<W: io::Write>(writer: W, circles: &[CircleAggregate]) -> anyhow::Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for circle in circles {
        csv.serialize(circle)?;
    }
    csv.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::SheetPayload;
    use serde_json::json;

    fn dataset(config: &Config) -> Dataset {
        let payload = SheetPayload::from_value(json!({
            "الطلاب": [
                { "اسم الطالب": "A", "اسم المستخدم": 1, "الحلقة": "النور", "وقت الحلقة": "عصر",
                  "المعلم": "أحمد", "الحفظ": "10%20", "الحضور": 1 },
                { "اسم الطالب": "B", "اسم المستخدم": 2, "الحلقة": "الفجر", "وقت الحلقة": "مغرب",
                  "المعلم": "خالد", "الحفظ": "4%4", "الحضور": 0.5 }
            ],
            "المشرفين": [
                { "المشرف": "سعيد", "كلمة المرور": "x", "الحلقة": "النور" },
                { "المشرف": "سعيد", "الحلقة": "الفجر" }
            ]
        }))
        .expect("payload");
        Dataset::from_payload(&payload, config)
    }

    #[test]
    fn report_lists_circles_and_ranking() {
        let config = Config::default();
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).expect("date");
        let report = build_report(&dataset(&config), &FilterState::default(), &config, date);

        assert!(report.starts_with("# Circle Progress Report"));
        assert!(report.contains("Generated on 2026-10-18 for all circles (2 students)"));
        assert!(report.contains("| النور | 1 | 50% |"));
        assert!(report.contains("1. النور score 75%"));
        assert!(report.contains("No attendance recorded."));
        assert!(report.contains("- سعيد: النور، الفجر"));
    }

    #[test]
    fn report_respects_filters() {
        let config = Config::default();
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).expect("date");
        let filters = FilterState {
            teacher: Some("خالد".to_string()),
            ..FilterState::default()
        };
        let report = build_report(&dataset(&config), &filters, &config, date);
        assert!(report.contains("for teacher: خالد (1 students)"));
        assert!(!report.contains("| النور |"));
        assert!(report.contains("No circles eligible for ranking."));
    }

    #[test]
    fn csv_export_has_header_and_rows() {
        let config = Config::default();
        let circles = sorted_circles(dataset(&config).circles(&config));
        let mut buffer = Vec::new();
        write_circles_csv(&mut buffer, &circles).expect("csv");
        let text = String::from_utf8(buffer).expect("utf8");
        let mut lines = text.lines();
        assert!(lines.next().expect("header").starts_with("circle,student_count,"));
        assert_eq!(lines.count(), 2);
    }
}
