use std::cmp::Ordering;

use crate::models::{Achievement, StudentRecord};
use crate::text::fold_for_compare;

/// Cascading filter dimensions, upstream first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Week,
    Day,
    CircleTime,
    Teacher,
    Circle,
}

impl Dimension {
    pub const ORDER: [Dimension; 5] = [
        Dimension::Week,
        Dimension::Day,
        Dimension::CircleTime,
        Dimension::Teacher,
        Dimension::Circle,
    ];

    fn position(self) -> usize {
        Self::ORDER.iter().position(|d| *d == self).unwrap_or(0)
    }

    fn value(self, record: &StudentRecord) -> Option<&str> {
        match self {
            Dimension::Week => record.week.as_deref(),
            Dimension::Day => record.day.as_deref(),
            Dimension::CircleTime => Some(record.circle_time.as_str()),
            Dimension::Teacher => Some(record.teacher.as_str()),
            Dimension::Circle => Some(record.circle.as_str()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub search: String,
    pub week: Option<String>,
    pub day: Option<String>,
    pub circle_time: Option<String>,
    pub teacher: Option<String>,
    pub circle: Option<String>,
}

impl FilterState {
    pub fn selection(&self, dimension: Dimension) -> Option<&str> {
        match dimension {
            Dimension::Week => self.week.as_deref(),
            Dimension::Day => self.day.as_deref(),
            Dimension::CircleTime => self.circle_time.as_deref(),
            Dimension::Teacher => self.teacher.as_deref(),
            Dimension::Circle => self.circle.as_deref(),
        }
    }

    fn slot(&mut self, dimension: Dimension) -> &mut Option<String> {
        match dimension {
            Dimension::Week => &mut self.week,
            Dimension::Day => &mut self.day,
            Dimension::CircleTime => &mut self.circle_time,
            Dimension::Teacher => &mut self.teacher,
            Dimension::Circle => &mut self.circle,
        }
    }

    /// Sets a selection, then drops any downstream selection it invalidates.
    /// Selecting nothing clears the dimension and everything downstream.
    pub fn select(&mut self, dimension: Dimension, value: Option<String>, records: &[StudentRecord]) {
        match value.filter(|v| !v.is_empty()) {
            Some(value) => *self.slot(dimension) = Some(value),
            None => self.clear(dimension),
        }
        self.reconcile(records);
    }

    /// Clears `dimension` and everything downstream of it.
    pub fn clear(&mut self, dimension: Dimension) {
        for d in &Dimension::ORDER[dimension.position()..] {
            *self.slot(*d) = None;
        }
    }

    /// Drops selections that no longer appear in their option list.
    pub fn reconcile(&mut self, records: &[StudentRecord]) {
        for dimension in Dimension::ORDER {
            let Some(selected) = self.selection(dimension).map(str::to_string) else {
                continue;
            };
            if !self.options(dimension, records).contains(&selected) {
                *self.slot(dimension) = None;
            }
        }
    }

    fn matches_upto(&self, record: &StudentRecord, end: usize) -> bool {
        Dimension::ORDER[..end].iter().all(|d| match self.selection(*d) {
            Some(selected) => d.value(record) == Some(selected),
            None => true,
        })
    }

    fn matches_search(&self, record: &StudentRecord) -> bool {
        let needle = fold_for_compare(&self.search);
        needle.is_empty()
            || fold_for_compare(&record.name).contains(&needle)
            || fold_for_compare(&record.circle).contains(&needle)
    }

    /// Distinct values for `dimension` among records passing every upstream
    /// filter, in locale order.
    pub fn options(&self, dimension: Dimension, records: &[StudentRecord]) -> Vec<String> {
        let end = dimension.position();
        let mut values: Vec<String> = Vec::new();
        for record in records.iter().filter(|r| self.matches_upto(r, end)) {
            if let Some(value) = dimension.value(record).filter(|v| !v.is_empty()) {
                if !values.iter().any(|v| v == value) {
                    values.push(value.to_string());
                }
            }
        }
        values.sort_by(|a, b| locale_compare(a, b));
        values
    }

    pub fn apply(&self, records: &[StudentRecord]) -> Vec<StudentRecord> {
        records
            .iter()
            .filter(|r| self.matches_upto(r, Dimension::ORDER.len()) && self.matches_search(r))
            .cloned()
            .collect()
    }
}

/// Case- and diacritic-insensitive ordering, raw text breaking ties.
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    fold_for_compare(a)
        .cmp(&fold_for_compare(b))
        .then_with(|| a.cmp(b))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Name,
    Username,
    Circle,
    CircleTime,
    Teacher,
    Program,
    Memorization,
    Review,
    Consolidation,
    Attendance,
    TotalPoints,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

enum SortValue<'a> {
    Progress(&'a Achievement),
    Number(f64),
    Text(&'a str),
}

impl SortField {
    fn value(self, record: &StudentRecord) -> SortValue<'_> {
        match self {
            SortField::Name => SortValue::Text(&record.name),
            SortField::Username => SortValue::Text(&record.username),
            SortField::Circle => SortValue::Text(&record.circle),
            SortField::CircleTime => SortValue::Text(&record.circle_time),
            SortField::Teacher => SortValue::Text(&record.teacher),
            SortField::Program => SortValue::Text(&record.program),
            SortField::Memorization => SortValue::Progress(&record.memorization),
            SortField::Review => SortValue::Progress(&record.review),
            SortField::Consolidation => SortValue::Progress(&record.consolidation),
            SortField::Attendance => SortValue::Number(record.attendance),
            SortField::TotalPoints => SortValue::Number(record.total_points),
        }
    }
}

pub fn compare_records(a: &StudentRecord, b: &StudentRecord, field: SortField) -> Ordering {
    match (field.value(a), field.value(b)) {
        (SortValue::Progress(x), SortValue::Progress(y)) => {
            x.index.partial_cmp(&y.index).unwrap_or(Ordering::Equal)
        }
        (SortValue::Number(x), SortValue::Number(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (SortValue::Text(x), SortValue::Text(y)) => locale_compare(x, y),
        _ => Ordering::Equal,
    }
}

/// Order among equal keys is whatever the sort leaves; callers must not
/// rely on it.
pub fn sort_records(records: &mut [StudentRecord], field: SortField, direction: SortDirection) {
    records.sort_by(|a, b| {
        let ordering = compare_records(a, b, field);
        match direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate_by_circle;
    use crate::config::Config;

    fn student(username: &str, week: &str, time: &str, teacher: &str, circle: &str) -> StudentRecord {
        StudentRecord {
            username: username.to_string(),
            name: format!("طالب {username}"),
            circle: circle.to_string(),
            circle_time: time.to_string(),
            teacher: teacher.to_string(),
            program: String::new(),
            memorization: Achievement::new(username.len() as f64, 4.0),
            review: Achievement::zero(),
            consolidation: Achievement::zero(),
            memorization_lessons: String::new(),
            review_lessons: String::new(),
            attendance: 0.5,
            total_points: username.parse().unwrap_or(0.0),
            guardian_mobile: String::new(),
            week: Some(week.to_string()),
            day: None,
            has_multiple_entries: false,
        }
    }

    fn fixture() -> Vec<StudentRecord> {
        vec![
            student("1", "w1", "عصر", "أحمد", "الفجر"),
            student("2", "w1", "عصر", "خالد", "النور"),
            student("3", "w1", "مغرب", "خالد", "الهدى"),
            student("4", "w2", "عصر", "أحمد", "الإيمان"),
        ]
    }

    #[test]
    fn teacher_selection_narrows_circle_options() {
        let records = fixture();
        let mut filters = FilterState::default();
        filters.select(Dimension::Teacher, Some("خالد".to_string()), &records);
        let mut expected = vec!["النور".to_string(), "الهدى".to_string()];
        expected.sort_by(|a, b| locale_compare(a, b));
        assert_eq!(filters.options(Dimension::Circle, &records), expected);
    }

    #[test]
    fn clearing_teacher_restores_circles_within_week() {
        let records = fixture();
        let mut filters = FilterState::default();
        filters.select(Dimension::Week, Some("w1".to_string()), &records);
        filters.select(Dimension::Teacher, Some("أحمد".to_string()), &records);
        assert_eq!(filters.options(Dimension::Circle, &records), vec!["الفجر"]);

        filters.clear(Dimension::Teacher);
        assert_eq!(filters.options(Dimension::Circle, &records).len(), 3);
        assert!(!filters
            .options(Dimension::Circle, &records)
            .contains(&"الإيمان".to_string()));
    }

    #[test]
    fn clearing_upstream_clears_downstream() {
        let mut filters = FilterState {
            week: Some("w1".to_string()),
            circle_time: Some("عصر".to_string()),
            teacher: Some("أحمد".to_string()),
            circle: Some("الفجر".to_string()),
            ..FilterState::default()
        };
        filters.clear(Dimension::CircleTime);
        assert_eq!(filters.week.as_deref(), Some("w1"));
        assert_eq!(filters.circle_time, None);
        assert_eq!(filters.teacher, None);
        assert_eq!(filters.circle, None);
    }

    #[test]
    fn deselecting_teacher_clears_circle() {
        let records = fixture();
        let mut filters = FilterState::default();
        filters.select(Dimension::Teacher, Some("أحمد".to_string()), &records);
        filters.select(Dimension::Circle, Some("الفجر".to_string()), &records);
        assert_eq!(filters.circle.as_deref(), Some("الفجر"));

        filters.select(Dimension::Teacher, None, &records);
        assert_eq!(filters.teacher, None);
        assert_eq!(filters.circle, None);
    }

    #[test]
    fn reconcile_drops_mismatched_literal_selections() {
        let records = fixture();
        let mut filters = FilterState {
            teacher: Some("خالد".to_string()),
            circle: Some("الفجر".to_string()),
            ..FilterState::default()
        };
        filters.reconcile(&records);
        assert_eq!(filters.teacher.as_deref(), Some("خالد"));
        assert_eq!(filters.circle, None);
        assert_eq!(filters.apply(&records).len(), 2);
    }

    #[test]
    fn invalid_downstream_selection_is_dropped() {
        let records = fixture();
        let mut filters = FilterState::default();
        filters.select(Dimension::Circle, Some("الهدى".to_string()), &records);
        assert_eq!(filters.circle.as_deref(), Some("الهدى"));

        filters.select(Dimension::CircleTime, Some("عصر".to_string()), &records);
        assert_eq!(filters.circle, None);
    }

    #[test]
    fn apply_narrows_by_every_active_filter() {
        let records = fixture();
        let filters = FilterState {
            circle_time: Some("عصر".to_string()),
            teacher: Some("أحمد".to_string()),
            ..FilterState::default()
        };
        let narrowed = filters.apply(&records);
        let usernames: Vec<&str> = narrowed.iter().map(|r| r.username.as_str()).collect();
        assert_eq!(usernames, vec!["1", "4"]);
    }

    #[test]
    fn search_matches_name_or_circle_ignoring_case() {
        let mut records = fixture();
        records[0].name = "Omar Saleh".to_string();
        let filters = FilterState {
            search: "OMAR".to_string(),
            ..FilterState::default()
        };
        assert_eq!(filters.apply(&records).len(), 1);

        let by_circle = FilterState {
            search: "الهدى".to_string(),
            ..FilterState::default()
        };
        assert_eq!(by_circle.apply(&records)[0].username, "3");
    }

    #[test]
    fn filter_then_aggregate_matches_direct_aggregate() {
        let records = fixture();
        let config = Config::default();
        let filters = FilterState {
            week: Some("w1".to_string()),
            ..FilterState::default()
        };
        let via_filter = aggregate_by_circle(&filters.apply(&records), &config);
        let direct = aggregate_by_circle(&records[..3], &config);
        assert_eq!(via_filter, direct);
    }

    #[test]
    fn sorts_by_index_number_and_text() {
        let mut records = fixture();
        records[0].memorization = Achievement::new(1.0, 1.0);
        records[1].memorization = Achievement::new(1.0, 4.0);
        records[2].memorization = Achievement::new(3.0, 4.0);
        records[3].memorization = Achievement::new(20.0, 100.0);

        sort_records(&mut records, SortField::Memorization, SortDirection::Descending);
        let usernames: Vec<&str> = records.iter().map(|r| r.username.as_str()).collect();
        assert_eq!(usernames, vec!["1", "3", "2", "4"]);

        sort_records(&mut records, SortField::TotalPoints, SortDirection::Ascending);
        let usernames: Vec<&str> = records.iter().map(|r| r.username.as_str()).collect();
        assert_eq!(usernames, vec!["1", "2", "3", "4"]);

        assert_eq!(
            compare_records(&records[0], &records[1], SortField::Teacher),
            locale_compare("أحمد", "خالد")
        );
    }

    #[test]
    fn locale_compare_ignores_diacritics() {
        assert!(locale_compare("مُحمد", "محمد").is_ne());
        assert_eq!(fold_for_compare("مُحمد"), fold_for_compare("محمد"));
        assert_eq!(locale_compare("alpha", "Beta"), Ordering::Less);
    }
}
