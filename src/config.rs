use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::submission::EvaluationField;

pub const ENDPOINT_ENV: &str = "HALAQAT_ENDPOINT";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub endpoint: Option<String>,
    pub sheets: SheetNames,
    pub columns: Columns,
    /// Circles whose name contains this are excluded from progress accounting.
    pub marker_circle: String,
    pub excellence_time_slot: String,
    pub refresh_delay_ms: u64,
    pub evaluation_fields: Vec<(EvaluationField, String)>,
    pub exam_pass_mark: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            sheets: SheetNames::default(),
            columns: Columns::default(),
            marker_circle: "التلقين".to_string(),
            excellence_time_slot: "عصر".to_string(),
            refresh_delay_ms: 2000,
            evaluation_fields: EvaluationField::default_mapping(),
            exam_pass_mark: 0.6,
        }
    }
}

impl Config {
    /// Defaults, overlaid by an optional JSON file, then by `HALAQAT_ENDPOINT`.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                serde_json::from_str::<Config>(&raw)
                    .with_context(|| format!("invalid config {}", path.display()))?
            }
            None => Config::default(),
        };

        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            if !endpoint.trim().is_empty() {
                config.endpoint = Some(endpoint);
            }
        }

        Ok(config)
    }

    pub fn refresh_delay(&self) -> Duration {
        Duration::from_millis(self.refresh_delay_ms)
    }

    pub fn is_marker_circle(&self, circle: &str) -> bool {
        !self.marker_circle.is_empty() && circle.contains(self.marker_circle.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SheetNames {
    pub students: String,
    pub evaluations: String,
    pub supervisors: String,
    pub attendance: String,
    pub exams: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            students: "الطلاب".to_string(),
            evaluations: "تقييم الحلقات".to_string(),
            supervisors: "المشرفين".to_string(),
            attendance: "الحضور".to_string(),
            exams: "الاختبارات".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Columns {
    pub student_name: String,
    pub username: String,
    pub circle: String,
    pub circle_time: String,
    pub teacher: String,
    pub program: String,
    pub memorization: String,
    pub review: String,
    pub consolidation: String,
    pub memorization_lessons: String,
    pub review_lessons: String,
    pub attendance: String,
    pub total_points: String,
    pub guardian_mobile: String,
    pub week: String,
    pub day: String,
    pub discipline: String,
    pub general_index: String,
    pub overall: String,
    pub supervisor: String,
    pub password: String,
    pub date: String,
    pub status: String,
    pub exam: String,
    pub score: String,
    pub notes: String,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            student_name: "اسم الطالب".to_string(),
            username: "اسم المستخدم".to_string(),
            circle: "الحلقة".to_string(),
            circle_time: "وقت الحلقة".to_string(),
            teacher: "المعلم".to_string(),
            program: "البرنامج".to_string(),
            memorization: "الحفظ".to_string(),
            review: "المراجعة".to_string(),
            consolidation: "التثبيت".to_string(),
            memorization_lessons: "درس الحفظ".to_string(),
            review_lessons: "درس المراجعة".to_string(),
            attendance: "الحضور".to_string(),
            total_points: "مجموع النقاط".to_string(),
            guardian_mobile: "جوال ولي الأمر".to_string(),
            week: "الأسبوع".to_string(),
            day: "اليوم".to_string(),
            discipline: "الانضباط".to_string(),
            general_index: "المؤشر العام".to_string(),
            overall: "التقييم العام".to_string(),
            supervisor: "المشرف".to_string(),
            password: "كلمة المرور".to_string(),
            date: "التاريخ".to_string(),
            status: "الحالة".to_string(),
            exam: "الاختبار".to_string(),
            score: "الدرجة".to_string(),
            notes: "ملاحظات".to_string(),
        }
    }
}
