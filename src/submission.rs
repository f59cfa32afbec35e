use serde::Deserialize;
use serde_json::{Map, Value};

/// Flat key-value payload forwarded to the remote write endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub sheet: String,
    pub fields: Vec<(String, String)>,
}

impl Submission {
    pub fn new(sheet: impl Into<String>) -> Self {
        Self {
            sheet: sheet.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("sheet".to_string(), Value::String(self.sheet.clone()));
        for (key, value) in &self.fields {
            map.insert(key.clone(), Value::String(value.clone()));
        }
        Value::Object(map)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationField {
    Circle,
    Teacher,
    Discipline,
    Memorization,
    Review,
    Consolidation,
    Attendance,
    GeneralIndex,
    Overall,
}

impl EvaluationField {
    pub fn default_mapping() -> Vec<(EvaluationField, String)> {
        vec![
            (EvaluationField::Circle, "الحلقة".to_string()),
            (EvaluationField::Teacher, "المعلم".to_string()),
            (EvaluationField::Discipline, "الانضباط".to_string()),
            (EvaluationField::Memorization, "الحفظ".to_string()),
            (EvaluationField::Review, "المراجعة".to_string()),
            (EvaluationField::Consolidation, "التثبيت".to_string()),
            (EvaluationField::Attendance, "الحضور".to_string()),
            (EvaluationField::GeneralIndex, "المؤشر العام".to_string()),
            (EvaluationField::Overall, "التقييم العام".to_string()),
        ]
    }
}

/// A circle evaluation as entered by a supervisor. Scores are fractions.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationForm {
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

impl EvaluationForm {
    fn value(&self, field: EvaluationField) -> String {
        let percent = |v: f64| format!("{:.0}%", v * 100.0);
        match field {
            EvaluationField::Circle => self.circle.clone(),
            EvaluationField::Teacher => self.teacher.clone(),
            EvaluationField::Discipline => percent(self.discipline),
            EvaluationField::Memorization => percent(self.memorization),
            EvaluationField::Review => percent(self.review),
            EvaluationField::Consolidation => percent(self.consolidation),
            EvaluationField::Attendance => percent(self.attendance),
            EvaluationField::GeneralIndex => percent(self.general_index),
            EvaluationField::Overall => percent(self.overall),
        }
    }

    /// Fields are emitted in mapping order, one per configured pair.
    pub fn to_submission(&self, sheet: &str, mapping: &[(EvaluationField, String)]) -> Submission {
        mapping
            .iter()
            .fold(Submission::new(sheet), |submission, (field, key)| {
                submission.field(key.as_str(), self.value(*field))
            })
    }
}
