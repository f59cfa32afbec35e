use serde_json::Value;

use crate::models::Achievement;

/// Plain text of a cell. Integral floats print without a fractional part.
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if n.is_f64() => f.to_string(),
            _ => n.to_string(),
        },
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Longest numeric prefix of `text` after leading whitespace, like a
/// lenient float reader: "12.5 pages" -> 12.5, "abc" -> None.
pub fn leading_float(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    text[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Any cell as a number; unparseable or missing cells are 0.
pub fn parse_number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0),
        Some(Value::String(s)) => leading_float(s).unwrap_or(0.0),
        _ => 0.0,
    }
}

fn scale_percentage(value: f64) -> f64 {
    // 0.5 could mean 50% or 0.5%; the sheets mix both, values above 1 are
    // taken as whole percentages.
    if value > 1.0 {
        value / 100.0
    } else {
        value
    }
}

/// Fraction in 0..1 from `0.75`, `75`, `"75"` or `"75%"`.
pub fn parse_percentage_like(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n
            .as_f64()
            .filter(|v| v.is_finite())
            .map(scale_percentage)
            .unwrap_or(0.0),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            match trimmed.strip_suffix('%') {
                Some(number) => leading_float(number).map(|v| v / 100.0).unwrap_or(0.0),
                None => leading_float(trimmed).map(scale_percentage).unwrap_or(0.0),
            }
        }
        _ => 0.0,
    }
}

/// `"<achieved>%<required>"`, where `%` only separates the two numbers.
pub fn parse_achievement_pair(value: Option<&Value>) -> Achievement {
    let text = cell_text(value);
    let text = text.trim();
    if text.is_empty() {
        return Achievement::zero();
    }

    let (achieved, required) = match text.split_once('%') {
        Some((left, right)) => (left, right),
        None => (text, ""),
    };
    Achievement::new(
        leading_float(achieved).unwrap_or(0.0),
        leading_float(required).unwrap_or(0.0),
    )
}
