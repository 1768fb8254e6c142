use serde::{Deserialize, Serialize};
use std::fmt;

/// Cell markers read as missing, matching what spreadsheet exports and
/// pandas-style writers emit for nulls.
const MISSING_MARKERS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

/// A single cell of a vehicle table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    #[default]
    Missing,
}

impl FieldValue {
    /// Parse a raw CSV cell
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if MISSING_MARKERS.contains(&trimmed) {
            return FieldValue::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => FieldValue::Number(n),
            _ => FieldValue::Text(raw.to_string()),
        }
    }

    #[inline]
    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }

    /// Numeric view of the cell. Text that parses as a finite number is
    /// coerced; anything else is `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) if n.is_finite() => Some(*n),
            FieldValue::Number(_) => None,
            FieldValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            FieldValue::Missing => None,
        }
    }

    /// Canonical category key. Integral numbers drop their fraction so that
    /// `4`, `4.0` and `"4"` all land in the same category.
    pub fn category_key(&self) -> Option<String> {
        match self {
            FieldValue::Number(n) => Some(format_number(*n)),
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::Missing => None,
        }
    }

    /// Text used when writing the cell back out to CSV
    pub fn to_csv_field(&self) -> String {
        match self {
            FieldValue::Number(n) => format_number(*n),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Missing => String::new(),
        }
    }

    /// Case-insensitive substring match on the cell's text form
    pub fn contains_ignore_case(&self, needle_lower: &str) -> bool {
        match self {
            FieldValue::Missing => false,
            other => other.to_csv_field().to_lowercase().contains(needle_lower),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_csv_field())
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n as f64)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(FieldValue::Missing)
    }
}

/// Render a number without a trailing `.0` when it is integral
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Format with thousands separators and a fixed number of decimals,
/// e.g. `format_thousands(20000.0, 0) == "20,000"`.
pub fn format_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && formatted.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}
