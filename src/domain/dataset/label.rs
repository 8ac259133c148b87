//! Class labels

use serde::{Deserialize, Serialize};

/// A class label as read from the last column of a training table
///
/// Integral values are kept as integers so predictions round-trip as numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    Int(i64),
    Text(String),
}

impl Label {
    /// Parse a raw cell into a label
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();

        if let Ok(value) = trimmed.parse::<i64>() {
            return Self::Int(value);
        }

        if let Ok(value) = trimmed.parse::<f64>() {
            if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
                return Self::Int(value as i64);
            }
        }

        Self::Text(trimmed.to_string())
    }

    /// JSON representation used in REST responses
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Int(value) => serde_json::Value::from(*value),
            Self::Text(value) => serde_json::Value::from(value.as_str()),
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{}", value),
            Self::Text(value) => write!(f, "{}", value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_integral_labels() {
        assert_eq!(Label::parse("1"), Label::Int(1));
        assert_eq!(Label::parse(" -3 "), Label::Int(-3));
        assert_eq!(Label::parse("2.0"), Label::Int(2));
    }

    #[test]
    fn test_parse_text_labels() {
        assert_eq!(Label::parse("setosa"), Label::Text("setosa".to_string()));
        assert_eq!(Label::parse("0.5"), Label::Text("0.5".to_string()));
    }

    #[test]
    fn test_label_to_json() {
        assert_eq!(Label::Int(7).to_json(), serde_json::json!(7));
        assert_eq!(Label::Text("a".into()).to_json(), serde_json::json!("a"));
    }
}
