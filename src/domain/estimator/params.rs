//! Estimator hyperparameter documents

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::error::EstimatorError;

/// Key/value hyperparameters supplied with a training request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EstimatorParams(Map<String, Value>);

impl EstimatorParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts a JSON object; `null` is treated as an empty mapping
    pub fn from_value(value: Value) -> Result<Self, EstimatorError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            other => Err(EstimatorError::invalid_params(format!(
                "parameters must be a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Parse a raw JSON document; blank input is an empty mapping
    pub fn from_json(raw: &str) -> Result<Self, EstimatorError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }

        let value: Value = serde_json::from_str(raw)
            .map_err(|e| EstimatorError::invalid_params(format!("malformed JSON: {}", e)))?;
        Self::from_value(value)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Deserialize into a typed parameter struct, surfacing unknown keys and
    /// bad values as `InvalidParams`
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, EstimatorError> {
        serde_json::from_value(Value::Object(self.0.clone()))
            .map_err(|e| EstimatorError::invalid_params(e.to_string()))
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Sample {
        #[serde(default)]
        depth: Option<u32>,
    }

    #[test]
    fn test_from_json_blank_is_empty() {
        assert!(EstimatorParams::from_json("  ").unwrap().is_empty());
        assert!(EstimatorParams::from_json("null").unwrap().is_empty());
    }

    #[test]
    fn test_from_json_rejects_non_objects() {
        let err = EstimatorParams::from_json("[1, 2]").unwrap_err();
        assert!(matches!(err, EstimatorError::InvalidParams(_)));
    }

    #[test]
    fn test_decode_rejects_unknown_keys() {
        let params = EstimatorParams::new().with("bogus", 1);
        let result: Result<Sample, _> = params.decode();
        assert!(matches!(result, Err(EstimatorError::InvalidParams(_))));
    }

    #[test]
    fn test_decode_typed_values() {
        let params = EstimatorParams::new().with("depth", 4);
        let sample: Sample = params.decode().unwrap();
        assert_eq!(sample.depth, Some(4));
    }
}
