//! Model endpoint request and response bodies

use serde::{Deserialize, Serialize};

use crate::domain::Label;
use crate::infrastructure::estimator::ModelTypeInfo;
use crate::infrastructure::services::{DEFAULT_MODEL_NAME, DEFAULT_MODEL_TYPE};

/// Query string of `POST /train`
#[derive(Debug, Clone, Deserialize)]
pub struct TrainQuery {
    #[serde(default = "default_model_type")]
    pub model_type: String,
    #[serde(default = "default_model_name")]
    pub model_name: String,
}

fn default_model_type() -> String {
    DEFAULT_MODEL_TYPE.to_string()
}

fn default_model_name() -> String {
    DEFAULT_MODEL_NAME.to_string()
}

/// Query string naming an existing model
#[derive(Debug, Clone, Deserialize)]
pub struct ModelNameQuery {
    pub model_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Predictions in input row order; integral labels stay JSON numbers
#[derive(Debug, Clone, Serialize)]
pub struct PredictResponse {
    pub predictions: Vec<serde_json::Value>,
}

impl PredictResponse {
    pub fn from_labels(labels: &[Label]) -> Self {
        Self {
            predictions: labels.iter().map(Label::to_json).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelTypesResponse {
    pub model_types: Vec<ModelTypeInfo>,
}
