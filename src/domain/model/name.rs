//! Model name value type

use serde::{Deserialize, Serialize};

use super::validation::{validate_model_name, ModelNameError};
use crate::domain::DomainError;

/// Name of a stored model, used verbatim as part of its storage key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModelName(String);

impl ModelName {
    /// Create a new ModelName after validation
    pub fn new(name: impl Into<String>) -> Result<Self, ModelNameError> {
        let name = name.into();
        validate_model_name(&name)?;
        Ok(Self(name))
    }

    /// Parse a name coming from a request, classifying failures as invalid parameters
    pub fn parse(name: &str) -> Result<Self, DomainError> {
        Self::new(name).map_err(|e| DomainError::invalid_params(e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ModelName {
    type Error = ModelNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ModelName> for String {
    fn from(name: ModelName) -> Self {
        name.0
    }
}

impl AsRef<str> for ModelName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ModelName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
