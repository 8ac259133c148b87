//! Model name validation utilities

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum length for model names
pub const MAX_MODEL_NAME_LENGTH: usize = 128;

/// Letters, digits, `_`, `-` and `.`; must start with a letter or digit
static MODEL_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").unwrap());

/// Model name validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ModelNameError {
    /// Model name is empty
    Empty,
    /// Model name exceeds maximum length
    TooLong { length: usize, max: usize },
    /// Model name contains `..`
    PathTraversal { name: String },
    /// Model name contains characters outside the allowed set
    InvalidFormat { name: String },
}

impl fmt::Display for ModelNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Model name cannot be empty"),
            Self::TooLong { length, max } => {
                write!(f, "Model name too long: {} characters (max {})", length, max)
            }
            Self::PathTraversal { name } => {
                write!(f, "Model name '{}' must not contain '..'", name)
            }
            Self::InvalidFormat { name } => {
                write!(
                    f,
                    "Invalid model name '{}': use letters, digits, '_', '-' or '.', starting with a letter or digit",
                    name
                )
            }
        }
    }
}

impl std::error::Error for ModelNameError {}

/// Validate a model name before it is used as part of a storage key
pub fn validate_model_name(name: &str) -> Result<(), ModelNameError> {
    if name.is_empty() {
        return Err(ModelNameError::Empty);
    }

    if name.len() > MAX_MODEL_NAME_LENGTH {
        return Err(ModelNameError::TooLong {
            length: name.len(),
            max: MAX_MODEL_NAME_LENGTH,
        });
    }

    if name.contains("..") {
        return Err(ModelNameError::PathTraversal {
            name: name.to_string(),
        });
    }

    if !MODEL_NAME_PATTERN.is_match(name) {
        return Err(ModelNameError::InvalidFormat {
            name: name.to_string(),
        });
    }

    Ok(())
}
