//! Model domain - Naming and serialized artifacts

mod artifact;
mod name;
mod validation;

pub use artifact::ModelArtifact;
pub use name::ModelName;
pub use validation::{validate_model_name, ModelNameError, MAX_MODEL_NAME_LENGTH};
