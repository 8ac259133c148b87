//! Dataset domain - Tables, feature matrices and labels

mod label;
mod table;

pub use label::Label;
pub use table::{DataTable, FeatureMatrix, TrainingSet};
