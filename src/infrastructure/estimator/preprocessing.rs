//! Feature scaling and label encoding shared by the estimators

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::domain::{EstimatorError, FeatureMatrix, Label};

/// Sorted set of distinct labels seen during fitting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassIndex {
    classes: Vec<Label>,
}

impl ClassIndex {
    /// Build the index and encode every label as its class position
    pub fn fit(labels: &[Label]) -> (Self, Vec<usize>) {
        let mut classes = labels.to_vec();
        classes.sort();
        classes.dedup();

        let encoded = labels
            .iter()
            .map(|label| classes.binary_search(label).unwrap_or(0))
            .collect();

        (Self { classes }, encoded)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn label(&self, index: usize) -> Option<&Label> {
        self.classes.get(index)
    }

    pub fn classes(&self) -> &[Label] {
        &self.classes
    }
}

/// Per-column standardization to zero mean and unit variance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Array1<f64>,
    scales: Array1<f64>,
}

impl StandardScaler {
    pub fn fit(x: &Array2<f64>) -> Self {
        let n_features = x.ncols();
        if x.nrows() == 0 {
            return Self {
                means: Array1::zeros(n_features),
                scales: Array1::ones(n_features),
            };
        }

        let means = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(n_features));

        // Constant columns keep their offset but are not rescaled
        let scales = x
            .std_axis(Axis(0), 0.0)
            .mapv(|std| if std > 1e-6 { std } else { 1.0 });

        Self { means, scales }
    }

    pub fn n_features(&self) -> usize {
        self.means.len()
    }

    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        (x - &self.means) / &self.scales
    }
}

/// Reject inference data whose width differs from the training data
pub fn check_feature_count(expected: usize, features: &FeatureMatrix) -> Result<(), EstimatorError> {
    if features.n_features() != expected {
        return Err(EstimatorError::invalid_data(format!(
            "model was trained on {} features but {} were supplied",
            expected,
            features.n_features()
        )));
    }
    Ok(())
}
