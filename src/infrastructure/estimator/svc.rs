//! Support vector classifier
//!
//! Kernel SVM trained with simplified SMO (Sequential Minimal Optimization) on
//! standardized features. Two classes use a single machine; more classes use
//! one-vs-rest machines and pick the highest decision score.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::{
    Estimator, EstimatorError, EstimatorParams, FeatureMatrix, Label, TrainingSet,
};

use super::preprocessing::{check_feature_count, ClassIndex, StandardScaler};

/// Beyond this many rows the kernel matrix gets too large to hold in memory
const MAX_KERNEL_MATRIX_SAMPLES: usize = 10_000;

const DEFAULT_MAX_ITER: usize = 1000;
const MAX_PASSES: usize = 5;

/// Kernel function type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Kernel {
    /// K(x, y) = x · y
    Linear,
    /// K(x, y) = exp(-γ ||x - y||²)
    Rbf,
    /// K(x, y) = (γ x · y + r)^d
    Poly,
    /// K(x, y) = tanh(γ x · y + r)
    Sigmoid,
}

impl Kernel {
    fn parse(name: &str) -> Result<Self, EstimatorError> {
        match name.to_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "rbf" => Ok(Self::Rbf),
            "poly" => Ok(Self::Poly),
            "sigmoid" => Ok(Self::Sigmoid),
            other => Err(EstimatorError::invalid_params(format!(
                "kernel must be one of linear, rbf, poly, sigmoid (got '{}')",
                other
            ))),
        }
    }
}

/// Kernel coefficient, resolved against the data at fit time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Gamma {
    /// 1 / (n_features * X.var())
    Scale,
    /// 1 / n_features
    Auto,
    Value(f64),
}

impl Gamma {
    fn resolve(&self, x: &Array2<f64>, n_features: usize) -> f64 {
        let n_features = n_features.max(1) as f64;

        match self {
            Self::Value(value) => *value,
            Self::Auto => 1.0 / n_features,
            Self::Scale => {
                let mean = x.mean().unwrap_or(0.0);
                let var = x.mapv(|v| (v - mean).powi(2)).mean().unwrap_or(0.0);

                if var > 1e-12 {
                    1.0 / (n_features * var)
                } else {
                    1.0
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GammaParam {
    Value(f64),
    Named(String),
}

/// Accepted request parameters
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SvcParams {
    #[serde(rename = "C", default)]
    c: Option<f64>,
    #[serde(default)]
    kernel: Option<String>,
    #[serde(default)]
    gamma: Option<GammaParam>,
    #[serde(default)]
    degree: Option<i64>,
    #[serde(default)]
    coef0: Option<f64>,
    #[serde(default)]
    tol: Option<f64>,
    #[serde(default)]
    max_iter: Option<i64>,
    #[serde(default)]
    random_state: Option<u64>,
}

/// Validated SVC hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvcConfig {
    pub c: f64,
    pub kernel: Kernel,
    pub gamma: Gamma,
    pub degree: u32,
    pub coef0: f64,
    pub tol: f64,
    pub max_iter: usize,
    pub random_state: Option<u64>,
}

impl Default for SvcConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            kernel: Kernel::Rbf,
            gamma: Gamma::Scale,
            degree: 3,
            coef0: 0.0,
            tol: 1e-3,
            max_iter: DEFAULT_MAX_ITER,
            random_state: None,
        }
    }
}

impl SvcConfig {
    pub fn from_params(params: &EstimatorParams) -> Result<Self, EstimatorError> {
        let raw: SvcParams = params.decode()?;
        let mut config = Self::default();

        if let Some(c) = raw.c {
            if !(c.is_finite() && c > 0.0) {
                return Err(EstimatorError::invalid_params("C must be a positive number"));
            }
            config.c = c;
        }

        if let Some(kernel) = raw.kernel {
            config.kernel = Kernel::parse(&kernel)?;
        }

        if let Some(gamma) = raw.gamma {
            config.gamma = match gamma {
                GammaParam::Value(v) if v.is_finite() && v > 0.0 => Gamma::Value(v),
                GammaParam::Value(_) => {
                    return Err(EstimatorError::invalid_params("gamma must be positive"));
                }
                GammaParam::Named(name) => match name.to_lowercase().as_str() {
                    "scale" => Gamma::Scale,
                    "auto" => Gamma::Auto,
                    _ => {
                        return Err(EstimatorError::invalid_params(format!(
                            "gamma must be 'scale', 'auto' or a positive number (got '{}')",
                            name
                        )));
                    }
                },
            };
        }

        if let Some(degree) = raw.degree {
            if !(1..=u32::MAX as i64).contains(&degree) {
                return Err(EstimatorError::invalid_params("degree must be at least 1"));
            }
            config.degree = degree as u32;
        }

        if let Some(coef0) = raw.coef0 {
            if !coef0.is_finite() {
                return Err(EstimatorError::invalid_params("coef0 must be finite"));
            }
            config.coef0 = coef0;
        }

        if let Some(tol) = raw.tol {
            if !(tol.is_finite() && tol > 0.0) {
                return Err(EstimatorError::invalid_params("tol must be positive"));
            }
            config.tol = tol;
        }

        if let Some(max_iter) = raw.max_iter {
            config.max_iter = match max_iter {
                -1 => DEFAULT_MAX_ITER,
                n if n >= 1 => n as usize,
                _ => {
                    return Err(EstimatorError::invalid_params(
                        "max_iter must be at least 1, or -1 for the default",
                    ));
                }
            };
        }

        config.random_state = raw.random_state;
        Ok(config)
    }
}

/// One binary machine: decision(x) = Σ coef_i K(sv_i, x) + bias
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct BinaryMachine {
    support_vectors: Array2<f64>,
    /// alpha_i * y_i
    coefficients: Array1<f64>,
    bias: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FittedSvc {
    scaler: StandardScaler,
    classes: ClassIndex,
    gamma: f64,
    machines: Vec<BinaryMachine>,
}

/// Support vector classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvcClassifier {
    config: SvcConfig,
    fitted: Option<FittedSvc>,
}

impl SvcClassifier {
    pub fn new(config: SvcConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    pub fn from_params(params: &EstimatorParams) -> Result<Self, EstimatorError> {
        Ok(Self::new(SvcConfig::from_params(params)?))
    }

    pub fn config(&self) -> &SvcConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn kernel(&self, gamma: f64, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
        match self.config.kernel {
            Kernel::Linear => a.dot(&b),
            Kernel::Rbf => {
                let diff = &a - &b;
                (-gamma * diff.dot(&diff)).exp()
            }
            Kernel::Poly => (gamma * a.dot(&b) + self.config.coef0).powi(self.config.degree as i32),
            Kernel::Sigmoid => (gamma * a.dot(&b) + self.config.coef0).tanh(),
        }
    }

    /// Gram matrix; upper-triangle rows are computed in parallel
    fn kernel_matrix(&self, gamma: f64, x: &Array2<f64>) -> Array2<f64> {
        let n = x.nrows();

        let upper: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|i| {
                (i..n)
                    .map(|j| self.kernel(gamma, x.row(i), x.row(j)))
                    .collect()
            })
            .collect();

        let mut k = Array2::zeros((n, n));
        for (i, row) in upper.into_iter().enumerate() {
            for (offset, value) in row.into_iter().enumerate() {
                k[[i, i + offset]] = value;
                k[[i + offset, i]] = value;
            }
        }
        k
    }

    /// Train one machine with targets in {-1, +1}
    fn smo_train(
        &self,
        x: &Array2<f64>,
        k: &Array2<f64>,
        y: &Array1<f64>,
        rng: &mut StdRng,
    ) -> BinaryMachine {
        let n = x.nrows();
        let c = self.config.c;
        let tol = self.config.tol;

        let mut alphas: Array1<f64> = Array1::zeros(n);
        let mut bias = 0.0;

        let decision = |alphas: &Array1<f64>, bias: f64, idx: usize| -> f64 {
            (alphas * y).dot(&k.column(idx)) + bias
        };

        let mut passes = 0;
        let mut iterations = 0;

        while n > 1 && passes < MAX_PASSES && iterations < self.config.max_iter {
            let mut changed = 0;

            for i in 0..n {
                let e_i = decision(&alphas, bias, i) - y[i];

                let violates_kkt = (y[i] * e_i < -tol && alphas[i] < c)
                    || (y[i] * e_i > tol && alphas[i] > 0.0);
                if !violates_kkt {
                    continue;
                }

                let j = loop {
                    let j = rng.gen_range(0..n);
                    if j != i {
                        break j;
                    }
                };

                let e_j = decision(&alphas, bias, j) - y[j];
                let (alpha_i_old, alpha_j_old) = (alphas[i], alphas[j]);

                let (low, high) = if y[i] != y[j] {
                    ((alpha_j_old - alpha_i_old).max(0.0), (c + alpha_j_old - alpha_i_old).min(c))
                } else {
                    ((alpha_i_old + alpha_j_old - c).max(0.0), (alpha_i_old + alpha_j_old).min(c))
                };
                if (high - low).abs() < 1e-10 {
                    continue;
                }

                let eta = 2.0 * k[[i, j]] - k[[i, i]] - k[[j, j]];
                if eta >= 0.0 {
                    continue;
                }

                alphas[j] = (alpha_j_old - y[j] * (e_i - e_j) / eta).clamp(low, high);
                if (alphas[j] - alpha_j_old).abs() < 1e-5 {
                    continue;
                }

                alphas[i] = alpha_i_old + y[i] * y[j] * (alpha_j_old - alphas[j]);

                let b1 = bias
                    - e_i
                    - y[i] * (alphas[i] - alpha_i_old) * k[[i, i]]
                    - y[j] * (alphas[j] - alpha_j_old) * k[[i, j]];
                let b2 = bias
                    - e_j
                    - y[i] * (alphas[i] - alpha_i_old) * k[[i, j]]
                    - y[j] * (alphas[j] - alpha_j_old) * k[[j, j]];

                bias = if alphas[i] > 0.0 && alphas[i] < c {
                    b1
                } else if alphas[j] > 0.0 && alphas[j] < c {
                    b2
                } else {
                    (b1 + b2) / 2.0
                };

                changed += 1;
            }

            iterations += 1;
            passes = if changed == 0 { passes + 1 } else { 0 };
        }

        let support: Vec<usize> = (0..n).filter(|&i| alphas[i] > 1e-8).collect();

        BinaryMachine {
            support_vectors: x.select(Axis(0), &support),
            coefficients: support.iter().map(|&i| alphas[i] * y[i]).collect(),
            bias,
        }
    }

    fn score(&self, gamma: f64, machine: &BinaryMachine, sample: ArrayView1<'_, f64>) -> f64 {
        machine
            .support_vectors
            .outer_iter()
            .zip(machine.coefficients.iter())
            .map(|(sv, coef)| coef * self.kernel(gamma, sv, sample))
            .sum::<f64>()
            + machine.bias
    }
}

impl Estimator for SvcClassifier {
    fn fit(&mut self, data: &TrainingSet) -> Result<(), EstimatorError> {
        let rows = data.features().values();
        let n = rows.nrows();

        if n == 0 {
            return Err(EstimatorError::invalid_data("training data has no rows"));
        }
        if n > MAX_KERNEL_MATRIX_SAMPLES {
            return Err(EstimatorError::invalid_data(format!(
                "SVC supports at most {} training rows, got {}",
                MAX_KERNEL_MATRIX_SAMPLES, n
            )));
        }

        let (classes, encoded) = ClassIndex::fit(data.labels());
        if classes.len() < 2 {
            return Err(EstimatorError::invalid_data(
                "SVC needs at least 2 distinct classes in the label column",
            ));
        }

        let scaler = StandardScaler::fit(rows);
        let x = scaler.transform(rows);
        let gamma = self.config.gamma.resolve(&x, scaler.n_features());
        let k = self.kernel_matrix(gamma, &x);

        let mut rng = match self.config.random_state {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        // Binary problems train the second class against the first
        let positives: Vec<usize> = if classes.len() == 2 {
            vec![1]
        } else {
            (0..classes.len()).collect()
        };

        let machines = positives
            .into_iter()
            .map(|positive| {
                let y: Array1<f64> = encoded
                    .iter()
                    .map(|&class| if class == positive { 1.0 } else { -1.0 })
                    .collect();
                self.smo_train(&x, &k, &y, &mut rng)
            })
            .collect();

        self.fitted = Some(FittedSvc {
            scaler,
            classes,
            gamma,
            machines,
        });
        Ok(())
    }

    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<Label>, EstimatorError> {
        let fitted = self.fitted.as_ref().ok_or(EstimatorError::NotFitted)?;
        check_feature_count(fitted.scaler.n_features(), features)?;

        let x = fitted.scaler.transform(features.values());

        (0..x.nrows())
            .into_par_iter()
            .map(|index| {
                let sample = x.row(index);

                let class = if fitted.classes.len() == 2 {
                    let score = self.score(fitted.gamma, &fitted.machines[0], sample);
                    usize::from(score >= 0.0)
                } else {
                    fitted
                        .machines
                        .iter()
                        .map(|machine| self.score(fitted.gamma, machine, sample))
                        .enumerate()
                        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
                        .map(|(index, _)| index)
                        .unwrap_or(0)
                };

                fitted
                    .classes
                    .label(class)
                    .cloned()
                    .ok_or(EstimatorError::NotFitted)
            })
            .collect()
    }
}
