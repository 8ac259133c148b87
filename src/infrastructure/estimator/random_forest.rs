//! Random forest classifier
//!
//! Bagged Gini trees with a random feature subset drawn at every split.
//! Trees are grown in parallel, each from its own seed, so a fixed
//! `random_state` gives the same forest on any thread count. Predictions are
//! a majority vote across trees.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{
    Estimator, EstimatorError, EstimatorParams, FeatureMatrix, Label, TrainingSet,
};

use super::preprocessing::{check_feature_count, ClassIndex};
use super::tree::{DecisionTree, TreeLimits};

/// Strategy for the number of features considered per split
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    Sqrt,
    Log2,
    Count(usize),
    Fraction(f64),
    All,
}

impl MaxFeatures {
    fn resolve(&self, n_features: usize) -> usize {
        let n = n_features as f64;
        let resolved = match self {
            Self::Sqrt => n.sqrt().floor() as usize,
            Self::Log2 => n.log2().floor() as usize,
            Self::Count(count) => *count,
            Self::Fraction(fraction) => (n * fraction).floor() as usize,
            Self::All => n_features,
        };
        resolved.clamp(1, n_features.max(1))
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MaxFeaturesParam {
    Count(u64),
    Fraction(f64),
    Named(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ForestParams {
    #[serde(default)]
    n_estimators: Option<i64>,
    #[serde(default)]
    max_depth: Option<i64>,
    #[serde(default)]
    min_samples_split: Option<i64>,
    #[serde(default)]
    min_samples_leaf: Option<i64>,
    #[serde(default)]
    max_features: Option<MaxFeaturesParam>,
    #[serde(default)]
    bootstrap: Option<bool>,
    #[serde(default)]
    random_state: Option<u64>,
}

/// Validated forest hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub random_state: Option<u64>,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            random_state: None,
        }
    }
}

fn at_least(name: &str, value: i64, min: i64) -> Result<usize, EstimatorError> {
    if value < min {
        return Err(EstimatorError::invalid_params(format!(
            "{} must be at least {}",
            name, min
        )));
    }
    Ok(value as usize)
}

impl ForestConfig {
    pub fn from_params(params: &EstimatorParams) -> Result<Self, EstimatorError> {
        let raw: ForestParams = params.decode()?;
        let mut config = Self::default();

        if let Some(n) = raw.n_estimators {
            config.n_estimators = at_least("n_estimators", n, 1)?;
        }
        if let Some(depth) = raw.max_depth {
            config.max_depth = Some(at_least("max_depth", depth, 1)?);
        }
        if let Some(split) = raw.min_samples_split {
            config.min_samples_split = at_least("min_samples_split", split, 2)?;
        }
        if let Some(leaf) = raw.min_samples_leaf {
            config.min_samples_leaf = at_least("min_samples_leaf", leaf, 1)?;
        }

        config.max_features = match raw.max_features {
            // An explicit null means every feature
            None if matches!(params.get("max_features"), Some(Value::Null)) => MaxFeatures::All,
            None => MaxFeatures::Sqrt,
            Some(MaxFeaturesParam::Count(0)) => {
                return Err(EstimatorError::invalid_params("max_features must be at least 1"));
            }
            Some(MaxFeaturesParam::Count(count)) => MaxFeatures::Count(count as usize),
            Some(MaxFeaturesParam::Fraction(f)) if f > 0.0 && f <= 1.0 => MaxFeatures::Fraction(f),
            Some(MaxFeaturesParam::Fraction(_)) => {
                return Err(EstimatorError::invalid_params(
                    "max_features as a fraction must be in (0, 1]",
                ));
            }
            Some(MaxFeaturesParam::Named(name)) => match name.to_lowercase().as_str() {
                "sqrt" => MaxFeatures::Sqrt,
                "log2" => MaxFeatures::Log2,
                _ => {
                    return Err(EstimatorError::invalid_params(format!(
                        "max_features must be 'sqrt', 'log2', a count, a fraction or null (got '{}')",
                        name
                    )));
                }
            },
        };

        if let Some(bootstrap) = raw.bootstrap {
            config.bootstrap = bootstrap;
        }
        config.random_state = raw.random_state;

        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FittedForest {
    classes: ClassIndex,
    n_features: usize,
    trees: Vec<DecisionTree>,
}

/// Random forest classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    config: ForestConfig,
    fitted: Option<FittedForest>,
}

impl RandomForestClassifier {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    pub fn from_params(params: &EstimatorParams) -> Result<Self, EstimatorError> {
        Ok(Self::new(ForestConfig::from_params(params)?))
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    pub fn n_trees(&self) -> usize {
        self.fitted.as_ref().map(|f| f.trees.len()).unwrap_or(0)
    }
}

impl Estimator for RandomForestClassifier {
    fn fit(&mut self, data: &TrainingSet) -> Result<(), EstimatorError> {
        let x = data.features().values();
        let n_samples = x.nrows();
        if n_samples == 0 {
            return Err(EstimatorError::invalid_data("training data has no rows"));
        }

        let n_features = data.features().n_features();
        let (classes, y) = ClassIndex::fit(data.labels());

        let limits = TreeLimits {
            max_depth: self.config.max_depth,
            min_samples_split: self.config.min_samples_split,
            min_samples_leaf: self.config.min_samples_leaf,
            max_features: self.config.max_features.resolve(n_features),
        };

        let base_seed = self.config.random_state.unwrap_or_else(rand::random);

        let trees = (0..self.config.n_estimators)
            .into_par_iter()
            .map(|tree_index| {
                let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(tree_index as u64));

                let indices: Vec<usize> = if self.config.bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };

                DecisionTree::grow(x, &y, classes.len(), &indices, &limits, &mut rng)
            })
            .collect();

        self.fitted = Some(FittedForest {
            classes,
            n_features,
            trees,
        });
        Ok(())
    }

    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<Label>, EstimatorError> {
        let fitted = self.fitted.as_ref().ok_or(EstimatorError::NotFitted)?;
        check_feature_count(fitted.n_features, features)?;

        (0..features.n_rows())
            .into_par_iter()
            .map(|index| {
                let row = features.row(index);
                let mut votes = vec![0usize; fitted.classes.len()];
                for tree in &fitted.trees {
                    votes[tree.predict_row(row)] += 1;
                }

                let winner = votes
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))
                    .map(|(class, _)| class)
                    .unwrap_or(0);

                fitted
                    .classes
                    .label(winner)
                    .cloned()
                    .ok_or(EstimatorError::NotFitted)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> TrainingSet {
        let rows = vec![
            vec![1.0, 1.0],
            vec![1.2, 0.8],
            vec![0.9, 1.1],
            vec![6.0, 6.0],
            vec![6.2, 5.9],
            vec![5.8, 6.1],
        ];
        let labels = ["low", "low", "low", "high", "high", "high"]
            .iter()
            .map(|s| Label::Text(s.to_string()))
            .collect();
        TrainingSet::new(FeatureMatrix::from_rows(rows).unwrap(), labels).unwrap()
    }

    fn seeded(n_estimators: i64) -> RandomForestClassifier {
        let params = EstimatorParams::new()
            .with("n_estimators", n_estimators)
            .with("random_state", 42);
        RandomForestClassifier::from_params(&params).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = ForestConfig::from_params(&EstimatorParams::new()).unwrap();
        assert_eq!(config, ForestConfig::default());
    }

    #[test]
    fn test_max_features_variants() {
        let parse = |raw: &str| {
            ForestConfig::from_params(&EstimatorParams::from_json(raw).unwrap())
                .map(|c| c.max_features)
        };

        assert_eq!(parse(r#"{"max_features": "log2"}"#).unwrap(), MaxFeatures::Log2);
        assert_eq!(parse(r#"{"max_features": 3}"#).unwrap(), MaxFeatures::Count(3));
        assert_eq!(parse(r#"{"max_features": 0.5}"#).unwrap(), MaxFeatures::Fraction(0.5));
        assert_eq!(parse(r#"{"max_features": null}"#).unwrap(), MaxFeatures::All);
        assert!(parse(r#"{"max_features": 1.5}"#).is_err());
        assert!(parse(r#"{"max_features": "half"}"#).is_err());
    }

    #[test]
    fn test_invalid_params_rejected() {
        for raw in [
            r#"{"n_estimators": 0}"#,
            r#"{"min_samples_split": 1}"#,
            r#"{"max_depth": 0}"#,
            r#"{"bootstrap": "yes"}"#,
            r#"{"C": 1.0}"#,
        ] {
            let params = EstimatorParams::from_json(raw).unwrap();
            assert!(
                ForestConfig::from_params(&params).is_err(),
                "{} should be rejected",
                raw
            );
        }
    }

    #[test]
    fn test_resolve_max_features() {
        assert_eq!(MaxFeatures::Sqrt.resolve(16), 4);
        assert_eq!(MaxFeatures::Log2.resolve(8), 3);
        assert_eq!(MaxFeatures::Count(10).resolve(4), 4);
        assert_eq!(MaxFeatures::Fraction(0.1).resolve(4), 1);
        assert_eq!(MaxFeatures::All.resolve(5), 5);
    }

    #[test]
    fn test_fit_predict() {
        let mut forest = seeded(25);
        let data = data();
        forest.fit(&data).unwrap();

        assert_eq!(forest.n_trees(), 25);

        let queries = FeatureMatrix::from_rows(vec![vec![1.0, 0.9], vec![6.1, 6.0]]).unwrap();
        let predictions = forest.predict(&queries).unwrap();
        assert_eq!(
            predictions,
            vec![Label::Text("low".into()), Label::Text("high".into())]
        );
    }

    #[test]
    fn test_same_seed_same_forest() {
        let mut a = seeded(5);
        let mut b = seeded(5);
        a.fit(&data()).unwrap();
        b.fit(&data()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_single_class_accepted() {
        let mut forest = seeded(3);
        let data = TrainingSet::new(
            FeatureMatrix::from_rows(vec![vec![1.0], vec![2.0]]).unwrap(),
            vec![Label::Int(4), Label::Int(4)],
        )
        .unwrap();
        forest.fit(&data).unwrap();

        let predictions = forest.predict(data.features()).unwrap();
        assert_eq!(predictions, vec![Label::Int(4), Label::Int(4)]);
    }

    #[test]
    fn test_predict_before_fit() {
        let forest = seeded(3);
        let queries = FeatureMatrix::from_rows(vec![vec![1.0]]).unwrap();
        assert_eq!(forest.predict(&queries), Err(EstimatorError::NotFitted));
    }
}
