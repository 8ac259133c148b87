//! Gini classification tree used by the random forest

use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Decision tree node; leaves hold a class index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        class: usize,
        n_samples: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeLimits {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Number of candidate features drawn at each split
    pub max_features: usize,
}

/// CART classification tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    root: TreeNode,
}

impl DecisionTree {
    /// Grow a tree on the given row indices (duplicates allowed for bootstrap samples)
    pub fn grow(
        x: &Array2<f64>,
        y: &[usize],
        n_classes: usize,
        indices: &[usize],
        limits: &TreeLimits,
        rng: &mut StdRng,
    ) -> Self {
        let builder = Builder {
            x,
            y,
            n_classes,
            limits,
        };
        Self {
            root: builder.build(indices, 0, rng),
        }
    }

    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> usize {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { class, .. } => return *class,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn depth_of(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + depth_of(left).max(depth_of(right)),
            }
        }
        depth_of(&self.root)
    }
}

struct Builder<'a> {
    x: &'a Array2<f64>,
    y: &'a [usize],
    n_classes: usize,
    limits: &'a TreeLimits,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

impl Builder<'_> {
    fn class_counts(&self, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &i in indices {
            counts[self.y[i]] += 1;
        }
        counts
    }

    fn leaf(&self, counts: &[usize], n_samples: usize) -> TreeNode {
        // Ties go to the lowest class index
        let class = counts
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))
            .map(|(class, _)| class)
            .unwrap_or(0);
        TreeNode::Leaf { class, n_samples }
    }

    fn build(&self, indices: &[usize], depth: usize, rng: &mut StdRng) -> TreeNode {
        let n_samples = indices.len();
        let counts = self.class_counts(indices);
        let is_pure = counts.iter().filter(|&&c| c > 0).count() <= 1;

        let should_stop = is_pure
            || n_samples < self.limits.min_samples_split
            || n_samples < 2 * self.limits.min_samples_leaf
            || self.limits.max_depth.is_some_and(|max| depth >= max);

        if should_stop {
            return self.leaf(&counts, n_samples);
        }

        let Some(split) = self.best_split(indices, gini(&counts, n_samples), rng) else {
            return self.leaf(&counts, n_samples);
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| self.x[[i, split.feature]] <= split.threshold);

        TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(self.build(&left, depth + 1, rng)),
            right: Box::new(self.build(&right, depth + 1, rng)),
        }
    }

    fn best_split(
        &self,
        indices: &[usize],
        parent_impurity: f64,
        rng: &mut StdRng,
    ) -> Option<SplitCandidate> {
        let n_features = self.x.ncols();
        let mut features: Vec<usize> = (0..n_features).collect();
        features.shuffle(rng);
        features.truncate(self.limits.max_features.clamp(1, n_features.max(1)));

        // Ties go to the feature drawn first
        features
            .par_iter()
            .enumerate()
            .filter_map(|(rank, &feature)| {
                self.best_split_on(feature, indices, parent_impurity)
                    .map(|candidate| (rank, candidate))
            })
            .min_by(|(rank_a, a), (rank_b, b)| {
                a.impurity
                    .partial_cmp(&b.impurity)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(rank_a.cmp(rank_b))
            })
            .map(|(_, candidate)| candidate)
    }

    fn best_split_on(
        &self,
        feature: usize,
        indices: &[usize],
        parent_impurity: f64,
    ) -> Option<SplitCandidate> {
        let mut order: Vec<usize> = indices.to_vec();
        order.sort_by(|&a, &b| {
            self.x[[a, feature]]
                .partial_cmp(&self.x[[b, feature]])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let n = indices.len();
        let mut left_counts = vec![0; self.n_classes];
        let mut right_counts = self.class_counts(indices);
        let mut best: Option<SplitCandidate> = None;

        // Sweep thresholds between consecutive distinct values
        for position in 1..n {
            let moved = order[position - 1];
            left_counts[self.y[moved]] += 1;
            right_counts[self.y[moved]] -= 1;

            let low = self.x[[moved, feature]];
            let high = self.x[[order[position], feature]];
            if high <= low {
                continue;
            }

            let (n_left, n_right) = (position, n - position);
            if n_left < self.limits.min_samples_leaf || n_right < self.limits.min_samples_leaf {
                continue;
            }

            let impurity = (n_left as f64 * gini(&left_counts, n_left)
                + n_right as f64 * gini(&right_counts, n_right))
                / n as f64;

            if impurity < parent_impurity - 1e-12
                && best.as_ref().is_none_or(|b| impurity < b.impurity)
            {
                best = Some(SplitCandidate {
                    feature,
                    threshold: (low + high) / 2.0,
                    impurity,
                });
            }
        }

        best
    }
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| (c as f64 / total).powi(2))
        .sum::<f64>()
}
