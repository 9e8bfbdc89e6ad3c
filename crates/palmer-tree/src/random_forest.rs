use palmer_core::{Matrix, PipelineError, PipelineResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::decision_tree::DecisionTreeRegressor;

/// One bagged tree and the feature columns it was trained on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Member {
    tree: DecisionTreeRegressor,
    features: Vec<usize>,
}

/// Random Forest Regressor: bootstrap-sampled trees over random feature
/// subsets, predictions averaged.
///
/// Trees are fit in parallel; each draws from its own generator seeded with
/// `seed + tree index`, so results do not depend on thread scheduling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub max_features_ratio: f64,
    pub seed: u64,
    n_features: usize,
    members: Vec<Member>,
}

impl RandomForestRegressor {
    pub fn new(n_estimators: usize, max_depth: usize, max_features_ratio: f64, seed: u64) -> Self {
        RandomForestRegressor {
            n_estimators,
            max_depth,
            min_samples_split: 2,
            max_features_ratio,
            seed,
            n_features: 0,
            members: Vec::new(),
        }
    }

    pub fn fit(&mut self, x: &Matrix, y: &[f64]) -> PipelineResult<()> {
        if self.n_estimators == 0 {
            return Err(PipelineError::invalid_config("n_estimators", "must be at least 1"));
        }
        if !(self.max_features_ratio > 0.0 && self.max_features_ratio <= 1.0) {
            return Err(PipelineError::invalid_config(
                "max_features_ratio",
                format!("{} is outside (0, 1]", self.max_features_ratio),
            ));
        }
        if x.rows() != y.len() {
            return Err(PipelineError::ShapeMismatch {
                expected: vec![x.rows()],
                got: vec![y.len()],
            });
        }
        if y.is_empty() || x.cols() == 0 {
            return Err(PipelineError::empty("cannot fit a forest without rows and features"));
        }

        let n = x.rows();
        let p = x.cols();
        let max_features = ((p as f64 * self.max_features_ratio).ceil() as usize).clamp(1, p);

        self.members = (0..self.n_estimators)
            .into_par_iter()
            .map(|t| -> PipelineResult<Member> {
                let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(t as u64));

                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                let mut features: Vec<usize> = (0..p).collect();
                features.shuffle(&mut rng);
                features.truncate(max_features);
                features.sort_unstable();

                let x_sub = x.select_rows(&sample)?.select_cols(&features)?;
                let y_sub: Vec<f64> = sample.iter().map(|&i| y[i]).collect();

                let mut tree = DecisionTreeRegressor::new(self.max_depth, self.min_samples_split, 1);
                tree.fit(&x_sub, &y_sub)?;
                Ok(Member { tree, features })
            })
            .collect::<PipelineResult<Vec<_>>>()?;
        self.n_features = p;

        Ok(())
    }

    pub fn predict(&self, x: &Matrix) -> PipelineResult<Vec<f64>> {
        if self.members.is_empty() {
            return Err(PipelineError::NotFitted {
                component: "RandomForestRegressor".into(),
            });
        }
        if x.cols() != self.n_features {
            return Err(PipelineError::ShapeMismatch {
                expected: vec![x.rows(), self.n_features],
                got: vec![x.rows(), x.cols()],
            });
        }
        let mut buf = Vec::new();
        x.row_iter()
            .map(|row| {
                let mut sum = 0.0;
                for member in &self.members {
                    buf.clear();
                    buf.extend(member.features.iter().map(|&f| row[f]));
                    sum += member.tree.predict_row(&buf)?;
                }
                Ok(sum / self.members.len() as f64)
            })
            .collect()
    }
}
