use palmer_core::{Classifier, Matrix, PipelineError, PipelineResult};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::classification::accuracy;

/// Accuracy drop caused by shuffling one feature column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance_mean: f64,
    pub importance_std: f64,
    pub importances: Vec<f64>,
}

/// Permutation feature importance.
///
/// For each column, shuffle its values across rows `n_repeats` times,
/// re-score the model and record `baseline - shuffled` accuracy. The random
/// source is injected so runs are reproducible under a seed.
pub fn permutation_importance<C, R>(
    model: &C,
    x: &Matrix,
    y: &[usize],
    feature_names: &[String],
    n_repeats: usize,
    rng: &mut R,
) -> PipelineResult<Vec<FeatureImportance>>
where
    C: Classifier + ?Sized,
    R: Rng + ?Sized,
{
    if n_repeats == 0 {
        return Err(PipelineError::invalid_config("permutation_repeats", "must be at least 1"));
    }
    if feature_names.len() != x.cols() {
        return Err(PipelineError::ShapeMismatch {
            expected: vec![x.cols()],
            got: vec![feature_names.len()],
        });
    }

    let baseline = accuracy(y, &model.predict(x)?)?;
    let mut results = Vec::with_capacity(x.cols());
    let mut shuffled = x.clone();

    for (j, name) in feature_names.iter().enumerate() {
        let original = x.col(j)?;
        let mut column = original.clone();
        let mut importances = Vec::with_capacity(n_repeats);

        for _ in 0..n_repeats {
            column.shuffle(rng);
            shuffled.set_col(j, &column)?;
            importances.push(baseline - accuracy(y, &model.predict(&shuffled)?)?);
        }
        shuffled.set_col(j, &original)?;

        let mean = importances.iter().sum::<f64>() / n_repeats as f64;
        let var = importances.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n_repeats as f64;
        results.push(FeatureImportance {
            feature: name.clone(),
            importance_mean: mean,
            importance_std: var.sqrt(),
            importances,
        });
    }

    Ok(results)
}
