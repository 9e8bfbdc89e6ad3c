use crate::error::PipelineResult;
use crate::matrix::Matrix;

/// A fitted classifier producing class indices in `[0, n_classes)`.
pub trait Classifier {
    fn n_classes(&self) -> usize;

    /// Predicted class index for each row of `x`.
    fn predict(&self, x: &Matrix) -> PipelineResult<Vec<usize>>;

    /// Per-class probability estimates, one vector of length `n_classes` per row.
    fn predict_proba(&self, x: &Matrix) -> PipelineResult<Vec<Vec<f64>>>;
}
