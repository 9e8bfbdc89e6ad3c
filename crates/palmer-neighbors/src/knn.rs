use palmer_core::{Classifier, Matrix, PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};

/// Distance metric for KNN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Euclidean,
    Manhattan,
}

impl DistanceMetric {
    pub fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        match self {
            DistanceMetric::Euclidean => a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f64>()
                .sqrt(),
            DistanceMetric::Manhattan => a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum(),
        }
    }
}

/// K-Nearest Neighbors Classifier.
///
/// Fitting only stores the reference rows. Prediction takes the `k` closest
/// training rows (equal distances resolved by lower training row index) and
/// returns the majority label, lowest label index winning a tied vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnnClassifier {
    pub k: usize,
    pub metric: DistanceMetric,
    x_train: Option<Matrix>,
    y_train: Vec<usize>,
    n_classes: usize,
}

impl KnnClassifier {
    pub fn new(k: usize, metric: DistanceMetric) -> Self {
        KnnClassifier {
            k,
            metric,
            x_train: None,
            y_train: Vec::new(),
            n_classes: 0,
        }
    }

    /// Store the training rows. `n_classes` is one past the largest label.
    ///
    /// Fails when `k` is zero or exceeds the number of training rows.
    pub fn fit(&mut self, x: &Matrix, y: &[usize]) -> PipelineResult<()> {
        if self.k == 0 {
            return Err(PipelineError::invalid_config("neighbor_count", "must be at least 1"));
        }
        if x.is_empty() {
            return Err(PipelineError::empty("cannot fit KNN on zero rows"));
        }
        if x.rows() != y.len() {
            return Err(PipelineError::ShapeMismatch {
                expected: vec![x.rows()],
                got: vec![y.len()],
            });
        }
        if self.k > x.rows() {
            return Err(PipelineError::invalid_config(
                "neighbor_count",
                format!("{} exceeds the {} training rows", self.k, x.rows()),
            ));
        }

        self.n_classes = y.iter().max().map_or(0, |m| m + 1);
        self.x_train = Some(x.clone());
        self.y_train = y.to_vec();
        Ok(())
    }

    fn train(&self) -> PipelineResult<&Matrix> {
        self.x_train.as_ref().ok_or_else(|| PipelineError::NotFitted {
            component: "KnnClassifier".into(),
        })
    }

    /// Training row indices of the `k` nearest neighbors of `query`, closest first.
    pub fn kneighbors(&self, query: &[f64]) -> PipelineResult<Vec<usize>> {
        let x_train = self.train()?;
        if query.len() != x_train.cols() {
            return Err(PipelineError::ShapeMismatch {
                expected: vec![x_train.cols()],
                got: vec![query.len()],
            });
        }

        let mut dists: Vec<(f64, usize)> = x_train
            .row_iter()
            .enumerate()
            .map(|(j, row)| (self.metric.distance(query, row), j))
            .collect();
        dists.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        Ok(dists.iter().take(self.k).map(|&(_, j)| j).collect())
    }

    fn votes(&self, query: &[f64]) -> PipelineResult<Vec<usize>> {
        let mut votes = vec![0usize; self.n_classes];
        for j in self.kneighbors(query)? {
            votes[self.y_train[j]] += 1;
        }
        Ok(votes)
    }
}

/// Index of the largest count, lowest index on ties.
fn argmax(votes: &[usize]) -> usize {
    let mut best = 0;
    for (i, &v) in votes.iter().enumerate() {
        if v > votes[best] {
            best = i;
        }
    }
    best
}

impl Classifier for KnnClassifier {
    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn predict(&self, x: &Matrix) -> PipelineResult<Vec<usize>> {
        x.row_iter().map(|row| Ok(argmax(&self.votes(row)?))).collect()
    }

    /// Fraction of the `k` neighbors voting for each class.
    fn predict_proba(&self, x: &Matrix) -> PipelineResult<Vec<Vec<f64>>> {
        let k = self.k as f64;
        x.row_iter()
            .map(|row| Ok(self.votes(row)?.iter().map(|&v| v as f64 / k).collect()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use palmer_core::ErrorKind;

    fn blobs() -> (Matrix, Vec<usize>) {
        let x = Matrix::from_rows(&[
            vec![0.0, 0.0], vec![0.5, 0.5], vec![1.0, 1.0],
            vec![5.0, 5.0], vec![5.5, 5.5], vec![6.0, 6.0],
        ])
        .unwrap();
        (x, vec![0, 0, 0, 1, 1, 1])
    }

    #[test]
    fn test_knn_classifier() {
        let (x, y) = blobs();
        let mut knn = KnnClassifier::new(3, DistanceMetric::Euclidean);
        knn.fit(&x, &y).unwrap();
        assert_eq!(knn.predict(&x).unwrap(), y);
        assert_eq!(knn.n_classes(), 2);
    }

    #[test]
    fn test_predict_proba() {
        let (x, y) = blobs();
        let mut knn = KnnClassifier::new(5, DistanceMetric::Manhattan);
        knn.fit(&x, &y).unwrap();
        let query = Matrix::from_rows(&[vec![0.2, 0.2]]).unwrap();
        let proba = knn.predict_proba(&query).unwrap();
        assert_abs_diff_eq!(proba[0][0], 0.6, epsilon = 1e-12);
        assert_abs_diff_eq!(proba[0][1], 0.4, epsilon = 1e-12);
        assert_eq!(knn.predict(&query).unwrap(), vec![0]);
    }

    #[test]
    fn test_ties_prefer_lowest_label() {
        let x = Matrix::from_rows(&[vec![-1.0], vec![1.0]]).unwrap();
        let mut knn = KnnClassifier::new(2, DistanceMetric::Euclidean);
        knn.fit(&x, &[1, 0]).unwrap();
        let query = Matrix::from_rows(&[vec![0.0]]).unwrap();
        assert_eq!(knn.predict(&query).unwrap(), vec![0]);
        assert_eq!(knn.kneighbors(&[0.0]).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_k_larger_than_training_set() {
        let x = Matrix::from_rows(&[vec![0.0], vec![1.0]]).unwrap();
        let mut knn = KnnClassifier::new(5, DistanceMetric::Euclidean);
        let err = knn.fit(&x, &[0, 1]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_zero_k_and_empty() {
        let (x, y) = blobs();
        assert_eq!(KnnClassifier::new(0, DistanceMetric::Euclidean).fit(&x, &y).unwrap_err().kind(), ErrorKind::Config);
        let empty = Matrix::zeros(0, 2);
        assert_eq!(KnnClassifier::new(1, DistanceMetric::Euclidean).fit(&empty, &[]).unwrap_err().kind(), ErrorKind::Data);
    }

    #[test]
    fn test_predict_unfitted() {
        let knn = KnnClassifier::new(1, DistanceMetric::Euclidean);
        assert!(knn.predict(&Matrix::zeros(1, 2)).is_err());
    }
}
