use palmer_core::{Classifier, FeaturizedDataset, Matrix, PipelineResult};
use palmer_io::{load_artifact, read_featurized, save_artifact};
use palmer_metrics::accuracy;
use palmer_neighbors::KnnClassifier;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::config::{PipelineConfig, TrainParams};

pub const MODEL_KIND: &str = "knn-model";

/// A fitted classifier together with the feature schema it was trained on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub feature_names: Vec<String>,
    pub target: String,
    pub knn: KnnClassifier,
}

impl TrainedModel {
    /// Fails with a schema mismatch unless `dataset` has the training feature columns.
    pub fn check_schema(&self, dataset: &FeaturizedDataset) -> PipelineResult<()> {
        dataset.check_features(&self.feature_names)
    }

    /// Accuracy of the model on a featurized dataset.
    pub fn score(&self, dataset: &FeaturizedDataset) -> PipelineResult<f64> {
        self.check_schema(dataset)?;
        accuracy(dataset.labels(), &self.predict(dataset.features())?)
    }
}

impl Classifier for TrainedModel {
    fn n_classes(&self) -> usize {
        self.knn.n_classes()
    }

    fn predict(&self, x: &Matrix) -> PipelineResult<Vec<usize>> {
        self.knn.predict(x)
    }

    fn predict_proba(&self, x: &Matrix) -> PipelineResult<Vec<Vec<f64>>> {
        self.knn.predict_proba(x)
    }
}

/// Train and test accuracy of a freshly fitted model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainReport {
    pub train_accuracy: f64,
    pub test_accuracy: f64,
}

/// Fit a KNN classifier on the featurized training set.
pub fn train(dataset: &FeaturizedDataset, params: &TrainParams) -> PipelineResult<TrainedModel> {
    let mut knn = KnnClassifier::new(params.neighbor_count, params.metric);
    knn.fit(dataset.features(), dataset.labels())?;
    Ok(TrainedModel {
        feature_names: dataset.feature_names(),
        target: dataset.target().to_string(),
        knn,
    })
}

/// Fit on `train_set` and score on both partitions.
pub fn train_and_score(
    train_set: &FeaturizedDataset,
    test_set: &FeaturizedDataset,
    params: &TrainParams,
) -> PipelineResult<(TrainedModel, TrainReport)> {
    let model = train(train_set, params)?;
    let report = TrainReport {
        train_accuracy: model.score(train_set)?,
        test_accuracy: model.score(test_set)?,
    };
    let train_acc = format!("{:.4}", report.train_accuracy);
    let test_acc = format!("{:.4}", report.test_accuracy);
    info!(
        train_accuracy = %train_acc,
        test_accuracy = %test_acc,
        k = params.neighbor_count,
        "trained model"
    );
    Ok((model, report))
}

/// Read both featurized datasets, fit, score and persist the model.
pub fn run_train(config: &PipelineConfig) -> PipelineResult<TrainReport> {
    let paths = &config.paths;
    let target = &config.featurize.target_column;
    let train_set = read_featurized(&paths.processed_path(&config.evaluate.train_dataset_name), target)?;
    let test_set = read_featurized(&paths.processed_path(&config.evaluate.test_dataset_name), target)?;

    let (model, report) = train_and_score(&train_set, &test_set, &config.train)?;
    save_artifact(&paths.model_path(), MODEL_KIND, &model)?;
    Ok(report)
}

pub fn load_model(path: &Path) -> PipelineResult<TrainedModel> {
    load_artifact(path, MODEL_KIND)
}
