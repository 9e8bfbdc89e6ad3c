use palmer_core::{PipelineError, PipelineResult};
use palmer_neighbors::DistanceMetric;
use palmer_preprocessing::UnknownPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Splitter options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitParams {
    pub train_fraction: f64,
    pub random_seed: u64,
    /// Columns removed before missing-value filtering.
    pub drop_columns: Vec<String>,
}

impl Default for SplitParams {
    fn default() -> Self {
        SplitParams {
            train_fraction: 0.8,
            random_seed: 10,
            drop_columns: vec!["island".into()],
        }
    }
}

/// Featurizer options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturizeParams {
    pub categorical_column: String,
    pub target_column: String,
    pub handle_unknown: UnknownPolicy,
}

impl Default for FeaturizeParams {
    fn default() -> Self {
        FeaturizeParams {
            categorical_column: "species".into(),
            target_column: "sex".into(),
            handle_unknown: UnknownPolicy::Error,
        }
    }
}

/// Trainer hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainParams {
    pub neighbor_count: usize,
    pub metric: DistanceMetric,
}

impl Default for TrainParams {
    fn default() -> Self {
        TrainParams {
            neighbor_count: 5,
            metric: DistanceMetric::Euclidean,
        }
    }
}

/// Evaluator options and featurized dataset names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluateParams {
    pub train_dataset_name: String,
    pub test_dataset_name: String,
    pub permutation_repeats: usize,
}

impl Default for EvaluateParams {
    fn default() -> Self {
        EvaluateParams {
            train_dataset_name: "train_processed.csv".into(),
            test_dataset_name: "test_processed.csv".into(),
            permutation_repeats: 5,
        }
    }
}

/// Options for the fisheries regression model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FisheriesParams {
    pub train_fraction: f64,
    pub random_seed: u64,
    pub n_estimators: usize,
    pub max_depth: usize,
    pub max_features_ratio: f64,
}

impl Default for FisheriesParams {
    fn default() -> Self {
        FisheriesParams {
            train_fraction: 0.8,
            random_seed: 10,
            n_estimators: 100,
            max_depth: 12,
            max_features_ratio: 1.0,
        }
    }
}

/// Where each stage reads and writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathParams {
    pub data_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub artifact_dir: PathBuf,
    pub report_dir: PathBuf,
    pub raw_dataset: String,
}

impl Default for PathParams {
    fn default() -> Self {
        PathParams {
            data_dir: "data".into(),
            processed_dir: PathBuf::from("data").join("processed"),
            artifact_dir: "artifacts".into(),
            report_dir: "eval".into(),
            raw_dataset: "penguins.csv".into(),
        }
    }
}

impl PathParams {
    /// Root every relative directory at `root`.
    pub fn rooted_at(root: &Path) -> Self {
        let d = PathParams::default();
        PathParams {
            data_dir: root.join(d.data_dir),
            processed_dir: root.join(d.processed_dir),
            artifact_dir: root.join(d.artifact_dir),
            report_dir: root.join(d.report_dir),
            raw_dataset: d.raw_dataset,
        }
    }

    pub fn raw_path(&self) -> PathBuf {
        self.data_dir.join(&self.raw_dataset)
    }

    fn raw_stem(&self) -> &str {
        Path::new(&self.raw_dataset)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("dataset")
    }

    pub fn train_split_path(&self) -> PathBuf {
        self.processed_dir.join(format!("{}_train.csv", self.raw_stem()))
    }

    pub fn test_split_path(&self) -> PathBuf {
        self.processed_dir.join(format!("{}_test.csv", self.raw_stem()))
    }

    pub fn processed_path(&self, name: &str) -> PathBuf {
        self.processed_dir.join(name)
    }

    pub fn feature_encoder_path(&self) -> PathBuf {
        self.artifact_dir.join("feature_encoder.json")
    }

    pub fn label_encoder_path(&self) -> PathBuf {
        self.artifact_dir.join("label_encoder.json")
    }

    pub fn model_path(&self) -> PathBuf {
        self.artifact_dir.join("model.json")
    }
}

/// Full pipeline configuration, one section per stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub split: SplitParams,
    pub featurize: FeaturizeParams,
    pub train: TrainParams,
    pub evaluate: EvaluateParams,
    pub fisheries: FisheriesParams,
    pub paths: PathParams,
}

impl PipelineConfig {
    /// Load a JSON params file. A missing file yields the defaults; absent
    /// keys fall back to their defaults individually.
    pub fn from_file(path: &Path) -> PipelineResult<Self> {
        if !path.exists() {
            info!(path = %path.display(), "params file not found, using defaults");
            return Ok(PipelineConfig::default());
        }
        let text = fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&text)
            .map_err(|e| PipelineError::invalid_config(path.display().to_string(), e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no stage can run with.
    pub fn validate(&self) -> PipelineResult<()> {
        for (name, fraction) in [
            ("split.train_fraction", self.split.train_fraction),
            ("fisheries.train_fraction", self.fisheries.train_fraction),
        ] {
            if !(fraction > 0.0 && fraction < 1.0) {
                return Err(PipelineError::invalid_config(name, format!("{} is outside (0, 1)", fraction)));
            }
        }
        if self.train.neighbor_count == 0 {
            return Err(PipelineError::invalid_config("train.neighbor_count", "must be at least 1"));
        }
        if self.evaluate.permutation_repeats == 0 {
            return Err(PipelineError::invalid_config("evaluate.permutation_repeats", "must be at least 1"));
        }
        if self.fisheries.n_estimators == 0 {
            return Err(PipelineError::invalid_config("fisheries.n_estimators", "must be at least 1"));
        }
        let f = &self.featurize;
        if f.categorical_column.is_empty() || f.target_column.is_empty() {
            return Err(PipelineError::invalid_config("featurize", "column names must not be empty"));
        }
        if f.categorical_column == f.target_column {
            return Err(PipelineError::invalid_config(
                "featurize.categorical_column",
                "must differ from the target column",
            ));
        }
        if self.split.drop_columns.iter().any(|c| *c == f.target_column || *c == f.categorical_column) {
            return Err(PipelineError::invalid_config(
                "split.drop_columns",
                "must not drop the categorical or target column",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palmer_core::ErrorKind;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.split.train_fraction, 0.8);
        assert_eq!(config.split.random_seed, 10);
        assert_eq!(config.train.neighbor_count, 5);
        assert_eq!(config.evaluate.test_dataset_name, "test_processed.csv");
        assert!(config.validate().is_ok());
        assert_eq!(
            config.paths.train_split_path(),
            PathBuf::from("data").join("processed").join("penguins_train.csv")
        );
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        fs::write(&path, r#"{"train": {"neighbor_count": 7, "metric": "manhattan"}}"#).unwrap();
        let config = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(config.train.neighbor_count, 7);
        assert_eq!(config.train.metric, DistanceMetric::Manhattan);
        assert_eq!(config.split, SplitParams::default());
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::from_file(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_invalid_values() {
        let mut config = PipelineConfig::default();
        config.split.train_fraction = 1.0;
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::Config);

        let mut config = PipelineConfig::default();
        config.train.neighbor_count = 0;
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::Config);

        let mut config = PipelineConfig::default();
        config.featurize.categorical_column = "sex".into();
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::Config);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        fs::write(&path, r#"{"split": {"train_fraction": "most"}}"#).unwrap();
        assert_eq!(PipelineConfig::from_file(&path).unwrap_err().kind(), ErrorKind::Config);
    }
}
