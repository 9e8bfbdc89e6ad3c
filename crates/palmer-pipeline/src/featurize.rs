use palmer_core::{FeaturizedDataset, PipelineError, PipelineResult, Table};
use palmer_io::{load_artifact, read_table, save_artifact, write_featurized};
use palmer_preprocessing::{Encoder, LabelEncoder, OneHotEncoder};
use std::fmt;
use tracing::{debug, info};

use crate::config::{EvaluateParams, FeaturizeParams, PathParams};

pub const FEATURE_ENCODER_KIND: &str = "one-hot-encoder";
pub const LABEL_ENCODER_KIND: &str = "label-encoder";

/// Which partition a table belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    Train,
    Test,
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetKind::Train => write!(f, "train"),
            DatasetKind::Test => write!(f, "test"),
        }
    }
}

/// The feature and label encoders, fit together on the train partition.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedEncoders {
    pub feature: OneHotEncoder,
    pub label: LabelEncoder,
}

/// Fit both encoders on the training partition.
pub fn fit_encoders(train: &Table, params: &FeaturizeParams) -> PipelineResult<FittedEncoders> {
    let mut feature = OneHotEncoder::new(&params.categorical_column, params.handle_unknown);
    feature.fit(train)?;
    let mut label = LabelEncoder::new(&params.target_column);
    label.fit(train)?;
    debug!(
        categories = ?feature.categories(),
        classes = ?label.classes(),
        "fitted encoders"
    );
    Ok(FittedEncoders { feature, label })
}

/// Featurize one partition with already fitted encoders.
///
/// The categorical column is replaced by indicator columns, rows with a
/// missing value are dropped, and the target becomes a class index.
pub fn apply_encoders(
    table: &Table,
    encoders: &FittedEncoders,
    kind: DatasetKind,
) -> PipelineResult<FeaturizedDataset> {
    let encoded = encoders.feature.apply(table)?.drop_missing();
    let labelled = encoders.label.apply(&encoded)?;
    if labelled.is_empty() {
        return Err(PipelineError::empty(format!("{} partition has no complete rows", kind)));
    }
    let dataset = FeaturizedDataset::from_table(&labelled, &encoders.label.column)?;
    debug!(%kind, rows = dataset.len(), features = dataset.features().cols(), "featurized");
    Ok(dataset)
}

/// Fit on `train` once and featurize both partitions with the same encoders.
pub fn featurize(
    train: &Table,
    test: &Table,
    params: &FeaturizeParams,
) -> PipelineResult<(FeaturizedDataset, FeaturizedDataset, FittedEncoders)> {
    let encoders = fit_encoders(train, params)?;
    let train_f = apply_encoders(train, &encoders, DatasetKind::Train)?;
    let test_f = apply_encoders(test, &encoders, DatasetKind::Test)?;
    test_f.check_features(&train_f.feature_names())?;
    Ok((train_f, test_f, encoders))
}

pub fn save_encoders(encoders: &FittedEncoders, paths: &PathParams) -> PipelineResult<()> {
    save_artifact(&paths.feature_encoder_path(), FEATURE_ENCODER_KIND, &encoders.feature)?;
    save_artifact(&paths.label_encoder_path(), LABEL_ENCODER_KIND, &encoders.label)
}

pub fn load_encoders(paths: &PathParams) -> PipelineResult<FittedEncoders> {
    let feature: OneHotEncoder = load_artifact(&paths.feature_encoder_path(), FEATURE_ENCODER_KIND)?;
    let label: LabelEncoder = load_artifact(&paths.label_encoder_path(), LABEL_ENCODER_KIND)?;
    Ok(FittedEncoders {
        feature,
        label: LabelEncoder::from_classes(label.column.clone(), label.classes().to_vec()),
    })
}

/// Row and column counts produced by the featurizer stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeaturizeSummary {
    pub train_rows: usize,
    pub test_rows: usize,
    pub columns: Vec<String>,
}

/// Read both split partitions, featurize them, then write the featurized
/// datasets and the fitted encoders.
pub fn run_featurize(
    params: &FeaturizeParams,
    names: &EvaluateParams,
    paths: &PathParams,
) -> PipelineResult<FeaturizeSummary> {
    let train = read_table(&paths.train_split_path())?;
    let test = read_table(&paths.test_split_path())?;
    let (train_f, test_f, encoders) = featurize(&train, &test, params)?;

    write_featurized(&paths.processed_path(&names.train_dataset_name), &train_f)?;
    write_featurized(&paths.processed_path(&names.test_dataset_name), &test_f)?;
    save_encoders(&encoders, paths)?;

    info!(
        train_rows = train_f.len(),
        test_rows = test_f.len(),
        categories = encoders.feature.categories().len(),
        "featurized datasets"
    );
    Ok(FeaturizeSummary {
        train_rows: train_f.len(),
        test_rows: test_f.len(),
        columns: train_f.columns().to_vec(),
    })
}
