use palmer_core::{Classifier, FeaturizedDataset, PipelineError, PipelineResult};
use palmer_io::read_featurized;
use palmer_metrics::{
    accuracy, confusion_matrix, f1_score_class, permutation_importance, precision_class, recall_class,
    roc_curve, FeatureImportance, RocCurve,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::featurize::load_encoders;
use crate::report::{PlotData, ReportSink};
use crate::trainer::load_model;

/// Precision, recall and F1 of one class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassScore {
    pub class: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Everything computed by one evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub n_rows: usize,
    pub accuracy: f64,
    pub class_scores: Vec<ClassScore>,
    pub confusion_matrix: Vec<Vec<usize>>,
    pub feature_importance: Vec<FeatureImportance>,
    /// Only present for binary models evaluated on both classes.
    pub roc: Option<RocCurve>,
}

/// Score `model` on `dataset`.
///
/// `rng` drives the column shuffles of permutation importance.
pub fn evaluate<C, R>(
    model: &C,
    dataset: &FeaturizedDataset,
    permutation_repeats: usize,
    rng: &mut R,
) -> PipelineResult<Metrics>
where
    C: Classifier + ?Sized,
    R: Rng + ?Sized,
{
    let x = dataset.features();
    let y = dataset.labels();
    let predictions = model.predict(x)?;
    let acc = accuracy(y, &predictions)?;

    let n_classes = y
        .iter()
        .chain(&predictions)
        .max()
        .map_or(0, |m| m + 1)
        .max(model.n_classes());
    let confusion = confusion_matrix(y, &predictions, n_classes)?;
    let class_scores = (0..n_classes)
        .map(|class| ClassScore {
            class,
            precision: precision_class(y, &predictions, class),
            recall: recall_class(y, &predictions, class),
            f1: f1_score_class(y, &predictions, class),
        })
        .collect();

    let feature_importance =
        permutation_importance(model, x, y, &dataset.feature_names(), permutation_repeats, rng)?;

    let roc = if model.n_classes() != 2 {
        warn!(n_classes = model.n_classes(), "ROC curve needs a binary model, skipping");
        None
    } else {
        let scores: Vec<f64> = model.predict_proba(x)?.iter().map(|p| p[1]).collect();
        match roc_curve(y, &scores) {
            Ok(curve) => Some(curve),
            Err(e) => {
                warn!(error = %e, "skipping ROC curve");
                None
            }
        }
    };

    Ok(Metrics {
        n_rows: dataset.len(),
        accuracy: acc,
        class_scores,
        confusion_matrix: confusion,
        feature_importance,
        roc,
    })
}

/// Send metrics and plots to `sink`. `class_names` label the confusion matrix.
pub fn report(metrics: &Metrics, class_names: &[String], sink: &mut dyn ReportSink) -> PipelineResult<()> {
    sink.log_metric("accuracy", metrics.accuracy)?;
    for score in &metrics.class_scores {
        let name = class_names
            .get(score.class)
            .cloned()
            .unwrap_or_else(|| score.class.to_string());
        sink.log_metric(&format!("f1_{}", name), score.f1)?;
    }

    let labels = (0..metrics.confusion_matrix.len())
        .map(|i| class_names.get(i).cloned().unwrap_or_else(|| i.to_string()))
        .collect();
    sink.log_plot(
        "confusion_matrix",
        PlotData::ConfusionMatrix {
            labels,
            matrix: metrics.confusion_matrix.clone(),
        },
    )?;
    sink.log_plot(
        "feature_importance",
        PlotData::FeatureImportance {
            features: metrics.feature_importance.clone(),
        },
    )?;
    if let Some(roc) = &metrics.roc {
        sink.log_metric("roc_auc", roc.auc)?;
        sink.log_plot("roc", PlotData::Roc(roc.clone()))?;
    }
    sink.finish()
}

/// Load the persisted model and the featurized test set, evaluate and report.
pub fn run_evaluate(config: &PipelineConfig, sink: &mut dyn ReportSink) -> PipelineResult<Metrics> {
    let paths = &config.paths;
    let model = load_model(&paths.model_path())?;
    let dataset = read_featurized(
        &paths.processed_path(&config.evaluate.test_dataset_name),
        &config.featurize.target_column,
    )?;
    model.check_schema(&dataset)?;
    let label = load_encoders(paths)?.label;
    if label.n_classes() != model.n_classes() {
        return Err(PipelineError::SchemaMismatch {
            expected: format!("{} label classes", model.n_classes()),
            got: format!("{} in {}", label.n_classes(), paths.label_encoder_path().display()),
        });
    }
    let classes = label.classes().to_vec();

    let mut rng = StdRng::seed_from_u64(config.split.random_seed);
    let metrics = evaluate(&model, &dataset, config.evaluate.permutation_repeats, &mut rng)?;
    report(&metrics, &classes, sink)?;

    let acc = format!("{:.4}", metrics.accuracy);
    info!(accuracy = %acc, rows = metrics.n_rows, roc = metrics.roc.is_some(), "evaluated model");
    Ok(metrics)
}
