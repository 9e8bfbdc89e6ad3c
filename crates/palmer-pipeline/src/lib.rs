pub mod config;
pub mod splitter;
pub mod featurize;
pub mod trainer;
pub mod evaluate;
pub mod report;
pub mod fisheries;

pub use config::*;
pub use splitter::{run_split, split, SplitSummary};
pub use featurize::{featurize, run_featurize, DatasetKind, FeaturizeSummary, FittedEncoders};
pub use trainer::{run_train, train, TrainReport, TrainedModel};
pub use evaluate::{evaluate, run_evaluate, Metrics};
pub use report::{DirectorySink, MemorySink, PlotData, ReportSink};

use palmer_core::PipelineResult;

/// Outcome of running every stage in order.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub split: SplitSummary,
    pub featurize: FeaturizeSummary,
    pub train: TrainReport,
    pub metrics: Metrics,
}

/// Run split, featurize, train and evaluate in order, each stage reading the
/// files the previous one wrote.
pub fn run_all(config: &PipelineConfig, sink: &mut dyn ReportSink) -> PipelineResult<RunSummary> {
    config.validate()?;
    let split = run_split(&config.split, &config.paths)?;
    let featurize = run_featurize(&config.featurize, &config.evaluate, &config.paths)?;
    let train = run_train(config)?;
    let metrics = run_evaluate(config, sink)?;
    Ok(RunSummary {
        split,
        featurize,
        train,
        metrics,
    })
}
