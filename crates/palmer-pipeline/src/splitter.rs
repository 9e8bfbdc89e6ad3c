use palmer_core::{PipelineError, PipelineResult, Table};
use palmer_io::{read_table, write_table};
use palmer_preprocessing::train_test_split;
use tracing::{debug, info};

use crate::config::{PathParams, SplitParams};

/// Drop the configured columns, then every row with a missing value.
pub fn clean(raw: &Table, drop_columns: &[String]) -> PipelineResult<Table> {
    if raw.is_empty() {
        return Err(PipelineError::empty("raw dataset has no rows"));
    }
    let cleaned = raw.drop_columns(drop_columns)?.drop_missing();
    debug!(
        raw_rows = raw.n_rows(),
        dropped = raw.n_rows() - cleaned.n_rows(),
        "removed rows with missing values"
    );
    if cleaned.is_empty() {
        return Err(PipelineError::empty("no rows left after removing missing values"));
    }
    Ok(cleaned)
}

/// Clean `raw` and partition it into train and test tables.
pub fn split(raw: &Table, params: &SplitParams) -> PipelineResult<(Table, Table)> {
    let cleaned = clean(raw, &params.drop_columns)?;
    train_test_split(&cleaned, params.train_fraction, params.random_seed)
}

/// Row counts produced by the splitter stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitSummary {
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Read the raw dataset, split it and write both partitions.
pub fn run_split(params: &SplitParams, paths: &PathParams) -> PipelineResult<SplitSummary> {
    let raw = read_table(&paths.raw_path())?;
    let (train, test) = split(&raw, params)?;

    write_table(&paths.train_split_path(), &train)?;
    write_table(&paths.test_split_path(), &test)?;

    info!(
        train_rows = train.n_rows(),
        test_rows = test.n_rows(),
        seed = params.random_seed,
        "split dataset"
    );
    Ok(SplitSummary {
        train_rows: train.n_rows(),
        test_rows: test.n_rows(),
    })
}
