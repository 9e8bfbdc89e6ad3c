use palmer_core::{FeaturizedDataset, PipelineError, PipelineResult, Table, Value};
use std::path::Path;
use tracing::debug;

use crate::write_atomic;

fn csv_error(err: csv::Error) -> PipelineError {
    let row = err.position().map(|p| p.line() as usize).unwrap_or(0);
    let reason = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(io) => PipelineError::Io(io),
        _ => PipelineError::MalformedRow { row, reason },
    }
}

/// Read a CSV file with a header row into a [`Table`].
///
/// A leading column with an empty header (a row index written by dataframe
/// tools) is dropped.
pub fn read_table(path: &Path) -> PipelineResult<Table> {
    if !path.exists() {
        return Err(PipelineError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        )));
    }
    let mut rdr = csv::Reader::from_path(path).map_err(csv_error)?;
    let mut headers: Vec<String> = rdr
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let skip_index = headers.first().is_some_and(|h| h.is_empty());
    if skip_index {
        headers.remove(0);
    }

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(csv_error)?;
        let fields = record.iter().skip(usize::from(skip_index));
        rows.push(fields.map(Value::parse).collect::<Vec<_>>());
    }
    debug!(path = %path.display(), rows = rows.len(), cols = headers.len(), "read table");
    Table::new(headers, rows)
}

/// Write a table as CSV with a header row. Missing values become empty fields.
pub fn write_table(path: &Path, table: &Table) -> PipelineResult<()> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(table.columns()).map_err(csv_error)?;
    for row in table.rows() {
        wtr.write_record(row.iter().map(|v| v.to_string()))
            .map_err(csv_error)?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| PipelineError::Io(e.into_error()))?;
    write_atomic(path, &bytes)?;
    debug!(path = %path.display(), rows = table.n_rows(), "wrote table");
    Ok(())
}

/// Read a featurized CSV, splitting out `target` as integer labels.
pub fn read_featurized(path: &Path, target: &str) -> PipelineResult<FeaturizedDataset> {
    FeaturizedDataset::from_table(&read_table(path)?, target)
}

pub fn write_featurized(path: &Path, dataset: &FeaturizedDataset) -> PipelineResult<()> {
    write_table(path, &dataset.to_table()?)
}
