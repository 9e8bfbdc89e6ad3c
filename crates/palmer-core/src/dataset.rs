use crate::error::{PipelineError, PipelineResult};
use crate::matrix::Matrix;
use crate::table::{Table, Value};

/// A dataset whose categorical column has been replaced by indicator columns
/// and whose target column holds integer class indices.
///
/// `columns` keeps the on-disk column order, target included; the feature
/// matrix holds every other column in that same order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeaturizedDataset {
    columns: Vec<String>,
    target_index: usize,
    features: Matrix,
    labels: Vec<usize>,
}

impl FeaturizedDataset {
    pub fn new(
        columns: Vec<String>,
        target_index: usize,
        features: Matrix,
        labels: Vec<usize>,
    ) -> PipelineResult<Self> {
        if target_index >= columns.len() || features.cols() + 1 != columns.len() {
            return Err(PipelineError::ShapeMismatch {
                expected: vec![columns.len().saturating_sub(1)],
                got: vec![features.cols()],
            });
        }
        if features.rows() != labels.len() {
            return Err(PipelineError::ShapeMismatch {
                expected: vec![features.rows()],
                got: vec![labels.len()],
            });
        }
        Ok(FeaturizedDataset {
            columns,
            target_index,
            features,
            labels,
        })
    }

    /// Split a fully numeric table into features and integer labels.
    pub fn from_table(table: &Table, target: &str) -> PipelineResult<Self> {
        let target_index = table.column_index(target)?;
        let n_features = table.n_cols() - 1;
        let mut data = Vec::with_capacity(table.n_rows() * n_features);
        let mut labels = Vec::with_capacity(table.n_rows());

        for (i, row) in table.rows().iter().enumerate() {
            for (j, value) in row.iter().enumerate() {
                let v = value.as_f64().ok_or_else(|| PipelineError::MalformedRow {
                    row: i,
                    reason: format!(
                        "column '{}' holds non-numeric value '{}'",
                        table.columns()[j],
                        value
                    ),
                })?;
                if j == target_index {
                    if v < 0.0 || v.fract() != 0.0 {
                        return Err(PipelineError::MalformedRow {
                            row: i,
                            reason: format!("label '{}' is not a class index", v),
                        });
                    }
                    labels.push(v as usize);
                } else {
                    data.push(v);
                }
            }
        }

        let features = Matrix::new(data, labels.len(), n_features)?;
        FeaturizedDataset::new(table.columns().to_vec(), target_index, features, labels)
    }

    /// Rebuild the on-disk table, target column in its original position.
    pub fn to_table(&self) -> PipelineResult<Table> {
        let mut rows = Vec::with_capacity(self.len());
        for (features, &label) in self.features.row_iter().zip(&self.labels) {
            let mut row: Vec<Value> = features.iter().map(|&v| Value::Number(v)).collect();
            row.insert(self.target_index, Value::Number(label as f64));
            rows.push(row);
        }
        Table::new(self.columns.clone(), rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn target(&self) -> &str {
        &self.columns[self.target_index]
    }

    /// Feature column names in matrix order.
    pub fn feature_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != self.target_index)
            .map(|(_, c)| c.clone())
            .collect()
    }

    pub fn features(&self) -> &Matrix {
        &self.features
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Fails unless the feature columns equal `expected`, names and order.
    pub fn check_features(&self, expected: &[String]) -> PipelineResult<()> {
        let got = self.feature_names();
        if got != expected {
            return Err(PipelineError::SchemaMismatch {
                expected: expected.join(","),
                got: got.join(","),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::new(
            vec!["bill".into(), "sex".into(), "species_Adelie".into()],
            vec![
                vec![Value::Number(39.1), Value::Number(1.0), Value::Number(1.0)],
                vec![Value::Number(46.5), Value::Number(0.0), Value::Number(0.0)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_from_table() {
        let ds = FeaturizedDataset::from_table(&table(), "sex").unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.labels(), &[1, 0]);
        assert_eq!(ds.feature_names(), vec!["bill", "species_Adelie"]);
        assert_eq!(ds.features().row(1).unwrap(), &[46.5, 0.0]);
        assert_eq!(ds.target(), "sex");
    }

    #[test]
    fn test_table_layout_preserved() {
        let t = table();
        let ds = FeaturizedDataset::from_table(&t, "sex").unwrap();
        assert_eq!(ds.to_table().unwrap(), t);
    }

    #[test]
    fn test_rejects_fractional_label() {
        let t = Table::new(
            vec!["x".into(), "y".into()],
            vec![vec![Value::Number(1.0), Value::Number(0.5)]],
        )
        .unwrap();
        let err = FeaturizedDataset::from_table(&t, "y").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedRow { .. }));
    }

    #[test]
    fn test_check_features() {
        let ds = FeaturizedDataset::from_table(&table(), "sex").unwrap();
        assert!(ds.check_features(&["bill".into(), "species_Adelie".into()]).is_ok());
        let err = ds.check_features(&["bill".into()]).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch { .. }));
    }
}
