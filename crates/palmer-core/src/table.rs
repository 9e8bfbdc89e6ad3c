use crate::error::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

/// A single cell of a raw record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Number(f64),
    Text(String),
    Missing,
}

/// Field spellings read as a missing value.
const MISSING_MARKERS: [&str; 6] = ["", "NA", "N/A", "NaN", "nan", "null"];

impl Value {
    /// Parse a raw field: numeric when it parses as `f64`, missing for the
    /// usual NA spellings, text otherwise.
    pub fn parse(field: &str) -> Self {
        let trimmed = field.trim();
        if MISSING_MARKERS.contains(&trimmed) {
            return Value::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_nan() => Value::Missing,
            Ok(v) => Value::Number(v),
            Err(_) => Value::Text(trimmed.to_string()),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// String key used when the value acts as a category or label.
    pub fn category_key(&self) -> Option<String> {
        match self {
            Value::Missing => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
            Value::Missing => Ok(()),
        }
    }
}

/// Natural ordering of category keys: numeric keys compare as numbers and
/// sort before text keys, text keys compare lexicographically.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// An ordered set of raw records sharing a fixed schema.
///
/// Operations never mutate in place; each returns a new table.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create a table, checking every row against the header width.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> PipelineResult<Self> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(PipelineError::MalformedRow {
                    row: i,
                    reason: format!("expected {} fields, found {}", columns.len(), row.len()),
                });
            }
        }
        Ok(Table { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn column_index(&self, name: &str) -> PipelineResult<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| PipelineError::MissingColumn {
                column: name.to_string(),
            })
    }

    /// Values of one column, in row order.
    pub fn column(&self, name: &str) -> PipelineResult<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Drop the named columns. Every name must exist.
    pub fn drop_columns(&self, names: &[String]) -> PipelineResult<Table> {
        let mut drop = Vec::with_capacity(names.len());
        for name in names {
            drop.push(self.column_index(name)?);
        }
        let keep: Vec<usize> = (0..self.n_cols()).filter(|i| !drop.contains(i)).collect();
        Ok(self.project(&keep))
    }

    /// Keep only the given column positions, in the given order.
    fn project(&self, keep: &[usize]) -> Table {
        Table {
            columns: keep.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|r| keep.iter().map(|&i| r[i].clone()).collect())
                .collect(),
        }
    }

    /// Drop every row holding a missing value in any column.
    pub fn drop_missing(&self) -> Table {
        self.filter_rows(|row| !row.iter().any(Value::is_missing))
    }

    pub fn filter_rows<F: Fn(&[Value]) -> bool>(&self, keep: F) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Rows at the given positions, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> PipelineResult<Table> {
        let mut rows = Vec::with_capacity(indices.len());
        for &i in indices {
            let row = self.rows.get(i).ok_or_else(|| PipelineError::ShapeMismatch {
                expected: vec![self.n_rows()],
                got: vec![i],
            })?;
            rows.push(row.clone());
        }
        Ok(Table {
            columns: self.columns.clone(),
            rows,
        })
    }

    pub fn rename_columns<F: Fn(&str) -> String>(&self, rename: F) -> Table {
        Table {
            columns: self.columns.iter().map(|c| rename(c)).collect(),
            rows: self.rows.clone(),
        }
    }

    /// Apply `f` to every value of one column.
    pub fn map_column<F: Fn(&Value) -> Value>(&self, name: &str, f: F) -> PipelineResult<Table> {
        let idx = self.column_index(name)?;
        let rows = self
            .rows
            .iter()
            .map(|r| {
                let mut r = r.clone();
                r[idx] = f(&r[idx]);
                r
            })
            .collect();
        Ok(Table {
            columns: self.columns.clone(),
            rows,
        })
    }

    /// Append a column at the right edge.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<Value>) -> PipelineResult<()> {
        if values.len() != self.n_rows() {
            return Err(PipelineError::ShapeMismatch {
                expected: vec![self.n_rows()],
                got: vec![values.len()],
            });
        }
        self.columns.push(name.into());
        for (row, v) in self.rows.iter_mut().zip(values) {
            row.push(v);
        }
        Ok(())
    }

    /// Number of distinct non-missing values in a column.
    pub fn n_unique(&self, idx: usize) -> usize {
        self.rows
            .iter()
            .filter_map(|r| r[idx].category_key())
            .collect::<HashSet<_>>()
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn penguins() -> Table {
        Table::new(
            vec!["species".into(), "island".into(), "bill_length_mm".into(), "sex".into()],
            vec![
                vec![Value::parse("Adelie"), Value::parse("Torgersen"), Value::parse("39.1"), Value::parse("male")],
                vec![Value::parse("Adelie"), Value::parse("Torgersen"), Value::parse(""), Value::parse("female")],
                vec![Value::parse("Gentoo"), Value::parse("Biscoe"), Value::parse("46.1"), Value::parse("NA")],
                vec![Value::parse("Gentoo"), Value::parse("Biscoe"), Value::parse("50.0"), Value::parse("male")],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_parse() {
        assert_eq!(Value::parse("39.1"), Value::Number(39.1));
        assert_eq!(Value::parse(" Adelie "), Value::Text("Adelie".into()));
        assert!(Value::parse("").is_missing());
        assert!(Value::parse("NaN").is_missing());
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = Table::new(vec!["a".into()], vec![vec![Value::Missing, Value::Missing]]).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedRow { row: 0, .. }));
    }

    #[test]
    fn test_drop_columns_and_missing() {
        let t = penguins().drop_columns(&["island".to_string()]).unwrap();
        assert_eq!(t.columns(), &["species", "bill_length_mm", "sex"]);
        let clean = t.drop_missing();
        assert_eq!(clean.n_rows(), 2);
        assert!(penguins().drop_columns(&["year".to_string()]).is_err());
    }

    #[test]
    fn test_n_unique_ignores_missing() {
        let t = penguins();
        assert_eq!(t.n_unique(1), 2);
        assert_eq!(t.n_unique(3), 2);
    }

    #[test]
    fn test_natural_cmp() {
        assert_eq!(natural_cmp("9", "10"), Ordering::Less);
        assert_eq!(natural_cmp("female", "male"), Ordering::Less);
        assert_eq!(natural_cmp("3", "abc"), Ordering::Less);
    }
}
