use palmer_core::table::natural_cmp;
use palmer_core::{PipelineError, PipelineResult, Table, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fit-once, apply-many transformer over a table.
///
/// `apply` borrows the encoder immutably, so applying it to held-out data can
/// never change what was learned from the training partition.
pub trait Encoder {
    fn fit(&mut self, table: &Table) -> PipelineResult<()>;
    fn apply(&self, table: &Table) -> PipelineResult<Table>;
    fn is_fitted(&self) -> bool;

    fn fit_apply(&mut self, table: &Table) -> PipelineResult<Table> {
        self.fit(table)?;
        self.apply(table)
    }
}

/// Distinct non-missing keys of a column in natural order.
fn sorted_keys(table: &Table, column: &str) -> PipelineResult<Vec<String>> {
    let mut keys: Vec<String> = table
        .column(column)?
        .into_iter()
        .filter_map(Value::category_key)
        .collect();
    keys.sort_by(|a, b| natural_cmp(a, b));
    keys.dedup();
    if keys.is_empty() {
        return Err(PipelineError::empty(format!(
            "column '{}' has no non-missing values to fit on",
            column
        )));
    }
    Ok(keys)
}

/// What a fitted [`OneHotEncoder`] does with a category it never saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownPolicy {
    /// Fail with an encoding error.
    #[default]
    Error,
    /// Encode as an all-zero indicator row.
    Ignore,
}

/// Replace one categorical column with one 0/1 indicator column per category
/// seen during fit.
///
/// Indicator columns are named `<column>_<category>`, appended at the right
/// edge in sorted category order. A missing category yields missing
/// indicators so the row is removed by a later missing-value filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    pub column: String,
    pub handle_unknown: UnknownPolicy,
    categories: Vec<String>,
}

impl OneHotEncoder {
    pub fn new(column: impl Into<String>, handle_unknown: UnknownPolicy) -> Self {
        OneHotEncoder {
            column: column.into(),
            handle_unknown,
            categories: Vec::new(),
        }
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Names of the indicator columns produced by [`Encoder::apply`].
    pub fn output_columns(&self) -> Vec<String> {
        self.categories
            .iter()
            .map(|c| format!("{}_{}", self.column, c))
            .collect()
    }

    fn indicators(&self, value: &Value) -> PipelineResult<Vec<Value>> {
        let width = self.categories.len();
        let key = match value.category_key() {
            Some(key) => key,
            None => return Ok(vec![Value::Missing; width]),
        };
        let mut out = vec![Value::Number(0.0); width];
        match self.categories.iter().position(|c| *c == key) {
            Some(idx) => out[idx] = Value::Number(1.0),
            None if self.handle_unknown == UnknownPolicy::Ignore => {}
            None => {
                return Err(PipelineError::UnknownCategory {
                    column: self.column.clone(),
                    value: key,
                })
            }
        }
        Ok(out)
    }
}

impl Encoder for OneHotEncoder {
    fn fit(&mut self, table: &Table) -> PipelineResult<()> {
        self.categories = sorted_keys(table, &self.column)?;
        Ok(())
    }

    fn apply(&self, table: &Table) -> PipelineResult<Table> {
        if !self.is_fitted() {
            return Err(PipelineError::NotFitted {
                component: format!("OneHotEncoder({})", self.column),
            });
        }
        let idx = table.column_index(&self.column)?;

        let mut columns: Vec<String> = table
            .columns()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != idx)
            .map(|(_, c)| c.clone())
            .collect();
        columns.extend(self.output_columns());

        let mut rows = Vec::with_capacity(table.n_rows());
        for row in table.rows() {
            let mut out: Vec<Value> = row
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != idx)
                .map(|(_, v)| v.clone())
                .collect();
            out.extend(self.indicators(&row[idx])?);
            rows.push(out);
        }
        Table::new(columns, rows)
    }

    fn is_fitted(&self) -> bool {
        !self.categories.is_empty()
    }
}

/// Map each distinct label to an integer in `[0, n_classes)`, assigned in
/// natural sort order of the labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    pub column: String,
    classes: Vec<String>,
    #[serde(skip)]
    class_to_idx: HashMap<String, usize>,
}

impl LabelEncoder {
    pub fn new(column: impl Into<String>) -> Self {
        LabelEncoder {
            column: column.into(),
            classes: Vec::new(),
            class_to_idx: HashMap::new(),
        }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// Rebuild the lookup index; needed after deserialization.
    fn index(&mut self) {
        self.class_to_idx = self
            .classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
    }

    /// Restore a fitted encoder from its class list.
    pub fn from_classes(column: impl Into<String>, classes: Vec<String>) -> Self {
        let mut enc = LabelEncoder {
            column: column.into(),
            classes,
            class_to_idx: HashMap::new(),
        };
        enc.index();
        enc
    }

    pub fn encode(&self, label: &str) -> PipelineResult<usize> {
        let found = if self.class_to_idx.is_empty() {
            self.classes.iter().position(|c| c == label)
        } else {
            self.class_to_idx.get(label).copied()
        };
        found.ok_or_else(|| PipelineError::UnknownLabel {
            column: self.column.clone(),
            value: label.to_string(),
        })
    }

    pub fn decode(&self, index: usize) -> PipelineResult<&str> {
        self.classes
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| PipelineError::UnknownLabel {
                column: self.column.clone(),
                value: index.to_string(),
            })
    }
}

impl Encoder for LabelEncoder {
    fn fit(&mut self, table: &Table) -> PipelineResult<()> {
        self.classes = sorted_keys(table, &self.column)?;
        self.index();
        Ok(())
    }

    /// Replace the label column with class indices in place; missing labels stay missing.
    fn apply(&self, table: &Table) -> PipelineResult<Table> {
        if !self.is_fitted() {
            return Err(PipelineError::NotFitted {
                component: format!("LabelEncoder({})", self.column),
            });
        }
        let idx = table.column_index(&self.column)?;
        let mut rows = Vec::with_capacity(table.n_rows());
        for row in table.rows() {
            let mut out = row.clone();
            if let Some(key) = row[idx].category_key() {
                out[idx] = Value::Number(self.encode(&key)? as f64);
            }
            rows.push(out);
        }
        Table::new(table.columns().to_vec(), rows)
    }

    fn is_fitted(&self) -> bool {
        !self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palmer_core::ErrorKind;

    fn table(rows: &[(&str, f64, &str)]) -> Table {
        Table::new(
            vec!["species".into(), "bill_length_mm".into(), "sex".into()],
            rows.iter()
                .map(|(s, b, x)| vec![Value::parse(s), Value::Number(*b), Value::parse(x)])
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_one_hot_columns() {
        let train = table(&[("Gentoo", 46.1, "male"), ("Adelie", 39.1, "female"), ("Chinstrap", 49.0, "male")]);
        let mut enc = OneHotEncoder::new("species", UnknownPolicy::Error);
        let out = enc.fit_apply(&train).unwrap();
        assert_eq!(
            out.columns(),
            &["bill_length_mm", "sex", "species_Adelie", "species_Chinstrap", "species_Gentoo"]
        );
        assert_eq!(
            out.rows()[0][2..],
            [Value::Number(0.0), Value::Number(0.0), Value::Number(1.0)]
        );
    }

    #[test]
    fn test_one_hot_unknown() {
        let mut enc = OneHotEncoder::new("species", UnknownPolicy::Error);
        enc.fit(&table(&[("Adelie", 39.1, "female")])).unwrap();
        let test = table(&[("Emperor", 60.0, "male")]);
        let err = enc.apply(&test).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encoding);

        enc.handle_unknown = UnknownPolicy::Ignore;
        let out = enc.apply(&test).unwrap();
        assert_eq!(out.rows()[0][2], Value::Number(0.0));
    }

    #[test]
    fn test_one_hot_missing_category() {
        let mut enc = OneHotEncoder::new("species", UnknownPolicy::Error);
        enc.fit(&table(&[("Adelie", 39.1, "female"), ("", 40.0, "male")])).unwrap();
        assert_eq!(enc.categories(), &["Adelie"]);
        let out = enc.apply(&table(&[("", 40.0, "male")])).unwrap();
        assert!(out.drop_missing().is_empty());
    }

    #[test]
    fn test_apply_before_fit() {
        let enc = OneHotEncoder::new("species", UnknownPolicy::Error);
        let err = enc.apply(&table(&[("Adelie", 39.1, "female")])).unwrap_err();
        assert!(matches!(err, PipelineError::NotFitted { .. }));
    }

    #[test]
    fn test_label_encoder_sorted() {
        let mut enc = LabelEncoder::new("sex");
        enc.fit(&table(&[("Adelie", 1.0, "male"), ("Adelie", 2.0, "female")])).unwrap();
        assert_eq!(enc.classes(), &["female", "male"]);
        assert_eq!(enc.encode("female").unwrap(), 0);
        assert_eq!(enc.encode("male").unwrap(), 1);

        let out = enc.apply(&table(&[("Gentoo", 3.0, "male")])).unwrap();
        assert_eq!(out.rows()[0][2], Value::Number(1.0));
    }

    #[test]
    fn test_label_round_trip() {
        let mut enc = LabelEncoder::new("sex");
        enc.fit(&table(&[("Adelie", 1.0, "male"), ("Adelie", 2.0, "female")])).unwrap();
        for label in ["female", "male"] {
            assert_eq!(enc.decode(enc.encode(label).unwrap()).unwrap(), label);
        }
        assert_eq!(enc.encode("unknown").unwrap_err().kind(), ErrorKind::Encoding);
        assert!(enc.decode(2).is_err());
    }

    #[test]
    fn test_refit_is_idempotent() {
        let train = table(&[("Gentoo", 1.0, "male"), ("Adelie", 2.0, "female")]);
        let mut a = LabelEncoder::new("sex");
        a.fit(&train).unwrap();
        let before = a.clone();
        a.fit(&train).unwrap();
        assert_eq!(a, before);
    }

    #[test]
    fn test_encode_without_lookup_index() {
        // Deserialization skips the lookup map.
        let enc = LabelEncoder {
            column: "sex".into(),
            classes: vec!["female".into(), "male".into()],
            class_to_idx: HashMap::new(),
        };
        assert_eq!(enc.encode("male").unwrap(), 1);
        let restored = LabelEncoder::from_classes("sex", enc.classes().to_vec());
        assert_eq!(restored.encode("female").unwrap(), 0);
    }
}
