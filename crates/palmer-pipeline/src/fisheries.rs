//! Aquaculture production data: cleaning and a random-forest baseline.
//!
//! The raw table is the Eurostat `fish_aq2a` extract. Coded columns are
//! translated through the lookup tables below when shown to a person.

use palmer_core::{Matrix, PipelineError, PipelineResult, Table, Value};
use palmer_metrics::{mae, r2_score, rmse};
use palmer_preprocessing::{split_indices, Encoder, OneHotEncoder, UnknownPolicy};
use palmer_tree::RandomForestRegressor;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::config::FisheriesParams;

pub const AQUACULTURE_METHODS: &[(&str, &str)] = &[
    ("PON", "Ponds"),
    ("TNK", "Tanks and raceways"),
    ("ENC", "Enclosures and pens"),
    ("CAG", "Cages"),
    ("RES", "Recirculation systems"),
    ("ONB", "On bottom"),
    ("OFB", "Off bottom"),
    ("OTH", "Other methods"),
    ("NSP", "Not specified"),
];

pub const AQUATIC_ENVIRONMENTS: &[(&str, &str)] = &[
    ("FRW", "Freshwater"),
    ("SBW", "Sea and brackish water (total)"),
    ("SEA", "Seawater"),
    ("BRK", "Brackish water"),
    ("NSP", "Not specified"),
];

pub const FISHING_REGIONS: &[(u32, &str)] = &[
    (9, "Inland waters - Total"),
    (1, "Inland waters - Africa"),
    (4, "Inland waters - Asia"),
    (5, "Inland waters - Europe"),
    (10, "Marine areas"),
    (27, "Atlantic, Northeast"),
    (34, "Atlantic, Eastern Central"),
    (37, "Mediterranean and Black Sea"),
];

pub const UNITS: &[(&str, &str)] = &[
    ("EUR", "Euro"),
    ("EUR_T", "Euro per tonne"),
    ("TLW", "Tonnes live weight"),
];

pub const COUNTRY_CODES: &[(&str, &str)] = &[
    ("BE", "Belgium"),
    ("BG", "Bulgaria"),
    ("CZ", "Czechia"),
    ("DK", "Denmark"),
    ("DE", "Germany"),
    ("EE", "Estonia"),
    ("IE", "Ireland"),
    ("EL", "Greece"),
    ("ES", "Spain"),
    ("FR", "France"),
    ("HR", "Croatia"),
    ("IT", "Italy"),
    ("CY", "Cyprus"),
    ("LV", "Latvia"),
    ("LT", "Lithuania"),
    ("HU", "Hungary"),
    ("MT", "Malta"),
    ("NL", "Netherlands"),
    ("AT", "Austria"),
    ("PL", "Poland"),
    ("PT", "Portugal"),
    ("RO", "Romania"),
    ("SI", "Slovenia"),
    ("SK", "Slovakia"),
    ("FI", "Finland"),
    ("SE", "Sweden"),
    ("IS", "Iceland"),
    ("NO", "Norway"),
    ("UK", "United Kingdom"),
    ("BA", "Bosnia and Herzegovina"),
    ("ME", "Montenegro"),
    ("MK", "North Macedonia"),
    ("AL", "Albania"),
    ("RS", "Serbia"),
    ("TR", "Turkey"),
];

pub const TARGET: &str = "obs_value";
const NOT_SPECIFIED: &str = "NSP";
const CONFIDENTIAL: &str = "c";
const KEPT_SPECIES: [&str; 3] = ["F02", "F04", "F07"];
const KEPT_UNIT: &str = "TLW";

/// Columns later cleaning steps rely on; never dropped as constant.
const WORKING_COLUMNS: [&str; 7] = ["obs_flag", "obs_value", "unit", "species", "aquameth", "aquaenv", "fishreg"];

fn lookup<'a>(table: &[(&str, &'a str)], code: &str) -> Option<&'a str> {
    table.iter().find(|(c, _)| *c == code).map(|(_, name)| *name)
}

/// Readable name for a coded value of `column`, if one is known.
pub fn describe(column: &str, code: &str) -> Option<&'static str> {
    match column {
        "aquameth" => lookup(AQUACULTURE_METHODS, code),
        "aquaenv" => lookup(AQUATIC_ENVIRONMENTS, code),
        "unit" => lookup(UNITS, code),
        "geo" => lookup(COUNTRY_CODES, code),
        "fishreg" => code
            .parse::<u32>()
            .ok()
            .and_then(|n| FISHING_REGIONS.iter().find(|(c, _)| *c == n))
            .map(|(_, name)| *name),
        _ => None,
    }
}

fn region_name(value: &Value) -> Value {
    match value {
        Value::Number(v) if v.fract() == 0.0 && *v >= 0.0 => FISHING_REGIONS
            .iter()
            .find(|(c, _)| f64::from(*c) == *v)
            .map_or_else(|| Value::Text(value.to_string()), |(_, name)| Value::Text(name.to_string())),
        other => other.clone(),
    }
}

fn is_text(value: &Value, text: &str) -> bool {
    value.as_text() == Some(text)
}

/// Clean the raw production table.
///
/// 1. normalise column names to lower snake case
/// 2. drop columns holding at most one distinct value
/// 3. drop confidential rows, then the `obs_flag` column
/// 4. treat `NSP` as missing and drop incomplete rows
/// 5. translate fishing region codes to names
/// 6. keep live-weight tonnage of species F02, F04 and F07, then drop `unit`
pub fn clean_fisheries(raw: &Table) -> PipelineResult<Table> {
    if raw.is_empty() {
        return Err(PipelineError::empty("fisheries table has no rows"));
    }
    let table = raw.rename_columns(|c| c.to_lowercase().replace(' ', "_"));

    let constant: Vec<String> = (0..table.n_cols())
        .filter(|&i| table.n_unique(i) <= 1)
        .map(|i| table.columns()[i].clone())
        .filter(|c| !WORKING_COLUMNS.contains(&c.as_str()))
        .collect();
    debug!(columns = ?constant, "dropping constant columns");
    let mut table = table.drop_columns(&constant)?;

    if table.has_column("obs_flag") {
        let flag = table.column_index("obs_flag")?;
        table = table
            .filter_rows(|row| !is_text(&row[flag], CONFIDENTIAL))
            .drop_columns(&["obs_flag".to_string()])?;
    }

    for column in ["aquameth", "aquaenv", "fishreg"] {
        table = table.map_column(column, |v| {
            if is_text(v, NOT_SPECIFIED) {
                Value::Missing
            } else {
                v.clone()
            }
        })?;
    }
    let before = table.n_rows();
    table = table.drop_missing();
    debug!(dropped = before - table.n_rows(), "removed incomplete rows");

    table = table.map_column("fishreg", region_name)?;

    let unit = table.column_index("unit")?;
    let species = table.column_index("species")?;
    let table = table
        .filter_rows(|row| {
            is_text(&row[unit], KEPT_UNIT) && KEPT_SPECIES.iter().any(|s| is_text(&row[species], s))
        })
        .drop_columns(&["unit".to_string()])?;

    if table.is_empty() {
        return Err(PipelineError::empty("no tonnage rows left after cleaning"));
    }
    info!(rows = table.n_rows(), columns = table.n_cols(), "cleaned fisheries table");
    Ok(table)
}

/// Row count per distinct value of `column`, in key order.
pub fn count_by(table: &Table, column: &str) -> PipelineResult<Vec<(String, usize)>> {
    let mut counts = BTreeMap::new();
    for value in table.column(column)? {
        if let Some(key) = value.category_key() {
            *counts.entry(key).or_insert(0usize) += 1;
        }
    }
    Ok(counts.into_iter().collect())
}

/// Held-out scores of the fisheries regressor.
#[derive(Debug, Clone, PartialEq)]
pub struct FisheriesReport {
    pub n_train: usize,
    pub n_test: usize,
    pub feature_names: Vec<String>,
    pub r2: f64,
    pub rmse: f64,
    pub mae: f64,
}

/// Split a numeric table into a feature matrix and the target column.
fn numeric_xy(table: &Table) -> PipelineResult<(Matrix, Vec<f64>, Vec<String>)> {
    let target = table.column_index(TARGET)?;
    let names: Vec<String> = table
        .columns()
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != target)
        .map(|(_, c)| c.clone())
        .collect();

    let mut data = Vec::with_capacity(table.n_rows() * names.len());
    let mut y = Vec::with_capacity(table.n_rows());
    for (i, row) in table.rows().iter().enumerate() {
        for (j, value) in row.iter().enumerate() {
            let v = value.as_f64().ok_or_else(|| PipelineError::MalformedRow {
                row: i,
                reason: format!("column '{}' holds non-numeric value '{}'", table.columns()[j], value),
            })?;
            if j == target {
                y.push(v);
            } else {
                data.push(v);
            }
        }
    }
    Ok((Matrix::new(data, y.len(), names.len())?, y, names))
}

/// One-hot every text column (encoders fit on the training rows), fit a
/// random forest on `obs_value` and score it on the held-out rows.
pub fn fit_fisheries_model(table: &Table, params: &FisheriesParams) -> PipelineResult<FisheriesReport> {
    let (train_idx, test_idx) = split_indices(table.n_rows(), params.train_fraction, params.random_seed)?;
    let mut train = table.select_rows(&train_idx)?;
    let mut test = table.select_rows(&test_idx)?;

    let text_columns: Vec<String> = train
        .columns()
        .iter()
        .enumerate()
        .filter(|(j, c)| c.as_str() != TARGET && train.rows().iter().any(|r| r[*j].as_text().is_some()))
        .map(|(_, c)| c.clone())
        .collect();
    for column in &text_columns {
        let mut encoder = OneHotEncoder::new(column, UnknownPolicy::Ignore);
        train = encoder.fit_apply(&train)?;
        test = encoder.apply(&test)?;
    }

    let (x_train, y_train, feature_names) = numeric_xy(&train)?;
    let (x_test, y_test, _) = numeric_xy(&test)?;
    debug!(features = feature_names.len(), "encoded fisheries features");

    let mut forest = RandomForestRegressor::new(
        params.n_estimators,
        params.max_depth,
        params.max_features_ratio,
        params.random_seed,
    );
    forest.fit(&x_train, &y_train)?;
    let predictions = forest.predict(&x_test)?;

    let report = FisheriesReport {
        n_train: y_train.len(),
        n_test: y_test.len(),
        feature_names,
        r2: r2_score(&y_test, &predictions)?,
        rmse: rmse(&y_test, &predictions)?,
        mae: mae(&y_test, &predictions)?,
    };
    info!(
        r2 = report.r2,
        rmse = report.rmse,
        mae = report.mae,
        trees = params.n_estimators,
        "fitted fisheries model"
    );
    Ok(report)
}
