//! # Palmer 🐧
//!
//! A four-stage batch pipeline (split → featurize → train → evaluate) over the
//! Palmer penguins table, plus a fisheries regression notebook turned library.
//!
//! ## Modules
//!
//! - **core**: Error taxonomy, raw `Table`/`Value` records, `Matrix`, featurized datasets
//! - **io**: CSV read/write, atomic JSON artifacts
//! - **preprocessing**: OneHotEncoder, LabelEncoder, seeded train/test split
//! - **neighbors**: KNN classifier with Euclidean/Manhattan distance
//! - **tree**: Regression tree (CART), Random Forest
//! - **metrics**: Accuracy, confusion matrix, ROC/AUC, permutation importance, R², RMSE, MAE
//! - **datasets**: Synthetic penguins with the real schema
//! - **pipeline**: Configuration, the four stages, report sinks, fisheries preparation

/// Errors, tables and matrices.
pub use palmer_core as core;

/// CSV and artifact persistence.
pub use palmer_io as io;

/// Encoders and splitting.
pub use palmer_preprocessing as preprocessing;

/// Nearest neighbors.
pub use palmer_neighbors as neighbors;

/// Tree-based regressors.
pub use palmer_tree as tree;

/// Evaluation metrics.
pub use palmer_metrics as metrics;

/// Synthetic datasets.
pub use palmer_datasets as datasets;

/// Pipeline stages.
pub use palmer_pipeline as pipeline;
