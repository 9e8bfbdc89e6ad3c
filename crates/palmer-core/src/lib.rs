pub mod error;
pub mod table;
pub mod matrix;
pub mod dataset;
pub mod model;

pub use error::{ErrorKind, PipelineError, PipelineResult};
pub use table::{Table, Value};
pub use matrix::Matrix;
pub use dataset::FeaturizedDataset;
pub use model::Classifier;
