pub mod classification;
pub mod importance;
pub mod regression;

pub use classification::*;
pub use importance::*;
pub use regression::*;
