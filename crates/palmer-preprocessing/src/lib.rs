pub mod encoder;
pub mod split;

pub use encoder::*;
pub use split::*;
