pub mod penguins;

pub use penguins::*;
