//! External and synthetic data sources for the reference income sample.

pub mod pums;
pub mod sample;

pub use pums::*;
pub use sample::*;
