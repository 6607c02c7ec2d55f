//! Mathematical utilities: least-squares solving, order statistics, and the
//! normal distribution.

pub mod normal;
pub mod stats;
pub mod wls;

pub use normal::*;
pub use stats::*;
pub use wls::*;
