//! Bracket-median income imputation.
//!
//! The survey reports household income only as an ordinal bracket code. To
//! use income as a continuous covariate, each bracket is mapped to the
//! median income of an external reference population restricted to the same
//! age window and geography:
//!
//! - `bracket` defines the single threshold table shared by the
//!   reference-sample classifier and trip-record code validation
//! - `median` builds the bracket → median lookup and performs the
//!   (pure, deterministic) imputation

pub mod bracket;
pub mod median;

pub use bracket::*;
pub use median::*;
