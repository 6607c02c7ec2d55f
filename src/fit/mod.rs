//! Logistic regression fitting.
//!
//! Split the way the rest of the crate is:
//!
//! - `logit` — the low-level IRLS solver over an arbitrary design matrix
//! - `design` — the trip-model design matrix and `FitSummary` assembly
//! - `robust` — HC1 sandwich standard errors

pub mod design;
pub mod logit;
pub mod robust;

pub use design::*;
pub use logit::*;
pub use robust::*;
