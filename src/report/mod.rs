//! Reporting: formatted terminal output for the run.
//!
//! We keep formatting code in one place so:
//! - the imputation/fitting code stays clean and testable
//! - output changes are localized (important for future snapshot tests)

pub mod format;

pub use format::*;
