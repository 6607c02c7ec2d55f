//! Process-level error type.
//!
//! Every fallible operation in the crate returns `AppError`, which carries
//! the exit code the binary should terminate with:
//!
//! - `2` — usage/input errors (bad flags, missing columns, unreadable files)
//! - `3` — empty-population errors (no rows survive filtering, or a trip
//!   bracket has no reference-sample support)
//! - `4` — external/numeric failures (PUMS request failed, fit diverged)

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
