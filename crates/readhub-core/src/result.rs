//! Result type alias and the best-effort write outcome.

use tracing::warn;

use crate::error::AppError;

/// A specialized `Result` type for ReadHub operations.
pub type AppResult<T> = Result<T, AppError>;

/// Outcome of a non-critical write.
///
/// Cache and audit writes degrade performance when they fail but must
/// never change the outcome of the primary flow. Returning `SoftWrite`
/// instead of `AppResult` makes that contract explicit at the call site:
/// a dropped write can only be logged, not propagated with `?`.
#[derive(Debug)]
#[must_use = "a dropped write should at least be logged"]
pub enum SoftWrite {
    /// The write was applied.
    Applied,
    /// The write failed and was discarded.
    Dropped(AppError),
}

impl SoftWrite {
    /// Convert a fallible write result into a soft outcome.
    pub fn from_result(result: AppResult<()>) -> Self {
        match result {
            Ok(()) => Self::Applied,
            Err(e) => Self::Dropped(e),
        }
    }

    /// Log a dropped write as a warning and discard it.
    pub fn log(self, context: &str) {
        if let Self::Dropped(e) = self {
            warn!(context, error = %e, "best-effort write dropped");
        }
    }

    /// Whether the write was applied.
    pub fn applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}
