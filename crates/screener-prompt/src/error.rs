//! Error types for condition templating

use thiserror::Error;

/// Result type for templating operations
pub type Result<T> = std::result::Result<T, PromptError>;

/// Errors that can occur while preparing template inputs
///
/// Rendering itself never fails; only the inputs a caller hands in
/// (dates typed by a user, criteria times) can be rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PromptError {
    /// Year/month/day triple that is not a real calendar date
    #[error("Invalid date {year}-{month}-{day}")]
    InvalidDate { year: i32, month: u32, day: u32 },

    /// Date text that matches neither `YYYY-MM-DD` nor `YYYY年M月D日`
    #[error("Failed to parse date '{0}'")]
    DateParseFailed(String),

    /// Trading time that is not `HH:MM`
    #[error("Invalid time '{0}', expected HH:MM")]
    InvalidTime(String),

    /// Variable assignment not in `key=value` form
    #[error("Invalid variable assignment '{0}', expected key=value")]
    InvalidAssignment(String),
}
