use thiserror::Error;

/// A required external executable could not be resolved.
#[derive(Debug, Error)]
#[error("{tool} not found in PATH. Please install {tool} and try again.")]
pub struct MissingTool {
    pub tool: String,
}

/// The requested chapter range does not fit the book.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("chapter start index {start} is out of range (valid: 1..={total})")]
    StartOutOfRange { start: i64, total: usize },

    #[error("chapter end index {end} is out of range (valid: -1 or 1..={total})")]
    EndOutOfRange { end: i64, total: usize },

    #[error("chapter start index {start} is larger than chapter end index {end}")]
    StartAfterEnd { start: usize, end: usize },
}

/// The run was cancelled (Ctrl-C) before every chapter finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("interrupted before every chapter finished")]
pub struct Interrupted;
