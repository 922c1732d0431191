//! Error types for clipsplice-av.

use std::path::PathBuf;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while extracting and splicing segments.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required external tool is not available.
    #[error("tool not found: {tool}; is it installed and in PATH?")]
    ToolNotFound { tool: String },

    /// An external tool ran but failed.
    #[error("tool execution failed: {tool}: {message}")]
    ToolFailed { tool: String, message: String },

    /// The source media file cannot be opened or probed.
    #[error("source unreadable: {}: {message}", path.display())]
    SourceUnreadable { path: PathBuf, message: String },

    /// A single segment extraction job failed.
    #[error("extraction of segment {index} failed: {source}")]
    ExtractionFailed {
        index: usize,
        #[source]
        source: Box<Error>,
    },

    /// The final concatenation step failed.
    #[error("concatenation failed: {message}")]
    ConcatenationFailed { message: String },

    /// A time range violates `end > start >= 0` or lies outside the source.
    #[error("invalid time range: {0}")]
    InvalidRange(String),

    /// A line of the timestamps file could not be parsed.
    #[error("timestamps line {line}: {message}")]
    Timestamp { line: usize, message: String },

    /// Invalid input provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for unexpected internal failures (e.g. a panicked job).
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a tool not found error.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    /// Create a tool execution failed error.
    pub fn tool_failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a source unreadable error.
    pub fn source_unreadable(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::SourceUnreadable {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Wrap a per-job failure with the index of the job that produced it.
    pub fn extraction_failed(index: usize, cause: Error) -> Self {
        Self::ExtractionFailed {
            index,
            source: Box::new(cause),
        }
    }

    /// Create a concatenation failed error.
    pub fn concatenation_failed(message: impl Into<String>) -> Self {
        Self::ConcatenationFailed {
            message: message.into(),
        }
    }

    /// The pipeline stage this error belongs to, for user-facing reports.
    pub fn stage(&self) -> &'static str {
        match self {
            Error::ToolNotFound { .. } => "setup",
            Error::SourceUnreadable { .. } => "source",
            Error::InvalidRange(_) | Error::Timestamp { .. } | Error::InvalidInput(_) => {
                "validation"
            }
            Error::ToolFailed { .. } | Error::ExtractionFailed { .. } => "extraction",
            Error::ConcatenationFailed { .. } => "concatenation",
            Error::Io(_) | Error::Json(_) => "io",
            Error::Internal(_) => "internal",
        }
    }

    /// Index of the failing segment, if the error is tied to one.
    pub fn segment_index(&self) -> Option<usize> {
        match self {
            Error::ExtractionFailed { index, .. } => Some(*index),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_not_found_display() {
        let err = Error::tool_not_found("ffmpeg");
        assert!(err.to_string().contains("tool not found: ffmpeg"));
        assert_eq!(err.stage(), "setup");
    }

    #[test]
    fn extraction_failed_carries_index_and_cause() {
        let err = Error::extraction_failed(3, Error::tool_failed("ffmpeg", "exit 1"));
        assert_eq!(
            err.to_string(),
            "extraction of segment 3 failed: tool execution failed: ffmpeg: exit 1"
        );
        assert_eq!(err.segment_index(), Some(3));
        assert_eq!(err.stage(), "extraction");

        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("exit 1"));
    }

    #[test]
    fn concatenation_failed_display() {
        let err = Error::concatenation_failed("ffmpeg exited with status 1");
        assert_eq!(
            err.to_string(),
            "concatenation failed: ffmpeg exited with status 1"
        );
        assert_eq!(err.stage(), "concatenation");
        assert_eq!(err.segment_index(), None);
    }

    #[test]
    fn source_unreadable_display() {
        let err = Error::source_unreadable("/media/missing.mp4", "no such file");
        assert_eq!(
            err.to_string(),
            "source unreadable: /media/missing.mp4: no such file"
        );
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.stage(), "io");
    }
}
