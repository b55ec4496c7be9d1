//! Error types shared across NarraMix crates.
//!
//! `NarramixError` is the fatal channel: an operation that returns it
//! produced no output file. Failures of optional contributions never
//! surface here; they are absorbed into [`crate::Diagnostics`].

use std::path::PathBuf;

/// Top-level error type for NarraMix operations.
#[derive(Debug, thiserror::Error)]
pub enum NarramixError {
    #[error("Media error: {message}")]
    Media { message: String },

    #[error("Encode error: {message}")]
    Encode { message: String },

    #[error("Audio error: {message}")]
    Audio { message: String },

    #[error("Subtitle error: {message}")]
    Subtitle { message: String },

    #[error("Invalid timestamp '{input}': {reason}")]
    Timestamp { input: String, reason: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using NarramixError.
pub type NarramixResult<T> = Result<T, NarramixError>;

impl NarramixError {
    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media {
            message: msg.into(),
        }
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode {
            message: msg.into(),
        }
    }

    pub fn audio(msg: impl Into<String>) -> Self {
        Self::Audio {
            message: msg.into(),
        }
    }

    pub fn subtitle(msg: impl Into<String>) -> Self {
        Self::Subtitle {
            message: msg.into(),
        }
    }

    pub fn timestamp(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Timestamp {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Check that a required input file exists.
    pub fn require_file(path: &std::path::Path) -> NarramixResult<()> {
        if path.exists() {
            Ok(())
        } else {
            Err(Self::FileNotFound {
                path: path.to_path_buf(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_error_message() {
        let err = NarramixError::timestamp("00:00:10-00:00:15,500", "missing milliseconds");
        assert_eq!(
            err.to_string(),
            "Invalid timestamp '00:00:10-00:00:15,500': missing milliseconds"
        );
    }

    #[test]
    fn test_require_file_missing() {
        let err = NarramixError::require_file(std::path::Path::new("/definitely/not/here.mp4"))
            .unwrap_err();
        assert!(matches!(err, NarramixError::FileNotFound { .. }));
    }
}
