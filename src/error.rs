//! Fatal error taxonomy for the analysis pipeline.
//!
//! Non-fatal conditions (per-file parse errors, dropped matcher rules,
//! helper degradation) are reported through the diagnostics sink instead.

use std::time::Duration;

use thiserror::Error;

/// Errors that abort an analysis run without producing an artifact.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("helper unavailable: {0}")]
    HelperUnavailable(String),

    #[error("helper process exceeded {}s budget", .0.as_secs())]
    HelperTimeout(Duration),

    #[error("unsupported artifact schema version: {0}")]
    SchemaVersionUnsupported(String),

    #[error("artifact invariant violated: {0}")]
    InvariantViolated(String),

    #[error("analysis cancelled")]
    Cancelled,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("artifact encoding error: {0}")]
    Codec(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = AnalysisError::ConfigInvalid("language missing".into());
        assert_eq!(err.to_string(), "invalid configuration: language missing");

        let err = AnalysisError::HelperTimeout(Duration::from_secs(60));
        assert_eq!(err.to_string(), "helper process exceeded 60s budget");
    }
}
