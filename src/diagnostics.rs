//! Uniform warning channel shared by all pipeline components.
//!
//! The sink is the only writer-shared resource in the pipeline; it accepts
//! concurrent appends from rayon workers during extraction.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

/// Severity of a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Info,
    Warning,
    Error,
}

/// Category of a non-fatal condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCode {
    FileDiscoveryEmpty,
    ExtractorParseError,
    HelperUnavailable,
    MatcherGlobInvalid,
    UnresolvedCall,
    Cancelled,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::FileDiscoveryEmpty => "file_discovery_empty",
            DiagnosticCode::ExtractorParseError => "extractor_parse_error",
            DiagnosticCode::HelperUnavailable => "helper_unavailable",
            DiagnosticCode::MatcherGlobInvalid => "matcher_glob_invalid",
            DiagnosticCode::UnresolvedCall => "unresolved_call",
            DiagnosticCode::Cancelled => "cancelled",
        }
    }
}

/// A single non-fatal finding surfaced to the driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: DiagnosticSeverity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "[{}] {}: {}", self.code.as_str(), file, self.message),
            None => write!(f, "[{}] {}", self.code.as_str(), self.message),
        }
    }
}

/// Append-only collector for diagnostics. Cheap to clone; all clones share
/// the same underlying buffer.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticSink {
    inner: Arc<Mutex<Vec<Diagnostic>>>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, diag: Diagnostic) {
        self.inner.lock().expect("diagnostic sink poisoned").push(diag);
    }

    pub fn warn(&self, code: DiagnosticCode, message: impl Into<String>) {
        self.push(Diagnostic {
            code,
            severity: DiagnosticSeverity::Warning,
            message: message.into(),
            file: None,
        });
    }

    pub fn warn_file(&self, code: DiagnosticCode, file: impl Into<String>, message: impl Into<String>) {
        self.push(Diagnostic {
            code,
            severity: DiagnosticSeverity::Warning,
            message: message.into(),
            file: Some(file.into()),
        });
    }

    pub fn info(&self, code: DiagnosticCode, message: impl Into<String>) {
        self.push(Diagnostic {
            code,
            severity: DiagnosticSeverity::Info,
            message: message.into(),
            file: None,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().expect("diagnostic sink poisoned").is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("diagnostic sink poisoned").len()
    }

    /// Take a snapshot of everything collected so far.
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.inner.lock().expect("diagnostic sink poisoned").clone()
    }
}

/// Cooperative cancellation flag checked at file granularity during
/// extraction. Cheap to clone; all clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrent_appends() {
        let sink = DiagnosticSink::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let sink = sink.clone();
                std::thread::spawn(move || {
                    sink.warn(DiagnosticCode::UnresolvedCall, format!("call {}", i));
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(sink.len(), 8);
    }

    #[test]
    fn test_cancel_token_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_display() {
        let diag = Diagnostic {
            code: DiagnosticCode::ExtractorParseError,
            severity: DiagnosticSeverity::Warning,
            message: "syntax error".into(),
            file: Some("src/a.ts".into()),
        };
        assert_eq!(diag.to_string(), "[extractor_parse_error] src/a.ts: syntax error");
    }
}
