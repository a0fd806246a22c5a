//! Child-process protocol for external analysis helpers.
//!
//! Helpers are single-shot: the parent writes one JSON request on stdin,
//! closes it, and reads one JSON response from stdout. Warnings are
//! line-oriented on stderr. Exit code 0 on success.
//!
//! The Go and Python extractors delegate to a helper when one is present
//! on `PATH` (full type-checked resolution) and fall back to the native
//! tree-sitter path otherwise. The executable lookup is cached lazily for
//! the process lifetime.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::diagnostics::{DiagnosticCode, DiagnosticSink};
use crate::error::AnalysisError;
use crate::model::{Edge, Node};

/// Soft budget for the Go helper.
pub const GO_HELPER_TIMEOUT: Duration = Duration::from_secs(60);
/// Soft budget for the Python helper.
pub const PY_HELPER_TIMEOUT: Duration = Duration::from_secs(30);

/// Request payload written to the helper's stdin.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelperRequest<'a> {
    pub files: &'a [String],
    pub project_root: &'a Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<&'a str>,
}

/// Response payload read from the helper's stdout.
#[derive(Debug, Deserialize)]
pub struct HelperResponse {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

static HELPER_PATHS: Lazy<Mutex<HashMap<String, Option<PathBuf>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Locate a helper executable on `PATH`, caching the result.
pub fn find_helper(name: &str) -> Option<PathBuf> {
    let mut cache = HELPER_PATHS.lock().expect("helper path cache poisoned");
    if let Some(cached) = cache.get(name) {
        return cached.clone();
    }
    let found = std::env::var_os("PATH").and_then(|paths| {
        std::env::split_paths(&paths)
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file())
    });
    cache.insert(name.to_string(), found.clone());
    found
}

/// Run a helper to completion, enforcing the soft timeout.
///
/// Stderr lines are forwarded to the sink as warnings. A timeout kills the
/// child and fails the run; a non-zero exit reports the helper unavailable.
pub fn run_helper(
    exe: &Path,
    request: &HelperRequest<'_>,
    timeout: Duration,
    sink: &DiagnosticSink,
) -> Result<HelperResponse, AnalysisError> {
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| AnalysisError::HelperUnavailable(format!("{}: {}", exe.display(), e)))?;

    let payload = serde_json::to_vec(request)?;
    if let Some(mut stdin) = child.stdin.take() {
        // Helpers that exit early close their end; a broken pipe here is
        // reported through the exit status below.
        let _ = stdin.write_all(&payload);
    }

    let stdout = child.stdout.take().expect("stdout piped");
    let stderr = child.stderr.take().expect("stderr piped");
    let out_reader = std::thread::spawn(move || {
        let mut buf = Vec::new();
        let mut stdout = stdout;
        let _ = stdout.read_to_end(&mut buf);
        buf
    });
    let err_reader = std::thread::spawn(move || {
        let mut buf = String::new();
        let mut stderr = stderr;
        let _ = stderr.read_to_string(&mut buf);
        buf
    });

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait()? {
            Some(status) => break status,
            None => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(AnalysisError::HelperTimeout(timeout));
                }
                std::thread::sleep(Duration::from_millis(25));
            }
        }
    };

    let stdout_buf = out_reader.join().unwrap_or_default();
    let stderr_buf = err_reader.join().unwrap_or_default();

    for line in stderr_buf.lines().filter(|l| !l.trim().is_empty()) {
        sink.warn(DiagnosticCode::HelperUnavailable, line.to_string());
    }

    if !status.success() {
        return Err(AnalysisError::HelperUnavailable(format!(
            "{} exited with {}",
            exe.display(),
            status
        )));
    }

    let response: HelperResponse = serde_json::from_slice(&stdout_buf)?;
    Ok(response)
}
