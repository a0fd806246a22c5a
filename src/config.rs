//! Resolved analysis configuration consumed from the CLI driver.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::model::Language;

/// Entry-point matcher rule (tagged union on the wire:
/// `{"type": "function", "value": "main"}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum EntryPointRule {
    /// Exported declarations in files matching a glob.
    File(String),
    /// Exact name, qualified name, or id match.
    Function(String),
    /// Decorator name equality or substring match.
    Decorator(String),
    /// Exported declarations in files matching a glob.
    Export(String),
}

impl EntryPointRule {
    /// Parse the CLI shorthand `kind:value`, e.g. `function:main`.
    pub fn parse(spec: &str) -> Result<Self, AnalysisError> {
        let (kind, value) = spec
            .split_once(':')
            .ok_or_else(|| AnalysisError::ConfigInvalid(format!("entry point rule missing ':': {}", spec)))?;
        if value.is_empty() {
            return Err(AnalysisError::ConfigInvalid(format!("entry point rule has empty value: {}", spec)));
        }
        match kind {
            "file" => Ok(EntryPointRule::File(value.to_string())),
            "function" => Ok(EntryPointRule::Function(value.to_string())),
            "decorator" => Ok(EntryPointRule::Decorator(value.to_string())),
            "export" => Ok(EntryPointRule::Export(value.to_string())),
            _ => Err(AnalysisError::ConfigInvalid(format!("unknown entry point rule kind: {}", kind))),
        }
    }
}

/// TypeScript-specific options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypescriptOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tsconfig: Option<String>,
}

/// Go-specific options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub build_tags: Vec<String>,
}

/// Python-specific options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PythonOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub python_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venv_path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_roots: Vec<String>,
}

/// Fully resolved configuration. The core treats this as input; defaults
/// are the driver's business.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedConfig {
    pub language: Language,
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub entry_points: Vec<EntryPointRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    pub project_root: PathBuf,
    #[serde(default, skip_serializing_if = "is_default_ts")]
    pub typescript: TypescriptOptions,
    #[serde(default, skip_serializing_if = "is_default_go")]
    pub go: GoOptions,
    #[serde(default, skip_serializing_if = "is_default_py")]
    pub python: PythonOptions,
}

fn is_default_ts(o: &TypescriptOptions) -> bool {
    *o == TypescriptOptions::default()
}

fn is_default_go(o: &GoOptions) -> bool {
    *o == GoOptions::default()
}

fn is_default_py(o: &PythonOptions) -> bool {
    *o == PythonOptions::default()
}

impl ResolvedConfig {
    /// Minimal configuration for a language and project root, with the
    /// language's default include globs.
    pub fn for_project(language: Language, project_root: impl Into<PathBuf>) -> Self {
        Self {
            language,
            include: language.default_includes().iter().map(|s| s.to_string()).collect(),
            exclude: Vec::new(),
            entry_points: Vec::new(),
            output: None,
            project_root: project_root.into(),
            typescript: TypescriptOptions::default(),
            go: GoOptions::default(),
            python: PythonOptions::default(),
        }
    }

    /// Load a resolved configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, AnalysisError> {
        let text = std::fs::read_to_string(path)?;
        let config: ResolvedConfig = serde_json::from_str(&text)
            .map_err(|e| AnalysisError::ConfigInvalid(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check required fields. Fatal on failure; no artifact is produced.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.project_root.as_os_str().is_empty() {
            return Err(AnalysisError::ConfigInvalid("projectRoot is required".into()));
        }
        if !self.project_root.is_dir() {
            return Err(AnalysisError::ConfigInvalid(format!(
                "projectRoot is not a directory: {}",
                self.project_root.display()
            )));
        }
        if self.include.is_empty() {
            return Err(AnalysisError::ConfigInvalid("include patterns are required".into()));
        }
        Ok(())
    }
}
