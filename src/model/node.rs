//! Function-like units extracted from source code.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Source language of an analyzed project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Typescript,
    Go,
    Python,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Typescript => "typescript",
            Language::Go => "go",
            Language::Python => "python",
        }
    }

    /// File extensions handled for this language (without dot).
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Typescript => &["ts", "tsx", "mts"],
            Language::Go => &["go"],
            Language::Python => &["py"],
        }
    }

    /// Default include globs when the configuration carries none.
    pub fn default_includes(&self) -> &'static [&'static str] {
        match self {
            Language::Typescript => &["**/*.ts", "**/*.tsx", "**/*.mts"],
            Language::Go => &["**/*.go"],
            Language::Python => &["**/*.py"],
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "typescript" | "ts" => Ok(Language::Typescript),
            "go" | "golang" => Ok(Language::Go),
            "python" | "py" => Ok(Language::Python),
            _ => Err(format!("unsupported language: {}", s)),
        }
    }
}

/// Kind of callable declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionKind {
    Function,
    Method,
    Constructor,
    Arrow,
    Closure,
    Lambda,
    /// Synthetic module-initializer node (`__var_init__`).
    Init,
}

impl FunctionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionKind::Function => "function",
            FunctionKind::Method => "method",
            FunctionKind::Constructor => "constructor",
            FunctionKind::Arrow => "arrow",
            FunctionKind::Closure => "closure",
            FunctionKind::Lambda => "lambda",
            FunctionKind::Init => "init",
        }
    }
}

/// Declaration visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Exported,
    Public,
    Private,
    Internal,
    Module,
}

/// Liveness classification assigned by the reachability engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Live,
    Dead,
    Entry,
}

/// Render color derived from status and unused-parameter presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeColor {
    Blue,
    Green,
    Yellow,
    Red,
    Orange,
}

impl NodeColor {
    /// The color is a pure function of status and unused-parameter presence.
    pub fn derive(status: NodeStatus, has_unused_params: bool) -> Self {
        match (status, has_unused_params) {
            (NodeStatus::Entry, _) => NodeColor::Blue,
            (NodeStatus::Live, false) => NodeColor::Green,
            (NodeStatus::Live, true) => NodeColor::Yellow,
            (NodeStatus::Dead, false) => NodeColor::Red,
            (NodeStatus::Dead, true) => NodeColor::Orange,
        }
    }
}

/// A declared parameter with usage information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_annotation: Option<String>,
    #[serde(rename = "isUsed")]
    pub is_used: bool,
    pub position: usize,
}

/// A function-like unit of source code.
///
/// Nodes are immutable after extraction except for `status`, `color`, and
/// `is_entry_point`, which are assigned during entry matching and
/// reachability propagation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Canonical id: `<relpath>:<qualifiedName>`.
    pub id: String,
    /// Short declared name.
    pub name: String,
    /// Fully qualified name including the file path.
    pub qualified_name: String,
    /// Project-relative path, forward slashes, no leading `./`.
    pub file_path: String,
    /// 1-indexed inclusive span.
    pub start_line: u32,
    pub end_line: u32,
    pub language: Language,
    pub kind: FunctionKind,
    pub visibility: Visibility,
    pub is_entry_point: bool,
    pub parameters: Vec<Parameter>,
    /// Names of unused parameter bindings, in declaration order.
    pub unused_parameters: Vec<String>,
    /// Directory of `file_path`, or a language-specific module name.
    pub package_or_module: String,
    pub lines_of_code: u32,
    pub status: NodeStatus,
    pub color: NodeColor,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decorators: Vec<String>,
}

impl Node {
    /// Build the canonical node id from a relative path and qualified name.
    pub fn make_id(rel_path: &str, qualified: &str) -> String {
        format!("{}:{}", rel_path, qualified)
    }

    /// Package/module for a file path: its directory, or the given fallback
    /// when the file sits at the project root.
    pub fn package_for(rel_path: &str, fallback: &str) -> String {
        match rel_path.rsplit_once('/') {
            Some((dir, _)) => dir.to_string(),
            None => fallback.to_string(),
        }
    }

    pub fn has_unused_parameters(&self) -> bool {
        !self.unused_parameters.is_empty()
    }

    /// Re-derive `color` from the current status and parameters.
    pub fn recolor(&mut self) {
        self.color = NodeColor::derive(self.status, self.has_unused_parameters());
    }
}
