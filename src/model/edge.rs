//! Call and function-reference edges.

use serde::{Deserialize, Serialize};

/// How a call or reference was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// Plain identifier call resolved to a function.
    Direct,
    /// Property/selector call resolved to a concrete method.
    Method,
    /// Interface-typed call fanned out to a concrete implementation.
    Interface,
    /// `new T(...)` / `T(...)` resolved to a constructor.
    Constructor,
    /// Function passed as an argument to another call.
    Callback,
    /// Function or method referenced as a value, not invoked.
    Funcref,
    /// Module-level initializer reference (synthetic `__var_init__` source).
    Varinit,
    /// Constructor return type makes methods on that type callable.
    Provided,
    /// Computed/dynamic call that could not be resolved.
    Dynamic,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Direct => "direct",
            EdgeKind::Method => "method",
            EdgeKind::Interface => "interface",
            EdgeKind::Constructor => "constructor",
            EdgeKind::Callback => "callback",
            EdgeKind::Funcref => "funcref",
            EdgeKind::Varinit => "varinit",
            EdgeKind::Provided => "provided",
            EdgeKind::Dynamic => "dynamic",
        }
    }
}

/// Location of a call expression. 1-indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSite {
    pub file_path: String,
    pub line: u32,
    pub column: u32,
}

/// A directed call or reference between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub source: String,
    /// A node id, or a `[dynamic:<expr>]` sentinel for unresolved calls.
    pub target: String,
    pub call_site: CallSite,
    pub kind: EdgeKind,
    /// False only for `dynamic` edges.
    pub is_resolved: bool,
}

impl Edge {
    pub fn resolved(source: String, target: String, call_site: CallSite, kind: EdgeKind) -> Self {
        Self { source, target, call_site, kind, is_resolved: true }
    }

    /// Build an unresolved edge with a dynamic sentinel target.
    pub fn dynamic(source: String, expr: &str, call_site: CallSite) -> Self {
        Self {
            source,
            target: dynamic_target(expr),
            call_site,
            kind: EdgeKind::Dynamic,
            is_resolved: false,
        }
    }

    /// Sort key implementing the artifact's deterministic edge ordering.
    pub fn order_key(&self) -> (&str, &str, &str, u32, u32, &'static str) {
        (
            &self.source,
            &self.target,
            &self.call_site.file_path,
            self.call_site.line,
            self.call_site.column,
            self.kind.as_str(),
        )
    }
}

/// Format the sentinel target for an unresolvable call expression.
pub fn dynamic_target(expr: &str) -> String {
    format!("[dynamic:{}]", expr)
}

/// Check whether a target string is a dynamic sentinel.
pub fn is_dynamic_target(target: &str) -> bool {
    target.starts_with("[dynamic:") && target.ends_with(']')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> CallSite {
        CallSite { file_path: "a.ts".into(), line: 3, column: 5 }
    }

    #[test]
    fn test_dynamic_sentinel() {
        let edge = Edge::dynamic("a.ts:caller".into(), "obj[key]", site());
        assert_eq!(edge.target, "[dynamic:obj[key]]");
        assert!(!edge.is_resolved);
        assert_eq!(edge.kind, EdgeKind::Dynamic);
        assert!(is_dynamic_target(&edge.target));
        assert!(!is_dynamic_target("a.ts:caller"));
    }

    #[test]
    fn test_resolved_edge() {
        let edge = Edge::resolved("a.ts:f".into(), "b.ts:g".into(), site(), EdgeKind::Direct);
        assert!(edge.is_resolved);
    }
}
