//! Whole-program symbol and alias tables built during pass 1.
//!
//! The tables are read-only after construction and shared across pass-2
//! workers. Aliases model import/re-export links; resolution follows the
//! chain to the original declaration, so re-exported bindings never become
//! nodes of their own.

use std::collections::{BTreeMap, HashMap, HashSet};

/// A `(file, name)` pair identifying a binding site.
pub type BindingKey = (String, String);

/// Symbol table mapping declared names to node ids, with alias chains for
/// imports and re-exports.
#[derive(Debug, Default)]
pub struct SymbolTable {
    /// file -> declared name -> node id.
    by_file: HashMap<String, HashMap<String, String>>,
    /// Import/re-export links: local binding -> binding it renames.
    aliases: HashMap<BindingKey, BindingKey>,
    /// Wildcard re-exports: file -> files whose exports it forwards.
    wildcard_reexports: HashMap<String, Vec<String>>,
    /// method name -> node ids, sorted, for best-effort property resolution.
    methods: BTreeMap<String, Vec<String>>,
    /// bare function name -> node ids, sorted. Fallback for languages that
    /// resolve calls across modules without explicit imports (Python).
    functions: BTreeMap<String, Vec<String>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a declaration in a file.
    pub fn declare(&mut self, file: &str, name: &str, node_id: &str) {
        self.by_file
            .entry(file.to_string())
            .or_default()
            .insert(name.to_string(), node_id.to_string());
    }

    /// Record a method declaration for name-based fallback resolution.
    pub fn declare_method(&mut self, name: &str, node_id: &str) {
        let ids = self.methods.entry(name.to_string()).or_default();
        ids.push(node_id.to_string());
        ids.sort();
    }

    /// Record a free function for bare-name fallback resolution.
    pub fn declare_function(&mut self, name: &str, node_id: &str) {
        let ids = self.functions.entry(name.to_string()).or_default();
        ids.push(node_id.to_string());
        ids.sort();
    }

    /// Record that `local` in `file` is an alias for `target_name` declared
    /// (or re-exported) by `target_file`.
    pub fn alias(&mut self, file: &str, local: &str, target_file: &str, target_name: &str) {
        self.aliases.insert(
            (file.to_string(), local.to_string()),
            (target_file.to_string(), target_name.to_string()),
        );
    }

    /// Record `export * from target_file` in `file`.
    pub fn wildcard_reexport(&mut self, file: &str, target_file: &str) {
        self.wildcard_reexports
            .entry(file.to_string())
            .or_default()
            .push(target_file.to_string());
    }

    /// Resolve a name visible in `file` to a node id, following alias
    /// chains and wildcard re-exports to the original declaration.
    pub fn resolve(&self, file: &str, name: &str) -> Option<&str> {
        let mut visited: HashSet<BindingKey> = HashSet::new();
        self.resolve_inner(file, name, &mut visited)
    }

    fn resolve_inner<'a>(
        &'a self,
        file: &str,
        name: &str,
        visited: &mut HashSet<BindingKey>,
    ) -> Option<&'a str> {
        if !visited.insert((file.to_string(), name.to_string())) {
            return None; // alias cycle
        }
        if let Some(id) = self.by_file.get(file).and_then(|m| m.get(name)) {
            return Some(id);
        }
        if let Some((target_file, target_name)) = self.aliases.get(&(file.to_string(), name.to_string())) {
            if let Some(id) = self.resolve_inner(target_file, target_name, visited) {
                return Some(id);
            }
        }
        if let Some(forwarded) = self.wildcard_reexports.get(file) {
            for target_file in forwarded {
                if let Some(id) = self.resolve_inner(target_file, name, visited) {
                    return Some(id);
                }
            }
        }
        None
    }

    /// Follow alias links from a binding to the final `(file, name)` pair,
    /// whether or not a node is declared there. Lets callers resolve
    /// non-callable symbols (classes, types) through the same import and
    /// re-export chains.
    pub fn resolve_origin(&self, file: &str, name: &str) -> Option<(String, String)> {
        let mut current = (file.to_string(), name.to_string());
        let mut visited: HashSet<BindingKey> = HashSet::new();
        while let Some(next) = self.aliases.get(&current) {
            if !visited.insert(current.clone()) {
                return None; // alias cycle
            }
            current = next.clone();
        }
        Some(current)
    }

    /// All node ids carrying a method with the given name, in id order.
    pub fn methods_named(&self, name: &str) -> &[String] {
        self.methods.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// All free functions with the given bare name, in id order.
    pub fn functions_named(&self, name: &str) -> &[String] {
        self.functions.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_chain_resolves_to_original() {
        let mut table = SymbolTable::new();
        table.declare("a.ts", "validate", "a.ts:validate");
        // reexport.ts: export { validate } from './a'
        table.alias("reexport.ts", "validate", "a.ts", "validate");
        // c.ts: import { validate } from './reexport'
        table.alias("c.ts", "validate", "reexport.ts", "validate");

        assert_eq!(table.resolve("c.ts", "validate"), Some("a.ts:validate"));
        assert_eq!(table.resolve("reexport.ts", "validate"), Some("a.ts:validate"));
    }

    #[test]
    fn test_alias_cycle_terminates() {
        let mut table = SymbolTable::new();
        table.alias("a.ts", "x", "b.ts", "x");
        table.alias("b.ts", "x", "a.ts", "x");
        assert_eq!(table.resolve("a.ts", "x"), None);
    }

    #[test]
    fn test_renamed_reexport() {
        let mut table = SymbolTable::new();
        table.declare("a.ts", "foo", "a.ts:foo");
        // b.ts: export { foo as bar } from './a'
        table.alias("b.ts", "bar", "a.ts", "foo");
        assert_eq!(table.resolve("b.ts", "bar"), Some("a.ts:foo"));
    }

    #[test]
    fn test_wildcard_reexport() {
        let mut table = SymbolTable::new();
        table.declare("a.ts", "foo", "a.ts:foo");
        table.wildcard_reexport("barrel.ts", "a.ts");
        assert_eq!(table.resolve("barrel.ts", "foo"), Some("a.ts:foo"));
    }

    #[test]
    fn test_method_fallback_is_sorted() {
        let mut table = SymbolTable::new();
        table.declare_method("process", "b.go:ServiceB.process");
        table.declare_method("process", "a.go:ServiceA.process");
        assert_eq!(
            table.methods_named("process"),
            &["a.go:ServiceA.process".to_string(), "b.go:ServiceB.process".to_string()]
        );
    }

    #[test]
    fn test_function_fallback_is_sorted() {
        let mut table = SymbolTable::new();
        table.declare_function("validate", "z.py:validate");
        table.declare_function("validate", "a.py:validate");
        assert_eq!(
            table.functions_named("validate"),
            &["a.py:validate".to_string(), "z.py:validate".to_string()]
        );
        assert!(table.functions_named("missing").is_empty());
    }
}
