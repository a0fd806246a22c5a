//! File discovery: include/exclude glob expansion over the project tree.

use std::collections::HashSet;
use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::config::ResolvedConfig;
use crate::diagnostics::{DiagnosticCode, DiagnosticSink};

/// Directories never worth descending into.
const SKIPPED_DIRS: &[&str] = &[
    "node_modules",
    "vendor",
    "target",
    "dist",
    "build",
    "__pycache__",
    ".git",
];

/// Expand the configured include globs relative to the project root,
/// subtracting exclude globs. Returns project-relative paths with
/// forward-slash separators, deduplicated in first-seen order. Symlinked
/// duplicates are collapsed onto their canonical path.
pub fn discover_files(config: &ResolvedConfig, sink: &DiagnosticSink) -> Vec<String> {
    let include = build_globset(&config.include, sink);
    let exclude = build_globset(&config.exclude, sink);

    let mut seen_canonical: HashSet<std::path::PathBuf> = HashSet::new();
    let mut files = Vec::new();

    let walker = WalkDir::new(&config.project_root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.file_type().is_dir() {
                let name = entry.file_name().to_string_lossy();
                if name.starts_with('.') && entry.depth() > 0 {
                    return false;
                }
                if SKIPPED_DIRS.contains(&name.as_ref()) {
                    return false;
                }
            }
            true
        });

    for entry in walker.filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = match entry.path().strip_prefix(&config.project_root) {
            Ok(rel) => normalize_path(rel),
            Err(_) => continue,
        };
        if !include.is_match(&rel) || exclude.is_match(&rel) {
            continue;
        }
        // Symlinks collapse onto their canonical target.
        let canonical = entry
            .path()
            .canonicalize()
            .unwrap_or_else(|_| entry.path().to_path_buf());
        if seen_canonical.insert(canonical) {
            files.push(rel);
        }
    }

    if files.is_empty() {
        sink.warn(
            DiagnosticCode::FileDiscoveryEmpty,
            "no files matched the include patterns",
        );
    }

    files
}

/// Compile patterns into a single matcher, dropping malformed globs with a
/// diagnostic.
fn build_globset(patterns: &[String], sink: &DiagnosticSink) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        match Glob::new(pattern) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => {
                sink.warn(
                    DiagnosticCode::MatcherGlobInvalid,
                    format!("dropping malformed glob {:?}: {}", pattern, e),
                );
            }
        }
    }
    builder.build().unwrap_or_else(|_| GlobSet::empty())
}

/// Project-relative path with forward slashes and no leading `./`.
pub fn normalize_path(path: &Path) -> String {
    let joined = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    joined.trim_start_matches("./").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Language;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_include_exclude() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/a.ts", "");
        write(dir.path(), "src/a.test.ts", "");
        write(dir.path(), "src/sub/b.ts", "");
        write(dir.path(), "readme.md", "");

        let mut config = ResolvedConfig::for_project(Language::Typescript, dir.path());
        config.exclude = vec!["**/*.test.ts".into()];

        let sink = DiagnosticSink::new();
        let files = discover_files(&config, &sink);
        assert_eq!(files, vec!["src/a.ts".to_string(), "src/sub/b.ts".to_string()]);
    }

    #[test]
    fn test_empty_result_emits_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "readme.md", "");

        let config = ResolvedConfig::for_project(Language::Go, dir.path());
        let sink = DiagnosticSink::new();
        let files = discover_files(&config, &sink);
        assert!(files.is_empty());
        assert!(sink
            .snapshot()
            .iter()
            .any(|d| d.code == DiagnosticCode::FileDiscoveryEmpty));
    }

    #[test]
    fn test_malformed_glob_dropped() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.go", "package main");

        let mut config = ResolvedConfig::for_project(Language::Go, dir.path());
        config.exclude = vec!["[invalid".into()];

        let sink = DiagnosticSink::new();
        let files = discover_files(&config, &sink);
        assert_eq!(files, vec!["a.go".to_string()]);
        assert!(sink
            .snapshot()
            .iter()
            .any(|d| d.code == DiagnosticCode::MatcherGlobInvalid));
    }

    #[test]
    fn test_skips_vendor_dirs() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "main.go", "package main");
        write(dir.path(), "vendor/dep/dep.go", "package dep");
        write(dir.path(), "node_modules/pkg/index.ts", "");

        let config = ResolvedConfig::for_project(Language::Go, dir.path());
        let sink = DiagnosticSink::new();
        let files = discover_files(&config, &sink);
        assert_eq!(files, vec!["main.go".to_string()]);
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("./src/a.ts")), "src/a.ts");
        assert_eq!(normalize_path(Path::new("src/a.ts")), "src/a.ts");
    }
}
