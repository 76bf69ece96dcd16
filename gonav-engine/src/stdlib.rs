//! Stdlib classifier.
//!
//! Decides whether an import path is standard library, internal (part of
//! the module being analyzed), or external. The "does this resolve in the
//! standard library tree" question is answered by shelling out to `go list`
//! and memoized, mirroring the `static OPEN_SERVER_BASE: OnceLock<String>`
//! single-value memoization in `analyzer.rs` — generalized here to a
//! per-import-path cache since the question has many possible answers.

use std::collections::HashMap;
use std::path::Path;
use std::process::Command;
use std::sync::Mutex;

use crate::module_meta::ModuleMetadata;

/// How an import path classifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Stdlib,
    Internal,
    External,
}

/// Memoizes `classify()` results across calls with the same sandbox, since
/// the underlying `go list` probe is a subprocess call. One instance is
/// shared for the lifetime of the engine.
#[derive(Default)]
pub struct StdlibClassifier {
    cache: Mutex<HashMap<String, bool>>,
}

impl StdlibClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decides stdlib vs. internal vs. external, in order: an empty import
    /// path is internal by convention, a path under the module root is
    /// internal, a `go list` probe settles the stdlib question when the
    /// toolchain is reachable, and otherwise a no-dot-in-first-segment
    /// heuristic approximates it.
    pub fn classify(
        &self,
        import_path: &str,
        module_meta: &ModuleMetadata,
        work_dir: &Path,
        go_env: &HashMap<String, String>,
    ) -> Classification {
        if import_path.is_empty() || import_path == "main" {
            return Classification::External;
        }
        if import_path.starts_with("./") || import_path.starts_with("../") {
            return Classification::External;
        }
        if !module_meta.is_external(import_path) {
            return Classification::Internal;
        }

        if self.is_stdlib_memoized(import_path, work_dir, go_env) {
            Classification::Stdlib
        } else {
            Classification::External
        }
    }

    fn is_stdlib_memoized(
        &self,
        import_path: &str,
        work_dir: &Path,
        go_env: &HashMap<String, String>,
    ) -> bool {
        {
            let cache = self.cache.lock().unwrap();
            if let Some(&known) = cache.get(import_path) {
                return known;
            }
        }

        let result = probe_stdlib(import_path, work_dir, go_env)
            .unwrap_or_else(|| approximate_is_stdlib(import_path));

        let mut cache = self.cache.lock().unwrap();
        cache.insert(import_path.to_string(), result);
        result
    }
}

/// `builtin` is a synthetic pseudo-package for language primitives,
/// classified as stdlib per the data model section.
pub const BUILTIN_PSEUDO_PACKAGE: &str = "builtin";

/// Shells out to `go list -f {{.Standard}} <import_path>`. `None` when the
/// subprocess itself could not be run or its output was unparseable (the
/// caller then falls back to the no-dot approximation).
fn probe_stdlib(
    import_path: &str,
    work_dir: &Path,
    go_env: &HashMap<String, String>,
) -> Option<bool> {
    if import_path == BUILTIN_PSEUDO_PACKAGE {
        return Some(true);
    }
    let output = Command::new("go")
        .args(["list", "-f", "{{.Standard}}", import_path])
        .current_dir(work_dir)
        .envs(go_env)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    match stdout.trim() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Fallback heuristic for when `go list` can't be consulted: a domain-free
/// import path (no `.`) is assumed to be standard library. This is
/// known-imperfect — vanity import paths without a dot would misclassify.
fn approximate_is_stdlib(import_path: &str) -> bool {
    let first_segment = import_path.split('/').next().unwrap_or(import_path);
    !first_segment.contains('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_pseudo_package_is_stdlib_without_subprocess() {
        assert_eq!(probe_stdlib(BUILTIN_PSEUDO_PACKAGE, Path::new("."), &HashMap::new()), Some(true));
    }

    #[test]
    fn approximation_treats_dotted_paths_as_external() {
        assert!(!approximate_is_stdlib("example.com/foo/bar"));
        assert!(approximate_is_stdlib("fmt"));
        assert!(approximate_is_stdlib("encoding/json"));
    }

    #[test]
    fn classify_is_idempotent() {
        let classifier = StdlibClassifier::new();
        let meta = ModuleMetadata::parse("module example.com/m\n");
        let env = HashMap::new();
        let first = classifier.classify("fmt", &meta, Path::new("."), &env);
        let second = classifier.classify("fmt", &meta, Path::new("."), &env);
        assert_eq!(
            std::mem::discriminant(&first),
            std::mem::discriminant(&second)
        );
    }

    #[test]
    fn classify_internal_before_stdlib_probe() {
        let classifier = StdlibClassifier::new();
        let meta = ModuleMetadata::parse("module example.com/m\n");
        let env = HashMap::new();
        assert_eq!(
            classifier.classify("example.com/m/sub", &meta, Path::new("."), &env),
            Classification::Internal
        );
    }

    #[test]
    fn classify_relative_paths_are_external() {
        let classifier = StdlibClassifier::new();
        let meta = ModuleMetadata::parse("");
        let env = HashMap::new();
        assert_eq!(
            classifier.classify("./sibling", &meta, Path::new("."), &env),
            Classification::External
        );
    }
}
