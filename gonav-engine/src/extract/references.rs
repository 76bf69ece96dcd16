//! Reference extraction.
//!
//! Classifies each identifier use as local, internal, or external, per the
//! [`crate::loader::RawResolution`] the loader already attempted, with the
//! import-table fallback for selector/composite-literal/pointer-type
//! expressions type resolution could not settle.

use std::collections::HashMap;
use std::path::Path;

use gonav_common::model::{Reference, ReferenceType, Symbol, SymbolKind};

use crate::extract::paths::{external_package_label, recover_external_location, relative_to_root};
use crate::loader::{RawReference, RawResolution};
use crate::module_meta::ModuleMetadata;
use crate::stdlib::{Classification, StdlibClassifier};

/// Alias -> import path, as recorded by the loader's import table; used for
/// the `AliasOnly` fallback path.
pub type ImportTable = HashMap<String, String>;

#[allow(clippy::too_many_arguments)]
pub fn extract_references(
    raw_refs: &[RawReference],
    def_positions: &HashMap<(u32, u32), String>,
    import_table: &ImportTable,
    repo_root: &Path,
    gomodcache: &Path,
    module_meta: &ModuleMetadata,
    classifier: &StdlibClassifier,
    work_dir: &Path,
    go_env: &HashMap<String, String>,
) -> Vec<Reference> {
    let mut out = Vec::with_capacity(raw_refs.len());

    for raw in raw_refs {
        let built = match &raw.resolution {
            RawResolution::Local { def_line, def_col } => {
                match def_positions.get(&(*def_line, *def_col)) {
                    Some(def_id) => Some(Reference {
                        name: raw.name.clone(),
                        line: raw.line,
                        column: raw.column,
                        reference_type: ReferenceType::Local,
                        definition_id: Some(def_id.clone()),
                        target: None,
                    }),
                    // Every local reference must point at a real definition;
                    // a dangling pointer from the loader must not produce
                    // one, so we drop it rather than fabricate a definition
                    // id.
                    None => {
                        tracing::warn!(
                            name = %raw.name, line = raw.line, column = raw.column,
                            "local reference resolved to an unknown definition position, dropping"
                        );
                        None
                    }
                }
            }
            RawResolution::Resolved {
                owning_import_path,
                name,
                kind,
                file,
                line,
                column,
                signature,
            } => {
                let target = build_target_symbol(
                    owning_import_path,
                    name,
                    kind,
                    file,
                    *line,
                    *column,
                    signature,
                    repo_root,
                    gomodcache,
                    module_meta,
                    classifier,
                    work_dir,
                    go_env,
                );
                let reference_type = if module_meta.is_external(owning_import_path) {
                    ReferenceType::External
                } else {
                    ReferenceType::Internal
                };
                Some(Reference {
                    name: raw.name.clone(),
                    line: raw.line,
                    column: raw.column,
                    reference_type,
                    definition_id: None,
                    target: Some(target),
                })
            }
            RawResolution::AliasOnly { alias } => import_table.get(alias).map(|import_path| {
                let target = build_target_symbol(
                    import_path,
                    &raw.name,
                    "unknown",
                    "",
                    0,
                    0,
                    "",
                    repo_root,
                    gomodcache,
                    module_meta,
                    classifier,
                    work_dir,
                    go_env,
                );
                let reference_type = if module_meta.is_external(import_path) {
                    ReferenceType::External
                } else {
                    ReferenceType::Internal
                };
                Reference {
                    name: raw.name.clone(),
                    line: raw.line,
                    column: raw.column,
                    reference_type,
                    definition_id: None,
                    target: Some(target),
                }
            }),
            RawResolution::Unresolved => None,
        };

        if let Some(reference) = built {
            out.push(reference);
        }
    }

    out
}

#[allow(clippy::too_many_arguments)]
fn build_target_symbol(
    owning_import_path: &str,
    name: &str,
    kind: &str,
    abs_file: &str,
    line: u32,
    column: u32,
    signature: &str,
    repo_root: &Path,
    gomodcache: &Path,
    module_meta: &ModuleMetadata,
    classifier: &StdlibClassifier,
    work_dir: &Path,
    go_env: &HashMap<String, String>,
) -> Symbol {
    let is_external = module_meta.is_external(owning_import_path);
    let is_stdlib = matches!(
        classifier.classify(owning_import_path, module_meta, work_dir, go_env),
        Classification::Stdlib
    );

    let (file, line, column) = if is_stdlib {
        (String::new(), 0, 0)
    } else if is_external {
        match recover_external_location(abs_file, gomodcache) {
            Some(loc) => (loc.relative_file, line, column),
            None => (String::new(), 0, 0),
        }
    } else {
        let relative = relative_to_root(abs_file, repo_root);
        if relative.is_empty() { (relative, 0, 0) } else { (relative, line, column) }
    };

    let (_, version) = module_meta.resolve(owning_import_path);
    let package = if is_stdlib {
        owning_import_path.to_string()
    } else if is_external && !version.is_empty() {
        external_package_label(owning_import_path, &version)
    } else {
        owning_import_path.to_string()
    };

    Symbol {
        name: name.to_string(),
        kind: map_kind(kind),
        file,
        line,
        column,
        package,
        signature: signature.to_string(),
        import_path: owning_import_path.to_string(),
        is_external,
        is_stdlib,
        version: if version.is_empty() { None } else { Some(version) },
    }
}

fn map_kind(raw: &str) -> SymbolKind {
    match raw {
        "function" => SymbolKind::Function,
        "type" => SymbolKind::Type,
        "variable" => SymbolKind::Variable,
        "constant" => SymbolKind::Constant,
        "field" => SymbolKind::Field,
        "package" => SymbolKind::Package,
        _ => SymbolKind::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name: &str, resolution: RawResolution) -> RawReference {
        RawReference { name: name.to_string(), line: 3, column: 5, resolution }
    }

    #[test]
    fn local_reference_resolves_via_def_positions() {
        let mut positions = HashMap::new();
        positions.insert((1, 1), "def_1".to_string());
        let refs = vec![raw("x", RawResolution::Local { def_line: 1, def_col: 1 })];
        let meta = ModuleMetadata::parse("module m\n");
        let classifier = StdlibClassifier::new();
        let out = extract_references(
            &refs, &positions, &HashMap::new(), Path::new("/repo"),
            Path::new("/sbx/gomodcache"), &meta, &classifier, Path::new("."), &HashMap::new(),
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].reference_type, ReferenceType::Local);
        assert_eq!(out[0].definition_id.as_deref(), Some("def_1"));
    }

    #[test]
    fn dangling_local_reference_is_dropped() {
        let positions = HashMap::new();
        let refs = vec![raw("x", RawResolution::Local { def_line: 1, def_col: 1 })];
        let meta = ModuleMetadata::parse("module m\n");
        let classifier = StdlibClassifier::new();
        let out = extract_references(
            &refs, &positions, &HashMap::new(), Path::new("/repo"),
            Path::new("/sbx/gomodcache"), &meta, &classifier, Path::new("."), &HashMap::new(),
        );
        assert!(out.is_empty());
    }

    #[test]
    fn resolved_internal_reference_has_target_no_definition_id() {
        let refs = vec![raw(
            "Helper",
            RawResolution::Resolved {
                owning_import_path: "m/internal".into(),
                name: "Helper".into(),
                kind: "function".into(),
                file: "/repo/internal/h.go".into(),
                line: 4,
                column: 6,
                signature: "func()".into(),
            },
        )];
        let meta = ModuleMetadata::parse("module m\n");
        let classifier = StdlibClassifier::new();
        let out = extract_references(
            &refs, &HashMap::new(), &HashMap::new(), Path::new("/repo"),
            Path::new("/sbx/gomodcache"), &meta, &classifier, Path::new("."), &HashMap::new(),
        );
        assert_eq!(out[0].reference_type, ReferenceType::Internal);
        assert!(out[0].target.is_some());
        assert!(out[0].definition_id.is_none());
    }

    #[test]
    fn alias_only_falls_back_to_import_table() {
        let mut import_table = HashMap::new();
        import_table.insert("lib".to_string(), "example.com/missing/lib".to_string());
        let refs = vec![raw("New", RawResolution::AliasOnly { alias: "lib".into() })];
        let meta = ModuleMetadata::parse("module m\n");
        let classifier = StdlibClassifier::new();
        let out = extract_references(
            &refs, &HashMap::new(), &import_table, Path::new("/repo"),
            Path::new("/sbx/gomodcache"), &meta, &classifier, Path::new("."), &HashMap::new(),
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].reference_type, ReferenceType::External);
        assert_eq!(out[0].target.as_ref().unwrap().import_path, "example.com/missing/lib");
    }

    #[test]
    fn unresolved_reference_is_dropped() {
        let refs = vec![raw("x", RawResolution::Unresolved)];
        let meta = ModuleMetadata::parse("module m\n");
        let classifier = StdlibClassifier::new();
        let out = extract_references(
            &refs, &HashMap::new(), &HashMap::new(), Path::new("/repo"),
            Path::new("/sbx/gomodcache"), &meta, &classifier, Path::new("."), &HashMap::new(),
        );
        assert!(out.is_empty());
    }
}
