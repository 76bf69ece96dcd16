//! Package-level symbol extraction.
//!
//! Builds the qualified-name symbol table for one [`LoadedPackage`]. Method
//! qualification is the subtle part: a value-receiver method on `T` is
//! keyed `T.Method`, a pointer-receiver method is keyed `(*T).Method`, and
//! neither is ever stored under its bare name — that would collide with a
//! same-named free function.

use std::collections::HashMap;
use std::path::Path;

use gonav_common::model::{PackageInfo, RepoFile, Symbol, SymbolKind};

use crate::extract::paths::{external_package_label, recover_external_location, relative_to_root};
use crate::loader::{LoadedPackage, RawObject};
use crate::module_meta::ModuleMetadata;
use crate::stdlib::{Classification, StdlibClassifier};

pub fn extract_package_info(
    pkg: &LoadedPackage,
    repo_root: &Path,
    gomodcache: &Path,
    module_meta: &ModuleMetadata,
    classifier: &StdlibClassifier,
    work_dir: &Path,
    go_env: &HashMap<String, String>,
) -> PackageInfo {
    let mut symbols = HashMap::new();

    for object in &pkg.objects {
        let qualified_name = qualify(object);
        let symbol = build_symbol(
            object,
            &pkg.path,
            repo_root,
            gomodcache,
            module_meta,
            classifier,
            work_dir,
            go_env,
        );
        symbols.insert(qualified_name, symbol);
    }

    PackageInfo {
        name: pkg.name.clone(),
        path: pkg.path.clone(),
        files: pkg
            .compiled_files
            .iter()
            .map(|f| RepoFile {
                path: relative_to_root(f, repo_root),
                is_go: f.ends_with(".go"),
            })
            .collect(),
        symbols,
    }
}

/// Qualified-name rule from the data model section: bare identifier for
/// top-level declarations, `T.Method` / `(*T).Method` for methods.
fn qualify(object: &RawObject) -> String {
    match &object.receiver {
        Some(receiver) if receiver.is_pointer => {
            format!("(*{}).{}", receiver.type_name, object.name)
        }
        Some(receiver) => format!("{}.{}", receiver.type_name, object.name),
        None => object.name.clone(),
    }
}

#[allow(clippy::too_many_arguments)]
fn build_symbol(
    object: &RawObject,
    owning_package_path: &str,
    repo_root: &Path,
    gomodcache: &Path,
    module_meta: &ModuleMetadata,
    classifier: &StdlibClassifier,
    work_dir: &Path,
    go_env: &HashMap<String, String>,
) -> Symbol {
    let is_external = module_meta.is_external(owning_package_path);
    let is_stdlib = matches!(
        classifier.classify(owning_package_path, module_meta, work_dir, go_env),
        Classification::Stdlib
    );

    let file = if is_stdlib {
        String::new()
    } else if is_external {
        recover_external_location(&object.file, gomodcache)
            .map(|loc| loc.relative_file)
            .unwrap_or_default()
    } else {
        relative_to_root(&object.file, repo_root)
    };

    let (line, column) = if file.is_empty() { (0, 0) } else { (object.line, object.column) };

    let (_, version) = module_meta.resolve(owning_package_path);
    let package = if is_stdlib {
        owning_package_path.to_string()
    } else if is_external && !version.is_empty() {
        external_package_label(owning_package_path, &version)
    } else {
        owning_package_path.to_string()
    };

    Symbol {
        name: object.name.clone(),
        kind: map_kind(&object.kind),
        file,
        line,
        column,
        package,
        signature: object.signature.clone(),
        import_path: owning_package_path.to_string(),
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
