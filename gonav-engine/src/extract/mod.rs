//! Symbol and reference extractor.
//!
//! Three independently testable passes, composed here into the two
//! public entry points the analyzer actually calls: [`build_package_info`]
//! (package-level symbol table) and [`build_file_info`] (one file's scope
//! tree, definitions, and resolved references).

pub mod paths;
pub mod references;
pub mod scopes;
pub mod symbols;

use std::collections::HashMap;
use std::path::Path;

use gonav_common::model::FileInfo;

use crate::loader::{LoadedPackage, RawFile};
use crate::module_meta::ModuleMetadata;
use crate::stdlib::StdlibClassifier;

pub use symbols::extract_package_info as build_package_info;

/// Builds the import-table alias map the loader attaches per file — in this
/// contract every package carries one shared table over its `imports`
/// diagnostics list, keyed by the last path segment (the default Go package
/// name used as the unqualified alias).
fn import_table(pkg: &LoadedPackage) -> references::ImportTable {
    pkg.imports
        .iter()
        .map(|d| {
            let alias = d
                .import_path
                .rsplit('/')
                .next()
                .unwrap_or(&d.import_path)
                .to_string();
            (alias, d.import_path.clone())
        })
        .collect()
}

/// Finds one file's raw payload within a loaded package by its
/// sandbox-absolute path, and builds the [`FileInfo`] the file endpoint
/// returns. `None` when the loader never reported that file (e.g. it has no
/// compile-time errors worth walking, or the path does not belong to this
/// package).
#[allow(clippy::too_many_arguments)]
pub fn build_file_info(
    pkg: &LoadedPackage,
    abs_file_path: &str,
    source: &str,
    repo_root: &Path,
    gomodcache: &Path,
    module_meta: &ModuleMetadata,
    classifier: &StdlibClassifier,
    work_dir: &Path,
    go_env: &HashMap<String, String>,
) -> Option<FileInfo> {
    let raw_file: &RawFile = pkg.files.iter().find(|f| f.path == abs_file_path)?;
    let table = import_table(pkg);

    let extraction = scopes::extract(&raw_file.scope_tree);
    let references = references::extract_references(
        &raw_file.references,
        &extraction.def_positions,
        &table,
        repo_root,
        gomodcache,
        module_meta,
        classifier,
        work_dir,
        go_env,
    );

    Some(FileInfo {
        source: source.to_string(),
        scopes: extraction.scopes,
        definitions: extraction.definitions,
        references,
    })
}
