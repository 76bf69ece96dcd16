//! Package loader.
//!
//! Drives the assumed toolchain against a sandboxed directory and pattern.
//! This loader shells out to a companion helper binary, `gonav-goload`, which
//! is expected to sit next to `go` on `PATH` inside the sandbox and wraps
//! `golang.org/x/tools/go/packages` for us. We specify its JSON output
//! contract here (the [`Raw*`] types); we do not implement the helper
//! itself — the Go parser and type checker it wraps are someone else's
//! problem to build.
//!
//! Loader errors are not fatal: a package with errors is still returned,
//! carrying its diagnostics, so downstream analysis produces a partial
//! result instead of aborting.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::sandbox::Sandbox;

/// One import and whatever diagnostic the loader attached to it.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportDiagnostic {
    pub import_path: String,
    pub error: Option<String>,
}

/// Kind string as emitted by the loader helper; mapped to
/// [`gonav_common::SymbolKind`] by the extractor.
pub type RawKind = String;

#[derive(Debug, Clone, Deserialize)]
pub struct RawReceiver {
    pub type_name: String,
    pub is_pointer: bool,
}

/// One top-level declared object in a loaded package.
#[derive(Debug, Clone, Deserialize)]
pub struct RawObject {
    pub name: String,
    pub kind: RawKind,
    /// Absolute path on disk; rewritten to a repo- or module-relative path
    /// by the extractor.
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub signature: String,
    pub receiver: Option<RawReceiver>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RawPos {
    pub line: u32,
    pub col: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawScopeNode {
    pub kind: String,
    pub name: Option<String>,
    /// Present only for `kind == "method"`; supplies the receiver type the
    /// extractor uses to build the `<Receiver>_<Name>` scope id.
    #[serde(default)]
    pub receiver: Option<RawReceiver>,
    pub start: RawPos,
    pub end: RawPos,
    #[serde(default)]
    pub definitions: Vec<RawDefinition>,
    #[serde(default)]
    pub children: Vec<RawScopeNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawDefinition {
    pub name: String,
    pub kind: RawKind,
    pub line: u32,
    pub column: u32,
    pub signature: String,
}

/// How a [`RawReference`] resolved, per the loader's type-resolution pass.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "resolution", rename_all = "snake_case")]
pub enum RawResolution {
    /// Resolves to a definition in the same file, identified by that
    /// definition's declared position (matched back to our assigned
    /// `def_<n>` id by the extractor).
    Local { def_line: u32, def_col: u32 },
    /// Resolves to an object the type-checker fully identified, somewhere
    /// else in the module or outside it.
    Resolved {
        owning_import_path: String,
        name: String,
        kind: RawKind,
        /// Absolute path; empty when the loader could not determine one
        /// (e.g. stdlib).
        file: String,
        line: u32,
        column: u32,
        signature: String,
    },
    /// Type resolution failed for a selector/composite-literal/pointer-type
    /// expression; only the package alias is known. The extractor falls
    /// back to an import-table lookup for these.
    AliasOnly { alias: String },
    /// No type information at all was available for this occurrence
    /// (syntax-only mode); the extractor still records it as an
    /// unresolved, non-local reference is not possible per the data model,
    /// so syntax-only references with no resolution are dropped by the
    /// extractor rather than fabricating a target.
    Unresolved,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawReference {
    pub name: String,
    pub line: u32,
    pub column: u32,
    #[serde(flatten)]
    pub resolution: RawResolution,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFile {
    pub path: String,
    pub scope_tree: RawScopeNode,
    pub references: Vec<RawReference>,
}

/// One loaded package: everything the extractor needs to build a
/// [`gonav_common::PackageInfo`] and, for each requested file, a
/// [`gonav_common::FileInfo`].
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoadedPackage {
    pub name: String,
    pub path: String,
    pub dir: String,
    pub compiled_files: Vec<String>,
    pub objects: Vec<RawObject>,
    #[serde(default)]
    pub files: Vec<RawFile>,
    pub imports: Vec<ImportDiagnostic>,
    pub package_errors: Vec<String>,
    pub type_info_available: bool,
    pub ast_available: bool,
}

#[derive(Debug, Deserialize, Default)]
struct LoaderOutput {
    packages: Vec<LoadedPackage>,
}

pub struct PackageLoader<'s> {
    sandbox: &'s Sandbox,
}

impl<'s> PackageLoader<'s> {
    pub fn new(sandbox: &'s Sandbox) -> Self {
        Self { sandbox }
    }

    /// `load(dir, pattern) -> [LoadedPackage]`. `pattern` is a Go package
    /// pattern (`./...`, `example.com/m/pkg`, ...).
    pub fn load(&self, dir: &Path, pattern: &str) -> Vec<LoadedPackage> {
        let output = self
            .sandbox
            .exec("gonav-goload", dir, &["-pattern", pattern]);

        match output {
            Ok(out) if out.status.success() => {
                match serde_json::from_slice::<LoaderOutput>(&out.stdout) {
                    Ok(parsed) => parsed.packages,
                    Err(e) => {
                        tracing::warn!(error = %e, "gonav-goload produced unparseable output");
                        Vec::new()
                    }
                }
            }
            Ok(out) => {
                tracing::warn!(
                    status = ?out.status.code(),
                    stderr = %String::from_utf8_lossy(&out.stderr),
                    "gonav-goload exited with an error"
                );
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to spawn gonav-goload");
                Vec::new()
            }
        }
    }
}

/// Indexes [`LoadedPackage`]s by import path for quick lookup, e.g. by the
/// extractor when resolving an internal reference's owning package.
pub fn index_by_path(packages: &[LoadedPackage]) -> HashMap<&str, &LoadedPackage> {
    packages.iter().map(|p| (p.path.as_str(), p)).collect()
}
