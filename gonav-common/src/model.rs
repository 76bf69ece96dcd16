//! Core data model.
//!
//! A [`ModuleAtVersion`] identifies a fetched module, a [`PackageInfo`] carries
//! its qualified [`Symbol`] table, a [`FileInfo`] carries one file's
//! [`Scope`] tree, [`Definition`]s, and [`Reference`]s, and a [`Quality`]
//! record describes how complete the analysis behind it is.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `module_path@version`. Version is opaque; equality is exact-match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleAtVersion {
    pub module_path: String,
    pub version: String,
}

impl ModuleAtVersion {
    pub fn new(module_path: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            module_path: module_path.into(),
            version: version.into(),
        }
    }

    /// `module_path@version`, the wire form used in URL path segments.
    pub fn to_wire(&self) -> String {
        format!("{}@{}", self.module_path, self.version)
    }

    /// Parses `module_path@version`, splitting at the *last* `@` so module
    /// paths that legitimately contain `@` (none do in practice, but the
    /// rule must be total) never get misparsed.
    pub fn parse(wire: &str) -> Option<Self> {
        let at = wire.rfind('@')?;
        let (module_path, version) = wire.split_at(at);
        let version = &version[1..];
        if module_path.is_empty() || version.is_empty() {
            return None;
        }
        Some(Self::new(module_path, version))
    }
}

/// A file entry in the repo-wide listing returned by `/api/repo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoFile {
    pub path: String,
    pub is_go: bool,
}

/// What kind of declaration a [`Symbol`] or [`Definition`] names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Type,
    Variable,
    Constant,
    Field,
    Package,
    Unknown,
}

/// One entry in a [`PackageInfo`]'s symbol table, keyed by qualified name
/// (see [`PackageInfo::symbols`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// Relative to the repo root; empty when not locally resolvable.
    pub file: String,
    /// 1-based, 0 when unavailable.
    pub line: u32,
    /// 1-based, 0 when unavailable.
    pub column: u32,
    /// Simple package name, or `import_path@version` for externals.
    pub package: String,
    pub signature: String,
    pub import_path: String,
    pub is_external: bool,
    pub is_stdlib: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// `{ name, path, files, symbols }` — one analyzed package.
///
/// `symbols` maps a *qualified name* (see the module-level qualification
/// rules in the extractor) to its [`Symbol`]. Map order is irrelevant;
/// lookup is by exact key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageInfo {
    pub name: String,
    pub path: String,
    pub files: Vec<RepoFile>,
    pub symbols: HashMap<String, Symbol>,
}

impl PackageInfo {
    pub fn empty(path: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            path: path.into(),
            files: Vec::new(),
            symbols: HashMap::new(),
        }
    }
}

/// Scope kind. Function/method scopes root a name; block scopes nest under
/// their parent using the `if_<n>` ordinal-numbering rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeType {
    Function,
    Block,
    Type,
    Method,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub col: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

/// A node in a file's scope tree. `id` forms a slash-separated hierarchy
/// rooted at `/` (e.g. `/New/if_1/if_2`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ScopeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub range: Range,
}

/// A defining identifier occurrence within one [`FileInfo`]. `id` (form
/// `def_<n>`) is what local [`Reference`]s point back at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Definition {
    pub id: String,
    pub name: String,
    pub kind: SymbolKind,
    pub line: u32,
    pub column: u32,
    pub scope_id: String,
    pub signature: String,
}

/// Whether a [`Reference`] resolved within the same file, within the current
/// module (but a different file/package), or to something outside the
/// module entirely (including the standard library).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    Local,
    Internal,
    External,
}

/// The resolved symbol an `internal`/`external` reference points at. Absent
/// (`None`) for `local` references, which carry `definition_id` instead.
pub type ReferenceTarget = Symbol;

/// One identifier use. Exactly one of `definition_id`/`target` is present,
/// matching `reference_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub name: String,
    pub line: u32,
    pub column: u32,
    #[serde(rename = "type")]
    pub reference_type: ReferenceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<ReferenceTarget>,
}

impl Reference {
    /// The half-open column interval this reference's identifier occupies,
    /// used to disambiguate a click at `(line, column)` per Scenario F.
    pub fn column_span(&self, len: usize) -> std::ops::Range<u32> {
        self.column..self.column + len as u32
    }
}

/// `{ source, scopes, definitions, references }` — one file's analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub source: String,
    pub scopes: Vec<Scope>,
    pub definitions: Vec<Definition>,
    pub references: Vec<Reference>,
}

impl FileInfo {
    pub fn empty(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            scopes: Vec::new(),
            definitions: Vec::new(),
            references: Vec::new(),
        }
    }

    /// Finds the reference whose `(line, column)` span contains `(line, col)`,
    /// implementing the position-based click lookup of Scenario F.
    pub fn reference_at(&self, line: u32, col: u32) -> Option<&Reference> {
        self.references.iter().find(|r| {
            r.line == line && r.column_span(r.name.chars().count()).contains(&col)
        })
    }
}

/// How complete an analysis is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    Complete,
    Partial,
    SyntaxOnly,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportError {
    pub import_path: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    pub severity: ImportSeverity,
}

/// `{ is_complete, analysis_mode, quality_score, missing_dependencies,
/// import_errors, enhancement_available }`.
///
/// `is_complete` always equals `missing_dependencies.is_empty() &&
/// analysis_mode == Complete`. `enhancement_available` implies
/// `analysis_mode != Failed` and `missing_dependencies` non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quality {
    pub is_complete: bool,
    pub analysis_mode: AnalysisMode,
    pub quality_score: f64,
    pub missing_dependencies: Vec<String>,
    pub import_errors: Vec<ImportError>,
    pub enhancement_available: bool,
}

impl Quality {
    pub fn complete() -> Self {
        Self {
            is_complete: true,
            analysis_mode: AnalysisMode::Complete,
            quality_score: 1.0,
            missing_dependencies: Vec::new(),
            import_errors: Vec::new(),
            enhancement_available: false,
        }
    }

    pub fn failed() -> Self {
        Self {
            is_complete: false,
            analysis_mode: AnalysisMode::Failed,
            quality_score: 0.0,
            missing_dependencies: Vec::new(),
            import_errors: Vec::new(),
            enhancement_available: false,
        }
    }

    /// Asserts the consistency rules documented above hold; used by tests
    /// and debug assertions at the point a `Quality` record is finalized.
    pub fn check_invariants(&self) -> Result<(), &'static str> {
        let consistent = self.is_complete
            == (self.missing_dependencies.is_empty() && self.analysis_mode == AnalysisMode::Complete);
        if !consistent {
            return Err("is_complete must equal (no missing deps && mode=complete)");
        }
        if self.enhancement_available
            && (self.analysis_mode == AnalysisMode::Failed || self.missing_dependencies.is_empty())
        {
            return Err("enhancement_available requires mode != failed and missing deps non-empty");
        }
        Ok(())
    }
}

/// Response body of `GET /api/repo/{module@version}`: the entire
/// non-vendored file tree of a fetched module, independent of any
/// package/file analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoListing {
    pub module_at_version: ModuleAtVersion,
    pub module_path: String,
    pub version: String,
    pub files: Vec<RepoFile>,
}

/// The minimal metadata a server response needs alongside a payload:
/// `{ revision, complete, no_change? }`. The full `CachedAnalysis` (with its
/// payload and internal bookkeeping) lives in `gonav-engine`; this is the
/// projection that crosses the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedAnalysisMeta {
    pub revision: String,
    pub complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_change: Option<bool>,
}
