//! Shared wire types for `gonav`.
//!
//! Module identifiers, packages, symbols, files, scopes, definitions,
//! references, quality records, and the cache key/entry shapes. Nothing
//! here performs I/O; `gonav-engine` produces these values and `gonav-server`
//! serializes them.

pub mod key;
pub mod model;

pub use key::{AnalysisKind, CacheKey};
pub use model::{
    AnalysisMode, CachedAnalysisMeta, Definition, FileInfo, ImportError, ImportSeverity,
    ModuleAtVersion, PackageInfo, Quality, Reference, ReferenceTarget, ReferenceType, RepoFile,
    RepoListing, Scope, ScopeType, Symbol, SymbolKind,
};
