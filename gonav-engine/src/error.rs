//! Error taxonomy.
//!
//! Inner components return typed errors; [`EngineError`] is the only error
//! type that crosses the `Engine` boundary, and most of it is *not* meant to
//! reach a client as an HTTP error — the revision analyzer degrades fetch/load
//! problems into reduced-quality partial [`gonav_common::Quality`] records
//! instead. The two exceptions are named on the variants below.

use thiserror::Error;

/// Failure to resolve or download a module.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("module {module} could not be resolved: {cause}")]
    Resolve { module: String, cause: String },

    #[error("module {module} download failed: {cause}")]
    Download { module: String, cause: String },

    #[error("vcs fallback clone for {module} failed: {cause}")]
    VcsFallback { module: String, cause: String },

    #[error("fetched directory for {module} does not exist on disk: {path}")]
    MissingDir { module: String, path: String },
}

/// Errors from the sandbox itself. These are fail-fast: a directory-creation
/// failure at startup is fatal.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("failed to create sandbox directory {path}: {cause}")]
    CreateDir { path: String, cause: String },
}

/// Errors surfaced by the dependency queue. Both are non-fatal; the
/// analyzer simply does not enqueue again.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("cache key {0} already has a dependency-loading job in progress")]
    AlreadyInProgress(String),

    #[error("dependency queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("queue shutdown did not drain within the configured timeout")]
    ShutdownTimedOut,
}

/// The top-level error type returned by [`crate::analyzer::RevisionAnalyzer`].
///
/// Only [`EngineError::RepoNotFetched`] and [`EngineError::TargetNotFound`]
/// are meant to become non-2xx HTTP responses; everything else the analyzer
/// absorbs into a partial result.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("repository has not been fetched and could not be fetched: {0}")]
    RepoNotFetched(#[from] FetchErrorWrapper),

    #[error("requested package or file does not exist in the module: {0}")]
    TargetNotFound(String),

    #[error(transparent)]
    Sandbox(#[from] SandboxError),
}

/// Wraps [`FetchError`] so it can carry a `#[from]` conversion into
/// [`EngineError`] without making `FetchError` itself the public surface
/// (keeps the taxonomy's layering explicit: fetch errors are a fetcher
/// concern, `RepoNotFetched` is an engine-level concern).
#[derive(Debug, Error)]
#[error("{0}")]
pub struct FetchErrorWrapper(#[from] pub FetchError);
