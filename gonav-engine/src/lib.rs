//! Progressive Analysis Engine.
//!
//! The [`Engine`] is the single instance a server process owns: it fetches
//! modules into a sandboxed cache, loads and analyzes their
//! packages and files, and keeps each target's analysis converging toward
//! completeness in the background without ever blocking a request on
//! network I/O.

pub mod analyzer;
pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod loader;
pub mod module_meta;
pub mod quality;
pub mod queue;
pub mod revision;
pub mod sandbox;
pub mod stdlib;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;
use walkdir::WalkDir;

use gonav_common::model::{ModuleAtVersion, RepoFile, RepoListing};
use gonav_common::CacheKey;

use analyzer::{AnalysisResponse, RevisionAnalyzer};
use config::GonavConfig;
use error::{EngineError, FetchErrorWrapper};
use fetcher::Fetcher;
use module_meta::ModuleMetadata;
use queue::DependencyQueue;
use sandbox::Sandbox;
use stdlib::StdlibClassifier;

/// A directory name the repo listing never descends into, mirroring Go's
/// own toolchain convention of ignoring vendored trees when walking a
/// module for its own source.
const VENDOR_DIR: &str = "vendor";

/// Qualifies a module-root-relative directory into the full Go import path
/// the loader indexes packages by. `""` names the module's own root
/// package.
fn qualify_package_path(module_path: &str, relative: &str) -> String {
    if relative.is_empty() {
        module_path.to_string()
    } else {
        format!("{module_path}/{relative}")
    }
}

/// Runs for the engine's lifetime, waking every `max_age` to sweep each
/// target's cache of incomplete entries older than `max_age`. Complete
/// entries are permanent fixed points and `AnalysisCache::cleanup` never
/// touches them.
fn spawn_cache_cleanup_task(
    analyzers: Arc<RwLock<HashMap<ModuleAtVersion, Arc<RevisionAnalyzer>>>>,
    max_age: std::time::Duration,
) {
    // `tokio::time::interval` panics on a zero period; a misconfigured
    // `max_age_secs = 0` should still poll, just as often as it reasonably
    // can, rather than crash the server at startup.
    let period = max_age.max(std::time::Duration::from_secs(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await; // first tick fires immediately; skip it
        loop {
            interval.tick().await;
            let snapshot: Vec<Arc<RevisionAnalyzer>> =
                analyzers.read().await.values().cloned().collect();
            for analyzer in snapshot {
                analyzer.cache().cleanup(max_age).await;
            }
        }
    });
}

pub struct Engine {
    sandbox: Arc<Sandbox>,
    queue: Arc<DependencyQueue>,
    classifier: Arc<StdlibClassifier>,
    config: GonavConfig,
    analyzers: Arc<RwLock<HashMap<ModuleAtVersion, Arc<RevisionAnalyzer>>>>,
}

impl Engine {
    /// Creates the sandbox, spawns the dependency-queue worker pool, and
    /// spawns the periodic cache-cleanup task that evicts stale incomplete
    /// entries from every target's cache (complete entries are never
    /// touched by it).
    pub fn new(config: GonavConfig, sandbox_base: PathBuf) -> Result<Self, EngineError> {
        let sandbox = Arc::new(Sandbox::new(sandbox_base)?);
        let queue = Arc::new(DependencyQueue::new(config.queue.to_queue_config()));
        queue.spawn(sandbox.clone());

        let analyzers: Arc<RwLock<HashMap<ModuleAtVersion, Arc<RevisionAnalyzer>>>> =
            Arc::new(RwLock::new(HashMap::new()));
        spawn_cache_cleanup_task(analyzers.clone(), config.cache.max_age());

        Ok(Self {
            sandbox,
            queue,
            classifier: Arc::new(StdlibClassifier::new()),
            config,
            analyzers,
        })
    }

    pub fn config(&self) -> &GonavConfig {
        &self.config
    }

    /// `GET /api/repo/{module@version}`: fetches the module if needed and
    /// returns its entire non-vendored file tree. Does not invoke package or
    /// file analysis.
    pub async fn ensure_repo(&self, target: &ModuleAtVersion) -> Result<RepoListing, EngineError> {
        let analyzer = self.analyzer_for(target).await?;
        let repo_root = analyzer.repo_root().to_path_buf();

        let mut files = Vec::new();
        for entry in WalkDir::new(&repo_root)
            .into_iter()
            .filter_entry(|e| e.file_name() != VENDOR_DIR)
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&repo_root) else {
                continue;
            };
            let path = relative.to_string_lossy().replace('\\', "/");
            let is_go = path.ends_with(".go");
            files.push(RepoFile { path, is_go });
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(RepoListing {
            module_at_version: target.clone(),
            module_path: target.module_path.clone(),
            version: target.version.clone(),
            files,
        })
    }

    /// `GET /api/package/{module@version}/{package_path}`. `package_path` is
    /// relative to the module root (empty string names the root package
    /// itself) and is qualified into the loader's full import-path form
    /// before it becomes part of the cache key.
    pub async fn analyze_package(
        &self,
        target: &ModuleAtVersion,
        package_path: &str,
        client_revision: Option<&str>,
    ) -> Result<AnalysisResponse, EngineError> {
        let analyzer = self.analyzer_for(target).await?;
        let qualified = qualify_package_path(&target.module_path, package_path);
        analyzer
            .analyze(&CacheKey::package(qualified), client_revision)
            .await
    }

    /// `GET /api/file/{module@version}/{file_path}`. `file_path` is relative
    /// to the repo root; the owning package path is derived as its
    /// directory (`package_path = dir(file)`).
    pub async fn analyze_file(
        &self,
        target: &ModuleAtVersion,
        file_path: &str,
        client_revision: Option<&str>,
    ) -> Result<AnalysisResponse, EngineError> {
        let analyzer = self.analyzer_for(target).await?;
        let dir = match file_path.rfind('/') {
            Some(idx) => &file_path[..idx],
            None => "",
        };
        let qualified = qualify_package_path(&target.module_path, dir);
        analyzer
            .analyze(&CacheKey::file(qualified, file_path), client_revision)
            .await
    }

    /// Closes the dependency queue's intake and waits for in-flight
    /// downloads to drain.
    pub async fn shutdown(&self, drain_timeout: std::time::Duration) -> Result<(), EngineError> {
        self.queue
            .shutdown(drain_timeout)
            .await
            .map_err(|_| EngineError::TargetNotFound("queue drain timed out".to_string()))
    }

    /// Returns the cached [`RevisionAnalyzer`] for `target`, fetching the
    /// module and building one if this is the first request for it.
    async fn analyzer_for(
        &self,
        target: &ModuleAtVersion,
    ) -> Result<Arc<RevisionAnalyzer>, EngineError> {
        if let Some(existing) = self.analyzers.read().await.get(target) {
            return Ok(existing.clone());
        }

        // Fetching is network I/O and must not hold the map lock, or one
        // slow fetch would stall every other module's lookups; a second
        // caller racing us here just fetches twice, which the concurrency
        // model explicitly allows (last writer wins).
        let sandbox = self.sandbox.clone();
        let target_owned = target.clone();
        let on_disk = tokio::task::spawn_blocking(move || {
            let fetcher = Fetcher::new(&sandbox);
            fetcher.fetch(&target_owned.module_path, &target_owned.version)
        })
        .await
        .map_err(|e| {
            EngineError::RepoNotFetched(FetchErrorWrapper(fetcher::FetchError::Download {
                module: target.module_path.clone(),
                cause: format!("fetch task panicked: {e}"),
            }))
        })?
        .map_err(|e| EngineError::RepoNotFetched(FetchErrorWrapper(e)))?;

        let manifest = std::fs::read_to_string(&on_disk.manifest_path).unwrap_or_default();
        let module_meta = ModuleMetadata::parse(&manifest);

        let analyzer = Arc::new(RevisionAnalyzer::new(
            self.sandbox.clone(),
            self.queue.clone(),
            self.classifier.clone(),
            on_disk.dir,
            module_meta,
        ));
        self.analyzers.write().await.insert(target.clone(), analyzer.clone());
        Ok(analyzer)
    }
}
