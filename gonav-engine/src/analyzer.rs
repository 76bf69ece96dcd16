//! Revision analyzer.
//!
//! The request handler both HTTP endpoints call through: decides, from the
//! cache status alone, whether to return what we already have, kick off a
//! background dependency download, or run a fresh analysis — and never
//! blocks the calling request on network I/O.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use gonav_common::model::{CachedAnalysisMeta, FileInfo, PackageInfo};
use gonav_common::{AnalysisKind, CacheKey};

use crate::cache::{AnalysisCache, AnalysisPayload, CacheStatus, CachedAnalysis};
use crate::error::{EngineError, FetchErrorWrapper};
use crate::extract;
use crate::loader::{index_by_path, LoadedPackage, PackageLoader};
use crate::module_meta::ModuleMetadata;
use crate::quality;
use crate::queue::{DependencyQueue, DownloadRequest};
use crate::revision;
use crate::sandbox::Sandbox;
use crate::stdlib::StdlibClassifier;

/// A safety ceiling on the dependency-loading supervisor: it must be at
/// least the queue's own per-job timeout.
const SUPERVISOR_TIMEOUT: Duration = Duration::from_secs(600);

/// What an `analyze()` call returns: metadata always, payload only when a
/// fresh snapshot exists to describe (absent on a bare `no_change`).
#[derive(Debug, Clone)]
pub struct AnalysisResponse {
    pub meta: CachedAnalysisMeta,
    pub payload: Option<AnalysisPayload>,
}

impl AnalysisResponse {
    pub fn package(&self) -> Option<&PackageInfo> {
        match &self.payload {
            Some(AnalysisPayload::Package(p)) => Some(p),
            _ => None,
        }
    }

    pub fn file(&self) -> Option<&FileInfo> {
        match &self.payload {
            Some(AnalysisPayload::File(f)) => Some(f),
            _ => None,
        }
    }
}

pub struct RevisionAnalyzer {
    sandbox: Arc<Sandbox>,
    cache: Arc<AnalysisCache>,
    queue: Arc<DependencyQueue>,
    classifier: Arc<StdlibClassifier>,
    repo_root: PathBuf,
    module_meta: ModuleMetadata,
}

impl RevisionAnalyzer {
    pub fn new(
        sandbox: Arc<Sandbox>,
        queue: Arc<DependencyQueue>,
        classifier: Arc<StdlibClassifier>,
        repo_root: PathBuf,
        module_meta: ModuleMetadata,
    ) -> Self {
        Self {
            sandbox,
            cache: Arc::new(AnalysisCache::new()),
            queue,
            classifier,
            repo_root,
            module_meta,
        }
    }

    pub fn cache(&self) -> &AnalysisCache {
        &self.cache
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// Drives the cache-status state machine: a miss runs analysis inline, a
    /// stale hit triggers background dependency loading while serving the
    /// current snapshot, and a matching revision short-circuits to
    /// `no_change` without recomputing anything.
    pub async fn analyze(
        &self,
        key: &CacheKey,
        client_revision: Option<&str>,
    ) -> Result<AnalysisResponse, EngineError> {
        let (entry, status) = self.cache.get(key, client_revision).await;

        match status {
            CacheStatus::NoChange => {
                let entry = entry.expect("NoChange implies an entry was found");
                return Ok(AnalysisResponse {
                    meta: CachedAnalysisMeta {
                        revision: entry.revision.clone(),
                        complete: entry.is_complete,
                        no_change: Some(true),
                    },
                    payload: None,
                });
            }
            CacheStatus::Newer => {
                let entry = entry.expect("Newer implies an entry was found");
                return Ok(build_response(&entry));
            }
            CacheStatus::Hit => {
                let entry = entry.expect("Hit implies an entry was found");
                if !entry.is_complete && !self.queue.is_active(key).await {
                    self.trigger_dep_loading(key, &entry).await;
                }
                return Ok(build_response(&entry));
            }
            CacheStatus::Miss => {}
        }

        let work_dir = self.repo_root.clone();
        if let Some(entry) = entry {
            let (should, _newly_available) = self
                .cache
                .should_recalculate(key, &work_dir, &self.module_meta, &self.classifier, self.sandbox.env())
                .await;
            if !should {
                return Ok(build_response(&entry));
            }
        }

        let new_entry = self.run_analysis(key).await?;
        self.cache.set(key.clone(), new_entry.clone()).await;

        if !new_entry.is_complete && !self.queue.is_active(key).await {
            self.trigger_dep_loading(key, &new_entry).await;
        }

        Ok(build_response(&new_entry))
    }

    /// Runs load + extract + assess + revision for one cache key.
    async fn run_analysis(&self, key: &CacheKey) -> Result<CachedAnalysis, EngineError> {
        let sandbox = self.sandbox.clone();
        let repo_root = self.repo_root.clone();
        let module_meta = self.module_meta.clone();
        let classifier = self.classifier.clone();
        let key = key.clone();

        tokio::task::spawn_blocking(move || {
            run_analysis_blocking(&sandbox, &repo_root, &module_meta, &classifier, &key)
        })
        .await
        .map_err(|e| {
            EngineError::RepoNotFetched(FetchErrorWrapper(crate::error::FetchError::Download {
                module: key.package_path.clone(),
                cause: format!("analysis task panicked: {e}"),
            }))
        })?
    }

    /// Marks `key` as loading, submits its missing dependencies to the
    /// dependency queue, and spawns a supervisor that clears the flag on
    /// completion or timeout.
    async fn trigger_dep_loading(&self, key: &CacheKey, entry: &CachedAnalysis) {
        self.cache.mark_loading(key, true).await;

        let dependencies: Vec<(String, String)> = entry
            .missing_dependencies
            .iter()
            .map(|dep| {
                let (_, version) = self.module_meta.resolve(dep);
                (dep.clone(), version)
            })
            .collect();

        let (tx, rx) = oneshot::channel();
        let submitted = self
            .queue
            .submit(DownloadRequest {
                request_id: uuid::Uuid::new_v4().to_string(),
                cache_key: key.clone(),
                work_dir: self.repo_root.clone(),
                dependencies,
                result_chan: tx,
            })
            .await;

        if let Err(e) = submitted {
            tracing::debug!(key = %key, error = %e, "dependency loading not submitted");
            self.cache.mark_loading(key, false).await;
            return;
        }

        let cache_key = key.clone();
        let cache = self.cache.clone();
        tokio::spawn(async move {
            let outcome = tokio::time::timeout(SUPERVISOR_TIMEOUT, rx).await;
            match outcome {
                Ok(Ok(result)) => {
                    tracing::debug!(key = %cache_key, downloaded = result.outcomes.len(), "dependency loading finished");
                }
                Ok(Err(_)) => {
                    tracing::warn!(key = %cache_key, "dependency loading result channel dropped");
                }
                Err(_) => {
                    tracing::warn!(key = %cache_key, "dependency loading supervisor timed out");
                }
            }
            cache.mark_loading(&cache_key, false).await;
        });
    }
}

fn build_response(entry: &CachedAnalysis) -> AnalysisResponse {
    AnalysisResponse {
        meta: CachedAnalysisMeta {
            revision: entry.revision.clone(),
            complete: entry.is_complete,
            no_change: None,
        },
        payload: Some(entry.payload.clone()),
    }
}

fn run_analysis_blocking(
    sandbox: &Sandbox,
    repo_root: &Path,
    module_meta: &ModuleMetadata,
    classifier: &StdlibClassifier,
    key: &CacheKey,
) -> Result<CachedAnalysis, EngineError> {
    let loader = PackageLoader::new(sandbox);
    let pattern = format!("{}/...", module_meta.module_path());
    let packages = loader.load(repo_root, &pattern);
    let by_path = index_by_path(&packages);

    let pkg: &LoadedPackage = by_path
        .get(key.package_path.as_str())
        .copied()
        .ok_or_else(|| EngineError::TargetNotFound(key.package_path.clone()))?;

    let go_env = sandbox.env().clone();
    let gomodcache = sandbox.gomodcache();

    let pkg_quality = quality::assess(pkg);

    let (payload, symbol_count, ref_count) = match key.kind {
        AnalysisKind::Package => {
            let info = extract::build_package_info(
                pkg, repo_root, gomodcache, module_meta, classifier, repo_root, &go_env,
            );
            let symbol_count = info.symbols.len();
            (AnalysisPayload::Package(info), symbol_count, 0)
        }
        AnalysisKind::File => {
            let file_path = key
                .file_path
                .as_deref()
                .ok_or_else(|| EngineError::TargetNotFound(key.to_string()))?;
            let abs_path = repo_root.join(file_path).to_string_lossy().into_owned();
            let source = std::fs::read_to_string(&abs_path).unwrap_or_default();
            let info = extract::build_file_info(
                pkg, &abs_path, &source, repo_root, gomodcache, module_meta, classifier, repo_root,
                &go_env,
            )
            .ok_or_else(|| EngineError::TargetNotFound(key.to_string()))?;
            let ref_count = info.references.len();
            (AnalysisPayload::File(info), 0, ref_count)
        }
    };

    let revision = revision::revision(&key.to_string(), &pkg_quality, symbol_count, ref_count);

    Ok(CachedAnalysis {
        revision,
        is_complete: pkg_quality.is_complete,
        missing_dependencies: pkg_quality.missing_dependencies.clone(),
        quality: pkg_quality,
        payload,
        timestamp: std::time::Instant::now(),
        dependency_loading_in_progress: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::QueueConfig;
    use crate::sandbox::Sandbox;

    #[tokio::test]
    async fn miss_then_hit_round_trip_is_consistent() {
        let tmp = tempfile::tempdir().unwrap();
        let sandbox = Arc::new(Sandbox::new(tmp.path().join("sbx")).unwrap());
        let queue = Arc::new(DependencyQueue::new(QueueConfig::default()));
        let classifier = Arc::new(StdlibClassifier::new());
        let meta = ModuleMetadata::parse("module example.com/m\n");
        let analyzer = RevisionAnalyzer::new(
            sandbox,
            queue,
            classifier,
            tmp.path().to_path_buf(),
            meta,
        );

        let key = CacheKey::package("example.com/m/missing");
        // No loader binary is present in this environment, so the loader
        // returns no packages and this key can never be found — the
        // analyzer must surface that as TargetNotFound rather than panic.
        let err = analyzer.analyze(&key, None).await.unwrap_err();
        assert!(matches!(err, EngineError::TargetNotFound(_)));
    }
}
