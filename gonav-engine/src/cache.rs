//! Analysis cache.
//!
//! A concurrent map from [`CacheKey`] to the latest [`CachedAnalysis`]
//! snapshot for that target, guarded by `tokio::sync::RwLock`. Values are
//! treated as immutable once inserted: readers never mutate a retrieved
//! `Arc`, a writer always replaces the whole entry via [`AnalysisCache::set`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use gonav_common::model::{FileInfo, PackageInfo, Quality};
use gonav_common::CacheKey;

use crate::module_meta::ModuleMetadata;
use crate::stdlib::{Classification, StdlibClassifier};

/// Which payload shape a [`CachedAnalysis`] carries, per the kind of its key.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisPayload {
    Package(PackageInfo),
    File(FileInfo),
}

/// One cached analysis snapshot: the data a client-facing response is built
/// from, plus the bookkeeping the analyzer and cache need to decide whether
/// it is stale.
#[derive(Debug, Clone)]
pub struct CachedAnalysis {
    pub revision: String,
    pub payload: AnalysisPayload,
    pub quality: Quality,
    pub timestamp: Instant,
    pub missing_dependencies: Vec<String>,
    pub dependency_loading_in_progress: bool,
    pub is_complete: bool,
}

/// Result of [`AnalysisCache::get`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheStatus {
    Miss,
    Hit,
    NoChange,
    Newer,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CacheStats {
    pub entries: usize,
    pub complete: usize,
    pub incomplete: usize,
    pub loading: usize,
}

#[derive(Default)]
pub struct AnalysisCache {
    entries: RwLock<HashMap<CacheKey, Arc<CachedAnalysis>>>,
}

impl AnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `get(key, client_revision) -> (entry?, status)`. `no_change` when the
    /// client's revision matches what we hold; `newer` when the client
    /// supplied some other revision and ours differs (they're behind);
    /// `hit` when the client supplied no revision at all; `miss` when we
    /// hold nothing for this key.
    pub async fn get(
        &self,
        key: &CacheKey,
        client_revision: Option<&str>,
    ) -> (Option<Arc<CachedAnalysis>>, CacheStatus) {
        let entries = self.entries.read().await;
        match entries.get(key) {
            None => (None, CacheStatus::Miss),
            Some(entry) => {
                let status = match client_revision {
                    Some(rev) if rev == entry.revision => CacheStatus::NoChange,
                    Some(_) => CacheStatus::Newer,
                    None => CacheStatus::Hit,
                };
                (Some(entry.clone()), status)
            }
        }
    }

    /// Replaces whatever was held for `key`, in place.
    pub async fn set(&self, key: CacheKey, entry: CachedAnalysis) {
        self.entries.write().await.insert(key, Arc::new(entry));
    }

    pub async fn mark_loading(&self, key: &CacheKey, flag: bool) {
        let mut entries = self.entries.write().await;
        if let Some(slot) = entries.get_mut(key) {
            let mut updated = (**slot).clone();
            updated.dependency_loading_in_progress = flag;
            *slot = Arc::new(updated);
        }
    }

    /// Only recommends recalculation for an incomplete entry whose missing
    /// dependencies include at least one that now resolves via a quick
    /// classifier probe (treated here as "does it classify as internal or
    /// resolve to something other than unresolved external").
    pub async fn should_recalculate(
        &self,
        key: &CacheKey,
        work_dir: &Path,
        module_meta: &ModuleMetadata,
        classifier: &StdlibClassifier,
        go_env: &HashMap<String, String>,
    ) -> (bool, Vec<String>) {
        let entries = self.entries.read().await;
        let Some(entry) = entries.get(key) else {
            return (false, Vec::new());
        };
        if entry.is_complete || entry.missing_dependencies.is_empty() {
            return (false, Vec::new());
        }

        let newly_available: Vec<String> = entry
            .missing_dependencies
            .iter()
            .filter(|dep| probe_available(dep, work_dir, module_meta, classifier, go_env))
            .cloned()
            .collect();

        (!newly_available.is_empty(), newly_available)
    }

    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.read().await;
        let mut stats = CacheStats { entries: entries.len(), ..Default::default() };
        for entry in entries.values() {
            if entry.is_complete {
                stats.complete += 1;
            } else {
                stats.incomplete += 1;
            }
            if entry.dependency_loading_in_progress {
                stats.loading += 1;
            }
        }
        stats
    }

    /// Removes incomplete entries older than `max_age`; complete entries are
    /// never evicted (invariant: complete entries are permanent fixed points).
    pub async fn cleanup(&self, max_age: Duration) {
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.is_complete || entry.timestamp.elapsed() < max_age);
    }
}

/// The quick toolchain probe `should_recalculate` uses: does this import
/// path now classify as something other than unresolved-external. A real
/// probe would re-run the stdlib classifier's `go list` call, which already
/// self-memoizes; we drive it through the same classifier instance so a
/// freshly-downloaded dependency's classification is picked up next poll.
fn probe_available(
    import_path: &str,
    work_dir: &Path,
    module_meta: &ModuleMetadata,
    classifier: &StdlibClassifier,
    go_env: &HashMap<String, String>,
) -> bool {
    !matches!(
        classifier.classify(import_path, module_meta, work_dir, go_env),
        Classification::External
    )
}
