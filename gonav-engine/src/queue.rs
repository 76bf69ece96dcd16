//! Dependency queue.
//!
//! A bounded worker pool that downloads a request's missing dependencies in
//! the background via the Fetcher's single-missing path. One bounded `mpsc`
//! carries requests in, a fixed number of workers drain it, and callers
//! learn about completion through a one-shot channel rather than by polling
//! shared state.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use gonav_common::CacheKey;
use tokio::sync::{mpsc, oneshot, Mutex, RwLock};
use tokio::time::timeout;

use crate::error::QueueError;
use crate::fetcher::Fetcher;
use crate::sandbox::Sandbox;

/// `max_concurrent_downloads`, `download_timeout`, `queue_size`,
/// `retry_attempts` — tuning knobs for the background download pool.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub max_concurrent_downloads: usize,
    pub download_timeout: Duration,
    pub queue_size: usize,
    pub retry_attempts: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: 3,
            download_timeout: Duration::from_secs(120),
            queue_size: 100,
            retry_attempts: 2,
        }
    }
}

/// One dependency's download outcome within a [`DependencyDownloadResult`].
#[derive(Debug, Clone)]
pub struct DependencyOutcome {
    pub import_path: String,
    pub succeeded: bool,
    pub error: Option<String>,
}

/// Emitted once per accepted request, through its `result_chan`.
#[derive(Debug, Clone)]
pub struct DependencyDownloadResult {
    pub request_id: String,
    pub cache_key: CacheKey,
    pub outcomes: Vec<DependencyOutcome>,
}

/// A submitted download job: the dependencies to fetch, where to fetch them
/// relative to, and where to report the result.
pub struct DownloadRequest {
    pub request_id: String,
    pub cache_key: CacheKey,
    pub work_dir: std::path::PathBuf,
    /// `(module_path, version)` pairs, processed in the given order.
    pub dependencies: Vec<(String, String)>,
    pub result_chan: oneshot::Sender<DependencyDownloadResult>,
}

struct Job {
    request_id: String,
    cache_key: CacheKey,
    work_dir: std::path::PathBuf,
    dependencies: Vec<(String, String)>,
    result_chan: oneshot::Sender<DependencyDownloadResult>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct QueueStats {
    pub active: usize,
    pub capacity: usize,
}

/// Owns the intake channel and the active-set of cache keys currently being
/// loaded. Workers are spawned once, at [`DependencyQueue::spawn`] time, and
/// run for the engine's lifetime until [`DependencyQueue::shutdown`].
pub struct DependencyQueue {
    config: QueueConfig,
    sender: mpsc::Sender<Job>,
    receiver: Mutex<Option<mpsc::Receiver<Job>>>,
    active: Arc<RwLock<HashSet<CacheKey>>>,
}

impl DependencyQueue {
    pub fn new(config: QueueConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_size);
        Self {
            config,
            sender,
            receiver: Mutex::new(Some(receiver)),
            active: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    pub async fn is_active(&self, key: &CacheKey) -> bool {
        self.active.read().await.contains(key)
    }

    /// Enqueues `request`. Rejects a duplicate cache key already active, and
    /// rejects when the bounded channel is saturated.
    pub async fn submit(&self, request: DownloadRequest) -> Result<(), QueueError> {
        {
            let mut active = self.active.write().await;
            if active.contains(&request.cache_key) {
                return Err(QueueError::AlreadyInProgress(request.cache_key.to_string()));
            }
            active.insert(request.cache_key.clone());
        }

        let job = Job {
            request_id: request.request_id,
            cache_key: request.cache_key.clone(),
            work_dir: request.work_dir,
            dependencies: request.dependencies,
            result_chan: request.result_chan,
        };

        if self.sender.try_send(job).is_err() {
            self.active.write().await.remove(&request.cache_key);
            return Err(QueueError::QueueFull { capacity: self.config.queue_size });
        }

        Ok(())
    }

    pub async fn stats(&self) -> QueueStats {
        QueueStats {
            active: self.active.read().await.len(),
            capacity: self.config.queue_size,
        }
    }

    /// Spawns `max_concurrent_downloads` worker tasks pulling from the same
    /// receiver; `tokio::sync::mpsc` hands each message to exactly one
    /// waiting receiver, so this is the whole worker pool.
    pub fn spawn(self: &Arc<Self>, sandbox: Arc<Sandbox>) {
        let receiver = self
            .receiver
            .try_lock()
            .expect("spawn called more than once")
            .take()
            .expect("spawn called more than once");
        let receiver = Arc::new(Mutex::new(receiver));

        for _ in 0..self.config.max_concurrent_downloads {
            let receiver = receiver.clone();
            let queue = self.clone();
            let sandbox = sandbox.clone();
            tokio::spawn(async move {
                loop {
                    let job = {
                        let mut guard = receiver.lock().await;
                        guard.recv().await
                    };
                    let Some(job) = job else { break };
                    queue.run_job(job, &sandbox).await;
                }
            });
        }
    }

    async fn run_job(&self, job: Job, sandbox: &Sandbox) {
        let fetcher = Fetcher::new(sandbox);
        let mut outcomes = Vec::with_capacity(job.dependencies.len());

        for (import_path, _version) in &job.dependencies {
            let download = timeout(
                self.config.download_timeout,
                run_with_retries(
                    &fetcher,
                    &job.work_dir,
                    import_path,
                    self.config.retry_attempts,
                ),
            )
            .await;

            let outcome = match download {
                Ok(Ok(())) => DependencyOutcome {
                    import_path: import_path.clone(),
                    succeeded: true,
                    error: None,
                },
                Ok(Err(cause)) => DependencyOutcome {
                    import_path: import_path.clone(),
                    succeeded: false,
                    error: Some(cause),
                },
                Err(_) => DependencyOutcome {
                    import_path: import_path.clone(),
                    succeeded: false,
                    error: Some("download timed out".to_string()),
                },
            };
            outcomes.push(outcome);
        }

        self.active.write().await.remove(&job.cache_key);

        let result = DependencyDownloadResult {
            request_id: job.request_id,
            cache_key: job.cache_key,
            outcomes,
        };
        let _ = job.result_chan.send(result);
    }

    /// Closes intake and waits up to `timeout` for in-flight jobs to drain.
    pub async fn shutdown(&self, drain_timeout: Duration) -> Result<(), QueueError> {
        let wait_for_drain = async {
            loop {
                if self.active.read().await.is_empty() {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        };

        timeout(drain_timeout, wait_for_drain)
            .await
            .map_err(|_| QueueError::ShutdownTimedOut)
    }
}

async fn run_with_retries(
    fetcher: &Fetcher<'_>,
    work_dir: &std::path::Path,
    import_path: &str,
    retry_attempts: u32,
) -> Result<(), String> {
    let mut last_error = String::new();
    for attempt in 0..=retry_attempts {
        match fetcher.fetch_single_missing(work_dir, import_path) {
            Ok(_) => return Ok(()),
            Err(e) => {
                last_error = e.to_string();
                tracing::debug!(import_path, attempt, error = %last_error, "dependency download attempt failed");
            }
        }
    }
    Err(last_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn submit_rejects_duplicate_active_key() {
        let queue = DependencyQueue::new(QueueConfig::default());
        let key = CacheKey::package("m/pkg");

        let (tx1, _rx1) = oneshot::channel();
        queue
            .submit(DownloadRequest {
                request_id: "r1".into(),
                cache_key: key.clone(),
                work_dir: std::path::PathBuf::from("."),
                dependencies: vec![],
                result_chan: tx1,
            })
            .await
            .unwrap();

        let (tx2, _rx2) = oneshot::channel();
        let err = queue
            .submit(DownloadRequest {
                request_id: "r2".into(),
                cache_key: key,
                work_dir: std::path::PathBuf::from("."),
                dependencies: vec![],
                result_chan: tx2,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::AlreadyInProgress(_)));
    }

    #[tokio::test]
    async fn submit_rejects_when_queue_full() {
        let queue = DependencyQueue::new(QueueConfig {
            max_concurrent_downloads: 1,
            download_timeout: Duration::from_secs(1),
            queue_size: 1,
            retry_attempts: 0,
        });

        let (tx1, _rx1) = oneshot::channel();
        queue
            .submit(DownloadRequest {
                request_id: "r1".into(),
                cache_key: CacheKey::package("a"),
                work_dir: std::path::PathBuf::from("."),
                dependencies: vec![],
                result_chan: tx1,
            })
            .await
            .unwrap();

        let (tx2, _rx2) = oneshot::channel();
        let err = queue
            .submit(DownloadRequest {
                request_id: "r2".into(),
                cache_key: CacheKey::package("b"),
                work_dir: std::path::PathBuf::from("."),
                dependencies: vec![],
                result_chan: tx2,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::QueueFull { .. }));
    }

    #[tokio::test]
    async fn shutdown_returns_immediately_when_nothing_active() {
        let queue = DependencyQueue::new(QueueConfig::default());
        assert!(queue.shutdown(Duration::from_millis(100)).await.is_ok());
    }
}
