//! Sandbox.
//!
//! Owns a base directory and a derived environment that redirects every
//! toolchain subprocess into it, so host-wide Go caches are never touched.
//! Modeled on `fs_utils::GitIgnoreChecker`'s "shell out with a scoped
//! `Command`" style, generalized to own the whole environment rather than
//! just one invocation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing::{debug, warn};

use crate::error::SandboxError;

/// The three directories the Go toolchain is redirected into.
#[derive(Debug, Clone)]
pub struct Sandbox {
    base_dir: PathBuf,
    gomodcache: PathBuf,
    gocache: PathBuf,
    gopath: PathBuf,
    env: HashMap<String, String>,
}

impl Sandbox {
    /// Creates the three subdirectories under `base_dir` and captures the
    /// environment every subprocess this sandbox runs will see. Directory
    /// creation failure is fatal (fail-fast).
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self, SandboxError> {
        let base_dir = base_dir.into();
        let gomodcache = base_dir.join("gomodcache");
        let gocache = base_dir.join("gocache");
        let gopath = base_dir.join("gopath");

        for dir in [&base_dir, &gomodcache, &gocache, &gopath] {
            std::fs::create_dir_all(dir).map_err(|e| SandboxError::CreateDir {
                path: dir.display().to_string(),
                cause: e.to_string(),
            })?;
        }

        let mut env = HashMap::new();
        env.insert("GOMODCACHE".to_string(), gomodcache.display().to_string());
        env.insert("GOCACHE".to_string(), gocache.display().to_string());
        env.insert("GOPATH".to_string(), gopath.display().to_string());
        env.insert("GO111MODULE".to_string(), "on".to_string());
        // Keep the sandbox fully offline-capable for already-cached modules
        // and let GOPROXY default through for first fetches; we never want
        // a sandboxed run silently falling back to a developer's own GOPATH.
        env.insert("GOFLAGS".to_string(), "-mod=mod".to_string());

        debug!(base = %base_dir.display(), "sandbox directories ready");

        Ok(Self {
            base_dir,
            gomodcache,
            gocache,
            gopath,
            env,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn gomodcache(&self) -> &Path {
        &self.gomodcache
    }

    pub fn env(&self) -> &HashMap<String, String> {
        &self.env
    }

    /// Builds a [`Command`] for `program` with this sandbox's environment
    /// applied and `current_dir` set to `work_dir`. Callers invoke `.output()`
    /// or `.status()` themselves so they can apply their own timeout/kill
    /// strategy (the sandbox itself is not cancellation-aware; see
    /// `queue::LoadingJob` for that).
    pub fn command(&self, program: &str, work_dir: &Path) -> Command {
        let mut cmd = Command::new(program);
        cmd.current_dir(work_dir);
        cmd.envs(&self.env);
        cmd
    }

    pub fn exec(&self, program: &str, work_dir: &Path, args: &[&str]) -> std::io::Result<Output> {
        self.command(program, work_dir).args(args).output()
    }

    /// Removes the base directory. The Go module cache is written read-only
    /// by the toolchain, so every entry's permissions are lifted first;
    /// chmod failures are logged and cleanup proceeds regardless.
    pub fn cleanup(&self) {
        if !self.base_dir.exists() {
            return;
        }
        if let Err(e) = lift_read_only(&self.base_dir) {
            warn!(base = %self.base_dir.display(), error = %e, "failed to lift read-only bits before cleanup");
        }
        if let Err(e) = std::fs::remove_dir_all(&self.base_dir) {
            warn!(base = %self.base_dir.display(), error = %e, "sandbox cleanup could not fully remove base directory");
        }
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(unix)]
fn lift_read_only(root: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if let Ok(meta) = path.metadata() {
            let mut perms = meta.permissions();
            if perms.mode() & 0o200 == 0 {
                perms.set_mode(perms.mode() | 0o200);
                let _ = std::fs::set_permissions(path, perms);
            }
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn lift_read_only(root: &Path) -> std::io::Result<()> {
    for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if let Ok(meta) = path.metadata() {
            let mut perms = meta.permissions();
            if perms.readonly() {
                perms.set_readonly(false);
                let _ = std::fs::set_permissions(path, perms);
            }
        }
    }
    Ok(())
}
