//! Module fetcher.
//!
//! Downloads `module@version` into the sandbox's module cache via `go mod
//! download -json`, falling back to a shallow VCS clone when that fails and
//! the module path looks like a recognized host. Every subprocess this
//! module runs goes through [`Sandbox::exec`] so it never touches a
//! developer's own `$GOPATH`/`$GOMODCACHE`.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::FetchError;
use crate::sandbox::Sandbox;

/// The on-disk result of a successful fetch.
#[derive(Debug, Clone)]
pub struct ModuleOnDisk {
    pub dir: PathBuf,
    pub resolved_version: String,
    pub manifest_path: PathBuf,
    pub sum: String,
}

/// Shape of one JSON object emitted by `go mod download -json`.
#[derive(Debug, Deserialize)]
struct GoModDownloadJson {
    #[serde(rename = "Dir")]
    dir: Option<String>,
    #[serde(rename = "Version")]
    version: Option<String>,
    #[serde(rename = "GoMod")]
    go_mod: Option<String>,
    #[serde(rename = "Sum")]
    sum: Option<String>,
    #[serde(rename = "Error")]
    error: Option<String>,
}

pub struct Fetcher<'s> {
    sandbox: &'s Sandbox,
}

impl<'s> Fetcher<'s> {
    pub fn new(sandbox: &'s Sandbox) -> Self {
        Self { sandbox }
    }

    /// `fetch(module@version) -> ModuleOnDisk`. Tries the module-proxy
    /// download first; on failure, falls back to a shallow clone at the
    /// matching tag when the module host is a recognized VCS pattern.
    pub fn fetch(&self, module: &str, version: &str) -> Result<ModuleOnDisk, FetchError> {
        let spec = format!("{module}@{version}");
        match self.download_via_proxy(&spec, module) {
            Ok(on_disk) => Ok(on_disk),
            Err(proxy_err) => {
                if let Some(repo_url) = vcs_clone_url(module) {
                    self.clone_by_tag(module, version, &repo_url)
                        .map_err(|cause| FetchError::VcsFallback {
                            module: module.to_string(),
                            cause: cause.to_string(),
                        })
                } else {
                    Err(proxy_err)
                }
            }
        }
    }

    /// Performs only the module-download step (no VCS fallback); this is
    /// the operation the dependency queue drives for each missing import it
    /// downloads in the background.
    pub fn fetch_single_missing(
        &self,
        work_dir: &Path,
        import_path: &str,
    ) -> Result<ModuleOnDisk, FetchError> {
        self.download_json(work_dir, import_path)
    }

    fn download_via_proxy(&self, spec: &str, module: &str) -> Result<ModuleOnDisk, FetchError> {
        self.download_json(self.sandbox.base_dir(), spec)
            .map_err(|e| match e {
                FetchError::Download { cause, .. } => FetchError::Download {
                    module: module.to_string(),
                    cause,
                },
                other => other,
            })
    }

    fn download_json(&self, work_dir: &Path, spec: &str) -> Result<ModuleOnDisk, FetchError> {
        let output = self
            .sandbox
            .exec("go", work_dir, &["mod", "download", "-json", spec])
            .map_err(|e| FetchError::Download {
                module: spec.to_string(),
                cause: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let parsed: GoModDownloadJson =
            serde_json::from_str(stdout.trim()).map_err(|e| FetchError::Download {
                module: spec.to_string(),
                cause: format!("could not parse `go mod download -json` output: {e}"),
            })?;

        if let Some(err) = parsed.error {
            return Err(FetchError::Download {
                module: spec.to_string(),
                cause: err,
            });
        }

        let dir = parsed.dir.ok_or_else(|| FetchError::Download {
            module: spec.to_string(),
            cause: "no Dir field in go mod download output".to_string(),
        })?;
        let dir_path = PathBuf::from(&dir);
        if !dir_path.exists() {
            return Err(FetchError::MissingDir {
                module: spec.to_string(),
                path: dir,
            });
        }

        Ok(ModuleOnDisk {
            dir: dir_path,
            resolved_version: parsed.version.unwrap_or_default(),
            manifest_path: parsed.go_mod.map(PathBuf::from).unwrap_or_default(),
            sum: parsed.sum.unwrap_or_default(),
        })
    }

    fn clone_by_tag(
        &self,
        module: &str,
        version: &str,
        repo_url: &str,
    ) -> Result<ModuleOnDisk, git2::Error> {
        let dest = self
            .sandbox
            .base_dir()
            .join("vcs-fallback")
            .join(sanitize_for_path(module))
            .join(sanitize_for_path(version));
        std::fs::create_dir_all(&dest).map_err(|e| git2::Error::from_str(&e.to_string()))?;

        let mut builder = git2::build::RepoBuilder::new();
        builder.branch(version);
        let repo = builder.clone(repo_url, &dest)?;
        let head = repo.head()?.peel_to_commit()?;

        Ok(ModuleOnDisk {
            dir: dest,
            resolved_version: head.id().to_string(),
            manifest_path: PathBuf::new(),
            sum: String::new(),
        })
    }
}

/// Recognizes hosts whose module path maps directly onto a clone URL
/// (`github.com/owner/repo`-shaped paths). Anything else returns `None` and
/// the VCS fallback is skipped entirely.
fn vcs_clone_url(module: &str) -> Option<String> {
    let known_hosts = ["github.com", "gitlab.com", "bitbucket.org"];
    let mut segments = module.splitn(4, '/');
    let host = segments.next()?;
    if !known_hosts.contains(&host) {
        return None;
    }
    let owner = segments.next()?;
    let repo = segments.next()?;
    Some(format!("https://{host}/{owner}/{repo}.git"))
}

fn sanitize_for_path(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}
