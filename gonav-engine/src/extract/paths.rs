//! External file-path recovery.
//!
//! Rewrites an absolute path inside the sandbox's module cache into a path
//! relative to the external module's root. Total and deterministic: every
//! input either produces a rewritten path or the empty string, never an
//! error.

use std::path::Path;

/// Strips `root` off an absolute path to get a repo-relative one. Empty
/// string when `abs_path` does not live under `root`.
pub fn relative_to_root(abs_path: &str, root: &Path) -> String {
    let root_str = root.to_string_lossy();
    if root_str.is_empty() {
        return String::new();
    }
    Path::new(abs_path)
        .strip_prefix(root.as_ref() as &Path)
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_default()
}

/// The module path (without version) and resolved version this absolute
/// path's enclosing `@`-versioned directory names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalLocation {
    pub module_path: String,
    pub version: String,
    pub relative_file: String,
}

/// Locates the substring matching the toolchain's module-cache root, advances
/// past the first `@` and the subsequent path separator, and treats the
/// remainder as the external-relative file path. Returns `None` when
/// `abs_path` does not live under `gomodcache` or has no recognizable
/// `@version` segment (generated sources, stdlib).
pub fn recover_external_location(abs_path: &str, gomodcache: &Path) -> Option<ExternalLocation> {
    let gomodcache_str = gomodcache.to_string_lossy();
    if gomodcache_str.is_empty() || !abs_path.starts_with(gomodcache_str.as_ref()) {
        return None;
    }

    let rest = abs_path[gomodcache_str.len()..].trim_start_matches(['/', '\\']);
    let at_idx = rest.find('@')?;
    let module_path = rest[..at_idx].trim_end_matches(['/', '\\']).replace('\\', "/");
    if module_path.is_empty() {
        return None;
    }

    let after_at = &rest[at_idx + 1..];
    let sep_idx = after_at.find(['/', '\\'])?;
    let version = after_at[..sep_idx].to_string();
    let relative_file = after_at[sep_idx + 1..].replace('\\', "/");
    if version.is_empty() || relative_file.is_empty() {
        return None;
    }

    Some(ExternalLocation {
        module_path,
        version,
        relative_file,
    })
}

/// Builds the `import_path/sub@version` package label shown in Scenario E,
/// from a recovered location and the owning import path (which may name a
/// subpackage deeper than the module root).
pub fn external_package_label(import_path: &str, version: &str) -> String {
    format!("{import_path}@{version}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_to_root_strips_prefix() {
        let root = Path::new("/repo");
        assert_eq!(relative_to_root("/repo/pkg/main.go", root), "pkg/main.go");
    }

    #[test]
    fn relative_to_root_empty_when_outside() {
        let root = Path::new("/repo");
        assert_eq!(relative_to_root("/elsewhere/main.go", root), "");
    }

    #[test]
    fn recovers_external_location_scenario_e() {
        let gomodcache = Path::new("/sbx/gomodcache");
        let abs = "/sbx/gomodcache/host.tld/owner/mod@v1.2.3/sub/dir/file.ext";
        let loc = recover_external_location(abs, gomodcache).unwrap();
        assert_eq!(loc.module_path, "host.tld/owner/mod");
        assert_eq!(loc.version, "v1.2.3");
        assert_eq!(loc.relative_file, "sub/dir/file.ext");
    }

    #[test]
    fn none_when_outside_module_cache() {
        let gomodcache = Path::new("/sbx/gomodcache");
        assert!(recover_external_location("/usr/local/go/src/fmt/print.go", gomodcache).is_none());
    }

    #[test]
    fn none_when_no_at_marker() {
        let gomodcache = Path::new("/sbx/gomodcache");
        assert!(recover_external_location("/sbx/gomodcache/host.tld/owner/mod/file.go", gomodcache).is_none());
    }
}
