//! Cache key shapes.
//!
//! A [`CacheKey`] identifies one analysis target: either a whole package, or
//! a single file within a package. Its string form (`key.to_string()`) is
//! what the revision cache and the dependency queue's active-set key off of.

use std::fmt;

/// Which kind of analysis target a [`CacheKey`] names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisKind {
    Package,
    File,
}

/// `{ kind, package_path, file_path? }` — identifies one analysis target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: AnalysisKind,
    pub package_path: String,
    pub file_path: Option<String>,
}

impl CacheKey {
    pub fn package(package_path: impl Into<String>) -> Self {
        Self {
            kind: AnalysisKind::Package,
            package_path: package_path.into(),
            file_path: None,
        }
    }

    pub fn file(package_path: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            kind: AnalysisKind::File,
            package_path: package_path.into(),
            file_path: Some(file_path.into()),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            AnalysisKind::Package => write!(f, "package:{}", self.package_path),
            AnalysisKind::File => write!(
                f,
                "file:{}:{}",
                self.package_path,
                self.file_path.as_deref().unwrap_or("")
            ),
        }
    }
}
