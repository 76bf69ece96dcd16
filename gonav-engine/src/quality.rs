//! Quality assessor.
//!
//! Converts loader diagnostics into a [`Quality`] record: which imports are
//! missing, what mode the analysis landed in, and a 0..1 score.

use gonav_common::model::{AnalysisMode, ImportError, ImportSeverity, Quality};

use crate::loader::LoadedPackage;

const MISSING_IMPORT_MARKERS: &[&str] = &["could not import", "cannot find package", "no required module provides package"];

/// Builds a [`Quality`] record for one loaded package.
pub fn assess(pkg: &LoadedPackage) -> Quality {
    if !pkg.ast_available {
        return Quality::failed();
    }

    let mut missing_dependencies = Vec::new();
    let mut import_errors = Vec::new();

    for import in &pkg.imports {
        if let Some(err) = &import.error {
            if looks_like_missing_import(err) {
                missing_dependencies.push(import.import_path.clone());
            }
            import_errors.push(ImportError {
                import_path: import.import_path.clone(),
                error: err.clone(),
                position: None,
                severity: ImportSeverity::Error,
            });
        }
    }

    for err in &pkg.package_errors {
        if let Some(path) = extract_missing_import_path(err) {
            if !missing_dependencies.contains(&path) {
                missing_dependencies.push(path.clone());
            }
            import_errors.push(ImportError {
                import_path: path,
                error: err.clone(),
                position: None,
                severity: ImportSeverity::Error,
            });
        }
    }

    missing_dependencies.sort();
    missing_dependencies.dedup();

    let total_imports = pkg.imports.len();
    let failed_imports = missing_dependencies.len();

    let analysis_mode = if !pkg.type_info_available {
        AnalysisMode::SyntaxOnly
    } else if missing_dependencies.is_empty() {
        AnalysisMode::Complete
    } else {
        AnalysisMode::Partial
    };

    let quality_score = match analysis_mode {
        AnalysisMode::Complete => 1.0,
        AnalysisMode::SyntaxOnly => 0.0,
        AnalysisMode::Partial if total_imports == 0 => 0.8,
        AnalysisMode::Partial => {
            let successful = total_imports.saturating_sub(failed_imports);
            successful as f64 / total_imports as f64
        }
        AnalysisMode::Failed => 0.0,
    };

    let is_complete = missing_dependencies.is_empty() && analysis_mode == AnalysisMode::Complete;
    let enhancement_available =
        analysis_mode != AnalysisMode::Failed && !missing_dependencies.is_empty();

    Quality {
        is_complete,
        analysis_mode,
        quality_score,
        missing_dependencies,
        import_errors,
        enhancement_available,
    }
}

fn looks_like_missing_import(error_text: &str) -> bool {
    MISSING_IMPORT_MARKERS
        .iter()
        .any(|marker| error_text.contains(marker))
}

/// Best-effort extraction of an import path out of a package-level error
/// message shaped like `could not import example.com/missing/lib (...)`.
fn extract_missing_import_path(error_text: &str) -> Option<String> {
    if !looks_like_missing_import(error_text) {
        return None;
    }
    error_text
        .split_whitespace()
        .find(|token| token.contains('.') && token.contains('/'))
        .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric() && c != '/' && c != '.' && c != '_').to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::ImportDiagnostic;

    fn pkg(ast: bool, types: bool, imports: Vec<ImportDiagnostic>) -> LoadedPackage {
        LoadedPackage {
            ast_available: ast,
            type_info_available: types,
            imports,
            ..Default::default()
        }
    }

    #[test]
    fn no_ast_is_failed() {
        let q = assess(&pkg(false, false, vec![]));
        assert_eq!(q.analysis_mode, AnalysisMode::Failed);
        assert!(!q.is_complete);
        assert_eq!(q.quality_score, 0.0);
    }

    #[test]
    fn no_types_is_syntax_only() {
        let q = assess(&pkg(true, false, vec![]));
        assert_eq!(q.analysis_mode, AnalysisMode::SyntaxOnly);
        assert!(!q.is_complete);
    }

    #[test]
    fn clean_imports_is_complete() {
        let q = assess(&pkg(
            true,
            true,
            vec![ImportDiagnostic { import_path: "fmt".into(), error: None }],
        ));
        assert_eq!(q.analysis_mode, AnalysisMode::Complete);
        assert!(q.is_complete);
        assert_eq!(q.quality_score, 1.0);
    }

    #[test]
    fn missing_import_is_partial_with_score_and_enhancement() {
        let q = assess(&pkg(
            true,
            true,
            vec![
                ImportDiagnostic { import_path: "fmt".into(), error: None },
                ImportDiagnostic {
                    import_path: "example.com/missing/lib".into(),
                    error: Some("could not import example.com/missing/lib (no required module provides package)".into()),
                },
            ],
        ));
        assert_eq!(q.analysis_mode, AnalysisMode::Partial);
        assert!(!q.is_complete);
        assert!(q.enhancement_available);
        assert_eq!(q.missing_dependencies, vec!["example.com/missing/lib".to_string()]);
        assert_eq!(q.quality_score, 0.5);
        q.check_invariants().unwrap();
    }
}
