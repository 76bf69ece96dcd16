//! Revision generator.
//!
//! A short content hash over the quality record, symbol counts, and
//! reference counts, stable under reordering of dependency lists.

use sha2::{Digest, Sha256};

use gonav_common::model::Quality;

/// `revision(key_subject, quality, symbol_count, ref_count)` — first 8 bytes
/// of a SHA-256 digest, hex-encoded, over a canonical serialization of the
/// inputs. Sorting `missing_dependencies` is essential: reordering the same
/// set must not change the revision.
pub fn revision(
    key_subject: &str,
    quality: &Quality,
    symbol_count: usize,
    ref_count: usize,
) -> String {
    let mut sorted_missing = quality.missing_dependencies.clone();
    sorted_missing.sort();

    let canonical = format!(
        "{subject}\u{1}{complete}\u{1}{mode:?}\u{1}{score:.3}\u{1}{missing}\u{1}{symbols}\u{1}{refs}",
        subject = key_subject,
        complete = quality.is_complete,
        mode = quality.analysis_mode,
        score = quality.quality_score,
        missing = sorted_missing.join(","),
        symbols = symbol_count,
        refs = ref_count,
    );

    let digest = Sha256::digest(canonical.as_bytes());
    hex_encode(&digest[..8])
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gonav_common::model::AnalysisMode;

    fn quality_with(missing: Vec<&str>) -> Quality {
        Quality {
            is_complete: missing.is_empty(),
            analysis_mode: if missing.is_empty() { AnalysisMode::Complete } else { AnalysisMode::Partial },
            quality_score: if missing.is_empty() { 1.0 } else { 0.5 },
            missing_dependencies: missing.into_iter().map(String::from).collect(),
            import_errors: vec![],
            enhancement_available: false,
        }
    }

    #[test]
    fn determinism_for_identical_inputs() {
        let q = quality_with(vec!["a", "b"]);
        assert_eq!(revision("pkg", &q, 3, 4), revision("pkg", &q, 3, 4));
    }

    #[test]
    fn stable_under_dependency_reordering() {
        let forward = quality_with(vec!["a", "b"]);
        let reversed = quality_with(vec!["b", "a"]);
        assert_eq!(revision("pkg", &forward, 3, 4), revision("pkg", &reversed, 3, 4));
    }

    #[test]
    fn sensitive_to_symbol_count() {
        let q = quality_with(vec![]);
        assert_ne!(revision("pkg", &q, 3, 4), revision("pkg", &q, 4, 4));
    }

    #[test]
    fn sensitive_to_missing_dependency_set() {
        let with_one = quality_with(vec!["a"]);
        let with_two = quality_with(vec!["a", "b"]);
        assert_ne!(revision("pkg", &with_one, 3, 4), revision("pkg", &with_two, 3, 4));
    }

    #[test]
    fn sensitive_to_key_subject() {
        let q = quality_with(vec![]);
        assert_ne!(revision("pkg-a", &q, 3, 4), revision("pkg-b", &q, 3, 4));
    }
}
