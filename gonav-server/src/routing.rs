//! Splits a merged `{module@version}/{trailing path}` URL segment by
//! locating the `@`, then the first `/` after it.

use gonav_common::model::ModuleAtVersion;

use crate::error::BadRequest;

/// `rest` is the full, percent-decoded remainder of the URL path after the
/// endpoint prefix (e.g. `example.com/m@v1.2.3/sub/pkg`). Returns the parsed
/// module and whatever trailing path segment follows it (empty if none).
pub fn split_module_and_trailing(rest: &str) -> Result<(ModuleAtVersion, String), BadRequest> {
    let at = rest
        .find('@')
        .ok_or_else(|| BadRequest(format!("missing '@version' in '{rest}'")))?;

    let after_at = &rest[at + 1..];
    let (version, trailing) = match after_at.find('/') {
        Some(slash) => (&after_at[..slash], after_at[slash + 1..].to_string()),
        None => (after_at, String::new()),
    };

    let module_path = &rest[..at];
    if module_path.is_empty() || version.is_empty() {
        return Err(BadRequest(format!("malformed module@version in '{rest}'")));
    }

    Ok((ModuleAtVersion::new(module_path, version), trailing))
}
