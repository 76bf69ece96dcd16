//! Module metadata.
//!
//! Parses a `go.mod`-shaped manifest: the module path, `require` lines
//! (with an optional `// indirect` marker we ignore), and `replace`
//! directives. We hand-roll this parser rather than pull in a `go.mod`
//! crate — the grammar actually used here (three directive kinds, one
//! nesting level of parens) is small enough that a dependency would buy
//! nothing worth the extra coupling.

use std::collections::HashMap;

/// `module_path`, `required` dependency versions, and `replace` directives
/// parsed from one `go.mod`-shaped file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleMetadata {
    module_path: String,
    required: HashMap<String, String>,
    replace: HashMap<String, String>,
}

impl ModuleMetadata {
    /// Parses empty input as an empty (but valid) manifest: every import is
    /// then classified as external by [`Self::is_external`], since an empty
    /// module path can never prefix a well-formed import path.
    pub fn parse(contents: &str) -> Self {
        let mut module_path = String::new();
        let mut required = HashMap::new();
        let mut replace = HashMap::new();
        let mut in_require_block = false;
        let mut in_replace_block = false;

        for raw_line in contents.lines() {
            let line = strip_comment(raw_line).trim();
            if line.is_empty() {
                continue;
            }

            if let Some(rest) = line.strip_prefix("module ") {
                module_path = rest.trim().to_string();
                continue;
            }

            if line == "require (" {
                in_require_block = true;
                continue;
            }
            if line == "replace (" {
                in_replace_block = true;
                continue;
            }
            if line == ")" {
                in_require_block = false;
                in_replace_block = false;
                continue;
            }

            if in_require_block {
                parse_require_entry(line, &mut required);
                continue;
            }
            if in_replace_block {
                parse_replace_entry(line, &mut replace);
                continue;
            }

            if let Some(rest) = line.strip_prefix("require ") {
                parse_require_entry(rest, &mut required);
                continue;
            }
            if let Some(rest) = line.strip_prefix("replace ") {
                parse_replace_entry(rest, &mut replace);
                continue;
            }
        }

        Self {
            module_path,
            required,
            replace,
        }
    }

    pub fn module_path(&self) -> &str {
        &self.module_path
    }

    /// True iff `import_path` is not equal to, nor a slash-prefixed
    /// descendant of, the module path.
    pub fn is_external(&self, import_path: &str) -> bool {
        if self.module_path.is_empty() {
            return true;
        }
        if import_path == self.module_path {
            return false;
        }
        !import_path.starts_with(&format!("{}/", self.module_path))
    }

    /// Applies any `replace` directive first, then looks up the
    /// required-version list. `("", "")` on miss.
    pub fn resolve(&self, import_path: &str) -> (String, String) {
        let owning_module = self.owning_module_path(import_path);
        if let Some(replaced) = self.replace.get(&owning_module) {
            return (owning_module, replaced.clone());
        }
        if let Some(version) = self.required.get(&owning_module) {
            return (owning_module, version.clone());
        }
        (String::new(), String::new())
    }

    /// Required-dependency versions don't key by exact import path (a
    /// module can export many packages); walk `required` for the longest
    /// matching prefix of `import_path`.
    fn owning_module_path(&self, import_path: &str) -> String {
        self.required
            .keys()
            .filter(|m| import_path == m.as_str() || import_path.starts_with(&format!("{}/", m)))
            .max_by_key(|m| m.len())
            .cloned()
            .unwrap_or_else(|| import_path.to_string())
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn parse_require_entry(entry: &str, out: &mut HashMap<String, String>) {
    let mut parts = entry.split_whitespace();
    if let (Some(path), Some(version)) = (parts.next(), parts.next()) {
        out.insert(path.to_string(), version.to_string());
    }
}

fn parse_replace_entry(entry: &str, out: &mut HashMap<String, String>) {
    // `old[ oldver] => new[ newver]`
    let Some((lhs, rhs)) = entry.split_once("=>") else {
        return;
    };
    let old_path = lhs.split_whitespace().next().unwrap_or("").to_string();
    let mut rhs_parts = rhs.split_whitespace();
    let Some(new_path) = rhs_parts.next() else {
        return;
    };
    let new_version = rhs_parts.next().unwrap_or(new_path).to_string();
    if old_path.is_empty() {
        return;
    }
    out.insert(old_path, new_version);
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
module example.com/complete.test

go 1.22

require (
	example.com/missing v1.0.0
	example.com/other v0.3.1 // indirect
)

replace example.com/other => example.com/other-fork v0.3.2
"#;

    #[test]
    fn parses_module_path() {
        let meta = ModuleMetadata::parse(MANIFEST);
        assert_eq!(meta.module_path(), "example.com/complete.test");
    }

    #[test]
    fn is_external_classifies_internal_vs_external() {
        let meta = ModuleMetadata::parse(MANIFEST);
        assert!(!meta.is_external("example.com/complete.test"));
        assert!(!meta.is_external("example.com/complete.test/sub"));
        assert!(meta.is_external("example.com/missing/lib"));
    }

    #[test]
    fn empty_manifest_treats_everything_external() {
        let meta = ModuleMetadata::parse("");
        assert!(meta.is_external("anything"));
        assert_eq!(meta.resolve("anything"), (String::new(), String::new()));
    }

    #[test]
    fn resolve_applies_replace_over_require() {
        let meta = ModuleMetadata::parse(MANIFEST);
        assert_eq!(
            meta.resolve("example.com/other"),
            ("example.com/other".to_string(), "v0.3.2".to_string())
        );
        assert_eq!(
            meta.resolve("example.com/missing/lib"),
            ("example.com/missing".to_string(), "v1.0.0".to_string())
        );
    }

    #[test]
    fn resolve_miss_returns_empty_pair() {
        let meta = ModuleMetadata::parse(MANIFEST);
        assert_eq!(meta.resolve("example.com/unknown"), (String::new(), String::new()));
    }
}
