//! Store keys and the line formats used by the plain-text entries.

use sha2::{Digest, Sha256};

pub const BOM_MANAGED_KEYS: &str = "bom-managed-keys";
pub const TEST_PARENT_MANAGED_KEYS: &str = "test-parent-managed-keys";
pub const CORE_EXTENSIONS: &str = "core-extensions";
pub const INTEGRATION_TEST_MODULES: &str = "integration-test-modules";
pub const PARENT_PLUGIN_VERSIONS: &str = "parent-plugin-versions";
pub const BUILD_PARENT: &str = "build-parent.json";
pub const PARENT_SKELETON: &str = "parent-skeleton.json";
pub const EXTRACTION_SUMMARY: &str = "extraction-summary";

pub const AUDIT_PARTIALS: &str = "partial/audit";
pub const PARENT_PARTIALS: &str = "partial/parent";
pub const TARGET_PATH_CLAIMS: &str = "target-paths";

/// Separator in `parent-plugin-versions` lines.
pub const ENTRY_SEPARATOR: char = ';';

/// Pass names used in "run X first" errors.
pub mod pass {
    pub const INIT: &str = "init";
    pub const COLLECT: &str = "collect";
}

pub fn audit_partial(module_id: &str) -> String {
    format!("{}/{}.json", AUDIT_PARTIALS, module_id)
}

pub fn parent_partial(module_id: &str) -> String {
    format!("{}/{}.json", PARENT_PARTIALS, module_id)
}

/// Claim key for a target path; hashed so any path maps to one flat file name.
pub fn target_path_claim(target_path: &str) -> String {
    let digest = Sha256::digest(target_path.as_bytes());
    format!("{}/{}", TARGET_PATH_CLAIMS, hex::encode(digest))
}

/// Trimmed, non-blank lines; `#` starts a comment line.
pub fn parse_lines(contents: &str) -> impl Iterator<Item = &str> {
    contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
}

pub fn to_lines<I, T>(items: I) -> String
where
    I: IntoIterator<Item = T>,
    T: std::fmt::Display,
{
    let mut out = String::new();
    for item in items {
        out.push_str(&item.to_string());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_key_is_stable_and_flat() {
        let a = target_path_claim("extensions/arc-deployment");
        let b = target_path_claim("extensions/arc-deployment");
        assert_eq!(a, b);
        assert!(a.starts_with("target-paths/"));
        assert_eq!(a.len(), "target-paths/".len() + 64);
        assert_ne!(a, target_path_claim("extensions/arc-runtime"));
    }

    #[test]
    fn parse_lines_skips_blank_and_comments() {
        let lines: Vec<&str> = parse_lines("a\n\n  b  \n# note\n").collect();
        assert_eq!(lines, vec!["a", "b"]);
    }

    #[test]
    fn to_lines_terminates_each_item() {
        assert_eq!(to_lines(["x", "y"]), "x\ny\n");
        assert_eq!(to_lines(Vec::<String>::new()), "");
    }
}
