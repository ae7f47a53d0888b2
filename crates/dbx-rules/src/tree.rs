//! Collection of every rule file below a root into one rule set.

use camino::{Utf8Path, Utf8PathBuf};
use walkdir::WalkDir;

use crate::compiler::compile_rule_file;
use crate::error::RuleError;
use crate::matcher::CompiledRuleSet;

/// Walks `root` and merges every rule file named `rule_file_name` into one set.
///
/// Directories already matched by the rules collected so far are not
/// descended into, so rule files inside ignored directories have no effect.
/// Entries that vanish during the walk and non-UTF-8 paths are skipped.
///
/// # Errors
///
/// Returns the first [`RuleError`] of a rule file that exists but cannot be
/// read or compiled, or [`RuleError::Read`] if `root` itself cannot be walked.
pub fn collect_rules(root: &Utf8Path, rule_file_name: &str) -> Result<CompiledRuleSet, RuleError> {
    let mut merged = CompiledRuleSet::empty();
    let mut files = 0usize;
    let mut entries = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = entries.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                return Err(RuleError::Read {
                    path: root.to_owned(),
                    source: err.into(),
                });
            }
            Err(err) => {
                tracing::debug!(error = %err, "Skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        let Some(dir) = Utf8Path::from_path(entry.path()) else {
            tracing::warn!(path = %entry.path().display(), "Skipping non-UTF-8 directory");
            entries.skip_current_dir();
            continue;
        };
        if merged.is_ignored(dir) {
            entries.skip_current_dir();
            continue;
        }

        let file: Utf8PathBuf = dir.join(rule_file_name);
        match compile_rule_file(&file) {
            Ok(rules) => {
                merged.extend(&rules)?;
                files += 1;
            }
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err),
        }
    }

    tracing::debug!(root = %root, files, patterns = merged.len(), "Collected rule files");
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn temp_root() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).expect("Invalid path");
        (dir, root)
    }

    #[test]
    fn test_collect_nested_rule_files() {
        let (_dir, root) = temp_root();
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join(".gitignore"), "a").unwrap();
        fs::write(root.join("sub").join(".gitignore"), "b").unwrap();

        let rules = collect_rules(&root, ".gitignore").unwrap();
        assert_eq!(rules.len(), 2);
        assert!(rules.is_ignored(&root.join("sub").join("b")));
        assert!(!rules.is_ignored(&root.join("b")));
    }

    #[test]
    fn test_rule_files_inside_ignored_directories_are_skipped() {
        let (_dir, root) = temp_root();
        fs::create_dir_all(root.join("vendor")).unwrap();
        fs::write(root.join(".gitignore"), "/vendor").unwrap();
        fs::write(root.join("vendor").join(".gitignore"), "*").unwrap();

        let rules = collect_rules(&root, ".gitignore").unwrap();
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn test_invalid_rule_file_is_an_error() {
        let (_dir, root) = temp_root();
        fs::write(root.join(".gitignore"), "!nope").unwrap();

        let err = collect_rules(&root, ".gitignore").unwrap_err();
        assert!(matches!(err, RuleError::Negation { .. }));
    }

    #[test]
    fn test_missing_root() {
        let err = collect_rules(Utf8Path::new("/nonexistent/root"), ".gitignore").unwrap_err();
        assert!(err.is_not_found());
    }
}
