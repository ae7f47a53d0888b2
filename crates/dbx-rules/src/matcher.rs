//! Matching absolute paths against compiled rule sets.

use std::fmt;

use camino::Utf8Path;
use globset::GlobSet;

use crate::compiler::build_glob;
use crate::path::to_slash;

/// The compiled rules of one rule file.
///
/// Holds the translated glob strings (used for equality and diagnostics) and
/// one combined matcher. Two sets compare equal when their glob lists are
/// identical, which is how a rewritten-but-unchanged rule file is detected.
#[derive(Clone)]
pub struct CompiledRuleSet {
    patterns: Vec<String>,
    matcher: GlobSet,
}

impl CompiledRuleSet {
    pub(crate) fn new(patterns: Vec<String>, matcher: GlobSet) -> Self {
        Self { patterns, matcher }
    }

    /// Creates a set that matches nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new(), GlobSet::empty())
    }

    /// Returns the translated globs, in rule file order.
    #[must_use]
    #[inline]
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Returns the number of globs.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Returns `true` if the set has no globs.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Returns `true` if any glob matches the absolute `path`.
    ///
    /// The path is converted to forward slashes first. Matching is literal:
    /// the path is not cleaned and the filesystem is not consulted.
    #[must_use]
    pub fn is_ignored(&self, path: &Utf8Path) -> bool {
        !self.is_empty() && self.matcher.is_match(to_slash(path.as_str()).as_ref())
    }

    /// Merges `other` into this set, keeping the order of both.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Matcher`](crate::RuleError::Matcher) if the
    /// combined matcher cannot be built.
    pub fn extend(&mut self, other: &Self) -> Result<(), crate::RuleError> {
        let mut builder = globset::GlobSetBuilder::new();
        for pattern in self.patterns.iter().chain(&other.patterns) {
            builder.add(build_glob(pattern).map_err(crate::RuleError::Matcher)?);
        }
        self.matcher = builder.build().map_err(crate::RuleError::Matcher)?;
        self.patterns.extend(other.patterns.iter().cloned());
        Ok(())
    }
}

impl PartialEq for CompiledRuleSet {
    fn eq(&self, other: &Self) -> bool {
        self.patterns == other.patterns
    }
}

impl Eq for CompiledRuleSet {}

impl Default for CompiledRuleSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for CompiledRuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledRuleSet")
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

/// Returns `true` if any rule in `rules` matches `path`.
///
/// Free-function form of [`CompiledRuleSet::is_ignored`].
#[must_use]
pub fn is_ignored(rules: &CompiledRuleSet, path: &Utf8Path) -> bool {
    rules.is_ignored(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile_rules;

    fn rules(text: &str) -> CompiledRuleSet {
        compile_rules(text.as_bytes(), Utf8Path::new("/r")).expect("rules should compile")
    }

    fn check(rules: &CompiledRuleSet, cases: &[(&str, bool)]) {
        for (path, expected) in cases {
            assert_eq!(
                rules.is_ignored(Utf8Path::new(path)),
                *expected,
                "path {path} with {:?}",
                rules.patterns()
            );
        }
    }

    #[test]
    fn test_empty_set_matches_nothing() {
        let set = CompiledRuleSet::empty();
        assert!(!set.is_ignored(Utf8Path::new("/r/anything")));
        assert!(!is_ignored(&set, Utf8Path::new("/")));
    }

    #[test]
    fn test_base_name() {
        check(
            &rules("node_modules"),
            &[
                ("/r/node_modules", true),
                ("/r/sub", false),
                ("/r/sub/node_modules", true),
                ("/r/sub/node_modules/node_modules", true),
                ("/other/node_modules", false),
            ],
        );
    }

    #[test]
    fn test_asterisk_does_not_cross_separator() {
        check(
            &rules("*.exe\nn*.log"),
            &[
                ("/r/.exe", true),
                ("/r/go.exe", true),
                ("/r/bin/test.exe", true),
                ("/r/nothing.log", true),
                ("/r/something.log", false),
                ("/r/n/.log", false),
                ("/r/n/n.log", true),
            ],
        );
    }

    #[test]
    fn test_double_star_trailing_excludes_directory_itself() {
        check(
            &rules("abc/**"),
            &[("/r/abc", false), ("/r/abc/foo", true), ("/r/abc/foo/bar", true)],
        );
    }

    #[test]
    fn test_double_star_middle() {
        check(
            &rules("a/**/b"),
            &[
                ("/r/a", false),
                ("/r/a/b", true),
                ("/r/a/x", false),
                ("/r/a/x/y/b", true),
            ],
        );
    }

    #[test]
    fn test_double_star_leading() {
        check(
            &rules("**/foo/bar"),
            &[("/r/foo/bar", true), ("/r/bar/foo/bar", true), ("/r/bar/foo", false)],
        );
    }

    #[test]
    fn test_question_mark_does_not_cross_separator() {
        check(
            &rules("a?a\n?b\nc?"),
            &[
                ("/r/aza", true),
                ("/r/aa", false),
                ("/r/a/a", false),
                ("/r/zb", true),
                ("/r/a/b", false),
                ("/r/sub/cz", true),
            ],
        );
    }

    #[test]
    fn test_character_classes() {
        check(
            &rules("test.[!a-cx-z]"),
            &[
                ("/r/test.a", false),
                ("/r/test.d", true),
                ("/r/test.w", true),
                ("/r/test.y", false),
                ("/r/test.cd", false),
            ],
        );
        check(
            &rules("test.[a!]"),
            &[("/r/test.a", true), ("/r/test.!", true), ("/r/test.b", false)],
        );
    }

    #[test]
    fn test_escaped_brackets_are_literal() {
        check(
            &rules(r"test.\[ab\]"),
            &[("/r/test.[ab]", true), ("/r/test.a", false)],
        );
    }

    #[test]
    fn test_braces_are_literal() {
        check(
            &rules("test.{log,exe}"),
            &[
                ("/r/test.{log,exe}", true),
                ("/r/test.log", false),
                ("/r/test.exe", false),
            ],
        );
    }

    #[test]
    fn test_escaped_trailing_space() {
        check(
            &rules("post_spaces \\ "),
            &[
                ("/r/post_spaces", false),
                ("/r/post_spaces ", false),
                ("/r/post_spaces  ", true),
            ],
        );
    }

    #[test]
    fn test_extend_merges_sets() {
        let mut merged = rules("/a");
        let nested = compile_rules(b"/b", Utf8Path::new("/r/sub")).unwrap();
        merged.extend(&nested).unwrap();

        assert_eq!(merged.len(), 2);
        check(
            &merged,
            &[("/r/a", true), ("/r/sub/b", true), ("/r/b", false)],
        );
    }
}
