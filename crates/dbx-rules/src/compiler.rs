//! Translation of rule file text into anchored globs.
//!
//! [`compile_rules`] is a pure function of the file bytes and the directory
//! the file lives in. It either returns a complete [`CompiledRuleSet`] or the
//! first error; a partially valid file never yields partial rules.

use camino::Utf8Path;
use globset::{Glob, GlobBuilder, GlobSetBuilder};

use crate::error::RuleError;
use crate::matcher::CompiledRuleSet;
use crate::path::{escape_glob_literal, join_clean, to_slash};

/// Compiles the contents of a rule file located in `rule_dir`.
///
/// Every produced glob is absolute, anchored at `rule_dir`, and uses `/` as
/// separator regardless of platform.
///
/// # Errors
///
/// Returns [`RuleError::Negation`] for a line starting with `!` and
/// [`RuleError::InvalidPattern`] for a line whose translation is not a valid
/// glob (for example an unclosed `[`).
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use dbx_rules::compile_rules;
///
/// let rules = compile_rules(b"# build output\n/target\n*.tmp  \n", Utf8Path::new("/dropbox/rust"))?;
/// assert_eq!(rules.patterns(), ["/dropbox/rust/target", "/dropbox/rust/**/*.tmp"]);
/// # Ok::<(), dbx_rules::RuleError>(())
/// ```
pub fn compile_rules(bytes: &[u8], rule_dir: &Utf8Path) -> Result<CompiledRuleSet, RuleError> {
    let text = String::from_utf8_lossy(bytes);
    let dir_prefix = escape_glob_literal(&to_slash(rule_dir.as_str()));

    let mut patterns = Vec::new();
    let mut builder = GlobSetBuilder::new();

    for (index, raw) in text.split('\n').enumerate() {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        let line_number = index + 1;

        if line.starts_with('#') {
            continue;
        }
        if line.starts_with('!') {
            return Err(RuleError::Negation {
                line: line_number,
                content: line.to_owned(),
            });
        }

        let fragment = translate_line(line);
        if fragment.is_empty() {
            continue;
        }
        let fragment = if line.contains('/') {
            fragment
        } else {
            join_clean("**", &fragment)
        };
        let pattern = join_clean(&dir_prefix, &fragment);

        let glob = build_glob(&pattern).map_err(|source| RuleError::InvalidPattern {
            line: line_number,
            pattern: pattern.clone(),
            content: line.to_owned(),
            source,
        })?;
        builder.add(glob);
        patterns.push(pattern);
    }

    let matcher = builder.build().map_err(RuleError::Matcher)?;
    tracing::trace!(dir = %rule_dir, patterns = patterns.len(), "Compiled rule file");
    Ok(CompiledRuleSet::new(patterns, matcher))
}

/// Reads and compiles the rule file at `path`, anchored at its parent.
///
/// # Errors
///
/// Returns [`RuleError::Read`] if the file cannot be read (check
/// [`RuleError::is_not_found`]) and any error of [`compile_rules`].
pub fn compile_rule_file(path: &Utf8Path) -> Result<CompiledRuleSet, RuleError> {
    let bytes = std::fs::read(path).map_err(|source| RuleError::Read {
        path: path.to_owned(),
        source,
    })?;
    compile_rules(&bytes, path.parent().unwrap_or(path))
}

/// Builds one glob with `*`/`?` confined to a path segment and `\` escapes.
pub(crate) fn build_glob(pattern: &str) -> Result<Glob, globset::Error> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .backslash_escape(true)
        .build()
}

/// Translates one rule line into a relative glob fragment.
///
/// Escapes are copied verbatim and shield everything before them from the
/// trailing-space trim. A star run becomes `**` only when it fills a whole
/// path segment; any other run is a single `*`. A segment-filling run that
/// ends the line also matches everything beneath, but not the directory
/// itself.
fn translate_line(line: &str) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut kept = String::with_capacity(line.len() + 8);
    let mut pending = String::new();

    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => {
                if let Some(&escaped) = chars.get(i + 1) {
                    pending.push('\\');
                    pending.push(escaped);
                    kept.push_str(&pending);
                    pending.clear();
                    i += 1;
                }
            }
            '*' => {
                let start = i;
                while chars.get(i + 1) == Some(&'*') {
                    i += 1;
                }
                let run = i - start + 1;
                let at_segment_start = start == 0 || chars[start - 1] == '/';
                let next = chars.get(i + 1).copied();
                let at_segment_end = next.is_none() || next == Some('/');

                if run >= 2 && at_segment_start && at_segment_end {
                    pending.push_str("**");
                    if next.is_none() {
                        pending.push_str("/*");
                    }
                } else {
                    pending.push('*');
                }
            }
            brace @ ('{' | '}') => {
                pending.push('\\');
                pending.push(brace);
            }
            other => pending.push(other),
        }
        i += 1;
    }

    kept.push_str(pending.trim_end_matches(' '));
    kept
}
