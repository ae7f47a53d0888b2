//! Error types for the dbx-rules crate.

use camino::Utf8PathBuf;

/// Errors that can occur while reading or compiling a rule file.
///
/// A rule file that fails to compile is rejected as a whole; callers keep
/// whatever rules they had before.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use dbx_rules::{compile_rules, RuleError};
///
/// let err = compile_rules(b"!keep-me\n", Utf8Path::new("/dropbox")).unwrap_err();
/// assert!(matches!(err, RuleError::Negation { line: 1, .. }));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// The line starts with `!`, which is not supported.
    #[error("negation is not supported (line {line}): {content}")]
    Negation {
        /// One-based line number.
        line: usize,
        /// The offending line.
        content: String,
    },

    /// The translated glob is not a valid pattern.
    #[error("invalid pattern at line {line}: {pattern} created by line: {content}")]
    InvalidPattern {
        /// One-based line number.
        line: usize,
        /// The translated glob.
        pattern: String,
        /// The line it was translated from.
        content: String,
        /// The glob compiler's diagnosis.
        #[source]
        source: globset::Error,
    },

    /// The compiled globs could not be combined into one matcher.
    #[error("failed to build matcher: {0}")]
    Matcher(#[source] globset::Error),

    /// The rule file could not be read.
    #[error("failed to read rule file {path}: {source}")]
    Read {
        /// The rule file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl RuleError {
    /// Returns `true` if the rule file did not exist when it was read.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Read { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }

    /// Returns the one-based line number the error refers to, if any.
    #[must_use]
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Negation { line, .. } | Self::InvalidPattern { line, .. } => Some(*line),
            Self::Matcher(_) | Self::Read { .. } => None,
        }
    }
}
