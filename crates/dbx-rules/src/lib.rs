//! Compiler and matcher for gitignore-style `.dropboxignore` rule files.
//!
//! A rule file lives in a directory and lists one pattern per line. Each line
//! is translated to an absolute glob anchored at that directory, so a compiled
//! rule set can be matched against absolute paths without knowing where it
//! came from.
//!
//! # Overview
//!
//! ```
//! use camino::Utf8Path;
//! use dbx_rules::compile_rules;
//!
//! let rules = compile_rules(b"node_modules\n/build\n*.log\n", Utf8Path::new("/dropbox/app"))?;
//!
//! assert!(rules.is_ignored(Utf8Path::new("/dropbox/app/web/node_modules")));
//! assert!(rules.is_ignored(Utf8Path::new("/dropbox/app/build")));
//! assert!(!rules.is_ignored(Utf8Path::new("/dropbox/app/web/build")));
//! assert!(rules.is_ignored(Utf8Path::new("/dropbox/app/logs/today.log")));
//! # Ok::<(), dbx_rules::RuleError>(())
//! ```
//!
//! # Line Translation
//!
//! | Input | Meaning |
//! |-------|---------|
//! | `# text` | Comment, skipped |
//! | `!pattern` | Negation, rejected with [`RuleError::Negation`] |
//! | `name` (no `/`) | Matches `name` at any depth below the directory |
//! | `/name`, `a/b` | Anchored to the directory |
//! | `*` | Any run of characters within one path segment |
//! | `**` | Any number of whole segments |
//! | trailing `**` | Everything below, but not the directory itself |
//! | `\X` | Literal `X` (also protects trailing spaces) |
//! | `{` `}` | Literal braces |
//! | `[abc]`, `[!abc]`, `?` | Character classes and single characters |
//!
//! Trailing unescaped spaces are trimmed. Lines that are empty after trimming
//! are skipped.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod compiler;
pub mod error;
pub mod matcher;
mod path;
pub mod tree;

pub use compiler::{compile_rule_file, compile_rules};
pub use error::RuleError;
pub use matcher::{is_ignored, CompiledRuleSet};
pub use tree::collect_rules;
