//! Slash-path helpers for building and matching globs.
//!
//! Globs always use `/` as the separator. Native paths are converted with
//! [`to_slash`], which is a no-op where `/` already is the separator (a `\` is
//! then an ordinary file name character).

use std::borrow::Cow;

/// Converts a native path string to forward slashes.
pub(crate) fn to_slash(path: &str) -> Cow<'_, str> {
    if std::path::MAIN_SEPARATOR == '/' {
        Cow::Borrowed(path)
    } else {
        Cow::Owned(path.replace(std::path::MAIN_SEPARATOR, "/"))
    }
}

/// Escapes glob metacharacters so `literal` matches only itself.
pub(crate) fn escape_glob_literal(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if matches!(c, '\\' | '*' | '?' | '[' | ']' | '{' | '}') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Lexically normalises a slash path.
///
/// Repeated separators collapse, `.` segments vanish, `..` removes the
/// preceding segment (and is dropped at the root of an absolute path), and a
/// trailing separator is removed. An empty result is `.`.
pub(crate) fn clean(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if rooted => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let body = segments.join("/");
    match (rooted, body.is_empty()) {
        (true, _) => format!("/{body}"),
        (false, true) => ".".to_owned(),
        (false, false) => body,
    }
}

/// Joins two slash paths and normalises the result with [`clean`].
///
/// Empty elements are ignored; joining two empty elements yields an empty
/// string.
pub(crate) fn join_clean(base: &str, rest: &str) -> String {
    match (base.is_empty(), rest.is_empty()) {
        (true, true) => String::new(),
        (true, false) => clean(rest),
        (false, true) => clean(base),
        (false, false) => clean(&format!("{base}/{rest}")),
    }
}
