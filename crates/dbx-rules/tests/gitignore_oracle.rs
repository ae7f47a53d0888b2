//! Rule semantics checked against fixed expectations and against `git`.
//!
//! Every case writes `.gitignore` files into a fresh directory tree, creates
//! the listed directories, and compares [`collect_rules`] with the expected
//! verdict. When `git` is installed the same tree is also checked with
//! `git check-ignore`, which must agree.
//!
//! Unix only: several cases need directory names with trailing spaces.

#![cfg(unix)]

use std::fs;
use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};
use dbx_rules::collect_rules;
use tempfile::TempDir;

const RULE_FILE: &str = ".gitignore";

struct Case {
    name: &'static str,
    /// `(directory relative to the root, rule file contents)`
    rule_files: &'static [(&'static str, &'static str)],
    /// `(path relative to the root, expected verdict)`
    paths: &'static [(&'static str, bool)],
}

const CASES: &[Case] = &[
    Case {
        name: "blank_lines",
        rule_files: &[("", "\n\n")],
        paths: &[("node_modules", false), ("sub", false), ("sub/node_modules", false)],
    },
    Case {
        name: "comment",
        rule_files: &[("", "#node_modules")],
        paths: &[("node_modules", false), ("sub/node_modules", false)],
    },
    Case {
        name: "comment_escaped",
        rule_files: &[("", "\\#node_modules")],
        paths: &[("#node_modules", true), ("node_modules", false)],
    },
    Case {
        name: "only_spaces",
        rule_files: &[("", "  ")],
        paths: &[(" ", false), ("  ", false)],
    },
    Case {
        name: "trailing_spaces",
        rule_files: &[("", "  pre_spaces\npost_spaces  ")],
        paths: &[
            ("  pre_spaces", true),
            (" pre_spaces", false),
            ("pre_spaces", false),
            ("post_spaces", true),
            ("post_spaces ", false),
            ("post_spaces  ", false),
        ],
    },
    Case {
        name: "trailing_spaces_escaped",
        rule_files: &[("", "\\  pre_spaces\npost_spaces \\ ")],
        paths: &[
            ("  pre_spaces", true),
            ("pre_spaces", false),
            ("post_spaces", false),
            ("post_spaces ", false),
            ("post_spaces  ", true),
            ("post_spaces   ", false),
        ],
    },
    Case {
        name: "negation_escaped",
        rule_files: &[("", "\\!important!.txt")],
        paths: &[("!important!.txt", true), ("important!.txt", false)],
    },
    Case {
        name: "space_before_bang",
        rule_files: &[("", " !important!.txt")],
        paths: &[(" !important!.txt", true), (" important!.txt", false)],
    },
    Case {
        name: "base_name",
        rule_files: &[("", "node_modules")],
        paths: &[
            ("node_modules", true),
            ("sub", false),
            ("sub/keep", false),
            ("sub/node_modules", true),
            ("sub/node_modules/node_modules", true),
        ],
    },
    Case {
        name: "base_name_and_subfolder",
        rule_files: &[("", "my_project/node_modules")],
        paths: &[
            ("node_modules", false),
            ("my_project", false),
            ("my_project/src", false),
            ("my_project/node_modules", true),
            ("sub/my_project/node_modules", false),
        ],
    },
    Case {
        name: "root_anchored",
        rule_files: &[("", "/node_modules")],
        paths: &[("node_modules", true), ("sub", false), ("sub/node_modules", false)],
    },
    Case {
        name: "nested_rule_files",
        rule_files: &[("", "a"), ("sub", "b")],
        paths: &[
            ("a", true),
            ("b", false),
            ("sub", false),
            ("sub/a", true),
            ("sub/b", true),
            ("sub/sub2/b", true),
            ("sub2", false),
            ("sub2/a", true),
            ("sub2/b", false),
        ],
    },
    Case {
        name: "nested_rule_files_anchored",
        rule_files: &[("", "/a"), ("sub", "/b")],
        paths: &[
            ("a", true),
            ("b", false),
            ("sub/a", false),
            ("sub/b", true),
            ("sub/sub2/b", false),
            ("sub2/b", false),
        ],
    },
    Case {
        name: "asterisk",
        rule_files: &[("", "*.exe\nn*.log")],
        paths: &[
            (".exe", true),
            ("go.exe", true),
            ("nothing.log", true),
            ("something.log", false),
            ("bin", false),
            ("bin/test.exe", true),
            ("n", false),
            ("n/.log", false),
            ("n/n.log", true),
            ("n/something.log", false),
        ],
    },
    Case {
        name: "double_star_leading",
        rule_files: &[("", "**/foo/bar")],
        paths: &[
            ("foo", false),
            ("foo/bar", true),
            ("bar/foo", false),
            ("bar/foo/bar", true),
        ],
    },
    Case {
        name: "double_star_trailing",
        rule_files: &[("", "abc/**")],
        paths: &[("abc", false), ("abc/foo", true), ("abc/bar", true)],
    },
    Case {
        name: "double_star_middle",
        rule_files: &[("", "a/**/b")],
        paths: &[
            ("a", false),
            ("a/b", true),
            ("a/x", false),
            ("a/x/b", true),
            ("a/x/y/b", true),
        ],
    },
    Case {
        name: "triple_star",
        rule_files: &[("", "***/foo/bar\nabc/***")],
        paths: &[
            ("foo/bar", true),
            ("bar/foo/bar", true),
            ("abc", false),
            ("abc/foo", true),
        ],
    },
    Case {
        name: "question_mark",
        rule_files: &[("", "a?a\n?b\nc?")],
        paths: &[
            ("aza", true),
            ("aa", false),
            ("a/a", false),
            ("zb", true),
            ("a/b", false),
            ("b", false),
            ("cz", true),
            ("sub/aza", true),
        ],
    },
    Case {
        name: "character_class",
        rule_files: &[("", "test.[ab]")],
        paths: &[
            ("test.a", true),
            ("test.b", true),
            ("test.ab", false),
            ("test.c", false),
        ],
    },
    Case {
        name: "character_class_negated_ranges",
        rule_files: &[("", "test.[!a-cx-z]")],
        paths: &[
            ("test.a", false),
            ("test.d", true),
            ("test.w", true),
            ("test.x", false),
            ("test.cd", false),
        ],
    },
    Case {
        name: "character_class_escaped_bang",
        rule_files: &[("", "test.[\\!]")],
        paths: &[("test.a", false), ("test.!", true)],
    },
    Case {
        name: "brackets_escaped",
        rule_files: &[("", "test.\\[ab\\]")],
        paths: &[("test.[ab]", true), ("test.a", false), ("test.ab", false)],
    },
    Case {
        name: "braces_literal",
        rule_files: &[("", "test.{log,exe}")],
        paths: &[
            ("test.exe", false),
            ("test.log", false),
            ("test.{log,exe}", true),
        ],
    },
    Case {
        name: "slash_only",
        rule_files: &[("", "/")],
        paths: &[("test.a", false)],
    },
];

/// Builds the case's tree and returns the temp dir guard and its UTF-8 root.
fn prepare(case: &Case) -> (TempDir, Utf8PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).expect("Invalid path");
    for (rel_dir, contents) in case.rule_files {
        let rule_dir = if rel_dir.is_empty() {
            root.clone()
        } else {
            root.join(rel_dir)
        };
        fs::create_dir_all(&rule_dir).expect("Failed to create rule directory");
        fs::write(rule_dir.join(RULE_FILE), contents).expect("Failed to write rule file");
    }
    for (rel_path, _) in case.paths {
        fs::create_dir_all(root.join(rel_path)).expect("Failed to create directory");
    }
    (dir, root)
}

fn git_available() -> bool {
    Command::new("git").arg("--version").output().is_ok_and(|o| o.status.success())
}

fn git(root: &Utf8Path, args: &[&str]) -> std::process::Output {
    Command::new("git")
        .args(args)
        .current_dir(root)
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .env("GIT_CONFIG_GLOBAL", root.join(".no-global-config"))
        .output()
        .expect("Failed to run git")
}

#[test]
fn test_rules_match_expected_verdicts() {
    for case in CASES {
        let (_dir, root) = prepare(case);
        let rules = collect_rules(&root, RULE_FILE).expect("rules should compile");
        for (rel_path, expected) in case.paths {
            let path = root.join(rel_path);
            assert_eq!(
                rules.is_ignored(&path),
                *expected,
                "case {}: {rel_path:?} with {:?}",
                case.name,
                rules.patterns()
            );
        }
    }
}

#[test]
fn test_rules_agree_with_git() {
    if !git_available() {
        eprintln!("git is not installed, skipping oracle comparison");
        return;
    }
    for case in CASES {
        let (_dir, root) = prepare(case);
        let init = git(&root, &["init", "--quiet"]);
        assert!(init.status.success(), "git init failed for {}", case.name);

        let rules = collect_rules(&root, RULE_FILE).expect("rules should compile");
        for (rel_path, _) in case.paths {
            let path = root.join(rel_path);
            let output = git(&root, &["check-ignore", "--quiet", rel_path]);
            let git_says = match output.status.code() {
                Some(0) => true,
                Some(1) => false,
                other => panic!(
                    "git check-ignore failed for {path} ({other:?}): {}",
                    String::from_utf8_lossy(&output.stderr)
                ),
            };
            assert_eq!(
                rules.is_ignored(&path),
                git_says,
                "case {}: git disagrees on {rel_path:?} with {:?}",
                case.name,
                rules.patterns()
            );
        }
    }
}
