//! Core types, errors, and utilities for the dbx-ignore workspace.
//!
//! This crate provides the foundational pieces shared by the rule compiler,
//! the watcher, and the ignore engine:
//!
//! - [`Config`] and its sections, loaded from JSON with defaults
//! - [`ConfigError`] for configuration and discovery failures
//! - [`ObservableSet`], the sorted string set with change listeners used for
//!   the process-wide registries of ignored paths and rule files
//! - [`Debouncer`], a leading-edge rate limiter with one trailing call
//! - Dropbox `info.json` discovery of the folders to watch
//! - Type aliases for `FxHashMap`/`FxHashSet` (faster than std)

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod debounce;
pub mod dropbox;
pub mod error;
pub mod hash;
pub mod set;

pub use config::{Config, EngineConfig, ReportConfig, WatchConfig, DEFAULT_RULE_FILE_NAME};
pub use debounce::Debouncer;
pub use dropbox::{discover_dropbox_roots, info_json_locations, parse_info_json, DropboxAccount};
pub use error::ConfigError;
pub use hash::{fx_hash_map, fx_hash_set, FxHashMap, FxHashSet};
pub use set::{ListenerId, ObservableSet};
