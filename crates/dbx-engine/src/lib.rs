//! Live Dropbox ignore engine.
//!
//! One [`IgnoreEngine`] per watched root keeps the `com.dropbox.ignored`
//! markers under that root in line with the `.dropboxignore` files found in
//! it. All engines of a process share two [`ObservableSet`]s through
//! [`SharedSets`]: the paths currently ignored and the known rule files.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐   ChangeEvent    ┌──────────────────────────────────┐
//! │ ChangeWatcher │ ───────────────► │ IgnoreEngine (one per root)      │
//! └───────────────┘                  │  RuleFileRegistry  dir -> rules  │
//!                                    │  should_ignore / walk / events   │
//!                                    └───────┬──────────────┬───────────┘
//!                                            │              │
//!                                   IgnoreMarker      SharedSets
//!                                   (xattr, ADS)      ignored_paths, rule_files
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use camino::Utf8Path;
//! use dbx_core::{EngineConfig, WatchConfig};
//! use dbx_engine::{watch_root, SharedSets};
//! use tokio_util::sync::CancellationToken;
//! use tokio_util::task::TaskTracker;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let sets = SharedSets::new();
//! let cancel = CancellationToken::new();
//! let tracker = TaskTracker::new();
//! let marker = dbx_marker::platform_marker()?;
//!
//! watch_root(
//!     Utf8Path::new("/home/u/Dropbox"),
//!     &EngineConfig::default(),
//!     &WatchConfig::default(),
//!     sets.clone(),
//!     marker,
//!     cancel.clone(),
//!     &tracker,
//! )
//! .await?;
//!
//! tokio::signal::ctrl_c().await?;
//! cancel.cancel();
//! tracker.close();
//! tracker.wait().await;
//! println!("{} paths ignored", sets.ignored_paths.len());
//! # Ok(())
//! # }
//! ```
//!
//! [`ObservableSet`]: dbx_core::ObservableSet

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod engine;
pub mod error;
pub mod registry;
mod run;

pub use engine::{resolve_root, IgnoreEngine, SharedSets};
pub use error::EngineError;
pub use registry::RuleFileRegistry;
pub use run::watch_root;
