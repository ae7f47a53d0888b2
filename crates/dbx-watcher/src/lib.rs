//! Recursive change watcher with async event streaming.
//!
//! This crate subscribes to filesystem notifications for a directory tree via
//! the `notify` crate and streams them, normalized, to an async tokio context.
//!
//! # Overview
//!
//! - Every raw notification is reduced to a [`ChangeEvent`]: one UTF-8 path
//!   plus an [`Operations`] set of `CREATE`, `WRITE`, `REMOVE`, `RENAME`.
//! - Metadata and access notifications are dropped; close-after-write counts
//!   as `WRITE`.
//! - Backend errors arrive on a separate stream so they never block events.
//!
//! Events are not debounced: consumers that decide per path need to see
//! every create, rename, and removal.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                Blocking Thread (spawn_blocking)              │
//! │  ┌────────────────────┐    ┌──────────────────────────────┐  │
//! │  │ RecommendedWatcher │ -> │ Callback (kind -> Operations)│  │
//! │  │ (notify)           │    └──────────┬─────────┬─────────┘  │
//! │  └────────────────────┘               │ events  │ errors     │
//! └───────────────────────────────────────│─────────│────────────┘
//!                           blocking_send ▼         ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Async Runtime (tokio)                    │
//! │  ChangeWatcher::recv()          ChangeWatcher::take_errors() │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use camino::Utf8Path;
//! use dbx_core::WatchConfig;
//! use dbx_watcher::{ChangeWatcher, Operations};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut watcher = ChangeWatcher::new(Utf8Path::new("/home/u/Dropbox"), &WatchConfig::default()).await?;
//!
//!     while let Some(event) = watcher.recv().await {
//!         if event.ops.contains(Operations::CREATE) {
//!             println!("created: {}", event.path);
//!         }
//!     }
//!
//!     watcher.shutdown().await?;
//!     Ok(())
//! }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod watcher;

pub use error::WatchError;
pub use events::{ChangeEvent, Operations};
pub use watcher::ChangeWatcher;
