//! Running an engine against a live change stream.
//!
//! ```text
//!   watch_root
//!     ├── ChangeWatcher::new       subscribe first, so nothing is missed
//!     ├── IgnoreEngine::init       initial walk, on a blocking thread
//!     └── IgnoreEngine::listen
//!           ├── error drain task   logs watcher errors
//!           └── event loop         sole mutator of the engine
//!                 └── on cancel: shut the watcher down, hand the engine back
//! ```

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use dbx_core::{EngineConfig, WatchConfig};
use dbx_marker::IgnoreMarker;
use dbx_watcher::{ChangeWatcher, WatchError};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::engine::{resolve_root, IgnoreEngine, SharedSets};
use crate::error::EngineError;

impl IgnoreEngine {
    /// Starts the live loop, consuming the engine.
    ///
    /// Events are applied in arrival order until the engine's cancellation
    /// token fires or the event stream ends. The watcher is then shut down
    /// and the engine is returned through the handle. Both spawned tasks are
    /// registered with `tracker`, so waiting on the tracker waits for the
    /// watcher to be released.
    ///
    /// The loop runs on a blocking thread because handlers stat and walk the
    /// filesystem.
    pub fn listen(self, mut watcher: ChangeWatcher, tracker: &TaskTracker) -> JoinHandle<Self> {
        if let Some(errors) = watcher.take_errors() {
            tracker.spawn(drain_errors(
                errors,
                self.cancel.clone(),
                self.root().to_owned(),
            ));
        }

        let handle = Handle::current();
        tracker.spawn_blocking(move || run_event_loop(self, watcher, &handle))
    }
}

fn run_event_loop(
    mut engine: IgnoreEngine,
    mut watcher: ChangeWatcher,
    handle: &Handle,
) -> IgnoreEngine {
    let cancel = engine.cancel.clone();
    tracing::info!(root = %engine.root(), "Listening for changes");

    loop {
        let next = handle.block_on(async {
            tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                event = watcher.recv() => Some(event),
            }
        });
        match next {
            None => break,
            Some(Some(event)) => engine.handle_event(&event),
            Some(None) => {
                tracing::warn!(root = %engine.root(), "Change stream closed");
                break;
            }
        }
    }

    if let Err(err) = handle.block_on(watcher.shutdown()) {
        tracing::warn!(root = %engine.root(), error = %err, "Failed to stop change watcher");
    }
    tracing::info!(root = %engine.root(), "Stopped listening");
    engine
}

async fn drain_errors(
    mut errors: mpsc::Receiver<WatchError>,
    cancel: CancellationToken,
    root: Utf8PathBuf,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            error = errors.recv() => match error {
                Some(WatchError::Overflow(path)) => {
                    tracing::warn!(root = %root, path = %path, "Change events were lost");
                }
                Some(error) => tracing::warn!(root = %root, error = %error, "Change watcher error"),
                None => break,
            },
        }
    }
}

/// Watches `root`: subscribes, runs the initial walk, then starts the loop.
///
/// The subscription is created before the walk so that changes made while
/// walking are delivered afterwards.
///
/// # Errors
///
/// Returns setup failures: an unusable root, a failed subscription, or a
/// panic during the initial walk.
pub async fn watch_root(
    root: &Utf8Path,
    engine_config: &EngineConfig,
    watch_config: &WatchConfig,
    sets: SharedSets,
    marker: Arc<dyn IgnoreMarker>,
    cancel: CancellationToken,
    tracker: &TaskTracker,
) -> Result<JoinHandle<IgnoreEngine>, EngineError> {
    let root = resolve_root(root)?;
    let watcher = ChangeWatcher::new(&root, watch_config).await?;

    let config = engine_config.clone();
    let engine = tokio::task::spawn_blocking(move || {
        IgnoreEngine::init(&root, &config, sets, marker, cancel)
    })
    .await??;

    Ok(engine.listen(watcher, tracker))
}
