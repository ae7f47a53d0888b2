//! Change watcher bridging `notify` to the async runtime.
//!
//! The [`ChangeWatcher`] owns a blocking task that hosts the OS subscription.
//! The notify callback normalizes each raw event and forwards it over a
//! bounded channel with `blocking_send`, so a slow consumer applies
//! backpressure instead of growing memory.

use camino::{Utf8Path, Utf8PathBuf};
use notify::{RecursiveMode, Watcher};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use dbx_core::WatchConfig;

use crate::error::WatchError;
use crate::events::{normalize, ChangeEvent};

/// Capacity of the error stream; errors are rare and dropped when it is full.
const ERROR_CHANNEL_CAPACITY: usize = 16;

/// A recursive directory watcher that streams [`ChangeEvent`]s.
///
/// # Lifecycle
///
/// 1. **Creation**: [`ChangeWatcher::new`] validates the path, spawns the
///    blocking task, and waits until the OS subscription is established, so a
///    subscription failure is returned from `new` itself.
///
/// 2. **Event Reception**: [`recv`](Self::recv) yields events in arrival order.
///    Backend errors are available separately via
///    [`take_errors`](Self::take_errors).
///
/// 3. **Shutdown**: [`shutdown`](Self::shutdown) releases the subscription and
///    awaits the task. Dropping the watcher signals the task without waiting.
pub struct ChangeWatcher {
    /// Shutdown signal for the blocking task; `None` once sent.
    shutdown_tx: Option<oneshot::Sender<()>>,

    /// Handle to the blocking watcher task; `None` for channel-backed watchers.
    task_handle: Option<JoinHandle<Result<(), WatchError>>>,

    /// Normalized events.
    event_rx: mpsc::Receiver<ChangeEvent>,

    /// Backend errors, until taken by a consumer.
    error_rx: Option<mpsc::Receiver<WatchError>>,

    /// The watched directory.
    watch_path: Utf8PathBuf,
}

impl std::fmt::Debug for ChangeWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeWatcher")
            .field("watch_path", &self.watch_path)
            .field("is_running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl ChangeWatcher {
    /// Starts watching `path`.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::PathNotFound`] if the path doesn't exist,
    /// [`WatchError::Notify`] if the OS subscription cannot be established,
    /// and [`WatchError::ChannelClosed`] if the watcher task died during
    /// setup.
    pub async fn new(path: &Utf8Path, config: &WatchConfig) -> Result<Self, WatchError> {
        if !path.exists() {
            return Err(WatchError::path_not_found(path));
        }

        let (event_tx, event_rx) = mpsc::channel(config.channel_capacity.max(1));
        let (error_tx, error_rx) = mpsc::channel(ERROR_CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (ready_tx, ready_rx) = oneshot::channel();

        let task_path = path.to_owned();
        let recursive = config.recursive;

        let task_handle = tokio::task::spawn_blocking(move || {
            run_watcher_loop(
                &task_path,
                recursive,
                event_tx,
                error_tx,
                ready_tx,
                shutdown_rx,
            )
        });

        match ready_rx.await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                // The task has already returned; reap it.
                let _ = task_handle.await;
                return Err(error);
            }
            Err(_) => {
                return match task_handle.await {
                    Ok(Err(error)) => Err(error),
                    Ok(Ok(())) | Err(_) => Err(WatchError::ChannelClosed),
                };
            }
        }

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            task_handle: Some(task_handle),
            event_rx,
            error_rx: Some(error_rx),
            watch_path: path.to_owned(),
        })
    }

    /// Creates a watcher over caller-supplied channels, without any OS
    /// subscription.
    ///
    /// Events sent on the matching senders are delivered exactly like OS
    /// events, which makes consumers testable with synthetic event streams.
    #[must_use]
    pub fn from_channels(
        watch_path: impl Into<Utf8PathBuf>,
        event_rx: mpsc::Receiver<ChangeEvent>,
        error_rx: mpsc::Receiver<WatchError>,
    ) -> Self {
        Self {
            shutdown_tx: None,
            task_handle: None,
            event_rx,
            error_rx: Some(error_rx),
            watch_path: watch_path.into(),
        }
    }

    /// Receives the next event.
    ///
    /// Returns `None` once the watcher has shut down and all buffered events
    /// were consumed.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.event_rx.recv().await
    }

    /// Tries to receive an event without waiting.
    pub fn try_recv(&mut self) -> Result<ChangeEvent, mpsc::error::TryRecvError> {
        self.event_rx.try_recv()
    }

    /// Takes the error stream so it can be drained by a dedicated task.
    ///
    /// Returns `None` if it was already taken.
    pub fn take_errors(&mut self) -> Option<mpsc::Receiver<WatchError>> {
        self.error_rx.take()
    }

    /// Returns the watched directory.
    #[must_use]
    pub fn watch_path(&self) -> &Utf8Path {
        &self.watch_path
    }

    /// Returns `true` while the OS subscription is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some() && self.task_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Releases the OS subscription and waits for the watcher task.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::ChannelClosed`] if the watcher task panicked.
    pub async fn shutdown(mut self) -> Result<(), WatchError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(handle) = self.task_handle.take() {
            match handle.await {
                Ok(result) => result?,
                Err(_join_error) => return Err(WatchError::ChannelClosed),
            }
        }

        Ok(())
    }
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        // The task stops on its own once signalled; Drop cannot await it.
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Hosts the notify watcher until shutdown is signalled.
fn run_watcher_loop(
    path: &Utf8Path,
    recursive: bool,
    event_tx: mpsc::Sender<ChangeEvent>,
    error_tx: mpsc::Sender<WatchError>,
    ready_tx: oneshot::Sender<Result<(), WatchError>>,
    shutdown_rx: oneshot::Receiver<()>,
) -> Result<(), WatchError> {
    let overflow_path = path.to_owned();
    let handler = move |res: notify::Result<notify::Event>| match res {
        Ok(event) => {
            if event.need_rescan() {
                let _ = error_tx.try_send(WatchError::Overflow(overflow_path.clone()));
            }
            let kind = event.kind;
            let (changes, rejected) = normalize(event);
            for invalid in rejected {
                tracing::warn!(path = %invalid.display(), "Skipping non-UTF-8 path in change event");
                let _ = error_tx.try_send(WatchError::non_utf8_path(invalid));
            }
            if changes.is_empty() {
                tracing::trace!(kind = ?kind, "Dropped uninteresting change event");
            }
            for change in changes {
                if event_tx.blocking_send(change).is_err() {
                    tracing::debug!("Event channel closed, dropping change events");
                    return;
                }
            }
        }
        Err(error) => {
            tracing::warn!(error = %error, "Change watcher backend error");
            let _ = error_tx.try_send(WatchError::Notify(error));
        }
    };

    let mode = if recursive {
        RecursiveMode::Recursive
    } else {
        RecursiveMode::NonRecursive
    };

    let setup = notify::recommended_watcher(handler).and_then(|mut watcher| {
        watcher.watch(path.as_std_path(), mode)?;
        Ok(watcher)
    });
    let watcher = match setup {
        Ok(watcher) => {
            let _ = ready_tx.send(Ok(()));
            watcher
        }
        Err(error) => {
            tracing::error!(path = %path, error = %error, "Failed to start change watcher");
            let _ = ready_tx.send(Err(WatchError::Notify(error)));
            return Ok(());
        }
    };

    tracing::info!(path = %path, recursive, "Change watcher started");

    let _ = shutdown_rx.blocking_recv();
    drop(watcher);

    tracing::info!(path = %path, "Change watcher stopped");
    Ok(())
}
