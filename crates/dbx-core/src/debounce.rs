//! Leading-edge rate limiter with a single trailing call.
//!
//! A [`Debouncer`] wraps an action. The first [`call`](Debouncer::call) in an
//! idle period runs the action immediately on the caller's thread and starts a
//! background cycle. While the cycle is active, further calls only set a
//! pending flag. After each quiescence sleep the cycle either runs the action
//! once more (if anything was requested meanwhile) and sleeps again, or goes
//! back to idle.
//!
//! So a burst of any size produces at most two executions: one at its start
//! and one after it has been quiet for one interval.
//!
//! ```text
//! calls:    x  x x  x                    x
//! action:   ^            ^               ^
//!           leading      trailing        leading (new cycle)
//! ```
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::time::Duration;
//! use dbx_core::Debouncer;
//!
//! let runs = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&runs);
//! let debouncer = Debouncer::new(
//!     move || {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!     },
//!     Duration::from_secs(3600),
//! );
//!
//! debouncer.call();
//! debouncer.call();
//! debouncer.call();
//! assert_eq!(runs.load(Ordering::SeqCst), 1);
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

#[derive(Debug, Default)]
struct State {
    /// A trailing cycle is running.
    active: bool,
    /// A call arrived since the last execution.
    pending: bool,
}

struct Shared {
    state: Mutex<State>,
    action: Box<dyn Fn() + Send + Sync>,
    sleep: Box<dyn Fn() + Send + Sync>,
}

/// Rate-limits an action to one leading and one trailing execution per burst.
///
/// Cloning a `Debouncer` yields a handle to the same cycle.
#[derive(Clone)]
pub struct Debouncer {
    shared: Arc<Shared>,
}

impl fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Debouncer")
            .field("active", &state.active)
            .field("pending", &state.pending)
            .finish_non_exhaustive()
    }
}

impl Debouncer {
    /// Creates a debouncer that waits `quiescence` between cycle checks.
    pub fn new(action: impl Fn() + Send + Sync + 'static, quiescence: Duration) -> Self {
        Self::with_sleep(action, move || std::thread::sleep(quiescence))
    }

    /// Creates a debouncer with an injected sleep function.
    ///
    /// The cycle thread calls `sleep` once per quiescence interval, which lets
    /// tests step the cycle deterministically.
    pub fn with_sleep(
        action: impl Fn() + Send + Sync + 'static,
        sleep: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::default()),
                action: Box::new(action),
                sleep: Box::new(sleep),
            }),
        }
    }

    /// Requests an execution of the action.
    ///
    /// Runs the action synchronously if the debouncer is idle, otherwise
    /// schedules the trailing execution.
    pub fn call(&self) {
        {
            let mut state = self.shared.state.lock();
            if state.active {
                state.pending = true;
                return;
            }
            state.active = true;
            state.pending = false;
        }

        (self.shared.action)();

        let shared = Arc::clone(&self.shared);
        let spawned = std::thread::Builder::new()
            .name("dbx-debounce".to_owned())
            .spawn(move || run_cycle(&shared));
        if let Err(error) = spawned {
            tracing::warn!(error = %error, "Failed to start debounce cycle");
            self.shared.state.lock().active = false;
        }
    }

    /// Returns `true` while a trailing cycle is running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.shared.state.lock().active
    }
}

fn run_cycle(shared: &Shared) {
    loop {
        (shared.sleep)();
        {
            let mut state = shared.state.lock();
            if !state.pending {
                state.active = false;
                return;
            }
            state.pending = false;
        }
        (shared.action)();
    }
}
