//! Process teardown hooks.
//!
//! The registry registers one callback per successful initialize through a
//! [`LifecycleHook`]. [`ShutdownHooks`] is an in-process implementation that
//! runs callbacks once, newest first, on [`ShutdownHooks::run`] or on drop.

use std::sync::{Mutex, PoisonError};

use tracing::debug;

type Callback = Box<dyn FnOnce() + Send>;

/// Reports whether a registered callback still has anything to do.
pub type LivenessCheck = Box<dyn Fn() -> bool + Send + Sync>;

/// Something that runs callbacks when the hosting process tears down.
pub trait LifecycleHook: Send + Sync {
    /// Registers `callback` to run once at teardown.
    fn register_on_teardown(&self, callback: Box<dyn FnOnce() + Send>, description: &str);

    /// Registers `callback`, which the hook may discard unrun once `is_live`
    /// returns `false`. Defaults to [`register_on_teardown`](Self::register_on_teardown).
    fn register_on_teardown_while_live(
        &self,
        callback: Box<dyn FnOnce() + Send>,
        description: &str,
        is_live: LivenessCheck,
    ) {
        let _ = is_live;
        self.register_on_teardown(callback, description);
    }
}

/// Ignores registrations. Useful when the caller tears down explicitly.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLifecycle;

impl LifecycleHook for NoopLifecycle {
    fn register_on_teardown(&self, _callback: Box<dyn FnOnce() + Send>, description: &str) {
        debug!(description, "Ignoring teardown registration");
    }
}

struct Entry {
    description: String,
    callback: Callback,
    is_live: Option<LivenessCheck>,
}

impl Entry {
    fn is_stale(&self) -> bool {
        self.is_live.as_ref().is_some_and(|check| !check())
    }
}

/// Collects teardown callbacks and runs each exactly once.
///
/// Callbacks registered with a liveness check are dropped unrun at the next
/// registration after the check turns `false`.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use rowmap_core::{LifecycleHook, ShutdownHooks};
///
/// let hooks = ShutdownHooks::new();
/// let closed = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&closed);
/// hooks.register_on_teardown(Box::new(move || { counter.fetch_add(1, Ordering::SeqCst); }), "close");
///
/// hooks.run();
/// hooks.run();
/// assert_eq!(closed.load(Ordering::SeqCst), 1);
/// ```
#[derive(Default)]
pub struct ShutdownHooks {
    callbacks: Mutex<Vec<Entry>>,
}

impl ShutdownHooks {
    /// Creates an empty hook list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of callbacks not yet run.
    pub fn pending(&self) -> usize {
        self.callbacks.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Runs and drains all registered callbacks, newest first.
    pub fn run(&self) {
        let drained = match self.callbacks.lock() {
            Ok(mut callbacks) => std::mem::take(&mut *callbacks),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        for entry in drained.into_iter().rev() {
            debug!(description = %entry.description, "Running teardown callback");
            (entry.callback)();
        }
    }

    fn push(&self, entry: Entry) {
        let mut callbacks = self.callbacks.lock().unwrap_or_else(PoisonError::into_inner);
        let before = callbacks.len();
        callbacks.retain(|e| !e.is_stale());
        if callbacks.len() < before {
            debug!(pruned = before - callbacks.len(), "Dropped stale teardown callbacks");
        }
        callbacks.push(entry);
    }
}

impl LifecycleHook for ShutdownHooks {
    fn register_on_teardown(&self, callback: Box<dyn FnOnce() + Send>, description: &str) {
        self.push(Entry {
            description: description.to_string(),
            callback,
            is_live: None,
        });
    }

    fn register_on_teardown_while_live(
        &self,
        callback: Box<dyn FnOnce() + Send>,
        description: &str,
        is_live: LivenessCheck,
    ) {
        self.push(Entry {
            description: description.to_string(),
            callback,
            is_live: Some(is_live),
        });
    }
}

impl Drop for ShutdownHooks {
    fn drop(&mut self) {
        self.run();
    }
}
