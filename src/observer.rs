//! Structural-change observer dispatch (§3 lifecycle, §9 design notes).
//!
//! A small vector of callbacks notified on `created`/`deleted`/
//! `transformed`/`modified`. Callbacks may read the model but must never
//! mutate it; a re-entrant `notify` (an observer triggering another
//! structural change synchronously) is dropped rather than recursed into.

use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::error;

/// The four structural lifecycle events a net can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverEventKind {
    Created,
    Deleted,
    Transformed,
    Modified,
}

/// One structural-change notification.
#[derive(Debug, Clone)]
pub struct ObserverEvent {
    pub kind: ObserverEventKind,
    pub object_id: String,
    pub old: Option<serde_json::Value>,
    pub new: Option<serde_json::Value>,
}

impl ObserverEvent {
    pub fn new(kind: ObserverEventKind, object_id: impl Into<String>) -> Self {
        Self {
            kind,
            object_id: object_id.into(),
            old: None,
            new: None,
        }
    }
}

type Callback = Box<dyn Fn(&ObserverEvent)>;

/// Registry of structural-change observers.
#[derive(Default)]
pub struct ObserverDispatch {
    observers: Vec<Option<Callback>>,
    dispatching: Cell<bool>,
}

/// Opaque handle returned by [`ObserverDispatch::register`], used to
/// [`ObserverDispatch::unregister`] later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverHandle(usize);

impl ObserverHandle {
    /// Construct a handle from a raw slot index. Used by callers (e.g.
    /// `Controller`) that keep their own `Vec<Option<_>>` of callbacks in
    /// the same slot-reuse style as [`ObserverDispatch`].
    pub fn from_index(index: usize) -> Self {
        Self(index)
    }

    /// The raw slot index this handle refers to.
    pub fn index(self) -> usize {
        self.0
    }
}

impl ObserverDispatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback; returns a handle for later removal.
    pub fn register(&mut self, callback: Callback) -> ObserverHandle {
        self.observers.push(Some(callback));
        ObserverHandle(self.observers.len() - 1)
    }

    /// Remove a previously registered callback. No-op if already removed.
    pub fn unregister(&mut self, handle: ObserverHandle) {
        if let Some(slot) = self.observers.get_mut(handle.0) {
            *slot = None;
        }
    }

    /// Notify every registered observer. A panicking observer is caught,
    /// logged, and does not prevent the remaining observers from running.
    /// A call arriving while dispatch is already in progress (an observer
    /// triggering a structural mutation synchronously) is dropped.
    pub fn notify(&self, event: ObserverEvent) {
        if self.dispatching.get() {
            error!(
                object_id = %event.object_id,
                "dropped re-entrant observer notification"
            );
            return;
        }
        self.dispatching.set(true);
        for observer in self.observers.iter().flatten() {
            let outcome = catch_unwind(AssertUnwindSafe(|| observer(&event)));
            if outcome.is_err() {
                error!(object_id = %event.object_id, "observer callback panicked");
            }
        }
        self.dispatching.set(false);
    }
}
