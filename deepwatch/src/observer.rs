//! Observer registration
//!
//! Each façade keeps its own ordered list of observers. An observer is an
//! `Arc`'d callback; registering the same `Arc` twice on one façade is an
//! error. Registration hands back a [`Subscription`] used to pause, resume
//! or destroy delivery.

use crate::error::{Result, WatchError};
use crate::event::Change;
use crate::facade::FacadeInner;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Callback invoked for every change at or below the observed façade
pub type Observer = Arc<dyn Fn(&Change) + Send + Sync>;

/// Box a closure as an [`Observer`]
pub fn observer(callback: impl Fn(&Change) + Send + Sync + 'static) -> Observer {
    Arc::new(callback)
}

/// Observer identifier, unique within the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub u64);

static OBSERVER_COUNTER: AtomicU64 = AtomicU64::new(1);

impl ObserverId {
    fn new() -> Self {
        Self(OBSERVER_COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer:{}", self.0)
    }
}

fn same_callback(a: &Observer, b: &Observer) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

pub(crate) struct ObserverEntry {
    id: ObserverId,
    callback: Observer,
    paused: AtomicBool,
    registered: AtomicBool,
}

impl ObserverEntry {
    /// Invoke the callback unless paused or destroyed
    pub(crate) fn deliver(&self, change: &Change) {
        if self.paused.load(Ordering::SeqCst) || !self.registered.load(Ordering::SeqCst) {
            return;
        }
        (self.callback)(change);
    }
}

/// Ordered observers of one façade
#[derive(Default)]
pub(crate) struct ObserverSet {
    entries: Vec<Arc<ObserverEntry>>,
}

impl ObserverSet {
    pub(crate) fn register(&mut self, callback: Observer) -> Result<Arc<ObserverEntry>> {
        if self
            .entries
            .iter()
            .any(|entry| same_callback(&entry.callback, &callback))
        {
            return Err(WatchError::DuplicateObserver);
        }
        let entry = Arc::new(ObserverEntry {
            id: ObserverId::new(),
            callback,
            paused: AtomicBool::new(false),
            registered: AtomicBool::new(true),
        });
        self.entries.push(Arc::clone(&entry));
        Ok(entry)
    }

    pub(crate) fn unregister(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| {
            if entry.id == id {
                entry.registered.store(false, Ordering::SeqCst);
                false
            } else {
                true
            }
        });
        self.entries.len() != before
    }

    /// Entries in registration order, for delivery outside the lock
    pub(crate) fn snapshot(&self) -> Vec<Arc<ObserverEntry>> {
        self.entries.clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Handle to one registered observer
///
/// Dropping the handle does not unregister the observer; call
/// [`Subscription::destroy`] for that.
pub struct Subscription {
    facade: Weak<FacadeInner>,
    entry: Arc<ObserverEntry>,
}

impl Subscription {
    pub(crate) fn new(facade: Weak<FacadeInner>, entry: Arc<ObserverEntry>) -> Self {
        Self { facade, entry }
    }

    /// Identifier of the registered observer
    pub fn id(&self) -> ObserverId {
        self.entry.id
    }

    /// Stop delivery until [`resume`](Self::resume); idempotent
    pub fn pause(&self) {
        self.entry.paused.store(true, Ordering::SeqCst);
    }

    /// Restart delivery; idempotent
    pub fn resume(&self) {
        self.entry.paused.store(false, Ordering::SeqCst);
    }

    /// Whether delivery is paused
    pub fn is_paused(&self) -> bool {
        self.entry.paused.load(Ordering::SeqCst)
    }

    /// Whether the observer is still registered
    pub fn is_registered(&self) -> bool {
        self.entry.registered.load(Ordering::SeqCst)
    }

    /// Unregister the observer
    ///
    /// Fails with [`WatchError::StaleHandle`] if it was already destroyed or
    /// its façade no longer exists.
    pub fn destroy(&self) -> Result<()> {
        let stale = WatchError::StaleHandle(self.entry.id);
        let Some(facade) = self.facade.upgrade() else {
            return Err(stale);
        };
        if facade.observers.lock().unregister(self.entry.id) {
            tracing::trace!(observer = %self.entry.id, facade = %facade.id, "observer destroyed");
            Ok(())
        } else {
            Err(stale)
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.entry.id)
            .field("paused", &self.is_paused())
            .field("registered", &self.is_registered())
            .finish()
    }
}

/// An observer that records every change it receives
///
/// Cloning shares the same log.
#[derive(Debug, Clone, Default)]
pub struct ChangeLog {
    changes: Arc<Mutex<Vec<Change>>>,
}

impl ChangeLog {
    /// An empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh observer appending to this log
    ///
    /// Each call returns a distinct callback, so one log may observe several
    /// façades, or the same façade twice.
    pub fn observer(&self) -> Observer {
        let changes = Arc::clone(&self.changes);
        Arc::new(move |change: &Change| changes.lock().push(change.clone()))
    }

    /// Take the collected changes, leaving the log empty
    pub fn take(&self) -> Vec<Change> {
        std::mem::take(&mut *self.changes.lock())
    }

    /// Copy of the collected changes
    pub fn snapshot(&self) -> Vec<Change> {
        self.changes.lock().clone()
    }

    /// Number of collected changes
    pub fn len(&self) -> usize {
        self.changes.lock().len()
    }

    /// Whether nothing has been collected
    pub fn is_empty(&self) -> bool {
        self.changes.lock().is_empty()
    }

    /// One line per change, `Display`-formatted
    pub fn lines(&self) -> Vec<String> {
        self.changes.lock().iter().map(ToString::to_string).collect()
    }
}
