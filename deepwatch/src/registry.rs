//! Identity registry and mutation serialization
//!
//! The registry maps each wrapped raw object to its live façade. Entries hold
//! the façade weakly; a façade removes its own entry when it is dropped, so
//! nothing here keeps a façade alive.
//!
//! Every wrap and every intercepted mutation (including the propagation that
//! follows it) runs under one process-wide reentrant lock. Observers invoked
//! during propagation run on the same thread and may mutate again; those
//! nested mutations re-enter the lock and are bounded by the dispatch depth.

use crate::config::current_config;
use crate::error::{Result, WatchError};
use crate::facade::FacadeInner;
use crate::value::ObjectId;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::cell::Cell;
use std::sync::{Arc, Weak};

static FACADES: Lazy<DashMap<ObjectId, Weak<FacadeInner>>> = Lazy::new(DashMap::new);

static MUTATION_LOCK: ReentrantMutex<()> = parking_lot::const_reentrant_mutex(());

thread_local! {
    static DISPATCH_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Live façade for a raw object, if any
pub(crate) fn lookup(id: ObjectId) -> Option<Arc<FacadeInner>> {
    FACADES.get(&id).and_then(|entry| entry.upgrade())
}

pub(crate) fn register(id: ObjectId, facade: &Arc<FacadeInner>) {
    FACADES.insert(id, Arc::downgrade(facade));
}

/// Whether `facade` is the registered façade of its raw object
pub(crate) fn is_registered(facade: &Arc<FacadeInner>) -> bool {
    FACADES
        .get(&facade.raw.id())
        .is_some_and(|entry| std::ptr::eq(entry.as_ptr(), Arc::as_ptr(facade)))
}

/// Drop the entry for `id` unless a live façade has replaced it
pub(crate) fn forget(id: ObjectId) {
    FACADES.remove_if(&id, |_, entry| entry.strong_count() == 0);
}

/// Number of live façades in the process
pub fn live_facades() -> usize {
    FACADES
        .iter()
        .filter(|entry| entry.value().strong_count() > 0)
        .count()
}

/// Holds the mutation lock for one wrap or one mutation-plus-propagation
pub(crate) struct MutationGuard {
    _lock: ReentrantMutexGuard<'static, ()>,
}

/// Serialize a wrap against every other wrap and mutation
pub(crate) fn lock() -> MutationGuard {
    MutationGuard {
        _lock: MUTATION_LOCK.lock(),
    }
}

/// Start an intercepted mutation
///
/// Fails without touching anything when observers have already nested
/// mutations `max_dispatch_depth` deep on this thread.
pub(crate) fn begin_mutation() -> Result<MutationGuard> {
    let limit = current_config().max_dispatch_depth;
    let depth = DISPATCH_DEPTH.with(Cell::get);
    if depth >= limit {
        tracing::warn!(depth, limit, "refusing nested mutation: dispatch depth exceeded");
        return Err(WatchError::DispatchDepth { limit });
    }
    Ok(lock())
}

/// Marks one level of observer dispatch on the current thread
pub(crate) struct DispatchScope(());

impl DispatchScope {
    pub(crate) fn enter() -> Self {
        DISPATCH_DEPTH.with(|depth| depth.set(depth.get() + 1));
        DispatchScope(())
    }
}

impl Drop for DispatchScope {
    fn drop(&mut self) {
        DISPATCH_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Current observer dispatch depth on this thread
pub fn dispatch_depth() -> usize {
    DISPATCH_DEPTH.with(Cell::get)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_scope_nests_and_unwinds() {
        assert_eq!(dispatch_depth(), 0);
        {
            let _outer = DispatchScope::enter();
            let _inner = DispatchScope::enter();
            assert_eq!(dispatch_depth(), 2);
        }
        assert_eq!(dispatch_depth(), 0);
    }

    #[test]
    fn test_lock_is_reentrant() {
        let _outer = lock();
        let _inner = begin_mutation().unwrap();
    }
}
