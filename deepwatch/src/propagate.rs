//! Change propagation
//!
//! A mutation is reported first to the façade it happened on, then to each
//! ancestor in turn. Every level gets its own [`Change`] whose path is
//! relative to that level: the local path is prefixed with the name the
//! current façade occupies in its parent as the walk moves outward.

use crate::event::{Change, ChangeKind};
use crate::facade::{FacadeInner, Observed};
use crate::registry::{self, DispatchScope};
use crate::value::Value;
use std::sync::Arc;

/// Deliver one mutation to `facade` and every live ancestor
///
/// # Panics
///
/// Panics if `facade` is not the registered façade of its raw object.
pub(crate) fn notify(
    kind: ChangeKind,
    facade: &Arc<FacadeInner>,
    path: String,
    value_new: Option<Value>,
    value_old: Option<Value>,
) {
    assert!(
        registry::is_registered(facade),
        "facade {} is not registered for {}",
        facade.id,
        facade.raw.id()
    );

    let _scope = DispatchScope::enter();
    let mut current = Arc::clone(facade);
    let mut path = path;
    loop {
        let observers = current.observers.lock().snapshot();
        tracing::debug!(
            facade = %current.id,
            %kind,
            path = %path,
            observers = observers.len(),
            "notifying"
        );
        if !observers.is_empty() {
            let change = Change {
                kind,
                target: Observed::from_inner(Arc::clone(&current)),
                path: path.clone(),
                value_new: value_new.clone(),
                value_old: value_old.clone(),
            };
            for observer in observers {
                observer.deliver(&change);
            }
        }

        let Some(parent) = current.parent() else {
            break;
        };
        path = format!("{}.{}", current.name, path);
        current = parent;
    }
}
