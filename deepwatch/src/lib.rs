//! Deepwatch - deep change observation for nested data
//!
//! This crate wraps an in-memory graph of records, sequences, sets, maps and
//! numeric buffers in observable façades. Every mutation made through a
//! façade, at any depth, is reported to the observers registered on that
//! façade and on each of its ancestors.
//!
//! # Architecture
//!
//! ```text
//! wrap(value) ──► classify ──► build façade ──► wrap children (recursively)
//!                                   │
//!                                   ▼
//!                            identity registry (ObjectId → Weak<façade>)
//!
//! façade.set(..) ──► mutate raw body ──► notify façade ──► notify parent ──► … root
//! ```
//!
//! ## Paths
//!
//! Each [`Change`] carries a dotted path relative to the façade it is
//! delivered to. A façade knows the slot it occupies in its parent (a record
//! key, a sequence index, `*` for set members, the key token for map values),
//! and each step outward prefixes the path with that slot.
//!
//! ## Identity
//!
//! A raw object has at most one live façade. Wrapping it again, or storing it
//! in another container, yields that same façade with its original parent
//! and name. Façades are dropped with their last handle; the registry only
//! holds them weakly.
//!
//! # Example
//!
//! ```rust
//! use deepwatch::{observe, wrap, ChangeLog, Object, Value};
//!
//! let root = wrap(Object::record([(
//!     "a",
//!     Value::from(Object::record([("b", Value::from(Object::record([("c", 1)])))])),
//! )]))
//! .unwrap();
//!
//! let log = ChangeLog::new();
//! observe(&root, log.observer()).unwrap();
//!
//! let a = root.as_observed().unwrap().as_record().unwrap().get("a").unwrap();
//! let b = a.as_observed().unwrap().as_record().unwrap().get("b").unwrap();
//! b.as_observed().unwrap().as_record().unwrap().set("c", 2).unwrap();
//!
//! assert_eq!(log.lines(), vec!["change a.b.c old=1 new=2"]);
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod buffer;
pub mod config;
pub mod error;
pub mod event;
pub mod facade;
pub mod kind;
pub mod observer;
mod propagate;
pub mod registry;
pub mod value;

pub use buffer::{ElementKind, NumericBuffer};
pub use config::{configure, current_config, ConfigError, WatchConfig, WrapOptions};
pub use error::{Result, WatchError};
pub use event::{Change, ChangeKind};
pub use facade::{
    BufferFacade, FacadeId, MapFacade, Observed, RecordFacade, SequenceFacade, SetFacade,
};
pub use kind::{classify, Classification, Kind};
pub use observer::{observer, ChangeLog, Observer, ObserverId, Subscription};
pub use value::{Body, Fields, Object, ObjectId, Opaque, Value};

/// Wrap a value using the process-wide configuration
///
/// Idempotent: a façade, or a raw object that already has one, yields the
/// existing façade. Opaque values come back unchanged.
///
/// # Errors
///
/// [`WatchError::NotAnObject`] for scalars; [`WatchError::Unsupported`] in
/// strict mode when an unsupported object is reachable from `value`.
pub fn wrap(value: impl Into<Value>) -> Result<Value> {
    wrap_with(value, WrapOptions::default())
}

/// Wrap a value with explicit options
pub fn wrap_with(value: impl Into<Value>, options: WrapOptions) -> Result<Value> {
    let value = value.into();
    classify(&value)?;
    let _guard = registry::lock();
    facade::attach(value, None, "", options.strict)
}

/// Whether `value` is a live façade
///
/// # Errors
///
/// [`WatchError::NotAnObject`] for scalars.
pub fn is_wrapped(value: &Value) -> Result<bool> {
    classify(value)?;
    Ok(matches!(value, Value::Observed(_)))
}

/// The raw object behind a façade
///
/// # Errors
///
/// [`WatchError::NotAnObject`] for scalars; [`WatchError::NotObservable`]
/// for anything that is not a façade.
pub fn unwrap(value: &Value) -> Result<Object> {
    Ok(facade::facade_of(value)?.raw().clone())
}

/// Register `callback` on the façade `value`
///
/// # Errors
///
/// [`WatchError::NotObservable`] if `value` is not a façade;
/// [`WatchError::DuplicateObserver`] if `callback` is already registered
/// there.
pub fn observe(value: &Value, callback: Observer) -> Result<Subscription> {
    facade::facade_of(value)?.observe(callback)
}
