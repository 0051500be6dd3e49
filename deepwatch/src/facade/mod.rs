//! Observable façades
//!
//! A façade stands in for a raw object. Reads go straight through to the raw
//! body; every mutating operation goes through a typed view
//! ([`RecordFacade`], [`SequenceFacade`], [`SetFacade`], [`MapFacade`],
//! [`BufferFacade`]) that snapshots the old value, applies the change, and
//! hands the event to the propagation engine.
//!
//! Building a façade also wraps every object-typed child found in the raw
//! body, so the whole reachable graph is observable. A façade is registered
//! before its children are visited, which lets cyclic raw graphs resolve to
//! the façade under construction instead of recursing forever.

mod buffer;
mod map;
mod record;
mod sequence;
mod set;

pub use buffer::BufferFacade;
pub use map::MapFacade;
pub use record::RecordFacade;
pub use sequence::SequenceFacade;
pub use set::SetFacade;

use crate::error::{Result, WatchError};
use crate::event::ChangeKind;
use crate::kind::{classify_object, Kind};
use crate::observer::{Observer, ObserverSet, Subscription};
use crate::propagate;
use crate::registry;
use crate::value::{Body, Instance, MapBody, Object, ObjectId, SetBody, Value};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Façade identifier, unique within the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FacadeId(pub u64);

static FACADE_COUNTER: AtomicU64 = AtomicU64::new(1);

impl FacadeId {
    fn new() -> Self {
        Self(FACADE_COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl fmt::Display for FacadeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "facade:{}", self.0)
    }
}

/// Per-façade record: the observable context
#[doc(hidden)]
pub struct FacadeInner {
    pub(crate) id: FacadeId,
    pub(crate) raw: Object,
    pub(crate) kind: Kind,
    pub(crate) weak: bool,
    /// Slot in the parent; empty for a root
    pub(crate) name: String,
    /// Set at construction; only replaced once the parent has been dropped
    pub(crate) parent: RwLock<Weak<FacadeInner>>,
    /// Strictness used when wrapping values stored through this façade
    pub(crate) strict: bool,
    pub(crate) observers: Mutex<ObserverSet>,
}

impl FacadeInner {
    /// Wrap a value about to be stored in `slot`
    pub(crate) fn adopt(self: &Arc<Self>, value: Value, slot: &str) -> Result<Value> {
        attach(value, Some(self), slot, self.strict)
    }

    pub(crate) fn parent(&self) -> Option<Arc<FacadeInner>> {
        self.parent.read().upgrade()
    }

    pub(crate) fn notify(
        self: &Arc<Self>,
        kind: ChangeKind,
        path: String,
        value_new: Option<Value>,
        value_old: Option<Value>,
    ) {
        propagate::notify(kind, self, path, value_new, value_old);
    }
}

impl fmt::Debug for FacadeInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FacadeInner")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Drop for FacadeInner {
    fn drop(&mut self) {
        registry::forget(self.raw.id());
    }
}

/// Handle to a façade
///
/// Cloning shares the same façade. Equality and hashing use façade identity.
#[derive(Clone)]
pub struct Observed {
    inner: Arc<FacadeInner>,
}

impl Observed {
    pub(crate) fn from_inner(inner: Arc<FacadeInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn inner(&self) -> &Arc<FacadeInner> {
        &self.inner
    }

    pub(crate) fn downgrade(&self) -> Weak<FacadeInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn is_target_of(&self, weak: &Weak<FacadeInner>) -> bool {
        std::ptr::eq(weak.as_ptr(), Arc::as_ptr(&self.inner))
    }

    /// Identity of this façade
    pub fn id(&self) -> FacadeId {
        self.inner.id
    }

    /// Structural kind of the underlying object
    pub fn kind(&self) -> Kind {
        self.inner.kind
    }

    /// Whether this is the weak variant of a collection
    pub fn is_weak(&self) -> bool {
        self.inner.weak
    }

    /// Slot this façade occupies in its parent, empty for a root
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Enclosing façade, if it is still alive
    pub fn parent(&self) -> Option<Observed> {
        self.inner.parent().map(Observed::from_inner)
    }

    /// Whether this façade has no parent
    pub fn is_root(&self) -> bool {
        self.inner.name.is_empty() && self.inner.parent().is_none()
    }

    /// The wrapped raw object
    pub fn raw(&self) -> &Object {
        &self.inner.raw
    }

    /// Whether both handles are the same façade
    pub fn ptr_eq(&self, other: &Observed) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Register an observer on this façade
    pub fn observe(&self, callback: Observer) -> Result<Subscription> {
        let entry = self.inner.observers.lock().register(callback)?;
        tracing::trace!(facade = %self.inner.id, "observer registered");
        Ok(Subscription::new(self.downgrade(), entry))
    }

    /// Number of registered observers
    pub fn observer_count(&self) -> usize {
        self.inner.observers.lock().len()
    }

    /// Export the underlying object as JSON
    pub fn to_json(&self) -> serde_json::Value {
        Value::Observed(self.clone()).to_json()
    }

    /// Record view, if this is a record
    pub fn as_record(&self) -> Option<RecordFacade> {
        (self.kind() == Kind::Record).then(|| RecordFacade::new(self.clone()))
    }

    /// Sequence view, if this is a sequence
    pub fn as_sequence(&self) -> Option<SequenceFacade> {
        (self.kind() == Kind::Sequence).then(|| SequenceFacade::new(self.clone()))
    }

    /// Set view, if this is a unique collection
    pub fn as_set(&self) -> Option<SetFacade> {
        (self.kind() == Kind::UniqueCollection).then(|| SetFacade::new(self.clone()))
    }

    /// Map view, if this is a keyed collection
    pub fn as_map(&self) -> Option<MapFacade> {
        (self.kind() == Kind::KeyedCollection).then(|| MapFacade::new(self.clone()))
    }

    /// Buffer view, if this is a numeric buffer
    pub fn as_buffer(&self) -> Option<BufferFacade> {
        (self.kind() == Kind::NumericBuffer).then(|| BufferFacade::new(self.clone()))
    }
}

impl PartialEq for Observed {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Observed {}

impl Hash for Observed {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observed")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("name", &self.inner.name)
            .field("raw", &self.inner.raw.id())
            .finish()
    }
}

/// Wrap `value` for storage in `slot` of `parent` (or as a root)
///
/// Scalars, opaque values and façades come back unchanged. A raw object that
/// already has a live façade resolves to it, keeping that façade's original
/// parent and name. In strict mode the whole reachable graph is checked for
/// unsupported kinds before anything is built.
pub(crate) fn attach(
    value: Value,
    parent: Option<&Arc<FacadeInner>>,
    slot: &str,
    strict: bool,
) -> Result<Value> {
    if strict {
        ensure_supported(&value, &mut HashSet::new())?;
    }
    Ok(build(value, parent, slot, strict))
}

fn ensure_supported(value: &Value, seen: &mut HashSet<ObjectId>) -> Result<()> {
    let Value::Object(object) = value else {
        return Ok(());
    };
    if !seen.insert(object.id()) || registry::lookup(object.id()).is_some() {
        return Ok(());
    }
    if classify_object(object).kind == Kind::Unsupported {
        return Err(WatchError::Unsupported {
            type_name: object.type_name(),
        });
    }
    for child in children(object) {
        ensure_supported(&child.1, seen)?;
    }
    Ok(())
}

fn build(value: Value, parent: Option<&Arc<FacadeInner>>, slot: &str, strict: bool) -> Value {
    let object = match value {
        Value::Object(object) => object,
        other => return other,
    };
    if let Some(existing) = registry::lookup(object.id()) {
        return Value::Observed(Observed::from_inner(existing));
    }
    let class = classify_object(&object);
    if !class.kind.is_observable() {
        tracing::trace!(object = %object.id(), "passing through unsupported object");
        return Value::Object(object);
    }

    let inner = Arc::new(FacadeInner {
        id: FacadeId::new(),
        raw: object,
        kind: class.kind,
        weak: class.weak,
        name: slot.to_string(),
        parent: RwLock::new(parent.map(Arc::downgrade).unwrap_or_default()),
        strict,
        observers: Mutex::new(ObserverSet::default()),
    });
    registry::register(inner.raw.id(), &inner);
    tracing::trace!(
        facade = %inner.id,
        object = %inner.raw.id(),
        kind = %class.kind,
        name = slot,
        "facade created"
    );

    relink_orphans(&inner);
    if !class.weak {
        wrap_members(&inner);
    }
    Value::Observed(Observed::from_inner(inner))
}

/// Position of an object-typed child inside a raw body
enum Slot {
    Key(String),
    Index(usize),
    Member(usize),
    Entry(usize, String),
}

impl Slot {
    fn name(&self) -> String {
        match self {
            Slot::Key(key) => key.clone(),
            Slot::Index(index) => index.to_string(),
            Slot::Member(_) => "*".to_string(),
            Slot::Entry(_, token) => token.clone(),
        }
    }
}

/// Object-typed children that still need wrapping
fn children(object: &Object) -> Vec<(Slot, Value)> {
    object.read(|body| match body {
        Body::Record(fields) | Body::Instance(Instance { fields, .. }) => fields
            .iter()
            .filter(|(_, v)| matches!(v, Value::Object(_)))
            .map(|(k, v)| (Slot::Key(k.to_string()), v.clone()))
            .collect(),
        Body::Sequence(items) => items
            .iter()
            .enumerate()
            .filter(|(_, v)| matches!(v, Value::Object(_)))
            .map(|(i, v)| (Slot::Index(i), v.clone()))
            .collect(),
        Body::Set(SetBody::Strong(members)) => members
            .iter()
            .enumerate()
            .filter(|(_, v)| matches!(v, Value::Object(_)))
            .map(|(i, v)| (Slot::Member(i), v.clone()))
            .collect(),
        Body::Map(MapBody::Strong(entries)) => entries
            .iter()
            .enumerate()
            .filter(|(_, (_, v))| matches!(v, Value::Object(_)))
            .map(|(i, (k, v))| (Slot::Entry(i, k.path_token()), v.clone()))
            .collect(),
        Body::Set(SetBody::Weak(_)) | Body::Map(MapBody::Weak(_)) | Body::Buffer(_) => Vec::new(),
    })
}

/// Adopt member façades whose parent has been dropped
///
/// A raw object keeps its wrapped members alive after its own façade is
/// gone; when it is wrapped again, those members report through the new
/// façade under their original names. Roots stay roots.
fn relink_orphans(inner: &Arc<FacadeInner>) {
    let members: Vec<Observed> = inner.raw.read(|body| {
        let values: Vec<&Value> = match body {
            Body::Record(fields) => fields.iter().map(|(_, v)| v).collect(),
            Body::Sequence(items) => items.iter().collect(),
            Body::Set(SetBody::Strong(members)) => members.iter().collect(),
            Body::Map(MapBody::Strong(entries)) => entries.iter().map(|(_, v)| v).collect(),
            Body::Map(MapBody::Weak(entries)) => entries.iter().map(|(_, v)| v).collect(),
            Body::Set(SetBody::Weak(_)) | Body::Buffer(_) | Body::Instance(_) => Vec::new(),
        };
        values
            .into_iter()
            .filter_map(Value::as_observed)
            .cloned()
            .collect()
    });
    for member in members {
        if member.inner.name.is_empty() {
            continue;
        }
        let mut parent = member.inner.parent.write();
        if parent.strong_count() == 0 {
            tracing::trace!(facade = %member.inner.id, parent = %inner.id, "relinking orphan");
            *parent = Arc::downgrade(inner);
        }
    }
}

/// Replace every raw object child of a new façade with its wrapped form
///
/// Children are wrapped with the body unlocked, since a child may be the
/// very object being wrapped.
fn wrap_members(inner: &Arc<FacadeInner>) {
    let wrapped: Vec<(Slot, Value)> = children(&inner.raw)
        .into_iter()
        .map(|(slot, child)| {
            let name = slot.name();
            (slot, build(child, Some(inner), &name, inner.strict))
        })
        .collect();
    if wrapped.is_empty() {
        return;
    }
    inner.raw.write(|body| {
        for (slot, value) in wrapped {
            match (slot, &mut *body) {
                (Slot::Key(key), Body::Record(fields)) => {
                    fields.insert(key, value);
                }
                (Slot::Index(index), Body::Sequence(items)) => items[index] = value,
                (Slot::Member(index), Body::Set(SetBody::Strong(members))) => {
                    members[index] = value
                }
                (Slot::Entry(index, _), Body::Map(MapBody::Strong(entries))) => {
                    entries[index].1 = value
                }
                _ => {}
            }
        }
        // A raw member and its existing façade collapse into one member
        if let Body::Set(SetBody::Strong(members)) = body {
            let mut unique: Vec<Value> = Vec::with_capacity(members.len());
            for member in members.drain(..) {
                if !unique.iter().any(|m| m.same_value_zero(&member)) {
                    unique.push(member);
                }
            }
            *members = unique;
        }
    });
}

/// The live façade of a raw object, or the value itself
///
/// Lookups in strong collections compare by identity, and their members are
/// stored wrapped.
pub(crate) fn resolve(value: &Value) -> Value {
    match value {
        Value::Object(object) => registry::lookup(object.id())
            .map(|inner| Value::Observed(Observed::from_inner(inner)))
            .unwrap_or_else(|| value.clone()),
        other => other.clone(),
    }
}

/// Resolve a façade handle for any façade-bearing value
pub(crate) fn facade_of(value: &Value) -> Result<&Observed> {
    match value {
        Value::Observed(observed) => Ok(observed),
        Value::Opaque(_) | Value::Object(_) => Err(WatchError::NotObservable {
            found: value.type_name(),
        }),
        scalar => Err(WatchError::NotAnObject {
            found: scalar.type_name(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_output_names_identity() {
        let root = build(Value::from(Object::record([("n", 1)])), None, "", true)
            .into_observed()
            .unwrap();
        let inner = format!("{:?}", root.inner());
        assert!(inner.starts_with("FacadeInner"));
        assert!(inner.contains(&format!("{:?}", root.id())));
    }

    #[test]
    fn test_members_are_wrapped_with_slot_names() {
        let root = Object::record([
            ("list", Value::from(Object::sequence([Object::record([("x", 1)])]))),
            ("n", Value::from(1)),
        ]);
        let root = build(Value::from(root), None, "", true).into_observed().unwrap();

        let list = root.as_record().unwrap().get("list").unwrap();
        let list = list.as_observed().unwrap();
        assert_eq!(list.name(), "list");
        assert!(list.parent().unwrap().ptr_eq(&root));

        let item = list.as_sequence().unwrap().get(0).unwrap();
        assert_eq!(item.as_observed().unwrap().name(), "0");
    }

    #[test]
    fn test_cyclic_graph_terminates() {
        let object = Object::record([("me", Value::Null)]);
        object.write(|body| {
            if let Body::Record(fields) = body {
                fields.insert("me".into(), Value::Object(object.clone()));
            }
        });

        let facade = build(Value::from(object), None, "", true)
            .into_observed()
            .unwrap();
        let me = facade.as_record().unwrap().get("me").unwrap();
        assert!(me.as_observed().unwrap().ptr_eq(&facade));

        // Break the cycle so the test does not leak.
        facade.as_record().unwrap().remove("me").unwrap();
    }

    #[test]
    fn test_strict_rejects_nested_unsupported_before_building() {
        let child = Object::record([("n", 1)]);
        let root = Object::record([
            ("ok", Value::from(child.clone())),
            ("bad", Value::from(Object::instance("Widget", [("w", 1)]))),
        ]);

        let err = attach(Value::from(root), None, "", true).unwrap_err();
        assert!(matches!(err, WatchError::Unsupported { ref type_name } if type_name == "Widget"));
        assert!(registry::lookup(child.id()).is_none());
    }

    #[test]
    fn test_lenient_passes_unsupported_children_through() {
        let widget = Object::instance("Widget", [("w", 1)]);
        let root = Object::record([("widget", Value::from(widget.clone()))]);

        let facade = attach(Value::from(root), None, "", false)
            .unwrap()
            .into_observed()
            .unwrap();
        let stored = facade.as_record().unwrap().get("widget").unwrap();
        assert_eq!(stored, Value::from(widget));
    }
}
