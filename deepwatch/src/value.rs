//! Raw value model
//!
//! [`Value`] is the dynamic value every façade reads and writes. Scalars are
//! plain data; [`Object`]s are shared, identity-bearing containers whose body
//! sits behind a lock. Once an object is wrapped its body is only changed
//! through the façade, which is why the body has no public mutable access.

use crate::buffer::NumericBuffer;
use crate::error::{Result, WatchError};
use crate::facade::{FacadeInner, Observed};
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::RwLock;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Identity of a raw object
///
/// Assigned once at construction and never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

static OBJECT_COUNTER: AtomicU64 = AtomicU64::new(1);

impl ObjectId {
    fn next() -> Self {
        Self(OBJECT_COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obj:{}", self.0)
    }
}

/// Object-like values that are never wrapped
#[derive(Debug, Clone)]
pub enum Opaque {
    /// A point in time
    Timestamp(DateTime<Utc>),
    /// A regular expression
    Pattern(Regex),
    /// An error with its message
    Error(String),
}

impl PartialEq for Opaque {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Opaque::Timestamp(a), Opaque::Timestamp(b)) => a == b,
            (Opaque::Pattern(a), Opaque::Pattern(b)) => a.as_str() == b.as_str(),
            (Opaque::Error(a), Opaque::Error(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opaque::Timestamp(ts) => f.write_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Opaque::Pattern(re) => write!(f, "/{}/", re.as_str()),
            Opaque::Error(message) => write!(f, "Error: {message}"),
        }
    }
}

/// A dynamic value
///
/// Equality follows same-value-zero: `NaN` equals `NaN`, `0.0` equals
/// `-0.0`, and objects and façades compare by identity.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent value; also what a sequence hole reads as
    #[default]
    Null,
    /// A boolean
    Bool(bool),
    /// A double-precision number
    Number(f64),
    /// A big integer
    BigInt(i128),
    /// A string
    String(String),
    /// A value that is never wrapped
    Opaque(Opaque),
    /// A raw object, not observed
    Object(Object),
    /// An observable façade
    Observed(Observed),
}

impl Value {
    /// Short type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::BigInt(_) => "bigint",
            Value::String(_) => "string",
            Value::Opaque(Opaque::Timestamp(_)) => "timestamp",
            Value::Opaque(Opaque::Pattern(_)) => "pattern",
            Value::Opaque(Opaque::Error(_)) => "error",
            Value::Object(_) => "object",
            Value::Observed(_) => "observed",
        }
    }

    /// True for everything that is not a scalar
    pub fn is_object(&self) -> bool {
        matches!(
            self,
            Value::Opaque(_) | Value::Object(_) | Value::Observed(_)
        )
    }

    /// Whether this is [`Value::Null`]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The boolean, if this is one
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The number, if this is one
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The string, if this is one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The raw object, if this is one
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// The façade, if this is one
    pub fn as_observed(&self) -> Option<&Observed> {
        match self {
            Value::Observed(observed) => Some(observed),
            _ => None,
        }
    }

    /// Take the façade, if this is one
    pub fn into_observed(self) -> Option<Observed> {
        match self {
            Value::Observed(observed) => Some(observed),
            _ => None,
        }
    }

    /// Same-value-zero comparison
    pub fn same_value_zero(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Opaque(a), Value::Opaque(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Observed(a), Value::Observed(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Path segment used when this value is a map key
    pub fn path_token(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::BigInt(n) => n.to_string(),
            Value::String(s) => s.clone(),
            Value::Opaque(opaque) => opaque.to_string(),
            Value::Object(object) => format!("[{}]", object.id()),
            Value::Observed(observed) => format!("[{}]", observed.raw().id()),
        }
    }

    /// Text used by the default sequence sort
    pub(crate) fn sort_text(&self) -> String {
        match self {
            Value::Object(_) | Value::Observed(_) => "[object Object]".to_string(),
            other => other.path_token(),
        }
    }

    pub(crate) fn downgrade(&self) -> Option<WeakRef> {
        match self {
            Value::Object(object) => Some(WeakRef::Object(Arc::downgrade(&object.cell))),
            Value::Observed(observed) => Some(WeakRef::Observed(observed.downgrade())),
            _ => None,
        }
    }

    /// Snapshot as JSON
    ///
    /// Façades export their raw contents. A cycle back to an object already
    /// on the current path exports as `null`.
    pub fn to_json(&self) -> serde_json::Value {
        let mut path = HashSet::new();
        self.to_json_inner(&mut path)
    }

    fn to_json_inner(&self, path: &mut HashSet<ObjectId>) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::BigInt(n) => {
                if let Ok(n) = i64::try_from(*n) {
                    Json::from(n)
                } else if let Ok(n) = u64::try_from(*n) {
                    Json::from(n)
                } else {
                    Json::String(n.to_string())
                }
            }
            Value::String(s) => Json::String(s.clone()),
            Value::Opaque(opaque) => Json::String(opaque.to_string()),
            Value::Object(object) => object.to_json_inner(path),
            Value::Observed(observed) => observed.raw().to_json_inner(path),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same_value_zero(other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s:?}"),
            Value::Object(_) | Value::Observed(_) => write!(f, "{}", self.to_json()),
            other => f.write_str(&other.path_token()),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{sign}Infinity")
    } else if n == 0.0 {
        "0".to_string()
    } else {
        n.to_string()
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Opaque> for Value {
    fn from(opaque: Opaque) -> Self {
        Value::Opaque(opaque)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Self {
        Value::Opaque(Opaque::Timestamp(ts))
    }
}

impl From<Regex> for Value {
    fn from(re: Regex) -> Self {
        Value::Opaque(Opaque::Pattern(re))
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Value::Object(object)
    }
}

impl From<Observed> for Value {
    fn from(observed: Observed) -> Self {
        Value::Observed(observed)
    }
}

impl From<NumericBuffer> for Value {
    fn from(buffer: NumericBuffer) -> Self {
        Value::Object(Object::buffer(buffer))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::Object(Object::sequence(items)),
            Json::Object(fields) => Value::Object(Object::record(fields)),
        }
    }
}

/// Insertion-ordered string-keyed fields of a record
#[derive(Debug, Clone, Default)]
pub struct Fields {
    entries: Vec<(String, Value)>,
}

impl Fields {
    /// Empty fields
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no fields
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value of a field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Whether a field exists
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Field names in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Fields in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Insert or replace in place, returning the prior value
    pub(crate) fn insert(&mut self, key: String, value: Value) -> Option<Value> {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub(crate) fn remove(&mut self, key: &str) -> Option<Value> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (key, value) in iter {
            fields.insert(key.into(), value.into());
        }
        fields
    }
}

/// A keyed record whose class is not a plain record
#[derive(Debug, Clone)]
pub struct Instance {
    /// Class name
    pub class: String,
    /// Keyed fields
    pub fields: Fields,
}

/// Non-owning reference to a set member or map key of a weak collection
#[derive(Clone)]
pub enum WeakRef {
    /// A raw object
    Object(Weak<ObjectCell>),
    /// A façade
    Observed(Weak<FacadeInner>),
}

impl WeakRef {
    /// Whether the referent is still alive
    pub fn is_live(&self) -> bool {
        match self {
            WeakRef::Object(weak) => weak.strong_count() > 0,
            WeakRef::Observed(weak) => weak.strong_count() > 0,
        }
    }

    /// Whether this refers to the same allocation as `value`
    pub fn refers_to(&self, value: &Value) -> bool {
        match (self, value) {
            (WeakRef::Object(weak), Value::Object(object)) => {
                std::ptr::eq(weak.as_ptr(), Arc::as_ptr(&object.cell))
            }
            (WeakRef::Observed(weak), Value::Observed(observed)) => observed.is_target_of(weak),
            _ => false,
        }
    }

    /// The referent, if still alive
    pub fn upgrade(&self) -> Option<Value> {
        match self {
            WeakRef::Object(weak) => weak.upgrade().map(|cell| Value::Object(Object { cell })),
            WeakRef::Observed(weak) => weak.upgrade().map(|inner| Value::Observed(Observed::from_inner(inner))),
        }
    }
}

impl fmt::Debug for WeakRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WeakRef").field(&self.is_live()).finish()
    }
}

fn weak_member(value: &Value) -> Result<WeakRef> {
    value.downgrade().ok_or(WatchError::InvalidWeakMember {
        found: value.type_name(),
    })
}

/// Members of a unique-value collection, in insertion order
#[derive(Debug, Clone)]
pub enum SetBody {
    /// Members held strongly, in insertion order
    Strong(Vec<Value>),
    /// Object members held weakly
    Weak(Vec<WeakRef>),
}

impl SetBody {
    /// Whether members are held weakly
    pub fn is_weak(&self) -> bool {
        matches!(self, SetBody::Weak(_))
    }

    /// Number of members; dead weak members are not counted
    pub fn len(&self) -> usize {
        match self {
            SetBody::Strong(members) => members.len(),
            SetBody::Weak(members) => members.iter().filter(|m| m.is_live()).count(),
        }
    }

    /// Whether there are no members
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a member is present
    pub fn contains(&self, value: &Value) -> bool {
        match self {
            SetBody::Strong(members) => members.iter().any(|m| m.same_value_zero(value)),
            SetBody::Weak(members) => members.iter().any(|m| m.refers_to(value)),
        }
    }

    /// Members of a strong set; `None` for the weak variant
    pub fn members(&self) -> Option<&[Value]> {
        match self {
            SetBody::Strong(members) => Some(members),
            SetBody::Weak(_) => None,
        }
    }

    /// Returns whether the value was newly added
    pub(crate) fn insert(&mut self, value: Value) -> Result<bool> {
        if self.contains(&value) {
            return Ok(false);
        }
        match self {
            SetBody::Strong(members) => members.push(value),
            SetBody::Weak(members) => {
                let member = weak_member(&value)?;
                members.retain(WeakRef::is_live);
                members.push(member);
            }
        }
        Ok(true)
    }

    /// Removes a member, returning the stored value
    pub(crate) fn remove(&mut self, value: &Value) -> Option<Value> {
        match self {
            SetBody::Strong(members) => {
                let index = members.iter().position(|m| m.same_value_zero(value))?;
                Some(members.remove(index))
            }
            SetBody::Weak(members) => {
                members.retain(WeakRef::is_live);
                let index = members.iter().position(|m| m.refers_to(value))?;
                members.remove(index).upgrade()
            }
        }
    }
}

/// Entries of a key/value collection, in insertion order
#[derive(Debug, Clone)]
pub enum MapBody {
    /// Entries held strongly, in insertion order
    Strong(Vec<(Value, Value)>),
    /// Entries whose object keys are held weakly
    Weak(Vec<(WeakRef, Value)>),
}

impl MapBody {
    /// Whether keys are held weakly
    pub fn is_weak(&self) -> bool {
        matches!(self, MapBody::Weak(_))
    }

    /// Number of entries; dead weak keys are not counted
    pub fn len(&self) -> usize {
        match self {
            MapBody::Strong(entries) => entries.len(),
            MapBody::Weak(entries) => entries.iter().filter(|(k, _)| k.is_live()).count(),
        }
    }

    /// Whether there are no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value stored under a key
    pub fn get(&self, key: &Value) -> Option<&Value> {
        match self {
            MapBody::Strong(entries) => entries
                .iter()
                .find(|(k, _)| k.same_value_zero(key))
                .map(|(_, v)| v),
            MapBody::Weak(entries) => entries
                .iter()
                .find(|(k, _)| k.refers_to(key))
                .map(|(_, v)| v),
        }
    }

    /// Whether a key is present
    pub fn contains_key(&self, key: &Value) -> bool {
        self.get(key).is_some()
    }

    /// Entries of a strong map; `None` for the weak variant
    pub fn entries(&self) -> Option<&[(Value, Value)]> {
        match self {
            MapBody::Strong(entries) => Some(entries),
            MapBody::Weak(_) => None,
        }
    }

    /// Insert or replace in place, returning the prior value
    pub(crate) fn insert(&mut self, key: Value, value: Value) -> Result<Option<Value>> {
        match self {
            MapBody::Strong(entries) => {
                match entries.iter_mut().find(|(k, _)| k.same_value_zero(&key)) {
                    Some((_, slot)) => Ok(Some(std::mem::replace(slot, value))),
                    None => {
                        entries.push((key, value));
                        Ok(None)
                    }
                }
            }
            MapBody::Weak(entries) => {
                let weak = weak_member(&key)?;
                match entries.iter_mut().find(|(k, _)| k.refers_to(&key)) {
                    Some((_, slot)) => Ok(Some(std::mem::replace(slot, value))),
                    None => {
                        entries.retain(|(k, _)| k.is_live());
                        entries.push((weak, value));
                        Ok(None)
                    }
                }
            }
        }
    }

    pub(crate) fn remove(&mut self, key: &Value) -> Option<Value> {
        match self {
            MapBody::Strong(entries) => {
                let index = entries.iter().position(|(k, _)| k.same_value_zero(key))?;
                Some(entries.remove(index).1)
            }
            MapBody::Weak(entries) => {
                // Dead keys still hold their values strongly
                entries.retain(|(k, _)| k.is_live());
                let index = entries.iter().position(|(k, _)| k.refers_to(key))?;
                Some(entries.remove(index).1)
            }
        }
    }
}

/// Contents of a raw object
#[derive(Debug, Clone)]
pub enum Body {
    /// A plain record
    Record(Fields),
    /// A sequence
    Sequence(Vec<Value>),
    /// A unique-value collection
    Set(SetBody),
    /// A key/value collection
    Map(MapBody),
    /// A numeric buffer
    Buffer(NumericBuffer),
    /// A keyed record of a named class
    Instance(Instance),
}

impl Body {
    /// Runtime class name, such as `Array` or `WeakMap`
    pub fn type_name(&self) -> String {
        match self {
            Body::Record(_) => "Object".to_string(),
            Body::Sequence(_) => "Array".to_string(),
            Body::Set(SetBody::Strong(_)) => "Set".to_string(),
            Body::Set(SetBody::Weak(_)) => "WeakSet".to_string(),
            Body::Map(MapBody::Strong(_)) => "Map".to_string(),
            Body::Map(MapBody::Weak(_)) => "WeakMap".to_string(),
            Body::Buffer(buffer) => buffer.kind().type_name().to_string(),
            Body::Instance(instance) => instance.class.clone(),
        }
    }
}

/// Shared storage behind an [`Object`]
#[doc(hidden)]
pub struct ObjectCell {
    id: ObjectId,
    body: RwLock<Body>,
}

/// A shared raw object
///
/// Cloning shares the same object. Equality is identity.
#[derive(Clone)]
pub struct Object {
    cell: Arc<ObjectCell>,
}

impl Object {
    /// Object with a fresh identity
    pub fn new(body: Body) -> Self {
        Self {
            cell: Arc::new(ObjectCell {
                id: ObjectId::next(),
                body: RwLock::new(body),
            }),
        }
    }

    /// Plain record from key/value pairs
    pub fn record<K: Into<String>, V: Into<Value>>(
        fields: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        Self::new(Body::Record(fields.into_iter().collect()))
    }

    /// Sequence from items
    pub fn sequence<V: Into<Value>>(items: impl IntoIterator<Item = V>) -> Self {
        Self::new(Body::Sequence(items.into_iter().map(Into::into).collect()))
    }

    /// Strong unique-value collection; duplicates are dropped
    pub fn set<V: Into<Value>>(members: impl IntoIterator<Item = V>) -> Self {
        let mut body = SetBody::Strong(Vec::new());
        for member in members {
            // Strong sets accept every value.
            let _ = body.insert(member.into());
        }
        Self::new(Body::Set(body))
    }

    /// Weak unique-value collection holding `members` weakly
    pub fn weak_set(members: impl IntoIterator<Item = Value>) -> Result<Self> {
        let mut body = SetBody::Weak(Vec::new());
        for member in members {
            body.insert(member)?;
        }
        Ok(Self::new(Body::Set(body)))
    }

    /// Strong key/value collection; later duplicates replace earlier ones
    pub fn map<K: Into<Value>, V: Into<Value>>(entries: impl IntoIterator<Item = (K, V)>) -> Self {
        let mut body = MapBody::Strong(Vec::new());
        for (key, value) in entries {
            // Strong maps accept every key.
            let _ = body.insert(key.into(), value.into());
        }
        Self::new(Body::Map(body))
    }

    /// Weak key/value collection holding its keys weakly
    pub fn weak_map(entries: impl IntoIterator<Item = (Value, Value)>) -> Result<Self> {
        let mut body = MapBody::Weak(Vec::new());
        for (key, value) in entries {
            body.insert(key, value)?;
        }
        Ok(Self::new(Body::Map(body)))
    }

    /// Numeric buffer
    pub fn buffer(buffer: NumericBuffer) -> Self {
        Self::new(Body::Buffer(buffer))
    }

    /// Keyed record of a named class
    pub fn instance<K: Into<String>, V: Into<Value>>(
        class: impl Into<String>,
        fields: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        Self::new(Body::Instance(Instance {
            class: class.into(),
            fields: fields.into_iter().collect(),
        }))
    }

    /// Identity of this object
    pub fn id(&self) -> ObjectId {
        self.cell.id
    }

    /// Whether both handles share one object
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    /// Read the body under a shared lock
    pub fn read<R>(&self, f: impl FnOnce(&Body) -> R) -> R {
        f(&self.cell.body.read())
    }

    pub(crate) fn write<R>(&self, f: impl FnOnce(&mut Body) -> R) -> R {
        f(&mut self.cell.body.write())
    }

    /// Runtime class name of the body
    pub fn type_name(&self) -> String {
        self.read(Body::type_name)
    }

    /// Export as JSON; a back-reference to an object on the current path becomes `null`
    pub fn to_json(&self) -> serde_json::Value {
        self.to_json_inner(&mut HashSet::new())
    }

    fn to_json_inner(&self, path: &mut HashSet<ObjectId>) -> serde_json::Value {
        use serde_json::Value as Json;
        if !path.insert(self.id()) {
            return Json::Null;
        }
        let json = self.read(|body| match body {
            Body::Record(fields) | Body::Instance(Instance { fields, .. }) => Json::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_json_inner(path)))
                    .collect(),
            ),
            Body::Sequence(items) => {
                Json::Array(items.iter().map(|v| v.to_json_inner(path)).collect())
            }
            Body::Set(set) => Json::Array(
                set.members()
                    .unwrap_or_default()
                    .iter()
                    .map(|v| v.to_json_inner(path))
                    .collect(),
            ),
            Body::Map(map) => Json::Array(
                map.entries()
                    .unwrap_or_default()
                    .iter()
                    .map(|(k, v)| Json::Array(vec![k.to_json_inner(path), v.to_json_inner(path)]))
                    .collect(),
            ),
            Body::Buffer(buffer) => Json::Array(
                buffer
                    .to_values()
                    .iter()
                    .map(|v| v.to_json_inner(path))
                    .collect(),
            ),
        });
        path.remove(&self.id());
        json
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Object {}

impl fmt::Debug for ObjectCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectCell").field("id", &self.id).finish_non_exhaustive()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.body.try_read() {
            Some(body) => write!(f, "Object({} {})", self.id(), body.type_name()),
            None => write!(f, "Object({})", self.id()),
        }
    }
}
