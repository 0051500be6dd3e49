use super::Observed;
use crate::error::{Result, WatchError};
use crate::event::ChangeKind;
use crate::registry;
use crate::value::{Body, SetBody, Value};
use std::ops::Deref;

/// Every set change is reported at this path
const MEMBER_PATH: &str = "*";

/// Façade over a unique-value collection
///
/// Strong sets store their object members wrapped. Weak sets hold object
/// members weakly and never wrap them; they cannot be listed or cleared.
#[derive(Debug, Clone)]
pub struct SetFacade {
    facade: Observed,
}

impl SetFacade {
    pub(crate) fn new(facade: Observed) -> Self {
        Self { facade }
    }

    fn read<R>(&self, f: impl FnOnce(&SetBody) -> R) -> R {
        self.facade.raw().read(|body| match body {
            Body::Set(set) => f(set),
            other => unreachable!("set facade over {}", other.type_name()),
        })
    }

    fn write<R>(&self, f: impl FnOnce(&mut SetBody) -> R) -> R {
        self.facade.raw().write(|body| match body {
            Body::Set(set) => f(set),
            other => unreachable!("set facade over {}", other.type_name()),
        })
    }

    /// Lookup key for a member: strong sets hold the façade of a raw object
    fn member_key(&self, value: &Value) -> Value {
        if self.is_weak() {
            value.clone()
        } else {
            super::resolve(value)
        }
    }

    /// Whether a member is present; raw objects match their façade
    pub fn contains(&self, value: &Value) -> bool {
        let value = self.member_key(value);
        self.read(|set| set.contains(&value))
    }

    /// Number of live members
    pub fn len(&self) -> usize {
        self.read(SetBody::len)
    }

    /// Whether there are no live members
    pub fn is_empty(&self) -> bool {
        self.read(SetBody::is_empty)
    }

    /// Members in insertion order
    pub fn values(&self) -> Result<Vec<Value>> {
        self.read(|set| set.members().map(<[Value]>::to_vec))
            .ok_or(WatchError::WeakCollection {
                operation: "iteration",
            })
    }

    /// Insert a member, returning whether it was new
    ///
    /// A change is reported even when the member was already present.
    pub fn add(&self, value: impl Into<Value>) -> Result<bool> {
        let _guard = registry::begin_mutation()?;
        let inner = self.facade.inner();
        let value = value.into();
        let value = if self.is_weak() {
            value
        } else {
            inner.adopt(value, MEMBER_PATH)?
        };
        let added = self.write(|set| set.insert(value.clone()))?;
        inner.notify(ChangeKind::Change, MEMBER_PATH.to_string(), Some(value), None);
        Ok(added)
    }

    /// Remove a member, returning whether it was present
    ///
    /// Removing a missing member still notifies, with no old value.
    pub fn delete(&self, value: &Value) -> Result<bool> {
        let _guard = registry::begin_mutation()?;
        let key = self.member_key(value);
        let removed = self.write(|set| set.remove(&key));
        let found = removed.is_some();
        self.facade
            .inner()
            .notify(ChangeKind::Delete, MEMBER_PATH.to_string(), None, removed);
        Ok(found)
    }

    /// Remove every member; fires at path `*`
    pub fn clear(&self) -> Result<()> {
        if self.is_weak() {
            return Err(WatchError::WeakCollection { operation: "clear" });
        }
        let _guard = registry::begin_mutation()?;
        self.write(|set| *set = SetBody::Strong(Vec::new()));
        self.facade
            .inner()
            .notify(ChangeKind::Change, MEMBER_PATH.to_string(), None, None);
        Ok(())
    }
}

impl Deref for SetFacade {
    type Target = Observed;

    fn deref(&self) -> &Observed {
        &self.facade
    }
}
