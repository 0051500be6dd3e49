use super::Observed;
use crate::error::{Result, WatchError};
use crate::event::ChangeKind;
use crate::registry;
use crate::value::{Body, MapBody, Value};
use std::ops::Deref;

/// Façade over a key/value collection
///
/// Keys are never wrapped; values are, named after the key's path token.
/// Weak maps hold their object keys weakly and cannot be listed or cleared.
#[derive(Debug, Clone)]
pub struct MapFacade {
    facade: Observed,
}

impl MapFacade {
    pub(crate) fn new(facade: Observed) -> Self {
        Self { facade }
    }

    fn read<R>(&self, f: impl FnOnce(&MapBody) -> R) -> R {
        self.facade.raw().read(|body| match body {
            Body::Map(map) => f(map),
            other => unreachable!("map facade over {}", other.type_name()),
        })
    }

    fn write<R>(&self, f: impl FnOnce(&mut MapBody) -> R) -> R {
        self.facade.raw().write(|body| match body {
            Body::Map(map) => f(map),
            other => unreachable!("map facade over {}", other.type_name()),
        })
    }

    /// Value stored under a key
    pub fn get(&self, key: &Value) -> Option<Value> {
        self.read(|map| map.get(key).cloned())
    }

    /// Whether a key is present
    pub fn contains_key(&self, key: &Value) -> bool {
        self.read(|map| map.contains_key(key))
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.read(MapBody::len)
    }

    /// Whether there are no live entries
    pub fn is_empty(&self) -> bool {
        self.read(MapBody::is_empty)
    }

    /// Entries in insertion order
    pub fn entries(&self) -> Result<Vec<(Value, Value)>> {
        self.read(|map| map.entries().map(<[(Value, Value)]>::to_vec))
            .ok_or(WatchError::WeakCollection {
                operation: "iteration",
            })
    }

    /// Keys of a strong map
    pub fn keys(&self) -> Result<Vec<Value>> {
        Ok(self.entries()?.into_iter().map(|(k, _)| k).collect())
    }

    /// Values of a strong map
    pub fn values(&self) -> Result<Vec<Value>> {
        Ok(self.entries()?.into_iter().map(|(_, v)| v).collect())
    }

    /// Insert or replace the value at `key`, returning the stored value
    pub fn set(&self, key: impl Into<Value>, value: impl Into<Value>) -> Result<Value> {
        let key = key.into();
        if self.is_weak() && key.downgrade().is_none() {
            return Err(WatchError::InvalidWeakMember {
                found: key.type_name(),
            });
        }
        let _guard = registry::begin_mutation()?;
        let inner = self.facade.inner();
        let token = key.path_token();
        let value = inner.adopt(value.into(), &token)?;
        let old = self.write(|map| map.insert(key, value.clone()))?;
        inner.notify(ChangeKind::Change, token, Some(value.clone()), old);
        Ok(value)
    }

    /// Remove the entry at `key`, returning its value
    ///
    /// Removing a missing key still notifies, with no old value.
    pub fn delete(&self, key: &Value) -> Result<Option<Value>> {
        let _guard = registry::begin_mutation()?;
        let old = self.write(|map| map.remove(key));
        self.facade
            .inner()
            .notify(ChangeKind::Delete, key.path_token(), None, old.clone());
        Ok(old)
    }

    /// Remove every entry; fires at path `*`
    pub fn clear(&self) -> Result<()> {
        if self.is_weak() {
            return Err(WatchError::WeakCollection { operation: "clear" });
        }
        let _guard = registry::begin_mutation()?;
        self.write(|map| *map = MapBody::Strong(Vec::new()));
        self.facade
            .inner()
            .notify(ChangeKind::Change, "*".to_string(), None, None);
        Ok(())
    }
}

impl Deref for MapFacade {
    type Target = Observed;

    fn deref(&self) -> &Observed {
        &self.facade
    }
}

#[cfg(test)]
mod tests {
    use crate::error::WatchError;
    use crate::observer::ChangeLog;
    use crate::value::{Object, Value};
    use crate::wrap;

    #[test]
    fn test_set_and_delete_use_key_token() {
        let root = wrap(Object::map([(1, "one")])).unwrap();
        let map = root.as_observed().unwrap().as_map().unwrap();
        let log = ChangeLog::new();
        map.observe(log.observer()).unwrap();

        map.set(1, "uno").unwrap();
        map.set("k", true).unwrap();
        map.delete(&Value::from(1)).unwrap();
        map.delete(&Value::from("nope")).unwrap();
        map.clear().unwrap();

        assert_eq!(
            log.lines(),
            vec![
                "change 1 old=\"one\" new=\"uno\"",
                "change k new=true",
                "delete 1 old=\"uno\"",
                "delete nope",
                "change *",
            ]
        );
    }

    #[test]
    fn test_values_are_wrapped_and_named_by_key() {
        let root = wrap(Object::map([("inner", Object::record([("n", 1)]))])).unwrap();
        let map = root.as_observed().unwrap().as_map().unwrap();

        let value = map.get(&Value::from("inner")).unwrap();
        assert_eq!(value.as_observed().unwrap().name(), "inner");
        assert_eq!(map.keys().unwrap(), vec![Value::from("inner")]);
    }

    #[test]
    fn test_weak_map_wraps_values_but_not_keys() {
        let key = Object::record([("k", 1)]);
        let root = wrap(Object::weak_map([]).unwrap()).unwrap();
        let map = root.as_observed().unwrap().as_map().unwrap();

        let stored = map
            .set(key.clone(), Object::record([("v", 2)]))
            .unwrap();
        assert!(stored.as_observed().is_some());
        assert!(map.get(&Value::from(key.clone())).is_some());
        assert!(crate::registry::lookup(key.id()).is_none());

        assert!(matches!(map.entries(), Err(WatchError::WeakCollection { .. })));
        assert!(matches!(
            map.set("text", 1),
            Err(WatchError::InvalidWeakMember { found: "string" })
        ));
    }

    #[test]
    fn test_weak_map_delete_releases_values_of_dead_keys() {
        let key = Object::record([("k", 1)]);
        let other = Object::record([("o", 1)]);
        let root = wrap(Object::weak_map([]).unwrap()).unwrap();
        let map = root.as_observed().unwrap().as_map().unwrap();

        let stored = map.set(key.clone(), Object::record([("v", 2)])).unwrap();
        let value = stored.as_observed().unwrap().downgrade();
        drop(stored);
        drop(key);
        assert!(value.upgrade().is_some());
        assert_eq!(map.len(), 0);

        assert_eq!(map.delete(&Value::from(other)).unwrap(), None);
        assert!(value.upgrade().is_none());
    }
}
