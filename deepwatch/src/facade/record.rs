use super::Observed;
use crate::error::Result;
use crate::event::ChangeKind;
use crate::registry;
use crate::value::{Body, Fields, Value};
use std::ops::Deref;

/// Façade over a plain record
#[derive(Debug, Clone)]
pub struct RecordFacade {
    facade: Observed,
}

impl RecordFacade {
    pub(crate) fn new(facade: Observed) -> Self {
        Self { facade }
    }

    fn read<R>(&self, f: impl FnOnce(&Fields) -> R) -> R {
        self.facade.raw().read(|body| match body {
            Body::Record(fields) => f(fields),
            other => unreachable!("record facade over {}", other.type_name()),
        })
    }

    fn write<R>(&self, f: impl FnOnce(&mut Fields) -> R) -> R {
        self.facade.raw().write(|body| match body {
            Body::Record(fields) => f(fields),
            other => unreachable!("record facade over {}", other.type_name()),
        })
    }

    /// Value of a property
    pub fn get(&self, key: &str) -> Option<Value> {
        self.read(|fields| fields.get(key).cloned())
    }

    /// Whether a property exists
    pub fn contains_key(&self, key: &str) -> bool {
        self.read(|fields| fields.contains_key(key))
    }

    /// Property names in insertion order
    pub fn keys(&self) -> Vec<String> {
        self.read(|fields| fields.keys().map(str::to_string).collect())
    }

    /// Properties in insertion order
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.read(|fields| {
            fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect()
        })
    }

    /// Number of properties
    pub fn len(&self) -> usize {
        self.read(Fields::len)
    }

    /// Whether there are no properties
    pub fn is_empty(&self) -> bool {
        self.read(Fields::is_empty)
    }

    /// Assign a property, returning the stored (wrapped) value
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Result<Value> {
        let key = key.into();
        let _guard = registry::begin_mutation()?;
        let inner = self.facade.inner();
        let value = inner.adopt(value.into(), &key)?;
        let old = self.write(|fields| fields.insert(key.clone(), value.clone()));
        inner.notify(ChangeKind::Change, key, Some(value.clone()), old);
        Ok(value)
    }

    /// Delete a property, returning its prior value
    ///
    /// Deleting a missing property still notifies, with no old value.
    pub fn remove(&self, key: &str) -> Result<Option<Value>> {
        let _guard = registry::begin_mutation()?;
        let old = self.write(|fields| fields.remove(key));
        self.facade
            .inner()
            .notify(ChangeKind::Delete, key.to_string(), None, old.clone());
        Ok(old)
    }
}

impl Deref for RecordFacade {
    type Target = Observed;

    fn deref(&self) -> &Observed {
        &self.facade
    }
}

#[cfg(test)]
mod tests {
    use crate::observer::ChangeLog;
    use crate::value::{Object, Value};
    use crate::wrap;

    #[test]
    fn test_set_reports_prior_and_new() {
        let root = wrap(Object::record([("a", 1)])).unwrap();
        let record = root.as_observed().unwrap().as_record().unwrap();
        let log = ChangeLog::new();
        record.observe(log.observer()).unwrap();

        record.set("a", 2).unwrap();
        record.set("b", "x").unwrap();

        assert_eq!(log.lines(), vec!["change a old=1 new=2", "change b new=\"x\""]);
        assert_eq!(record.keys(), vec!["a", "b"]);
    }

    #[test]
    fn test_assigned_object_is_wrapped_under_key() {
        let root = wrap(Object::record(Vec::<(&str, Value)>::new())).unwrap();
        let record = root.as_observed().unwrap().as_record().unwrap();

        let stored = record.set("child", Object::record([("n", 1)])).unwrap();
        let child = stored.as_observed().unwrap();
        assert_eq!(child.name(), "child");
        assert!(child.parent().unwrap().ptr_eq(&record));
    }

    #[test]
    fn test_remove_missing_key_still_fires() {
        let root = wrap(Object::record([("a", 1)])).unwrap();
        let record = root.as_observed().unwrap().as_record().unwrap();
        let log = ChangeLog::new();
        record.observe(log.observer()).unwrap();

        assert_eq!(record.remove("a").unwrap(), Some(Value::from(1)));
        assert_eq!(record.remove("missing").unwrap(), None);

        assert_eq!(log.lines(), vec!["delete a old=1", "delete missing"]);
    }
}
