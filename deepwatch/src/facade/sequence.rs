use super::Observed;
use crate::error::Result;
use crate::event::ChangeKind;
use crate::registry;
use crate::value::{Body, Object, Value};
use std::cmp::Ordering;
use std::ops::Deref;

/// Façade over a sequence
///
/// Reordering operations (`sort`, `sort_by`, `reverse`) report a single
/// change at path `*` without old or new values.
#[derive(Debug, Clone)]
pub struct SequenceFacade {
    facade: Observed,
}

impl SequenceFacade {
    pub(crate) fn new(facade: Observed) -> Self {
        Self { facade }
    }

    fn read<R>(&self, f: impl FnOnce(&Vec<Value>) -> R) -> R {
        self.facade.raw().read(|body| match body {
            Body::Sequence(items) => f(items),
            other => unreachable!("sequence facade over {}", other.type_name()),
        })
    }

    fn write<R>(&self, f: impl FnOnce(&mut Vec<Value>) -> R) -> R {
        self.facade.raw().write(|body| match body {
            Body::Sequence(items) => f(items),
            other => unreachable!("sequence facade over {}", other.type_name()),
        })
    }

    /// Item at an index; holes read as `Null`
    pub fn get(&self, index: usize) -> Option<Value> {
        self.read(|items| items.get(index).cloned())
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.read(Vec::len)
    }

    /// Whether there are no items
    pub fn is_empty(&self) -> bool {
        self.read(Vec::is_empty)
    }

    /// Every item in order
    pub fn to_vec(&self) -> Vec<Value> {
        self.read(Vec::clone)
    }

    /// Position of the first item equal to `value`
    pub fn index_of(&self, value: &Value) -> Option<usize> {
        let value = super::resolve(value);
        self.read(|items| items.iter().position(|item| *item == value))
    }

    /// Assign at `index`, growing the sequence with holes if needed
    pub fn set(&self, index: usize, value: impl Into<Value>) -> Result<Value> {
        let _guard = registry::begin_mutation()?;
        let inner = self.facade.inner();
        let value = inner.adopt(value.into(), &index.to_string())?;
        let old = self.write(|items| {
            if index < items.len() {
                Some(std::mem::replace(&mut items[index], value.clone()))
            } else {
                items.resize(index, Value::Null);
                items.push(value.clone());
                None
            }
        });
        inner.notify(ChangeKind::Change, index.to_string(), Some(value.clone()), old);
        Ok(value)
    }

    /// Delete the item at `index`, leaving a hole that reads as `Null`
    ///
    /// The length is unchanged. Deleting past the end still notifies, with
    /// no old value.
    pub fn delete(&self, index: usize) -> Result<Option<Value>> {
        let _guard = registry::begin_mutation()?;
        let old = self.write(|items| {
            items
                .get_mut(index)
                .map(|slot| std::mem::replace(slot, Value::Null))
        });
        self.facade
            .inner()
            .notify(ChangeKind::Delete, index.to_string(), None, old.clone());
        Ok(old)
    }

    /// Append one item, returning the new length
    pub fn push(&self, value: impl Into<Value>) -> Result<usize> {
        let _guard = registry::begin_mutation()?;
        let inner = self.facade.inner();
        let index = self.len();
        let value = inner.adopt(value.into(), &index.to_string())?;
        let len = self.write(|items| {
            items.push(value.clone());
            items.len()
        });
        inner.notify(ChangeKind::Change, (len - 1).to_string(), Some(value), None);
        Ok(len)
    }

    /// Remove the last item; an empty sequence is left alone silently
    pub fn pop(&self) -> Result<Option<Value>> {
        let _guard = registry::begin_mutation()?;
        let (old_len, removed) = self.write(|items| (items.len(), items.pop()));
        if let Some(removed) = &removed {
            self.facade.inner().notify(
                ChangeKind::Delete,
                (old_len - 1).to_string(),
                None,
                Some(removed.clone()),
            );
        }
        Ok(removed)
    }

    /// Insert one item at the front, returning the new length
    pub fn unshift(&self, value: impl Into<Value>) -> Result<usize> {
        let _guard = registry::begin_mutation()?;
        let inner = self.facade.inner();
        let value = inner.adopt(value.into(), "0")?;
        let len = self.write(|items| {
            items.insert(0, value.clone());
            items.len()
        });
        inner.notify(ChangeKind::Change, "0".to_string(), Some(value), None);
        Ok(len)
    }

    /// Remove the first item; an empty sequence is left alone silently
    pub fn shift(&self) -> Result<Option<Value>> {
        let _guard = registry::begin_mutation()?;
        let removed = self.write(|items| (!items.is_empty()).then(|| items.remove(0)));
        if let Some(removed) = &removed {
            self.facade.inner().notify(
                ChangeKind::Delete,
                "0".to_string(),
                None,
                Some(removed.clone()),
            );
        }
        Ok(removed)
    }

    /// Remove `delete_count` items at `start` and insert `items` there
    ///
    /// `start` and `delete_count` are clamped to the sequence. One change is
    /// reported at the clamped offset, carrying the removed and inserted
    /// items as fresh raw sequences. Returns the removed items.
    pub fn splice(
        &self,
        start: usize,
        delete_count: usize,
        items: impl IntoIterator<Item = Value>,
    ) -> Result<Vec<Value>> {
        let _guard = registry::begin_mutation()?;
        let inner = self.facade.inner();
        let len = self.len();
        let start = start.min(len);
        let end = start + delete_count.min(len - start);
        let inserted = items
            .into_iter()
            .enumerate()
            .map(|(i, item)| inner.adopt(item, &(start + i).to_string()))
            .collect::<Result<Vec<_>>>()?;
        let removed: Vec<Value> =
            self.write(|body| body.splice(start..end, inserted.iter().cloned()).collect());
        inner.notify(
            ChangeKind::Change,
            start.to_string(),
            Some(Value::Object(Object::sequence(inserted))),
            Some(Value::Object(Object::sequence(removed.clone()))),
        );
        Ok(removed)
    }

    /// Sort by the text form of each item
    pub fn sort(&self) -> Result<()> {
        self.reorder(|items| items.sort_by_cached_key(Value::sort_text))
    }

    /// Stable sort with a caller-supplied comparator
    ///
    /// The comparator runs on a copy, so it may read this sequence.
    pub fn sort_by(&self, mut compare: impl FnMut(&Value, &Value) -> Ordering) -> Result<()> {
        let _guard = registry::begin_mutation()?;
        let mut items = self.to_vec();
        items.sort_by(&mut compare);
        self.write(|body| *body = items);
        self.notify_reorder();
        Ok(())
    }

    /// Reverse in place; fires at path `*`
    pub fn reverse(&self) -> Result<()> {
        self.reorder(|items| items.reverse())
    }

    fn reorder(&self, f: impl FnOnce(&mut Vec<Value>)) -> Result<()> {
        let _guard = registry::begin_mutation()?;
        self.write(f);
        self.notify_reorder();
        Ok(())
    }

    fn notify_reorder(&self) {
        self.facade
            .inner()
            .notify(ChangeKind::Change, "*".to_string(), None, None);
    }
}

impl Deref for SequenceFacade {
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
    use crate::SequenceFacade;

    fn sequence(items: impl IntoIterator<Item = i32>) -> (SequenceFacade, ChangeLog) {
        let root = wrap(Object::sequence(items)).unwrap();
        let sequence = root.as_observed().unwrap().as_sequence().unwrap();
        let log = ChangeLog::new();
        sequence.observe(log.observer()).unwrap();
        (sequence, log)
    }

    fn numbers(sequence: &SequenceFacade) -> Vec<f64> {
        sequence
            .to_vec()
            .iter()
            .map(|v| v.as_number().unwrap_or(f64::NAN))
            .collect()
    }

    #[test]
    fn test_push_and_pop() {
        let (seq, log) = sequence([1, 2]);

        assert_eq!(seq.push(3).unwrap(), 3);
        assert_eq!(seq.pop().unwrap(), Some(Value::from(3)));

        assert_eq!(log.lines(), vec!["change 2 new=3", "delete 2 old=3"]);
    }

    #[test]
    fn test_pop_and_shift_on_empty_are_silent() {
        let (seq, log) = sequence([]);

        assert_eq!(seq.pop().unwrap(), None);
        assert_eq!(seq.shift().unwrap(), None);
        assert!(log.is_empty());
    }

    #[test]
    fn test_unshift_and_shift_use_front_path() {
        let (seq, log) = sequence([2]);

        seq.unshift(1).unwrap();
        assert_eq!(seq.shift().unwrap(), Some(Value::from(1)));

        assert_eq!(log.lines(), vec!["change 0 new=1", "delete 0 old=1"]);
        assert_eq!(numbers(&seq), vec![2.0]);
    }

    #[test]
    fn test_delete_leaves_hole() {
        let (seq, log) = sequence([1, 2, 3]);

        assert_eq!(seq.delete(1).unwrap(), Some(Value::from(2)));
        assert_eq!(seq.len(), 3);
        assert!(seq.get(1).unwrap().is_null());
        assert_eq!(log.lines(), vec!["delete 1 old=2"]);
    }

    #[test]
    fn test_set_past_end_grows_with_holes() {
        let (seq, log) = sequence([1]);

        seq.set(3, 4).unwrap();
        assert_eq!(seq.len(), 4);
        assert!(seq.get(2).unwrap().is_null());
        assert_eq!(log.lines(), vec!["change 3 new=4"]);
    }

    #[test]
    fn test_splice_reports_slices() {
        let (seq, log) = sequence([1, 2, 3, 4]);

        let removed = seq
            .splice(1, 2, [Value::from(9)])
            .unwrap();
        assert_eq!(removed, vec![Value::from(2), Value::from(3)]);
        assert_eq!(numbers(&seq), vec![1.0, 9.0, 4.0]);
        assert_eq!(log.lines(), vec!["change 1 old=[2.0,3.0] new=[9.0]"]);
    }

    #[test]
    fn test_splice_clamps_start() {
        let (seq, log) = sequence([1]);

        seq.splice(10, 5, [Value::from(2)]).unwrap();
        assert_eq!(numbers(&seq), vec![1.0, 2.0]);
        assert_eq!(log.take()[0].path, "1");
    }

    #[test]
    fn test_sort_and_reverse_use_wildcard() {
        let (seq, log) = sequence([10, 9, 1]);

        seq.sort().unwrap();
        assert_eq!(numbers(&seq), vec![1.0, 10.0, 9.0]);
        seq.reverse().unwrap();
        seq.sort_by(|a, b| a.as_number().partial_cmp(&b.as_number()).unwrap())
            .unwrap();
        assert_eq!(numbers(&seq), vec![1.0, 9.0, 10.0]);

        assert_eq!(log.lines(), vec!["change *", "change *", "change *"]);
    }
}
