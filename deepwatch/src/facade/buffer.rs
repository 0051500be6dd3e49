use super::Observed;
use crate::buffer::{ElementKind, NumericBuffer};
use crate::error::Result;
use crate::event::ChangeKind;
use crate::registry;
use crate::value::{Body, Value};
use std::ops::{Deref, RangeBounds};

/// Façade over a fixed-width numeric buffer
///
/// Range operations report one change at the start of the affected range,
/// carrying the before and after contents of that range as fresh raw buffers
/// of the same element kind.
#[derive(Debug, Clone)]
pub struct BufferFacade {
    facade: Observed,
}

fn snapshot(buffer: NumericBuffer) -> Value {
    Value::from(buffer)
}

impl BufferFacade {
    pub(crate) fn new(facade: Observed) -> Self {
        Self { facade }
    }

    fn read<R>(&self, f: impl FnOnce(&NumericBuffer) -> R) -> R {
        self.facade.raw().read(|body| match body {
            Body::Buffer(buffer) => f(buffer),
            other => unreachable!("buffer facade over {}", other.type_name()),
        })
    }

    fn write<R>(&self, f: impl FnOnce(&mut NumericBuffer) -> R) -> R {
        self.facade.raw().write(|body| match body {
            Body::Buffer(buffer) => f(buffer),
            other => unreachable!("buffer facade over {}", other.type_name()),
        })
    }

    /// Element kind of the buffer
    pub fn element_kind(&self) -> ElementKind {
        self.read(NumericBuffer::kind)
    }

    /// Value of a lane
    pub fn get(&self, index: usize) -> Option<Value> {
        self.read(|buffer| buffer.get(index))
    }

    /// Number of lanes
    pub fn len(&self) -> usize {
        self.read(NumericBuffer::len)
    }

    /// Whether the buffer has no lanes
    pub fn is_empty(&self) -> bool {
        self.read(NumericBuffer::is_empty)
    }

    /// Every lane as a value
    pub fn to_values(&self) -> Vec<Value> {
        self.read(NumericBuffer::to_values)
    }

    /// Copy of the current contents
    pub fn to_buffer(&self) -> NumericBuffer {
        self.read(NumericBuffer::clone)
    }

    /// Store one element, returning the prior value
    pub fn set(&self, index: usize, value: impl Into<Value>) -> Result<Value> {
        let _guard = registry::begin_mutation()?;
        let value = value.into();
        let old = self.write(|buffer| buffer.store(index, &value))?;
        let new = self.get(index);
        self.facade
            .inner()
            .notify(ChangeKind::Change, index.to_string(), new, Some(old.clone()));
        Ok(old)
    }

    /// Reset one element to zero, returning the prior value
    pub fn delete(&self, index: usize) -> Result<Value> {
        let _guard = registry::begin_mutation()?;
        let old = self.write(|buffer| buffer.clear_at(index))?;
        self.facade
            .inner()
            .notify(ChangeKind::Delete, index.to_string(), None, Some(old.clone()));
        Ok(old)
    }

    /// Write `values` starting at `offset`
    ///
    /// Fails without writing anything if the values do not fit or one of
    /// them is not storable.
    pub fn copy_in(&self, offset: usize, values: &[Value]) -> Result<()> {
        let _guard = registry::begin_mutation()?;
        let (before, after) = self.write(|buffer| {
            let range = offset..offset.saturating_add(values.len());
            let before = buffer.slice(range.clone());
            buffer.copy_in(offset, values)?;
            Ok::<_, crate::error::WatchError>((before, buffer.slice(range)))
        })?;
        self.facade.inner().notify(
            ChangeKind::Change,
            offset.to_string(),
            Some(snapshot(after)),
            Some(snapshot(before)),
        );
        Ok(())
    }

    /// Fill the clamped `range` with `value`
    pub fn fill(&self, value: impl Into<Value>, range: impl RangeBounds<usize>) -> Result<()> {
        let _guard = registry::begin_mutation()?;
        let value = value.into();
        let (start, before, after) = self.write(|buffer| {
            let (start, end) = buffer.resolve(range);
            let before = buffer.slice(start..end);
            buffer.fill(&value, start, end)?;
            Ok::<_, crate::error::WatchError>((start, before, buffer.slice(start..end)))
        })?;
        self.facade.inner().notify(
            ChangeKind::Change,
            start.to_string(),
            Some(snapshot(after)),
            Some(snapshot(before)),
        );
        Ok(())
    }

    /// Copy the clamped `range` to `target`, truncated at the buffer end
    ///
    /// The old value is the source range as it was; the new value is what
    /// now sits at `target`.
    pub fn copy_within(&self, target: usize, range: impl RangeBounds<usize>) -> Result<()> {
        let _guard = registry::begin_mutation()?;
        let (before, after) = self.write(|buffer| {
            let (start, end) = buffer.resolve(range);
            let before = buffer.slice(start..end);
            let count = buffer.copy_within(start, end, target);
            (before, buffer.slice(target..target.saturating_add(count)))
        });
        self.facade.inner().notify(
            ChangeKind::Change,
            target.to_string(),
            Some(snapshot(after)),
            Some(snapshot(before)),
        );
        Ok(())
    }

    /// Ascending numeric sort
    pub fn sort(&self) -> Result<()> {
        self.rearrange(NumericBuffer::sort)
    }

    /// Reverse the lanes in place; fires at path `0` with the whole buffer
    pub fn reverse(&self) -> Result<()> {
        self.rearrange(NumericBuffer::reverse)
    }

    fn rearrange(&self, f: impl FnOnce(&mut NumericBuffer)) -> Result<()> {
        let _guard = registry::begin_mutation()?;
        let (before, after) = self.write(|buffer| {
            let before = buffer.clone();
            f(buffer);
            (before, buffer.clone())
        });
        self.facade.inner().notify(
            ChangeKind::Change,
            "0".to_string(),
            Some(snapshot(after)),
            Some(snapshot(before)),
        );
        Ok(())
    }
}

impl Deref for BufferFacade {
    type Target = Observed;

    fn deref(&self) -> &Observed {
        &self.facade
    }
}

#[cfg(test)]
mod tests {
    use crate::buffer::{ElementKind, NumericBuffer};
    use crate::error::WatchError;
    use crate::observer::ChangeLog;
    use crate::value::{Object, Value};
    use crate::{wrap, BufferFacade};

    fn buffer(kind: ElementKind, numbers: &[f64]) -> (BufferFacade, ChangeLog) {
        let raw = Object::buffer(NumericBuffer::from_numbers(kind, numbers.iter().copied()));
        let root = wrap(raw).unwrap();
        let buffer = root.as_observed().unwrap().as_buffer().unwrap();
        let log = ChangeLog::new();
        buffer.observe(log.observer()).unwrap();
        (buffer, log)
    }

    #[test]
    fn test_fill_reports_range() {
        let (buf, log) = buffer(ElementKind::Int32, &[1.0, 2.0, 3.0]);

        buf.fill(7, 1..3).unwrap();

        let changes = log.take();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path, "1");
        assert_eq!(changes[0].value_old.as_ref().unwrap().to_json(), serde_json::json!([2.0, 3.0]));
        assert_eq!(changes[0].value_new.as_ref().unwrap().to_json(), serde_json::json!([7.0, 7.0]));
        assert_eq!(
            buf.to_values(),
            vec![Value::from(1), Value::from(7), Value::from(7)]
        );
    }

    #[test]
    fn test_snapshots_keep_element_kind() {
        let (buf, log) = buffer(ElementKind::Uint8, &[3.0, 1.0, 2.0]);

        buf.sort().unwrap();

        let change = log.take().remove(0);
        assert_eq!(change.path, "0");
        let old = change.value_old.unwrap();
        let old = old.as_object().unwrap();
        assert_eq!(old.type_name(), "Uint8Array");
        assert_eq!(old.to_json(), serde_json::json!([3.0, 1.0, 2.0]));
        assert_eq!(
            change.value_new.unwrap().to_json(),
            serde_json::json!([1.0, 2.0, 3.0])
        );
    }

    #[test]
    fn test_copy_within_reports_source_and_target() {
        let (buf, log) = buffer(ElementKind::Float64, &[1.0, 2.0, 3.0, 4.0, 5.0]);

        buf.copy_within(0, 3..).unwrap();

        let change = log.take().remove(0);
        assert_eq!(change.path, "0");
        assert_eq!(change.value_old.unwrap().to_json(), serde_json::json!([4.0, 5.0]));
        assert_eq!(change.value_new.unwrap().to_json(), serde_json::json!([4.0, 5.0]));
        assert_eq!(buf.get(1), Some(Value::from(5)));
    }

    #[test]
    fn test_set_and_delete() {
        let (buf, log) = buffer(ElementKind::Int8, &[5.0]);

        assert_eq!(buf.set(0, 200).unwrap(), Value::from(5));
        assert_eq!(buf.get(0), Some(Value::from(-56)));
        assert_eq!(buf.delete(0).unwrap(), Value::from(-56));
        assert_eq!(buf.get(0), Some(Value::from(0)));

        assert_eq!(log.lines(), vec!["change 0 old=5 new=-56", "delete 0 old=-56"]);
    }

    #[test]
    fn test_out_of_range_writes_fail_silently() {
        let (buf, log) = buffer(ElementKind::Int8, &[0.0, 0.0]);

        assert!(matches!(buf.set(2, 1), Err(WatchError::IndexOutOfBounds { index: 2, len: 2 })));
        assert!(buf.copy_in(1, &[Value::from(1), Value::from(2)]).is_err());
        assert!(log.is_empty());
        assert_eq!(buf.to_values(), vec![Value::from(0), Value::from(0)]);
    }
}
