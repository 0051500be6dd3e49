//! Fixed-width numeric buffers
//!
//! A [`NumericBuffer`] is a fixed-length run of numeric lanes of one
//! [`ElementKind`]. Writes are coerced the way typed arrays coerce them:
//! integer kinds truncate and wrap, `Uint8Clamped` clamps and rounds half to
//! even, `Float32` rounds through `f32`, and the two 64-bit kinds take
//! [`Value::BigInt`] values only.

use crate::error::{Result, WatchError};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Bound, RangeBounds};

/// Element type of a numeric buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    /// Signed 8-bit integers
    Int8,
    /// Unsigned 8-bit integers
    Uint8,
    /// Unsigned 8-bit integers, clamped and rounded half to even
    Uint8Clamped,
    /// Signed 16-bit integers
    Int16,
    /// Unsigned 16-bit integers
    Uint16,
    /// Signed 32-bit integers
    Int32,
    /// Unsigned 32-bit integers
    Uint32,
    /// Single-precision floats
    Float32,
    /// Double-precision floats
    Float64,
    /// Signed 64-bit integers, read as [`Value::BigInt`]
    BigInt64,
    /// Unsigned 64-bit integers, read as [`Value::BigInt`]
    BigUint64,
}

impl ElementKind {
    /// Every element kind, narrowest integers first
    pub const ALL: [ElementKind; 11] = [
        ElementKind::Int8,
        ElementKind::Uint8,
        ElementKind::Uint8Clamped,
        ElementKind::Int16,
        ElementKind::Uint16,
        ElementKind::Int32,
        ElementKind::Uint32,
        ElementKind::Float32,
        ElementKind::Float64,
        ElementKind::BigInt64,
        ElementKind::BigUint64,
    ];

    /// Conventional type name, e.g. `Uint8ClampedArray`
    pub fn type_name(self) -> &'static str {
        match self {
            ElementKind::Int8 => "Int8Array",
            ElementKind::Uint8 => "Uint8Array",
            ElementKind::Uint8Clamped => "Uint8ClampedArray",
            ElementKind::Int16 => "Int16Array",
            ElementKind::Uint16 => "Uint16Array",
            ElementKind::Int32 => "Int32Array",
            ElementKind::Uint32 => "Uint32Array",
            ElementKind::Float32 => "Float32Array",
            ElementKind::Float64 => "Float64Array",
            ElementKind::BigInt64 => "BigInt64Array",
            ElementKind::BigUint64 => "BigUint64Array",
        }
    }

    /// Size of one element in bytes
    pub fn byte_width(self) -> usize {
        match self {
            ElementKind::Int8 | ElementKind::Uint8 | ElementKind::Uint8Clamped => 1,
            ElementKind::Int16 | ElementKind::Uint16 => 2,
            ElementKind::Int32 | ElementKind::Uint32 | ElementKind::Float32 => 4,
            ElementKind::Float64 | ElementKind::BigInt64 | ElementKind::BigUint64 => 8,
        }
    }

    /// Whether lanes hold 64-bit integers exposed as [`Value::BigInt`]
    pub fn is_bigint(self) -> bool {
        matches!(self, ElementKind::BigInt64 | ElementKind::BigUint64)
    }

    fn coerce_number(self, n: f64) -> f64 {
        if self == ElementKind::Float64 {
            return n;
        }
        if self == ElementKind::Float32 {
            return n as f32 as f64;
        }
        if self == ElementKind::Uint8Clamped {
            return clamp_round_even(n);
        }
        let whole = truncate_wrapping(n);
        match self {
            ElementKind::Int8 => whole as i8 as f64,
            ElementKind::Uint8 => whole as u8 as f64,
            ElementKind::Int16 => whole as i16 as f64,
            ElementKind::Uint16 => whole as u16 as f64,
            ElementKind::Int32 => whole as i32 as f64,
            ElementKind::Uint32 => whole as u32 as f64,
            ElementKind::BigInt64 => whole as i64 as f64,
            ElementKind::BigUint64 => whole as u64 as f64,
            ElementKind::Uint8Clamped | ElementKind::Float32 | ElementKind::Float64 => n,
        }
    }

    fn coerce_big(self, n: i128) -> i128 {
        match self {
            ElementKind::BigUint64 => n as u64 as i128,
            _ => n as i64 as i128,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Truncate to an integer for the narrowing casts
///
/// Every float at or beyond 2^127 is a multiple of 2^64, so it wraps to zero
/// in each integer kind instead of saturating the `i128` cast.
fn truncate_wrapping(n: f64) -> i128 {
    let whole = n.trunc();
    if !whole.is_finite() || whole.abs() >= 2f64.powi(127) {
        return 0;
    }
    whole as i128
}

fn clamp_round_even(n: f64) -> f64 {
    if n.is_nan() {
        return 0.0;
    }
    let clamped = n.clamp(0.0, 255.0);
    let floor = clamped.floor();
    let diff = clamped - floor;
    if diff < 0.5 {
        floor
    } else if diff > 0.5 || floor % 2.0 != 0.0 {
        floor + 1.0
    } else {
        floor
    }
}

fn cmp_lanes(a: &f64, b: &f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.total_cmp(b),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Lanes {
    Number(Vec<f64>),
    Big(Vec<i128>),
}

/// A fixed-length buffer of numeric lanes
#[derive(Debug, Clone, PartialEq)]
pub struct NumericBuffer {
    kind: ElementKind,
    lanes: Lanes,
}

impl NumericBuffer {
    /// Create a zero-filled buffer
    pub fn new(kind: ElementKind, len: usize) -> Self {
        let lanes = if kind.is_bigint() {
            Lanes::Big(vec![0; len])
        } else {
            Lanes::Number(vec![0.0; len])
        };
        Self { kind, lanes }
    }

    /// Create a buffer from numbers, coercing each to the element kind
    pub fn from_numbers(kind: ElementKind, numbers: impl IntoIterator<Item = f64>) -> Self {
        let lanes = if kind.is_bigint() {
            Lanes::Big(
                numbers
                    .into_iter()
                    .map(|n| kind.coerce_big(truncate_wrapping(n)))
                    .collect(),
            )
        } else {
            Lanes::Number(numbers.into_iter().map(|n| kind.coerce_number(n)).collect())
        };
        Self { kind, lanes }
    }

    /// Create a buffer from big integers, coercing each to the element kind
    pub fn from_bigints(kind: ElementKind, numbers: impl IntoIterator<Item = i128>) -> Self {
        let lanes = if kind.is_bigint() {
            Lanes::Big(numbers.into_iter().map(|n| kind.coerce_big(n)).collect())
        } else {
            Lanes::Number(
                numbers
                    .into_iter()
                    .map(|n| kind.coerce_number(n as f64))
                    .collect(),
            )
        };
        Self { kind, lanes }
    }

    /// Create a buffer from values, failing on the first unstorable one
    pub fn from_values(kind: ElementKind, values: &[Value]) -> Result<Self> {
        let mut buffer = Self::new(kind, values.len());
        for (index, value) in values.iter().enumerate() {
            buffer.store(index, value)?;
        }
        Ok(buffer)
    }

    /// Element kind of every lane
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Number of lanes
    pub fn len(&self) -> usize {
        match &self.lanes {
            Lanes::Number(lanes) => lanes.len(),
            Lanes::Big(lanes) => lanes.len(),
        }
    }

    /// Whether the buffer has no lanes
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read one element
    pub fn get(&self, index: usize) -> Option<Value> {
        match &self.lanes {
            Lanes::Number(lanes) => lanes.get(index).map(|n| Value::Number(*n)),
            Lanes::Big(lanes) => lanes.get(index).map(|n| Value::BigInt(*n)),
        }
    }

    /// All elements as values
    pub fn to_values(&self) -> Vec<Value> {
        match &self.lanes {
            Lanes::Number(lanes) => lanes.iter().map(|n| Value::Number(*n)).collect(),
            Lanes::Big(lanes) => lanes.iter().map(|n| Value::BigInt(*n)).collect(),
        }
    }

    /// Copy of the clamped sub-range as a new buffer of the same kind
    pub fn slice(&self, range: impl RangeBounds<usize>) -> NumericBuffer {
        let (start, end) = self.resolve(range);
        let lanes = match &self.lanes {
            Lanes::Number(lanes) => Lanes::Number(lanes[start..end].to_vec()),
            Lanes::Big(lanes) => Lanes::Big(lanes[start..end].to_vec()),
        };
        NumericBuffer {
            kind: self.kind,
            lanes,
        }
    }

    /// Clamp a range to `[0, len]`; an inverted range becomes empty
    pub fn resolve(&self, range: impl RangeBounds<usize>) -> (usize, usize) {
        let len = self.len();
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.saturating_add(1),
            Bound::Unbounded => 0,
        }
        .min(len);
        let end = match range.end_bound() {
            Bound::Included(&e) => e.saturating_add(1),
            Bound::Excluded(&e) => e,
            Bound::Unbounded => len,
        }
        .min(len);
        (start, end.max(start))
    }

    /// Overwrite one element, returning the prior value
    pub(crate) fn store(&mut self, index: usize, value: &Value) -> Result<Value> {
        let len = self.len();
        if index >= len {
            return Err(WatchError::IndexOutOfBounds { index, len });
        }
        let kind = self.kind;
        match &mut self.lanes {
            Lanes::Number(lanes) => {
                let n = number_lane(kind, value)?;
                Ok(Value::Number(std::mem::replace(&mut lanes[index], n)))
            }
            Lanes::Big(lanes) => {
                let n = big_lane(kind, value)?;
                Ok(Value::BigInt(std::mem::replace(&mut lanes[index], n)))
            }
        }
    }

    /// Reset one element to zero, returning the prior value
    pub(crate) fn clear_at(&mut self, index: usize) -> Result<Value> {
        let zero = if self.kind.is_bigint() {
            Value::BigInt(0)
        } else {
            Value::Number(0.0)
        };
        self.store(index, &zero)
    }

    /// Fill `[start, end)` with one value
    pub(crate) fn fill(&mut self, value: &Value, start: usize, end: usize) -> Result<()> {
        let kind = self.kind;
        match &mut self.lanes {
            Lanes::Number(lanes) => lanes[start..end].fill(number_lane(kind, value)?),
            Lanes::Big(lanes) => lanes[start..end].fill(big_lane(kind, value)?),
        }
        Ok(())
    }

    /// Copy `[start, end)` to `target`, truncated at the buffer end.
    /// Returns the number of elements copied.
    pub(crate) fn copy_within(&mut self, start: usize, end: usize, target: usize) -> usize {
        let len = self.len();
        if target >= len {
            return 0;
        }
        let count = (end - start).min(len - target);
        match &mut self.lanes {
            Lanes::Number(lanes) => lanes.copy_within(start..start + count, target),
            Lanes::Big(lanes) => lanes.copy_within(start..start + count, target),
        }
        count
    }

    /// Write `values` starting at `offset`; all or nothing
    pub(crate) fn copy_in(&mut self, offset: usize, values: &[Value]) -> Result<()> {
        let len = self.len();
        if offset.saturating_add(values.len()) > len {
            return Err(WatchError::IndexOutOfBounds {
                index: offset.saturating_add(values.len()),
                len,
            });
        }
        let kind = self.kind;
        match &mut self.lanes {
            Lanes::Number(lanes) => {
                let coerced = values
                    .iter()
                    .map(|v| number_lane(kind, v))
                    .collect::<Result<Vec<_>>>()?;
                lanes[offset..offset + coerced.len()].copy_from_slice(&coerced);
            }
            Lanes::Big(lanes) => {
                let coerced = values
                    .iter()
                    .map(|v| big_lane(kind, v))
                    .collect::<Result<Vec<_>>>()?;
                lanes[offset..offset + coerced.len()].copy_from_slice(&coerced);
            }
        }
        Ok(())
    }

    /// Ascending numeric sort, NaN last
    pub(crate) fn sort(&mut self) {
        match &mut self.lanes {
            Lanes::Number(lanes) => lanes.sort_by(cmp_lanes),
            Lanes::Big(lanes) => lanes.sort_unstable(),
        }
    }

    pub(crate) fn reverse(&mut self) {
        match &mut self.lanes {
            Lanes::Number(lanes) => lanes.reverse(),
            Lanes::Big(lanes) => lanes.reverse(),
        }
    }
}

fn number_lane(kind: ElementKind, value: &Value) -> Result<f64> {
    match value {
        Value::Number(n) => Ok(kind.coerce_number(*n)),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        other => Err(WatchError::ElementType {
            expected: kind,
            found: other.type_name(),
        }),
    }
}

fn big_lane(kind: ElementKind, value: &Value) -> Result<i128> {
    match value {
        Value::BigInt(n) => Ok(kind.coerce_big(*n)),
        other => Err(WatchError::ElementType {
            expected: kind,
            found: other.type_name(),
        }),
    }
}
