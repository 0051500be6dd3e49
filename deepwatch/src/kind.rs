//! Structural kind classification

use crate::error::{Result, WatchError};
use crate::value::{Body, MapBody, Object, SetBody, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Structural strategy that applies to a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    /// Keyed fields read and written by name
    Record,
    /// Index-addressed items
    Sequence,
    /// Unique values; members report at `*`
    UniqueCollection,
    /// Key/value entries; values report at their key token
    KeyedCollection,
    /// Fixed-width numeric lanes
    NumericBuffer,
    /// Values that pass through unwrapped, such as timestamps
    OpaquePassthrough,
    /// Objects that strict wrapping rejects
    Unsupported,
}

impl Kind {
    /// Whether façades of this kind exist
    pub fn is_observable(self) -> bool {
        !matches!(self, Kind::OpaquePassthrough | Kind::Unsupported)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Record => "record",
            Kind::Sequence => "sequence",
            Kind::UniqueCollection => "unique collection",
            Kind::KeyedCollection => "keyed collection",
            Kind::NumericBuffer => "numeric buffer",
            Kind::OpaquePassthrough => "opaque",
            Kind::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

/// Result of classifying a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Structural strategy for the value
    pub kind: Kind,
    /// Weak collection variant: not iterable, members or keys held weakly
    pub weak: bool,
}

impl Classification {
    fn strong(kind: Kind) -> Self {
        Self { kind, weak: false }
    }
}

/// Classify a value
///
/// Scalars are rejected; a façade classifies as its raw object.
pub fn classify(value: &Value) -> Result<Classification> {
    match value {
        Value::Opaque(_) => Ok(Classification::strong(Kind::OpaquePassthrough)),
        Value::Object(object) => Ok(classify_object(object)),
        Value::Observed(observed) => Ok(classify_object(observed.raw())),
        scalar => Err(WatchError::NotAnObject {
            found: scalar.type_name(),
        }),
    }
}

pub(crate) fn classify_object(object: &Object) -> Classification {
    object.read(classify_body)
}

fn classify_body(body: &Body) -> Classification {
    match body {
        Body::Set(SetBody::Strong(_)) => Classification::strong(Kind::UniqueCollection),
        Body::Set(SetBody::Weak(_)) => Classification {
            kind: Kind::UniqueCollection,
            weak: true,
        },
        Body::Map(MapBody::Strong(_)) => Classification::strong(Kind::KeyedCollection),
        Body::Map(MapBody::Weak(_)) => Classification {
            kind: Kind::KeyedCollection,
            weak: true,
        },
        Body::Buffer(_) => Classification::strong(Kind::NumericBuffer),
        Body::Sequence(_) => Classification::strong(Kind::Sequence),
        Body::Record(_) => Classification::strong(Kind::Record),
        Body::Instance(_) => Classification::strong(Kind::Unsupported),
    }
}
