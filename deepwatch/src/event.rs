//! Change notifications delivered to observers

use crate::facade::Observed;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of mutation happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// A value was assigned, inserted or reordered
    Change,
    /// A value was removed
    Delete,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Change => f.write_str("change"),
            ChangeKind::Delete => f.write_str("delete"),
        }
    }
}

/// One notification, as seen from one ancestor level
///
/// The same mutation produces one `Change` per observed level between the
/// mutated façade and the root; each carries the path relative to its own
/// `target`.
#[derive(Debug, Clone)]
pub struct Change {
    /// Whether this is a change or a delete
    pub kind: ChangeKind,
    /// Façade at the level being notified
    pub target: Observed,
    /// Dotted address relative to `target`
    pub path: String,
    /// Value now stored at `path`, if any
    pub value_new: Option<Value>,
    /// Value previously stored at `path`, if any
    pub value_old: Option<Value>,
}

impl Change {
    /// Whether this reports a removal
    pub fn is_delete(&self) -> bool {
        self.kind == ChangeKind::Delete
    }

    /// Path split into its segments
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('.')
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.path)?;
        if let Some(old) = &self.value_old {
            write!(f, " old={old}")?;
        }
        if let Some(new) = &self.value_new {
            write!(f, " new={new}")?;
        }
        Ok(())
    }
}
