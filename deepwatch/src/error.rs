//! Error types for deepwatch

use crate::buffer::ElementKind;
use crate::observer::ObserverId;
use thiserror::Error;

/// Errors raised by wrapping, observing and intercepted mutations
#[derive(Debug, Error)]
pub enum WatchError {
    /// A scalar was passed where an object is required
    #[error("Expected an object, got {found}")]
    NotAnObject {
        /// Type of the value passed
        found: &'static str,
    },

    /// Strict wrapping met an object kind it cannot observe
    #[error("Unsupported object kind: {type_name}")]
    Unsupported {
        /// Runtime class name of the rejected object
        type_name: String,
    },

    /// The value is not a live façade
    #[error("Value is not observable: {found}")]
    NotObservable {
        /// Type of the value passed
        found: &'static str,
    },

    /// The same callback is already registered on this façade
    #[error("Observer is already registered on this value")]
    DuplicateObserver,

    /// The observer was already destroyed, or its façade is gone
    #[error("Observer {0} is not registered")]
    StaleHandle(ObserverId),

    /// Weak collections cannot be iterated or cleared
    #[error("{operation} is not available on a weak collection")]
    WeakCollection {
        /// The rejected operation
        operation: &'static str,
    },

    /// Weak collections only hold objects as members or keys
    #[error("Weak collections only hold objects, got {found}")]
    InvalidWeakMember {
        /// Type of the rejected member or key
        found: &'static str,
    },

    /// Write outside a fixed-size buffer
    #[error("Index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        /// Requested index
        index: usize,
        /// Buffer length
        len: usize,
    },

    /// Value not storable in a buffer of this element kind
    #[error("Cannot store {found} in a {expected} buffer")]
    ElementType {
        /// Element kind of the buffer
        expected: ElementKind,
        /// Type of the rejected value
        found: &'static str,
    },

    /// Observers kept mutating from inside their own notifications
    #[error("Change dispatch exceeded the maximum nesting depth of {limit}")]
    DispatchDepth {
        /// Configured maximum depth
        limit: usize,
    },
}

/// Result type using WatchError
pub type Result<T> = std::result::Result<T, WatchError>;
