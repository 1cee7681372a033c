//! Shared resources.
//!
//! Objects referenced from several places are stored once, after the root
//! object, and referenced by a 1-based index. A [`SharedResource`] handle is
//! handed out while the root is read and filled in once the shared objects
//! at the tail of the stream have been read.

use std::any::{type_name, Any};
use std::fmt;
use std::sync::{Arc, OnceLock};

use vassago_core::{Error, Result};

use crate::registry::TargetType;

/// A shared object as read from the tail of the stream.
pub(crate) type SharedValue = (Arc<dyn Any + Send + Sync>, TargetType);

/// Handle to a shared object, resolved when the asset finishes loading.
pub struct SharedResource<T> {
    index: usize,
    slot: Arc<OnceLock<Arc<T>>>,
}

impl<T: Any + Send + Sync> SharedResource<T> {
    pub(crate) fn pending(index: usize) -> Self {
        Self {
            index,
            slot: Arc::new(OnceLock::new()),
        }
    }

    /// Fixup that resolves this handle.
    pub(crate) fn fixup(&self) -> Fixup {
        let slot = Arc::clone(&self.slot);
        Fixup {
            index: self.index,
            apply: Box::new(move |(value, target): &SharedValue| {
                let typed = Arc::clone(value)
                    .downcast::<T>()
                    .map_err(|_| Error::TypeMismatch {
                        expected: type_name::<T>(),
                        actual: target.name(),
                    })?;
                // A handle only ever has one fixup.
                let _ = slot.set(typed);
                Ok(())
            }),
        }
    }
}

impl<T> SharedResource<T> {
    /// 0-based position among the asset's shared resources.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The object, once resolved. Stays `None` for a null shared object.
    pub fn get(&self) -> Option<&Arc<T>> {
        self.slot.get()
    }

    pub fn is_resolved(&self) -> bool {
        self.slot.get().is_some()
    }
}

impl<T> Clone for SharedResource<T> {
    fn clone(&self) -> Self {
        Self {
            index: self.index,
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> fmt::Debug for SharedResource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedResource")
            .field("index", &self.index)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

/// Deferred assignment of a shared object to its handle.
pub(crate) struct Fixup {
    index: usize,
    apply: Box<dyn FnOnce(&SharedValue) -> Result<()>>,
}

impl Fixup {
    pub(crate) fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn apply(self, value: &SharedValue) -> Result<()> {
        (self.apply)(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared<T: Any + Send + Sync>(value: T) -> SharedValue {
        let value: Arc<dyn Any + Send + Sync> = Arc::new(value);
        (value, TargetType::of::<T>())
    }

    #[test]
    fn test_fixup_resolves_all_clones() {
        let handle = SharedResource::<String>::pending(2);
        let copy = handle.clone();
        assert!(!handle.is_resolved());

        handle.fixup().apply(&shared("texture".to_string())).unwrap();
        assert_eq!(copy.get().map(|s| s.as_str()), Some("texture"));
        assert_eq!(copy.index(), 2);
    }

    #[test]
    fn test_fixup_type_mismatch() {
        let handle = SharedResource::<String>::pending(0);
        let err = handle.fixup().apply(&shared(7i32)).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { actual: "i32", .. }));
        assert!(!handle.is_resolved());
    }
}
