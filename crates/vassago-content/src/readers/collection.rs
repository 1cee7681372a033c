//! Generic list and array readers.

use std::any::{type_name, Any};
use std::fmt;
use std::marker::PhantomData;
use std::sync::OnceLock;

use vassago_core::{Error, Result};

use crate::reader::ContentReader;
use crate::registry::{ReaderHandle, TypeReaderRegistry, TypedReader};

/// Upper bound on capacity reserved ahead of reading elements.
const MAX_PREALLOCATE: usize = 4096;

/// Element reader slot shared by the list and array readers.
struct Elements<T> {
    reader: OnceLock<ReaderHandle>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> Elements<T> {
    fn new() -> Self {
        Self {
            reader: OnceLock::new(),
            _marker: PhantomData,
        }
    }

    fn resolve(&self, registry: &TypeReaderRegistry) -> Result<()> {
        let reader = registry
            .reader_for::<T>()
            .ok_or_else(|| Error::UnknownTypeName {
                name: type_name::<T>().to_string(),
            })?;
        // Readers are initialized once per registry; a repeat keeps the first.
        let _ = self.reader.set(reader);
        Ok(())
    }

    fn read_into(&self, input: &mut ContentReader<'_>, out: &mut Vec<T>) -> Result<()> {
        let reader = self.reader.get().ok_or_else(|| {
            Error::corrupted(format!(
                "collection of {} read before initialization",
                type_name::<T>()
            ))
        })?;

        let start = input.position();
        let count = input.read_i32()?;
        let count = usize::try_from(count)
            .map_err(|_| Error::corrupted_at(format!("negative element count {count}"), start))?;
        out.reserve(count.min(MAX_PREALLOCATE));

        for _ in 0..count {
            let element = input.read_object_with::<T>(reader.as_ref())?;
            match element {
                Some(element) => out.push(element),
                None => {
                    return Err(Error::corrupted_at(
                        format!("null element in collection of {}", type_name::<T>()),
                        input.position(),
                    ))
                }
            }
        }
        Ok(())
    }
}

/// Reads `Vec<T>`: an `i32` count followed by the elements.
///
/// Elements of a value type are stored inline; other elements carry their
/// own type index. Null elements are rejected.
pub struct ListReader<T> {
    elements: Elements<T>,
}

impl<T: Any + Send + Sync> Default for ListReader<T> {
    fn default() -> Self {
        Self {
            elements: Elements::new(),
        }
    }
}

impl<T> fmt::Debug for ListReader<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListReader")
            .field("element", &type_name::<T>())
            .finish()
    }
}

impl<T: Any + Send + Sync> TypedReader for ListReader<T> {
    type Target = Vec<T>;

    fn target_is_value_type(&self) -> bool {
        false
    }

    fn initialize(&self, registry: &TypeReaderRegistry) -> Result<()> {
        self.elements.resolve(registry)
    }

    /// Appends to `existing` when given.
    fn read_typed(&self, input: &mut ContentReader<'_>, existing: Option<Vec<T>>) -> Result<Vec<T>> {
        let mut list = existing.unwrap_or_default();
        self.elements.read_into(input, &mut list)?;
        Ok(list)
    }
}

/// Reads `Box<[T]>` with the same layout as [`ListReader`].
pub struct ArrayReader<T> {
    elements: Elements<T>,
}

impl<T: Any + Send + Sync> Default for ArrayReader<T> {
    fn default() -> Self {
        Self {
            elements: Elements::new(),
        }
    }
}

impl<T> fmt::Debug for ArrayReader<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayReader")
            .field("element", &type_name::<T>())
            .finish()
    }
}

impl<T: Any + Send + Sync> TypedReader for ArrayReader<T> {
    type Target = Box<[T]>;

    fn target_is_value_type(&self) -> bool {
        false
    }

    fn initialize(&self, registry: &TypeReaderRegistry) -> Result<()> {
        self.elements.resolve(registry)
    }

    fn read_typed(&self, input: &mut ContentReader<'_>, _existing: Option<Box<[T]>>) -> Result<Box<[T]>> {
        let mut items = Vec::new();
        self.elements.read_into(input, &mut items)?;
        Ok(items.into_boxed_slice())
    }
}
