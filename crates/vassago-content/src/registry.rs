//! Type reader registry.
//!
//! Every asset starts with a manifest naming the readers its objects need.
//! The registry resolves those names to reader instances, creating them from
//! registered factories on first use, and keeps one instance per target type
//! for the lifetime of the registry.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};
use vassago_core::{Error, Result};

use crate::manifest::{normalize_reader_name, ManifestEntry};
use crate::reader::ContentReader;
use crate::readers::{self, ObjectReader};

/// A value produced by a type reader.
pub type ContentValue = Box<dyn Any + Send + Sync>;

/// Shared handle to a reader instance.
pub type ReaderHandle = Arc<dyn ContentTypeReader>;

/// Identity of the type a reader produces.
#[derive(Debug, Clone, Copy)]
pub struct TargetType {
    id: TypeId,
    name: &'static str,
}

impl TargetType {
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TargetType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TargetType {}

impl Hash for TargetType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Reads one type of object from a content stream.
pub trait ContentTypeReader: Send + Sync + 'static {
    /// Type produced by [`read`](Self::read).
    fn target_type(&self) -> TargetType;

    /// Serialization version the reader understands.
    fn type_version(&self) -> i32 {
        0
    }

    /// Value types are stored inline when the reader is known up front;
    /// reference types always carry a type index.
    fn target_is_value_type(&self) -> bool {
        true
    }

    /// Resolve nested readers. Runs once, after the manifest that created the
    /// reader has been read.
    fn initialize(&self, _registry: &TypeReaderRegistry) -> Result<()> {
        Ok(())
    }

    /// Read one object, optionally reusing `existing`.
    fn read(&self, input: &mut ContentReader<'_>, existing: Option<ContentValue>) -> Result<ContentValue>;
}

/// Statically typed reader. Every `TypedReader` is a [`ContentTypeReader`].
pub trait TypedReader: Send + Sync + 'static {
    type Target: Any + Send + Sync;

    fn type_version(&self) -> i32 {
        0
    }

    fn target_is_value_type(&self) -> bool {
        true
    }

    fn initialize(&self, _registry: &TypeReaderRegistry) -> Result<()> {
        Ok(())
    }

    fn read_typed(&self, input: &mut ContentReader<'_>, existing: Option<Self::Target>) -> Result<Self::Target>;
}

impl<R: TypedReader> ContentTypeReader for R {
    fn target_type(&self) -> TargetType {
        TargetType::of::<R::Target>()
    }

    fn type_version(&self) -> i32 {
        TypedReader::type_version(self)
    }

    fn target_is_value_type(&self) -> bool {
        TypedReader::target_is_value_type(self)
    }

    fn initialize(&self, registry: &TypeReaderRegistry) -> Result<()> {
        TypedReader::initialize(self, registry)
    }

    fn read(&self, input: &mut ContentReader<'_>, existing: Option<ContentValue>) -> Result<ContentValue> {
        let existing = match existing {
            Some(value) => match value.downcast::<R::Target>() {
                Ok(value) => Some(*value),
                Err(_) => {
                    return Err(Error::TypeMismatch {
                        expected: type_name::<R::Target>(),
                        actual: "existing instance of another type",
                    })
                }
            },
            None => None,
        };
        Ok(Box::new(self.read_typed(input, existing)?))
    }
}

/// Creates reader instances for a manifest name.
#[derive(Clone, Copy)]
pub struct ReaderFactory {
    reader_type: TypeId,
    reader_name: &'static str,
    create: fn() -> ReaderHandle,
}

impl ReaderFactory {
    /// Factory for a default-constructible reader.
    pub fn of<R: ContentTypeReader + Default>() -> Self {
        Self {
            reader_type: TypeId::of::<R>(),
            reader_name: type_name::<R>(),
            create: create_reader::<R>,
        }
    }

    /// Identity of the reader type (not its target).
    pub fn reader_type(&self) -> TypeId {
        self.reader_type
    }

    pub fn reader_name(&self) -> &'static str {
        self.reader_name
    }

    /// Build a new instance.
    pub fn create(&self) -> ReaderHandle {
        (self.create)()
    }
}

impl fmt::Debug for ReaderFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderFactory")
            .field("reader", &self.reader_name)
            .finish()
    }
}

fn create_reader<R: ContentTypeReader + Default>() -> ReaderHandle {
    Arc::new(R::default())
}

/// Same instance, ignoring vtable identity.
fn same_reader(a: &ReaderHandle, b: &ReaderHandle) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

#[derive(Default)]
struct RegistryState {
    factories: HashMap<String, ReaderFactory>,
    by_name: HashMap<String, ReaderHandle>,
    by_target: HashMap<TypeId, ReaderHandle>,
    by_reader: HashMap<TypeId, ReaderHandle>,
}

impl RegistryState {
    fn seed(&mut self) {
        let factory = ReaderFactory::of::<ObjectReader>();
        let reader = factory.create();
        self.factories
            .insert(readers::OBJECT_READER.to_string(), factory);
        self.by_target.insert(reader.target_type().id(), reader.clone());
        self.by_reader.insert(factory.reader_type(), reader);
    }

    fn add(&mut self, name: &str, reader_type: TypeId, reader: ReaderHandle) -> Result<()> {
        let target = reader.target_type();
        if let Some(existing) = self.by_target.get(&target.id()) {
            if !same_reader(existing, &reader) {
                return Err(Error::DuplicateReaderForType {
                    target: target.name(),
                });
            }
        }
        self.by_target.insert(target.id(), reader.clone());
        self.by_reader.insert(reader_type, reader.clone());
        self.by_name.insert(name.to_string(), reader);
        Ok(())
    }

    fn remove(&mut self, reader: &ReaderHandle) {
        self.by_name.retain(|_, r| !same_reader(r, reader));
        self.by_target.retain(|_, r| !same_reader(r, reader));
        self.by_reader.retain(|_, r| !same_reader(r, reader));
    }
}

/// Resolves manifest names to shared reader instances.
///
/// Lookups take a read lock; instantiating readers takes the write lock, so
/// a target type can never end up bound to two instances.
pub struct TypeReaderRegistry {
    state: RwLock<RegistryState>,
}

impl TypeReaderRegistry {
    /// Registry that knows only the object reader.
    pub fn new() -> Self {
        let mut state = RegistryState::default();
        state.seed();
        Self {
            state: RwLock::new(state),
        }
    }

    /// Registry with factories for every built-in reader.
    pub fn with_default_readers() -> Self {
        let registry = Self::new();
        readers::register_defaults(&registry);
        registry
    }

    fn read_state(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `name` resolvable. Assembly qualifiers after the first `,` are ignored.
    pub fn register_factory(&self, name: &str, factory: ReaderFactory) {
        self.write_state()
            .factories
            .insert(normalize_reader_name(name).to_string(), factory);
    }

    /// Register a ready-made reader instance under `name`.
    pub fn register<R: ContentTypeReader>(&self, name: &str, reader: R) -> Result<ReaderHandle> {
        let reader: ReaderHandle = Arc::new(reader);
        self.write_state()
            .add(normalize_reader_name(name), TypeId::of::<R>(), reader.clone())?;
        Ok(reader)
    }

    /// Reader currently bound to a target type.
    pub fn reader_for_target(&self, target: TypeId) -> Option<ReaderHandle> {
        self.read_state().by_target.get(&target).cloned()
    }

    /// Reader for the target type `T`.
    pub fn reader_for<T: Any>(&self) -> Option<ReaderHandle> {
        self.reader_for_target(TypeId::of::<T>())
    }

    /// Reader already instantiated for a manifest name.
    pub fn reader_for_name(&self, name: &str) -> Option<ReaderHandle> {
        self.read_state()
            .by_name
            .get(normalize_reader_name(name))
            .cloned()
    }

    /// Whether a factory exists for `name`.
    pub fn has_factory(&self, name: &str) -> bool {
        self.read_state()
            .factories
            .contains_key(normalize_reader_name(name))
    }

    /// Number of live reader instances.
    pub fn len(&self) -> usize {
        self.read_state().by_target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every instantiated reader, keeping the factories.
    pub fn clear(&self) {
        let mut state = self.write_state();
        state.by_name.clear();
        state.by_target.clear();
        state.by_reader.clear();
        state.seed();
    }

    /// Read `count` manifest entries and resolve each to a reader.
    ///
    /// On any failure every reader created by this call is removed again
    /// before the error is returned. Readers created here are initialized
    /// once all entries resolved.
    pub fn read_manifest(&self, count: usize, input: &mut ContentReader<'_>) -> Result<Vec<ReaderHandle>> {
        let mut created = Vec::new();
        let mut readers = Vec::with_capacity(count.min(64));

        let outcome = self
            .resolve_entries(count, input, &mut readers, &mut created)
            .and_then(|()| {
                created
                    .iter()
                    .try_for_each(|reader: &ReaderHandle| reader.initialize(self))
            });

        if let Err(err) = outcome {
            if !created.is_empty() {
                warn!(
                    readers = created.len(),
                    error = %err,
                    "rolling back type readers from failed manifest"
                );
                let mut state = self.write_state();
                for reader in &created {
                    state.remove(reader);
                }
            }
            return Err(err);
        }
        Ok(readers)
    }

    fn resolve_entries(
        &self,
        count: usize,
        input: &mut ContentReader<'_>,
        readers: &mut Vec<ReaderHandle>,
        created: &mut Vec<ReaderHandle>,
    ) -> Result<()> {
        for _ in 0..count {
            let entry = ManifestEntry::read(input)?;
            let reader = self.resolve(entry.reader_name(), created)?;
            if entry.version != reader.type_version() {
                return Err(Error::TypeVersionMismatch {
                    reader: entry.name,
                    expected: entry.version,
                    actual: reader.type_version(),
                });
            }
            readers.push(reader);
        }
        Ok(())
    }

    fn resolve(&self, name: &str, created: &mut Vec<ReaderHandle>) -> Result<ReaderHandle> {
        if let Some(reader) = self.read_state().by_name.get(name) {
            return Ok(reader.clone());
        }

        let mut state = self.write_state();
        if let Some(reader) = state.by_name.get(name) {
            return Ok(reader.clone());
        }
        let factory = state
            .factories
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownTypeName {
                name: name.to_string(),
            })?;

        if let Some(reader) = state.by_reader.get(&factory.reader_type()).cloned() {
            state.by_name.insert(name.to_string(), reader.clone());
            return Ok(reader);
        }

        let reader = factory.create();
        state.add(name, factory.reader_type(), reader.clone())?;
        debug!(
            name,
            target = reader.target_type().name(),
            "instantiated type reader"
        );
        created.push(reader.clone());
        Ok(reader)
    }
}

impl Default for TypeReaderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeReaderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read_state();
        f.debug_struct("TypeReaderRegistry")
            .field("factories", &state.factories.len())
            .field("readers", &state.by_target.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readers::{
        BOOLEAN_READER, INT32_READER, LIST_OF_INT32_READER, STRING_READER, VECTOR3_READER,
    };
    use crate::testing::ContentWriter;
    use std::io::Cursor;

    fn reader_over(registry: &TypeReaderRegistry, bytes: Vec<u8>) -> ContentReader<'_> {
        ContentReader::new(Cursor::new(bytes), registry)
    }

    fn manifest(entries: &[(&str, i32)]) -> Vec<u8> {
        let mut writer = ContentWriter::new();
        for &(name, version) in entries {
            writer.string(name).i32(version);
        }
        writer.into_bytes()
    }

    #[derive(Default)]
    struct VersionedReader;

    impl TypedReader for VersionedReader {
        type Target = u128;

        fn type_version(&self) -> i32 {
            3
        }

        fn read_typed(&self, input: &mut ContentReader<'_>, _existing: Option<u128>) -> Result<u128> {
            Ok(input.read_u64()? as u128)
        }
    }

    #[derive(Default)]
    struct OtherBoolReader;

    impl TypedReader for OtherBoolReader {
        type Target = bool;

        fn read_typed(&self, input: &mut ContentReader<'_>, _existing: Option<bool>) -> Result<bool> {
            input.read_bool()
        }
    }

    #[test]
    fn test_new_registry_has_object_reader() {
        let registry = TypeReaderRegistry::new();
        assert_eq!(registry.len(), 1);
        assert!(registry.reader_for::<ContentValue>().is_some());
        assert!(registry.has_factory(readers::OBJECT_READER));
        assert!(!registry.has_factory(INT32_READER));
    }

    #[test]
    fn test_manifest_resolves_and_caches() {
        let registry = TypeReaderRegistry::with_default_readers();
        let qualified = format!("{STRING_READER}, Microsoft.Xna.Framework, Version=4.0.0.0");
        let bytes = manifest(&[
            (INT32_READER, 0),
            (qualified.as_str(), 0),
            (INT32_READER, 0),
        ]);
        let mut input = reader_over(&registry, bytes);
        let readers = registry.read_manifest(3, &mut input).unwrap();

        assert_eq!(readers.len(), 3);
        assert!(same_reader(&readers[0], &readers[2]));
        assert_eq!(readers[1].target_type(), TargetType::of::<String>());
        assert!(registry.reader_for::<i32>().is_some());
        assert!(registry.reader_for_name(STRING_READER).is_some());

        let before = registry.len();
        let mut again = reader_over(&registry, manifest(&[(INT32_READER, 0)]));
        let second = registry.read_manifest(1, &mut again).unwrap();
        assert!(same_reader(&second[0], &readers[0]));
        assert_eq!(registry.len(), before);
    }

    #[test]
    fn test_version_mismatch_rolls_back_new_readers() {
        let registry = TypeReaderRegistry::with_default_readers();
        registry.register_factory("Test.VersionedReader", ReaderFactory::of::<VersionedReader>());

        // Int32 is instantiated by an earlier manifest and must survive.
        let mut warm = reader_over(&registry, manifest(&[(INT32_READER, 0)]));
        registry.read_manifest(1, &mut warm).unwrap();
        let baseline = registry.len();

        let bytes = manifest(&[
            (INT32_READER, 0),
            (BOOLEAN_READER, 0),
            (VECTOR3_READER, 0),
            ("Test.VersionedReader", 2),
        ]);
        let mut input = reader_over(&registry, bytes);
        let err = registry.read_manifest(4, &mut input).err().expect("expected error");

        assert!(matches!(
            err,
            Error::TypeVersionMismatch { expected: 2, actual: 3, .. }
        ));
        assert_eq!(registry.len(), baseline);
        assert!(registry.reader_for::<i32>().is_some());
        assert!(registry.reader_for::<bool>().is_none());
        assert!(registry.reader_for_name(VECTOR3_READER).is_none());
        assert!(registry.reader_for::<u128>().is_none());
    }

    #[test]
    fn test_unknown_name_rolls_back() {
        let registry = TypeReaderRegistry::with_default_readers();
        let bytes = manifest(&[(BOOLEAN_READER, 0), ("Nobody.KnowsThisReader", 0)]);
        let mut input = reader_over(&registry, bytes);
        let err = registry.read_manifest(2, &mut input).err().expect("expected error");

        assert!(matches!(err, Error::UnknownTypeName { ref name } if name == "Nobody.KnowsThisReader"));
        assert!(registry.reader_for::<bool>().is_none());
    }

    #[test]
    fn test_duplicate_target_rejected() {
        let registry = TypeReaderRegistry::with_default_readers();
        registry.register_factory("Test.OtherBoolReader", ReaderFactory::of::<OtherBoolReader>());

        let bytes = manifest(&[(BOOLEAN_READER, 0), ("Test.OtherBoolReader", 0)]);
        let mut input = reader_over(&registry, bytes);
        let err = registry.read_manifest(2, &mut input).err().expect("expected error");

        assert!(matches!(err, Error::DuplicateReaderForType { .. }));
        assert!(registry.reader_for::<bool>().is_none());

        registry.register("Test.OtherBoolReader", OtherBoolReader).unwrap();
        let err = registry.register(BOOLEAN_READER, OtherBoolReader).err().expect("expected error");
        assert!(matches!(err, Error::DuplicateReaderForType { .. }));
    }

    #[test]
    fn test_nested_reader_initialized_after_manifest() {
        let registry = TypeReaderRegistry::with_default_readers();
        // The list precedes its element reader in the manifest.
        let bytes = manifest(&[(LIST_OF_INT32_READER, 0), (INT32_READER, 0)]);
        let mut input = reader_over(&registry, bytes);
        registry.read_manifest(2, &mut input).unwrap();
        assert!(registry.reader_for::<Vec<i32>>().is_some());
    }

    #[test]
    fn test_failed_initialize_rolls_back() {
        let registry = TypeReaderRegistry::with_default_readers();
        let bytes = manifest(&[(LIST_OF_INT32_READER, 0)]);
        let mut input = reader_over(&registry, bytes);
        assert!(registry.read_manifest(1, &mut input).is_err());
        assert!(registry.reader_for::<Vec<i32>>().is_none());
    }

    #[test]
    fn test_clear_keeps_factories() {
        let registry = TypeReaderRegistry::with_default_readers();
        let mut input = reader_over(&registry, manifest(&[(INT32_READER, 0)]));
        registry.read_manifest(1, &mut input).unwrap();
        assert_eq!(registry.len(), 2);

        registry.clear();
        assert_eq!(registry.len(), 1);
        assert!(registry.has_factory(INT32_READER));
    }

    #[test]
    fn test_existing_instance_of_wrong_type() {
        let registry = TypeReaderRegistry::with_default_readers();
        let mut input = reader_over(&registry, vec![1]);
        let reader = OtherBoolReader;
        let err = ContentTypeReader::read(&reader, &mut input, Some(Box::new(5u8))).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { expected: "bool", .. }));
    }
}
