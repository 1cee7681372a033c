//! Asset loading from a content directory.

use std::any::{type_name, Any};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tracing::{debug, info};
use vassago_core::{Error, Result};

use crate::config::{ContentConfig, HeaderOptions};
use crate::reader::ContentReader;
use crate::registry::TypeReaderRegistry;

/// A loaded asset together with the name of its type.
struct CachedAsset {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl CachedAsset {
    fn new<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            value,
            type_name: type_name::<T>(),
        }
    }

    fn downcast<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
        Arc::clone(&self.value)
            .downcast::<T>()
            .map_err(|_| Error::TypeMismatch {
                expected: type_name::<T>(),
                actual: self.type_name,
            })
    }
}

/// Loads assets by name from a content directory and caches them.
///
/// Asset names are relative to the root directory, without the extension,
/// and may use either `/` or `\` as separator.
pub struct ContentManager {
    config: ContentConfig,
    options: HeaderOptions,
    registry: Arc<TypeReaderRegistry>,
    assets: DashMap<String, CachedAsset>,
}

impl ContentManager {
    /// Fails when the configuration does not describe valid header options.
    pub fn new(config: ContentConfig, registry: Arc<TypeReaderRegistry>) -> Result<Self> {
        let options = config.header_options()?;
        Ok(Self {
            config,
            options,
            registry,
            assets: DashMap::new(),
        })
    }

    pub fn config(&self) -> &ContentConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<TypeReaderRegistry> {
        &self.registry
    }

    pub fn root_directory(&self) -> &Path {
        &self.config.root_directory
    }

    /// File an asset name maps to.
    pub fn asset_path(&self, asset_name: &str) -> PathBuf {
        let name = normalize_asset_name(asset_name);
        self.config
            .root_directory
            .join(format!("{name}{}", self.config.extension))
    }

    /// Load an asset, returning the cached instance when there is one.
    pub fn load<T: Any + Send + Sync>(&self, asset_name: &str) -> Result<Arc<T>> {
        let key = normalize_asset_name(asset_name);
        if let Some(cached) = self.assets.get(&key) {
            return cached.downcast::<T>();
        }

        let asset = Arc::new(self.read_asset::<T>(&key)?);
        if !self.config.cache_assets {
            return Ok(asset);
        }

        // A concurrent load of the same name may have won the race.
        let cached = self
            .assets
            .entry(key)
            .or_insert_with(|| CachedAsset::new(Arc::clone(&asset)));
        cached.downcast::<T>()
    }

    fn read_asset<T: Any + Send + Sync>(&self, name: &str) -> Result<T> {
        let path = self.asset_path(name);
        let file = File::open(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::not_found(name, Some(e)),
            _ => Error::Io(e),
        })?;

        let started = Instant::now();
        let mut input =
            ContentReader::open(BufReader::new(file), &self.registry, &self.options)?.with_asset_name(name);
        let asset = input.read_asset::<T>()?;

        if let Some(header) = input.header() {
            info!(
                asset = name,
                compressed = header.compressed,
                bytes = header.content_size(),
                readers = input.type_readers().len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "loaded asset"
            );
        }
        Ok(asset)
    }

    /// Whether `asset_name` is in the cache.
    pub fn is_loaded(&self, asset_name: &str) -> bool {
        self.assets.contains_key(&normalize_asset_name(asset_name))
    }

    pub fn loaded_count(&self) -> usize {
        self.assets.len()
    }

    /// Drop one asset from the cache. Outstanding handles stay valid.
    pub fn unload_asset(&self, asset_name: &str) -> bool {
        self.assets.remove(&normalize_asset_name(asset_name)).is_some()
    }

    /// Drop every cached asset.
    pub fn unload(&self) {
        debug!(assets = self.assets.len(), "unloading content");
        self.assets.clear();
    }
}

impl std::fmt::Debug for ContentManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentManager")
            .field("root_directory", &self.config.root_directory)
            .field("loaded", &self.assets.len())
            .finish()
    }
}

fn normalize_asset_name(name: &str) -> String {
    name.replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readers::{STRING_READER, VECTOR3_READER};
    use crate::testing::{compressed_container, plain_container, ContentWriter};
    use crate::values::Vector3;
    use std::fs;
    use tempfile::TempDir;

    fn string_asset(text: &str) -> Vec<u8> {
        let mut writer = ContentWriter::new();
        writer
            .manifest(&[(STRING_READER, 0)])
            .encoded_int(0)
            .encoded_int(1)
            .string(text);
        writer.into_bytes()
    }

    fn manager(dir: &TempDir, cache_assets: bool) -> ContentManager {
        let config = ContentConfig {
            root_directory: dir.path().to_path_buf(),
            cache_assets,
            ..Default::default()
        };
        ContentManager::new(config, Arc::new(TypeReaderRegistry::with_default_readers())).unwrap()
    }

    #[test]
    fn test_load_and_cache() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("text")).unwrap();
        fs::write(
            dir.path().join("text/greeting.xnb"),
            plain_container(0, &string_asset("hello")),
        )
        .unwrap();

        let content = manager(&dir, true);
        assert!(!content.is_loaded("text/greeting"));
        let first = content.load::<String>("text/greeting").unwrap();
        assert_eq!(first.as_str(), "hello");
        assert!(content.is_loaded("text\\greeting"));

        let second = content.load::<String>("text\\greeting").unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        content.unload();
        assert_eq!(content.loaded_count(), 0);
        let third = content.load::<String>("text/greeting").unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn test_cache_disabled() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("note.xnb"), plain_container(0, &string_asset("n"))).unwrap();

        let content = manager(&dir, false);
        let first = content.load::<String>("note").unwrap();
        let second = content.load::<String>("note").unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(!content.is_loaded("note"));
    }

    #[test]
    fn test_missing_asset() {
        let dir = TempDir::new().unwrap();
        let content = manager(&dir, true);
        let err = content.load::<String>("nowhere").unwrap_err();
        assert!(err.is_not_found());
        assert!(!err.is_corrupt());
    }

    #[test]
    fn test_cached_asset_of_other_type() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("label.xnb"), plain_container(0, &string_asset("x"))).unwrap();

        let content = manager(&dir, true);
        content.load::<String>("label").unwrap();
        let err = content.load::<Vector3>("label").unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[test]
    fn test_corrupt_asset_is_distinguished() {
        let dir = TempDir::new().unwrap();
        let mut file = plain_container(0, &string_asset("x"));
        file[0] = b'Z';
        fs::write(dir.path().join("broken.xnb"), file).unwrap();

        let content = manager(&dir, true);
        let err = content.load::<String>("broken").unwrap_err();
        assert!(err.is_corrupt());
        assert!(!content.is_loaded("broken"));
    }

    #[test]
    fn test_compressed_asset() {
        let dir = TempDir::new().unwrap();
        let mut writer = ContentWriter::new();
        writer.manifest(&[(VECTOR3_READER, 0)]).encoded_int(0).encoded_int(1);
        writer.f32(0.5).f32(-1.0).f32(2.0);
        fs::write(dir.path().join("spawn.xnb"), compressed_container(1, &writer.into_bytes())).unwrap();

        let content = manager(&dir, true);
        let spawn = content.load::<Vector3>("spawn").unwrap();
        assert_eq!(*spawn, Vector3 { x: 0.5, y: -1.0, z: 2.0 });
        assert!(content.unload_asset("spawn"));
        assert!(!content.unload_asset("spawn"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ContentConfig {
            window_bits: 22,
            ..Default::default()
        };
        let err = ContentManager::new(config, Arc::new(TypeReaderRegistry::new())).unwrap_err();
        assert!(matches!(err, Error::UnsupportedWindowSize { bits: 22 }));
    }
}
