//! # Vassago Content
//!
//! Typed assets from XNB containers.
//!
//! A container is opened with [`AssetHeader::prepare`], which checks the
//! prologue and, for compressed files, decodes the whole LZX payload up
//! front. [`ContentReader`] then reads the reader manifest, resolving each
//! name through a [`TypeReaderRegistry`], followed by the root object and
//! any shared resources it refers to.
//!
//! ## Example
//!
//! ```ignore
//! use vassago_content::{ContentConfig, ContentManager, TypeReaderRegistry};
//!
//! let registry = Arc::new(TypeReaderRegistry::with_default_readers());
//! let content = ContentManager::new(ContentConfig::default(), registry)?;
//! let title: Arc<String> = content.load("text/title")?;
//! ```
//!
//! Custom object types implement [`TypedReader`] and are registered with
//! [`TypeReaderRegistry::register_factory`] under the name the content
//! pipeline writes for them.

pub mod config;
pub mod header;
pub mod manager;
pub mod manifest;
pub mod reader;
pub mod readers;
pub mod registry;
pub mod shared;
pub mod values;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{ContentConfig, HeaderOptions};
pub use header::{AssetHeader, GraphicsProfile, PreparedStream};
pub use manager::ContentManager;
pub use manifest::{normalize_reader_name, ManifestEntry};
pub use reader::ContentReader;
pub use registry::{ContentTypeReader, ContentValue, ReaderFactory, ReaderHandle, TargetType, TypeReaderRegistry, TypedReader};
pub use shared::SharedResource;
pub use values::{Color, Matrix, Point, Quaternion, Rectangle, TimeSpan, Vector2, Vector3, Vector4};

pub use vassago_core::{DecodeStats, Error, Result, WindowBits};
