//! Binary cursor over a prepared payload.
//!
//! Primitives are little-endian. Lengths and indices use the 7-bit varint
//! encoding (low groups first, high bit set on all but the last byte).
//! Objects are a 7-bit type index into the asset's manifest, `0` meaning
//! null, followed by whatever the indexed reader consumes.

use std::any::{type_name, Any};
use std::io::{Read, Seek};
use std::sync::Arc;

use vassago_core::stream::read_exact;
use vassago_core::{Error, Result};

use crate::config::HeaderOptions;
use crate::header::{AssetHeader, GraphicsProfile};
use crate::manifest::ManifestEntry;
use crate::registry::{ContentTypeReader, ContentValue, ReaderHandle, TargetType, TypeReaderRegistry};
use crate::shared::{Fixup, SharedResource, SharedValue};
use crate::values::{Color, Matrix, Quaternion, Vector2, Vector3, Vector4};

/// Longest 7-bit encoded `i32`.
const MAX_VARINT_BYTES: u32 = 5;

/// Reads typed content from a payload.
pub struct ContentReader<'a> {
    input: Box<dyn Read + 'a>,
    registry: &'a TypeReaderRegistry,
    asset_name: String,
    header: Option<AssetHeader>,
    position: u64,
    type_readers: Vec<ReaderHandle>,
    shared_resource_count: usize,
    fixups: Vec<Fixup>,
}

impl<'a> ContentReader<'a> {
    /// Reader over an already prepared (plain) payload.
    pub fn new(input: impl Read + 'a, registry: &'a TypeReaderRegistry) -> Self {
        Self {
            input: Box::new(input),
            registry,
            asset_name: String::new(),
            header: None,
            position: 0,
            type_readers: Vec::new(),
            shared_resource_count: 0,
            fixups: Vec::new(),
        }
    }

    /// Parse a container prologue and read its payload.
    pub fn open<R: Read + Seek + 'a>(
        input: R,
        registry: &'a TypeReaderRegistry,
        options: &HeaderOptions,
    ) -> Result<Self> {
        let (header, stream) = AssetHeader::prepare(input, options)?;
        let mut reader = Self::new(stream, registry);
        reader.header = Some(header);
        Ok(reader)
    }

    /// Name reported for this asset.
    pub fn with_asset_name(mut self, name: impl Into<String>) -> Self {
        self.asset_name = name.into();
        self
    }

    pub fn asset_name(&self) -> &str {
        &self.asset_name
    }

    /// Container prologue, when opened with [`open`](Self::open).
    pub fn header(&self) -> Option<&AssetHeader> {
        self.header.as_ref()
    }

    pub fn graphics_profile(&self) -> Option<GraphicsProfile> {
        self.header.map(|header| header.graphics_profile)
    }

    pub fn registry(&self) -> &'a TypeReaderRegistry {
        self.registry
    }

    /// Payload bytes consumed so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Readers from the manifest, in index order.
    pub fn type_readers(&self) -> &[ReaderHandle] {
        &self.type_readers
    }

    pub fn shared_resource_count(&self) -> usize {
        self.shared_resource_count
    }

    // Primitives

    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        read_exact(&mut self.input, buf, self.position)?;
        self.position += buf.len() as u64;
        Ok(())
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.fill(&mut buf)?;
        Ok(buf)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    /// Any non-zero byte is `true`.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.array()?))
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.array()?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.array()?))
    }

    pub fn read_u16_be(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    pub fn read_u32_be(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    /// One UTF-8 encoded character.
    pub fn read_char(&mut self) -> Result<char> {
        let start = self.position;
        let mut buf = [0u8; 4];
        buf[0] = self.read_u8()?;
        let width = match buf[0] {
            0x00..=0x7F => 1,
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => return Err(Error::corrupted_at("invalid UTF-8 lead byte", start)),
        };
        self.fill(&mut buf[1..width])?;
        std::str::from_utf8(&buf[..width])
            .ok()
            .and_then(|s| s.chars().next())
            .ok_or_else(|| Error::corrupted_at("invalid UTF-8 character", start))
    }

    /// A 7-bit encoded `i32`.
    pub fn read_7bit_encoded_int(&mut self) -> Result<i32> {
        let start = self.position;
        let mut value: u32 = 0;
        for group in 0..MAX_VARINT_BYTES {
            let byte = self.read_u8()?;
            if group == MAX_VARINT_BYTES - 1 && byte > 0x0F {
                return Err(Error::corrupted_at("7-bit encoded int overflows 32 bits", start));
            }
            value |= ((byte & 0x7F) as u32) << (group * 7);
            if byte & 0x80 == 0 {
                return Ok(value as i32);
            }
        }
        Err(Error::corrupted_at("7-bit encoded int longer than 5 bytes", start))
    }

    /// A 7-bit encoded count or index, which must not be negative.
    fn read_count(&mut self, what: &str) -> Result<usize> {
        let start = self.position;
        let value = self.read_7bit_encoded_int()?;
        usize::try_from(value).map_err(|_| Error::corrupted_at(format!("negative {what} {value}"), start))
    }

    /// `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let read = (&mut self.input).take(len as u64).read_to_end(&mut buf)?;
        self.position += read as u64;
        if read < len {
            return Err(Error::unexpected_eof(self.position));
        }
        Ok(buf)
    }

    /// A length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String> {
        let start = self.position;
        let len = self.read_count("string length")?;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes).map_err(|e| Error::CorruptedData {
            message: format!("string at offset {start} is not UTF-8"),
            source: Some(Box::new(e)),
        })
    }

    pub fn read_vector2(&mut self) -> Result<Vector2> {
        Ok(Vector2 {
            x: self.read_f32()?,
            y: self.read_f32()?,
        })
    }

    pub fn read_vector3(&mut self) -> Result<Vector3> {
        Ok(Vector3 {
            x: self.read_f32()?,
            y: self.read_f32()?,
            z: self.read_f32()?,
        })
    }

    pub fn read_vector4(&mut self) -> Result<Vector4> {
        Ok(Vector4 {
            x: self.read_f32()?,
            y: self.read_f32()?,
            z: self.read_f32()?,
            w: self.read_f32()?,
        })
    }

    /// Sixteen floats, row by row.
    pub fn read_matrix(&mut self) -> Result<Matrix> {
        let mut m = [[0f32; 4]; 4];
        for row in m.iter_mut() {
            for cell in row.iter_mut() {
                *cell = self.read_f32()?;
            }
        }
        Ok(Matrix { m })
    }

    pub fn read_quaternion(&mut self) -> Result<Quaternion> {
        Ok(Quaternion {
            x: self.read_f32()?,
            y: self.read_f32()?,
            z: self.read_f32()?,
            w: self.read_f32()?,
        })
    }

    /// Four bytes: red, green, blue, alpha.
    pub fn read_color(&mut self) -> Result<Color> {
        let [r, g, b, a] = self.array()?;
        Ok(Color { r, g, b, a })
    }

    // Objects

    /// Reader selected by the next type index, `None` for null.
    fn read_type_index(&mut self) -> Result<Option<ReaderHandle>> {
        let start = self.position;
        let index = self.read_count("type reader index")?;
        if index == 0 {
            return Ok(None);
        }
        match self.type_readers.get(index - 1) {
            Some(reader) => Ok(Some(Arc::clone(reader))),
            None => Err(Error::corrupted_at(
                format!(
                    "type reader index {index} out of range ({} readers)",
                    self.type_readers.len()
                ),
                start,
            )),
        }
    }

    fn invoke_reader<T: Any + Send + Sync>(
        &mut self,
        reader: &dyn ContentTypeReader,
        existing: Option<T>,
    ) -> Result<T> {
        let existing = existing.map(|value| Box::new(value) as ContentValue);
        let value = reader.read(self, existing)?;
        value
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| Error::TypeMismatch {
                expected: type_name::<T>(),
                actual: reader.target_type().name(),
            })
    }

    fn read_object_internal<T: Any + Send + Sync>(&mut self, existing: Option<T>) -> Result<Option<T>> {
        match self.read_type_index()? {
            Some(reader) => self.invoke_reader(reader.as_ref(), existing).map(Some),
            None => Ok(None),
        }
    }

    /// Read an object through the reader its type index names.
    pub fn read_object<T: Any + Send + Sync>(&mut self) -> Result<Option<T>> {
        self.read_object_internal(None)
    }

    /// Like [`read_object`](Self::read_object), letting the reader reuse `existing`.
    pub fn read_object_into<T: Any + Send + Sync>(&mut self, existing: T) -> Result<Option<T>> {
        self.read_object_internal(Some(existing))
    }

    /// Read an object whose reader is known. Value types are stored inline,
    /// without a type index.
    pub fn read_object_with<T: Any + Send + Sync>(&mut self, reader: &dyn ContentTypeReader) -> Result<Option<T>> {
        if reader.target_is_value_type() {
            self.invoke_reader(reader, None).map(Some)
        } else {
            self.read_object_internal(None)
        }
    }

    /// Read an object of whatever type its index names.
    pub fn read_raw_object(&mut self) -> Result<Option<ContentValue>> {
        Ok(self.read_tagged_object()?.map(|(value, _)| value))
    }

    fn read_tagged_object(&mut self) -> Result<Option<(ContentValue, TargetType)>> {
        match self.read_type_index()? {
            Some(reader) => {
                let value = reader.read(self, None)?;
                Ok(Some((value, reader.target_type())))
            }
            None => Ok(None),
        }
    }

    /// Reference to a shared resource, resolved by [`read_asset`](Self::read_asset).
    pub fn read_shared_resource<T: Any + Send + Sync>(&mut self) -> Result<Option<SharedResource<T>>> {
        let start = self.position;
        let index = self.read_count("shared resource index")?;
        if index == 0 {
            return Ok(None);
        }
        if index > self.shared_resource_count {
            return Err(Error::corrupted_at(
                format!(
                    "shared resource {index} out of range ({} shared)",
                    self.shared_resource_count
                ),
                start,
            ));
        }
        let resource = SharedResource::pending(index - 1);
        self.fixups.push(resource.fixup());
        Ok(Some(resource))
    }

    // Asset

    /// Read the reader manifest without resolving it.
    pub fn read_raw_manifest(&mut self) -> Result<Vec<ManifestEntry>> {
        let count = self.read_count("type reader count")?;
        let mut entries = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            entries.push(ManifestEntry::read(self)?);
        }
        Ok(entries)
    }

    fn read_header(&mut self) -> Result<()> {
        let count = self.read_count("type reader count")?;
        let registry = self.registry;
        self.type_readers = registry.read_manifest(count, self)?;
        self.shared_resource_count = self.read_count("shared resource count")?;
        Ok(())
    }

    fn read_shared_resources(&mut self) -> Result<()> {
        let mut values: Vec<Option<SharedValue>> = Vec::with_capacity(self.shared_resource_count.min(64));
        for _ in 0..self.shared_resource_count {
            let value = self
                .read_tagged_object()?
                .map(|(value, target)| (Arc::from(value), target));
            values.push(value);
        }

        for fixup in std::mem::take(&mut self.fixups) {
            if let Some(Some(value)) = values.get(fixup.index()) {
                fixup.apply(value)?;
            }
        }
        Ok(())
    }

    /// Read a whole asset: manifest, root object and shared resources.
    pub fn read_asset<T: Any + Send + Sync>(&mut self) -> Result<T> {
        self.read_header()?;
        let root = self
            .read_object::<T>()?
            .ok_or_else(|| Error::corrupted_at("asset root object is null", self.position))?;
        self.read_shared_resources()?;
        Ok(root)
    }
}

impl std::fmt::Debug for ContentReader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentReader")
            .field("asset_name", &self.asset_name)
            .field("position", &self.position)
            .field("type_readers", &self.type_readers.len())
            .field("shared_resources", &self.shared_resource_count)
            .finish()
    }
}
