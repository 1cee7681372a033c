//! Type reader manifest records.

use vassago_core::Result;

use crate::reader::ContentReader;

/// Reader name with any assembly qualification stripped.
///
/// Names are cut at the first `,`, which for generic readers falls inside
/// the type argument list (``ListReader`1[[System.Int32, mscorlib]]`` becomes
/// ``ListReader`1[[System.Int32``).
pub fn normalize_reader_name(name: &str) -> &str {
    match name.find(',') {
        Some(0) | None => name,
        Some(end) => &name[..end],
    }
}

/// One entry of an asset's reader manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Name exactly as stored.
    pub name: String,
    /// Reader version the asset was written with.
    pub version: i32,
}

impl ManifestEntry {
    /// Read one `(name, version)` record.
    pub fn read(input: &mut ContentReader<'_>) -> Result<Self> {
        let name = input.read_string()?;
        let version = input.read_i32()?;
        Ok(Self { name, version })
    }

    /// Name used for registry lookups.
    pub fn reader_name(&self) -> &str {
        normalize_reader_name(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_reader_name() {
        assert_eq!(
            normalize_reader_name("Microsoft.Xna.Framework.Content.Int32Reader"),
            "Microsoft.Xna.Framework.Content.Int32Reader"
        );
        assert_eq!(
            normalize_reader_name(
                "Microsoft.Xna.Framework.Content.StringReader, Microsoft.Xna.Framework, Version=4.0.0.0"
            ),
            "Microsoft.Xna.Framework.Content.StringReader"
        );
        assert_eq!(
            normalize_reader_name(
                "Microsoft.Xna.Framework.Content.ListReader`1[[System.Int32, mscorlib, Version=4.0.0.0]]"
            ),
            "Microsoft.Xna.Framework.Content.ListReader`1[[System.Int32"
        );
        assert_eq!(normalize_reader_name(",odd"), ",odd");
    }
}
