//! Built-in type readers.
//!
//! Leaf readers cover the primitive and math value types. Every leaf type
//! also gets a list and an array reader, registered under the generic
//! manifest names the content pipeline writes for them.

use vassago_core::{Error, Result};

use crate::reader::ContentReader;
use crate::registry::{ContentTypeReader, ContentValue, ReaderFactory, TargetType, TypeReaderRegistry, TypedReader};

/// Defines a unit-struct value-type reader whose body reads one `$target`.
macro_rules! leaf_reader {
    ($(#[$meta:meta])* $name:ident => $target:ty, |$input:ident| $body:expr) => {
        $(#[$meta])*
        #[derive(Debug, Default, Clone, Copy)]
        pub struct $name;

        impl $crate::registry::TypedReader for $name {
            type Target = $target;

            fn read_typed(
                &self,
                $input: &mut $crate::reader::ContentReader<'_>,
                _existing: Option<$target>,
            ) -> vassago_core::Result<$target> {
                $body
            }
        }
    };
}

mod collection;
mod math;
mod primitive;

pub use collection::{ArrayReader, ListReader};
pub use math::{
    ColorReader, MatrixReader, PointReader, QuaternionReader, RectangleReader, TimeSpanReader, Vector2Reader,
    Vector3Reader, Vector4Reader,
};
pub use primitive::{
    BooleanReader, ByteReader, CharReader, DoubleReader, Int16Reader, Int32Reader, Int64Reader, SByteReader,
    SingleReader, StringReader, UInt16Reader, UInt32Reader, UInt64Reader,
};

pub const OBJECT_READER: &str = "Microsoft.Xna.Framework.Content.ObjectReader";
pub const BOOLEAN_READER: &str = "Microsoft.Xna.Framework.Content.BooleanReader";
pub const BYTE_READER: &str = "Microsoft.Xna.Framework.Content.ByteReader";
pub const SBYTE_READER: &str = "Microsoft.Xna.Framework.Content.SByteReader";
pub const CHAR_READER: &str = "Microsoft.Xna.Framework.Content.CharReader";
pub const INT16_READER: &str = "Microsoft.Xna.Framework.Content.Int16Reader";
pub const UINT16_READER: &str = "Microsoft.Xna.Framework.Content.UInt16Reader";
pub const INT32_READER: &str = "Microsoft.Xna.Framework.Content.Int32Reader";
pub const UINT32_READER: &str = "Microsoft.Xna.Framework.Content.UInt32Reader";
pub const INT64_READER: &str = "Microsoft.Xna.Framework.Content.Int64Reader";
pub const UINT64_READER: &str = "Microsoft.Xna.Framework.Content.UInt64Reader";
pub const SINGLE_READER: &str = "Microsoft.Xna.Framework.Content.SingleReader";
pub const DOUBLE_READER: &str = "Microsoft.Xna.Framework.Content.DoubleReader";
pub const STRING_READER: &str = "Microsoft.Xna.Framework.Content.StringReader";
pub const TIMESPAN_READER: &str = "Microsoft.Xna.Framework.Content.TimeSpanReader";
pub const VECTOR2_READER: &str = "Microsoft.Xna.Framework.Content.Vector2Reader";
pub const VECTOR3_READER: &str = "Microsoft.Xna.Framework.Content.Vector3Reader";
pub const VECTOR4_READER: &str = "Microsoft.Xna.Framework.Content.Vector4Reader";
pub const MATRIX_READER: &str = "Microsoft.Xna.Framework.Content.MatrixReader";
pub const QUATERNION_READER: &str = "Microsoft.Xna.Framework.Content.QuaternionReader";
pub const COLOR_READER: &str = "Microsoft.Xna.Framework.Content.ColorReader";
pub const POINT_READER: &str = "Microsoft.Xna.Framework.Content.PointReader";
pub const RECTANGLE_READER: &str = "Microsoft.Xna.Framework.Content.RectangleReader";

pub const LIST_OF_INT32_READER: &str = "Microsoft.Xna.Framework.Content.ListReader`1[[System.Int32";
pub const LIST_OF_STRING_READER: &str = "Microsoft.Xna.Framework.Content.ListReader`1[[System.String";
pub const ARRAY_OF_INT32_READER: &str = "Microsoft.Xna.Framework.Content.ArrayReader`1[[System.Int32";

/// Normalized manifest name of the list reader for `element`.
pub fn list_reader_name(element: &str) -> String {
    format!("Microsoft.Xna.Framework.Content.ListReader`1[[{element}")
}

/// Normalized manifest name of the array reader for `element`.
pub fn array_reader_name(element: &str) -> String {
    format!("Microsoft.Xna.Framework.Content.ArrayReader`1[[{element}")
}

fn with_collections<R: TypedReader + Default>(registry: &TypeReaderRegistry, name: &str, element: &str) {
    registry.register_factory(name, ReaderFactory::of::<R>());
    registry.register_factory(&list_reader_name(element), ReaderFactory::of::<ListReader<R::Target>>());
    registry.register_factory(&array_reader_name(element), ReaderFactory::of::<ArrayReader<R::Target>>());
}

/// Register factories for every built-in reader.
pub fn register_defaults(registry: &TypeReaderRegistry) {
    with_collections::<BooleanReader>(registry, BOOLEAN_READER, "System.Boolean");
    with_collections::<ByteReader>(registry, BYTE_READER, "System.Byte");
    with_collections::<SByteReader>(registry, SBYTE_READER, "System.SByte");
    with_collections::<CharReader>(registry, CHAR_READER, "System.Char");
    with_collections::<Int16Reader>(registry, INT16_READER, "System.Int16");
    with_collections::<UInt16Reader>(registry, UINT16_READER, "System.UInt16");
    with_collections::<Int32Reader>(registry, INT32_READER, "System.Int32");
    with_collections::<UInt32Reader>(registry, UINT32_READER, "System.UInt32");
    with_collections::<Int64Reader>(registry, INT64_READER, "System.Int64");
    with_collections::<UInt64Reader>(registry, UINT64_READER, "System.UInt64");
    with_collections::<SingleReader>(registry, SINGLE_READER, "System.Single");
    with_collections::<DoubleReader>(registry, DOUBLE_READER, "System.Double");
    with_collections::<StringReader>(registry, STRING_READER, "System.String");
    with_collections::<TimeSpanReader>(registry, TIMESPAN_READER, "System.TimeSpan");
    with_collections::<Vector2Reader>(registry, VECTOR2_READER, "Microsoft.Xna.Framework.Vector2");
    with_collections::<Vector3Reader>(registry, VECTOR3_READER, "Microsoft.Xna.Framework.Vector3");
    with_collections::<Vector4Reader>(registry, VECTOR4_READER, "Microsoft.Xna.Framework.Vector4");
    with_collections::<MatrixReader>(registry, MATRIX_READER, "Microsoft.Xna.Framework.Matrix");
    with_collections::<QuaternionReader>(registry, QUATERNION_READER, "Microsoft.Xna.Framework.Quaternion");
    with_collections::<ColorReader>(registry, COLOR_READER, "Microsoft.Xna.Framework.Color");
    with_collections::<PointReader>(registry, POINT_READER, "Microsoft.Xna.Framework.Point");
    with_collections::<RectangleReader>(registry, RECTANGLE_READER, "Microsoft.Xna.Framework.Rectangle");
}

/// Placeholder for fields declared as a bare object.
///
/// Such objects always carry their own type index, so the stream never
/// dispatches to this reader. Reading through it directly is an error.
#[derive(Debug, Default, Clone, Copy)]
pub struct ObjectReader;

impl ContentTypeReader for ObjectReader {
    fn target_type(&self) -> TargetType {
        TargetType::of::<ContentValue>()
    }

    fn target_is_value_type(&self) -> bool {
        false
    }

    fn read(&self, input: &mut ContentReader<'_>, _existing: Option<ContentValue>) -> Result<ContentValue> {
        Err(Error::corrupted_at(
            "object reader invoked directly; objects must name a concrete reader",
            input.position(),
        ))
    }
}
