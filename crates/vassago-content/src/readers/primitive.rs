//! Numeric, character and string readers.

use vassago_core::Result;

use crate::reader::ContentReader;
use crate::registry::TypedReader;

leaf_reader!(BooleanReader => bool, |input| input.read_bool());
leaf_reader!(ByteReader => u8, |input| input.read_u8());
leaf_reader!(SByteReader => i8, |input| input.read_i8());
leaf_reader!(
    /// One UTF-8 encoded character.
    CharReader => char, |input| input.read_char()
);
leaf_reader!(Int16Reader => i16, |input| input.read_i16());
leaf_reader!(UInt16Reader => u16, |input| input.read_u16());
leaf_reader!(Int32Reader => i32, |input| input.read_i32());
leaf_reader!(UInt32Reader => u32, |input| input.read_u32());
leaf_reader!(Int64Reader => i64, |input| input.read_i64());
leaf_reader!(UInt64Reader => u64, |input| input.read_u64());
leaf_reader!(SingleReader => f32, |input| input.read_f32());
leaf_reader!(DoubleReader => f64, |input| input.read_f64());

/// Strings are reference types: they carry a type index wherever they appear.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringReader;

impl TypedReader for StringReader {
    type Target = String;

    fn target_is_value_type(&self) -> bool {
        false
    }

    fn read_typed(&self, input: &mut ContentReader<'_>, _existing: Option<String>) -> Result<String> {
        input.read_string()
    }
}
