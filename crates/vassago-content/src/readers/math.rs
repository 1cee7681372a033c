//! Math and time value readers.

use crate::values::{Color, Matrix, Point, Quaternion, Rectangle, TimeSpan, Vector2, Vector3, Vector4};

leaf_reader!(Vector2Reader => Vector2, |input| input.read_vector2());
leaf_reader!(Vector3Reader => Vector3, |input| input.read_vector3());
leaf_reader!(Vector4Reader => Vector4, |input| input.read_vector4());
leaf_reader!(MatrixReader => Matrix, |input| input.read_matrix());
leaf_reader!(QuaternionReader => Quaternion, |input| input.read_quaternion());
leaf_reader!(ColorReader => Color, |input| input.read_color());

leaf_reader!(PointReader => Point, |input| Ok(Point {
    x: input.read_i32()?,
    y: input.read_i32()?,
}));

leaf_reader!(RectangleReader => Rectangle, |input| Ok(Rectangle {
    x: input.read_i32()?,
    y: input.read_i32()?,
    width: input.read_i32()?,
    height: input.read_i32()?,
}));

leaf_reader!(
    /// Signed 100 ns ticks.
    TimeSpanReader => TimeSpan, |input| Ok(TimeSpan::from_ticks(input.read_i64()?))
);
