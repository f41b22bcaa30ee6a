//! Typed N-dimensional buffers.

use super::DestType;
use ndarray::{ArrayD, Axis, IxDyn, ShapeError, Slice};
use std::fmt::Debug;

/// The row-major data of one dataset.
///
/// One variant per supported element type, so operations dispatch once on
/// the variant instead of juggling untyped memory.
#[derive(Debug, Clone, PartialEq)]
pub enum Buffer {
    /// Signed 8-bit integers.
    Int8(ArrayD<i8>),
    /// Unsigned 8-bit integers.
    UInt8(ArrayD<u8>),
    /// Signed 16-bit integers.
    Int16(ArrayD<i16>),
    /// Unsigned 16-bit integers.
    UInt16(ArrayD<u16>),
    /// Signed 32-bit integers.
    Int32(ArrayD<i32>),
    /// Unsigned 32-bit integers.
    UInt32(ArrayD<u32>),
    /// Signed 64-bit integers.
    Int64(ArrayD<i64>),
    /// Unsigned 64-bit integers.
    UInt64(ArrayD<u64>),
    /// 32-bit floats.
    Float32(ArrayD<f32>),
    /// 64-bit floats.
    Float64(ArrayD<f64>),
    /// Signed narrow characters.
    Char(ArrayD<i8>),
    /// Unsigned narrow characters.
    UChar(ArrayD<u8>),
}

/// Evaluate an expression against the inner array of any buffer variant.
macro_rules! with_array {
    ($buffer:expr, $arr:ident => $body:expr) => {
        match $buffer {
            $crate::types::Buffer::Int8($arr) => $body,
            $crate::types::Buffer::UInt8($arr) => $body,
            $crate::types::Buffer::Int16($arr) => $body,
            $crate::types::Buffer::UInt16($arr) => $body,
            $crate::types::Buffer::Int32($arr) => $body,
            $crate::types::Buffer::UInt32($arr) => $body,
            $crate::types::Buffer::Int64($arr) => $body,
            $crate::types::Buffer::UInt64($arr) => $body,
            $crate::types::Buffer::Float32($arr) => $body,
            $crate::types::Buffer::Float64($arr) => $body,
            $crate::types::Buffer::Char($arr) => $body,
            $crate::types::Buffer::UChar($arr) => $body,
        }
    };
}

/// Like `with_array!`, but rewraps the result in the same variant.
macro_rules! map_array {
    ($buffer:expr, $arr:ident => $body:expr) => {
        match $buffer {
            $crate::types::Buffer::Int8($arr) => $crate::types::Buffer::Int8($body),
            $crate::types::Buffer::UInt8($arr) => $crate::types::Buffer::UInt8($body),
            $crate::types::Buffer::Int16($arr) => $crate::types::Buffer::Int16($body),
            $crate::types::Buffer::UInt16($arr) => $crate::types::Buffer::UInt16($body),
            $crate::types::Buffer::Int32($arr) => $crate::types::Buffer::Int32($body),
            $crate::types::Buffer::UInt32($arr) => $crate::types::Buffer::UInt32($body),
            $crate::types::Buffer::Int64($arr) => $crate::types::Buffer::Int64($body),
            $crate::types::Buffer::UInt64($arr) => $crate::types::Buffer::UInt64($body),
            $crate::types::Buffer::Float32($arr) => $crate::types::Buffer::Float32($body),
            $crate::types::Buffer::Float64($arr) => $crate::types::Buffer::Float64($body),
            $crate::types::Buffer::Char($arr) => $crate::types::Buffer::Char($body),
            $crate::types::Buffer::UChar($arr) => $crate::types::Buffer::UChar($body),
        }
    };
}

pub(crate) use map_array;
pub(crate) use with_array;

impl Buffer {
    /// Build a buffer from a flat row-major vector and a shape.
    pub fn from_shape_vec<T: Element>(
        shape: &[usize],
        values: Vec<T>,
    ) -> std::result::Result<Self, ShapeError> {
        let array = ArrayD::from_shape_vec(IxDyn(shape), values)?;
        Ok(T::into_buffer(array))
    }

    /// Wrap an existing array.
    pub fn from_array<T: Element>(array: ArrayD<T>) -> Self {
        T::into_buffer(array)
    }

    /// Element type of the buffer.
    pub fn dest_type(&self) -> DestType {
        match self {
            Self::Int8(_) => DestType::Int8,
            Self::UInt8(_) => DestType::UInt8,
            Self::Int16(_) => DestType::Int16,
            Self::UInt16(_) => DestType::UInt16,
            Self::Int32(_) => DestType::Int32,
            Self::UInt32(_) => DestType::UInt32,
            Self::Int64(_) => DestType::Int64,
            Self::UInt64(_) => DestType::UInt64,
            Self::Float32(_) => DestType::Float32,
            Self::Float64(_) => DestType::Float64,
            Self::Char(_) => DestType::Char,
            Self::UChar(_) => DestType::UChar,
        }
    }

    /// Extent of every axis.
    pub fn shape(&self) -> &[usize] {
        with_array!(self, a => a.shape())
    }

    /// Number of axes.
    pub fn rank(&self) -> usize {
        self.shape().len()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        with_array!(self, a => a.len())
    }

    /// Whether the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the data in bytes.
    pub fn size_in_bytes(&self) -> usize {
        self.len() * self.dest_type().size()
    }

    /// Borrow the inner array if it holds elements of type `T`.
    pub fn as_array<T: Element>(&self) -> Option<&ArrayD<T>> {
        T::from_buffer(self)
    }

    /// Reinterpret as `dest` when both types share a storage width.
    ///
    /// Narrow characters and 8-bit integers convert into each other; any
    /// other change of type returns `None`.
    pub fn with_dest_type(self, dest: DestType) -> Option<Buffer> {
        if self.dest_type() == dest {
            return Some(self);
        }
        match (self, dest) {
            (Self::Int8(a), DestType::Char) => Some(Self::Char(a)),
            (Self::Char(a), DestType::Int8) => Some(Self::Int8(a)),
            (Self::UInt8(a), DestType::UChar) => Some(Self::UChar(a)),
            (Self::UChar(a), DestType::UInt8) => Some(Self::UInt8(a)),
            (Self::Char(a), DestType::UChar) => Some(Self::UChar(a.mapv(|v| v as u8))),
            _ => None,
        }
    }

    /// Copy rows `start..=end` along axis 0.
    ///
    /// # Panics
    ///
    /// Panics unless `start <= end` and `end` lies inside axis 0. Callers
    /// check the range against the shape first.
    pub fn rows(&self, start: usize, end: usize) -> Buffer {
        map_array!(self, a => a.slice_axis(Axis(0), Slice::from(start..end + 1)).to_owned())
    }

    /// Row-major little-endian bytes of every element.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size_in_bytes());
        with_array!(self, a => {
            for &v in a.iter() {
                v.extend_le_bytes(&mut out);
            }
        });
        out
    }

    /// All elements widened to `f64`, in row-major order.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        with_array!(self, a => a.iter().map(|&v| v.to_f64()).collect())
    }
}

/// A Rust element type that maps onto one [`Buffer`] variant.
pub trait Element: Copy + Default + Debug + PartialEq + 'static {
    /// Destination type stored for this element.
    const DEST_TYPE: DestType;

    /// Wrap an array of this element type.
    fn into_buffer(array: ArrayD<Self>) -> Buffer;

    /// Borrow the array back out of a buffer of the matching variant.
    fn from_buffer(buffer: &Buffer) -> Option<&ArrayD<Self>>;

    /// Append the little-endian encoding of the value.
    fn extend_le_bytes(self, out: &mut Vec<u8>);

    /// Widen to `f64`.
    fn to_f64(self) -> f64;
}

macro_rules! impl_element {
    ($t:ty, $variant:ident) => {
        impl Element for $t {
            const DEST_TYPE: DestType = DestType::$variant;

            fn into_buffer(array: ArrayD<Self>) -> Buffer {
                Buffer::$variant(array)
            }

            fn from_buffer(buffer: &Buffer) -> Option<&ArrayD<Self>> {
                match buffer {
                    Buffer::$variant(a) => Some(a),
                    _ => None,
                }
            }

            fn extend_le_bytes(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn to_f64(self) -> f64 {
                self as f64
            }
        }
    };
}

impl_element!(i8, Int8);
impl_element!(u8, UInt8);
impl_element!(i16, Int16);
impl_element!(u16, UInt16);
impl_element!(i32, Int32);
impl_element!(u32, UInt32);
impl_element!(i64, Int64);
impl_element!(u64, UInt64);
impl_element!(f32, Float32);
impl_element!(f64, Float64);
