//! Source number-type tags and their destination equivalents.

use crate::error::{RepackError, Result};
use std::fmt;

/// Number-type tags of the source container (HDF4 `DFNT_*` codes).
pub mod tag {
    /// Unsigned narrow character.
    pub const UCHAR8: i32 = 3;
    /// Signed narrow character.
    pub const CHAR8: i32 = 4;
    /// 32-bit IEEE float.
    pub const FLOAT32: i32 = 5;
    /// 64-bit IEEE float.
    pub const FLOAT64: i32 = 6;
    /// Signed 8-bit integer.
    pub const INT8: i32 = 20;
    /// Unsigned 8-bit integer.
    pub const UINT8: i32 = 21;
    /// Signed 16-bit integer.
    pub const INT16: i32 = 22;
    /// Unsigned 16-bit integer.
    pub const UINT16: i32 = 23;
    /// Signed 32-bit integer.
    pub const INT32: i32 = 24;
    /// Unsigned 32-bit integer.
    pub const UINT32: i32 = 25;
    /// Signed 64-bit integer.
    pub const INT64: i32 = 26;
    /// Unsigned 64-bit integer.
    pub const UINT64: i32 = 27;

    /// Modifier bit for the machine-native byte order.
    pub const NATIVE: i32 = 0x1000;
    /// Modifier bit for little-endian storage.
    pub const LITEND: i32 = 0x4000;
}

/// Element type of a destination dataset.
///
/// Types are chosen by byte width and signedness only, never by the byte
/// order of the source, so output files stay portable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DestType {
    /// Signed 8-bit integer.
    Int8,
    /// Unsigned 8-bit integer.
    UInt8,
    /// Signed 16-bit integer.
    Int16,
    /// Unsigned 16-bit integer.
    UInt16,
    /// Signed 32-bit integer.
    Int32,
    /// Unsigned 32-bit integer.
    UInt32,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 64-bit integer.
    UInt64,
    /// 32-bit float.
    Float32,
    /// 64-bit float.
    Float64,
    /// Signed narrow character.
    Char,
    /// Unsigned narrow character.
    UChar,
}

impl DestType {
    /// Size of one element in bytes.
    pub fn size(self) -> usize {
        match self {
            Self::Int8 | Self::UInt8 | Self::Char | Self::UChar => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }

    /// Whether this is a floating-point type.
    pub fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    /// Short lowercase name, as shown in logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::UInt8 => "uint8",
            Self::Int16 => "int16",
            Self::UInt16 => "uint16",
            Self::Int32 => "int32",
            Self::UInt32 => "uint32",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Char => "char",
            Self::UChar => "uchar",
        }
    }
}

impl fmt::Display for DestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Map a source number-type tag to its destination type.
///
/// Byte-order modifier bits are ignored; any tag outside the enumerated set
/// fails with [`RepackError::TypeUnsupported`].
pub fn map_type(source_tag: i32) -> Result<DestType> {
    let base = source_tag & !(tag::NATIVE | tag::LITEND);
    let dest = match base {
        tag::INT8 => DestType::Int8,
        tag::UINT8 => DestType::UInt8,
        tag::INT16 => DestType::Int16,
        tag::UINT16 => DestType::UInt16,
        tag::INT32 => DestType::Int32,
        tag::UINT32 => DestType::UInt32,
        tag::INT64 => DestType::Int64,
        tag::UINT64 => DestType::UInt64,
        tag::FLOAT32 => DestType::Float32,
        tag::FLOAT64 => DestType::Float64,
        tag::CHAR8 => DestType::Char,
        tag::UCHAR8 => DestType::UChar,
        _ => {
            return Err(RepackError::TypeUnsupported(format!(
                "source tag {}",
                source_tag
            )))
        }
    };
    Ok(dest)
}

/// The canonical source tag for a destination type.
///
/// Backends that do not speak source tags natively (the netCDF and in-memory
/// sources) report their element types through this function so that every
/// read still goes through [`map_type`].
pub fn source_tag(dest: DestType) -> i32 {
    match dest {
        DestType::Int8 => tag::INT8,
        DestType::UInt8 => tag::UINT8,
        DestType::Int16 => tag::INT16,
        DestType::UInt16 => tag::UINT16,
        DestType::Int32 => tag::INT32,
        DestType::UInt32 => tag::UINT32,
        DestType::Int64 => tag::INT64,
        DestType::UInt64 => tag::UINT64,
        DestType::Float32 => tag::FLOAT32,
        DestType::Float64 => tag::FLOAT64,
        DestType::Char => tag::CHAR8,
        DestType::UChar => tag::UCHAR8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_TAGS: [i32; 12] = [
        tag::UCHAR8,
        tag::CHAR8,
        tag::FLOAT32,
        tag::FLOAT64,
        tag::INT8,
        tag::UINT8,
        tag::INT16,
        tag::UINT16,
        tag::INT32,
        tag::UINT32,
        tag::INT64,
        tag::UINT64,
    ];

    #[test]
    fn test_every_enumerated_tag_maps() {
        for t in ALL_TAGS {
            let dest = map_type(t).unwrap();
            assert_eq!(source_tag(dest), t);
            assert_eq!(map_type(t).unwrap(), dest, "mapping must be stable");
        }
    }

    #[test]
    fn test_byte_order_modifiers_map_by_width() {
        assert_eq!(map_type(tag::UINT16 | tag::NATIVE).unwrap(), DestType::UInt16);
        assert_eq!(map_type(tag::FLOAT64 | tag::LITEND).unwrap(), DestType::Float64);
        assert_eq!(
            map_type(tag::INT32 | tag::NATIVE | tag::LITEND).unwrap(),
            DestType::Int32
        );
    }

    #[test]
    fn test_unknown_tags_fail_identically() {
        for t in [0, 1, 2, 7, 19, 28, 40, -1, 0x2000 | tag::INT8] {
            let err = map_type(t).unwrap_err();
            assert!(matches!(err, RepackError::TypeUnsupported(_)), "tag {}", t);
        }
    }

    #[test]
    fn test_sizes() {
        assert_eq!(map_type(tag::UINT8).unwrap().size(), 1);
        assert_eq!(map_type(tag::INT16).unwrap().size(), 2);
        assert_eq!(map_type(tag::FLOAT32).unwrap().size(), 4);
        assert_eq!(map_type(tag::UINT64).unwrap().size(), 8);
        assert!(DestType::Float64.is_float());
        assert!(!DestType::UInt16.is_float());
    }
}
