use super::tables::{geometry, FILL};
use super::{unsupported, Unpack, Unpacked};
use crate::error::Result;
use crate::types::Buffer;

/// Fixed-scale angles stored as signed 16-bit counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryScaleUnpack {
    /// Degrees per count.
    pub scale: f32,
    /// Raw fill code.
    pub fill_raw: i16,
}

impl Default for GeometryScaleUnpack {
    fn default() -> Self {
        Self {
            scale: geometry::SCALE,
            fill_raw: geometry::FILL_RAW,
        }
    }
}

impl Unpack for GeometryScaleUnpack {
    fn unpack(&self, raw: &Buffer) -> Result<Unpacked> {
        let Buffer::Int16(a) = raw else {
            return Err(unsupported("GeometryScaleUnpack", raw));
        };
        let values = a.mapv(|v| {
            if v == self.fill_raw {
                FILL
            } else {
                f32::from(v) * self.scale
            }
        });
        Ok(Unpacked::values(values))
    }
}
