use super::tables::{misr, FILL};
use super::{unsupported, Unpack, Unpacked};
use crate::engine::object_name;
use crate::error::{RepackError, Result};
use crate::types::Buffer;

const QUALITY_MASK: u16 = 0b11;

/// Radiance packed with a two-bit quality indicator in the low bits.
///
/// Quality 2 and 3 are unusable and become fill. Quality 1 is kept but its
/// flat position is reported in [`Unpacked::low_accuracy`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityFlagUnpack {
    /// Radiance per shifted count.
    pub scale: f32,
}

impl QualityFlagUnpack {
    /// Create a decoder; the scale must not be negative.
    pub fn new(scale: f32) -> Result<Self> {
        if scale < 0.0 {
            return Err(RepackError::calibration_mismatch(
                "quality flag unpack",
                format!("negative scale {}", scale),
            ));
        }
        Ok(Self { scale })
    }

    fn value(&self, raw: u16) -> f32 {
        if raw & QUALITY_MASK >= 2 {
            return FILL;
        }
        let shifted = raw >> 2;
        if misr::RESERVED.contains(&shifted) {
            FILL
        } else {
            self.scale * f32::from(shifted)
        }
    }
}

impl Unpack for QualityFlagUnpack {
    fn unpack(&self, raw: &Buffer) -> Result<Unpacked> {
        let Buffer::UInt16(a) = raw else {
            return Err(unsupported("QualityFlagUnpack", raw));
        };
        let low_accuracy = a
            .iter()
            .enumerate()
            .filter(|(_, &v)| v & QUALITY_MASK == 1)
            .map(|(i, _)| {
                i32::try_from(i).map_err(|_| {
                    RepackError::TypeUnsupported(format!("position {} exceeds int32", i))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Unpacked {
            values: a.mapv(|v| self.value(v)),
            low_accuracy,
        })
    }
}

/// Output name of a quality-flagged field: the path without `/RDQI`.
pub fn quality_output_name(path: &str) -> Result<String> {
    let field = path.strip_suffix(misr::RDQI_SUFFIX).ok_or_else(|| {
        RepackError::InvalidOptions(format!("{} does not end with {}", path, misr::RDQI_SUFFIX))
    })?;
    Ok(object_name(field).to_string())
}
