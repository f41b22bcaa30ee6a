use super::calibration::CalibrationParameters;
use super::{per_band, unsupported, Unpack, Unpacked};
use crate::error::Result;
use crate::types::Buffer;

/// `scale[b] * raw - scale[b] * offset[b]` on unsigned 8 or 16 bit data.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearUnpack {
    /// Per-band parameters and reserved codes.
    pub calibration: CalibrationParameters,
}

impl LinearUnpack {
    /// Wrap a set of parameters.
    pub fn new(calibration: CalibrationParameters) -> Self {
        Self { calibration }
    }

    fn value(&self, band: usize, raw: u32) -> f32 {
        if let Some(fixed) = self.calibration.sentinels.lookup(raw) {
            return fixed;
        }
        let (scale, offset) = self.calibration.band(band);
        scale * raw as f32 - scale * offset
    }
}

impl Unpack for LinearUnpack {
    fn unpack(&self, raw: &Buffer) -> Result<Unpacked> {
        self.calibration.check_bands("linear unpack input", raw.shape())?;
        let values = match raw {
            Buffer::UInt8(a) | Buffer::UChar(a) => per_band(a, |b, v| self.value(b, u32::from(v))),
            Buffer::UInt16(a) => per_band(a, |b, v| self.value(b, u32::from(v))),
            _ => return Err(unsupported("LinearUnpack", raw)),
        };
        Ok(Unpacked::values(values))
    }
}
