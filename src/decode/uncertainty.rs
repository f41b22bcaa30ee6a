use super::calibration::CalibrationParameters;
use super::tables::FILL;
use super::{per_band, unsupported, Unpack, Unpacked};
use crate::error::Result;
use crate::types::Buffer;

/// `unc[b] * exp(raw / scale[b])` on 8-bit uncertainty indices.
///
/// `calibration.scales` holds the scaling factors and
/// `calibration.offsets` the specified uncertainties.
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialUncertaintyUnpack {
    /// Per-band parameters, reserved codes and valid range.
    pub calibration: CalibrationParameters,
}

impl ExponentialUncertaintyUnpack {
    /// Wrap a set of parameters.
    pub fn new(calibration: CalibrationParameters) -> Self {
        Self { calibration }
    }

    fn value(&self, band: usize, raw: u8) -> f32 {
        let raw = u32::from(raw);
        if let Some(fixed) = self.calibration.sentinels.lookup(raw) {
            return fixed;
        }
        if !self.calibration.is_valid(raw) {
            return FILL;
        }
        let (scale, uncertainty) = self.calibration.band(band);
        (f64::from(uncertainty) * (f64::from(raw) / f64::from(scale)).exp()) as f32
    }
}

impl Unpack for ExponentialUncertaintyUnpack {
    fn unpack(&self, raw: &Buffer) -> Result<Unpacked> {
        self.calibration
            .check_bands("uncertainty unpack input", raw.shape())?;
        match raw {
            Buffer::UInt8(a) | Buffer::UChar(a) => {
                Ok(Unpacked::values(per_band(a, |b, v| self.value(b, v))))
            }
            _ => Err(unsupported("ExponentialUncertaintyUnpack", raw)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::tables::modis;

    fn unpack() -> ExponentialUncertaintyUnpack {
        let mut calibration = modis::uncertainty_calibration();
        calibration.scales = vec![5.0, 7.0];
        calibration.offsets = vec![1.5, 2.0];
        ExponentialUncertaintyUnpack::new(calibration)
    }

    #[test]
    fn test_formula_per_band() {
        let raw = Buffer::from_shape_vec(&[2, 2], vec![0u8, 5, 0, 7]).unwrap();
        let out = unpack().unpack(&raw).unwrap();
        let v = out.values.as_slice().unwrap();
        assert_eq!(v[0], 1.5);
        assert!((v[1] - 1.5 * std::f32::consts::E).abs() < 1e-5);
        assert_eq!(v[2], 2.0);
        assert!((v[3] - 2.0 * std::f32::consts::E).abs() < 1e-5);
    }

    #[test]
    fn test_fill_and_out_of_range() {
        let raw = Buffer::from_shape_vec(&[2, 2], vec![255u8, 16, 15, 200]).unwrap();
        let out = unpack().unpack(&raw).unwrap();
        let v = out.values.as_slice().unwrap();
        assert_eq!(v[0], FILL);
        assert_eq!(v[1], FILL);
        assert!(v[2] > 0.0);
        assert_eq!(v[3], FILL);
    }

    #[test]
    fn test_rejects_wide_input() {
        let raw = Buffer::from_shape_vec(&[2, 1], vec![1u16, 2]).unwrap();
        assert!(unpack().unpack(&raw).is_err());
    }
}
