//! Unpacking of packed integer science data into physical values.
//!
//! Every decoder reads a raw [`Buffer`](crate::types::Buffer) and returns a
//! new `f32` array of the same shape. Reserved raw codes map to fixed values
//! no matter what the calibration says.

mod calibration;
mod geometry;
mod linear;
mod quality;
pub mod tables;
mod uncertainty;

pub use calibration::{
    calibration_from_attributes, scale_from_attribute, CalibrationParameters, SentinelLadder,
    SentinelMap,
};
pub use geometry::GeometryScaleUnpack;
pub use linear::LinearUnpack;
pub use quality::{quality_output_name, QualityFlagUnpack};
pub use uncertainty::ExponentialUncertaintyUnpack;

use crate::error::{RepackError, Result};
use crate::types::Buffer;
use ndarray::ArrayD;

/// Decoded values plus the quality side channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Unpacked {
    /// Physical values, same shape as the input.
    pub values: ArrayD<f32>,
    /// Row-major flat indices of low-accuracy elements.
    pub low_accuracy: Vec<i32>,
}

impl Unpacked {
    fn values(values: ArrayD<f32>) -> Self {
        Self {
            values,
            low_accuracy: Vec::new(),
        }
    }
}

/// A transform from raw packed values to physical values.
pub trait Unpack {
    /// Decode `raw` without modifying it.
    fn unpack(&self, raw: &Buffer) -> Result<Unpacked>;
}

/// Apply `f(band, raw)` to every element, with the band taken from axis 0.
fn per_band<T: Copy>(raw: &ArrayD<T>, f: impl Fn(usize, T) -> f32) -> ArrayD<f32> {
    if raw.ndim() == 0 {
        return raw.mapv(|v| f(0, v));
    }
    // `Zip::indexed` needs a `Copy` dimension, which `IxDyn` is not.
    let mut out = raw.mapv(|_| 0.0f32);
    for ((index, o), &v) in out.indexed_iter_mut().zip(raw.iter()) {
        *o = f(index[0], v);
    }
    out
}

fn unsupported(decoder: &str, raw: &Buffer) -> RepackError {
    RepackError::TypeUnsupported(format!("{} cannot decode {}", decoder, raw.dest_type()))
}
