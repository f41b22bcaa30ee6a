//! Calibration parameters and reserved raw codes.

use crate::container::Source;
use crate::error::{RepackError, Result};
use tracing::debug;

/// A run of reserved codes counting down from `top`.
///
/// Code `top - k` maps to `base + k`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentinelLadder {
    /// Highest reserved code.
    pub top: u32,
    /// Lowest reserved code.
    pub bottom: u32,
    /// Value of `top`.
    pub base: f32,
}

/// Raw codes that bypass the unpacking formula.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SentinelMap {
    codes: Vec<(u32, f32)>,
    ladder: Option<SentinelLadder>,
}

impl SentinelMap {
    /// A map without reserved codes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve one code.
    pub fn with_code(mut self, raw: u32, value: f32) -> Self {
        self.codes.push((raw, value));
        self
    }

    /// Reserve `bottom..=top`.
    pub fn with_ladder(mut self, top: u32, bottom: u32, base: f32) -> Self {
        self.ladder = Some(SentinelLadder { top, bottom, base });
        self
    }

    /// The fixed value of `raw`, if it is reserved.
    pub fn lookup(&self, raw: u32) -> Option<f32> {
        if let Some(&(_, value)) = self.codes.iter().find(|(code, _)| *code == raw) {
            return Some(value);
        }
        match self.ladder {
            Some(l) if (l.bottom..=l.top).contains(&raw) => Some(l.base + (l.top - raw) as f32),
            _ => None,
        }
    }
}

/// Per-band unpacking parameters of one dataset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CalibrationParameters {
    /// Scale per band, or one scale for every band.
    pub scales: Vec<f32>,
    /// Offset (or specified uncertainty) per band, matching `scales`.
    pub offsets: Vec<f32>,
    /// Reserved raw codes.
    pub sentinels: SentinelMap,
    /// Raw values outside this inclusive range are fill.
    pub valid_range: Option<(u32, u32)>,
    /// Apply a single scale/offset pair to every band.
    pub broadcast: bool,
}

impl CalibrationParameters {
    /// Check the parameters against the shape of the data they unpack.
    ///
    /// There must be one value per index of axis 0, unless the parameters
    /// broadcast a single pair to every band.
    pub fn check_bands(&self, path: &str, shape: &[usize]) -> Result<()> {
        if self.scales.is_empty() {
            return Err(RepackError::calibration_mismatch(path, "no calibration values"));
        }
        if self.scales.len() != self.offsets.len() {
            return Err(RepackError::calibration_mismatch(
                path,
                format!(
                    "{} scales but {} offsets",
                    self.scales.len(),
                    self.offsets.len()
                ),
            ));
        }
        let bands = shape.first().copied().unwrap_or(1);
        let broadcast = self.broadcast && self.scales.len() == 1;
        if !broadcast && self.scales.len() != bands {
            return Err(RepackError::calibration_mismatch(
                path,
                format!("{} values for {} bands", self.scales.len(), bands),
            ));
        }
        Ok(())
    }

    /// Scale and offset of band `band`.
    pub fn band(&self, band: usize) -> (f32, f32) {
        let i = if self.broadcast { 0 } else { band };
        (self.scales[i], self.offsets[i])
    }

    /// Whether `raw` lies inside the valid range.
    pub fn is_valid(&self, raw: u32) -> bool {
        self.valid_range
            .map_or(true, |(min, max)| (min..=max).contains(&raw))
    }
}

fn read_f32s<S: Source + ?Sized>(source: &S, path: &str, name: &str) -> Result<Option<Vec<f32>>> {
    match source.attribute(path, name)? {
        None => Ok(None),
        Some(value) => value
            .to_f64_vec()
            .map(|v| Some(v.into_iter().map(|x| x as f32).collect()))
            .ok_or_else(|| {
                RepackError::calibration_mismatch(
                    path,
                    format!("attribute {} is not numeric", name),
                )
            }),
    }
}

/// Read per-band scales and offsets from attributes of `path`.
///
/// When neither attribute exists the values of `fallback` are kept. The
/// sentinels and valid range always come from `fallback`.
pub fn calibration_from_attributes<S: Source + ?Sized>(
    source: &S,
    path: &str,
    scale_attr: &str,
    offset_attr: &str,
    fallback: CalibrationParameters,
) -> Result<CalibrationParameters> {
    let mut params = fallback;
    match (
        read_f32s(source, path, scale_attr)?,
        read_f32s(source, path, offset_attr)?,
    ) {
        (Some(scales), Some(offsets)) => {
            params.scales = scales;
            params.offsets = offsets;
        }
        (None, None) => debug!("No {} on {}, using defaults", scale_attr, path),
        _ => {
            return Err(RepackError::calibration_mismatch(
                path,
                format!("{} and {} must both be present", scale_attr, offset_attr),
            ))
        }
    }
    let info = source.describe(path)?;
    params.check_bands(path, &info.dims)?;
    Ok(params)
}

/// Read a single non-negative scale from attribute `name` of `path`.
pub fn scale_from_attribute<S: Source + ?Sized>(source: &S, path: &str, name: &str) -> Result<f32> {
    let values = read_f32s(source, path, name)?
        .ok_or_else(|| RepackError::calibration_mismatch(path, format!("no attribute {}", name)))?;
    match values.as_slice() {
        [scale] if *scale >= 0.0 => Ok(*scale),
        [scale] => Err(RepackError::calibration_mismatch(
            path,
            format!("negative scale {}", scale),
        )),
        _ => Err(RepackError::calibration_mismatch(
            path,
            format!("{} holds {} values, expected 1", name, values.len()),
        )),
    }
}
