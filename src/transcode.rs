//! Transcode operations: read, optionally decode, write, attach.
//!
//! These are the building blocks the per-instrument drivers are made of.
//! Each one reads from a [`Source`] and writes through a [`Context`].

use crate::container::{Destination, Source, SourceDimension, Target};
use crate::decode::tables::{geometry, misr, modis};
use crate::decode::{
    calibration_from_attributes, quality_output_name, scale_from_attribute,
    ExponentialUncertaintyUnpack, GeometryScaleUnpack, LinearUnpack, QualityFlagUnpack, Unpack,
    Unpacked,
};
use crate::engine::{
    correct_name, describe_dataset, object_name, read_dataset, Context, DatasetHandle,
    DimensionHandle, DimensionValues,
};
use crate::error::{RepackError, Result};
use crate::time::{subset, CalendarConverter, OrbitWindow, SubsettingBounds};
use crate::types::{Buffer, DestType};
use ndarray::Array1;
use std::ops::Range;
use tracing::info;

/// Units of converted time datasets.
pub const TIME_UNITS: &str = "seconds since 1993-01-01 00:00:00 UTC";

/// One of the unpacking transforms.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoder {
    /// Per-band linear scaling.
    Linear(LinearUnpack),
    /// Radiance with quality bits.
    QualityFlag(QualityFlagUnpack),
    /// Exponential uncertainty index.
    Uncertainty(ExponentialUncertaintyUnpack),
    /// Fixed-scale geometry angles.
    Geometry(GeometryScaleUnpack),
}

impl Decoder {
    /// Output name of the dataset at `path`, before sanitizing.
    pub fn output_name(&self, path: &str) -> Result<String> {
        match self {
            Self::QualityFlag(_) => quality_output_name(path),
            _ => Ok(object_name(path).to_string()),
        }
    }
}

impl Unpack for Decoder {
    fn unpack(&self, raw: &Buffer) -> Result<Unpacked> {
        match self {
            Self::Linear(d) => d.unpack(raw),
            Self::QualityFlag(d) => d.unpack(raw),
            Self::Uncertainty(d) => d.unpack(raw),
            Self::Geometry(d) => d.unpack(raw),
        }
    }
}

/// Pick a decoder for `path` from its name and calibration attributes.
///
/// Signed 16-bit angles with a `scale_factor` become geometry. Returns
/// `None` for datasets that should be copied raw.
pub fn detect_decoder<S: Source + ?Sized>(source: &S, path: &str) -> Result<Option<Decoder>> {
    if path.ends_with(misr::RDQI_SUFFIX) {
        let scale = scale_from_attribute(source, path, misr::SCALE_ATTRIBUTE)?;
        return Ok(Some(Decoder::QualityFlag(QualityFlagUnpack::new(scale)?)));
    }
    let names = source.attribute_names(path)?;
    let has = |attr: &str| names.iter().any(|n| n == attr);
    if has(modis::RADIANCE_SCALES) {
        let calibration = calibration_from_attributes(
            source,
            path,
            modis::RADIANCE_SCALES,
            modis::RADIANCE_OFFSETS,
            modis::radiance_calibration(),
        )?;
        return Ok(Some(Decoder::Linear(LinearUnpack::new(calibration))));
    }
    if has(modis::UNCERTAINTY_SCALING) {
        let calibration = calibration_from_attributes(
            source,
            path,
            modis::UNCERTAINTY_SCALING,
            modis::UNCERTAINTY_SPECIFIED,
            modis::uncertainty_calibration(),
        )?;
        return Ok(Some(Decoder::Uncertainty(ExponentialUncertaintyUnpack::new(
            calibration,
        ))));
    }
    if has(geometry::SCALE_ATTRIBUTE)
        && describe_dataset(source, path)?.element_type == DestType::Int16
    {
        let scale = scale_from_attribute(source, path, geometry::SCALE_ATTRIBUTE)?;
        return Ok(Some(Decoder::Geometry(GeometryScaleUnpack {
            scale,
            ..Default::default()
        })));
    }
    Ok(None)
}

/// How [`copy_dimensions`] names and fills the dimensions it creates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DimensionOptions {
    /// Appended to every source dimension name.
    pub suffix: Option<String>,
    /// Rows of axis 0 that were copied, when the dataset was subset.
    pub subset: Option<SubsettingBounds>,
    /// Use the literal MODIS band numbers for band dimensions.
    pub band_tables: bool,
}

/// Copy the dataset at `path` into `group` unchanged.
pub fn copy_dataset<D, S>(
    ctx: &mut Context<D>,
    source: &S,
    path: &str,
    group: &str,
) -> Result<DatasetHandle>
where
    D: Destination,
    S: Source + ?Sized,
{
    let read = read_dataset(source, path, None)?;
    let handle = ctx.write(group, &read.descriptor.corrected_name, &read.buffer)?;
    info!("Copied {} into {}", path, group);
    Ok(handle)
}

/// Copy only the rows in `bounds`.
///
/// Returns `Ok(None)` and writes nothing when the bounds do not overlap
/// the dataset.
pub fn copy_dataset_subset<D, S>(
    ctx: &mut Context<D>,
    source: &S,
    path: &str,
    group: &str,
    bounds: SubsettingBounds,
) -> Result<Option<DatasetHandle>>
where
    D: Destination,
    S: Source + ?Sized,
{
    let read = match read_dataset(source, path, Some(bounds)) {
        Ok(read) => read,
        Err(err) if !err.is_fatal() => {
            info!("Skipping {}: {}", path, err);
            return Ok(None);
        }
        Err(err) => return Err(err),
    };
    let handle = ctx.write(group, &read.descriptor.corrected_name, &read.buffer)?;
    info!("Copied {} rows of {} into {}", bounds.len(), path, group);
    Ok(Some(handle))
}

/// Rows of the time dataset at `time_path` inside `window`.
pub fn window_bounds<S: Source + ?Sized>(
    source: &S,
    time_path: &str,
    window: &OrbitWindow,
    converter: &CalendarConverter,
) -> Result<SubsettingBounds> {
    let times = read_dataset(source, time_path, None)?.buffer.to_f64_vec();
    let (start, end) = window.tai93_bounds(converter);
    Ok(subset(&times, start, end))
}

/// Decode the dataset at `path` and write the physical values into `group`.
///
/// Quality-flagged fields with low-accuracy elements also get a
/// `<name>_low_accuracy_pos` dataset listing their flat positions.
pub fn unpack_dataset<D, S>(
    ctx: &mut Context<D>,
    source: &S,
    path: &str,
    group: &str,
    decoder: &Decoder,
) -> Result<DatasetHandle>
where
    D: Destination,
    S: Source + ?Sized,
{
    let name = decoder.output_name(path)?;
    let read = read_dataset(source, path, None)?;
    let unpacked = decoder.unpack(&read.buffer).map_err(|err| match err {
        RepackError::CalibrationMismatch { reason, .. } => {
            RepackError::calibration_mismatch(path, reason)
        }
        other => other,
    })?;
    let handle = ctx.write(group, &name, &Buffer::from_array(unpacked.values))?;
    if !unpacked.low_accuracy.is_empty() {
        let count = unpacked.low_accuracy.len();
        let positions = Buffer::from_array(Array1::from(unpacked.low_accuracy).into_dyn());
        ctx.write(
            group,
            &format!("{}{}", name, misr::LOW_ACCURACY_SUFFIX),
            &positions,
        )?;
        info!("{} has {} low-accuracy values", path, count);
    }
    info!("Unpacked {} into {}", path, group);
    Ok(handle)
}

fn dimension_values<S: Source + ?Sized>(
    source: &S,
    path: &str,
    axis: usize,
    dim: &SourceDimension,
    rows: Option<Range<usize>>,
    length: usize,
    band_tables: bool,
) -> Result<DimensionValues> {
    if band_tables {
        if let Some(table) = modis::band_table(&dim.name).filter(|t| t.len() == length) {
            let values = Array1::from(table.to_vec()).into_dyn();
            return Ok(DimensionValues::Labeled(Buffer::from_array(values)));
        }
    }
    if !dim.has_scale {
        return Ok(DimensionValues::Pure);
    }
    let values = match source.read_scale(path, axis)? {
        Some(values) => values,
        None => return Ok(DimensionValues::Pure),
    };
    let values = match rows {
        Some(rows) if rows.start < rows.end && rows.end <= values.len() => {
            values.rows(rows.start, rows.end - 1)
        }
        Some(rows) => {
            return Err(RepackError::read_io(
                path,
                format!("scale of axis {} is shorter than rows {:?}", axis, rows),
            ))
        }
        None => values,
    };
    Ok(DimensionValues::Labeled(values))
}

/// Attach the source dimensions of `path` to the copied `dataset`.
///
/// Dimensions are created on first use and shared by name afterwards.
pub fn copy_dimensions<D, S>(
    ctx: &mut Context<D>,
    source: &S,
    path: &str,
    dataset: &DatasetHandle,
    options: &DimensionOptions,
) -> Result<Vec<DimensionHandle>>
where
    D: Destination,
    S: Source + ?Sized,
{
    if options.subset == Some(SubsettingBounds::NoOverlap) {
        return Err(RepackError::SubsettingNoOverlap);
    }
    let dims = source.dimensions(path)?;
    if dims.len() != dataset.rank {
        return Err(RepackError::dimension_mismatch(
            path,
            format!("{} source dimensions for rank {}", dims.len(), dataset.rank),
        ));
    }

    let mut handles = Vec::with_capacity(dims.len());
    for (axis, dim) in dims.iter().enumerate() {
        let rows = if axis == 0 {
            options.subset.and_then(|b| b.range())
        } else {
            None
        };
        let length = rows.as_ref().map_or(dim.len, |r| r.len());
        let name = match &options.suffix {
            Some(suffix) => format!("{}{}", dim.name, suffix),
            None => dim.name.clone(),
        };
        let handle = ctx.dimension(&name, length, || {
            dimension_values(source, path, axis, dim, rows, length, options.band_tables)
        })?;
        ctx.attach(dataset, &handle, axis)?;
        handles.push(handle);
    }
    Ok(handles)
}

/// Copy every attribute of `path` onto `target`. Returns how many.
pub fn copy_attributes<D, S>(
    ctx: &mut Context<D>,
    source: &S,
    path: &str,
    target: Target<'_>,
) -> Result<usize>
where
    D: Destination,
    S: Source + ?Sized,
{
    let mut copied = 0;
    for name in source.attribute_names(path)? {
        if let Some(value) = source.attribute(path, &name)? {
            ctx.destination_mut().set_attribute(target, &name, &value)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Convert a TAI93 time dataset to UTC seconds and write it into `group`.
pub fn convert_time_dataset<D, S>(
    ctx: &mut Context<D>,
    source: &S,
    path: &str,
    group: &str,
    converter: &CalendarConverter,
    subset: Option<SubsettingBounds>,
) -> Result<DatasetHandle>
where
    D: Destination,
    S: Source + ?Sized,
{
    let read = read_dataset(source, path, subset)?;
    let Buffer::Float64(mut times) = read.buffer else {
        return Err(RepackError::TypeUnsupported(format!(
            "time dataset {} is {}, expected float64",
            path, read.descriptor.element_type
        )));
    };
    match times.as_slice_mut() {
        Some(values) => converter.convert_buffer(values),
        None => times.mapv_inplace(|t| converter.to_utc(t)),
    }
    let handle = ctx.write(group, &read.descriptor.corrected_name, &Buffer::from_array(times))?;
    ctx.set_text(Target::Object(handle.id), "units", TIME_UNITS)?;
    info!("Converted {} to UTC", path);
    Ok(handle)
}

/// Create group `name` (sanitized) under `parent`.
pub fn create_group<D: Destination>(
    ctx: &mut Context<D>,
    parent: &str,
    name: &str,
) -> Result<String> {
    ctx.destination_mut().create_group(parent, &correct_name(name))
}

/// Write a text attribute on a group or dataset.
pub fn set_string_attribute<D: Destination>(
    ctx: &mut Context<D>,
    target: Target<'_>,
    name: &str,
    value: &str,
) -> Result<()> {
    ctx.set_text(target, name, value)
}
