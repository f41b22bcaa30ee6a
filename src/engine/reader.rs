//! Reading whole datasets, or a row range of one, into typed buffers.

use super::names::correct_name;
use crate::container::Source;
use crate::error::{RepackError, Result};
use crate::time::SubsettingBounds;
use crate::types::{map_type, Buffer, DestType};
use tracing::debug;

/// What a source dataset is and what it will be called in the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetDescriptor {
    /// Path in the source container.
    pub source_path: String,
    /// Sanitized output name.
    pub corrected_name: String,
    /// Number of axes.
    pub rank: usize,
    /// Extent of every axis.
    pub dims: Vec<usize>,
    /// Element type in the destination.
    pub element_type: DestType,
}

/// A dataset read into memory with its descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetBuffer {
    /// The descriptor, with `dims` as read.
    pub descriptor: DatasetDescriptor,
    /// The data.
    pub buffer: Buffer,
}

/// Last component of a source path.
pub fn object_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Describe the dataset at `path` without reading it.
pub fn describe_dataset<S: Source + ?Sized>(source: &S, path: &str) -> Result<DatasetDescriptor> {
    let info = source.describe(path)?;
    let element_type = map_type(info.tag)?;
    Ok(DatasetDescriptor {
        source_path: path.to_string(),
        corrected_name: correct_name(object_name(path)),
        rank: info.rank,
        dims: info.dims,
        element_type,
    })
}

/// Read the dataset at `path`, optionally only the rows in `subset`.
pub fn read_dataset<S: Source + ?Sized>(
    source: &S,
    path: &str,
    subset: Option<SubsettingBounds>,
) -> Result<DatasetBuffer> {
    let mut descriptor = describe_dataset(source, path)?;

    let rows = match subset {
        None => None,
        Some(SubsettingBounds::NoOverlap) => return Err(RepackError::SubsettingNoOverlap),
        Some(SubsettingBounds::Rows { start, end }) => {
            let extent = descriptor.dims.first().copied().unwrap_or(0);
            if start > end || end >= extent {
                return Err(RepackError::read_io(
                    path,
                    format!("rows {}..={} outside axis of length {}", start, end, extent),
                ));
            }
            descriptor.dims[0] = end - start + 1;
            Some(start..end + 1)
        }
    };

    let raw = source.read(path, rows)?;
    if raw.shape() != descriptor.dims.as_slice() {
        return Err(RepackError::read_io(
            path,
            format!("read shape {:?}, expected {:?}", raw.shape(), descriptor.dims),
        ));
    }
    let read_type = raw.dest_type();
    let buffer = raw.with_dest_type(descriptor.element_type).ok_or_else(|| {
        RepackError::read_io(
            path,
            format!("read {}, expected {}", read_type, descriptor.element_type),
        )
    })?;

    debug!(
        "Read {} {:?} ({})",
        path, descriptor.dims, descriptor.element_type
    );
    Ok(DatasetBuffer { descriptor, buffer })
}
