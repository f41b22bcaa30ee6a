//! Writing buffers as new destination datasets.

use super::names::correct_name;
use crate::container::{join_path, Destination, Layout, ObjectId};
use crate::error::{RepackError, Result};
use crate::types::Buffer;
use tracing::debug;

/// Highest deflate level accepted.
pub const MAX_COMPRESSION_LEVEL: u8 = 9;

/// Storage options for new datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteOptions {
    /// Store every dataset as one chunk spanning its full shape.
    pub chunked: bool,
    /// Deflate level, 0 to 9. Non-zero needs `chunked`.
    pub compression_level: u8,
}

impl WriteOptions {
    /// Check the option combination.
    pub fn validate(&self) -> Result<()> {
        if self.compression_level > MAX_COMPRESSION_LEVEL {
            return Err(RepackError::InvalidOptions(format!(
                "compression level {} is outside 0..={}",
                self.compression_level, MAX_COMPRESSION_LEVEL
            )));
        }
        if self.compression_level > 0 && !self.chunked {
            return Err(RepackError::InvalidOptions(
                "compression requires chunked storage".to_string(),
            ));
        }
        Ok(())
    }

    /// Layout of a dataset of the given shape.
    pub fn layout(&self, shape: &[usize]) -> Layout {
        Layout {
            chunk: (self.chunked && !shape.is_empty()).then(|| shape.to_vec()),
            compression_level: self.compression_level,
        }
    }
}

/// A dataset created by [`write_dataset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DatasetHandle {
    /// Object id in the destination.
    pub id: ObjectId,
    /// Number of axes.
    pub rank: usize,
}

/// Create dataset `raw_name` (sanitized) in `group` holding `buffer`.
pub fn write_dataset<D: Destination + ?Sized>(
    dest: &mut D,
    group: &str,
    raw_name: &str,
    buffer: &Buffer,
    options: &WriteOptions,
) -> Result<DatasetHandle> {
    options.validate()?;
    let name = correct_name(raw_name);
    if dest.contains(group, &name) {
        return Err(RepackError::duplicate_name(join_path(group, &name)));
    }
    let layout = options.layout(buffer.shape());
    let id = dest.create_dataset(group, &name, buffer, &layout)?;
    debug!(
        "Wrote {} {:?} ({})",
        join_path(group, &name),
        buffer.shape(),
        buffer.dest_type()
    );
    Ok(DatasetHandle {
        id,
        rank: buffer.rank(),
    })
}
