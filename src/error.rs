//! Error types for terra-repack.
//!
//! This module provides a unified error handling approach using `thiserror`.
//! Every engine operation returns [`Result`]; apart from the two non-fatal
//! variants (see [`RepackError::is_fatal`]) any error aborts the run.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for terra-repack operations.
pub type Result<T> = std::result::Result<T, RepackError>;

/// Errors that can occur while transcoding a granule.
#[derive(Debug, Error)]
pub enum RepackError {
    /// Failed to open or create a container.
    #[error("Failed to open container: {path}: {reason}")]
    ContainerOpen { path: PathBuf, reason: String },

    /// A named object does not exist in the container.
    #[error("Object not found: {path}")]
    NameNotFound { path: String },

    /// A number type outside the supported set.
    #[error("Unsupported number type: {0}")]
    TypeUnsupported(String),

    /// Reading from the source container failed.
    #[error("Failed to read {path}: {reason}")]
    ReadIo { path: String, reason: String },

    /// Writing to the destination container failed.
    #[error("Failed to write {path}: {reason}")]
    WriteIo { path: String, reason: String },

    /// An object with the same name already exists in the group.
    #[error("Object already exists: {path}")]
    DuplicateName { path: String },

    /// Dimension attachments do not agree with the dataset shape.
    #[error("Dimension mismatch on {dataset}: {reason}")]
    DimensionMismatch { dataset: String, reason: String },

    /// The subsetting window does not intersect the granule.
    #[error("Granule does not overlap the subsetting window")]
    SubsettingNoOverlap,

    /// A TAI93 day lies outside the leap-second table.
    #[error("No leap-second offset known for TAI93 day {day}")]
    UnknownCalendarOffset { day: i64 },

    /// Invalid write or transcode options.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// Calibration parameters do not match the data they apply to.
    #[error("Calibration mismatch for {path}: {reason}")]
    CalibrationMismatch { path: String, reason: String },

    /// Error reported by the netCDF library.
    #[error("NetCDF error: {0}")]
    NetCdf(String),
}

impl RepackError {
    /// Create a ContainerOpen error.
    pub fn container_open(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ContainerOpen {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a NameNotFound error.
    pub fn name_not_found(path: impl Into<String>) -> Self {
        Self::NameNotFound { path: path.into() }
    }

    /// Create a ReadIo error.
    pub fn read_io(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::ReadIo {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a WriteIo error.
    pub fn write_io(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::WriteIo {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a DuplicateName error.
    pub fn duplicate_name(path: impl Into<String>) -> Self {
        Self::DuplicateName { path: path.into() }
    }

    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch(dataset: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DimensionMismatch {
            dataset: dataset.into(),
            reason: reason.into(),
        }
    }

    /// Create a CalibrationMismatch error.
    pub fn calibration_mismatch(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CalibrationMismatch {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error must abort the run.
    ///
    /// A granule outside the subsetting window is skipped and an unknown
    /// calendar offset only warns; everything else is fatal.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::SubsettingNoOverlap | Self::UnknownCalendarOffset { .. }
        )
    }
}

impl From<netcdf::Error> for RepackError {
    fn from(err: netcdf::Error) -> Self {
        Self::NetCdf(err.to_string())
    }
}
