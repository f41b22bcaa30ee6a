//! terra-repack - repackage Terra instrument granules into netCDF-4/HDF5.
//!
//! The crate is the transcoding engine underneath the instrument drivers. It
//! reads named datasets from a source container, optionally decodes packed
//! integers into physical values, writes them to a destination container and
//! attaches shared dimension scales.
//!
//! # Features
//!
//! - Source number types bridged to portable destination types
//! - Whole-dataset or row-range copies with per-dataset chunking and deflate
//! - One shared dimension scale per name, created lazily
//! - Linear, quality-flag, exponential-uncertainty and geometry decoders
//! - Leap-second aware TAI93 to UTC conversion and orbit-window subsetting
//!
//! # Example
//!
//! ```ignore
//! use terra_repack::container::{NcDestination, NcSource};
//! use terra_repack::engine::{Context, WriteOptions};
//! use terra_repack::transcode::{copy_dataset, copy_dimensions, DimensionOptions};
//! use std::path::Path;
//!
//! let radiances = "/HDFEOS/SWATHS/MOP01/Data Fields/MOPITTRadiances";
//! let source = NcSource::open(Path::new("MOP01-20200101.h5"))?;
//! let dest = NcDestination::create(Path::new("out.h5"))?;
//! let mut ctx = Context::create(dest, WriteOptions::default())?;
//! let handle = copy_dataset(&mut ctx, &source, radiances, "/")?;
//! copy_dimensions(&mut ctx, &source, radiances, &handle, &DimensionOptions::default())?;
//! ctx.close()?.close()?;
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]
#![deny(unsafe_code)]

pub mod config;
pub mod container;
pub mod decode;
pub mod engine;
pub mod error;
pub mod time;
pub mod transcode;
pub mod types;

pub use config::TranscodeConfig;
pub use error::{RepackError, Result};
