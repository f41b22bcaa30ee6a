//! The transcoding engine: reading, writing, naming and dimensions.

mod context;
mod dimension;
mod names;
mod reader;
mod writer;

pub use context::Context;
pub use dimension::{
    DimensionHandle, DimensionKind, DimensionRegistry, DimensionValues, PURE_DIMENSION_LABEL,
};
pub use names::correct_name;
pub use reader::{describe_dataset, object_name, read_dataset, DatasetBuffer, DatasetDescriptor};
pub use writer::{write_dataset, DatasetHandle, WriteOptions, MAX_COMPRESSION_LEVEL};
