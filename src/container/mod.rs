//! Container access.
//!
//! The engine never talks to a file format directly. It reads through
//! [`Source`] and writes through [`Destination`]; the in-memory backend models
//! the dimension-scale conventions of the output format and the netCDF
//! backend maps them onto real files.

mod memory;
mod nc;

pub use memory::{MemoryDataset, MemoryDestination, MemoryObject, MemorySource};
pub use nc::{NcDestination, NcSource};

use crate::error::Result;
use crate::types::Buffer;
use std::ops::Range;

/// Shape and number type of a source object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    /// Number of axes.
    pub rank: usize,
    /// Extent of every axis.
    pub dims: Vec<usize>,
    /// Source number-type tag.
    pub tag: i32,
}

/// One named axis of a source object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDimension {
    /// Dimension name as stored in the source.
    pub name: String,
    /// Extent of the axis.
    pub len: usize,
    /// Whether the source stores scale values for this axis.
    pub has_scale: bool,
}

/// An attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// A string.
    Text(String),
    /// One or more numbers, always 1-D.
    Numbers(Buffer),
}

impl AttrValue {
    /// Build a numeric attribute from a vector.
    pub fn numbers<T: crate::types::Element>(values: Vec<T>) -> Self {
        Self::Numbers(Buffer::from_array(
            ndarray::Array1::from(values).into_dyn(),
        ))
    }

    /// The text, if this is a string attribute.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Numbers(_) => None,
        }
    }

    /// The values widened to `f64`, if this is a numeric attribute.
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        match self {
            Self::Text(_) => None,
            Self::Numbers(b) => Some(b.to_f64_vec()),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// Identifier of an object created in a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub usize);

/// Storage layout of a new dataset.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Layout {
    /// Chunk shape, or `None` for contiguous storage.
    pub chunk: Option<Vec<usize>>,
    /// Deflate level, 0 meaning uncompressed.
    pub compression_level: u8,
}

/// Contents of a new dimension scale.
#[derive(Debug, Clone, Copy)]
pub enum ScaleValues<'a> {
    /// A labeled dimension with one value per index.
    Values(&'a Buffer),
    /// A length-only dimension identified by its label attribute.
    Pure {
        /// Value of the label attribute.
        label: &'a str,
    },
}

/// Where an attribute is written.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    /// A group, by absolute path.
    Group(&'a str),
    /// A dataset or scale created earlier.
    Object(ObjectId),
}

/// Read-only access to a source container.
pub trait Source {
    /// Shape and number type of the object at `path`.
    fn describe(&self, path: &str) -> Result<SourceInfo>;

    /// Read the full object, or only `rows` along axis 0.
    fn read(&self, path: &str, rows: Option<Range<usize>>) -> Result<Buffer>;

    /// Named axes of the object at `path`.
    fn dimensions(&self, path: &str) -> Result<Vec<SourceDimension>>;

    /// Scale values of one axis, if the source stores any.
    fn read_scale(&self, path: &str, axis: usize) -> Result<Option<Buffer>>;

    /// One attribute of the object at `path`.
    fn attribute(&self, path: &str, name: &str) -> Result<Option<AttrValue>>;

    /// Names of every attribute of the object at `path`.
    fn attribute_names(&self, path: &str) -> Result<Vec<String>>;
}

/// Write access to a destination container.
///
/// Every call is an immediate mutation; there is no upsert and no rollback.
pub trait Destination {
    /// Create group `name` under `parent` and return its absolute path.
    fn create_group(&mut self, parent: &str, name: &str) -> Result<String>;

    /// Whether `group` already holds an object called `name`.
    fn contains(&self, group: &str, name: &str) -> bool;

    /// Create and fill a dataset.
    fn create_dataset(
        &mut self,
        group: &str,
        name: &str,
        data: &Buffer,
        layout: &Layout,
    ) -> Result<ObjectId>;

    /// Write an attribute on a group or object.
    fn set_attribute(&mut self, target: Target<'_>, name: &str, value: &AttrValue) -> Result<()>;

    /// Create a dimension scale of length `len` in the root group.
    fn create_scale(&mut self, name: &str, len: usize, values: ScaleValues<'_>) -> Result<ObjectId>;

    /// Attach a scale to one axis of a dataset.
    fn attach_scale(&mut self, dataset: ObjectId, scale: ObjectId, axis: usize) -> Result<()>;

    /// Push everything written so far to storage.
    fn flush(&mut self) -> Result<()>;
}

/// Absolute path of `name` inside `group`.
pub fn join_path(group: &str, name: &str) -> String {
    let group = group.trim_end_matches('/');
    if group.is_empty() {
        format!("/{}", name)
    } else {
        format!("{}/{}", group, name)
    }
}
