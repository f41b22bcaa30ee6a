//! The run context: one output container and everything shared across it.

use super::dimension::{DimensionHandle, DimensionRegistry, DimensionValues};
use super::writer::{write_dataset, DatasetHandle, WriteOptions};
use crate::container::{Destination, Target};
use crate::error::Result;
use crate::types::Buffer;
use tracing::info;

/// Owns the destination, its dimension registry and the write options.
///
/// Create one per output file and finish it with [`Context::close`]. A
/// context dropped without closing still releases the destination, but
/// skips the attachment check and the final flush.
#[derive(Debug)]
pub struct Context<D: Destination> {
    dest: D,
    registry: DimensionRegistry,
    options: WriteOptions,
}

impl<D: Destination> Context<D> {
    /// Wrap a freshly created destination.
    pub fn create(dest: D, options: WriteOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            dest,
            registry: DimensionRegistry::new(),
            options,
        })
    }

    /// The destination.
    pub fn destination(&self) -> &D {
        &self.dest
    }

    /// The destination, mutably.
    pub fn destination_mut(&mut self) -> &mut D {
        &mut self.dest
    }

    /// The dimension registry.
    pub fn registry(&self) -> &DimensionRegistry {
        &self.registry
    }

    /// Write options applied to every dataset.
    pub fn options(&self) -> &WriteOptions {
        &self.options
    }

    /// Write a dataset with the context's options.
    pub fn write(&mut self, group: &str, raw_name: &str, buffer: &Buffer) -> Result<DatasetHandle> {
        write_dataset(&mut self.dest, group, raw_name, buffer, &self.options)
    }

    /// Return dimension `name`, creating it on first use.
    pub fn dimension<F>(&mut self, name: &str, length: usize, values: F) -> Result<DimensionHandle>
    where
        F: FnOnce() -> Result<DimensionValues>,
    {
        self.registry
            .get_or_create(&mut self.dest, name, length, values)
    }

    /// Bind `axis` of `dataset` to `dim`.
    pub fn attach(
        &mut self,
        dataset: &DatasetHandle,
        dim: &DimensionHandle,
        axis: usize,
    ) -> Result<()> {
        self.registry.attach(&mut self.dest, dataset, dim, axis)
    }

    /// Write a text attribute on a group or object.
    pub fn set_text(&mut self, target: Target<'_>, name: &str, value: &str) -> Result<()> {
        self.dest.set_attribute(target, name, &value.into())
    }

    /// Verify dimension attachments, flush and hand the destination back.
    pub fn close(mut self) -> Result<D> {
        self.registry.verify_all()?;
        self.dest.flush()?;
        info!("Closed output with {} dimensions", self.registry.len());
        Ok(self.dest)
    }
}
