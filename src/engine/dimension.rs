//! Shared dimension scales.
//!
//! Every dimension name maps to exactly one scale object in the output,
//! created the first time any dataset asks for it. Datasets then bind each
//! of their axes to one registered dimension.

use super::names::correct_name;
use super::writer::DatasetHandle;
use crate::container::{Destination, ObjectId, ScaleValues};
use crate::error::{RepackError, Result};
use crate::types::Buffer;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Label carried by dimensions that have a length but no values.
pub const PURE_DIMENSION_LABEL: &str = "This is a netCDF dimension but not a netCDF variable.";

/// Whether a dimension stores values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionKind {
    /// One value per index.
    Labeled,
    /// Length only.
    Pure,
}

/// Contents of a dimension being created.
#[derive(Debug, Clone, PartialEq)]
pub enum DimensionValues {
    /// Scale values, either copied from the source or from a literal table.
    Labeled(Buffer),
    /// No values; the scale carries [`PURE_DIMENSION_LABEL`].
    Pure,
}

impl DimensionValues {
    fn kind(&self) -> DimensionKind {
        match self {
            Self::Labeled(_) => DimensionKind::Labeled,
            Self::Pure => DimensionKind::Pure,
        }
    }
}

/// A registered dimension. Cheap to clone, owns no output resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionHandle {
    /// Name of the scale in the output.
    pub name: String,
    /// Number of indices.
    pub length: usize,
    /// Labeled or pure.
    pub kind: DimensionKind,
    index: usize,
}

#[derive(Debug)]
struct DimensionEntry {
    name: String,
    length: usize,
    kind: DimensionKind,
    object: ObjectId,
}

/// Arena of the dimensions created in one output container.
#[derive(Debug, Default)]
pub struct DimensionRegistry {
    entries: Vec<DimensionEntry>,
    by_name: HashMap<String, usize>,
    bindings: BTreeMap<ObjectId, Vec<Option<usize>>>,
}

impl DimensionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of dimensions created.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no dimension was created yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The handle of an existing dimension.
    pub fn get(&self, name: &str) -> Option<DimensionHandle> {
        self.by_name
            .get(&correct_name(name))
            .map(|&index| self.handle(index))
    }

    fn handle(&self, index: usize) -> DimensionHandle {
        let entry = &self.entries[index];
        DimensionHandle {
            name: entry.name.clone(),
            length: entry.length,
            kind: entry.kind,
            index,
        }
    }

    /// Return dimension `name`, creating its scale on first use.
    ///
    /// `values` is only evaluated when the dimension is created. Asking
    /// again with a different `length` fails with
    /// [`RepackError::DimensionMismatch`].
    pub fn get_or_create<D, F>(
        &mut self,
        dest: &mut D,
        name: &str,
        length: usize,
        values: F,
    ) -> Result<DimensionHandle>
    where
        D: Destination + ?Sized,
        F: FnOnce() -> Result<DimensionValues>,
    {
        let name = correct_name(name);
        if let Some(&index) = self.by_name.get(&name) {
            let existing = self.entries[index].length;
            if existing != length {
                return Err(RepackError::dimension_mismatch(
                    &name,
                    format!("registered with length {}, requested {}", existing, length),
                ));
            }
            return Ok(self.handle(index));
        }

        let values = values()?;
        let object = match &values {
            DimensionValues::Labeled(buffer) => {
                if buffer.rank() != 1 || buffer.len() != length {
                    return Err(RepackError::dimension_mismatch(
                        &name,
                        format!("{:?} scale values for length {}", buffer.shape(), length),
                    ));
                }
                dest.create_scale(&name, length, ScaleValues::Values(buffer))?
            }
            DimensionValues::Pure => dest.create_scale(
                &name,
                length,
                ScaleValues::Pure {
                    label: PURE_DIMENSION_LABEL,
                },
            )?,
        };
        debug!("Created dimension {} ({}, {:?})", name, length, values.kind());

        let index = self.entries.len();
        self.entries.push(DimensionEntry {
            name: name.clone(),
            length,
            kind: values.kind(),
            object,
        });
        self.by_name.insert(name, index);
        Ok(self.handle(index))
    }

    /// Bind `axis` of `dataset` to `dim`.
    pub fn attach<D: Destination + ?Sized>(
        &mut self,
        dest: &mut D,
        dataset: &DatasetHandle,
        dim: &DimensionHandle,
        axis: usize,
    ) -> Result<()> {
        let label = format!("dataset #{}", dataset.id.0);
        if axis >= dataset.rank {
            return Err(RepackError::dimension_mismatch(
                label,
                format!("axis {} out of rank {}", axis, dataset.rank),
            ));
        }
        let entry = self.entries.get(dim.index).ok_or_else(|| {
            RepackError::dimension_mismatch(&label, format!("unknown dimension {}", dim.name))
        })?;
        let bound = self
            .bindings
            .entry(dataset.id)
            .or_insert_with(|| vec![None; dataset.rank]);
        if let Some(previous) = bound[axis] {
            return Err(RepackError::dimension_mismatch(
                label,
                format!(
                    "axis {} already bound to {}",
                    axis, self.entries[previous].name
                ),
            ));
        }
        dest.attach_scale(dataset.id, entry.object, axis)?;
        bound[axis] = Some(dim.index);
        Ok(())
    }

    /// Check that every axis of `dataset` is bound.
    pub fn verify_attached(&self, dataset: &DatasetHandle) -> Result<()> {
        let missing = match self.bindings.get(&dataset.id) {
            Some(bound) => bound.iter().filter(|b| b.is_none()).count(),
            None => dataset.rank,
        };
        if missing > 0 {
            return Err(RepackError::dimension_mismatch(
                format!("dataset #{}", dataset.id.0),
                format!("{} of {} axes have no dimension", missing, dataset.rank),
            ));
        }
        Ok(())
    }

    /// Check every dataset that has at least one bound axis.
    pub fn verify_all(&self) -> Result<()> {
        for (&id, bound) in &self.bindings {
            self.verify_attached(&DatasetHandle {
                id,
                rank: bound.len(),
            })?;
        }
        Ok(())
    }
}
