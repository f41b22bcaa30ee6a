//! In-memory containers.
//!
//! `MemoryDestination` keeps the same bookkeeping an HDF5 file does for
//! dimension scales (`CLASS`/`NAME` attributes, per-axis dimension lists and
//! back references), so tests can inspect exactly what a run produced.

use super::{
    join_path, AttrValue, Destination, Layout, ObjectId, ScaleValues, Source, SourceDimension,
    SourceInfo, Target,
};
use crate::error::{RepackError, Result};
use crate::types::{source_tag, Buffer};
use ndarray::{ArrayD, IxDyn};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;

/// One named array in a [`MemorySource`].
#[derive(Debug, Clone)]
pub struct MemoryObject {
    /// The stored data.
    pub data: Buffer,
    /// Number-type tag reported by `describe`.
    pub tag: i32,
    /// Named axes, one per rank.
    pub dimensions: Vec<SourceDimension>,
    /// Scale values per axis.
    pub scales: Vec<Option<Buffer>>,
    /// Attributes by name.
    pub attributes: BTreeMap<String, AttrValue>,
}

impl MemoryObject {
    /// Override the reported number-type tag.
    pub fn with_tag(&mut self, tag: i32) -> &mut Self {
        self.tag = tag;
        self
    }

    /// Name one axis and optionally give it scale values.
    ///
    /// # Panics
    ///
    /// Panics if `axis` is not below the rank of the stored data.
    pub fn with_dimension(&mut self, axis: usize, name: &str, scale: Option<Buffer>) -> &mut Self {
        let len = self.data.shape()[axis];
        self.dimensions[axis] = SourceDimension {
            name: name.to_string(),
            len,
            has_scale: scale.is_some(),
        };
        self.scales[axis] = scale;
        self
    }

    /// Add an attribute.
    pub fn with_attribute(&mut self, name: &str, value: AttrValue) -> &mut Self {
        self.attributes.insert(name.to_string(), value);
        self
    }
}

/// A source container held entirely in memory.
#[derive(Debug, Default)]
pub struct MemorySource {
    objects: HashMap<String, MemoryObject>,
    next_fake_dim: usize,
}

impl MemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` under `path`.
    ///
    /// Axes get unique `fakeDimN` names until renamed with
    /// [`MemoryObject::with_dimension`].
    pub fn insert(&mut self, path: &str, data: Buffer) -> &mut MemoryObject {
        let dimensions = data
            .shape()
            .iter()
            .map(|&len| {
                let name = format!("fakeDim{}", self.next_fake_dim);
                self.next_fake_dim += 1;
                SourceDimension {
                    name,
                    len,
                    has_scale: false,
                }
            })
            .collect();
        let object = MemoryObject {
            tag: source_tag(data.dest_type()),
            scales: vec![None; data.rank()],
            dimensions,
            attributes: BTreeMap::new(),
            data,
        };
        match self.objects.entry(path.to_string()) {
            Entry::Occupied(mut entry) => {
                entry.insert(object);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(object),
        }
    }

    fn object(&self, path: &str) -> Result<&MemoryObject> {
        self.objects
            .get(path)
            .ok_or_else(|| RepackError::name_not_found(path))
    }
}

impl Source for MemorySource {
    fn describe(&self, path: &str) -> Result<SourceInfo> {
        let object = self.object(path)?;
        Ok(SourceInfo {
            rank: object.data.rank(),
            dims: object.data.shape().to_vec(),
            tag: object.tag,
        })
    }

    fn read(&self, path: &str, rows: Option<Range<usize>>) -> Result<Buffer> {
        let object = self.object(path)?;
        match rows {
            None => Ok(object.data.clone()),
            Some(rows) => {
                let extent = object.data.shape().first().copied().unwrap_or(0);
                if rows.start >= rows.end || rows.end > extent {
                    return Err(RepackError::read_io(
                        path,
                        format!("rows {:?} outside axis of length {}", rows, extent),
                    ));
                }
                Ok(object.data.rows(rows.start, rows.end - 1))
            }
        }
    }

    fn dimensions(&self, path: &str) -> Result<Vec<SourceDimension>> {
        Ok(self.object(path)?.dimensions.clone())
    }

    fn read_scale(&self, path: &str, axis: usize) -> Result<Option<Buffer>> {
        let object = self.object(path)?;
        object
            .scales
            .get(axis)
            .cloned()
            .ok_or_else(|| RepackError::read_io(path, format!("no axis {}", axis)))
    }

    fn attribute(&self, path: &str, name: &str) -> Result<Option<AttrValue>> {
        Ok(self.object(path)?.attributes.get(name).cloned())
    }

    fn attribute_names(&self, path: &str) -> Result<Vec<String>> {
        Ok(self.object(path)?.attributes.keys().cloned().collect())
    }
}

/// A dataset or dimension scale inside a [`MemoryDestination`].
#[derive(Debug, Clone)]
pub struct MemoryDataset {
    /// Absolute path.
    pub path: String,
    /// Stored data.
    pub data: Buffer,
    /// Storage layout requested at creation.
    pub layout: Layout,
    /// Attributes by name.
    pub attributes: BTreeMap<String, AttrValue>,
    /// Scale attached to each axis.
    pub dimension_list: Vec<Option<ObjectId>>,
    /// Datasets and axes this scale is attached to.
    pub references: Vec<(ObjectId, usize)>,
    /// Whether this object is a dimension scale.
    pub is_scale: bool,
}

/// A destination container held entirely in memory.
#[derive(Debug)]
pub struct MemoryDestination {
    groups: BTreeMap<String, BTreeMap<String, AttrValue>>,
    objects: Vec<MemoryDataset>,
    index: HashMap<String, ObjectId>,
    flushes: usize,
}

impl Default for MemoryDestination {
    fn default() -> Self {
        let mut groups = BTreeMap::new();
        groups.insert("/".to_string(), BTreeMap::new());
        Self {
            groups,
            objects: Vec::new(),
            index: HashMap::new(),
            flushes: 0,
        }
    }
}

impl MemoryDestination {
    /// Create an empty destination holding only the root group.
    pub fn new() -> Self {
        Self::default()
    }

    /// The dataset or scale at `path`.
    pub fn dataset(&self, path: &str) -> Option<&MemoryDataset> {
        self.index.get(path).map(|id| &self.objects[id.0])
    }

    /// The dataset or scale with the given id.
    pub fn object(&self, id: ObjectId) -> Option<&MemoryDataset> {
        self.objects.get(id.0)
    }

    /// Number of datasets and scales created.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Paths of every dataset and scale, in creation order.
    pub fn paths(&self) -> Vec<&str> {
        self.objects.iter().map(|o| o.path.as_str()).collect()
    }

    /// Whether a group exists.
    pub fn has_group(&self, path: &str) -> bool {
        self.groups.contains_key(path)
    }

    /// One attribute of a group.
    pub fn group_attribute(&self, group: &str, name: &str) -> Option<&AttrValue> {
        self.groups.get(group).and_then(|attrs| attrs.get(name))
    }

    /// Names of the scales attached to each axis of the dataset at `path`.
    pub fn dimension_names(&self, path: &str) -> Vec<Option<String>> {
        self.dataset(path)
            .map(|d| {
                d.dimension_list
                    .iter()
                    .map(|scale| scale.map(|id| scale_name(&self.objects[id.0].path)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// How many times `flush` was called.
    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    fn check_free(&self, group: &str, name: &str) -> Result<String> {
        if !self.groups.contains_key(group) {
            return Err(RepackError::name_not_found(group));
        }
        let path = join_path(group, name);
        if self.index.contains_key(&path) || self.groups.contains_key(&path) {
            return Err(RepackError::duplicate_name(path));
        }
        Ok(path)
    }

    fn push(&mut self, dataset: MemoryDataset) -> ObjectId {
        let id = ObjectId(self.objects.len());
        self.index.insert(dataset.path.clone(), id);
        self.objects.push(dataset);
        id
    }
}

fn scale_name(path: &str) -> String {
    path.trim_start_matches('/').to_string()
}

impl Destination for MemoryDestination {
    fn create_group(&mut self, parent: &str, name: &str) -> Result<String> {
        let path = self.check_free(parent, name)?;
        self.groups.insert(path.clone(), BTreeMap::new());
        Ok(path)
    }

    fn contains(&self, group: &str, name: &str) -> bool {
        let path = join_path(group, name);
        self.index.contains_key(&path) || self.groups.contains_key(&path)
    }

    fn create_dataset(
        &mut self,
        group: &str,
        name: &str,
        data: &Buffer,
        layout: &Layout,
    ) -> Result<ObjectId> {
        let path = self.check_free(group, name)?;
        Ok(self.push(MemoryDataset {
            path,
            data: data.clone(),
            layout: layout.clone(),
            attributes: BTreeMap::new(),
            dimension_list: vec![None; data.rank()],
            references: Vec::new(),
            is_scale: false,
        }))
    }

    fn set_attribute(&mut self, target: Target<'_>, name: &str, value: &AttrValue) -> Result<()> {
        let attributes = match target {
            Target::Group(group) => self
                .groups
                .get_mut(group)
                .ok_or_else(|| RepackError::name_not_found(group))?,
            Target::Object(id) => {
                &mut self
                    .objects
                    .get_mut(id.0)
                    .ok_or_else(|| RepackError::name_not_found(format!("object #{}", id.0)))?
                    .attributes
            }
        };
        attributes.insert(name.to_string(), value.clone());
        Ok(())
    }

    fn create_scale(
        &mut self,
        name: &str,
        len: usize,
        values: ScaleValues<'_>,
    ) -> Result<ObjectId> {
        let path = self.check_free("/", name)?;
        let mut attributes = BTreeMap::new();
        attributes.insert("CLASS".to_string(), AttrValue::from("DIMENSION_SCALE"));
        let data = match values {
            ScaleValues::Values(values) => {
                if values.len() != len {
                    return Err(RepackError::dimension_mismatch(
                        &path,
                        format!("{} scale values for length {}", values.len(), len),
                    ));
                }
                attributes.insert("NAME".to_string(), AttrValue::from(name));
                values.clone()
            }
            ScaleValues::Pure { label } => {
                attributes.insert("NAME".to_string(), AttrValue::from(label));
                Buffer::from_array(ArrayD::<f32>::zeros(IxDyn(&[len])))
            }
        };
        Ok(self.push(MemoryDataset {
            path,
            data,
            layout: Layout::default(),
            attributes,
            dimension_list: vec![None],
            references: Vec::new(),
            is_scale: true,
        }))
    }

    fn attach_scale(&mut self, dataset: ObjectId, scale: ObjectId, axis: usize) -> Result<()> {
        let scale_len = match self.objects.get(scale.0) {
            Some(s) if s.is_scale => s.data.len(),
            _ => return Err(RepackError::name_not_found(format!("scale #{}", scale.0))),
        };
        let target = self
            .objects
            .get_mut(dataset.0)
            .ok_or_else(|| RepackError::name_not_found(format!("object #{}", dataset.0)))?;
        match target.data.shape().get(axis) {
            Some(&len) if len == scale_len => {}
            Some(&len) => {
                return Err(RepackError::dimension_mismatch(
                    &target.path,
                    format!("axis {} has length {}, scale has {}", axis, len, scale_len),
                ))
            }
            None => {
                return Err(RepackError::dimension_mismatch(
                    &target.path,
                    format!("no axis {} in rank {}", axis, target.data.rank()),
                ))
            }
        }
        target.dimension_list[axis] = Some(scale);
        self.objects[scale.0].references.push((dataset, axis));
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }
}
