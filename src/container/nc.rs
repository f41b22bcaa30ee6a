//! netCDF-backed containers.
//!
//! Reading goes through whatever libnetcdf can open (netCDF-3/4, HDF5 and,
//! when the library is built with HDF4 support, HDF4 SD files). Output is a
//! netCDF-4 file, i.e. HDF5 with dimension scales.
//!
//! netCDF defines a variable together with its dimensions, so a dataset is
//! staged in memory until every axis has a scale attached. It is then
//! defined and written, and the staged copy is dropped. Axes still unbound at
//! `flush` get anonymous `phony_dim_N` dimensions, the name libnetcdf itself
//! uses for HDF5 datasets without scales.
//!
//! libnetcdf owns the HDF5 dimension-scale attributes. A dimension without a
//! coordinate variable gets the `NAME` label followed by its length
//! formatted as `%10d`, and the attribute is hidden from the netCDF API.

use super::{
    join_path, AttrValue, Destination, Layout, ObjectId, ScaleValues, Source, SourceDimension,
    SourceInfo, Target,
};
use crate::error::{RepackError, Result};
use crate::types::{source_tag, with_array, Buffer, DestType};
use ndarray::{ArrayD, IxDyn};
use netcdf::types::{FloatType, IntType, NcTypeDescriptor, NcVariableType};
use netcdf::{AttributeValue, Extent};
use std::collections::HashSet;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A source container opened read-only through libnetcdf.
pub struct NcSource {
    file: netcdf::File,
    path: PathBuf,
}

impl std::fmt::Debug for NcSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NcSource").field("path", &self.path).finish()
    }
}

impl NcSource {
    /// Open `path` for reading.
    pub fn open(path: &Path) -> Result<Self> {
        let file = netcdf::open(path).map_err(|e| RepackError::container_open(path, e))?;
        debug!("Opened source {}", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    fn variable(&self, path: &str) -> Result<netcdf::Variable<'_>> {
        self.file
            .variable(path.trim_start_matches('/'))
            .ok_or_else(|| RepackError::name_not_found(path))
    }
}

fn dest_type_of(vartype: &NcVariableType) -> Option<DestType> {
    let dest = match vartype {
        NcVariableType::Int(IntType::I8) => DestType::Int8,
        NcVariableType::Int(IntType::U8) => DestType::UInt8,
        NcVariableType::Int(IntType::I16) => DestType::Int16,
        NcVariableType::Int(IntType::U16) => DestType::UInt16,
        NcVariableType::Int(IntType::I32) => DestType::Int32,
        NcVariableType::Int(IntType::U32) => DestType::UInt32,
        NcVariableType::Int(IntType::I64) => DestType::Int64,
        NcVariableType::Int(IntType::U64) => DestType::UInt64,
        NcVariableType::Float(FloatType::F32) => DestType::Float32,
        NcVariableType::Float(FloatType::F64) => DestType::Float64,
        NcVariableType::Char => DestType::Char,
        _ => return None,
    };
    Some(dest)
}

fn row_extents(rows: &Range<usize>, rank: usize) -> Vec<Extent> {
    let mut extents = vec![Extent::from(rows.clone())];
    extents.extend((1..rank).map(|_| Extent::from(..)));
    extents
}

fn read_values<T>(
    var: &netcdf::Variable<'_>,
    rows: &Option<Range<usize>>,
    rank: usize,
) -> std::result::Result<Vec<T>, netcdf::Error>
where
    T: NcTypeDescriptor + Copy,
{
    match rows {
        None => var.get_values::<T, _>(..),
        Some(rows) => var.get_values::<T, _>(row_extents(rows, rank)),
    }
}

fn read_chars(
    var: &netcdf::Variable<'_>,
    rows: &Option<Range<usize>>,
    rank: usize,
) -> std::result::Result<Vec<u8>, netcdf::Error> {
    match rows {
        None => var.get_raw_values(..),
        Some(rows) => var.get_raw_values(row_extents(rows, rank)),
    }
}

fn read_buffer(
    var: &netcdf::Variable<'_>,
    path: &str,
    rows: Option<Range<usize>>,
) -> Result<Buffer> {
    let mut shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
    let rank = shape.len();
    if let Some(rows) = &rows {
        if rank == 0 || rows.start >= rows.end || rows.end > shape[0] {
            return Err(RepackError::read_io(
                path,
                format!("rows {:?} outside the first axis", rows),
            ));
        }
        shape[0] = rows.len();
    }

    let dest = dest_type_of(&var.vartype()).ok_or_else(|| {
        RepackError::TypeUnsupported(format!("{:?} in {}", var.vartype(), path))
    })?;

    macro_rules! read_as {
        ($t:ty) => {{
            let values = read_values::<$t>(var, &rows, rank)
                .map_err(|e| RepackError::read_io(path, e))?;
            Buffer::from_shape_vec(&shape, values).map_err(|e| RepackError::read_io(path, e))?
        }};
    }

    let buffer = match dest {
        DestType::Int8 => read_as!(i8),
        DestType::UInt8 => read_as!(u8),
        DestType::Int16 => read_as!(i16),
        DestType::UInt16 => read_as!(u16),
        DestType::Int32 => read_as!(i32),
        DestType::UInt32 => read_as!(u32),
        DestType::Int64 => read_as!(i64),
        DestType::UInt64 => read_as!(u64),
        DestType::Float32 => read_as!(f32),
        DestType::Float64 => read_as!(f64),
        DestType::Char | DestType::UChar => {
            let bytes = read_chars(var, &rows, rank).map_err(|e| RepackError::read_io(path, e))?;
            let chars = bytes.into_iter().map(|b| b as i8).collect();
            let array = ArrayD::from_shape_vec(IxDyn(&shape), chars)
                .map_err(|e| RepackError::read_io(path, e))?;
            Buffer::Char(array)
        }
    };
    Ok(buffer)
}

fn attr_value(value: AttributeValue) -> Option<AttrValue> {
    let attr = match value {
        AttributeValue::Str(v) => AttrValue::Text(v),
        AttributeValue::Strs(v) => AttrValue::Text(v.join(", ")),
        AttributeValue::Uchar(v) => AttrValue::numbers(vec![v]),
        AttributeValue::Schar(v) => AttrValue::numbers(vec![v]),
        AttributeValue::Ushort(v) => AttrValue::numbers(vec![v]),
        AttributeValue::Short(v) => AttrValue::numbers(vec![v]),
        AttributeValue::Uint(v) => AttrValue::numbers(vec![v]),
        AttributeValue::Int(v) => AttrValue::numbers(vec![v]),
        AttributeValue::Ulonglong(v) => AttrValue::numbers(vec![v]),
        AttributeValue::Longlong(v) => AttrValue::numbers(vec![v]),
        AttributeValue::Float(v) => AttrValue::numbers(vec![v]),
        AttributeValue::Double(v) => AttrValue::numbers(vec![v]),
        AttributeValue::Uchars(v) => AttrValue::numbers(v),
        AttributeValue::Schars(v) => AttrValue::numbers(v),
        AttributeValue::Ushorts(v) => AttrValue::numbers(v),
        AttributeValue::Shorts(v) => AttrValue::numbers(v),
        AttributeValue::Uints(v) => AttrValue::numbers(v),
        AttributeValue::Ints(v) => AttrValue::numbers(v),
        AttributeValue::Ulonglongs(v) => AttrValue::numbers(v),
        AttributeValue::Longlongs(v) => AttrValue::numbers(v),
        AttributeValue::Floats(v) => AttrValue::numbers(v),
        AttributeValue::Doubles(v) => AttrValue::numbers(v),
        #[allow(unreachable_patterns)]
        _ => return None,
    };
    Some(attr)
}

fn nc_attr_value(value: &AttrValue) -> AttributeValue {
    match value {
        AttrValue::Text(s) => AttributeValue::Str(s.clone()),
        AttrValue::Numbers(buffer) => match buffer {
            Buffer::Int8(a) | Buffer::Char(a) => {
                AttributeValue::Schars(a.iter().copied().collect())
            }
            Buffer::UInt8(a) | Buffer::UChar(a) => {
                AttributeValue::Uchars(a.iter().copied().collect())
            }
            Buffer::Int16(a) => AttributeValue::Shorts(a.iter().copied().collect()),
            Buffer::UInt16(a) => AttributeValue::Ushorts(a.iter().copied().collect()),
            Buffer::Int32(a) => AttributeValue::Ints(a.iter().copied().collect()),
            Buffer::UInt32(a) => AttributeValue::Uints(a.iter().copied().collect()),
            Buffer::Int64(a) => AttributeValue::Longlongs(a.iter().copied().collect()),
            Buffer::UInt64(a) => AttributeValue::Ulonglongs(a.iter().copied().collect()),
            Buffer::Float32(a) => AttributeValue::Floats(a.iter().copied().collect()),
            Buffer::Float64(a) => AttributeValue::Doubles(a.iter().copied().collect()),
        },
    }
}

impl Source for NcSource {
    fn describe(&self, path: &str) -> Result<SourceInfo> {
        let var = self.variable(path)?;
        let dims: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        // Types libnetcdf knows but the bridge does not report tag 0, which
        // the bridge rejects.
        let tag = dest_type_of(&var.vartype()).map(source_tag).unwrap_or(0);
        Ok(SourceInfo {
            rank: dims.len(),
            dims,
            tag,
        })
    }

    fn read(&self, path: &str, rows: Option<Range<usize>>) -> Result<Buffer> {
        let var = self.variable(path)?;
        read_buffer(&var, path, rows)
    }

    fn dimensions(&self, path: &str) -> Result<Vec<SourceDimension>> {
        let var = self.variable(path)?;
        let dims = var
            .dimensions()
            .iter()
            .map(|d| {
                let name = d.name().to_string();
                let has_scale = self
                    .file
                    .variable(&name)
                    .map(|v| v.dimensions().len() == 1)
                    .unwrap_or(false);
                SourceDimension {
                    name,
                    len: d.len(),
                    has_scale,
                }
            })
            .collect();
        Ok(dims)
    }

    fn read_scale(&self, path: &str, axis: usize) -> Result<Option<Buffer>> {
        let dims = self.dimensions(path)?;
        let dim = dims
            .get(axis)
            .ok_or_else(|| RepackError::read_io(path, format!("no axis {}", axis)))?;
        if !dim.has_scale {
            return Ok(None);
        }
        let scale = self.variable(&dim.name)?;
        read_buffer(&scale, &dim.name, None).map(Some)
    }

    fn attribute(&self, path: &str, name: &str) -> Result<Option<AttrValue>> {
        let var = self.variable(path)?;
        if !var.attributes().any(|attr| attr.name() == name) {
            return Ok(None);
        }
        match var.attribute_value(name) {
            Some(Ok(value)) => Ok(attr_value(value)),
            Some(Err(e)) => Err(RepackError::read_io(format!("{}@{}", path, name), e)),
            None => Ok(None),
        }
    }

    fn attribute_names(&self, path: &str) -> Result<Vec<String>> {
        let var = self.variable(path)?;
        let names = var.attributes().map(|attr| attr.name().to_string()).collect();
        Ok(names)
    }
}

#[derive(Debug)]
struct Staged {
    group: String,
    name: String,
    shape: Vec<usize>,
    // Taken once the variable is written.
    data: Option<Buffer>,
    layout: Layout,
    attributes: Vec<(String, AttrValue)>,
    axes: Vec<Option<String>>,
}

impl Staged {
    fn defined(&self) -> bool {
        self.data.is_none()
    }
}

#[derive(Debug)]
enum NcObject {
    Scale { name: String, len: usize },
    Dataset(Staged),
}

/// A netCDF-4 output file, created exclusively.
pub struct NcDestination {
    file: netcdf::FileMut,
    path: PathBuf,
    objects: Vec<NcObject>,
    names: HashSet<String>,
    phony_dims: usize,
}

impl std::fmt::Debug for NcDestination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NcDestination")
            .field("path", &self.path)
            .field("objects", &self.objects.len())
            .finish()
    }
}

fn fill_variable<T>(
    var: &mut netcdf::VariableMut<'_>,
    values: &ArrayD<T>,
    layout: &Layout,
    attributes: &[(String, AttrValue)],
) -> Result<()>
where
    T: NcTypeDescriptor + Copy,
{
    if let Some(chunk) = &layout.chunk {
        var.set_chunking(chunk)?;
        if layout.compression_level > 0 {
            var.set_compression(i32::from(layout.compression_level), false)?;
        }
    }
    for (name, value) in attributes {
        var.put_attribute(name, nc_attr_value(value))?;
    }
    let flat: Vec<T> = values.iter().copied().collect();
    var.put_values(&flat, ..)?;
    Ok(())
}

fn define_variable<T>(
    file: &mut netcdf::FileMut,
    group: &str,
    name: &str,
    dims: &[&str],
    values: &ArrayD<T>,
    layout: &Layout,
    attributes: &[(String, AttrValue)],
) -> Result<()>
where
    T: NcTypeDescriptor + Copy,
{
    let group_path = group.trim_matches('/');
    if group_path.is_empty() {
        let mut var = file.add_variable::<T>(name, dims)?;
        fill_variable(&mut var, values, layout, attributes)
    } else {
        let mut parent = file
            .group_mut(group_path)?
            .ok_or_else(|| RepackError::name_not_found(group))?;
        let mut var = parent.add_variable::<T>(name, dims)?;
        fill_variable(&mut var, values, layout, attributes)
    }
}

impl NcDestination {
    /// Create `path`; fails if the file already exists.
    pub fn create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Err(RepackError::container_open(path, "output file already exists"));
        }
        let file = netcdf::create(path).map_err(|e| RepackError::container_open(path, e))?;
        debug!("Created output {}", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
            objects: Vec::new(),
            names: HashSet::new(),
            phony_dims: 0,
        })
    }

    fn staged_mut(&mut self, id: ObjectId) -> Result<&mut Staged> {
        match self.objects.get_mut(id.0) {
            Some(NcObject::Dataset(staged)) => Ok(staged),
            _ => Err(RepackError::name_not_found(format!("dataset #{}", id.0))),
        }
    }

    fn define(&mut self, id: ObjectId) -> Result<()> {
        let staged = match self.objects.get_mut(id.0) {
            Some(NcObject::Dataset(staged)) => staged,
            _ => return Ok(()),
        };
        let Some(data) = staged.data.take() else {
            return Ok(());
        };
        let attributes = std::mem::take(&mut staged.attributes);
        let dims: Vec<&str> = staged.axes.iter().flatten().map(String::as_str).collect();
        let path = join_path(&staged.group, &staged.name);
        let file = &mut self.file;
        with_array!(&data, a => define_variable(
            file,
            &staged.group,
            &staged.name,
            &dims,
            a,
            &staged.layout,
            &attributes,
        ))
        .map_err(|e| RepackError::write_io(&path, e))?;
        debug!("Defined {} over {:?}", path, dims);
        Ok(())
    }

    /// Write everything still staged and close the file.
    pub fn close(mut self) -> Result<()> {
        self.flush()?;
        self.file
            .close()
            .map_err(|e| RepackError::write_io(self.path.display().to_string(), e))
    }
}

impl Destination for NcDestination {
    fn create_group(&mut self, parent: &str, name: &str) -> Result<String> {
        let path = join_path(parent, name);
        if self.names.contains(&path) {
            return Err(RepackError::duplicate_name(path));
        }
        self.file
            .add_group(path.trim_start_matches('/'))
            .map_err(|e| RepackError::write_io(&path, e))?;
        self.names.insert(path.clone());
        Ok(path)
    }

    fn contains(&self, group: &str, name: &str) -> bool {
        self.names.contains(&join_path(group, name))
    }

    fn create_dataset(
        &mut self,
        group: &str,
        name: &str,
        data: &Buffer,
        layout: &Layout,
    ) -> Result<ObjectId> {
        let path = join_path(group, name);
        if self.names.contains(&path) {
            return Err(RepackError::duplicate_name(path));
        }
        let id = ObjectId(self.objects.len());
        self.objects.push(NcObject::Dataset(Staged {
            group: group.to_string(),
            name: name.to_string(),
            shape: data.shape().to_vec(),
            data: Some(data.clone()),
            layout: layout.clone(),
            attributes: Vec::new(),
            axes: vec![None; data.rank()],
        }));
        self.names.insert(path);
        if data.rank() == 0 {
            self.define(id)?;
        }
        Ok(id)
    }

    fn set_attribute(&mut self, target: Target<'_>, name: &str, value: &AttrValue) -> Result<()> {
        match target {
            Target::Group(group) => {
                let group_path = group.trim_matches('/');
                if group_path.is_empty() {
                    self.file.add_attribute(name, nc_attr_value(value))?;
                } else {
                    let mut g = self
                        .file
                        .group_mut(group_path)?
                        .ok_or_else(|| RepackError::name_not_found(group))?;
                    g.add_attribute(name, nc_attr_value(value))?;
                }
            }
            Target::Object(id) => match self.objects.get_mut(id.0) {
                Some(NcObject::Dataset(staged)) if !staged.defined() => {
                    staged.attributes.push((name.to_string(), value.clone()));
                }
                Some(NcObject::Dataset(staged)) => {
                    let path = join_path(&staged.group, &staged.name);
                    let mut var = self
                        .file
                        .variable_mut(path.trim_start_matches('/'))
                        .ok_or_else(|| RepackError::name_not_found(&path))?;
                    var.put_attribute(name, nc_attr_value(value))?;
                }
                Some(NcObject::Scale { name: scale, .. }) => {
                    let scale = scale.clone();
                    let mut var = self
                        .file
                        .variable_mut(&scale)
                        .ok_or_else(|| RepackError::name_not_found(&scale))?;
                    var.put_attribute(name, nc_attr_value(value))?;
                }
                None => return Err(RepackError::name_not_found(format!("object #{}", id.0))),
            },
        }
        Ok(())
    }

    fn create_scale(
        &mut self,
        name: &str,
        len: usize,
        values: ScaleValues<'_>,
    ) -> Result<ObjectId> {
        let path = join_path("/", name);
        if self.names.contains(&path) {
            return Err(RepackError::duplicate_name(path));
        }
        self.file
            .add_dimension(name, len)
            .map_err(|e| RepackError::write_io(&path, e))?;
        match values {
            ScaleValues::Values(values) => {
                let file = &mut self.file;
                with_array!(values, a => define_variable(
                    file,
                    "/",
                    name,
                    &[name],
                    a,
                    &Layout::default(),
                    &[],
                ))
                .map_err(|e| RepackError::write_io(&path, e))?;
            }
            // libnetcdf writes the label itself, with the length appended.
            ScaleValues::Pure { label } => debug!("Pure dimension {} ({})", name, label),
        }
        self.names.insert(path);
        let id = ObjectId(self.objects.len());
        self.objects.push(NcObject::Scale {
            name: name.to_string(),
            len,
        });
        Ok(id)
    }

    fn attach_scale(&mut self, dataset: ObjectId, scale: ObjectId, axis: usize) -> Result<()> {
        let (scale_name, scale_len) = match self.objects.get(scale.0) {
            Some(NcObject::Scale { name, len }) => (name.clone(), *len),
            _ => return Err(RepackError::name_not_found(format!("scale #{}", scale.0))),
        };
        let staged = self.staged_mut(dataset)?;
        let path = join_path(&staged.group, &staged.name);
        if staged.defined() {
            return Err(RepackError::dimension_mismatch(
                path,
                "dataset already defined in the file",
            ));
        }
        match staged.shape.get(axis) {
            Some(&len) if len == scale_len => {}
            _ => {
                return Err(RepackError::dimension_mismatch(
                    path,
                    format!(
                        "axis {} does not match {} (length {})",
                        axis, scale_name, scale_len
                    ),
                ))
            }
        }
        staged.axes[axis] = Some(scale_name);
        if staged.axes.iter().all(Option::is_some) {
            self.define(dataset)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        for index in 0..self.objects.len() {
            let unbound: Vec<(usize, usize)> = match &self.objects[index] {
                NcObject::Dataset(staged) if !staged.defined() => staged
                    .axes
                    .iter()
                    .zip(&staged.shape)
                    .enumerate()
                    .filter(|(_, (bound, _))| bound.is_none())
                    .map(|(axis, (_, &len))| (axis, len))
                    .collect(),
                _ => continue,
            };
            for (axis, len) in unbound {
                let name = format!("phony_dim_{}", self.phony_dims);
                self.phony_dims += 1;
                self.file
                    .add_dimension(&name, len)
                    .map_err(|e| RepackError::write_io(&name, e))?;
                self.staged_mut(ObjectId(index))?.axes[axis] = Some(name);
            }
            self.define(ObjectId(index))?;
        }
        Ok(())
    }
}
