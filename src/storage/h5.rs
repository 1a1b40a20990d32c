//! HDF5 backend: one 3-D `(frames, slow, fast)` dataset per file, chunked one
//! frame per chunk, with integer scalar attributes stored as `i4`.

use super::{check_frame_access, Attributes, FrameSink, FrameSource};
use crate::error::{Result, RetileError};
use crate::types::{Dtype, Pixel, Shape3};
use hdf5::types::{IntSize, TypeDescriptor};
use hdf5::{Dataset, File, H5Type};
use log::{debug, warn};
use ndarray::{s, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Superblock signature at the start of every HDF5 file.
pub const HDF5_SIGNATURE: [u8; 8] = *b"\x89HDF\r\n\x1a\n";

/// Dataset name used by detector streams and by every artifact.
pub const DEFAULT_DATASET: &str = "data";

/// Chunk filters applied to written datasets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Compression {
    /// Deflate level, `None` stores chunks uncompressed.
    pub deflate: Option<u8>,
    /// Byte shuffle ahead of compression.
    pub shuffle: bool,
}

impl Default for Compression {
    fn default() -> Self {
        Self {
            deflate: Some(1),
            shuffle: true,
        }
    }
}

impl Compression {
    pub fn none() -> Self {
        Self {
            deflate: None,
            shuffle: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetSpec {
    pub name: String,
    pub shape: Shape3,
    pub dtype: Dtype,
    pub compression: Compression,
}

/// True when `path` starts with the HDF5 signature.
pub fn is_hdf5(path: &Path) -> Result<bool> {
    let mut file = fs::File::open(path)?;
    let mut head = [0u8; 8];
    match file.read_exact(&mut head) {
        Ok(()) => Ok(head == HDF5_SIGNATURE),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e.into()),
    }
}

macro_rules! with_pixel_type {
    ($dtype:expr, $f:ident($($arg:expr),*)) => {
        match $dtype {
            Dtype::U8 => $f::<u8>($($arg),*),
            Dtype::U16 => $f::<u16>($($arg),*),
            Dtype::U32 => $f::<u32>($($arg),*),
            Dtype::I16 => $f::<i16>($($arg),*),
            Dtype::I32 => $f::<i32>($($arg),*),
        }
    };
}

fn create_dataset<T: H5Type>(file: &File, spec: &DatasetSpec) -> hdf5::Result<Dataset> {
    let shape = spec.shape;
    let builder = file
        .new_dataset::<T>()
        .shape((shape.frames, shape.slow, shape.fast))
        .obj_track_times(false);
    if shape.frames == 0 || shape.frame_pixels() == 0 {
        // Chunks cannot exceed a zero extent; store contiguous and unfiltered.
        return builder.create(spec.name.as_str());
    }
    let mut builder = builder.chunk((1, shape.slow, shape.fast));
    if spec.compression.shuffle {
        builder = builder.shuffle();
    }
    if let Some(level) = spec.compression.deflate {
        builder = builder.deflate(level);
    }
    builder.create(spec.name.as_str())
}

fn write_frame_as<T: Pixel + H5Type>(
    dataset: &Dataset,
    shape: Shape3,
    frame: usize,
    data: &[u8],
) -> Result<()> {
    let pixels: Vec<T> = data.chunks_exact(T::DTYPE.size()).map(T::from_le).collect();
    let view = ArrayView2::from_shape((shape.slow, shape.fast), &pixels)
        .map_err(|e| RetileError::Layout(format!("frame buffer: {e}")))?;
    dataset.write_slice(view, s![frame, .., ..])?;
    Ok(())
}

fn read_frame_as<T: Pixel + H5Type>(dataset: &Dataset, frame: usize, out: &mut [u8]) -> Result<()> {
    let pixels = dataset.read_slice_2d::<T, _>(s![frame, .., ..])?;
    for (px, chunk) in pixels.iter().zip(out.chunks_exact_mut(T::DTYPE.size())) {
        px.write_le(chunk);
    }
    Ok(())
}

fn dtype_of(dataset: &Dataset, path: &Path) -> Result<Dtype> {
    match dataset.dtype()?.to_descriptor()? {
        TypeDescriptor::Unsigned(IntSize::U1) => Ok(Dtype::U8),
        TypeDescriptor::Unsigned(IntSize::U2) => Ok(Dtype::U16),
        TypeDescriptor::Unsigned(IntSize::U4) => Ok(Dtype::U32),
        TypeDescriptor::Integer(IntSize::U2) => Ok(Dtype::I16),
        TypeDescriptor::Integer(IntSize::U4) => Ok(Dtype::I32),
        other => Err(RetileError::format(path, format!("unsupported pixel type {other:?}"))),
    }
}

/// Integer scalar attributes of `dataset`. Values outside the `i4` range and
/// non-integer attributes are skipped.
fn read_attributes(dataset: &Dataset) -> Result<Attributes> {
    let mut attributes = Attributes::new();
    for name in dataset.attr_names()? {
        let attr = dataset.attr(&name)?;
        let integer = matches!(
            attr.dtype()?.to_descriptor(),
            Ok(TypeDescriptor::Integer(_) | TypeDescriptor::Unsigned(_))
        );
        if !integer || !attr.is_scalar() {
            debug!("h5: attribute `{name}` is not an integer scalar, skipped");
            continue;
        }
        let value: i64 = attr.read_scalar()?;
        match i32::try_from(value) {
            Ok(value) => attributes.set(name, value),
            Err(_) => warn!("h5: attribute `{name}` = {value} does not fit i4, skipped"),
        }
    }
    Ok(attributes)
}

/// Write side of one artifact. Attributes are written on [`FrameSink::finish`].
pub struct H5Writer {
    path: PathBuf,
    file: File,
    dataset: Dataset,
    shape: Shape3,
    dtype: Dtype,
    attributes: Attributes,
    finished: bool,
}

impl H5Writer {
    /// Create `path` exclusively; an existing file is never overwritten.
    pub fn create(path: &Path, spec: DatasetSpec) -> Result<Self> {
        if path.exists() {
            return Err(RetileError::ArtifactExists(path.to_path_buf()));
        }
        let file = File::create_excl(path).map_err(|e| {
            if path.exists() {
                RetileError::ArtifactExists(path.to_path_buf())
            } else {
                RetileError::Hdf5(e)
            }
        })?;
        let dataset = with_pixel_type!(spec.dtype, create_dataset(&file, &spec))?;
        debug!(
            "h5: created {}:{} shape={} dtype={}",
            path.display(),
            spec.name,
            spec.shape,
            spec.dtype
        );
        Ok(Self {
            path: path.to_path_buf(),
            file,
            dataset,
            shape: spec.shape,
            dtype: spec.dtype,
            attributes: Attributes::new(),
            finished: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSink for H5Writer {
    fn shape(&self) -> Shape3 {
        self.shape
    }

    fn dtype(&self) -> Dtype {
        self.dtype
    }

    fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    fn write_frame(&mut self, frame: usize, data: &[u8]) -> Result<()> {
        if self.finished {
            return Err(RetileError::format(&self.path, "write after finish"));
        }
        check_frame_access(
            &|| self.path.display().to_string(),
            self.shape,
            self.dtype,
            frame,
            data.len(),
        )?;
        with_pixel_type!(
            self.dtype,
            write_frame_as(&self.dataset, self.shape, frame, data)
        )
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        for (name, value) in self.attributes.iter() {
            self.dataset
                .new_attr::<i32>()
                .create(name)?
                .write_scalar(&value)?;
        }
        self.file.flush()?;
        self.finished = true;
        debug!(
            "h5: finished {} ({} attributes)",
            self.path.display(),
            self.attributes.len()
        );
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Read side of a detector stream or artifact.
pub struct H5Reader {
    path: PathBuf,
    _file: File,
    dataset: Dataset,
    name: String,
    shape: Shape3,
    dtype: Dtype,
    attributes: Attributes,
}

impl H5Reader {
    /// Open the `data` dataset of `path`.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_named(path, DEFAULT_DATASET)
    }

    pub fn open_named(path: &Path, name: &str) -> Result<Self> {
        let file = File::open(path)?;
        let dataset = file.dataset(name)?;
        let dims = dataset.shape();
        let [frames, slow, fast] = dims[..] else {
            return Err(RetileError::format(
                path,
                format!("dataset `{name}` has rank {}, expected 3", dims.len()),
            ));
        };
        let dtype = dtype_of(&dataset, path)?;
        let attributes = read_attributes(&dataset)?;
        Ok(Self {
            path: path.to_path_buf(),
            _file: file,
            dataset,
            name: name.to_string(),
            shape: Shape3::new(frames, slow, fast),
            dtype,
            attributes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Chunk shape of the dataset, `None` for contiguous storage.
    pub fn chunk_shape(&self) -> Option<Vec<usize>> {
        self.dataset.chunk()
    }
}

impl FrameSource for H5Reader {
    fn shape(&self) -> Shape3 {
        self.shape
    }

    fn dtype(&self) -> Dtype {
        self.dtype
    }

    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn read_frame(&mut self, frame: usize, out: &mut [u8]) -> Result<()> {
        check_frame_access(
            &|| self.path.display().to_string(),
            self.shape,
            self.dtype,
            frame,
            out.len(),
        )?;
        with_pixel_type!(self.dtype, read_frame_as(&self.dataset, frame, out))
    }

    fn describe(&self) -> String {
        format!("{}:{}", self.path.display(), self.name)
    }
}
