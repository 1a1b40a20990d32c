//! Storage capability set used by the pipeline.
//!
//! The core only needs three things from a backend: read whole frames of a
//! source, write whole frames of a destination, and carry a handful of scalar
//! attributes. [`h5`] is the on-disk backend (HDF5, one chunk per frame),
//! [`memory`] keeps everything in RAM for tests and synthetic data.

pub mod h5;
pub mod memory;

pub use h5::{Compression, DatasetSpec, H5Reader, H5Writer, DEFAULT_DATASET};
pub use memory::MemoryDataset;

use crate::error::{Result, RetileError};
use crate::image::FrameBuf;
use crate::layout::VirtualDataset;
use crate::types::{Dtype, Shape3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

/// Scalar `i4` attributes attached to a dataset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, i32>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<i32> {
        self.0.get(name).copied()
    }

    pub fn require(&self, name: &str) -> Result<i32> {
        self.get(name)
            .ok_or_else(|| RetileError::AttributeMissing(name.to_string()))
    }

    pub fn set(&mut self, name: impl Into<String>, value: i32) {
        self.0.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Read side of a dataset: a `(frames, slow, fast)` stream of one dtype.
pub trait FrameSource {
    fn shape(&self) -> Shape3;

    fn dtype(&self) -> Dtype;

    fn attributes(&self) -> &Attributes;

    /// Fill `out` (exactly one frame of bytes) with frame `frame`.
    fn read_frame(&mut self, frame: usize, out: &mut [u8]) -> Result<()>;

    /// Human-readable name used in error messages.
    fn describe(&self) -> String {
        "dataset".to_string()
    }

    fn read_frame_buf(&mut self, frame: usize) -> Result<FrameBuf> {
        let shape = self.shape();
        let mut buf = FrameBuf::new(self.dtype(), shape.slow, shape.fast);
        self.read_frame(frame, buf.as_bytes_mut())?;
        Ok(buf)
    }
}

/// Write side of a dataset. One writer owns a sink; frames may be written in
/// any order, each exactly once per run.
pub trait FrameSink: Send {
    fn shape(&self) -> Shape3;

    fn dtype(&self) -> Dtype;

    fn attributes_mut(&mut self) -> &mut Attributes;

    fn write_frame(&mut self, frame: usize, data: &[u8]) -> Result<()>;

    /// Make everything written so far durable. No writes are accepted after.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }

    fn describe(&self) -> String {
        "dataset".to_string()
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn shape(&self) -> Shape3 {
        (**self).shape()
    }
    fn dtype(&self) -> Dtype {
        (**self).dtype()
    }
    fn attributes(&self) -> &Attributes {
        (**self).attributes()
    }
    fn read_frame(&mut self, frame: usize, out: &mut [u8]) -> Result<()> {
        (**self).read_frame(frame, out)
    }
    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Open any dataset file: the `data` dataset of an HDF5 file, or a composite
/// descriptor which is served through its virtual layout.
pub fn open_dataset(path: &Path) -> Result<Box<dyn FrameSource>> {
    if h5::is_hdf5(path)? {
        Ok(Box::new(H5Reader::open(path)?))
    } else {
        Ok(Box::new(VirtualDataset::open(path)?))
    }
}

/// Create `path` for writing, failing with `ArtifactExists` if it is there.
pub(crate) fn create_exclusive(path: &Path) -> Result<File> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => RetileError::ArtifactExists(path.to_path_buf()),
            _ => RetileError::Io(e),
        })
}

pub(crate) fn check_frame_access(
    name: &dyn Fn() -> String,
    shape: Shape3,
    dtype: Dtype,
    frame: usize,
    len: usize,
) -> Result<()> {
    if frame >= shape.frames {
        return Err(RetileError::FrameOutOfRange {
            frame,
            frames: shape.frames,
        });
    }
    let expected = shape.frame_bytes(dtype);
    if len != expected {
        return Err(RetileError::Layout(format!(
            "{}: frame buffer holds {len} bytes, expected {expected}",
            name()
        )));
    }
    Ok(())
}
