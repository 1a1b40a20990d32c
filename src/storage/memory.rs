use super::{check_frame_access, Attributes, FrameSink, FrameSource};
use crate::error::Result;
use crate::image::FrameView;
use crate::types::{Dtype, Shape3};

/// Dataset held entirely in memory.
#[derive(Clone, Debug)]
pub struct MemoryDataset {
    pub name: String,
    shape: Shape3,
    dtype: Dtype,
    data: Vec<u8>,
    attributes: Attributes,
}

impl MemoryDataset {
    pub fn new(shape: Shape3, dtype: Dtype) -> Self {
        Self {
            name: "memory".to_string(),
            shape,
            dtype,
            data: vec![0; shape.frames * shape.frame_bytes(dtype)],
            attributes: Attributes::new(),
        }
    }

    /// Dataset whose pixel `(frame, slow, fast)` is `f(frame, slow, fast)`.
    pub fn from_fn<F>(shape: Shape3, dtype: Dtype, mut f: F) -> Self
    where
        F: FnMut(usize, usize, usize) -> i64,
    {
        let mut ds = Self::new(shape, dtype);
        let size = dtype.size();
        let mut i = 0;
        for k in 0..shape.frames {
            for s in 0..shape.slow {
                for x in 0..shape.fast {
                    dtype.encode(f(k, s, x), &mut ds.data[i..i + size]);
                    i += size;
                }
            }
        }
        ds
    }

    pub fn shape(&self) -> Shape3 {
        self.shape
    }

    pub fn dtype(&self) -> Dtype {
        self.dtype
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: i32) -> Self {
        self.attributes.set(name, value);
        self
    }

    pub fn frame(&self, frame: usize) -> FrameView<'_> {
        let len = self.shape.frame_bytes(self.dtype);
        FrameView::new(
            self.dtype,
            self.shape.slow,
            self.shape.fast,
            &self.data[frame * len..(frame + 1) * len],
        )
    }

    pub fn pixel(&self, frame: usize, slow: usize, fast: usize) -> i64 {
        let size = self.dtype.size();
        let i = ((frame * self.shape.slow + slow) * self.shape.fast + fast) * size;
        self.dtype.decode(&self.data[i..i + size])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }
}

impl FrameSource for MemoryDataset {
    fn shape(&self) -> Shape3 {
        MemoryDataset::shape(self)
    }

    fn dtype(&self) -> Dtype {
        MemoryDataset::dtype(self)
    }

    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn read_frame(&mut self, frame: usize, out: &mut [u8]) -> Result<()> {
        check_frame_access(&|| self.name.clone(), self.shape, self.dtype, frame, out.len())?;
        let len = out.len();
        out.copy_from_slice(&self.data[frame * len..(frame + 1) * len]);
        Ok(())
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

impl FrameSink for MemoryDataset {
    fn shape(&self) -> Shape3 {
        MemoryDataset::shape(self)
    }

    fn dtype(&self) -> Dtype {
        MemoryDataset::dtype(self)
    }

    fn attributes_mut(&mut self) -> &mut Attributes {
        MemoryDataset::attributes_mut(self)
    }

    fn write_frame(&mut self, frame: usize, data: &[u8]) -> Result<()> {
        check_frame_access(&|| self.name.clone(), self.shape, self.dtype, frame, data.len())?;
        let len = data.len();
        self.data[frame * len..(frame + 1) * len].copy_from_slice(data);
        Ok(())
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}
