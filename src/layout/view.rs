use super::{VirtualLayout, COMPOSITE_DTYPE};
use crate::error::{Result, RetileError};
use crate::image::{FrameBuf, PixelRows};
use crate::storage::{check_frame_access, Attributes, FrameSource, H5Reader};
use crate::types::{Dtype, Shape3};
use std::path::Path;

/// Read-only view of the global stream backed by the layout's sources.
///
/// Each source keeps its most recently decoded frame, so pixel-by-pixel reads
/// within one frame decode every artifact at most once. Source pixels are
/// converted to the composite's `i32` on the way out.
pub struct VirtualView<S> {
    layout: VirtualLayout,
    sources: Vec<S>,
    cache: Vec<CachedFrame>,
}

struct CachedFrame {
    frame: Option<usize>,
    buf: FrameBuf,
}

/// File-backed view opened from a composite descriptor.
pub type VirtualDataset = VirtualView<H5Reader>;

impl<S: FrameSource> VirtualView<S> {
    /// `sources[i]` serves `layout.sources[i]`; shapes and dtypes must agree
    /// with what the layout declares.
    pub fn new(layout: VirtualLayout, sources: Vec<S>) -> Result<Self> {
        layout.validate()?;
        if sources.len() != layout.sources.len() {
            return Err(RetileError::Layout(format!(
                "layout expects {} sources, got {}",
                layout.sources.len(),
                sources.len()
            )));
        }
        for (declared, source) in layout.sources.iter().zip(&sources) {
            if source.shape() != declared.shape {
                return Err(RetileError::Layout(format!(
                    "{} has shape {}, layout declares {}",
                    source.describe(),
                    source.shape(),
                    declared.shape
                )));
            }
            if source.dtype() != declared.dtype {
                return Err(RetileError::Layout(format!(
                    "{} has dtype {}, layout declares {}",
                    source.describe(),
                    source.dtype(),
                    declared.dtype
                )));
            }
        }
        let cache = layout
            .sources
            .iter()
            .map(|declared| CachedFrame {
                frame: None,
                buf: FrameBuf::new(declared.dtype, declared.shape.slow, declared.shape.fast),
            })
            .collect();
        Ok(Self {
            layout,
            sources,
            cache,
        })
    }

    pub fn layout(&self) -> &VirtualLayout {
        &self.layout
    }

    pub fn into_sources(self) -> Vec<S> {
        self.sources
    }

    /// Fill value as it reads back from the composite.
    pub fn fill_value(&self) -> i64 {
        COMPOSITE_DTYPE.saturate(self.layout.fill_value)
    }

    /// Assemble global frame `frame`: fill everywhere, then every mapping.
    pub fn compose_frame(&mut self, frame: usize) -> Result<FrameBuf> {
        let shape = self.layout.shape;
        if frame >= shape.frames {
            return Err(RetileError::FrameOutOfRange {
                frame,
                frames: shape.frames,
            });
        }
        let fill = self.fill_value();
        let mut out = FrameBuf::filled(COMPOSITE_DTYPE, shape.slow, shape.fast, fill);
        for i in 0..self.layout.mappings.len() {
            let m = self.layout.mappings[i];
            let src = self.source_frame(m.source, frame)?;
            out.copy_rect_from(src, m.local, m.global.slow0, m.global.fast0);
        }
        Ok(out)
    }

    /// Value at global `(frame, slow, fast)`; gaps read as the fill value.
    pub fn read_pixel(&mut self, frame: usize, slow: usize, fast: usize) -> Result<i64> {
        let shape = self.layout.shape;
        if frame >= shape.frames {
            return Err(RetileError::FrameOutOfRange {
                frame,
                frames: shape.frames,
            });
        }
        if slow >= shape.slow || fast >= shape.fast {
            return Err(RetileError::Layout(format!(
                "pixel ({slow}, {fast}) outside frame of {} x {}",
                shape.slow, shape.fast
            )));
        }
        match self.layout.locate(slow, fast) {
            Some((i, local_slow, local_fast)) => {
                let source = self.layout.mappings[i].source;
                let src = self.source_frame(source, frame)?;
                Ok(COMPOSITE_DTYPE.saturate(src.pixel(local_slow, local_fast)))
            }
            None => Ok(self.fill_value()),
        }
    }

    fn source_frame(&mut self, source: usize, frame: usize) -> Result<&FrameBuf> {
        let slot = &mut self.cache[source];
        if slot.frame != Some(frame) {
            slot.frame = None;
            self.sources[source].read_frame(frame, slot.buf.as_bytes_mut())?;
            slot.frame = Some(frame);
        }
        Ok(&slot.buf)
    }
}

impl VirtualView<H5Reader> {
    /// Open a composite descriptor and every artifact it references. Relative
    /// artifact paths resolve against the descriptor's directory.
    pub fn open(path: &Path) -> Result<Self> {
        let layout = VirtualLayout::read(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        let mut sources = Vec::with_capacity(layout.sources.len());
        for artifact in &layout.sources {
            let reader = H5Reader::open_named(&base.join(&artifact.path), &artifact.dataset)?;
            sources.push(reader);
        }
        Self::new(layout, sources)
    }
}

impl<S: FrameSource> FrameSource for VirtualView<S> {
    fn shape(&self) -> Shape3 {
        self.layout.shape
    }

    fn dtype(&self) -> Dtype {
        COMPOSITE_DTYPE
    }

    fn attributes(&self) -> &Attributes {
        &self.layout.attributes
    }

    fn read_frame(&mut self, frame: usize, out: &mut [u8]) -> Result<()> {
        check_frame_access(
            &|| format!("virtual `{}`", self.layout.name),
            self.layout.shape,
            COMPOSITE_DTYPE,
            frame,
            out.len(),
        )?;
        let composed = self.compose_frame(frame)?;
        out.copy_from_slice(&composed.data);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("virtual `{}`", self.layout.name)
    }

    fn read_frame_buf(&mut self, frame: usize) -> Result<FrameBuf> {
        self.compose_frame(frame)
    }
}
