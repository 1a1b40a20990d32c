#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod metadata;
pub mod pipeline;
pub mod storage;
pub mod types;

// Lower-level building blocks. Public for tools and tests.
pub mod blit;
pub mod image;

// --- High-level re-exports -------------------------------------------------

pub use crate::error::{GeometryError, Result, RetileError};
pub use crate::geometry::{resolve, DetectorGeometry, DetectorPreset, GroupMap, ResolvedLayout};
pub use crate::layout::{compose, VirtualDataset, VirtualLayout, VirtualView};
pub use crate::pipeline::{artifact_path, repack, split, split_stream, SplitOptions};
pub use crate::storage::{open_dataset, FrameSink, FrameSource};
pub use crate::types::{Dtype, Shape3};

// Run reports.
pub use crate::diagnostics::{RepackReport, SplitReport, TimingBreakdown};

// --- Prelude ---------------------------------------------------------------

/// Everything needed to split a stream and read the composite back.
///
/// ```no_run
/// use module_retile::prelude::*;
/// use std::path::Path;
///
/// # fn main() -> module_retile::Result<()> {
/// let mut composite = VirtualDataset::open(Path::new("out.h5"))?;
/// let frame = composite.compose_frame(0)?;
/// println!("fill={} first={}", composite.fill_value(), frame.view().pixel(0, 0));
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::geometry::{DetectorGeometry, DetectorPreset, GroupMap};
    pub use crate::image::PixelRows;
    pub use crate::layout::VirtualDataset;
    pub use crate::pipeline::{repack, split, SplitOptions};
    pub use crate::storage::{open_dataset, FrameSource};
    pub use crate::types::{Dtype, Shape3};
}
