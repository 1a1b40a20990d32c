//! Blit engine: copy each group's module rectangles out of the global frames
//! into the group artifacts.
//!
//! Frames are processed strictly in order and a frame is only considered done
//! once every group has received it, so after an interruption the
//! [`FrameCursor`] says exactly which prefix of frames is complete. With the
//! `parallel` feature the groups of one frame are written concurrently; their
//! destinations are disjoint and the source frame is shared read-only.

pub mod tasks;

pub use tasks::{copy_tasks, copy_tasks_from, frame_tasks, group_tasks, CopyTask};

use crate::error::{Result, RetileError};
use crate::geometry::{OutputGroup, ResolvedLayout};
use crate::image::FrameBuf;
use crate::storage::{FrameSink, FrameSource};
use log::debug;
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlitOptions {
    /// Write the groups of a frame concurrently (needs the `parallel` feature).
    pub parallel: bool,
}

impl Default for BlitOptions {
    fn default() -> Self {
        Self {
            parallel: cfg!(feature = "parallel"),
        }
    }
}

/// Resumable position in the frame axis: frames `[0, next_frame)` are
/// completely written to every destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameCursor {
    next_frame: usize,
    frames: usize,
}

impl FrameCursor {
    pub fn new(frames: usize) -> Self {
        Self {
            next_frame: 0,
            frames,
        }
    }

    /// Cursor that treats frames before `next_frame` as already written.
    pub fn resume_at(frames: usize, next_frame: usize) -> Self {
        Self {
            next_frame: next_frame.min(frames),
            frames,
        }
    }

    pub fn next_frame(&self) -> usize {
        self.next_frame
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn remaining(&self) -> usize {
        self.frames - self.next_frame
    }

    pub fn is_complete(&self) -> bool {
        self.next_frame >= self.frames
    }

    fn advance(&mut self) {
        self.next_frame += 1;
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlitReport {
    pub frames_written: usize,
    pub groups: usize,
    pub tasks: usize,
    pub bytes_copied: u64,
    pub elapsed_ms: f64,
    pub cursor: FrameCursor,
}

/// Validate source and destinations against the layout before anything is
/// copied.
pub fn check_destinations<S, D>(layout: &ResolvedLayout, source: &S, sinks: &[D]) -> Result<()>
where
    S: FrameSource + ?Sized,
    D: FrameSink,
{
    if source.shape() != layout.global {
        return Err(RetileError::ShapeMismatch {
            artifact: source.describe(),
            expected: layout.global,
            found: source.shape(),
        });
    }
    if sinks.len() != layout.groups.len() {
        return Err(RetileError::Layout(format!(
            "{} destinations supplied for {} groups",
            sinks.len(),
            layout.groups.len()
        )));
    }
    for (group, sink) in layout.groups.iter().zip(sinks) {
        let expected = group.shape(layout.frames());
        if sink.shape() != expected {
            return Err(RetileError::ShapeMismatch {
                artifact: sink.describe(),
                expected,
                found: sink.shape(),
            });
        }
        if sink.dtype() != source.dtype() {
            return Err(RetileError::DtypeMismatch {
                artifact: sink.describe(),
                expected: source.dtype(),
                found: sink.dtype(),
            });
        }
    }
    Ok(())
}

/// Copy every frame of `source` into `sinks` (one per group, in group order).
pub fn blit<S, D>(
    layout: &ResolvedLayout,
    source: &mut S,
    sinks: &mut [D],
    options: BlitOptions,
) -> Result<BlitReport>
where
    S: FrameSource + ?Sized,
    D: FrameSink,
{
    let mut cursor = FrameCursor::new(layout.frames());
    blit_from(&mut cursor, layout, source, sinks, options)
}

/// Continue a blit at `cursor.next_frame()`. The cursor advances after each
/// fully written frame, also when a later frame fails.
pub fn blit_from<S, D>(
    cursor: &mut FrameCursor,
    layout: &ResolvedLayout,
    source: &mut S,
    sinks: &mut [D],
    options: BlitOptions,
) -> Result<BlitReport>
where
    S: FrameSource + ?Sized,
    D: FrameSink,
{
    check_destinations(layout, &*source, sinks)?;
    if cursor.frames() != layout.frames() {
        return Err(RetileError::Layout(format!(
            "cursor covers {} frames, stream has {}",
            cursor.frames(),
            layout.frames()
        )));
    }

    let start = Instant::now();
    let start_frame = cursor.next_frame();
    let dtype = source.dtype();
    let global = layout.global;
    let mut frame_buf = FrameBuf::new(dtype, global.slow, global.fast);
    let mut slabs: Vec<FrameBuf> = layout
        .groups
        .iter()
        .map(|g| {
            let shape = g.shape(layout.frames());
            FrameBuf::new(dtype, shape.slow, shape.fast)
        })
        .collect();

    while !cursor.is_complete() {
        let frame = cursor.next_frame();
        source.read_frame(frame, frame_buf.as_bytes_mut())?;
        write_groups(layout, &frame_buf, &mut slabs, sinks, frame, options.parallel)?;
        cursor.advance();
        debug!("blit: frame {}/{} done", frame + 1, layout.frames());
    }

    let frames_written = cursor.next_frame() - start_frame;
    let per_frame: u64 = slabs.iter().map(|s| s.data.len() as u64).sum();
    Ok(BlitReport {
        frames_written,
        groups: layout.groups.len(),
        tasks: frames_written * layout.geometry.module_count(),
        bytes_copied: per_frame * frames_written as u64,
        elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
        cursor: *cursor,
    })
}

fn write_groups<D: FrameSink>(
    layout: &ResolvedLayout,
    frame_buf: &FrameBuf,
    slabs: &mut [FrameBuf],
    sinks: &mut [D],
    frame: usize,
    parallel: bool,
) -> Result<()> {
    #[cfg(feature = "parallel")]
    {
        if parallel {
            return layout
                .groups
                .par_iter()
                .zip(slabs.par_iter_mut())
                .zip(sinks.par_iter_mut())
                .try_for_each(|((group, slab), sink)| {
                    write_group(group, frame_buf, slab, sink, frame)
                });
        }
    }
    #[cfg(not(feature = "parallel"))]
    {
        let _ = parallel;
    }
    layout
        .groups
        .iter()
        .zip(slabs.iter_mut())
        .zip(sinks.iter_mut())
        .try_for_each(|((group, slab), sink)| write_group(group, frame_buf, slab, sink, frame))
}

fn write_group<D: FrameSink>(
    group: &OutputGroup,
    frame_buf: &FrameBuf,
    slab: &mut FrameBuf,
    sink: &mut D,
    frame: usize,
) -> Result<()> {
    for task in group_tasks(group, frame) {
        slab.copy_rect_from(frame_buf, task.source, task.dest_slow, 0);
    }
    sink.write_frame(frame, &slab.data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{resolve, DetectorGeometry, GroupMap};
    use crate::storage::MemoryDataset;
    use crate::types::{Dtype, Shape3};

    fn geometry(group_map: GroupMap) -> DetectorGeometry {
        DetectorGeometry {
            module_fast: 4,
            module_slow: 3,
            gap_fast: 2,
            gap_slow: 1,
            grid_fast: 2,
            grid_slow: 2,
            group_map,
        }
    }

    fn encoded(frame: usize, slow: usize, fast: usize) -> i64 {
        (frame * 10_000 + slow * 100 + fast) as i64
    }

    fn sinks_for(layout: &ResolvedLayout, dtype: Dtype) -> Vec<MemoryDataset> {
        layout
            .group_shapes()
            .into_iter()
            .enumerate()
            .map(|(i, shape)| MemoryDataset::new(shape, dtype).with_name(format!("group {i}")))
            .collect()
    }

    #[test]
    fn stacked_group_receives_modules_in_map_order() {
        let g = geometry(GroupMap::Explicit(vec![vec![3, 0], vec![1, 2]]));
        let shape = g.global_shape(2);
        let layout = resolve(&g, shape).unwrap();
        let mut source = MemoryDataset::from_fn(shape, Dtype::U32, encoded);
        let mut sinks = sinks_for(&layout, Dtype::U32);

        let report = blit(&layout, &mut source, &mut sinks, BlitOptions::default()).unwrap();
        assert_eq!(report.frames_written, 2);
        assert!(report.cursor.is_complete());

        let p3 = g.module_placement(3);
        // slab 0 of group 0 is module 3, slab 1 is module 0
        assert_eq!(
            sinks[0].pixel(1, 0, 0),
            encoded(1, p3.slow_offset, p3.fast_offset)
        );
        assert_eq!(sinks[0].pixel(1, 3 + 2, 1), encoded(1, 2, 1));
        let p2 = g.module_placement(2);
        assert_eq!(
            sinks[1].pixel(0, 3 + 1, 3),
            encoded(0, p2.slow_offset + 1, p2.fast_offset + 3)
        );
    }

    #[test]
    fn sequential_and_parallel_agree() {
        let g = geometry(GroupMap::PerModule);
        let shape = g.global_shape(3);
        let layout = resolve(&g, shape).unwrap();
        let mut source = MemoryDataset::from_fn(shape, Dtype::U16, encoded);

        let mut a = sinks_for(&layout, Dtype::U16);
        let mut b = sinks_for(&layout, Dtype::U16);
        blit(&layout, &mut source, &mut a, BlitOptions { parallel: false }).unwrap();
        blit(&layout, &mut source, &mut b, BlitOptions { parallel: true }).unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.as_bytes(), y.as_bytes());
        }
    }

    #[test]
    fn wrong_destination_shape_fails_before_copy() {
        let g = geometry(GroupMap::PerModule);
        let shape = g.global_shape(2);
        let layout = resolve(&g, shape).unwrap();
        let mut source = MemoryDataset::from_fn(shape, Dtype::U16, |_, _, _| 7);
        let mut sinks = sinks_for(&layout, Dtype::U16);
        sinks[2] = MemoryDataset::new(Shape3::new(2, 3, 5), Dtype::U16);

        let err = blit(&layout, &mut source, &mut sinks, BlitOptions::default()).unwrap_err();
        assert!(matches!(err, RetileError::ShapeMismatch { .. }));
        assert!(sinks[0].as_bytes().iter().all(|&b| b == 0));

        let mut sinks = sinks_for(&layout, Dtype::U16);
        sinks[1] = MemoryDataset::new(layout.groups[1].shape(2), Dtype::I16);
        let err = blit(&layout, &mut source, &mut sinks, BlitOptions::default()).unwrap_err();
        assert!(matches!(err, RetileError::DtypeMismatch { .. }));
    }

    /// Destination whose writes fail from frame `fail_at` on.
    struct FailingSink {
        inner: MemoryDataset,
        fail_at: usize,
    }

    impl FrameSink for FailingSink {
        fn shape(&self) -> Shape3 {
            self.inner.shape()
        }

        fn dtype(&self) -> Dtype {
            self.inner.dtype()
        }

        fn attributes_mut(&mut self) -> &mut crate::storage::Attributes {
            self.inner.attributes_mut()
        }

        fn write_frame(&mut self, frame: usize, data: &[u8]) -> Result<()> {
            if frame >= self.fail_at {
                return Err(RetileError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("disk full at frame {frame}"),
                )));
            }
            FrameSink::write_frame(&mut self.inner, frame, data)
        }
    }

    fn failing_sinks(layout: &ResolvedLayout, failing_group: usize, k: usize) -> Vec<FailingSink> {
        sinks_for(layout, Dtype::U16)
            .into_iter()
            .enumerate()
            .map(|(i, inner)| FailingSink {
                inner,
                fail_at: if i == failing_group { k } else { usize::MAX },
            })
            .collect()
    }

    #[test]
    fn failed_write_leaves_cursor_at_failing_frame() {
        let g = geometry(GroupMap::PerModule);
        let shape = g.global_shape(5);
        let layout = resolve(&g, shape).unwrap();
        let mut source = MemoryDataset::from_fn(shape, Dtype::U16, encoded);
        let k = 3;

        for parallel in [false, true] {
            let mut sinks = failing_sinks(&layout, 2, k);
            let mut cursor = FrameCursor::new(5);
            let err = blit_from(
                &mut cursor,
                &layout,
                &mut source,
                &mut sinks,
                BlitOptions { parallel },
            )
            .unwrap_err();
            assert!(matches!(err, RetileError::Io(_)), "parallel={parallel}");
            assert_eq!(cursor.next_frame(), k, "parallel={parallel}");
            assert!(!cursor.is_complete());

            // every group holds the complete prefix [0, k)
            for (group, sink) in layout.groups.iter().zip(&sinks) {
                let p = g.module_placement(group.placements[0].module);
                for frame in 0..k {
                    assert_eq!(
                        sink.inner.pixel(frame, 1, 2),
                        encoded(frame, p.slow_offset + 1, p.fast_offset + 2)
                    );
                }
            }
            let untouched = &sinks[0].inner;
            assert_eq!(untouched.pixel(k + 1, 1, 2), 0);

            // resuming from the cursor finishes the stream once the sink recovers
            for sink in &mut sinks {
                sink.fail_at = usize::MAX;
            }
            let report = blit_from(
                &mut cursor,
                &layout,
                &mut source,
                &mut sinks,
                BlitOptions { parallel },
            )
            .unwrap();
            assert_eq!(report.frames_written, 5 - k);
            assert!(cursor.is_complete());
        }
    }

    #[test]
    fn cursor_resumes_after_completed_frames() {
        let g = geometry(GroupMap::PerModule);
        let shape = g.global_shape(4);
        let layout = resolve(&g, shape).unwrap();
        let mut source = MemoryDataset::from_fn(shape, Dtype::I32, encoded);
        let mut sinks = sinks_for(&layout, Dtype::I32);

        let mut cursor = FrameCursor::resume_at(4, 2);
        let report = blit_from(
            &mut cursor,
            &layout,
            &mut source,
            &mut sinks,
            BlitOptions::default(),
        )
        .unwrap();
        assert_eq!(report.frames_written, 2);
        assert_eq!(cursor.next_frame(), 4);
        assert_eq!(sinks[0].pixel(1, 0, 0), 0);
        assert_eq!(sinks[0].pixel(2, 0, 0), encoded(2, 0, 0));
    }
}
