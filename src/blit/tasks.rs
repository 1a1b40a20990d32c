//! Lazy enumeration of rectangle copies.
//!
//! A blit is a frame-major sequence of [`CopyTask`]s: every task of frame `k`
//! precedes every task of frame `k + 1`. Within a frame, tasks of different
//! groups touch disjoint destinations and may run in any order.

use crate::geometry::{OutputGroup, Rect, ResolvedLayout};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CopyTask {
    pub frame: usize,
    pub group: usize,
    /// Position of the module inside its group's slow-axis stack.
    pub slab: usize,
    pub module: usize,
    /// Rectangle of the global frame to read.
    pub source: Rect,
    /// First destination row inside the group artifact frame.
    pub dest_slow: usize,
}

/// Tasks filling one group's artifact frame.
pub fn group_tasks(group: &OutputGroup, frame: usize) -> impl Iterator<Item = CopyTask> + '_ {
    group
        .placements
        .iter()
        .enumerate()
        .map(move |(slab, placement)| CopyTask {
            frame,
            group: group.index,
            slab,
            module: placement.module,
            source: placement.rect,
            dest_slow: group.slab(slab).slow0,
        })
}

/// Every task of frame `frame`, group by group.
pub fn frame_tasks(layout: &ResolvedLayout, frame: usize) -> impl Iterator<Item = CopyTask> + '_ {
    layout
        .groups
        .iter()
        .flat_map(move |group| group_tasks(group, frame))
}

/// Every task from `start_frame` to the end of the stream.
pub fn copy_tasks_from(
    layout: &ResolvedLayout,
    start_frame: usize,
) -> impl Iterator<Item = CopyTask> + '_ {
    (start_frame..layout.frames()).flat_map(move |frame| frame_tasks(layout, frame))
}

pub fn copy_tasks(layout: &ResolvedLayout) -> impl Iterator<Item = CopyTask> + '_ {
    copy_tasks_from(layout, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{resolve, DetectorGeometry, DetectorPreset};

    #[test]
    fn tasks_are_frame_major() {
        let geometry = DetectorGeometry::preset(DetectorPreset::Eiger2_16mQuad);
        let layout = resolve(&geometry, geometry.global_shape(3)).unwrap();
        let tasks: Vec<_> = copy_tasks(&layout).collect();
        assert_eq!(tasks.len(), 3 * 32);
        assert!(tasks.windows(2).all(|w| w[0].frame <= w[1].frame));

        let first_group: Vec<_> = tasks.iter().take(4).map(|t| (t.module, t.dest_slow)).collect();
        assert_eq!(first_group, vec![(0, 0), (1, 512), (4, 1024), (5, 1536)]);
    }

    #[test]
    fn resume_skips_completed_frames() {
        let geometry = DetectorGeometry::preset(DetectorPreset::Eiger2_9m);
        let layout = resolve(&geometry, geometry.global_shape(4)).unwrap();
        let tasks: Vec<_> = copy_tasks_from(&layout, 3).collect();
        assert_eq!(tasks.len(), 18);
        assert!(tasks.iter().all(|t| t.frame == 3));
    }
}
