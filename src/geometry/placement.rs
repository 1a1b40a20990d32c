use super::DetectorGeometry;
use serde::{Deserialize, Serialize};

/// Half-open axis-aligned rectangle `[slow0, slow1) x [fast0, fast1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub slow0: usize,
    pub slow1: usize,
    pub fast0: usize,
    pub fast1: usize,
}

impl Rect {
    #[inline]
    pub fn new(slow0: usize, fast0: usize, height: usize, width: usize) -> Self {
        Self {
            slow0,
            slow1: slow0 + height,
            fast0,
            fast1: fast0 + width,
        }
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.slow1.saturating_sub(self.slow0)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.fast1.saturating_sub(self.fast0)
    }

    #[inline]
    pub fn area(&self) -> usize {
        self.height() * self.width()
    }

    #[inline]
    pub fn contains(&self, slow: usize, fast: usize) -> bool {
        slow >= self.slow0 && slow < self.slow1 && fast >= self.fast0 && fast < self.fast1
    }

    #[inline]
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.slow0 < other.slow1
            && other.slow0 < self.slow1
            && self.fast0 < other.fast1
            && other.fast0 < self.fast1
    }

    /// True when the rectangle lies within a `slow x fast` frame.
    #[inline]
    pub fn fits(&self, slow: usize, fast: usize) -> bool {
        self.slow1 <= slow && self.fast1 <= fast
    }
}

/// Where one module lives in the global frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModulePlacement {
    pub module: usize,
    pub slow_offset: usize,
    pub fast_offset: usize,
    pub rect: Rect,
}

impl ModulePlacement {
    pub fn of(geometry: &DetectorGeometry, module: usize) -> Self {
        let slow_idx = module / geometry.grid_fast;
        let fast_idx = module % geometry.grid_fast;
        let fast_offset = fast_idx * (geometry.module_fast + geometry.gap_fast);
        let slow_offset = slow_idx * (geometry.module_slow + geometry.gap_slow);
        Self {
            module,
            slow_offset,
            fast_offset,
            rect: Rect::new(
                slow_offset,
                fast_offset,
                geometry.module_slow,
                geometry.module_fast,
            ),
        }
    }
}
