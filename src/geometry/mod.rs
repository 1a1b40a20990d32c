//! Detector geometry: module extents, inter-module gaps, grid size and the
//! assignment of modules to output groups.
//!
//! Coordinates
//! - The global frame is `(slow, fast)` with the fast axis contiguous in memory.
//! - Module `n` sits at grid cell `(n / grid_fast, n % grid_fast)`, i.e. modules
//!   are numbered row-major starting at the top-left.
//! - Gaps exist only in the global frame; per-module data is gap free.
//!
//! The geometry is a plain configuration value. Everything downstream (blit,
//! composite layout) is derived from it through [`resolve`].

pub mod placement;
pub mod presets;
pub mod resolve;

pub use placement::{ModulePlacement, Rect};
pub use presets::DetectorPreset;
pub use resolve::{resolve, OutputGroup, ResolvedLayout};

use crate::error::GeometryError;
use crate::types::Shape3;
use serde::{Deserialize, Serialize};

/// Assignment of module indices to output groups.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupMap {
    /// One group per module, group index == module index.
    #[default]
    PerModule,
    /// Explicit groups; modules of a group are stacked along the slow axis in
    /// the listed order.
    Explicit(Vec<Vec<usize>>),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorGeometry {
    /// Module width in pixels (fast axis).
    pub module_fast: usize,
    /// Module height in pixels (slow axis).
    pub module_slow: usize,
    /// Gap between horizontally adjacent modules.
    pub gap_fast: usize,
    /// Gap between vertically adjacent modules.
    pub gap_slow: usize,
    /// Modules per row.
    pub grid_fast: usize,
    /// Module rows.
    pub grid_slow: usize,
    #[serde(default)]
    pub group_map: GroupMap,
}

impl DetectorGeometry {
    pub fn module_count(&self) -> usize {
        self.grid_fast * self.grid_slow
    }

    pub fn global_fast(&self) -> usize {
        self.grid_fast * self.module_fast + self.grid_fast.saturating_sub(1) * self.gap_fast
    }

    pub fn global_slow(&self) -> usize {
        self.grid_slow * self.module_slow + self.grid_slow.saturating_sub(1) * self.gap_slow
    }

    /// Shape a source stream of `frames` frames must have.
    pub fn global_shape(&self, frames: usize) -> Shape3 {
        Shape3::new(frames, self.global_slow(), self.global_fast())
    }

    /// Module indices per output group, in stacking order.
    pub fn group_members(&self) -> Vec<Vec<usize>> {
        match &self.group_map {
            GroupMap::PerModule => (0..self.module_count()).map(|n| vec![n]).collect(),
            GroupMap::Explicit(groups) => groups.clone(),
        }
    }

    pub fn group_count(&self) -> usize {
        match &self.group_map {
            GroupMap::PerModule => self.module_count(),
            GroupMap::Explicit(groups) => groups.len(),
        }
    }

    /// Placement of module `n` in global coordinates.
    pub fn module_placement(&self, module: usize) -> ModulePlacement {
        ModulePlacement::of(self, module)
    }

    /// All module placements in row-major module order.
    pub fn placements(&self) -> impl Iterator<Item = ModulePlacement> + '_ {
        (0..self.module_count()).map(move |n| self.module_placement(n))
    }

    /// Check extents and that the group map partitions `[0, module_count)`.
    pub fn validate(&self) -> Result<(), GeometryError> {
        let fields = [
            ("module_fast", self.module_fast),
            ("module_slow", self.module_slow),
            ("gap_fast", self.gap_fast),
            ("gap_slow", self.gap_slow),
            ("grid_fast", self.grid_fast),
            ("grid_slow", self.grid_slow),
        ];
        for (field, value) in fields {
            if value == 0 {
                return Err(GeometryError::NonPositive { field });
            }
        }
        if let GroupMap::Explicit(groups) = &self.group_map {
            validate_partition(groups, self.module_count())?;
        }
        Ok(())
    }
}

fn validate_partition(groups: &[Vec<usize>], count: usize) -> Result<(), GeometryError> {
    let mut seen = vec![false; count];
    for (group, members) in groups.iter().enumerate() {
        if members.is_empty() {
            return Err(GeometryError::EmptyGroup { group });
        }
        for &module in members {
            if module >= count {
                return Err(GeometryError::ModuleOutOfRange {
                    group,
                    module,
                    count,
                });
            }
            if std::mem::replace(&mut seen[module], true) {
                return Err(GeometryError::DuplicateModule { module });
            }
        }
    }
    match seen.iter().position(|&assigned| !assigned) {
        Some(module) => Err(GeometryError::UnassignedModule { module }),
        None => Ok(()),
    }
}
