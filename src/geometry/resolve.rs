//! Geometry resolution: from a validated [`DetectorGeometry`] and the declared
//! source shape to the ordered list of output groups.

use super::{DetectorGeometry, ModulePlacement, Rect};
use crate::error::GeometryError;
use crate::types::Shape3;
use log::debug;

/// One physical artifact: its constituent modules in stacking order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputGroup {
    pub index: usize,
    pub placements: Vec<ModulePlacement>,
    module_slow: usize,
    module_fast: usize,
}

impl OutputGroup {
    /// Artifact shape: constituent modules stacked along the slow axis.
    pub fn shape(&self, frames: usize) -> Shape3 {
        Shape3::new(
            frames,
            self.placements.len() * self.module_slow,
            self.module_fast,
        )
    }

    /// Rows of the artifact frame holding constituent `k`.
    pub fn slab(&self, k: usize) -> Rect {
        Rect::new(k * self.module_slow, 0, self.module_slow, self.module_fast)
    }

    pub fn modules(&self) -> impl Iterator<Item = usize> + '_ {
        self.placements.iter().map(|p| p.module)
    }
}

/// Geometry matched against a concrete source stream.
#[derive(Clone, Debug)]
pub struct ResolvedLayout {
    pub geometry: DetectorGeometry,
    pub global: Shape3,
    pub groups: Vec<OutputGroup>,
}

impl ResolvedLayout {
    #[inline]
    pub fn frames(&self) -> usize {
        self.global.frames
    }

    /// Expected artifact shape for every group, in group order.
    pub fn group_shapes(&self) -> Vec<Shape3> {
        self.groups
            .iter()
            .map(|g| g.shape(self.global.frames))
            .collect()
    }
}

/// Resolve output groups for a source stream of shape `source`.
///
/// Fails when the geometry is invalid or when `source` does not have the
/// `(frames, global_slow, global_fast)` extent the geometry implies.
pub fn resolve(
    geometry: &DetectorGeometry,
    source: Shape3,
) -> Result<ResolvedLayout, GeometryError> {
    geometry.validate()?;
    let expected = geometry.global_shape(source.frames);
    if expected != source {
        return Err(GeometryError::SourceShape {
            expected,
            found: source,
        });
    }

    let groups: Vec<OutputGroup> = geometry
        .group_members()
        .into_iter()
        .enumerate()
        .map(|(index, members)| OutputGroup {
            index,
            placements: members
                .into_iter()
                .map(|module| geometry.module_placement(module))
                .collect(),
            module_slow: geometry.module_slow,
            module_fast: geometry.module_fast,
        })
        .collect();

    debug!(
        "resolve: global={} modules={} groups={}",
        expected,
        geometry.module_count(),
        groups.len()
    );

    Ok(ResolvedLayout {
        geometry: geometry.clone(),
        global: expected,
        groups,
    })
}
