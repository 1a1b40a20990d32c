//! Composite (virtual) layout: a table mapping rectangles of the global frame
//! onto rectangles of the physical group artifacts.
//!
//! The table owns no pixels. [`VirtualView`] answers reads against the global
//! shape by translating each mapped rectangle to its artifact and slab, and
//! returns the fill value everywhere else (module gaps). The composite is
//! always signed 32-bit so that the `-1` gap sentinel never collides with a
//! detector count.

pub mod view;

pub use view::{VirtualDataset, VirtualView};

use crate::error::{Result, RetileError};
use crate::geometry::{Rect, ResolvedLayout};
use crate::storage::{create_exclusive, Attributes, DEFAULT_DATASET};
use crate::types::{Dtype, Shape3};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Marker stored in every composite descriptor.
pub const LAYOUT_FORMAT: &str = "module-retile/virtual-layout-1";

/// Default value returned for unmapped (gap) pixels.
pub const DEFAULT_FILL_VALUE: i64 = -1;

/// Pixel type every composite is read as, whatever the artifacts store.
pub const COMPOSITE_DTYPE: Dtype = Dtype::I32;

/// A physical artifact referenced by the layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    /// Path of the artifact, relative to the descriptor's directory unless
    /// absolute.
    pub path: PathBuf,
    pub dataset: String,
    pub shape: Shape3,
    /// Pixel type stored in the artifact.
    pub dtype: Dtype,
}

/// `global` rectangle of every frame reads from `local` rectangle of the same
/// frame in artifact `source`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionMapping {
    pub source: usize,
    pub module: usize,
    pub global: Rect,
    pub local: Rect,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualLayout {
    pub format: String,
    pub name: String,
    pub shape: Shape3,
    pub dtype: Dtype,
    pub fill_value: i64,
    pub sources: Vec<ArtifactRef>,
    pub mappings: Vec<RegionMapping>,
    #[serde(default)]
    pub attributes: Attributes,
}

/// Build the composite layout for `layout`, one mapping per constituent
/// module. `artifacts[i]` must be the artifact written for group `i`.
/// `fill_value` is clamped into the composite's `i32` range.
pub fn compose(
    layout: &ResolvedLayout,
    artifacts: &[ArtifactRef],
    fill_value: i64,
) -> Result<VirtualLayout> {
    if artifacts.len() != layout.groups.len() {
        return Err(RetileError::Layout(format!(
            "{} artifacts supplied for {} groups",
            artifacts.len(),
            layout.groups.len()
        )));
    }

    let mut mappings = Vec::with_capacity(layout.geometry.module_count());
    for (group, artifact) in layout.groups.iter().zip(artifacts) {
        let expected = group.shape(layout.frames());
        if artifact.shape != expected {
            return Err(RetileError::Layout(format!(
                "artifact {} declares shape {}, group {} requires {}",
                artifact.path.display(),
                artifact.shape,
                group.index,
                expected
            )));
        }
        for (k, placement) in group.placements.iter().enumerate() {
            mappings.push(RegionMapping {
                source: group.index,
                module: placement.module,
                global: placement.rect,
                local: group.slab(k),
            });
        }
    }

    let composite = VirtualLayout {
        format: LAYOUT_FORMAT.to_string(),
        name: DEFAULT_DATASET.to_string(),
        shape: layout.global,
        dtype: COMPOSITE_DTYPE,
        fill_value: COMPOSITE_DTYPE.saturate(fill_value),
        sources: artifacts.to_vec(),
        mappings,
        attributes: Attributes::new(),
    };
    composite.validate()?;
    Ok(composite)
}

impl VirtualLayout {
    /// Check that every mapping is in bounds on both ends, keeps its extent
    /// and that no two mappings claim the same global pixel.
    pub fn validate(&self) -> Result<()> {
        if self.format != LAYOUT_FORMAT {
            return Err(RetileError::Layout(format!(
                "unsupported layout format `{}`",
                self.format
            )));
        }
        if self.dtype != COMPOSITE_DTYPE {
            return Err(RetileError::Layout(format!(
                "composite dtype {} is not {COMPOSITE_DTYPE}",
                self.dtype
            )));
        }
        for (i, m) in self.mappings.iter().enumerate() {
            let source = self.sources.get(m.source).ok_or_else(|| {
                RetileError::Layout(format!("mapping {i} references missing source {}", m.source))
            })?;
            if source.shape.frames != self.shape.frames {
                return Err(RetileError::Layout(format!(
                    "source {} has {} frames, layout has {}",
                    source.path.display(),
                    source.shape.frames,
                    self.shape.frames
                )));
            }
            if !m.global.fits(self.shape.slow, self.shape.fast) {
                return Err(RetileError::Layout(format!(
                    "mapping {i} leaves the global frame"
                )));
            }
            if !m.local.fits(source.shape.slow, source.shape.fast) {
                return Err(RetileError::Layout(format!(
                    "mapping {i} leaves source {}",
                    source.path.display()
                )));
            }
            if m.global.height() != m.local.height() || m.global.width() != m.local.width() {
                return Err(RetileError::Layout(format!(
                    "mapping {i} changes extent between global and local rectangles"
                )));
            }
            if let Some(j) = self.mappings[..i]
                .iter()
                .position(|other| other.global.overlaps(&m.global))
            {
                return Err(RetileError::Layout(format!(
                    "mappings {j} and {i} overlap"
                )));
            }
        }
        Ok(())
    }

    /// Address translation: which mapping serves global pixel `(slow, fast)`
    /// and where inside its source rectangle the pixel lives.
    pub fn locate(&self, slow: usize, fast: usize) -> Option<(usize, usize, usize)> {
        self.mappings
            .iter()
            .position(|m| m.global.contains(slow, fast))
            .map(|i| {
                let m = &self.mappings[i];
                (
                    i,
                    m.local.slow0 + (slow - m.global.slow0),
                    m.local.fast0 + (fast - m.global.fast0),
                )
            })
    }

    /// Pixels per frame that resolve to an artifact.
    pub fn mapped_pixels(&self) -> usize {
        self.mappings.iter().map(|m| m.global.area()).sum()
    }

    /// Write the descriptor as JSON; an existing file is an error.
    pub fn write(&self, path: &Path) -> Result<()> {
        let file = create_exclusive(path)?;
        let mut out = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut out, self)?;
        out.flush()?;
        info!(
            "composite {} -> {} sources, {} mappings, fill={}",
            path.display(),
            self.sources.len(),
            self.mappings.len(),
            self.fill_value
        );
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let layout: VirtualLayout = serde_json::from_slice(&bytes)
            .map_err(|e| RetileError::format(path, format!("not a composite descriptor: {e}")))?;
        layout.validate()?;
        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{resolve, DetectorGeometry, DetectorPreset, GroupMap};

    fn artifacts_for(layout: &ResolvedLayout) -> Vec<ArtifactRef> {
        layout
            .groups
            .iter()
            .map(|g| ArtifactRef {
                path: PathBuf::from(format!("out_{:02}.h5", g.index)),
                dataset: "data".to_string(),
                shape: g.shape(layout.frames()),
                dtype: Dtype::U32,
            })
            .collect()
    }

    #[test]
    fn quad_layout_inverts_slow_stacking() {
        let geometry = DetectorGeometry::preset(DetectorPreset::Eiger2_16mQuad);
        let resolved = resolve(&geometry, geometry.global_shape(2)).unwrap();
        let composite = compose(&resolved, &artifacts_for(&resolved), -1).unwrap();
        assert_eq!(composite.mappings.len(), 32);

        // group 0 is stacked [0, 1, 4, 5], so module 5 lives in slab 3
        let p5 = geometry.module_placement(5);
        let (i, ls, lf) = composite.locate(p5.slow_offset + 7, p5.fast_offset + 9).unwrap();
        assert_eq!(composite.mappings[i].source, 0);
        assert_eq!(composite.mappings[i].module, 5);
        assert_eq!((ls, lf), (3 * 512 + 7, 9));

        let p4 = geometry.module_placement(4);
        let (_, ls, _) = composite.locate(p4.slow_offset, p4.fast_offset).unwrap();
        assert_eq!(ls, 2 * 512);

        assert!(composite.locate(512, 0).is_none());
        assert!(composite.locate(0, 1028).is_none());
    }

    #[test]
    fn compose_rejects_wrong_artifact_shape() {
        let geometry = DetectorGeometry {
            module_fast: 4,
            module_slow: 2,
            gap_fast: 1,
            gap_slow: 1,
            grid_fast: 2,
            grid_slow: 1,
            group_map: GroupMap::PerModule,
        };
        let resolved = resolve(&geometry, geometry.global_shape(3)).unwrap();
        let mut artifacts = artifacts_for(&resolved);
        artifacts[1].shape.slow += 1;
        let err = compose(&resolved, &artifacts, -1).unwrap_err();
        assert!(matches!(err, RetileError::Layout(_)));

        let err = compose(&resolved, &artifacts[..1], -1).unwrap_err();
        assert!(matches!(err, RetileError::Layout(_)));
    }

    #[test]
    fn validate_catches_overlap() {
        let geometry = DetectorGeometry::preset(DetectorPreset::Eiger2_9m);
        let resolved = resolve(&geometry, geometry.global_shape(1)).unwrap();
        let mut composite = compose(&resolved, &artifacts_for(&resolved), -1).unwrap();
        composite.mappings[1].global = composite.mappings[0].global;
        assert!(matches!(composite.validate(), Err(RetileError::Layout(_))));
    }

    #[test]
    fn composite_is_signed_whatever_the_artifacts_store() {
        let geometry = DetectorGeometry::preset(DetectorPreset::Eiger2_9m);
        let resolved = resolve(&geometry, geometry.global_shape(1)).unwrap();
        let mut composite = compose(&resolved, &artifacts_for(&resolved), -1).unwrap();
        assert_eq!(composite.dtype, Dtype::I32);
        assert_eq!(composite.fill_value, -1);
        assert!(composite.sources.iter().all(|s| s.dtype == Dtype::U32));

        composite.dtype = Dtype::U32;
        assert!(matches!(composite.validate(), Err(RetileError::Layout(_))));
    }

    #[test]
    fn descriptor_round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("composite.h5");
        let geometry = DetectorGeometry::preset(DetectorPreset::Eiger2_9m);
        let resolved = resolve(&geometry, geometry.global_shape(4)).unwrap();
        let mut composite = compose(&resolved, &artifacts_for(&resolved), -1).unwrap();
        composite.attributes.set("image_nr_low", 1);
        composite.write(&path).unwrap();
        assert_eq!(VirtualLayout::read(&path).unwrap(), composite);
        assert!(matches!(
            composite.write(&path),
            Err(RetileError::ArtifactExists(_))
        ));
        assert_eq!(composite.mapped_pixels(), 18 * 512 * 1028);
    }
}
