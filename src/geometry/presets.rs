//! Named detector geometries.

use super::{DetectorGeometry, GroupMap};
use crate::error::GeometryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const EIGER2_MODULE_FAST: usize = 1028;
const EIGER2_MODULE_SLOW: usize = 512;
const EIGER2_GAP_FAST: usize = 12;
const EIGER2_GAP_SLOW: usize = 38;

/// 32 modules of a 4x8 grid arranged as eight 2x2 blocks; each block is
/// stored top-left, top-right, bottom-left, bottom-right.
const EIGER2_16M_QUADS: [[usize; 4]; 8] = [
    [0, 1, 4, 5],
    [2, 3, 6, 7],
    [8, 9, 12, 13],
    [10, 11, 14, 15],
    [16, 17, 20, 21],
    [18, 19, 22, 23],
    [24, 25, 28, 29],
    [26, 27, 30, 31],
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectorPreset {
    /// 3 x 6 modules, one artifact per module.
    #[serde(rename = "eiger2-9m")]
    Eiger2_9m,
    /// 4 x 8 modules, one artifact per module.
    #[serde(rename = "eiger2-16m")]
    Eiger2_16m,
    /// 4 x 8 modules, eight artifacts of 2 x 2 modules stacked along slow.
    #[serde(rename = "eiger2-16m-quad")]
    Eiger2_16mQuad,
}

impl DetectorPreset {
    pub const ALL: [DetectorPreset; 3] = [
        DetectorPreset::Eiger2_9m,
        DetectorPreset::Eiger2_16m,
        DetectorPreset::Eiger2_16mQuad,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DetectorPreset::Eiger2_9m => "eiger2-9m",
            DetectorPreset::Eiger2_16m => "eiger2-16m",
            DetectorPreset::Eiger2_16mQuad => "eiger2-16m-quad",
        }
    }
}

impl fmt::Display for DetectorPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DetectorPreset {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| GeometryError::UnknownPreset(s.to_string()))
    }
}

impl DetectorGeometry {
    pub fn preset(preset: DetectorPreset) -> Self {
        let (grid_fast, grid_slow, group_map) = match preset {
            DetectorPreset::Eiger2_9m => (3, 6, GroupMap::PerModule),
            DetectorPreset::Eiger2_16m => (4, 8, GroupMap::PerModule),
            DetectorPreset::Eiger2_16mQuad => (
                4,
                8,
                GroupMap::Explicit(EIGER2_16M_QUADS.iter().map(|q| q.to_vec()).collect()),
            ),
        };
        Self {
            module_fast: EIGER2_MODULE_FAST,
            module_slow: EIGER2_MODULE_SLOW,
            gap_fast: EIGER2_GAP_FAST,
            gap_slow: EIGER2_GAP_SLOW,
            grid_fast,
            grid_slow,
            group_map,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid_partitions() {
        for preset in DetectorPreset::ALL {
            let geometry = DetectorGeometry::preset(preset);
            assert!(geometry.validate().is_ok(), "{preset} failed validation");
        }
    }

    #[test]
    fn preset_names_round_trip() {
        for preset in DetectorPreset::ALL {
            assert_eq!(preset.name().parse::<DetectorPreset>().unwrap(), preset);
        }
        assert!("eiger1".parse::<DetectorPreset>().is_err());
    }

    #[test]
    fn nine_megapixel_extent() {
        let g = DetectorGeometry::preset(DetectorPreset::Eiger2_9m);
        assert_eq!(g.global_slow(), 6 * 512 + 5 * 38);
        assert_eq!(g.global_fast(), 3 * 1028 + 2 * 12);
        assert_eq!(g.group_count(), 18);
    }
}
