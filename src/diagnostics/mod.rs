//! Run reports. Everything here serializes to camelCase JSON so the CLI tools
//! can drop a machine-readable summary next to their outputs.

pub mod timing;

pub use timing::{StageTiming, TimingBreakdown};

use crate::blit::BlitReport;
use crate::types::{Dtype, Shape3};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One physical artifact written by a split.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactSummary {
    pub group: usize,
    pub path: PathBuf,
    pub modules: Vec<usize>,
    pub shape: Shape3,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitReport {
    /// Description of the split stream, the input path for file splits.
    pub input: String,
    pub output: PathBuf,
    pub frames: usize,
    pub dtype: Dtype,
    pub global_shape: Shape3,
    pub artifacts: Vec<ArtifactSummary>,
    pub fill_value: i64,
    pub attributes_copied: usize,
    pub blit: BlitReport,
    pub timing: TimingBreakdown,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepackReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub shape: Shape3,
    pub dtype: Dtype,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub attributes_copied: usize,
    pub timing: TimingBreakdown,
}

impl RepackReport {
    /// Raw bytes per stored byte.
    pub fn compression_ratio(&self) -> f64 {
        if self.bytes_out == 0 {
            return 0.0;
        }
        self.bytes_in as f64 / self.bytes_out as f64
    }
}
