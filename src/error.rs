//! Error types shared by every stage of the re-tiling pipeline.

use crate::types::{Dtype, Shape3};
use std::path::PathBuf;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, RetileError>;

/// Failures detected while validating a detector geometry or matching it
/// against a source stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("geometry field `{field}` must be positive")]
    NonPositive { field: &'static str },
    #[error("source shape {found} does not match the geometry, expected {expected}")]
    SourceShape { expected: Shape3, found: Shape3 },
    #[error("group {group} references module {module}, but the grid has {count} modules")]
    ModuleOutOfRange {
        group: usize,
        module: usize,
        count: usize,
    },
    #[error("module {module} is assigned more than once")]
    DuplicateModule { module: usize },
    #[error("module {module} is not assigned to any group")]
    UnassignedModule { module: usize },
    #[error("group {group} is empty")]
    EmptyGroup { group: usize },
    #[error("unknown detector preset `{0}`")]
    UnknownPreset(String),
}

#[derive(Error, Debug)]
pub enum RetileError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error("shape mismatch for {artifact}: expected {expected}, found {found}")]
    ShapeMismatch {
        artifact: String,
        expected: Shape3,
        found: Shape3,
    },

    #[error("dtype mismatch for {artifact}: expected {expected}, found {found}")]
    DtypeMismatch {
        artifact: String,
        expected: Dtype,
        found: Dtype,
    },

    #[error("artifact already exists: {}", .0.display())]
    ArtifactExists(PathBuf),

    #[error("layout error: {0}")]
    Layout(String),

    #[error("attribute `{0}` missing")]
    AttributeMissing(String),

    #[error("frame {frame} out of range for {frames} frames")]
    FrameOutOfRange { frame: usize, frames: usize },

    #[error("invalid dataset file {}: {reason}", .path.display())]
    Format { path: PathBuf, reason: String },

    #[error("hdf5: {0}")]
    Hdf5(#[from] hdf5::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl RetileError {
    pub(crate) fn format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        RetileError::Format {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
