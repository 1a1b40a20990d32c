//! End-to-end transforms over files.
//!
//! `split` runs the whole chain: resolve the geometry against the input,
//! create one artifact per group, blit, compose the composite descriptor and
//! copy provenance attributes. `repack` re-encodes a stream unchanged into a
//! single HDF5 file, chunked one frame per chunk and compressed.

use crate::blit::{blit_from, BlitOptions, FrameCursor};
use crate::diagnostics::{ArtifactSummary, RepackReport, SplitReport, TimingBreakdown};
use crate::error::{Result, RetileError};
use crate::geometry::{resolve, DetectorGeometry, ResolvedLayout};
use crate::layout::{compose, ArtifactRef, DEFAULT_FILL_VALUE};
use crate::metadata::propagate;
use crate::storage::{
    open_dataset, Compression, DatasetSpec, FrameSink, FrameSource, H5Writer, DEFAULT_DATASET,
};
use crate::types::Dtype;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitOptions {
    /// Dataset name inside every artifact and the composite.
    pub dataset: String,
    /// Chunk filters for every written artifact.
    pub compression: Compression,
    /// Value unmapped (gap) pixels read as through the composite.
    pub fill_value: i64,
    /// Also copy provenance attributes onto each physical artifact.
    pub attributes_on_artifacts: bool,
    pub blit: BlitOptions,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            dataset: DEFAULT_DATASET.to_string(),
            compression: Compression::default(),
            fill_value: DEFAULT_FILL_VALUE,
            attributes_on_artifacts: false,
            blit: BlitOptions::default(),
        }
    }
}

/// Path of artifact `index` for composite `output`: `<stem>_<NN>.<ext>` in the
/// same directory, zero-padded to at least two digits.
pub fn artifact_path(output: &Path, index: usize) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match output.extension() {
        Some(ext) => format!("{stem}_{index:02}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{index:02}"),
    };
    output.with_file_name(name)
}

/// Split `input` into per-group artifacts and write the composite to `output`.
pub fn split(
    input: &Path,
    output: &Path,
    geometry: &DetectorGeometry,
    options: &SplitOptions,
) -> Result<SplitReport> {
    let mut source = open_dataset(input)?;
    split_stream(&mut source, output, geometry, options)
}

/// [`split`] over an already opened stream.
///
/// When the blit fails part way, every artifact is still finished so frames
/// `[0, k)` stay readable, and the error is returned.
pub fn split_stream<S: FrameSource + ?Sized>(
    source: &mut S,
    output: &Path,
    geometry: &DetectorGeometry,
    options: &SplitOptions,
) -> Result<SplitReport> {
    let mut timing = TimingBreakdown::default();
    let shape = source.shape();
    let dtype = source.dtype();

    let layout = timing.time("resolve", || resolve(geometry, shape))?;
    info!(
        "split {} {} {} -> {} groups",
        source.describe(),
        shape,
        dtype,
        layout.groups.len()
    );

    let paths: Vec<PathBuf> = (0..layout.groups.len())
        .map(|i| artifact_path(output, i))
        .collect();
    preflight(output, &paths)?;

    let mut sinks = timing.time("create_artifacts", || {
        create_artifacts(&layout, &paths, dtype, options)
    })?;

    let mut cursor = FrameCursor::new(layout.frames());
    let blit_report = timing.time("blit", || {
        blit_from(&mut cursor, &layout, &mut *source, &mut sinks, options.blit)
    });
    let blit_report = match blit_report {
        Ok(report) => report,
        Err(err) => {
            warn!(
                "blit stopped: frames [0, {}) of {} are complete",
                cursor.next_frame(),
                cursor.frames()
            );
            for sink in &mut sinks {
                if let Err(e) = sink.finish() {
                    warn!("could not finish {}: {e}", sink.path().display());
                }
            }
            return Err(err);
        }
    };

    timing.time("finish_artifacts", || -> Result<()> {
        for sink in &mut sinks {
            if options.attributes_on_artifacts {
                propagate(source.attributes(), sink.attributes_mut());
            }
            sink.finish()?;
        }
        Ok(())
    })?;

    let refs: Vec<ArtifactRef> = layout
        .groups
        .iter()
        .zip(&paths)
        .map(|(group, path)| ArtifactRef {
            path: relative_to_composite(path),
            dataset: options.dataset.clone(),
            shape: group.shape(layout.frames()),
            dtype,
        })
        .collect();
    let mut composite = timing.time("compose", || compose(&layout, &refs, options.fill_value))?;
    composite.name = options.dataset.clone();

    let attributes_copied =
        timing.time("metadata", || propagate(source.attributes(), &mut composite.attributes));
    timing.time("write_composite", || composite.write(output))?;

    let artifacts = layout
        .groups
        .iter()
        .zip(paths)
        .map(|(group, path)| ArtifactSummary {
            group: group.index,
            path,
            modules: group.modules().collect(),
            shape: group.shape(layout.frames()),
        })
        .collect();

    Ok(SplitReport {
        input: source.describe(),
        output: output.to_path_buf(),
        frames: layout.frames(),
        dtype,
        global_shape: layout.global,
        artifacts,
        fill_value: composite.fill_value,
        attributes_copied,
        blit: blit_report,
        timing,
    })
}

/// Re-encode `input` frame by frame into one HDF5 file at `output`.
pub fn repack(input: &Path, output: &Path, options: &SplitOptions) -> Result<RepackReport> {
    let mut timing = TimingBreakdown::default();
    let mut source = open_dataset(input)?;
    let shape = source.shape();
    let dtype = source.dtype();

    let mut writer = H5Writer::create(
        output,
        DatasetSpec {
            name: options.dataset.clone(),
            shape,
            dtype,
            compression: options.compression,
        },
    )?;

    timing.time("copy", || -> Result<()> {
        let mut buf = vec![0u8; shape.frame_bytes(dtype)];
        for frame in 0..shape.frames {
            source.read_frame(frame, &mut buf)?;
            writer.write_frame(frame, &buf)?;
        }
        Ok(())
    })?;
    let attributes_copied =
        timing.time("metadata", || propagate(source.attributes(), writer.attributes_mut()));
    timing.time("finish", || writer.finish())?;

    let bytes_out = fs::metadata(output)?.len();
    info!(
        "repack {} -> {} ({} frames, {} bytes)",
        input.display(),
        output.display(),
        shape.frames,
        bytes_out
    );
    Ok(RepackReport {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        shape,
        dtype,
        bytes_in: (shape.frames * shape.frame_bytes(dtype)) as u64,
        bytes_out,
        attributes_copied,
        timing,
    })
}

fn preflight(output: &Path, artifacts: &[PathBuf]) -> Result<()> {
    for path in std::iter::once(output).chain(artifacts.iter().map(PathBuf::as_path)) {
        if path.exists() {
            return Err(RetileError::ArtifactExists(path.to_path_buf()));
        }
    }
    Ok(())
}

fn create_artifacts(
    layout: &ResolvedLayout,
    paths: &[PathBuf],
    dtype: Dtype,
    options: &SplitOptions,
) -> Result<Vec<H5Writer>> {
    layout
        .groups
        .iter()
        .zip(paths)
        .map(|(group, path)| {
            let writer = H5Writer::create(
                path,
                DatasetSpec {
                    name: options.dataset.clone(),
                    shape: group.shape(layout.frames()),
                    dtype,
                    compression: options.compression,
                },
            )?;
            info!(
                "artifact {} <- modules {:?}",
                path.display(),
                group.modules().collect::<Vec<_>>()
            );
            Ok(writer)
        })
        .collect()
}

/// Artifacts live next to the composite, so the descriptor stores bare file
/// names and the set can be moved as a whole.
fn relative_to_composite(path: &Path) -> PathBuf {
    path.file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| path.to_path_buf())
}
