//! I/O helpers for reports and previews.
//!
//! - `write_json_file`: pretty-print a serializable value to disk.
//! - `save_frame_preview`: write one frame as an 8-bit grayscale PNG.
use super::PixelRows;
use image::{GrayImage, Luma};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize JSON for {}: {e}", path.display()))?;
    fs::write(path, json).map_err(|e| format!("Failed to write JSON {}: {e}", path.display()))
}

/// Save a frame as a grayscale PNG, stretching the observed value range over
/// `1..=255`. Pixels equal to `fill` render as 0 so gaps stay visible.
pub fn save_frame_preview<I: PixelRows>(frame: &I, fill: i64, path: &Path) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let fill = frame.dtype().normalize(fill);
    let (mut lo, mut hi) = (i64::MAX, i64::MIN);
    for y in 0..frame.height() {
        for x in 0..frame.width() {
            let v = frame.pixel(y, x);
            if v != fill {
                lo = lo.min(v);
                hi = hi.max(v);
            }
        }
    }
    let span = (hi - lo).max(1) as f64;

    let mut out = GrayImage::new(frame.width() as u32, frame.height() as u32);
    for y in 0..frame.height() {
        for x in 0..frame.width() {
            let v = frame.pixel(y, x);
            let level = if v == fill {
                0
            } else {
                (1.0 + 254.0 * (v - lo) as f64 / span).round() as u8
            };
            out.put_pixel(x as u32, y as u32, Luma([level]));
        }
    }
    out.save(path)
        .map_err(|e| format!("Failed to save {}: {e}", path.display()))
}

fn ensure_parent_dir(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
        }
    }
    Ok(())
}
