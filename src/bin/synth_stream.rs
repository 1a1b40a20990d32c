//! Write a synthetic monolithic stream for a detector preset.
//!
//! Module pixels hold `frame * 100_000 + module * 1_000 + (slow + fast) % 1_000`
//! and gap pixels hold 0, so every module is recognisable in the artifacts.
use module_retile::geometry::{DetectorGeometry, DetectorPreset};
use module_retile::image::FrameBuf;
use module_retile::storage::{Compression, DatasetSpec, FrameSink, H5Writer, DEFAULT_DATASET};
use module_retile::types::Dtype;
use std::env;
use std::path::Path;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let mut args = env::args().skip(1);
    let output = args.next().ok_or_else(usage)?;
    let preset: DetectorPreset = args
        .next()
        .ok_or_else(usage)?
        .parse()
        .map_err(|e| format!("{e}"))?;
    let frames: usize = args
        .next()
        .ok_or_else(usage)?
        .parse()
        .map_err(|e| format!("Invalid frame count: {e}"))?;

    let geometry = DetectorGeometry::preset(preset);
    let shape = geometry.global_shape(frames);
    let image_nr_high =
        i32::try_from(frames).map_err(|_| format!("Frame count {frames} exceeds i4 range"))?;
    let mut writer = H5Writer::create(
        Path::new(&output),
        DatasetSpec {
            name: DEFAULT_DATASET.to_string(),
            shape,
            dtype: Dtype::U32,
            compression: Compression::default(),
        },
    )
    .map_err(|e| e.to_string())?;

    let mut buf = FrameBuf::new(Dtype::U32, shape.slow, shape.fast);
    for frame in 0..frames {
        buf.fill(0);
        for placement in geometry.placements() {
            let rect = placement.rect;
            for y in rect.slow0..rect.slow1 {
                for x in rect.fast0..rect.fast1 {
                    let value = frame * 100_000 + placement.module * 1_000 + (y + x) % 1_000;
                    buf.set(y, x, value as i64);
                }
            }
        }
        writer
            .write_frame(frame, &buf.data)
            .map_err(|e| e.to_string())?;
    }

    let attributes = writer.attributes_mut();
    attributes.set("image_nr_low", 1);
    attributes.set("image_nr_high", image_nr_high);
    writer.finish().map_err(|e| e.to_string())?;

    println!("Wrote {} {} stream to {}", preset, shape, output);
    Ok(())
}

fn usage() -> String {
    let presets: Vec<&str> = DetectorPreset::ALL.iter().map(|p| p.name()).collect();
    format!(
        "Usage: synth_stream <output> <preset> <frames>\n  presets: {}",
        presets.join(", ")
    )
}
