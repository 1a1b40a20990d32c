//! Split an Eiger2 stream: 4x8 modules, one artifact per module.
use module_retile::geometry::{DetectorGeometry, DetectorPreset};
use module_retile::pipeline::{split, SplitOptions};
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
    let input = args.next().ok_or_else(usage)?;
    let output = args.next().ok_or_else(usage)?;

    let geometry = DetectorGeometry::preset(DetectorPreset::Eiger2_16m);
    let report = split(
        Path::new(&input),
        Path::new(&output),
        &geometry,
        &SplitOptions::default(),
    )
    .map_err(|e| e.to_string())?;

    for artifact in &report.artifacts {
        println!(
            "{} modules={:?} shape={}",
            artifact.path.display(),
            artifact.modules,
            artifact.shape
        );
    }
    println!(
        "Wrote {} artifacts and composite {} ({} frames, {:.1} ms)",
        report.artifacts.len(),
        report.output.display(),
        report.frames,
        report.timing.total_ms
    );
    Ok(())
}

fn usage() -> String {
    "Usage: vds_external <input> <output>".to_string()
}
