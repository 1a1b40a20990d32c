//! Config-driven split for any module geometry.
use module_retile::config::load_config;
use module_retile::image::io::write_json_file;
use module_retile::pipeline::split;
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
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let config = load_config(Path::new(&config_path))?;
    let geometry = config.geometry.geometry();

    let report = split(&config.input, &config.output, &geometry, &config.split)
        .map_err(|e| e.to_string())?;

    println!(
        "Split {} {} into {} artifacts, composite {}",
        report.global_shape,
        report.dtype,
        report.artifacts.len(),
        report.output.display()
    );
    for stage in &report.timing.stages {
        println!("  {:<18} {:>9.2} ms", stage.label, stage.elapsed_ms);
    }
    if let Some(path) = &config.report_json {
        write_json_file(path, &report)?;
        println!("Saved report to {}", path.display());
    }
    Ok(())
}

fn usage() -> String {
    "Usage: retile <config.json>".to_string()
}
