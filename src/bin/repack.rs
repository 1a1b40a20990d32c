use module_retile::pipeline::{repack, SplitOptions};
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

    let report = repack(Path::new(&input), Path::new(&output), &SplitOptions::default())
        .map_err(|e| e.to_string())?;
    println!(
        "Repacked {} {} -> {} ({} -> {} bytes, ratio {:.2})",
        report.shape,
        report.dtype,
        report.output.display(),
        report.bytes_in,
        report.bytes_out,
        report.compression_ratio()
    );
    Ok(())
}

fn usage() -> String {
    "Usage: repack <input> <output>".to_string()
}
