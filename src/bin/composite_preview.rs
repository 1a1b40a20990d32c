use module_retile::image::io::save_frame_preview;
use module_retile::layout::VirtualDataset;
use module_retile::storage::FrameSource;
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
    let composite_path = args.next().ok_or_else(usage)?;
    let frame: usize = args
        .next()
        .ok_or_else(usage)?
        .parse()
        .map_err(|e| format!("Invalid frame index: {e}"))?;
    let out = args.next().ok_or_else(usage)?;

    let mut composite =
        VirtualDataset::open(Path::new(&composite_path)).map_err(|e| e.to_string())?;
    let preview = composite.compose_frame(frame).map_err(|e| e.to_string())?;
    save_frame_preview(&preview, composite.fill_value(), Path::new(&out))?;

    let layout = composite.layout();
    println!(
        "Saved frame {frame} of {} ({} of {} pixels mapped) to {out}",
        composite.shape(),
        layout.mapped_pixels(),
        layout.shape.frame_pixels()
    );
    Ok(())
}

fn usage() -> String {
    "Usage: composite_preview <composite> <frame> <out.png>".to_string()
}
