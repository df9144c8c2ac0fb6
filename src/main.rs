//! Flowstrip - Scrolling Image Strip Demo
//!
//! Drives a strip headlessly and writes the composited frames to disk as
//! PNGs, one per redraw tick.

mod cache;
mod loader;
mod render;
mod strip;
mod utils;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use log::info;

use loader::{FileImageLoader, HttpImageLoader, ImageLoader};
use strip::{FlowStrip, StripConfig};

/// Frames per second the demo loop is paced at
const TARGET_FPS: u32 = 60;

fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).init();

    info!("Flowstrip v{}", env!("CARGO_PKG_VERSION"));

    // Usage: flowstrip [config.json] [out-dir] [frame-count]
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => StripConfig::load_from(Path::new(&path))?,
        None => StripConfig::load()?,
    };
    let out_dir = PathBuf::from(args.next().unwrap_or_else(|| "frames".to_string()));
    let frame_count: u64 = args.next().map(|s| s.parse()).transpose()?.unwrap_or(300);

    if config.image_refs.is_empty() {
        anyhow::bail!("No image_refs configured; nothing to scroll");
    }

    utils::ensure_dir(&out_dir)?;

    // Create tokio runtime for the image loaders
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    // URLs load over HTTP, anything else comes from the filesystem
    let loader: Arc<dyn ImageLoader> = if config.image_refs.iter().any(|r| r.starts_with("http")) {
        Arc::new(HttpImageLoader::new(runtime.handle().clone()))
    } else {
        Arc::new(FileImageLoader::new(runtime.handle().clone()))
    };

    let mut flow = FlowStrip::new(config, loader);
    let output = flow.output();

    info!("Rendering {} frames to {:?}", frame_count, out_dir);

    let frame_duration = Duration::from_secs_f64(1.0 / TARGET_FPS as f64);
    let mut last_frame_time = Instant::now();
    let mut last_log = Instant::now();

    for frame_index in 0..frame_count {
        flow.tick(Instant::now());

        if let Some(frame) = output.read() {
            let path = out_dir.join(format!("frame-{:05}.png", frame_index));
            frame.save(&path)?;
        }

        if last_log.elapsed() >= Duration::from_secs(1) {
            info!(
                "Rendered {} frames ({:.1} fps, offset {:.1}px)",
                frame_index + 1,
                flow.fps(),
                flow.offset()
            );
            last_log = Instant::now();
        }

        // Frame rate limiting - sleep off the remainder of the frame interval
        let elapsed = last_frame_time.elapsed();
        if elapsed < frame_duration {
            std::thread::sleep(frame_duration - elapsed);
        }
        last_frame_time = Instant::now();
    }

    info!("Done; wrote {} frames", frame_count);

    Ok(())
}
