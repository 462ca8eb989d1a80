//! card-capture - Real-time card number capture pipeline
//!
//! Frame-geometry and capture-confirmation core: preview-size negotiation,
//! guide-band mapping, frame rotation/cropping and the two-consecutive-reads
//! stability filter. The binary replays recorded camera frames through the
//! pipeline with a scripted recognizer standing in for the native engine.

mod capture;
mod config;
mod error;
mod geometry;
mod scan;
mod vision;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use crate::capture::{CaptureSession, PreviewSize};
use crate::capture::frame::RawFrame;
use crate::config::CaptureConfig;
use crate::geometry::DisplayGeometry;
use crate::scan::{CapturePayload, ResultSink, ScanEngine, ScanPhase};
use crate::vision::ScriptedRecognizer;

/// card-capture - Replay camera frames through the capture pipeline
#[derive(Parser, Debug)]
#[command(name = "card-capture")]
#[command(about = "Replay recorded camera frames through the card capture pipeline")]
struct Args {
    /// Directory of grayscale frame images, replayed in lexical order
    #[arg(short, long)]
    frames: PathBuf,

    /// JSON array of per-frame recognizer outputs (string or null)
    #[arg(short, long)]
    script: PathBuf,

    /// Capture surface size the overlay was laid out against, WIDTHxHEIGHT
    #[arg(long, default_value = "480x800")]
    surface: String,

    /// Where to write the illustrative guide-band crop on confirmation
    #[arg(short, long, default_value = "band.png")]
    output: PathBuf,
}

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let (surface_width, surface_height) = parse_surface(&args.surface)?;
    let config = load_or_create_config();

    let frames = collect_frames(&args.frames)?;
    if frames.is_empty() {
        bail!("no frame images found in {:?}", args.frames);
    }
    info!("replaying {} frames from {:?}", frames.len(), args.frames);

    // The replayed source "supports" every resolution present on disk
    let mut supported: Vec<PreviewSize> = Vec::new();
    for (_, frame) in &frames {
        let size = PreviewSize::new(frame.width(), frame.height());
        if !supported.contains(&size) {
            supported.push(size);
        }
    }

    let session = CaptureSession::negotiate(
        &supported,
        surface_width,
        surface_height,
        config.aspect_tolerance,
    )
    .context("failed to start capture session")?;
    let preview = session.preview_size();

    let display = DisplayGeometry {
        surface_width,
        surface_height,
        overlay_width: config.overlay.width,
        overlay_height: config.overlay.height,
    };
    let recognizer = ScriptedRecognizer::from_json_file(&args.script)?;
    let mut engine = ScanEngine::new(config, display, recognizer);
    let mut sink = BandWriter::new(args.output.clone());

    for (path, frame) in &frames {
        if (frame.width(), frame.height()) != (preview.width, preview.height) {
            warn!(
                "skipping {:?}: {}x{} does not match the negotiated {}x{} stream",
                path,
                frame.width(),
                frame.height(),
                preview.width,
                preview.height
            );
            continue;
        }

        let raw = RawFrame::new(frame.as_raw(), frame.width(), frame.height());
        match engine.on_frame(&raw, &mut sink) {
            Ok(ScanPhase::Confirmed) => break,
            Ok(ScanPhase::Scanning) => {}
            Err(e) => warn!("skipping {:?}: {}", path, e),
        }
    }

    match sink.confirmed {
        Some(text) => {
            println!("confirmed: {}", text);
            println!("guide band written to {:?}", args.output);
        }
        None => {
            warn!("frame stream ended without a confirmed read");
        }
    }

    Ok(())
}

/// Load configuration from the user config dir or fall back to defaults
fn load_or_create_config() -> CaptureConfig {
    if let Ok(config_dir) = config::get_config_dir() {
        let config_path = config_dir.join("config.toml");
        if config_path.exists() {
            if let Ok(config) = config::load_config(&config_path) {
                info!("Loaded configuration from {:?}", config_path);
                return config;
            }
        }
    }
    info!("Using default configuration");
    CaptureConfig::default()
}

/// Parse a WIDTHxHEIGHT surface specification
fn parse_surface(spec: &str) -> Result<(u32, u32)> {
    let (w, h) = spec
        .split_once('x')
        .with_context(|| format!("invalid surface spec: {}", spec))?;
    Ok((
        w.parse().with_context(|| format!("invalid surface width: {}", w))?,
        h.parse().with_context(|| format!("invalid surface height: {}", h))?,
    ))
}

/// Load every frame image in the directory, sorted by file name
fn collect_frames(dir: &Path) -> Result<Vec<(PathBuf, image::GrayImage)>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("cannot read frame directory {:?}", dir))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            matches!(
                p.extension().and_then(|e| e.to_str()),
                Some("png" | "jpg" | "jpeg" | "bmp" | "pgm")
            )
        })
        .collect();
    paths.sort();

    let mut frames = Vec::with_capacity(paths.len());
    for path in paths {
        let img = image::open(&path)
            .with_context(|| format!("cannot load frame {:?}", path))?
            .to_luma8();
        frames.push((path, img));
    }
    Ok(frames)
}

/// Sink that writes the illustrative crop as a PNG next to the result text
struct BandWriter {
    output: PathBuf,
    confirmed: Option<String>,
}

impl BandWriter {
    fn new(output: PathBuf) -> Self {
        Self {
            output,
            confirmed: None,
        }
    }
}

impl ResultSink for BandWriter {
    fn present(&mut self, text: &str, crop: &CapturePayload) {
        self.confirmed = Some(text.to_string());

        let Some(img) =
            image::GrayImage::from_raw(crop.width, crop.height, crop.bytes.clone())
        else {
            warn!("confirmation crop has inconsistent dimensions, not saving");
            return;
        };
        if let Err(e) = img.save(&self.output) {
            // Fire-and-forget: a failed save must not unwind the session
            warn!("could not write guide band to {:?}: {}", self.output, e);
        }
    }
}
