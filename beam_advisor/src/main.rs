mod capture;
mod display;

use anyhow::{Context, Result};
use beam_vision::core_modules::utils::image_helper::image_helper;
use beam_vision::views::{self, KeyCommand, ViewRouter, ViewToggles};
use beam_vision::{BeamPipeline, DecisionMode, FrameReport};
use capture::{CaptureSession, FrameSource};
use clap::{Parser, ValueEnum};
use display::{HighGuiWindows, WindowGuard};
use opencv::{
    core::{self, Mat},
    highgui,
    prelude::*,
    videoio::VideoWriter,
};
use std::path::PathBuf;

const KEY_POLL_MS: i32 = 1;
const DEFAULT_RECORD_FPS: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Region analysis with tail-lamp rejection and a timeout.
    Contour,
    /// Count of bright pixels, no state.
    Global,
}

impl From<Mode> for DecisionMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Contour => DecisionMode::Contour,
            Mode::Global => DecisionMode::GlobalBrightness,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Recommends high or low beam from a live camera feed")]
struct Args {
    /// Camera device index.
    #[arg(long, default_value_t = 0)]
    camera: i32,

    /// Replay a video file instead of opening the camera.
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Decision rule.
    #[arg(long, value_enum, default_value_t = Mode::Contour)]
    mode: Mode,

    /// Record annotated frames to this video file.
    #[arg(long, value_name = "PATH")]
    record: Option<PathBuf>,

    /// Run without any windows; status changes are only logged.
    #[arg(long)]
    headless: bool,

    /// Directory for snapshots taken with the S key.
    #[arg(long, value_name = "DIR", default_value = ".")]
    snapshot_dir: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    // --- 1. Frame Source ---
    let source = match &args.input {
        Some(path) => FrameSource::File(path),
        None => FrameSource::Camera(args.camera),
    };
    let mut session = match CaptureSession::open(&source) {
        Ok(session) => session,
        Err(err) => {
            log::error!("{err:#}");
            println!("Error: could not open video source.");
            return Err(err);
        }
    };

    if !args.headless {
        for line in views::key_help() {
            println!("{line}");
        }
    }

    // --- 2. Pipeline ---
    let mut pipeline = BeamPipeline::with_defaults(args.mode.into());
    log::info!("deciding with the {:?} rule", pipeline.mode());

    // Declared before the loop so windows close after the loop on every path.
    let _windows = (!args.headless).then_some(WindowGuard);
    let mut sink = HighGuiWindows;
    let mut router = ViewRouter::new();
    let mut toggles = ViewToggles::default();
    let mut writer: Option<VideoWriter> = None;

    // --- 3. Main Loop ---
    let mut frame = Mat::default();
    while session.read(&mut frame) {
        let input = capture::mat_to_frame(&frame)?;
        let report = pipeline.process(&input)?;

        // --- 4. Annotation ---
        display::annotate(&mut frame, &report.boxes(), report.status)?;

        if let Some(path) = &args.record {
            if writer.is_none() {
                writer = Some(open_writer(path, &frame, session.fps())?);
            }
            if let Some(writer) = writer.as_mut() {
                writer.write(&frame)?;
            }
        }

        if args.headless {
            continue;
        }

        // --- 5. Windows ---
        router.route(&toggles, &report.buffers, &mut sink)?;
        highgui::imshow(views::MAIN_WINDOW, &frame)?;

        // --- 6. Keys ---
        match KeyCommand::from_key(highgui::wait_key(KEY_POLL_MS)?) {
            Some(KeyCommand::Toggle(view)) => {
                let on = toggles.toggle(view);
                log::debug!("{} view {}", view, if on { "on" } else { "off" });
            }
            Some(KeyCommand::Snapshot) => save_snapshot(&args, &pipeline, &report),
            Some(KeyCommand::Quit) => break,
            None => {}
        }
    }

    log::info!(
        "stopped after {} frames, last recommendation {}",
        pipeline.frames_processed(),
        pipeline.status()
    );
    Ok(())
}

fn open_writer(path: &std::path::Path, frame: &Mat, fps: f64) -> Result<VideoWriter> {
    let fps = if fps > 0.0 { fps } else { DEFAULT_RECORD_FPS };
    let name = path.to_string_lossy();
    let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v')?;
    let writer = VideoWriter::new(
        &name,
        fourcc,
        fps,
        core::Size::new(frame.cols(), frame.rows()),
        true,
    )
    .with_context(|| format!("opening recorder {}", path.display()))?;
    log::info!("recording to {} at {:.1} fps", path.display(), fps);
    Ok(writer)
}

fn save_snapshot(args: &Args, pipeline: &BeamPipeline, report: &FrameReport) {
    let index = pipeline.frames_processed();
    match image_helper::save_snapshot(&args.snapshot_dir, index, &report.buffers) {
        Ok(paths) => log::info!(
            "saved {} snapshot images to {}",
            paths.len(),
            args.snapshot_dir.display()
        ),
        Err(err) => log::warn!("snapshot failed: {err}"),
    }
}
