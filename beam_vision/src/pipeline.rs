// THEORY:
// The `pipeline` module is the top-level API of the engine. It owns the decision
// rule, its thresholds and the session state, and runs every per-frame stage in
// order so that callers only ever hand it a `Frame` and read back a
// `FrameReport`.
//
// The report carries the intermediate buffers as well as the decision. The
// engine never renders anything itself; whoever drives it decides which of
// those buffers to show.

use crate::core_modules::classifier::{
    self, BeamStatus, Candidate, ClassifierConfig, DecisionMode, SessionState,
};
use crate::core_modules::color;
use crate::core_modules::contour::contour_finder;
use crate::core_modules::filters;
use crate::core_modules::frame::Frame;
use crate::core_modules::geometry::Rect;
use crate::error::Result;
use image::GrayImage;

/// Every intermediate image of one frame, all at the frame's size.
#[derive(Debug, Clone)]
pub struct DebugBuffers {
    pub gray: GrayImage,
    pub blurred: GrayImage,
    pub threshold: GrayImage,
    pub red_mask: GrayImage,
    pub red_overlay: Frame,
}

/// What the pipeline concluded about a single frame.
#[derive(Debug, Clone)]
pub struct FrameReport {
    /// Recommendation after this frame.
    pub status: BeamStatus,
    /// Session state to carry into the next frame.
    pub state: SessionState,
    /// Regions that justified the decision. Always empty for the global rule.
    pub candidates: Vec<Candidate>,
    /// Bright pixels counted by the global rule. `None` for the contour rule.
    pub bright_pixels: Option<usize>,
    pub buffers: DebugBuffers,
}

impl FrameReport {
    /// True when at least one region qualified in this frame.
    pub fn light_detected(&self) -> bool {
        !self.candidates.is_empty()
    }

    pub fn boxes(&self) -> Vec<Rect> {
        self.candidates.iter().map(|c| c.bounding_box).collect()
    }

    pub fn largest_area(&self) -> Option<f64> {
        self.candidates.iter().map(|c| c.area).reduce(f64::max)
    }
}

/// The main, top-level struct of the engine.
pub struct BeamPipeline {
    config: ClassifierConfig,
    mode: DecisionMode,
    state: SessionState,
    frames_processed: u64,
}

impl BeamPipeline {
    pub fn new(config: ClassifierConfig, mode: DecisionMode) -> Self {
        Self {
            config,
            mode,
            state: SessionState::default(),
            frames_processed: 0,
        }
    }

    pub fn with_defaults(mode: DecisionMode) -> Self {
        Self::new(ClassifierConfig::default(), mode)
    }

    pub fn process(&mut self, frame: &Frame) -> Result<FrameReport> {
        let report = analyze_frame(frame, self.state, &self.config, self.mode)?;

        if report.status != self.state.status {
            log::info!(
                "frame {}: {} -> {}",
                self.frames_processed,
                self.state.status,
                report.status
            );
        }
        log::debug!(
            "frame {}: {} candidate(s), largest area {:?}, no-light counter {}",
            self.frames_processed,
            report.candidates.len(),
            report.largest_area(),
            report.state.no_light_counter
        );

        self.state = report.state;
        self.frames_processed += 1;
        Ok(report)
    }

    pub fn status(&self) -> BeamStatus {
        self.state.status
    }

    pub fn mode(&self) -> DecisionMode {
        self.mode
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }
}

/// Runs every stage on one frame. Pure: the returned report holds the next
/// session state, nothing is mutated.
pub fn analyze_frame(
    frame: &Frame,
    previous: SessionState,
    config: &ClassifierConfig,
    mode: DecisionMode,
) -> Result<FrameReport> {
    // --- 1. Color Spaces ---
    let gray = color::to_grayscale(frame);
    let hsv = color::to_hsv(frame);

    // --- 2. Tail-Lamp Mask ---
    let red_mask = color::red_mask(&hsv);
    let red_overlay = color::red_overlay(frame, &red_mask)?;

    // --- 3. Bright Spots ---
    let blurred = filters::gaussian_blur(&gray, config.blur_kernel_size)?;
    let cutoff = match mode {
        DecisionMode::Contour => config.bright_threshold,
        DecisionMode::GlobalBrightness => config.global_brightness_cutoff,
    };
    let threshold = filters::threshold_binary(&blurred, cutoff);

    // --- 4. Decision ---
    let (state, candidates, bright_pixels) = match mode {
        DecisionMode::Contour => {
            let regions = contour_finder::find_external_contours(&threshold);
            let decision =
                classifier::classify_regions(&regions, &red_mask, frame.height(), previous, config);
            (decision.state, decision.candidates, None)
        }
        DecisionMode::GlobalBrightness => {
            let (status, bright_pixels) = classifier::decide_global(&blurred, config);
            let state = SessionState {
                status,
                no_light_counter: 0,
            };
            (state, Vec::new(), Some(bright_pixels))
        }
    };

    Ok(FrameReport {
        status: state.status,
        state,
        candidates,
        bright_pixels,
        buffers: DebugBuffers {
            gray,
            blurred,
            threshold,
            red_mask,
            red_overlay,
        },
    })
}
