// THEORY:
// The classifier is the decision layer. It turns the bright regions of one
// frame into a beam recommendation and carries the small amount of session
// state the recommendation needs between frames.
//
// Key principles:
// 1.  **Explicit State**: The session is two scalars, the current status and the
//     number of consecutive frames without a qualifying light. They live in a
//     `SessionState` value that goes in and comes back out of every call, so the
//     whole decision is a pure function and can be driven frame by frame in
//     tests.
// 2.  **Region Filtering**: A region is a headlight candidate only if its area is
//     plausible for a lamp, it is not mostly tail-lamp red, and it reaches into
//     the lower half of the frame where oncoming traffic appears.
// 3.  **Aggregate Decision**: All qualifying regions of a frame are considered
//     together. Any region large enough to be a near vehicle forces low beam,
//     regardless of the order in which regions were found.
// 4.  **Timeout Recovery**: Low beam is held through short gaps in detection and
//     only released after a run of empty frames.
//
// The global-brightness rule is the stateless alternative: count bright pixels
// and compare against a fixed budget.

use crate::core_modules::contour::Region;
use crate::core_modules::filters::{self, BLUR_KERNEL_SIZE};
use crate::core_modules::geometry::Rect;
use image::GrayImage;
use std::fmt;

pub const BRIGHT_SPOT_THRESHOLD: u8 = 245;
pub const MIN_REGION_AREA: f64 = 100.0;
pub const MAX_REGION_AREA: f64 = 4000.0;
pub const RED_RATIO_CUTOFF: f64 = 0.5;
pub const DISTANCE_THRESHOLD: f64 = 1500.0;
pub const DETECTION_TIME_THRESHOLD: u32 = 120;
pub const HORIZON_RATIO: f64 = 0.5;
pub const GLOBAL_BRIGHTNESS_CUTOFF: u8 = 240;
pub const GLOBAL_PIXEL_THRESHOLD: usize = 500;

// Keeps the red ratio finite for degenerate boxes.
const RATIO_EPSILON: f64 = 1e-5;

/// The recommendation shown to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BeamStatus {
    #[default]
    StayHigh,
    TurnLow,
}

impl BeamStatus {
    pub fn label(&self) -> &'static str {
        match self {
            BeamStatus::StayHigh => "STAY HIGH",
            BeamStatus::TurnLow => "TURN LOW",
        }
    }
}

impl fmt::Display for BeamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which rule turns a frame into a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecisionMode {
    /// Region analysis with tail-lamp rejection and a no-detection timeout.
    #[default]
    Contour,
    /// Stateless count of bright pixels.
    GlobalBrightness,
}

/// Tunable thresholds for both decision rules.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    /// Edge of the square Gaussian kernel applied before thresholding. Must be odd.
    pub blur_kernel_size: u32,
    /// Blurred pixels strictly above this are part of a bright spot.
    pub bright_threshold: u8,
    /// Exclusive lower bound on a region's contour area.
    pub min_region_area: f64,
    /// Exclusive upper bound on a region's contour area.
    pub max_region_area: f64,
    /// Regions whose bounding box is more than this fraction red are tail lamps.
    pub red_ratio_cutoff: f64,
    /// A qualifying region larger than this is a near vehicle and forces low beam.
    pub distance_threshold: f64,
    /// Consecutive empty frames tolerated before reverting to high beam.
    pub detection_time_threshold: u32,
    /// A region's bottom edge must lie below this fraction of the frame height.
    pub horizon_ratio: f64,
    /// Global rule: blurred pixels strictly above this count as bright.
    pub global_brightness_cutoff: u8,
    /// Global rule: more bright pixels than this forces low beam.
    pub global_pixel_threshold: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            blur_kernel_size: BLUR_KERNEL_SIZE,
            bright_threshold: BRIGHT_SPOT_THRESHOLD,
            min_region_area: MIN_REGION_AREA,
            max_region_area: MAX_REGION_AREA,
            red_ratio_cutoff: RED_RATIO_CUTOFF,
            distance_threshold: DISTANCE_THRESHOLD,
            detection_time_threshold: DETECTION_TIME_THRESHOLD,
            horizon_ratio: HORIZON_RATIO,
            global_brightness_cutoff: GLOBAL_BRIGHTNESS_CUTOFF,
            global_pixel_threshold: GLOBAL_PIXEL_THRESHOLD,
        }
    }
}

/// State carried from one frame to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionState {
    pub status: BeamStatus,
    /// Consecutive frames without a qualifying region.
    pub no_light_counter: u32,
}

/// Why a region was kept or dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegionVerdict {
    TooSmall,
    TooLarge,
    TailLamp { red_ratio: f64 },
    AboveHorizon,
    Qualified,
}

/// A region that passed every filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub bounding_box: Rect,
    pub area: f64,
    pub red_ratio: f64,
}

/// Outcome of the contour rule for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ContourDecision {
    pub state: SessionState,
    pub candidates: Vec<Candidate>,
}

/// Share of the box covered by the red mask.
pub fn red_ratio(red_mask: &GrayImage, rect: &Rect) -> f64 {
    let red_pixels = filters::count_non_zero(red_mask, rect) as f64;
    red_pixels / (rect.area() as f64 + RATIO_EPSILON)
}

pub fn assess_region(
    region: &Region,
    red_mask: &GrayImage,
    frame_height: u32,
    config: &ClassifierConfig,
) -> RegionVerdict {
    if region.area <= config.min_region_area {
        return RegionVerdict::TooSmall;
    }
    if region.area >= config.max_region_area {
        return RegionVerdict::TooLarge;
    }

    let ratio = red_ratio(red_mask, &region.bounding_box);
    if ratio > config.red_ratio_cutoff {
        return RegionVerdict::TailLamp { red_ratio: ratio };
    }

    if (region.bounding_box.bottom() as f64) > frame_height as f64 * config.horizon_ratio {
        RegionVerdict::Qualified
    } else {
        RegionVerdict::AboveHorizon
    }
}

/// Applies the contour rule to the regions of one frame.
pub fn classify_regions(
    regions: &[Region],
    red_mask: &GrayImage,
    frame_height: u32,
    previous: SessionState,
    config: &ClassifierConfig,
) -> ContourDecision {
    let mut candidates = Vec::new();
    for region in regions {
        match assess_region(region, red_mask, frame_height, config) {
            RegionVerdict::Qualified => candidates.push(Candidate {
                bounding_box: region.bounding_box,
                area: region.area,
                red_ratio: red_ratio(red_mask, &region.bounding_box),
            }),
            RegionVerdict::TailLamp { red_ratio } => {
                log::trace!(
                    "skipping tail lamp at {:?} (red ratio {:.2})",
                    region.bounding_box,
                    red_ratio
                );
            }
            verdict => {
                log::trace!("skipping region at {:?}: {:?}", region.bounding_box, verdict);
            }
        }
    }

    let mut state = previous;
    let largest = candidates.iter().map(|c| c.area).reduce(f64::max);
    match largest {
        Some(area) if area > config.distance_threshold => {
            state.status = BeamStatus::TurnLow;
            state.no_light_counter = 0;
        }
        Some(_) => {
            state.status = BeamStatus::StayHigh;
        }
        None => {
            state.no_light_counter = state.no_light_counter.saturating_add(1);
            if state.no_light_counter > config.detection_time_threshold {
                state.status = BeamStatus::StayHigh;
            }
        }
    }

    ContourDecision { state, candidates }
}

/// The stateless global-brightness rule over an already blurred frame.
pub fn decide_global(blurred: &GrayImage, config: &ClassifierConfig) -> (BeamStatus, usize) {
    let bright_pixels = filters::count_above(blurred, config.global_brightness_cutoff);
    let status = if bright_pixels > config.global_pixel_threshold {
        BeamStatus::TurnLow
    } else {
        BeamStatus::StayHigh
    };
    (status, bright_pixels)
}
