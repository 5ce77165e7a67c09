// THEORY:
// This file is the main entry point for the `beam_vision` library crate.
//
// The primary goal is to export `BeamPipeline` and its associated data
// structures (`ClassifierConfig`, `FrameReport`, etc.) as the high-level
// interface of the engine, plus the `views` routing layer used by front ends
// that render debug windows. The image-processing stages live in
// `core_modules` and work on plain `image` buffers, so nothing here depends on
// a camera or a GUI toolkit.

pub mod core_modules;
pub mod error;
pub mod pipeline;
pub mod views;

pub use core_modules::classifier::{BeamStatus, ClassifierConfig, DecisionMode, SessionState};
pub use core_modules::frame::Frame;
pub use core_modules::geometry::Rect;
pub use error::VisionError;
pub use pipeline::{BeamPipeline, DebugBuffers, FrameReport};
