use anyhow::{Context, Result, anyhow};
use beam_vision::Frame;
use opencv::{
    core::{self, Mat},
    prelude::*,
    videoio::{self, VideoCapture},
};
use std::path::Path;

/// Where frames come from.
#[derive(Debug, Clone)]
pub enum FrameSource<'a> {
    Camera(i32),
    File(&'a Path),
}

/// Owns the capture device for the lifetime of the loop and releases it on
/// drop, whichever way the loop ends.
pub struct CaptureSession {
    capture: VideoCapture,
    description: String,
}

impl CaptureSession {
    pub fn open(source: &FrameSource<'_>) -> Result<Self> {
        let (capture, description) = match source {
            FrameSource::Camera(index) => (
                VideoCapture::new(*index, videoio::CAP_ANY)
                    .with_context(|| format!("creating capture for camera {index}"))?,
                format!("camera {index}"),
            ),
            FrameSource::File(path) => {
                let name = path
                    .to_str()
                    .ok_or_else(|| anyhow!("non UTF-8 path {}", path.display()))?;
                (
                    VideoCapture::from_file(name, videoio::CAP_ANY)
                        .with_context(|| format!("creating capture for {}", path.display()))?,
                    path.display().to_string(),
                )
            }
        };

        if !capture.is_opened()? {
            return Err(anyhow!("could not open {description}"));
        }
        log::info!("opened {description}");
        Ok(Self {
            capture,
            description,
        })
    }

    /// Reads the next frame into `mat`. `false` means end of stream; read
    /// errors are treated the same way.
    pub fn read(&mut self, mat: &mut Mat) -> bool {
        match self.capture.read(mat) {
            Ok(true) => !mat.empty(),
            Ok(false) => false,
            Err(err) => {
                log::warn!("error reading frame from {}: {}", self.description, err);
                false
            }
        }
    }

    pub fn fps(&self) -> f64 {
        self.capture.get(videoio::CAP_PROP_FPS).unwrap_or(0.0)
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        match self.capture.release() {
            Ok(()) => log::info!("released {}", self.description),
            Err(err) => log::warn!("failed to release {}: {}", self.description, err),
        }
    }
}

/// Copies a BGR matrix into an engine frame.
pub fn mat_to_frame(mat: &Mat) -> Result<Frame> {
    if mat.typ() != core::CV_8UC3 {
        return Err(anyhow!("expected an 8-bit BGR frame, got matrix type {}", mat.typ()));
    }
    let width = mat.cols() as u32;
    let height = mat.rows() as u32;
    let frame = if mat.is_continuous() {
        Frame::from_bgr_bytes(width, height, mat.data_bytes()?)?
    } else {
        let packed = mat.try_clone()?;
        Frame::from_bgr_bytes(width, height, packed.data_bytes()?)?
    };
    Ok(frame)
}
