use thiserror::Error;

/// Errors raised by the vision engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VisionError {
    #[error("frame buffer holds {actual} bytes, expected {expected} for {width}x{height} BGR")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("frame has zero width or height")]
    EmptyFrame,

    #[error("gaussian kernel size must be odd and positive, got {0}")]
    KernelSize(u32),

    #[error("mask is {mask_width}x{mask_height}, frame is {frame_width}x{frame_height}")]
    MaskDimensions {
        mask_width: u32,
        mask_height: u32,
        frame_width: u32,
        frame_height: u32,
    },
}

pub type Result<T> = std::result::Result<T, VisionError>;
