use anyhow::Result;
use beam_vision::views::{ViewImage, WindowSink};
use beam_vision::{BeamStatus, Frame, Rect};
use image::GrayImage;
use opencv::{
    core::{self, Mat, Point, Scalar},
    highgui, imgproc,
    prelude::*,
};

const BOX_THICKNESS: i32 = 2;
const LABEL_ORIGIN: (i32, i32) = (50, 50);
const LABEL_SCALE: f64 = 2.0;
const LABEL_THICKNESS: i32 = 5;

fn green() -> Scalar {
    Scalar::new(0.0, 255.0, 0.0, 0.0)
}

fn red() -> Scalar {
    Scalar::new(0.0, 0.0, 255.0, 0.0)
}

/// Draws the qualifying regions and the status label onto a BGR frame.
pub fn annotate(frame: &mut Mat, boxes: &[Rect], status: BeamStatus) -> Result<()> {
    for rect in boxes {
        let rect = core::Rect::new(
            rect.x as i32,
            rect.y as i32,
            rect.width as i32,
            rect.height as i32,
        );
        imgproc::rectangle(frame, rect, green(), BOX_THICKNESS, imgproc::LINE_8, 0)?;
    }

    let color = match status {
        BeamStatus::TurnLow => red(),
        BeamStatus::StayHigh => green(),
    };
    imgproc::put_text(
        frame,
        status.label(),
        Point::new(LABEL_ORIGIN.0, LABEL_ORIGIN.1),
        imgproc::FONT_HERSHEY_SIMPLEX,
        LABEL_SCALE,
        color,
        LABEL_THICKNESS,
        imgproc::LINE_8,
        false,
    )?;
    Ok(())
}

pub fn gray_to_mat(image: &GrayImage) -> opencv::Result<Mat> {
    let mut mat = Mat::new_rows_cols_with_default(
        image.height() as i32,
        image.width() as i32,
        core::CV_8UC1,
        Scalar::all(0.0),
    )?;
    mat.data_bytes_mut()?.copy_from_slice(image.as_raw());
    Ok(mat)
}

pub fn frame_to_mat(frame: &Frame) -> opencv::Result<Mat> {
    let mut mat = Mat::new_rows_cols_with_default(
        frame.height() as i32,
        frame.width() as i32,
        core::CV_8UC3,
        Scalar::all(0.0),
    )?;
    mat.data_bytes_mut()?.copy_from_slice(&frame.to_bgr_bytes());
    Ok(mat)
}

/// HighGUI-backed window sink for the debug views.
pub struct HighGuiWindows;

impl WindowSink for HighGuiWindows {
    type Error = opencv::Error;

    fn show(&mut self, title: &str, image: ViewImage<'_>) -> opencv::Result<()> {
        let mat = match image {
            ViewImage::Gray(gray) => gray_to_mat(gray)?,
            ViewImage::Color(frame) => frame_to_mat(frame)?,
        };
        highgui::imshow(title, &mat)
    }

    fn destroy(&mut self, title: &str) -> opencv::Result<()> {
        highgui::destroy_window(title)
    }
}

/// Closes every HighGUI window when dropped.
pub struct WindowGuard;

impl Drop for WindowGuard {
    fn drop(&mut self) {
        if let Err(err) = highgui::destroy_all_windows() {
            log::debug!("ignoring failure to close windows: {err}");
        }
    }
}
