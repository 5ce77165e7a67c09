pub mod image_helper {
    use crate::core_modules::frame::Frame;
    use crate::pipeline::DebugBuffers;
    use crate::views::{DebugView, ViewImage};
    use image::{ExtendedColorType, GrayImage, ImageEncoder};
    use std::path::{Path, PathBuf};

    fn write_png(
        path: &Path,
        width: u32,
        height: u32,
        buffer: &[u8],
        color: ExtendedColorType,
    ) -> Result<(), image::error::ImageError> {
        let output = std::fs::File::create(path)?;
        let encoder = image::codecs::png::PngEncoder::new(output);

        encoder.write_image(buffer, width, height, color)?;

        Ok(())
    }

    pub fn save_gray(path: &Path, image: &GrayImage) -> Result<(), image::error::ImageError> {
        write_png(path, image.width(), image.height(), image.as_raw(), ExtendedColorType::L8)
    }

    pub fn save_frame(path: &Path, frame: &Frame) -> Result<(), image::error::ImageError> {
        let image = frame.image();
        write_png(path, image.width(), image.height(), image.as_raw(), ExtendedColorType::Rgb8)
    }

    /// File name for one view of one frame, e.g. `snapshot_00042_red_mask.png`.
    pub fn snapshot_name(frame_index: u64, view: DebugView) -> String {
        let slug = view.name().to_lowercase().replace(' ', "_");
        format!("snapshot_{frame_index:05}_{slug}.png")
    }

    /// Writes every debug view of a frame into `dir` and returns the paths.
    pub fn save_snapshot(
        dir: &Path,
        frame_index: u64,
        buffers: &DebugBuffers,
    ) -> Result<Vec<PathBuf>, image::error::ImageError> {
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::with_capacity(DebugView::ALL.len());
        for view in DebugView::ALL {
            let path = dir.join(snapshot_name(frame_index, view));
            match view.select(buffers) {
                ViewImage::Gray(image) => save_gray(&path, image)?,
                ViewImage::Color(frame) => save_frame(&path, frame)?,
            }
            written.push(path);
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {

    use super::image_helper::*;
    use crate::core_modules::classifier::DecisionMode;
    use crate::core_modules::frame::Frame;
    use crate::pipeline::BeamPipeline;
    use crate::views::DebugView;
    use image::{GrayImage, Luma};

    #[test]
    fn save_white_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("white_file.png");
        let image = GrayImage::from_pixel(50, 40, Luma([255]));

        save_gray(&path, &image).expect("Error Saving File.");

        let decoded = image::open(&path).expect("decode").to_luma8();
        assert_eq!(decoded.dimensions(), (50, 40));
        assert!(decoded.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn snapshot_names_are_slugged() {
        assert_eq!(snapshot_name(42, DebugView::RedMask), "snapshot_00042_red_mask.png");
        assert_eq!(
            snapshot_name(7, DebugView::Threshold),
            "snapshot_00007_bright_spot_threshold.png"
        );
    }

    #[test]
    fn snapshot_writes_every_view() {
        let dir = tempfile::tempdir().expect("temp dir");
        let frame = Frame::filled(16, 12, [200, 30, 30]).unwrap();
        let report = BeamPipeline::with_defaults(DecisionMode::Contour)
            .process(&frame)
            .unwrap();

        let written = save_snapshot(dir.path(), 3, &report.buffers).expect("snapshot");

        assert_eq!(written.len(), DebugView::ALL.len());
        for path in &written {
            assert!(path.exists(), "{} missing", path.display());
        }
        let overlay = image::open(&written[4]).expect("decode").to_rgb8();
        assert_eq!(overlay.get_pixel(0, 0).0, [200, 30, 30]);
    }
}
