use drift_core::{ArtifactRenderer, ComparisonResult, FeatureMatch, KeyPoint, ReportingError};
use image::{imageops, DynamicImage, GenericImageView, ImageFormat, Rgba, RgbaImage};
use imageproc::{drawing, pixelops};
use std::path::Path;

/// Colour of correspondences within the threshold.
pub const WITHIN_COLOR: Rgba<u8> = Rgba([0, 255, 0, 255]);
/// Colour of correspondences exceeding the threshold.
pub const EXCEEDING_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// Renders image A and image B side by side with a line for every correspondence.
///
/// Image A is in the top left and image B right next to it. Both ends of every correspondence
/// are marked with a cross. Exceeding correspondences are drawn last so they stay on top.
pub fn render_comparison(
    image_a: &DynamicImage,
    image_b: &DynamicImage,
    result: &ComparisonResult,
) -> DynamicImage {
    let (width_a, height_a) = image_a.dimensions();
    let (width_b, height_b) = image_b.dimensions();
    let mut canvas = RgbaImage::from_pixel(
        width_a + width_b,
        height_a.max(height_b),
        Rgba([0, 0, 0, 255]),
    );
    imageops::replace(&mut canvas, &image_a.to_rgba8(), 0, 0);
    imageops::replace(&mut canvas, &image_b.to_rgba8(), width_a as i64, 0);

    let within = (0..result.correspondences.len()).filter(|&ix| !result.is_exceeding(ix));
    for ix in within.chain(result.exceeding.iter().copied()) {
        let FeatureMatch(a, b) = result.correspondences[ix];
        let color = if result.is_exceeding(ix) {
            EXCEEDING_COLOR
        } else {
            WITHIN_COLOR
        };
        let start = canvas_point(a, 0);
        let end = canvas_point(b, width_a);
        drawing::draw_antialiased_line_segment_mut(
            &mut canvas,
            start,
            end,
            color,
            pixelops::interpolate,
        );
        drawing::draw_cross_mut(&mut canvas, color, start.0, start.1);
        drawing::draw_cross_mut(&mut canvas, color, end.0, end.1);
    }

    DynamicImage::ImageRgba8(canvas)
}

fn canvas_point(KeyPoint(point): KeyPoint, x_offset: u32) -> (i32, i32) {
    (point.x as i32 + x_offset as i32, point.y as i32)
}

/// Writes [`render_comparison`] artifacts as PNG files.
#[derive(Debug, Default, Clone, Copy)]
pub struct SideBySide;

impl ArtifactRenderer for SideBySide {
    fn render(
        &self,
        path: &Path,
        image_a: &DynamicImage,
        image_b: &DynamicImage,
        result: &ComparisonResult,
    ) -> Result<(), ReportingError> {
        let canvas = render_comparison(image_a, image_b, result);
        DynamicImage::ImageRgb8(canvas.to_rgb8()).save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }
}
