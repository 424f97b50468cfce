// THEORY:
// The renderer sits outside the detection core. It takes the boundary lines the
// core produced and paints them over a copy of the original frame, and it owns
// the file I/O on both ends of the pipeline. Nothing here feeds back into
// detection.

use crate::core_modules::line_fitter::BoundaryLine;
use crate::error::PipelineError;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How a boundary line is painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineStyle {
    /// RGB color of the line.
    pub color: [u8; 3],
    /// Line width in pixels, at least 1.
    pub thickness: u32,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            color: [255, 0, 0],
            thickness: 2,
        }
    }
}

/// Paints one boundary line onto `canvas`. Pixels outside the canvas are skipped.
pub fn draw_boundary_mut(canvas: &mut RgbImage, line: &BoundaryLine, style: &LineStyle) {
    let (x0, y0) = (line.start.0 as f32, line.start.1 as f32);
    let (x1, y1) = (line.end.0 as f32, line.end.1 as f32);
    let mostly_horizontal = (x1 - x0).abs() >= (y1 - y0).abs();
    let thickness = style.thickness.max(1) as i32;
    let color = Rgb(style.color);

    // Thick lines are stacked one-pixel lines, offset across the main direction.
    for offset in -(thickness - 1) / 2..=thickness / 2 {
        let o = offset as f32;
        let (start, end) = if mostly_horizontal {
            ((x0, y0 + o), (x1, y1 + o))
        } else {
            ((x0 + o, y0), (x1 + o, y1))
        };
        draw_line_segment_mut(canvas, start, end, color);
    }
}

/// Returns a copy of `image` with every line painted on it.
pub fn draw_boundaries(image: &RgbImage, lines: &[BoundaryLine], style: &LineStyle) -> RgbImage {
    let mut canvas = image.clone();
    for line in lines {
        draw_boundary_mut(&mut canvas, line, style);
    }
    canvas
}

/// Decodes any format the `image` crate understands into 8-bit RGB.
pub fn load(path: &Path) -> Result<RgbImage, PipelineError> {
    image::open(path)
        .map(|decoded| decoded.to_rgb8())
        .map_err(|source| PipelineError::ImageDecode {
            path: path.to_path_buf(),
            source,
        })
}

/// Encodes `image` in the format implied by the file extension.
pub fn save(image: &RgbImage, path: &Path) -> Result<(), PipelineError> {
    image.save(path).map_err(|source| PipelineError::ImageWrite {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::line_fitter::LineFit;

    fn flat_line(y: u32, width: u32) -> BoundaryLine {
        BoundaryLine {
            start: (0, y),
            end: (width, y),
            fit: LineFit {
                slope: 0.0,
                intercept: f64::from(y),
            },
        }
    }

    #[test]
    fn no_lines_leave_the_image_untouched() {
        let image = RgbImage::from_pixel(64, 32, Rgb([12, 34, 56]));
        assert_eq!(draw_boundaries(&image, &[], &LineStyle::default()), image);
    }

    #[test]
    fn thickness_two_paints_two_rows() {
        let image = RgbImage::new(100, 60);
        let style = LineStyle::default();
        let out = draw_boundaries(&image, &[flat_line(30, 100)], &style);

        assert_eq!(out.get_pixel(40, 30), &Rgb(style.color));
        assert_eq!(out.get_pixel(40, 31), &Rgb(style.color));
        assert_eq!(out.get_pixel(40, 29), &Rgb([0, 0, 0]));
        assert_eq!(out.get_pixel(40, 32), &Rgb([0, 0, 0]));
        // The endpoint at x == width is off-canvas and must not panic.
        assert_eq!(out.get_pixel(99, 30), &Rgb(style.color));
    }

    #[test]
    fn steep_lines_thicken_sideways() {
        let image = RgbImage::new(50, 50);
        let style = LineStyle {
            color: [0, 255, 0],
            thickness: 3,
        };
        let steep = BoundaryLine {
            start: (20, 0),
            end: (20, 49),
            fit: LineFit {
                slope: 0.0,
                intercept: 0.0,
            },
        };
        let out = draw_boundaries(&image, &[steep], &style);
        for x in 19..=21 {
            assert_eq!(out.get_pixel(x, 25), &Rgb([0, 255, 0]));
        }
        assert_eq!(out.get_pixel(18, 25), &Rgb([0, 0, 0]));
        assert_eq!(out.get_pixel(22, 25), &Rgb([0, 0, 0]));
    }

    #[test]
    fn load_reports_missing_files() {
        let err = load(Path::new("definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, PipelineError::ImageDecode { .. }));
    }

    #[test]
    fn save_then_load_keeps_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let mut image = RgbImage::new(8, 4);
        image.put_pixel(3, 2, Rgb([200, 100, 50]));

        save(&image, &path).unwrap();
        assert_eq!(load(&path).unwrap(), image);
    }
}
