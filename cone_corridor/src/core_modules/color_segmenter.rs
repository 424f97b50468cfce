// THEORY:
// The Color Segmenter is the first stage of the pipeline and the only one that
// looks at color. It turns the RGB frame into a binary `Mask`: a cell is
// foreground iff its pixel's HSV triple lies inside the configured band.
//
// The band is a single axis-aligned box in HSV space. Hue wrap-around (a band
// that crosses 179 -> 0, as a red marker would need) is not supported: callers
// must pick a contiguous band. An inverted range on any channel simply matches
// nothing.

use crate::core_modules::hsv::hsv::Hsv;
use image::{GrayImage, Luma, RgbImage};

/// A single-channel binary image with the same dimensions as its source frame.
pub type Mask = GrayImage;

pub const FOREGROUND: u8 = u8::MAX;
pub const BACKGROUND: u8 = 0;

/// Marks every pixel whose HSV triple lies within `[lower, upper]` (inclusive,
/// per channel) as foreground.
pub fn segment(image: &RgbImage, lower: [u8; 3], upper: [u8; 3]) -> Mask {
    let (width, height) = image.dimensions();
    let mut mask = Mask::new(width, height);

    for (x, y, pixel) in image.enumerate_pixels() {
        if Hsv::from(pixel).within(lower, upper) {
            mask.put_pixel(x, y, Luma([FOREGROUND]));
        }
    }

    mask
}

/// Number of foreground cells in a mask.
pub fn foreground_count(mask: &Mask) -> usize {
    mask.pixels().filter(|p| p.0[0] != BACKGROUND).count()
}
