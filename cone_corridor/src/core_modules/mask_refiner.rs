// THEORY:
// Raw color masks are noisy: single stray pixels on orange-ish clutter, and
// pinholes inside real cones where a highlight or a stripe falls outside the
// band. Two morphological passes clean this up, in a fixed order:
//
// 1. Opening (erode, then dilate) deletes foreground specks smaller than the
//    opening element while leaving larger shapes where they were.
// 2. Closing (dilate, then erode) fills holes and gaps smaller than the closing
//    element inside the surviving shapes.
//
// Swapping the order would let closing glue specks onto the cones before
// opening had a chance to remove them.
//
// A square element of side `n` is the L-infinity ball of radius `n / 2`, which
// is what `imageproc` morphology is parameterised by. Sides must be odd; a side
// of 1 (radius 0) leaves the mask untouched.

use crate::core_modules::color_segmenter::Mask;
use imageproc::distance_transform::Norm;
use imageproc::morphology::{close_mut, open_mut};

/// L-infinity radius of a square structuring element with the given side.
pub fn kernel_radius(kernel_size: u8) -> u8 {
    kernel_size / 2
}

/// Opens with an `open_kernel_size` square, then closes with a
/// `close_kernel_size` square. The mask is refined in place and handed back.
pub fn refine(mut mask: Mask, open_kernel_size: u8, close_kernel_size: u8) -> Mask {
    refine_mut(&mut mask, open_kernel_size, close_kernel_size);
    mask
}

pub fn refine_mut(mask: &mut Mask, open_kernel_size: u8, close_kernel_size: u8) {
    open_mut(mask, Norm::LInf, kernel_radius(open_kernel_size));
    close_mut(mask, Norm::LInf, kernel_radius(close_kernel_size));
}
