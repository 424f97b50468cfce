// THEORY:
// The Blob Extractor is the spatial grouping layer. It turns the refined mask
// into a short list of marker centroids.
//
// Algorithm:
// 1.  **Outer-boundary filling**: A marker is described by its outer boundary
//     only. Background cells that cannot reach the image border are enclosed
//     by some blob and are treated as part of it, so a cone with a dark stripe
//     counts as one solid region and anything drawn inside that stripe is not
//     reported on its own. Background is labelled with 4-connectivity, the
//     topological dual of 8-connected foreground, and every background
//     component that never touches the border is painted over.
// 2.  **Labelling**: Maximal 8-connected foreground components are labelled
//     with `imageproc`'s connected component pass.
// 3.  **Moment accumulation**: One pass over the label image accumulates the raw
//     moments `m00` (area), `m10` and `m01` plus a bounding box per label.
// 4.  **Filtering**: Only blobs with `area > min_area` produce a centroid
//     `(m10 / m00, m01 / m00)`, truncated to integer pixels. A zero-area blob
//     cannot come out of the labeller, but the division is still guarded.
//
// The returned order follows label order and carries no spatial meaning;
// the Side Partitioner imposes the only ordering that matters.

use crate::core_modules::center_point::CenterPoint;
use crate::core_modules::color_segmenter::{Mask, BACKGROUND, FOREGROUND};

pub mod blob_extractor {
    use super::*;
    use image::Luma;
    use image::imageops::invert;
    use imageproc::region_labelling::{connected_components, Connectivity};
    use std::collections::{BTreeMap, BTreeSet};

    /// A connected foreground region with its raw image moments.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Blob {
        /// Pixel count, i.e. the zeroth moment `m00`.
        pub area: u64,
        /// Sum of x over the region's pixels.
        pub m10: u64,
        /// Sum of y over the region's pixels.
        pub m01: u64,
        /// Inclusive bounding box as top-left and bottom-right corners.
        pub bounding_box: (CenterPoint, CenterPoint),
    }

    impl Blob {
        fn seed(x: u32, y: u32) -> Self {
            Self {
                area: 0,
                m10: 0,
                m01: 0,
                bounding_box: (CenterPoint::new(x, y), CenterPoint::new(x, y)),
            }
        }

        fn add(&mut self, x: u32, y: u32) {
            self.area += 1;
            self.m10 += u64::from(x);
            self.m01 += u64::from(y);
            let (min, max) = &mut self.bounding_box;
            min.x = min.x.min(x);
            min.y = min.y.min(y);
            max.x = max.x.max(x);
            max.y = max.y.max(y);
        }

        /// The first-moment center, or `None` for a degenerate zero-area blob.
        pub fn centroid(&self) -> Option<CenterPoint> {
            if self.area == 0 {
                return None;
            }
            Some(CenterPoint::new(
                (self.m10 / self.area) as u32,
                (self.m01 / self.area) as u32,
            ))
        }
    }

    /// Returns a copy of `mask` where every background cell enclosed by
    /// foreground has been turned into foreground.
    pub fn fill_enclosed_holes(mask: &Mask) -> Mask {
        let (width, height) = mask.dimensions();
        let mut inverted = mask.clone();
        invert(&mut inverted);
        let background = connected_components(&inverted, Connectivity::Four, Luma([BACKGROUND]));

        // Background components reaching the border lie outside every blob.
        let outside: BTreeSet<u32> = background
            .enumerate_pixels()
            .filter(|(x, y, _)| *x == 0 || *y == 0 || *x + 1 == width || *y + 1 == height)
            .map(|(_, _, label)| label.0[0])
            .filter(|&label| label != 0)
            .collect();

        let mut filled = mask.clone();
        for (x, y, label) in background.enumerate_pixels() {
            let label = label.0[0];
            if label != 0 && !outside.contains(&label) {
                filled.put_pixel(x, y, Luma([FOREGROUND]));
            }
        }
        filled
    }

    /// All outer-boundary blobs of the mask, in label order.
    pub fn extract_blobs(mask: &Mask) -> Vec<Blob> {
        let filled = fill_enclosed_holes(mask);
        let labels = connected_components(&filled, Connectivity::Eight, Luma([BACKGROUND]));

        let mut blobs: BTreeMap<u32, Blob> = BTreeMap::new();
        for (x, y, label) in labels.enumerate_pixels() {
            let label = label.0[0];
            if label == 0 {
                continue;
            }
            blobs
                .entry(label)
                .or_insert_with(|| Blob::seed(x, y))
                .add(x, y);
        }

        blobs.into_values().collect()
    }

    /// Centroids of every blob whose area is strictly greater than `min_area`.
    pub fn extract_centers(mask: &Mask, min_area: u64) -> Vec<CenterPoint> {
        let blobs = extract_blobs(mask);
        let found = blobs.len();

        let centers: Vec<CenterPoint> = blobs
            .iter()
            .filter(|blob| blob.area > min_area)
            .filter_map(Blob::centroid)
            .collect();

        log::debug!(
            "blob extraction: {} blobs found, {} above min area {}",
            found,
            centers.len(),
            min_area
        );
        centers
    }
}

#[cfg(test)]
mod tests {
    use super::blob_extractor::*;
    use super::*;
    use image::Luma;

    fn fill(mask: &mut Mask, xs: std::ops::RangeInclusive<u32>, ys: std::ops::RangeInclusive<u32>) {
        for y in ys {
            for x in xs.clone() {
                mask.put_pixel(x, y, Luma([FOREGROUND]));
            }
        }
    }

    fn sorted(mut points: Vec<CenterPoint>) -> Vec<CenterPoint> {
        points.sort();
        points
    }

    #[test]
    fn empty_mask_has_no_centers() {
        assert!(extract_centers(&Mask::new(32, 32), 0).is_empty());
    }

    #[test]
    fn separate_squares_give_truncated_centroids() {
        let mut mask = Mask::new(100, 100);
        fill(&mut mask, 10..=19, 20..=29);
        fill(&mut mask, 60..=68, 70..=78);

        let centers = sorted(extract_centers(&mask, 50));
        // First square: mean x 14.5, mean y 24.5.
        assert_eq!(centers, vec![CenterPoint::new(14, 24), CenterPoint::new(64, 74)]);
    }

    #[test]
    fn diagonal_neighbours_belong_to_one_blob() {
        let mut mask = Mask::new(10, 10);
        for i in 0..5 {
            mask.put_pixel(2 + i, 2 + i, Luma([FOREGROUND]));
        }
        let blobs = extract_blobs(&mask);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].area, 5);
        assert_eq!(blobs[0].centroid(), Some(CenterPoint::new(4, 4)));
    }

    #[test]
    fn enclosed_holes_count_towards_area() {
        let mut mask = Mask::new(30, 30);
        fill(&mut mask, 5..=14, 5..=14);
        for y in 8..=11 {
            for x in 8..=11 {
                mask.put_pixel(x, y, Luma([BACKGROUND]));
            }
        }

        let blobs = extract_blobs(&mask);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].area, 100);
        assert_eq!(
            blobs[0].bounding_box,
            (CenterPoint::new(5, 5), CenterPoint::new(14, 14))
        );
    }

    #[test]
    fn blobs_nested_inside_a_hole_are_not_reported() {
        let mut mask = Mask::new(40, 40);
        fill(&mut mask, 5..=25, 5..=25);
        fill(&mut mask, 8..=22, 8..=22);
        for y in 8..=22 {
            for x in 8..=22 {
                mask.put_pixel(x, y, Luma([BACKGROUND]));
            }
        }
        // An island in the middle of the ring.
        fill(&mut mask, 14..=16, 14..=16);

        let blobs = extract_blobs(&mask);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].area, 21 * 21);
        assert_eq!(blobs[0].centroid(), Some(CenterPoint::new(15, 15)));
    }

    #[test]
    fn diagonal_gaps_do_not_open_a_hole() {
        let mut mask = Mask::new(20, 20);
        fill(&mut mask, 5..=14, 5..=14);
        for y in 6..=13 {
            for x in 6..=13 {
                mask.put_pixel(x, y, Luma([BACKGROUND]));
            }
        }
        // The hole now touches the outside only through a corner.
        mask.put_pixel(5, 5, Luma([BACKGROUND]));

        let filled = fill_enclosed_holes(&mask);
        assert_eq!(filled.get_pixel(9, 9).0[0], FOREGROUND);
        assert_eq!(filled.get_pixel(5, 5).0[0], BACKGROUND);

        let blobs = extract_blobs(&mask);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].area, 99);
    }

    #[test]
    fn full_frame_foreground_is_left_alone() {
        let mut mask = Mask::new(6, 4);
        fill(&mut mask, 0..=5, 0..=3);
        assert_eq!(fill_enclosed_holes(&mask), mask);
        assert_eq!(extract_blobs(&mask)[0].area, 24);
    }

    #[test]
    fn open_notches_are_not_treated_as_holes() {
        let mut mask = Mask::new(20, 20);
        fill(&mut mask, 0..=9, 0..=9);
        // A channel from the border into the square.
        for x in 0..=4 {
            mask.put_pixel(x, 5, Luma([BACKGROUND]));
        }
        let blobs = extract_blobs(&mask);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].area, 95);
    }

    #[test]
    fn min_area_is_a_strict_lower_bound() {
        let mut mask = Mask::new(40, 40);
        fill(&mut mask, 2..=6, 2..=11); // area 50
        fill(&mut mask, 20..=30, 20..=30); // area 121

        let centers = extract_centers(&mask, 50);
        assert_eq!(centers, vec![CenterPoint::new(25, 25)]);
        assert_eq!(extract_centers(&mask, 49).len(), 2);
    }

    #[test]
    fn raising_min_area_never_adds_centers() {
        let mut mask = Mask::new(120, 40);
        fill(&mut mask, 2..=3, 2..=3);
        fill(&mut mask, 10..=16, 10..=16);
        fill(&mut mask, 30..=40, 5..=15);
        fill(&mut mask, 60..=80, 10..=30);
        mask.put_pixel(100, 30, Luma([FOREGROUND]));

        let mut previous = usize::MAX;
        for min_area in [0, 1, 4, 48, 49, 120, 121, 440, 441, 10_000] {
            let count = extract_centers(&mask, min_area).len();
            assert!(count <= previous, "min_area {min_area} produced {count} > {previous}");
            previous = count;
        }
        assert_eq!(extract_centers(&mask, 0).len(), 5);
        assert_eq!(extract_centers(&mask, 10_000).len(), 0);
    }

    #[test]
    fn zero_area_blob_has_no_centroid() {
        let blob = Blob {
            area: 0,
            m10: 0,
            m01: 0,
            bounding_box: (CenterPoint::new(0, 0), CenterPoint::new(0, 0)),
        };
        assert_eq!(blob.centroid(), None);
    }
}
