// THEORY (single-pixel color space):
// Marker cones are found by color, and RGB is a poor space to threshold in: an
// orange cone in shadow and an orange cone in sunlight differ in all three RGB
// channels. HSV separates the "which color" question (hue) from "how vivid"
// (saturation) and "how bright" (value), so one box of thresholds covers a cone
// under a wide range of lighting.
//
// The 8-bit convention here is the one shared by most vision toolkits, so
// thresholds tuned elsewhere can be pasted in unchanged:
// - hue:        degrees / 2, in 0..=179
// - saturation: 255 * chroma / value, in 0..=255
// - value:      max(R, G, B), in 0..=255
//
// Like `Pixel`, an `Hsv` is a "dumb" data container with no knowledge of its
// neighbors.

pub mod hsv {
    use image::Rgb;

    pub type Hue = u8;
    pub type Saturation = u8;
    pub type Value = u8;

    /// Largest representable hue. Hue is stored as half-degrees.
    pub const HUE_MAX: Hue = 179;

    /// A single pixel in 8-bit HSV.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Hsv {
        pub hue: Hue,
        pub saturation: Saturation,
        pub value: Value,
    }

    impl Hsv {
        pub fn new(hue: Hue, saturation: Saturation, value: Value) -> Self {
            Self {
                hue,
                saturation,
                value,
            }
        }

        /// Converts one 8-bit RGB pixel. Achromatic pixels (R == G == B) get hue 0.
        pub fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
            let maximum = red.max(green).max(blue);
            let minimum = red.min(green).min(blue);
            let chroma = maximum - minimum;

            let saturation = if maximum == 0 {
                0
            } else {
                (f32::from(chroma) * 255.0 / f32::from(maximum)).round() as Saturation
            };

            let hue = if chroma == 0 {
                0
            } else {
                let (r, g, b) = (f32::from(red), f32::from(green), f32::from(blue));
                let c = f32::from(chroma);
                let degrees = if maximum == red {
                    60.0 * (g - b) / c
                } else if maximum == green {
                    120.0 + 60.0 * (b - r) / c
                } else {
                    240.0 + 60.0 * (r - g) / c
                };
                let degrees = if degrees < 0.0 { degrees + 360.0 } else { degrees };
                let half_degrees = (degrees / 2.0).round() as Hue;
                // 359.x degrees rounds up to 180, which is the same angle as 0.
                if half_degrees > HUE_MAX { 0 } else { half_degrees }
            };

            Self {
                hue,
                saturation,
                value: maximum,
            }
        }

        /// The three channels in `[hue, saturation, value]` order, matching the
        /// layout of threshold triples.
        pub fn channels(&self) -> [u8; 3] {
            [self.hue, self.saturation, self.value]
        }

        /// True iff every channel lies in the inclusive `[lower, upper]` range.
        pub fn within(&self, lower: [u8; 3], upper: [u8; 3]) -> bool {
            self.channels()
                .iter()
                .zip(lower.iter().zip(upper.iter()))
                .all(|(channel, (low, high))| low <= channel && channel <= high)
        }
    }

    impl From<Rgb<u8>> for Hsv {
        fn from(pixel: Rgb<u8>) -> Self {
            let [red, green, blue] = pixel.0;
            Hsv::from_rgb(red, green, blue)
        }
    }

    impl From<&Rgb<u8>> for Hsv {
        fn from(pixel: &Rgb<u8>) -> Self {
            Hsv::from(*pixel)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::hsv::*;

    #[test]
    fn primaries_land_on_their_half_degree_hues() {
        assert_eq!(Hsv::from_rgb(255, 0, 0), Hsv::new(0, 255, 255));
        assert_eq!(Hsv::from_rgb(0, 255, 0), Hsv::new(60, 255, 255));
        assert_eq!(Hsv::from_rgb(0, 0, 255), Hsv::new(120, 255, 255));
    }

    #[test]
    fn cone_orange_falls_in_the_default_band() {
        let orange = Hsv::from_rgb(255, 128, 0);
        assert_eq!(orange, Hsv::new(15, 255, 255));
        assert!(orange.within([10, 100, 100], [25, 255, 255]));
    }

    #[test]
    fn shaded_orange_keeps_hue_and_saturation() {
        let shaded = Hsv::from_rgb(128, 64, 0);
        assert_eq!(shaded.hue, 15);
        assert_eq!(shaded.saturation, 255);
        assert_eq!(shaded.value, 128);
    }

    #[test]
    fn achromatic_pixels_have_zero_hue_and_saturation() {
        assert_eq!(Hsv::from_rgb(0, 0, 0), Hsv::new(0, 0, 0));
        assert_eq!(Hsv::from_rgb(128, 128, 128), Hsv::new(0, 0, 128));
        assert_eq!(Hsv::from_rgb(255, 255, 255), Hsv::new(0, 0, 255));
    }

    #[test]
    fn hue_just_below_a_full_turn_wraps_to_zero() {
        // 359.76 degrees
        assert_eq!(Hsv::from_rgb(255, 0, 1).hue, 0);
    }

    #[test]
    fn within_is_inclusive_on_both_ends() {
        let pixel = Hsv::new(10, 100, 255);
        assert!(pixel.within([10, 100, 100], [25, 255, 255]));
        assert!(!pixel.within([11, 100, 100], [25, 255, 255]));
        assert!(!pixel.within([10, 100, 100], [25, 255, 254]));
    }
}
