// THEORY (1D Pixel Heuristics):
// The `Pixel` module is the most fundamental unit of the analysis pipeline. It is a
// "dumb" data container for one RGBA sample plus the handful of single-pixel metrics
// the salon heuristics are built from. Anything that needs more than one pixel
// (averages over a face crop, regional saturation, fallbacks) belongs in the
// `color_sampler` and `feature_analyzer` modules.
//
// Heuristic families (all single-pixel, all on raw 0..255 channels):
// - Brightness:  plain channel mean (r+g+b)/3, the measure every threshold in the
//                skin tone table and the feature analyzer is written against
// - Color strength: chroma (max−min) and HSV saturation (chroma/max)
// - Skin likeness: a cheap red-dominance test used to keep background out of the
//                  face-crop average
//
// Channels are read as raw bytes, no gamma decoding. The thresholds downstream were
// tuned on sRGB values straight off a canvas, so linearizing here would shift every
// bucket boundary.

pub mod pixel {
    pub type Byte = u8;
    pub type Channel = Byte;
    pub type Brightness = f32;
    pub type Chroma = u8;
    pub type SaturationHSV = f32;
    pub type Sum = u16;

    pub const CHANNELS: usize = 4;

    /// Minimum red level for a sample to count as skin.
    const SKIN_MIN_RED: i16 = 60;
    /// How far blue may exceed red before a sample stops counting as skin.
    const SKIN_BLUE_TOLERANCE: i16 = 5;

    /// A "dumb" data container representing a single RGBA pixel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pixel {
        /// The red channel value (0-255).
        pub red: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The blue channel value (0-255).
        pub blue: Channel,
        /// The alpha (transparency) channel value (0-255).
        pub alpha: Channel,
    }

    impl Pixel {
        pub fn new(red: Channel, green: Channel, blue: Channel, alpha: Channel) -> Self {
            Pixel {
                red,
                green,
                blue,
                alpha,
            }
        }

        /// =================================Heuristics==================================

        /// Raw RGB channel sum (0..765).
        pub fn sum(&self) -> Sum {
            self.red as Sum + self.green as Sum + self.blue as Sum
        }

        /// Mean of the three color channels (0.0..255.0).
        pub fn brightness(&self) -> Brightness {
            self.sum() as Brightness / 3.0
        }

        pub fn max_channel(&self) -> Channel {
            self.red.max(self.green.max(self.blue))
        }

        pub fn min_channel(&self) -> Channel {
            self.red.min(self.green.min(self.blue))
        }

        /// Chroma (C): color purity = max(R,G,B) - min(R,G,B).
        pub fn chroma(&self) -> Chroma {
            self.max_channel() - self.min_channel()
        }

        /// Saturation (HSV): S = chroma / value, 0.0 for pure black.
        pub fn saturation_hsv(&self) -> SaturationHSV {
            let maximum_channel = self.max_channel();
            if maximum_channel == 0 {
                return 0.0;
            }
            self.chroma() as SaturationHSV / maximum_channel as SaturationHSV
        }

        /// Red-dominance skin test: `r > 60 && r > g && r >= b - 5`.
        ///
        /// Evaluated in signed arithmetic so a blue channel below 5 does not wrap.
        pub fn is_skin_like(&self) -> bool {
            let (red, green, blue) = (self.red as i16, self.green as i16, self.blue as i16);
            red > SKIN_MIN_RED && red > green && red >= blue - SKIN_BLUE_TOLERANCE
        }
    }

    impl From<[Byte; CHANNELS]> for Pixel {
        fn from(bytes: [Byte; CHANNELS]) -> Self {
            Pixel::new(bytes[0], bytes[1], bytes[2], bytes[3])
        }
    }

    impl From<Pixel> for [Byte; CHANNELS] {
        fn from(pixel: Pixel) -> Self {
            [pixel.red, pixel.green, pixel.blue, pixel.alpha]
        }
    }

    impl From<image::Rgba<u8>> for Pixel {
        fn from(rgba: image::Rgba<u8>) -> Self {
            Pixel::from(rgba.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::pixel::*;

    #[test]
    fn brightness_is_plain_channel_mean() {
        let pixel = Pixel::new(200, 170, 150, 255);
        assert_eq!(pixel.sum(), 520);
        assert!((pixel.brightness() - 173.333).abs() < 1e-3);
    }

    #[test]
    fn saturation_of_black_and_gray_is_zero() {
        assert_eq!(Pixel::new(0, 0, 0, 255).saturation_hsv(), 0.0);
        assert_eq!(Pixel::new(128, 128, 128, 255).saturation_hsv(), 0.0);
    }

    #[test]
    fn saturation_of_pure_hue_is_one() {
        assert_eq!(Pixel::new(0, 0, 255, 255).saturation_hsv(), 1.0);
        let half = Pixel::new(200, 100, 100, 255).saturation_hsv();
        assert!((half - 0.5).abs() < 1e-6);
    }

    #[test]
    fn skin_test_requires_red_dominance() {
        assert!(Pixel::new(200, 150, 120, 255).is_skin_like());
        // Blue may exceed red by up to five levels.
        assert!(Pixel::new(100, 80, 105, 255).is_skin_like());
        assert!(!Pixel::new(100, 80, 106, 255).is_skin_like());
        assert!(!Pixel::new(60, 10, 10, 255).is_skin_like());
        assert!(!Pixel::new(150, 150, 100, 255).is_skin_like());
        assert!(!Pixel::new(0, 0, 255, 255).is_skin_like());
    }

    #[test]
    fn low_blue_does_not_wrap() {
        assert!(Pixel::new(61, 0, 0, 255).is_skin_like());
    }

    #[test]
    fn byte_round_trip_keeps_alpha() {
        let bytes: [u8; CHANNELS] = Pixel::from([1, 2, 3, 4]).into();
        assert_eq!(bytes, [1, 2, 3, 4]);
    }
}
