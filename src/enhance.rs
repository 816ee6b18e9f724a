use image::{DynamicImage, RgbaImage};

/// Slider value meaning "unchanged"
pub const NEUTRAL: u32 = 100;
pub const MAX: u32 = 200;

/// Brightness and contrast as slider positions in `0..=200`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adjustments {
    pub brightness: u32,
    pub contrast: u32,
}

impl Default for Adjustments {
    fn default() -> Self {
        Self {
            brightness: NEUTRAL,
            contrast: NEUTRAL,
        }
    }
}

impl Adjustments {
    pub fn is_neutral(&self) -> bool {
        self.brightness == NEUTRAL && self.contrast == NEUTRAL
    }

    fn factor(value: u32) -> f32 {
        value.min(MAX) as f32 / NEUTRAL as f32
    }

    /// Apply brightness, then contrast, returning an RGBA buffer for display
    pub fn apply(&self, image: &DynamicImage) -> RgbaImage {
        let mut out = image.to_rgba8();
        let brightness = Self::factor(self.brightness);
        let contrast = Self::factor(self.contrast);

        if brightness != 1.0 {
            for pixel in out.pixels_mut() {
                for c in 0..3 {
                    pixel[c] = blend(0.0, pixel[c], brightness);
                }
            }
        }

        if contrast != 1.0 {
            let mean = mean_luma(&out);
            for pixel in out.pixels_mut() {
                for c in 0..3 {
                    pixel[c] = blend(mean, pixel[c], contrast);
                }
            }
        }

        out
    }
}

/// `base + factor * (value - base)`, clamped to a byte
fn blend(base: f32, value: u8, factor: f32) -> u8 {
    (base + factor * (value as f32 - base)).round().clamp(0.0, 255.0) as u8
}

/// Mean grey level (ITU-R 601 luma), rounded to an integer
fn mean_luma(image: &RgbaImage) -> f32 {
    let count = image.width() as u64 * image.height() as u64;
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = image
        .pixels()
        .map(|p| {
            let l = (p[0] as u32 * 299 + p[1] as u32 * 587 + p[2] as u32 * 114) / 1000;
            l as u64
        })
        .sum();
    (sum as f32 / count as f32 + 0.5).floor()
}
