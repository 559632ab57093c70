//! Captcha codes and images.

use ab_glyph::{FontArc, PxScale};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_line_segment_mut, draw_text_mut};
use rand::Rng;
use std::io::Cursor;
use thiserror::Error;

/// Characters without look-alikes (no 0/O, 1/I/l).
const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghjkmnpqrstuvwxyz23456789";

pub const CODE_LENGTH: usize = 6;
const WIDTH: u32 = 150;
const HEIGHT: u32 = 48;

#[derive(Debug, Error)]
pub enum CaptchaError {
    #[error("captcha image encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Generates a random captcha code.
pub fn generate_code(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Renders a captcha code to a JPEG image.
#[cfg_attr(test, mockall::automock)]
pub trait CaptchaRenderer: Send + Sync {
    fn render(&self, code: &str) -> Result<Vec<u8>, CaptchaError>;
}

/// Draws the code with a TrueType font over noise lines.
pub struct FontCaptchaRenderer {
    font: FontArc,
}

impl FontCaptchaRenderer {
    pub fn new(font: FontArc) -> Self {
        Self { font }
    }
}

impl CaptchaRenderer for FontCaptchaRenderer {
    fn render(&self, code: &str) -> Result<Vec<u8>, CaptchaError> {
        let mut rng = rand::rng();
        let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, Rgb([245, 245, 245]));

        for _ in 0..8 {
            let color = Rgb([
                rng.random_range(120..220),
                rng.random_range(120..220),
                rng.random_range(120..220),
            ]);
            let start = (
                rng.random_range(0.0..WIDTH as f32),
                rng.random_range(0.0..HEIGHT as f32),
            );
            let end = (
                rng.random_range(0.0..WIDTH as f32),
                rng.random_range(0.0..HEIGHT as f32),
            );
            draw_line_segment_mut(&mut img, start, end, color);
        }

        let step = (WIDTH as usize - 16) / code.chars().count().max(1);
        for (i, ch) in code.chars().enumerate() {
            let color = Rgb([
                rng.random_range(0..100),
                rng.random_range(0..100),
                rng.random_range(0..100),
            ]);
            let scale = PxScale::from(rng.random_range(26.0..34.0));
            let x = 8 + (i * step) as i32;
            let y = rng.random_range(2..12);
            draw_text_mut(&mut img, color, x, y, scale, &self.font, &ch.to_string());
        }

        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_code() {
        let code = generate_code(CODE_LENGTH);
        assert_eq!(code.len(), CODE_LENGTH);
        assert!(code.bytes().all(|b| ALPHABET.contains(&b)));
        assert_ne!(generate_code(16), generate_code(16));
    }
}
