//! Text watermarks for uploaded images.

use ab_glyph::{FontArc, PxScale};
use image::{DynamicImage, ImageFormat, Rgba};
use imageproc::drawing::{draw_text_mut, text_size};
use std::io::Cursor;
use std::sync::Arc;
use tracing::warn;

use crate::infrastructure::settings::{SETTING_WATERMARK, SystemSettings};

/// Images with fewer pixels are left untouched.
pub const SMALL_IMAGE_PIXELS: u64 = 90_000;
const FONT_SIZE: f32 = 30.0;
const MARGIN: u32 = 10;
const LIGHT_GRAY: Rgba<u8> = Rgba([211, 211, 211, 255]);

/// Draws `text` in light gray at the bottom right corner.
///
/// Empty text, small images and any decode or encode failure return the
/// input bytes unchanged.
pub fn add_watermark(bytes: &[u8], text: &str, font: &FontArc) -> Vec<u8> {
    if text.trim().is_empty() {
        return bytes.to_vec();
    }

    match try_watermark(bytes, text, font) {
        Ok(Some(out)) => out,
        Ok(None) => bytes.to_vec(),
        Err(e) => {
            warn!("Watermark failed: {}", e);
            bytes.to_vec()
        }
    }
}

/// Stamps images with the site's current `Watermark` setting.
pub struct Watermarker {
    settings: Arc<SystemSettings>,
    font: Option<FontArc>,
}

impl Watermarker {
    /// Without a font every image passes through untouched.
    pub fn new(settings: Arc<SystemSettings>, font: Option<FontArc>) -> Self {
        Self { settings, font }
    }

    /// Watermarks `bytes` with the configured text, read on every call so
    /// setting changes apply without a restart.
    pub fn apply(&self, bytes: &[u8]) -> Vec<u8> {
        let Some(font) = self.font.as_ref() else {
            return bytes.to_vec();
        };
        let text = self.settings.get_or_empty(SETTING_WATERMARK);
        add_watermark(bytes, &text, font)
    }
}

fn try_watermark(
    bytes: &[u8],
    text: &str,
    font: &FontArc,
) -> Result<Option<Vec<u8>>, image::ImageError> {
    let format = image::guess_format(bytes)?;
    let decoded = image::load_from_memory_with_format(bytes, format)?;

    if !is_large_enough(decoded.width(), decoded.height()) {
        return Ok(None);
    }

    let mut canvas = decoded.to_rgba8();
    let scale = PxScale::from(FONT_SIZE);
    let (text_w, text_h) = text_size(scale, font, text);
    let (x, y) = bottom_right(canvas.width(), canvas.height(), text_w, text_h);
    draw_text_mut(&mut canvas, LIGHT_GRAY, x, y, scale, font, text);

    let output = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8()),
        _ => DynamicImage::ImageRgba8(canvas),
    };

    let mut out = Vec::with_capacity(bytes.len());
    output.write_to(&mut Cursor::new(&mut out), format)?;
    Ok(Some(out))
}

fn is_large_enough(width: u32, height: u32) -> bool {
    u64::from(width) * u64::from(height) >= SMALL_IMAGE_PIXELS
}

fn bottom_right(width: u32, height: u32, text_w: u32, text_h: u32) -> (i32, i32) {
    let x = width.saturating_sub(text_w + MARGIN);
    let y = height.saturating_sub(text_h + MARGIN);
    (x as i32, y as i32)
}
