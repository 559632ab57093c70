//! Font discovery for captcha and watermark rendering.

use ab_glyph::FontArc;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Locations checked when no font path is configured.
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Loads the configured font, or the first readable system font.
pub fn load_font(configured: Option<&Path>) -> Option<FontArc> {
    let candidates: Vec<PathBuf> = match configured {
        Some(path) => vec![path.to_path_buf()],
        None => SYSTEM_FONTS.iter().map(PathBuf::from).collect(),
    };

    for path in candidates {
        let Ok(bytes) = std::fs::read(&path) else {
            debug!(path = %path.display(), "Font not readable");
            continue;
        };

        match FontArc::try_from_vec(bytes) {
            Ok(font) => {
                info!(path = %path.display(), "Font loaded");
                return Some(font);
            }
            Err(e) => warn!(path = %path.display(), "Invalid font file: {}", e),
        }
    }

    warn!("No usable font found; captcha images are disabled");
    None
}
