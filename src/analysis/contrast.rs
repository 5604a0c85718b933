use serde::{Deserialize, Serialize};

/// Text colour to lay over a sampled image area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextTone {
    Light,
    Dark,
}

/// Pixel rectangle inside an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn full(width: u32, height: u32) -> Region {
        Region {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

pub const DEFAULT_LUMINANCE_THRESHOLD: f64 = 0.5;

/// Mean perceived brightness in [0, 1] of the opaque pixels on a `step`-spaced
/// grid inside `region`. `pixels` is tightly packed RGBA8.
///
/// Returns `None` for a truncated buffer or when nothing opaque was sampled.
pub fn sample_luminance(
    pixels: &[u8],
    width: u32,
    height: u32,
    region: Region,
    step: u32,
) -> Option<f64> {
    let expected = (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(4)?;
    if pixels.len() < expected {
        return None;
    }

    let x_end = region.x.saturating_add(region.width).min(width);
    let y_end = region.y.saturating_add(region.height).min(height);
    let step = step.max(1) as usize;

    let mut total = 0.0;
    let mut samples = 0usize;

    for y in (region.y..y_end).step_by(step) {
        for x in (region.x..x_end).step_by(step) {
            let offset = (y as usize * width as usize + x as usize) * 4;
            let px = &pixels[offset..offset + 4];
            if px[3] == 0 {
                continue;
            }
            total += perceived_brightness(px[0], px[1], px[2]);
            samples += 1;
        }
    }

    if samples == 0 {
        None
    } else {
        Some(total / samples as f64)
    }
}

pub fn perceived_brightness(r: u8, g: u8, b: u8) -> f64 {
    (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64) / 255.0
}

/// Dark text on bright backgrounds, light text otherwise. An unknown
/// background keeps the template's light text.
pub fn pick_text_tone(luminance: Option<f64>, threshold: f64) -> TextTone {
    match luminance {
        Some(l) if l > threshold => TextTone::Dark,
        _ => TextTone::Light,
    }
}
