//! Capture rectangle geometry.

use anyhow::{bail, Result};

/// A screen rectangle in absolute pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl CaptureRegion {
    /// Returns the region grown by `margin` pixels on every side.
    pub fn expanded(&self, margin: u32) -> CaptureRegion {
        CaptureRegion {
            x: self.x - margin as i32,
            y: self.y - margin as i32,
            width: self.width + margin * 2,
            height: self.height + margin * 2,
        }
    }
}

impl std::fmt::Display for CaptureRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{} at ({}, {})",
            self.width, self.height, self.x, self.y
        )
    }
}

fn check_fraction(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        bail!("{} must be within [0.0, 1.0], got {}", name, value);
    }
    Ok(())
}

/// Computes the capture rectangle from screen size and fractions.
///
/// The region is `width_scale` of the screen wide and horizontally centered,
/// `height_scale` of the screen tall, with its top edge at `vertical_offset`
/// of the screen height. The top edge is pulled up when the region would
/// otherwise extend past the bottom of the screen.
pub fn calculate_bounding_box(
    screen_width: u32,
    screen_height: u32,
    vertical_offset: f64,
    height_scale: f64,
    width_scale: f64,
) -> Result<CaptureRegion> {
    check_fraction("vertical_offset", vertical_offset)?;
    check_fraction("height_scale", height_scale)?;
    check_fraction("width_scale", width_scale)?;

    let width = ((screen_width as f64 * width_scale).round() as u32).min(screen_width);
    let height = ((screen_height as f64 * height_scale).round() as u32).min(screen_height);

    let x = (screen_width - width) / 2;
    let y = ((screen_height as f64 * vertical_offset).round() as u32).min(screen_height - height);

    Ok(CaptureRegion {
        x: x as i32,
        y: y as i32,
        width,
        height,
    })
}
