use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbaImage};

/// Largest upscale factor honored; beyond this Tesseract gains nothing.
pub const MAX_UPSCALE: u32 = 8;

/// Converts image to binary by keeping only bright pixels.
///
/// Pixels where R > threshold AND G > threshold AND B > threshold become black (text).
/// All other pixels become white (background).
///
/// Chatbox bubbles render white text on a dark translucent panel, so this
/// strips the world behind the bubble before Tesseract sees it.
pub fn threshold_bright_pixels(img: &RgbaImage, threshold: u8) -> GrayImage {
    let (width, height) = img.dimensions();
    let mut output = GrayImage::new(width, height);

    for (x, y, pixel) in img.enumerate_pixels() {
        let [r, g, b, _] = pixel.0;
        let value = if r > threshold && g > threshold && b > threshold {
            0u8
        } else {
            255u8
        };
        output.put_pixel(x, y, Luma([value]));
    }

    output
}

/// Enlarges the image by an integer factor. Tesseract reads small in-game
/// text much better at 2x-3x.
///
/// Factors above `MAX_UPSCALE` are clamped; a factor of 0 or 1 returns a copy.
pub fn upscale(img: &RgbaImage, factor: u32) -> RgbaImage {
    let factor = factor.min(MAX_UPSCALE);
    if factor <= 1 {
        return img.clone();
    }
    let (w, h) = img.dimensions();
    match (w.checked_mul(factor), h.checked_mul(factor)) {
        (Some(new_w), Some(new_h)) => imageops::resize(img, new_w, new_h, FilterType::CatmullRom),
        _ => img.clone(),
    }
}

/// Full preprocessing chain used before OCR.
pub fn prepare_for_ocr(img: &RgbaImage, threshold: u8, scale: u32) -> GrayImage {
    threshold_bright_pixels(&upscale(img, scale), threshold)
}
