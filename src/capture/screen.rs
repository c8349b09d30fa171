//! Screen region capture using GDI.
//!
//! This module provides:
//! - Primary screen size (`screen_dimensions`)
//! - System DPI awareness so coordinates are physical pixels on the primary monitor
//! - Region capture from the desktop DC into an RGBA image

use anyhow::Result;
use image::RgbaImage;

use crate::automation::services::ScreenCapturer;
use crate::capture::region::CaptureRegion;

/// Captures screen regions from the desktop device context.
#[derive(Debug, Default)]
pub struct GdiScreenCapturer;

impl ScreenCapturer for GdiScreenCapturer {
    fn capture(&mut self, region: &CaptureRegion) -> Result<RgbaImage> {
        capture_region(region)
    }
}

/// Converts a top-down BGRA buffer (as returned by GetDIBits) to RGBA.
///
/// GDI leaves the alpha channel undefined for screen bitmaps, so it is forced opaque.
fn bgra_to_rgba(width: u32, height: u32, mut data: Vec<u8>) -> Option<RgbaImage> {
    for px in data.chunks_exact_mut(4) {
        px.swap(0, 2);
        px[3] = 255;
    }
    RgbaImage::from_raw(width, height, data)
}

#[cfg(windows)]
mod platform {
    use anyhow::{anyhow, Context, Result};
    use image::RgbaImage;

    use windows::Win32::Foundation::HWND;
    use windows::Win32::Graphics::Gdi::{
        BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDC,
        GetDIBits, ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB,
        DIB_RGB_COLORS, SRCCOPY,
    };
    use windows::Win32::UI::WindowsAndMessaging::{
        GetSystemMetrics, SetProcessDPIAware, SM_CXSCREEN, SM_CYSCREEN,
    };

    use super::bgra_to_rgba;
    use crate::capture::region::CaptureRegion;

    pub fn enable_dpi_awareness() {
        unsafe {
            if !SetProcessDPIAware().as_bool() {
                crate::log("Warning: SetProcessDPIAware failed, coordinates may be scaled");
            }
        }
    }

    pub fn screen_dimensions() -> Result<(u32, u32)> {
        let (width, height) = unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) };
        if width <= 0 || height <= 0 {
            return Err(anyhow!("GetSystemMetrics returned an empty screen size"));
        }
        Ok((width as u32, height as u32))
    }

    pub fn capture_region(region: &CaptureRegion) -> Result<RgbaImage> {
        if region.width == 0 || region.height == 0 {
            return Err(anyhow!("Cannot capture an empty region ({})", region));
        }
        let width = region.width as i32;
        let height = region.height as i32;

        unsafe {
            let screen_dc = GetDC(HWND::default());
            if screen_dc.is_invalid() {
                return Err(anyhow!("GetDC failed for the desktop"));
            }

            let mem_dc = CreateCompatibleDC(screen_dc);
            let bitmap = CreateCompatibleBitmap(screen_dc, width, height);
            let old_bitmap = SelectObject(mem_dc, bitmap);

            let blit = BitBlt(
                mem_dc, 0, 0, width, height, screen_dc, region.x, region.y, SRCCOPY,
            )
            .context("BitBlt from desktop failed");

            let mut bmi = BITMAPINFO {
                bmiHeader: BITMAPINFOHEADER {
                    biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                    biWidth: width,
                    // Negative height = top-down rows
                    biHeight: -height,
                    biPlanes: 1,
                    biBitCount: 32,
                    biCompression: BI_RGB.0,
                    ..Default::default()
                },
                ..Default::default()
            };
            let mut buffer = vec![0u8; region.width as usize * region.height as usize * 4];
            let lines = if blit.is_ok() {
                GetDIBits(
                    mem_dc,
                    bitmap,
                    0,
                    region.height,
                    Some(buffer.as_mut_ptr() as *mut std::ffi::c_void),
                    &mut bmi,
                    DIB_RGB_COLORS,
                )
            } else {
                0
            };

            // Release GDI objects before reporting any failure
            SelectObject(mem_dc, old_bitmap);
            let _ = DeleteObject(bitmap);
            let _ = DeleteDC(mem_dc);
            ReleaseDC(HWND::default(), screen_dc);

            blit?;
            if lines == 0 {
                return Err(anyhow!("GetDIBits returned no scan lines"));
            }

            bgra_to_rgba(region.width, region.height, buffer)
                .ok_or_else(|| anyhow!("Captured buffer does not match {}", region))
        }
    }
}

#[cfg(not(windows))]
mod platform {
    use anyhow::{anyhow, Result};
    use image::RgbaImage;

    use crate::capture::region::CaptureRegion;

    pub fn enable_dpi_awareness() {}

    pub fn screen_dimensions() -> Result<(u32, u32)> {
        Err(anyhow!("Screen capture is only supported on Windows"))
    }

    pub fn capture_region(_region: &CaptureRegion) -> Result<RgbaImage> {
        Err(anyhow!("Screen capture is only supported on Windows"))
    }
}

pub use platform::{capture_region, enable_dpi_awareness, screen_dimensions};
