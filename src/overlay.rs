//! Click-through border drawn around the capture region.
//!
//! A layered, topmost, non-activating popup sized to the region plus the
//! border on each side. The interior is painted with a color key so it is
//! fully transparent and never shows up in the captured pixels.

use anyhow::Result;

use crate::automation::services::OverlayWindow;

/// Edges of the border frame as `(left, top, right, bottom)` client rectangles.
///
/// Order: top, bottom, left, right. Empty when the border is zero.
pub fn border_rects(width: i32, height: i32, border: i32) -> Vec<(i32, i32, i32, i32)> {
    if border <= 0 || width <= 0 || height <= 0 {
        return Vec::new();
    }
    let b = border.min(width).min(height);
    vec![
        (0, 0, width, b),
        (0, height - b, width, height),
        (0, b, b, height - b),
        (width - b, b, width, height - b),
    ]
}

#[cfg(windows)]
mod platform {
    use anyhow::{anyhow, Result};
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

    use windows::core::w;
    use windows::Win32::Foundation::{BOOL, COLORREF, HWND, LPARAM, LRESULT, RECT, WPARAM};
    use windows::Win32::Graphics::Gdi::{
        BeginPaint, CreateSolidBrush, DeleteObject, EndPaint, FillRect, InvalidateRect,
        UpdateWindow, PAINTSTRUCT,
    };
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows::Win32::UI::WindowsAndMessaging::{
        CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetClientRect,
        PeekMessageW, RegisterClassW, SetLayeredWindowAttributes, ShowWindow, TranslateMessage,
        LWA_COLORKEY, MSG, PM_REMOVE, SW_SHOWNOACTIVATE, WINDOW_EX_STYLE, WM_ERASEBKGND,
        WM_PAINT, WNDCLASSW, WS_EX_LAYERED, WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW, WS_EX_TOPMOST,
        WS_EX_TRANSPARENT, WS_POPUP,
    };

    use super::border_rects;
    use crate::capture::CaptureRegion;

    /// Magenta, painted over the interior and keyed out by the compositor.
    const TRANSPARENT_KEY: COLORREF = COLORREF(0x00FF00FF);
    /// Red (COLORREF is 0x00BBGGRR).
    const BORDER_COLOR: COLORREF = COLORREF(0x000000FF);

    /// Read by the window procedure on every paint.
    static BORDER_WIDTH: AtomicI32 = AtomicI32::new(3);

    fn overlay_ex_style() -> WINDOW_EX_STYLE {
        WS_EX_LAYERED | WS_EX_TOPMOST | WS_EX_TOOLWINDOW | WS_EX_NOACTIVATE | WS_EX_TRANSPARENT
    }

    unsafe extern "system" fn overlay_wndproc(
        hwnd: HWND,
        msg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        unsafe {
            match msg {
                WM_ERASEBKGND => LRESULT(1),
                WM_PAINT => {
                    let mut ps = PAINTSTRUCT::default();
                    let hdc = BeginPaint(hwnd, &mut ps);
                    let mut client = RECT::default();
                    if !hdc.is_invalid() && GetClientRect(hwnd, &mut client).is_ok() {
                        let key_brush = CreateSolidBrush(TRANSPARENT_KEY);
                        FillRect(hdc, &client, key_brush);
                        let _ = DeleteObject(key_brush);

                        let border_brush = CreateSolidBrush(BORDER_COLOR);
                        let border = BORDER_WIDTH.load(Ordering::Relaxed);
                        for (left, top, right, bottom) in
                            border_rects(client.right, client.bottom, border)
                        {
                            let edge = RECT { left, top, right, bottom };
                            FillRect(hdc, &edge, border_brush);
                        }
                        let _ = DeleteObject(border_brush);
                    }
                    let _ = EndPaint(hwnd, &ps);
                    LRESULT(0)
                }
                _ => DefWindowProcW(hwnd, msg, wparam, lparam),
            }
        }
    }

    fn pump_messages() {
        unsafe {
            let mut msg = MSG::default();
            while PeekMessageW(&mut msg, HWND::default(), 0, 0, PM_REMOVE).into() {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
    }

    pub struct BorderOverlay {
        hwnd: Option<HWND>,
    }

    impl BorderOverlay {
        pub fn create(region: &CaptureRegion, border_width: u32) -> Result<Self> {
            static REGISTER_CLASS: Once = Once::new();
            let class_name = w!("OcrSongQueueBorderOverlay");
            BORDER_WIDTH.store(border_width as i32, Ordering::Relaxed);

            let outer = region.expanded(border_width);

            unsafe {
                let hinstance = GetModuleHandleW(None)?;

                REGISTER_CLASS.call_once(|| {
                    let wc = WNDCLASSW {
                        lpfnWndProc: Some(overlay_wndproc),
                        hInstance: hinstance.into(),
                        lpszClassName: class_name,
                        ..Default::default()
                    };
                    if RegisterClassW(&wc) == 0 {
                        crate::log("Warning: RegisterClassW failed for overlay window");
                    }
                });

                let hwnd = CreateWindowExW(
                    overlay_ex_style(),
                    class_name,
                    w!("Capture Region"),
                    WS_POPUP,
                    outer.x,
                    outer.y,
                    outer.width as i32,
                    outer.height as i32,
                    None,
                    None,
                    hinstance,
                    None,
                )
                .map_err(|e| anyhow!("Failed to create overlay window: {}", e))?;

                if let Err(e) = SetLayeredWindowAttributes(hwnd, TRANSPARENT_KEY, 0, LWA_COLORKEY) {
                    let _ = DestroyWindow(hwnd);
                    return Err(anyhow!("Failed to set overlay transparency: {}", e));
                }

                let _ = ShowWindow(hwnd, SW_SHOWNOACTIVATE);
                let _ = UpdateWindow(hwnd);
                pump_messages();

                crate::log(&format!("Overlay shown around {}", region));
                Ok(Self { hwnd: Some(hwnd) })
            }
        }

        pub fn refresh(&mut self) -> Result<()> {
            let Some(hwnd) = self.hwnd else {
                return Err(anyhow!("Overlay window was already destroyed"));
            };
            unsafe {
                let _ = InvalidateRect(hwnd, None, BOOL::from(false));
            }
            pump_messages();
            Ok(())
        }

        pub fn destroy(&mut self) {
            if let Some(hwnd) = self.hwnd.take() {
                unsafe {
                    if let Err(e) = DestroyWindow(hwnd) {
                        crate::log(&format!("Failed to destroy overlay window: {}", e));
                    }
                }
                pump_messages();
                crate::log("Overlay window destroyed");
            }
        }
    }

    impl Drop for BorderOverlay {
        fn drop(&mut self) {
            self.destroy();
        }
    }

}

#[cfg(not(windows))]
mod platform {
    use anyhow::{anyhow, Result};

    use crate::capture::CaptureRegion;

    pub struct BorderOverlay;

    impl BorderOverlay {
        pub fn create(_region: &CaptureRegion, _border_width: u32) -> Result<Self> {
            Err(anyhow!("The capture overlay is only supported on Windows"))
        }

        pub fn refresh(&mut self) -> Result<()> {
            Ok(())
        }

        pub fn destroy(&mut self) {}
    }
}

pub use platform::BorderOverlay;

impl OverlayWindow for BorderOverlay {
    fn refresh(&mut self) -> Result<()> {
        BorderOverlay::refresh(self)
    }

    fn destroy(&mut self) {
        BorderOverlay::destroy(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_border_rects_frame_the_client_area() {
        let rects = border_rects(100, 50, 3);
        assert_eq!(
            rects,
            vec![
                (0, 0, 100, 3),
                (0, 47, 100, 50),
                (0, 3, 3, 47),
                (97, 3, 100, 47),
            ]
        );
    }

    #[test]
    fn test_border_rects_leave_interior_uncovered() {
        let rects = border_rects(20, 20, 2);
        let covers = |x: i32, y: i32| {
            rects
                .iter()
                .any(|&(l, t, r, b)| x >= l && x < r && y >= t && y < b)
        };
        assert!(covers(0, 0));
        assert!(covers(19, 10));
        assert!(!covers(2, 2));
        assert!(!covers(10, 10));
        assert!(!covers(17, 17));
    }

    #[test]
    fn test_zero_border_draws_nothing() {
        assert!(border_rects(100, 100, 0).is_empty());
        assert!(border_rects(0, 100, 3).is_empty());
    }
}
