//! Screen capture, implementing `relay_core`'s [`ScreenCapture`] collaborator
//! trait: a DXGI Desktop Duplication pipeline on Windows, behind a platform
//! gate, with a non-Windows stub that fails at construction rather than at
//! first capture.
//!
//! The DXGI path yields BGRA8 rows (possibly padded to a larger row pitch);
//! [`bgra_to_rgb`] strips the alpha channel, reorders to RGB, and drops the
//! padding to produce the dense `(h, w, 3)` buffer `Frame::new` expects.

use relay_core::error::RelayError;
use relay_core::session::collab::ScreenCapture;
use relay_core::session::types::CursorPosition;
use relay_core::Frame;

/// DXGI-backed screen capturer for a single monitor.
pub struct DxgiScreenCapture {
    width: u32,
    height: u32,
    timeout_ms: u32,

    #[cfg(target_os = "windows")]
    inner: platform::Inner,
}

impl DxgiScreenCapture {
    /// Initialise capture for `monitor_index` (0 = primary), with an
    /// `AcquireNextFrame` timeout of `timeout_ms` milliseconds.
    #[cfg(target_os = "windows")]
    pub fn new(monitor_index: u32, timeout_ms: u32) -> Result<Self, RelayError> {
        let inner = platform::Inner::new(monitor_index)?;
        let (width, height) = (inner.width, inner.height);
        Ok(Self { width, height, timeout_ms, inner })
    }

    #[cfg(not(target_os = "windows"))]
    pub fn new(_monitor_index: u32, _timeout_ms: u32) -> Result<Self, RelayError> {
        Err(RelayError::Configuration(
            "DXGI Desktop Duplication is only available on Windows".into(),
        ))
    }
}

impl ScreenCapture for DxgiScreenCapture {
    fn screen_size(&self) -> (u16, u16) {
        (self.width.min(u16::MAX as u32) as u16, self.height.min(u16::MAX as u32) as u16)
    }

    #[cfg(target_os = "windows")]
    fn capture(&mut self) -> Result<(Frame, CursorPosition), RelayError> {
        let raw = self.inner.capture_frame(self.timeout_ms)?;
        let frame = bgra_to_rgb(&raw.data, self.width as usize, self.height as usize, raw.stride as usize);
        let cursor = platform::cursor_position();
        Ok((frame, cursor))
    }

    #[cfg(not(target_os = "windows"))]
    fn capture(&mut self) -> Result<(Frame, CursorPosition), RelayError> {
        Err(RelayError::Configuration("screen capture is not supported on this platform".into()))
    }
}

/// Strip the alpha channel, reorder BGRA -> RGB, and drop row padding.
fn bgra_to_rgb(data: &[u8], width: usize, height: usize, stride: usize) -> Frame {
    let mut out = vec![0u8; width * height * 3];
    for y in 0..height {
        let row = &data[y * stride..y * stride + width * 4];
        let out_row = &mut out[y * width * 3..(y + 1) * width * 3];
        for x in 0..width {
            let px = &row[x * 4..x * 4 + 4];
            out_row[x * 3] = px[2];
            out_row[x * 3 + 1] = px[1];
            out_row[x * 3 + 2] = px[0];
        }
    }
    Frame::new(height, width, out)
}

#[cfg(target_os = "windows")]
mod platform {
    use std::time::Duration;

    use relay_core::error::RelayError;
    use relay_core::session::types::CursorPosition;
    use windows::core::Interface;
    use windows::Win32::Foundation::POINT;
    use windows::Win32::Graphics::{
        Direct3D::D3D_DRIVER_TYPE_HARDWARE,
        Direct3D11::*,
        Dxgi::{Common::*, *},
    };
    use windows::Win32::UI::WindowsAndMessaging::GetCursorPos;

    pub struct RawFrame {
        pub data: Vec<u8>,
        pub stride: u32,
    }

    pub struct Inner {
        pub width: u32,
        pub height: u32,
        stride: u32,
        device: ID3D11Device,
        context: ID3D11DeviceContext,
        duplication: IDXGIOutputDuplication,
        staging_texture: ID3D11Texture2D,
    }

    impl Inner {
        pub fn new(monitor_index: u32) -> Result<Self, RelayError> {
            unsafe { Self::init_dxgi(monitor_index) }
        }

        unsafe fn init_dxgi(monitor_index: u32) -> Result<Self, RelayError> {
            let mut device = None;
            let mut context = None;
            unsafe {
                D3D11CreateDevice(
                    None,
                    D3D_DRIVER_TYPE_HARDWARE,
                    None,
                    D3D11_CREATE_DEVICE_BGRA_SUPPORT,
                    None,
                    D3D11_SDK_VERSION,
                    Some(&mut device),
                    None,
                    Some(&mut context),
                )
                .map_err(|e| RelayError::Configuration(format!("D3D11CreateDevice failed: {e}")))?;
            }

            let device = device.ok_or_else(|| RelayError::Configuration("D3D11 device is None".into()))?;
            let context = context.ok_or_else(|| RelayError::Configuration("D3D11 context is None".into()))?;

            let dxgi_device: IDXGIDevice = device
                .cast()
                .map_err(|e| RelayError::Configuration(format!("cast to IDXGIDevice failed: {e}")))?;
            let adapter = unsafe {
                dxgi_device
                    .GetAdapter()
                    .map_err(|e| RelayError::Configuration(format!("GetAdapter failed: {e}")))?
            };
            let output: IDXGIOutput = unsafe {
                adapter
                    .EnumOutputs(monitor_index)
                    .map_err(|e| RelayError::Configuration(format!("EnumOutputs({monitor_index}) failed: {e}")))?
            };

            let output1: IDXGIOutput1 = output
                .cast()
                .map_err(|e| RelayError::Configuration(format!("cast to IDXGIOutput1 failed: {e}")))?;
            let duplication = unsafe {
                output1
                    .DuplicateOutput(&device)
                    .map_err(|e| RelayError::Configuration(format!("DuplicateOutput failed: {e}")))?
            };

            let dup_desc = unsafe { duplication.GetDesc() };
            let width = dup_desc.ModeDesc.Width;
            let height = dup_desc.ModeDesc.Height;

            let staging_desc = D3D11_TEXTURE2D_DESC {
                Width: width,
                Height: height,
                MipLevels: 1,
                ArraySize: 1,
                Format: DXGI_FORMAT_B8G8R8A8_UNORM,
                SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
                Usage: D3D11_USAGE_STAGING,
                BindFlags: 0,
                CPUAccessFlags: D3D11_CPU_ACCESS_READ.0 as u32,
                MiscFlags: 0,
            };

            let mut staging_texture = None;
            unsafe {
                device
                    .CreateTexture2D(&staging_desc, None, Some(&mut staging_texture))
                    .map_err(|e| RelayError::Configuration(format!("CreateTexture2D (staging) failed: {e}")))?;
            }
            let staging_texture =
                staging_texture.ok_or_else(|| RelayError::Configuration("staging texture is None".into()))?;

            Ok(Self {
                width,
                height,
                stride: width * 4,
                device,
                context,
                duplication,
                staging_texture,
            })
        }

        pub fn capture_frame(&mut self, timeout_ms: u32) -> Result<RawFrame, RelayError> {
            unsafe { self.capture_inner(timeout_ms) }
        }

        unsafe fn capture_inner(&mut self, timeout_ms: u32) -> Result<RawFrame, RelayError> {
            let mut frame_info = DXGI_OUTDUPL_FRAME_INFO::default();
            let mut resource = None;

            match unsafe {
                self.duplication.AcquireNextFrame(timeout_ms, &mut frame_info, &mut resource)
            } {
                Ok(()) => {}
                Err(e) if e.code() == DXGI_ERROR_WAIT_TIMEOUT => {
                    return Err(RelayError::hard_timeout(Duration::from_millis(timeout_ms as u64)));
                }
                Err(e) => {
                    return Err(RelayError::Configuration(format!("AcquireNextFrame failed: {e}")));
                }
            }

            let resource = resource.ok_or_else(|| RelayError::Configuration("acquired resource is None".into()))?;

            let texture: ID3D11Texture2D = resource.cast().map_err(|e| {
                let _ = unsafe { self.duplication.ReleaseFrame() };
                RelayError::Configuration(format!("cast to ID3D11Texture2D failed: {e}"))
            })?;

            unsafe { self.context.CopyResource(&self.staging_texture, &texture) };
            let _ = unsafe { self.duplication.ReleaseFrame() };

            let mut mapped = D3D11_MAPPED_SUBRESOURCE::default();
            unsafe {
                self.context
                    .Map(&self.staging_texture, 0, D3D11_MAP_READ, 0, Some(&mut mapped))
                    .map_err(|e| RelayError::Configuration(format!("Map failed: {e}")))?;
            }

            let stride = mapped.RowPitch;
            let total_bytes = stride as usize * self.height as usize;
            let src = unsafe { std::slice::from_raw_parts(mapped.pData as *const u8, total_bytes) };
            let data = src.to_vec();

            unsafe { self.context.Unmap(&self.staging_texture, 0) };
            self.stride = stride;

            Ok(RawFrame { data, stride })
        }
    }

    /// Current cursor position in screen coordinates; `(0, 0)` if the call
    /// fails (e.g. no desktop session attached).
    pub fn cursor_position() -> CursorPosition {
        let mut point = POINT::default();
        let ok = unsafe { GetCursorPos(&mut point) };
        if ok.is_ok() {
            CursorPosition::new(point.x.max(0) as u16, point.y.max(0) as u16)
        } else {
            CursorPosition::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bgra_to_rgb_reorders_channels_and_drops_alpha() {
        // One pixel, BGRA = (10, 20, 30, 255) -> RGB = (30, 20, 10).
        let data = [10u8, 20, 30, 255];
        let frame = bgra_to_rgb(&data, 1, 1, 4);
        assert_eq!(frame.pixel(0, 0), (30, 20, 10));
    }

    #[test]
    fn bgra_to_rgb_strips_row_padding() {
        // width=1 pixel (4 src bytes) but stride=8 (4 padding bytes/row).
        let data = [10u8, 20, 30, 255, 0xAA, 0xAA, 0xAA, 0xAA, 40, 50, 60, 255, 0xAA, 0xAA, 0xAA, 0xAA];
        let frame = bgra_to_rgb(&data, 1, 2, 8);
        assert_eq!(frame.shape(), (2, 1));
        assert_eq!(frame.pixel(0, 0), (30, 20, 10));
        assert_eq!(frame.pixel(1, 0), (60, 50, 40));
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn non_windows_construction_fails() {
        assert!(DxgiScreenCapture::new(0, 100).is_err());
    }
}
