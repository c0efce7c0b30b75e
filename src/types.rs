//! Common types used throughout GhostRelay

use serde::{Deserialize, Serialize};

/// An OS handle value as seen by the process that owns it.
///
/// The value is only meaningful inside the handle table of one process.
/// Ownership is tracked by whoever holds it (usually a [`crate::HandleRelay`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle(u64);

impl RawHandle {
    /// Sentinel used on the wire when no handle is available (`INVALID_HANDLE_VALUE`)
    pub const INVALID: Self = Self(u64::MAX);

    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    pub const fn as_raw(&self) -> u64 {
        self.0
    }

    /// Signed wire representation handed to the foreground process
    pub const fn as_i64(&self) -> i64 {
        self.0 as i64
    }

    /// Null and the invalid sentinel are both treated as "no handle"
    pub fn is_valid(&self) -> bool {
        self.0 != 0 && *self != Self::INVALID
    }

    /// Convert an engine-reported value into a usable handle
    pub fn checked(value: u64) -> Option<Self> {
        let handle = Self(value);
        handle.is_valid().then_some(handle)
    }
}

impl std::fmt::Display for RawHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A handle to another process opened with duplicate-handle rights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessHandle {
    pub pid: u32,
    pub raw: RawHandle,
}

/// Display geometry in device-independent pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Both dimensions strictly positive
    pub fn is_positive(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

impl From<Resolution> for Size {
    fn from(res: Resolution) -> Self {
        Self::new(res.width as f32, res.height as f32)
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl std::str::FromStr for Size {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
        let width = w.trim().parse::<f32>().map_err(|e| e.to_string())?;
        let height = h.trim().parse::<f32>().map_err(|e| e.to_string())?;
        Ok(Self::new(width, height))
    }
}

/// Native video resolution reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const HD_720P: Self = Self::new(1280, 720);
    pub const FHD_1080P: Self = Self::new(1920, 1080);
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Engine output surface format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameFormat {
    /// NV12 - Y plane + interleaved UV
    #[default]
    Nv12,
    /// BGRA - 32-bit BGRA
    Bgra,
}

impl FrameFormat {
    /// Matching DXGI_FORMAT value
    pub fn dxgi_format(&self) -> u32 {
        match self {
            FrameFormat::Nv12 => 103,
            FrameFormat::Bgra => 87,
        }
    }
}

/// What the foreground process needs to present the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderFormat {
    /// Swap chain handle valid in the foreground process
    pub handle: RawHandle,
    pub width: u32,
    pub height: u32,
    pub foreground_process_id: u32,
}

/// Crop/scale region as fractions of the source video
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl NormalizedRect {
    pub const FULL: Self = Self {
        left: 0.0,
        top: 0.0,
        right: 1.0,
        bottom: 1.0,
    };
}

/// Destination rectangle in control pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

/// Border fill colour for letterbox areas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorderColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl BorderColor {
    pub const OPAQUE_BLACK: Self = Self {
        r: 0,
        g: 0,
        b: 0,
        a: 0xFF,
    };
}

impl Default for BorderColor {
    fn default() -> Self {
        Self::OPAQUE_BLACK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_handle_validity() {
        assert!(!RawHandle::INVALID.is_valid());
        assert!(!RawHandle::from_raw(0).is_valid());
        assert!(RawHandle::from_raw(0x1a4).is_valid());
        assert_eq!(RawHandle::INVALID.as_i64(), -1);
        assert_eq!(RawHandle::checked(0), None);
        assert_eq!(RawHandle::checked(8), Some(RawHandle::from_raw(8)));
    }

    #[test]
    fn test_size_parse() {
        let size: Size = "640x480".parse().unwrap();
        assert_eq!(size, Size::new(640.0, 480.0));
        assert!(size.is_positive());
        assert!("640".parse::<Size>().is_err());
        assert!(!Size::new(0.0, 10.0).is_positive());
    }
}
