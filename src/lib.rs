//! Overlayshot
//!
//! An offscreen screenshot overlay for game hosts. The host injects a live
//! frame source; the overlay continuously renders it through a full-screen
//! textured quad into an offscreen render target. When a screenshot request
//! arrives, the most recent frame is read back, encoded into the requested
//! image format, and uploaded to the caller-supplied URL (with an optional
//! follow-up notification carrying the server's response).
//!
//! # Features
//!
//! - **Single-slot intake**: at most one pending request; a newer request
//!   silently replaces an unconsumed one
//! - **Fire-and-forget delivery**: uploads run as independent tasks and never
//!   block the frame loop
//! - **Host-agnostic**: the live texture is an opaque [`FrameSource`]
//!   capability, not a binding to any particular graphics stack
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use overlayshot::{Overlay, OverlayConfig, SolidColor, Viewport};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = OverlayConfig {
//!     viewport: Viewport { width: 1280, height: 720 },
//!     ..Default::default()
//! };
//!
//! let source = Arc::new(SolidColor::new(1280, 720, [255, 0, 0, 255]));
//! let mut overlay = Overlay::new(config, source)?;
//! let handle = overlay.handle();
//!
//! handle.post_message(r#"{"request":{"encoding":"png","targetURL":"https://up.example/x"}}"#)?;
//! overlay.run().await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

pub mod error;
pub use error::{Error, Result};

pub mod request;
pub use request::{HostMessage, ImageEncoding, ScreenshotRequest, DEFAULT_QUALITY};

// Offscreen camera/quad/target apparatus
pub mod surface;

// Readback → data URI encoding
pub mod capture;

// Multipart/JSON upload and the result notification
pub mod delivery;

// Pending-request slot and host event plumbing
pub mod intake;
pub use intake::{HostEvent, OverlayHandle, PendingSlot};

// Frame loop and task lifecycle
pub mod overlay;
pub use overlay::Overlay;

/// Configuration for the overlay
///
/// The defaults match the environment the overlay usually runs in: a
/// 1280x720 viewport refreshed at 60 Hz.
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    /// Viewport dimensions the offscreen surface tracks
    pub viewport: Viewport,
    /// How often the frame loop ticks, standing in for the display refresh
    pub refresh_rate_hz: u32,
    /// User agent sent with both upload requests
    pub user_agent: String,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            refresh_rate_hz: 60,
            user_agent: format!("overlayshot/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// One frame borrowed from the host.
///
/// Pixel data is RGBA8, top-left origin, shared so the host can hand out the
/// same buffer to every sampler without copying.
#[derive(Debug, Clone)]
pub struct SourceFrame {
    pub pixels: Arc<[u8]>,
    pub width: u32,
    pub height: u32,
}

/// The host-injected live texture, modeled as an opaque capability.
///
/// The overlay only ever asks for the current frame and hints that it wants
/// a fresh one next time; everything else about the texture (where it comes
/// from, how often it updates) belongs to the host.
pub trait FrameSource: Send + Sync {
    /// The most recent frame the host has produced.
    fn current_frame(&self) -> SourceFrame;

    /// Hint that the next render wants fresh content. Hosts with pull-based
    /// textures can ignore this.
    fn mark_dirty(&self) {}
}

/// A frame source producing a single solid color, useful for hosts under
/// test and for the binary's standalone mode.
pub struct SolidColor {
    frame: SourceFrame,
}

impl SolidColor {
    pub fn new(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..width as usize * height as usize {
            pixels.extend_from_slice(&rgba);
        }
        Self {
            frame: SourceFrame {
                pixels: pixels.into(),
                width,
                height,
            },
        }
    }
}

impl FrameSource for SolidColor {
    fn current_frame(&self) -> SourceFrame {
        self.frame.clone()
    }
}

/// A frame source wrapping a fixed pixel buffer.
pub struct StaticFrame {
    frame: SourceFrame,
}

impl StaticFrame {
    /// `pixels` must be RGBA8, length `width * height * 4`.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize * 4);
        Self {
            frame: SourceFrame {
                pixels: pixels.into(),
                width,
                height,
            },
        }
    }
}

impl FrameSource for StaticFrame {
    fn current_frame(&self) -> SourceFrame {
        self.frame.clone()
    }
}

/// A deterministic color-gradient source used by the golden render test and
/// the binary's demo mode.
pub struct TestPattern {
    frame: SourceFrame,
}

impl TestPattern {
    pub fn new(width: u32, height: u32) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height {
            for x in 0..width {
                let r = if width > 1 { (x * 255 / (width - 1)) as u8 } else { 0 };
                let g = if height > 1 { (y * 255 / (height - 1)) as u8 } else { 0 };
                pixels.extend_from_slice(&[r, g, 128, 255]);
            }
        }
        Self {
            frame: SourceFrame {
                pixels: pixels.into(),
                width,
                height,
            },
        }
    }
}

impl FrameSource for TestPattern {
    fn current_frame(&self) -> SourceFrame {
        self.frame.clone()
    }
}
