//! Offscreen render surface management.
//!
//! Maintains the rendering apparatus in lock-step with the viewport: an
//! orthographic camera, a single viewport-sized textured quad, and an RGBA8
//! render target. The surface is never shown anywhere; it exists purely as an
//! offscreen compute target for the capture stage.
//!
//! The quad's material samples the host frame source with a vertical flip in
//! its UV mapping, so the readback comes out in the top-down convention the
//! encoded image will be viewed in.

use std::sync::Arc;

use crate::{FrameSource, Viewport};

/// Texture filter applied when the quad is scaled relative to the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Linear,
    Nearest,
}

/// Orthographic camera with the frustum centered on the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthoCamera {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    pub near: f32,
    pub far: f32,
    /// Camera position along the view axis
    pub z: f32,
}

impl OrthoCamera {
    pub fn new(viewport: Viewport) -> Self {
        let hw = viewport.width as f32 / 2.0;
        let hh = viewport.height as f32 / 2.0;
        Self {
            left: -hw,
            right: hw,
            top: hh,
            bottom: -hh,
            near: -10000.0,
            far: 10000.0,
            z: 100.0,
        }
    }

    /// Whether a depth value lies inside the frustum as seen from the camera.
    pub fn sees_depth(&self, z: f32) -> bool {
        let view_z = self.z - z;
        view_z >= self.near && view_z <= self.far
    }
}

/// The full-screen quad the live frame is textured onto.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadGeometry {
    pub width: u32,
    pub height: u32,
    pub z: f32,
}

impl QuadGeometry {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            width: viewport.width,
            height: viewport.height,
            z: -100.0,
        }
    }
}

/// Offscreen RGBA8 buffer the scene is rendered into.
pub struct RenderTarget {
    width: u32,
    height: u32,
    min_filter: FilterMode,
    mag_filter: FilterMode,
    pixels: Vec<u8>,
}

impl RenderTarget {
    pub fn new(viewport: Viewport) -> Self {
        let len = viewport.width as usize * viewport.height as usize * 4;
        Self {
            width: viewport.width,
            height: viewport.height,
            min_filter: FilterMode::Linear,
            mag_filter: FilterMode::Nearest,
            pixels: vec![0; len],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Clear to transparent black.
    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }
}

/// Shader-material analog: the frame source binding plus the UV convention.
///
/// Reused across resizes so the live-texture binding established at
/// initialization is preserved.
pub struct SurfaceMaterial {
    source: Arc<dyn FrameSource>,
    /// The graphics-side V axis points up; flip so the readback is top-down.
    flip_v: bool,
}

impl SurfaceMaterial {
    pub fn new(source: Arc<dyn FrameSource>) -> Self {
        Self {
            source,
            flip_v: true,
        }
    }

    pub fn source(&self) -> &Arc<dyn FrameSource> {
        &self.source
    }
}

/// The complete offscreen apparatus.
///
/// Invariant: camera frustum, quad geometry, and render target dimensions
/// always equal the current viewport; `resize` rebuilds all three before the
/// next render and releases the previous target buffer.
pub struct RenderSurface {
    viewport: Viewport,
    camera: OrthoCamera,
    quad: QuadGeometry,
    target: RenderTarget,
    material: SurfaceMaterial,
}

impl RenderSurface {
    pub fn new(viewport: Viewport, source: Arc<dyn FrameSource>) -> Self {
        Self {
            viewport,
            camera: OrthoCamera::new(viewport),
            quad: QuadGeometry::new(viewport),
            target: RenderTarget::new(viewport),
            material: SurfaceMaterial::new(source),
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn camera(&self) -> &OrthoCamera {
        &self.camera
    }

    pub fn quad(&self) -> &QuadGeometry {
        &self.quad
    }

    pub fn target(&self) -> &RenderTarget {
        &self.target
    }

    pub fn material(&self) -> &SurfaceMaterial {
        &self.material
    }

    /// Rebuild camera, quad, and render target for a new viewport.
    ///
    /// The material (and with it the frame source binding) is reused. The
    /// previous target buffer is dropped here rather than leaked. Safe to
    /// call at arbitrary frequency.
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.camera = OrthoCamera::new(viewport);
        self.quad = QuadGeometry::new(viewport);
        self.target = RenderTarget::new(viewport);
    }

    /// Clear and redraw the quad into the offscreen target.
    ///
    /// Always clears the target first (force-clear), so a stale frame can
    /// never leak into a capture. A quad outside the frustum, or an empty
    /// source frame, leaves the target cleared.
    pub fn render(&mut self) {
        debug_assert_eq!(self.target.width, self.viewport.width);
        debug_assert_eq!(self.target.height, self.viewport.height);
        debug_assert_eq!(self.quad.width, self.viewport.width);

        self.target.clear();

        if !self.camera.sees_depth(self.quad.z) {
            return;
        }

        self.material.source.mark_dirty();
        let frame = self.material.source.current_frame();
        if frame.width == 0 || frame.height == 0 {
            return;
        }

        let tw = self.target.width;
        let th = self.target.height;

        // Minification uses the target's min filter, magnification its mag
        // filter (linear and nearest respectively).
        let minifying = tw < frame.width || th < frame.height;
        let filter = if minifying {
            self.target.min_filter
        } else {
            self.target.mag_filter
        };

        for y in 0..th {
            // Quad UV with V up, flipped by the material back to top-down.
            let gl_v = 1.0 - (y as f32 + 0.5) / th as f32;
            let v = if self.material.flip_v { 1.0 - gl_v } else { gl_v };
            for x in 0..tw {
                let u = (x as f32 + 0.5) / tw as f32;
                let texel = sample(&frame.pixels, frame.width, frame.height, u, v, filter);
                let off = (y as usize * tw as usize + x as usize) * 4;
                self.target.pixels[off..off + 4].copy_from_slice(&texel);
            }
        }
    }

    /// Read back the full target as an RGBA8 buffer, top-left origin.
    pub fn read_pixels(&self) -> Vec<u8> {
        self.target.pixels.clone()
    }
}

fn texel_at(pixels: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
    let off = (y as usize * width as usize + x as usize) * 4;
    [
        pixels[off],
        pixels[off + 1],
        pixels[off + 2],
        pixels[off + 3],
    ]
}

/// Sample a normalized UV coordinate from an RGBA8 image, clamped to edge.
fn sample(pixels: &[u8], width: u32, height: u32, u: f32, v: f32, filter: FilterMode) -> [u8; 4] {
    match filter {
        FilterMode::Nearest => {
            let x = ((u * width as f32) as i64).clamp(0, width as i64 - 1) as u32;
            let y = ((v * height as f32) as i64).clamp(0, height as i64 - 1) as u32;
            texel_at(pixels, width, x, y)
        }
        FilterMode::Linear => {
            let fx = (u * width as f32 - 0.5).max(0.0);
            let fy = (v * height as f32 - 0.5).max(0.0);
            let x0 = (fx as u32).min(width - 1);
            let y0 = (fy as u32).min(height - 1);
            let x1 = (x0 + 1).min(width - 1);
            let y1 = (y0 + 1).min(height - 1);
            let tx = fx - x0 as f32;
            let ty = fy - y0 as f32;

            let p00 = texel_at(pixels, width, x0, y0);
            let p10 = texel_at(pixels, width, x1, y0);
            let p01 = texel_at(pixels, width, x0, y1);
            let p11 = texel_at(pixels, width, x1, y1);

            let mut out = [0u8; 4];
            for c in 0..4 {
                let top = p00[c] as f32 * (1.0 - tx) + p10[c] as f32 * tx;
                let bot = p01[c] as f32 * (1.0 - tx) + p11[c] as f32 * tx;
                out[c] = (top * (1.0 - ty) + bot * ty).round() as u8;
            }
            out
        }
    }
}
