//! Frame rendering: context types and the cube renderer.

mod cube;

pub use cube::{AnimationState, CubeRenderer};

/// Depth attachment format shared by the pipeline and the device layer.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Drawable size in physical pixels.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width / height ratio, or `None` while the drawable has zero area
    /// (mid-resize). Callers skip the frame in that case.
    pub fn aspect(self) -> Option<f32> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        Some(self.width as f32 / self.height as f32)
    }
}

/// Renderer-facing context (device/queue + target format + viewport).
pub struct RenderCtx<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub color_format: wgpu::TextureFormat,
    pub viewport: Viewport,
}

/// Target for drawing (encoder + color and depth views).
pub struct RenderTarget<'a> {
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub color_view: &'a wgpu::TextureView,
    pub depth_view: &'a wgpu::TextureView,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_is_exact_width_over_height() {
        assert_eq!(Viewport::new(800, 600).aspect(), Some(800.0 / 600.0));
        assert_eq!(Viewport::new(1, 3).aspect(), Some(1.0 / 3.0));
    }

    #[test]
    fn zero_area_viewport_has_no_aspect() {
        assert_eq!(Viewport::new(800, 0).aspect(), None);
        assert_eq!(Viewport::new(0, 600).aspect(), None);
    }
}
