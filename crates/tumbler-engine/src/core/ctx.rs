use winit::window::{Window, WindowId};

use crate::device::{Gpu, SurfaceErrorAction};
use crate::render::{RenderCtx, RenderTarget, Viewport};
use crate::time::FrameTime;

use super::app::AppControl;

/// Per-window handles and immutable window metadata.
pub struct WindowCtx<'a> {
    pub id: WindowId,
    pub window: &'a Window,
}

/// Per-frame context passed to `core::App::on_frame`.
///
/// Lifetimes: `'a` is the callback invocation, `'w` the window borrow
/// carried by `Gpu<'w>`.
pub struct FrameCtx<'a, 'w> {
    pub window: WindowCtx<'a>,
    pub gpu: &'a mut Gpu<'w>,
    pub time: FrameTime,
}

impl<'a, 'w> FrameCtx<'a, 'w> {
    /// Acquires a frame, hands `draw` a ready [`RenderCtx`] and
    /// [`RenderTarget`], then submits and presents.
    ///
    /// Clearing is the draw callback's business: the cube renderer clears
    /// color and depth as the first step of its own pass, which also keeps
    /// skipped frames (zero-area surface) from touching the target.
    pub fn render<F>(&mut self, draw: F) -> AppControl
    where
        F: FnOnce(&RenderCtx<'_>, &mut RenderTarget<'_>),
    {
        let mut frame = match self.gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                let action = self.gpu.handle_surface_error(err);
                if action == SurfaceErrorAction::Fatal {
                    log::error!("surface is out of memory; exiting");
                    return AppControl::Exit;
                }
                return AppControl::Continue;
            }
        };

        {
            let size = self.gpu.size();
            let ctx = RenderCtx {
                device: self.gpu.device(),
                queue: self.gpu.queue(),
                color_format: self.gpu.surface_format(),
                viewport: Viewport::new(size.width, size.height),
            };
            let mut target = RenderTarget {
                encoder: &mut frame.encoder,
                color_view: &frame.view,
                depth_view: &frame.depth_view,
            };
            draw(&ctx, &mut target);
        }

        self.gpu.submit(frame);
        AppControl::Continue
    }
}
