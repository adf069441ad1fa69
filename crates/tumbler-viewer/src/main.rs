//! Tumbler viewer: opens a window and drives the rotating textured cube.
//!
//! Usage: `tumbler-viewer [image-path]`. Without an argument the bundled
//! crate texture is used; while the image decodes (or if decoding fails)
//! the cube renders with the built-in placeholder.

use std::path::PathBuf;

use anyhow::Result;

use tumbler_engine::core::{App, AppControl, FrameCtx};
use tumbler_engine::device::GpuInit;
use tumbler_engine::logging::init_logging;
use tumbler_engine::render::{AnimationState, CubeRenderer};
use tumbler_engine::texture::CubeTexture;
use tumbler_engine::window::{Runtime, RuntimeConfig};

// Bundled texture, addressed relative to this crate so `cargo run` works
// from any directory.
const DEFAULT_TEXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/crate.png");

/// Per-window rendering resources, created on the first frame once the
/// surface format is known.
struct Scene {
    renderer: CubeRenderer,
    texture: CubeTexture,
    state: AnimationState,
}

struct CubeApp {
    texture_path: PathBuf,
    scene: Option<Scene>,
}

impl CubeApp {
    fn new(texture_path: PathBuf) -> Self {
        Self {
            texture_path,
            scene: None,
        }
    }
}

impl App for CubeApp {
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if self.scene.is_none() {
            let device = ctx.gpu.device();
            let renderer = match CubeRenderer::new(device, ctx.gpu.surface_format()) {
                Ok(r) => r,
                Err(e) => {
                    // Unrecoverable for this program: surface the log and
                    // stop instead of animating a broken pipeline.
                    log::error!("cube program initialization failed: {e}");
                    return AppControl::Exit;
                }
            };
            let texture = CubeTexture::load(device, ctx.gpu.queue(), self.texture_path.clone());
            self.scene = Some(Scene {
                renderer,
                texture,
                state: AnimationState::new(),
            });
            log::info!("cube program ready; texture loading from '{}'", self.texture_path.display());
        }

        let Some(scene) = self.scene.as_mut() else {
            return AppControl::Continue;
        };

        scene.state.advance(ctx.time.dt);
        scene.texture.poll(ctx.gpu.device(), ctx.gpu.queue());

        ctx.render(|rctx, target| {
            if let Err(e) = scene.renderer.render(rctx, target, &scene.state, &scene.texture) {
                // Loud on purpose: this signals a shader/layout mismatch,
                // not a runtime transient.
                log::error!("frame aborted: {e}");
            }
        })
    }
}

fn main() -> Result<()> {
    init_logging();

    let texture_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TEXTURE));

    Runtime::run(
        RuntimeConfig::default(),
        GpuInit::default(),
        CubeApp::new(texture_path),
    )
}
