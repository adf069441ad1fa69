//! Engine-facing contracts between the platform loop and applications.
//!
//! `App` is implemented by the hosting application; the runtime calls it
//! once per frame with a `FrameCtx` carrying the GPU handles and timing.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, WindowCtx};
