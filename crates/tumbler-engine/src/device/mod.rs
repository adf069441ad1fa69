//! GPU device + surface management.
//!
//! This module owns:
//! - the wgpu Instance/Adapter/Device/Queue
//! - surface (swapchain) configuration and resize
//! - the depth buffer matching the surface size
//! - frame acquisition (encoder + color/depth views)

mod gpu;

pub use gpu::{Gpu, GpuFrame, GpuInit, SurfaceErrorAction};
