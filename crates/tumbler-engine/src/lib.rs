//! Tumbler engine crate.
//!
//! Owns the platform + GPU runtime pieces and the cube rendering
//! pipeline consumed by the viewer binary.

pub mod device;
pub mod window;
pub mod time;
pub mod core;

pub mod error;
pub mod geometry;
pub mod logging;
pub mod render;
pub mod shader;
pub mod texture;
