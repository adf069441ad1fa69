//! Window + event-loop runtime (the animation driver).

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
