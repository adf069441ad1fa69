use std::sync::Once;

static INIT: Once = Once::new();

/// Initializes the global `env_logger` backend once; later calls are
/// ignored. Intended usage is early in `main`.
///
/// `RUST_LOG` selects filters (e.g. `tumbler_engine=debug,wgpu=warn`);
/// without it the level defaults to info so shader and texture
/// diagnostics stay visible.
pub fn init_logging() {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(log::LevelFilter::Info);
        }

        builder.init();
        log::debug!("logging initialized");
    });
}
