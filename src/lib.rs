// nvchart Library - Public API

// Re-export error types
pub mod error;
pub use error::{NvChartError, Result};

// Module declarations
pub mod commands;
pub mod core;
pub mod platform;
pub mod ui;

// Re-export commonly used types
pub use crate::core::config::CollectorConfig;
pub use crate::core::metrics::{MetricValue, Snapshot};
pub use crate::core::plugin::Plugin;
pub use crate::core::schema::Schema;

// Initialize logging
pub fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // RUST_LOG still wins over the default level
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}
