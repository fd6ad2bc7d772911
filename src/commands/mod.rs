// Command handlers module
pub mod check;
pub mod run;
pub mod snapshot;

// Re-exports for cleaner imports
pub use check::execute as check;
pub use run::execute as run;
pub use snapshot::execute as snapshot;

use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use std::path::Path;

use crate::core::{CollectorConfig, Plugin};
use crate::platform::{NvidiaSettings, NvmlSource};

/// Resolve the collector configuration from `--config` plus flag overrides
pub fn load_config(matches: &ArgMatches) -> Result<CollectorConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => CollectorConfig::load(Path::new(path))
            .with_context(|| format!("Failed to load config file: {}", path))?,
        None => CollectorConfig::default(),
    };

    if matches.get_flag("legacy") {
        config = config.with_legacy(true);
    }
    if let Some(factor) = matches.get_one::<u32>("mem-factor") {
        config = config.with_mem_factor(*factor);
    }

    Ok(config)
}

/// Create the plugin and run its initialization check against NVML
pub fn start_plugin(matches: &ArgMatches) -> Result<Plugin<NvmlSource>> {
    let config = load_config(matches)?;
    let mut plugin =
        Plugin::new(config).with_report_source(Box::new(NvidiaSettings::new()));

    if !plugin.check(NvmlSource::init) {
        bail!("Initialization failed, no charts will be collected");
    }
    Ok(plugin)
}
