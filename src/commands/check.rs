use anyhow::{Context, Result};
use clap::ArgMatches;
use std::io;

use crate::ui::NetdataWriter;

/// Initialize and print the chart schema
pub fn execute(matches: &ArgMatches) -> Result<()> {
    let plugin = super::start_plugin(matches)?;
    let schema = plugin
        .schema()
        .context("Schema missing after successful initialization")?;

    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(schema)?);
        return Ok(());
    }

    let mut writer = NetdataWriter::new(io::stdout().lock(), 1);
    writer
        .write_definitions(schema)
        .context("Failed to write chart definitions")?;
    Ok(())
}
