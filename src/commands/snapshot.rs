use anyhow::{Context, Result};
use clap::ArgMatches;

/// Initialize and print one snapshot as JSON
pub fn execute(matches: &ArgMatches) -> Result<()> {
    let mut plugin = super::start_plugin(matches)?;
    let snapshot = plugin.get_data().context("No snapshot available")?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
