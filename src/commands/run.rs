//! Collection loop command.
//!
//! Emits the chart definitions once, then one data block per tick until
//! the tick budget is spent or Ctrl+C is pressed.

use anyhow::{Context, Result};
use clap::ArgMatches;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::ui::NetdataWriter;

/// Execute the run command
pub fn execute(matches: &ArgMatches) -> Result<()> {
    let update_every = matches.get_one::<u64>("update-every").copied().unwrap_or(1);
    let count = matches.get_one::<u64>("count").copied();

    let mut plugin = super::start_plugin(matches)?;
    let schema = plugin
        .schema()
        .cloned()
        .context("Schema missing after successful initialization")?;

    // Setup Ctrl+C handler
    let stop = Arc::new(AtomicBool::new(false));
    let stop_clone = stop.clone();
    ctrlc::set_handler(move || {
        stop_clone.store(true, Ordering::Relaxed);
    })
    .map_err(|e| anyhow::anyhow!("Failed to set Ctrl+C handler: {}", e))?;

    let mut writer = NetdataWriter::new(io::stdout().lock(), update_every);
    writer
        .write_definitions(&schema)
        .context("Failed to write chart definitions")?;

    let interval = Duration::from_secs(update_every.max(1));
    let mut last_tick: Option<Instant> = None;
    let mut ticks = 0u64;

    while !stop.load(Ordering::Relaxed) && count.is_none_or(|limit| ticks < limit) {
        let started = Instant::now();
        let since_last = last_tick.map(|t| started.duration_since(t).as_micros() as u64);

        let Some(snapshot) = plugin.get_data() else {
            break;
        };
        writer
            .write_snapshot(&schema, &snapshot, since_last)
            .context("Failed to write snapshot")?;

        last_tick = Some(started);
        ticks += 1;

        if count.is_some_and(|limit| ticks >= limit) {
            break;
        }
        thread::sleep(interval.saturating_sub(started.elapsed()));
    }

    log::debug!("Collection loop stopped after {} ticks", ticks);
    Ok(())
}
