//! Netdata external-plugin text protocol.
//!
//! Charts are declared once with `CHART`/`DIMENSION`, then every snapshot is
//! written as `BEGIN`/`SET`/`END` blocks on the same stream.

use std::collections::HashMap;
use std::io::{self, Write};

use crate::core::metrics::Snapshot;
use crate::core::schema::{ChartDefinition, Schema};

/// Chart type prefix, charts appear as `nv.<id>`
pub const CHART_TYPE: &str = "nv";
/// Priority of the first chart; later charts count up from here
pub const BASE_PRIORITY: u32 = 60000;

pub struct NetdataWriter<W: Write> {
    out: W,
    update_every: u64,
    last_values: HashMap<String, u64>,
}

impl<W: Write> NetdataWriter<W> {
    pub fn new(out: W, update_every: u64) -> Self {
        Self {
            out,
            update_every: update_every.max(1),
            last_values: HashMap::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Declare every chart that has at least one line
    pub fn write_definitions(&mut self, schema: &Schema) -> io::Result<()> {
        for (offset, chart) in schema.populated_charts().enumerate() {
            self.write_chart(chart, BASE_PRIORITY + offset as u32)?;
        }
        self.out.flush()
    }

    fn write_chart(&mut self, chart: &ChartDefinition, priority: u32) -> io::Result<()> {
        writeln!(
            self.out,
            "CHART {}.{} '' '{}' '{}' '{}' '{}' {} {} {}",
            CHART_TYPE,
            chart.id,
            quote_safe(&chart.title),
            quote_safe(&chart.units),
            quote_safe(&chart.family),
            chart.context,
            chart.chart_type.as_str(),
            priority,
            self.update_every
        )?;
        for line in &chart.lines {
            writeln!(
                self.out,
                "DIMENSION {} '{}' {} {} {}",
                line.key,
                quote_safe(&line.name),
                line.algorithm.as_str(),
                line.multiplier,
                line.divisor
            )?;
        }
        Ok(())
    }

    /// Write one data block per chart.
    ///
    /// An absent value repeats the last value seen for that line; a line
    /// that never had a value is left out of the block.
    pub fn write_snapshot(
        &mut self,
        schema: &Schema,
        snapshot: &Snapshot,
        since_last_usec: Option<u64>,
    ) -> io::Result<()> {
        for chart in schema.populated_charts() {
            match since_last_usec {
                Some(usec) => writeln!(self.out, "BEGIN {}.{} {}", CHART_TYPE, chart.id, usec)?,
                None => writeln!(self.out, "BEGIN {}.{}", CHART_TYPE, chart.id)?,
            }
            for line in &chart.lines {
                let value = match snapshot.get(&line.key).as_option() {
                    Some(value) => {
                        self.last_values.insert(line.key.clone(), value);
                        Some(value)
                    }
                    None => self.last_values.get(&line.key).copied(),
                };
                if let Some(value) = value {
                    writeln!(self.out, "SET {} = {}", line.key, value)?;
                }
            }
            writeln!(self.out, "END")?;
        }
        self.out.flush()
    }
}

fn quote_safe(text: &str) -> String {
    text.replace('\'', "")
}
