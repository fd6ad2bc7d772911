//! Legacy text fallback.
//!
//! Recovers a handful of readings from the `nvidia-settings` text report when
//! NVML cannot supply them. Parsing failures stay inside this module: the
//! collector only ever sees values filled into absent snapshot slots.

use once_cell::sync::Lazy;
use regex::Regex;

use super::metrics::{DeviceSlot, Snapshot};
use crate::error::{NvChartError, Result};

/// Reports shorter than this are treated as a failed query
pub const MIN_REPORT_LEN: usize = 800;

const MIB: u64 = 1024 * 1024;

static CORE_TEMP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)GPUCoreTemp.*?(gpu:\d*).*?\s(\d*)").expect("static regex")
});

static USED_MEMORY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)UsedDedicatedGPUMemory.*?(gpu:\d*).*?\s(\d*)").expect("static regex")
});

static UTILIZATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)(gpu:\d*).*?graphics=(\d*),.*?memory=(\d*)").expect("static regex")
});

/// Something that can produce the raw text report
pub trait ReportSource {
    fn fetch(&mut self) -> Result<String>;
}

/// A fetched report that passed the plausibility check
#[derive(Debug, Clone)]
pub struct LegacyReport {
    text: String,
}

impl LegacyReport {
    pub fn parse(text: String) -> Result<Self> {
        if text.len() < MIN_REPORT_LEN {
            return Err(NvChartError::legacy_source(format!(
                "Error in fetching data from nvidia-settings ({} bytes): {}",
                text.len(),
                text.trim()
            )));
        }
        Ok(Self { text })
    }

    pub fn core_temperature(&self, device: usize) -> Option<u64> {
        nth_capture(&CORE_TEMP_RE, &self.text, device, 2)
    }

    /// Used memory converted from the report's MiB to bytes
    pub fn used_memory_bytes(&self, device: usize) -> Option<u64> {
        nth_capture(&USED_MEMORY_RE, &self.text, device, 2).map(|mib| mib.saturating_mul(MIB))
    }

    pub fn gpu_utilization(&self, device: usize) -> Option<u64> {
        nth_capture(&UTILIZATION_RE, &self.text, device, 2)
    }

    pub fn memory_utilization(&self, device: usize) -> Option<u64> {
        nth_capture(&UTILIZATION_RE, &self.text, device, 3)
    }
}

fn nth_capture(re: &Regex, text: &str, n: usize, group: usize) -> Option<u64> {
    re.captures_iter(text)
        .nth(n)?
        .get(group)?
        .as_str()
        .parse()
        .ok()
}

/// Backfills absent snapshot slots from the text report.
///
/// A report that fails to fetch or is implausibly short switches the adapter
/// off for the rest of the process.
pub struct LegacyAdapter {
    source: Box<dyn ReportSource>,
    active: bool,
}

impl LegacyAdapter {
    pub fn new(source: Box<dyn ReportSource>, enabled: bool) -> Self {
        Self {
            source,
            active: enabled,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Fill absent slots of `snapshot`. Returns how many slots were written.
    pub fn backfill(&mut self, snapshot: &mut Snapshot) -> usize {
        if !self.active {
            return 0;
        }

        let report = match self.source.fetch().and_then(LegacyReport::parse) {
            Ok(report) => report,
            Err(e) => {
                log::error!("{}", e);
                log::error!("Setting legacy mode to false");
                self.active = false;
                return 0;
            }
        };

        let mut filled = 0;
        for position in 0..snapshot.devices.len() {
            let index = snapshot.devices[position].index;
            let fields: [(DeviceSlot, fn(&LegacyReport, usize) -> Option<u64>); 4] = [
                (DeviceSlot::Temperature, LegacyReport::core_temperature),
                (DeviceSlot::MemUsed, LegacyReport::used_memory_bytes),
                (DeviceSlot::UtilGpu, LegacyReport::gpu_utilization),
                (DeviceSlot::UtilMem, LegacyReport::memory_utilization),
            ];

            for (slot, extract) in fields {
                if snapshot.device_value(slot, index).is_present() {
                    continue;
                }
                match extract(&report, position) {
                    Some(value) => {
                        snapshot.fill_if_absent(slot, index, value);
                        let key = slot.key(index);
                        log::debug!("Using legacy {} for GPU {}: {}", key, index, value);
                        filled += 1;
                    }
                    None => log::debug!("skipping {}", slot.key(index)),
                }
            }
        }
        filled
    }
}
