use super::metrics::{DeviceInfo, EccCounterId};

/// Memory usage of one device, in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryReading {
    pub total: u64,
    pub used: u64,
    pub free: u64,
}

/// GPU and memory-controller utilization, in percent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtilizationReading {
    pub gpu: u32,
    pub memory: u32,
}

/// PCIe throughput in KiB/s, both directions read together
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcieReading {
    pub tx: u32,
    pub rx: u32,
}

/// Chassis unit fan; `state` is 0 when the fan works and 1 when it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitFanReading {
    pub speed_rpm: u32,
    pub state: u32,
}

/// Chassis unit PSU; `state` is 0 when normal and 1 otherwise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitPsuReading {
    pub current: u32,
    pub power: u32,
    pub voltage: u32,
    pub state: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitProbe {
    Intake,
    Exhaust,
    Board,
}

/// Trait for vendor metric sources
///
/// Counts are fixed when the source is created. Every query is fault
/// isolated: `None` means "unsupported right now" and never affects other
/// queries. The default implementations report every metric as unsupported,
/// so a source only overrides what it can actually read.
pub trait MetricSource {
    /// Number of devices enumerated at initialization
    fn device_count(&self) -> u32;

    /// Number of chassis units enumerated at initialization
    fn unit_count(&self) -> u32;

    fn device_info(&self, index: u32) -> DeviceInfo {
        DeviceInfo {
            index,
            name: format!("GPU {index}"),
            brand: "Unknown".to_string(),
        }
    }

    fn memory(&self, _index: u32) -> Option<MemoryReading> {
        None
    }

    fn utilization(&self, _index: u32) -> Option<UtilizationReading> {
        None
    }

    fn pcie_throughput(&self, _index: u32) -> Option<PcieReading> {
        None
    }

    /// Core temperature in degrees Celsius
    fn temperature(&self, _index: u32) -> Option<u32> {
        None
    }

    /// Fan speed in percent
    fn fan_speed(&self, _index: u32) -> Option<u32> {
        None
    }

    /// Power draw in milliwatts
    fn power_usage(&self, _index: u32) -> Option<u32> {
        None
    }

    /// Single ECC counter. Callers wanting the whole matrix use [`read_ecc_matrix`].
    fn ecc_counter(&self, _index: u32, _counter: EccCounterId) -> Option<u64> {
        None
    }

    fn unit_fan(&self, _unit: u32) -> Option<UnitFanReading> {
        None
    }

    fn unit_psu(&self, _unit: u32) -> Option<UnitPsuReading> {
        None
    }

    /// Unit probe temperature in degrees Celsius
    fn unit_temperature(&self, _unit: u32, _probe: UnitProbe) -> Option<u32> {
        None
    }
}

/// Read all 20 ECC counters of a device, atomically.
///
/// The matrix is read in [`EccCounterId::matrix`] order and the whole result
/// is `None` as soon as any counter is unsupported, starting with the first.
pub fn read_ecc_matrix<S: MetricSource + ?Sized>(
    source: &S,
    index: u32,
) -> Option<Vec<(EccCounterId, u64)>> {
    EccCounterId::matrix()
        .into_iter()
        .map(|id| source.ecc_counter(index, id).map(|count| (id, count)))
        .collect()
}
