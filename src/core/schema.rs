//! Chart schema inferred from one capability-probe snapshot.
//!
//! The schema is built once at startup and never changes afterwards: a
//! metric that was absent in the probe snapshot is never charted, even if it
//! starts reporting later.

use serde::Serialize;

use super::config::CollectorConfig;
use super::metrics::{DeviceSlot, EccCounterId, Snapshot, UnitSlot};

/// Binary megabyte divisor for memory lines (bytes -> MiB)
pub const MEMORY_DIVISOR: i64 = 1024 * 1024;
/// Devices report milliwatts, charts show watts
pub const POWER_DIVISOR: i64 = 1000;
/// Separator between device names in chart titles
pub const TITLE_DELIMITER: &str = " | ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Line,
    Area,
}

impl ChartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Line => "line",
            ChartType::Area => "area",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Absolute,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Absolute => "absolute",
        }
    }
}

/// One plotted dimension, bound to exactly one snapshot key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricLine {
    pub key: String,
    pub name: String,
    pub algorithm: Algorithm,
    pub multiplier: i64,
    pub divisor: i64,
}

impl MetricLine {
    fn new(key: String, name: String) -> Self {
        Self {
            key,
            name,
            algorithm: Algorithm::Absolute,
            multiplier: 1,
            divisor: 1,
        }
    }

    fn scaled(mut self, multiplier: i64, divisor: i64) -> Self {
        self.multiplier = multiplier;
        self.divisor = divisor;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartDefinition {
    pub id: String,
    pub title: String,
    pub units: String,
    pub family: String,
    pub context: String,
    pub chart_type: ChartType,
    pub lines: Vec<MetricLine>,
}

impl ChartDefinition {
    fn new(
        id: &str,
        title: &str,
        units: &str,
        family: &str,
        context: &str,
        chart_type: ChartType,
    ) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            units: units.to_string(),
            family: family.to_string(),
            context: context.to_string(),
            chart_type,
            lines: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Ordered chart groups, immutable once built
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    charts: Vec<ChartDefinition>,
    /// Reserved memory-clock factor, carried for publishers
    pub mem_factor: u32,
}

impl Schema {
    /// Every chart group in order, including groups without lines
    pub fn charts(&self) -> &[ChartDefinition] {
        &self.charts
    }

    /// Chart groups that have at least one line
    pub fn populated_charts(&self) -> impl Iterator<Item = &ChartDefinition> {
        self.charts.iter().filter(|c| !c.is_empty())
    }

    pub fn chart(&self, id: &str) -> Option<&ChartDefinition> {
        self.charts.iter().find(|c| c.id == id)
    }

    pub fn lines(&self) -> impl Iterator<Item = &MetricLine> {
        self.charts.iter().flat_map(|c| c.lines.iter())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lines().any(|l| l.key == key)
    }

    pub fn line_count(&self) -> usize {
        self.lines().count()
    }
}

/// Builds a [`Schema`] from the capability-probe snapshot
pub struct SchemaBuilder<'a> {
    snapshot: &'a Snapshot,
    config: &'a CollectorConfig,
}

impl<'a> SchemaBuilder<'a> {
    pub fn new(snapshot: &'a Snapshot, config: &'a CollectorConfig) -> Self {
        Self { snapshot, config }
    }

    /// Concatenated device names, e.g. "Tesla K80 [0] | Tesla K80 [1]"
    pub fn device_names(&self) -> String {
        self.snapshot
            .devices
            .iter()
            .map(|d| d.display_name())
            .collect::<Vec<_>>()
            .join(TITLE_DELIMITER)
    }

    pub fn build(&self) -> Schema {
        let suffix = self.device_names();
        let mut charts = base_charts();
        if self.snapshot.unit_count > 0 {
            charts.extend(unit_charts());
        }
        for chart in &mut charts {
            chart.title = format!("{} for {}", chart.title, suffix);
        }

        for device in &self.snapshot.devices {
            self.add_device_lines(device.index, &mut charts);
        }
        for unit in 0..self.snapshot.unit_count {
            self.add_unit_lines(unit, &mut charts);
        }

        Schema {
            charts,
            mem_factor: self.config.mem_factor,
        }
    }

    fn present(&self, slot: DeviceSlot, index: u32) -> bool {
        self.snapshot.device_value(slot, index).is_present()
    }

    fn unit_present(&self, slot: UnitSlot, unit: u32) -> bool {
        self.snapshot.unit_value(slot, unit).is_present()
    }

    fn add_device_lines(&self, i: u32, charts: &mut [ChartDefinition]) {
        let gpu = format!("GPU:{i}");

        if self.present(DeviceSlot::MemUsed, i) {
            let line = MetricLine::new(DeviceSlot::MemUsed.key(i), gpu.clone());
            push(charts, "memory", line.scaled(1, MEMORY_DIVISOR));
        }

        if self.present(DeviceSlot::UtilGpu, i) {
            let line = MetricLine::new(DeviceSlot::UtilGpu.key(i), gpu.clone());
            push(charts, "utilization", line);
        }

        if self.present(DeviceSlot::UtilMem, i) {
            let line = MetricLine::new(DeviceSlot::UtilMem.key(i), gpu.clone());
            push(charts, "memoryutilization", line);
        }

        // RX is only ever read together with TX
        if self.present(DeviceSlot::PcieTx, i) {
            let tx = MetricLine::new(DeviceSlot::PcieTx.key(i), format!("tx [{i}]"));
            let rx = MetricLine::new(DeviceSlot::PcieRx.key(i), format!("rx [{i}]"));
            push(charts, "pcie", tx);
            push(charts, "pcie", rx.scaled(-1, 1));
        }

        if self.present(DeviceSlot::Ecc(EccCounterId::first()), i) {
            for id in EccCounterId::matrix() {
                let label = format!("{} [{i}]", id.label());
                push(charts, "ecc_errors", MetricLine::new(DeviceSlot::Ecc(id).key(i), label));
            }
        }

        if self.present(DeviceSlot::Temperature, i) {
            let line = MetricLine::new(DeviceSlot::Temperature.key(i), gpu.clone());
            push(charts, "temperature", line);
        }

        if self.present(DeviceSlot::FanSpeed, i) {
            let line = MetricLine::new(DeviceSlot::FanSpeed.key(i), gpu.clone());
            push(charts, "fan", line);
        }

        if self.present(DeviceSlot::Power, i) {
            let line = MetricLine::new(DeviceSlot::Power.key(i), gpu);
            push(charts, "power", line.scaled(1, POWER_DIVISOR));
        }
    }

    fn add_unit_lines(&self, u: u32, charts: &mut [ChartDefinition]) {
        for (slot, label) in [
            (UnitSlot::TempIntake, "intake"),
            (UnitSlot::TempExhaust, "exhaust"),
            (UnitSlot::TempBoard, "board"),
        ] {
            if self.unit_present(slot, u) {
                let line = MetricLine::new(slot.key(u), format!("{label} (unit {u})"));
                push(charts, "temperature", line);
            }
        }

        if self.unit_present(UnitSlot::FanSpeed, u) {
            let line = MetricLine::new(UnitSlot::FanSpeed.key(u), format!("Unit{u}"));
            push(charts, "unit_fan", line);
        }

        for (slot, label) in [
            (UnitSlot::PsuCurrent, "current (A)"),
            (UnitSlot::PsuPower, "power (W)"),
            (UnitSlot::PsuVoltage, "voltage (V)"),
        ] {
            if self.unit_present(slot, u) {
                let line = MetricLine::new(slot.key(u), format!("{label} (unit {u})"));
                push(charts, "unit_psu", line);
            }
        }
    }
}

fn push(charts: &mut [ChartDefinition], chart_id: &str, line: MetricLine) {
    if let Some(chart) = charts.iter_mut().find(|c| c.id == chart_id) {
        chart.lines.push(line);
    }
}

/// Device charts in publishing order: id, title, units, family, context, type
const BASE_CHARTS: [ChartOptions; 8] = [
    ("utilization", "Utilization", "%", "Utilization", "nv.utilization", ChartType::Line),
    (
        "memoryutilization",
        "Memory Utilization",
        "%",
        "Memory Utilization",
        "nv.memoryutilization",
        ChartType::Line,
    ),
    ("memory", "Memory", "MB", "Memory", "nv.memory", ChartType::Line),
    (
        "pcie",
        "PCI Express Bandwidth Utilization",
        "KiB/s",
        "PCIe Utilization",
        "nv.pcie",
        ChartType::Area,
    ),
    ("temperature", "GPU temperature", "C", "Temperature", "nv.temperature", ChartType::Line),
    ("fan", "Fan speed", "%", "Fans", "nv.fan", ChartType::Line),
    ("power", "Power Consumption", "Watt", "Power", "nv.power", ChartType::Line),
    ("ecc_errors", "ECC errors", "counts", "ECC", "nv.ecc", ChartType::Line),
];

/// Charts appended when chassis units are installed
const UNIT_CHARTS: [ChartOptions; 2] = [
    ("unit_fan", "Unit fan", "rpm", "Unit Fans", "nv.unit", ChartType::Line),
    ("unit_psu", "Unit PSU", "mixed", "Unit PSU", "nv.unit", ChartType::Line),
];

type ChartOptions = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    ChartType,
);

fn charts_from(options: &[ChartOptions]) -> Vec<ChartDefinition> {
    options
        .iter()
        .map(|&(id, title, units, family, context, chart_type)| {
            ChartDefinition::new(id, title, units, family, context, chart_type)
        })
        .collect()
}

fn base_charts() -> Vec<ChartDefinition> {
    charts_from(&BASE_CHARTS)
}

fn unit_charts() -> Vec<ChartDefinition> {
    charts_from(&UNIT_CHARTS)
}
