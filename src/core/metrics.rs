//! Metric slots, values and the per-cycle snapshot.
//!
//! Every device and chassis unit exposes a fixed set of slots. A snapshot
//! always carries one entry per slot, either a present scalar or
//! [`MetricValue::Absent`].

use chrono::Utc;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Value of a single metric slot for one collection instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetricValue {
    Present(u64),
    #[default]
    Absent,
}

impl MetricValue {
    pub fn is_present(&self) -> bool {
        matches!(self, MetricValue::Present(_))
    }

    pub fn as_option(&self) -> Option<u64> {
        match self {
            MetricValue::Present(v) => Some(*v),
            MetricValue::Absent => None,
        }
    }
}

impl From<Option<u64>> for MetricValue {
    fn from(value: Option<u64>) -> Self {
        value.map_or(MetricValue::Absent, MetricValue::Present)
    }
}

impl From<Option<u32>> for MetricValue {
    fn from(value: Option<u32>) -> Self {
        value.map(u64::from).into()
    }
}

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.as_option().serialize(serializer)
    }
}

/// Physical location of an ECC counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EccLocation {
    L1Cache,
    L2Cache,
    DeviceMemory,
    RegisterFile,
    TextureMemory,
}

impl EccLocation {
    pub const ALL: [EccLocation; 5] = [
        EccLocation::L1Cache,
        EccLocation::L2Cache,
        EccLocation::DeviceMemory,
        EccLocation::RegisterFile,
        EccLocation::TextureMemory,
    ];

    fn key_part(self) -> &'static str {
        match self {
            EccLocation::L1Cache => "L1_CACHE",
            EccLocation::L2Cache => "L2_CACHE",
            EccLocation::DeviceMemory => "DEVICE_MEMORY",
            EccLocation::RegisterFile => "REGISTER_FILE",
            EccLocation::TextureMemory => "TEXTURE_MEMORY",
        }
    }

    fn label(self) -> &'static str {
        match self {
            EccLocation::L1Cache => "L1 Cache",
            EccLocation::L2Cache => "L2 Cache",
            EccLocation::DeviceMemory => "Device Memory",
            EccLocation::RegisterFile => "Register File",
            EccLocation::TextureMemory => "Texture Memory",
        }
    }
}

/// Volatile counters reset on driver reload, aggregate ones persist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EccVolatility {
    Volatile,
    Aggregate,
}

impl EccVolatility {
    pub const ALL: [EccVolatility; 2] = [EccVolatility::Volatile, EccVolatility::Aggregate];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EccErrorClass {
    Corrected,
    Uncorrected,
}

impl EccErrorClass {
    pub const ALL: [EccErrorClass; 2] = [EccErrorClass::Corrected, EccErrorClass::Uncorrected];
}

/// One cell of the 5x2x2 ECC matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EccCounterId {
    pub location: EccLocation,
    pub volatility: EccVolatility,
    pub class: EccErrorClass,
}

impl EccCounterId {
    /// Number of counters tracked per device
    pub const COUNT: usize = 20;

    /// The full matrix in its fixed order: location, then volatility, then class
    pub fn matrix() -> Vec<EccCounterId> {
        let mut ids = Vec::with_capacity(Self::COUNT);
        for location in EccLocation::ALL {
            for volatility in EccVolatility::ALL {
                for class in EccErrorClass::ALL {
                    ids.push(EccCounterId {
                        location,
                        volatility,
                        class,
                    });
                }
            }
        }
        ids
    }

    /// The counter whose presence decides the whole group
    pub fn first() -> EccCounterId {
        EccCounterId {
            location: EccLocation::L1Cache,
            volatility: EccVolatility::Volatile,
            class: EccErrorClass::Corrected,
        }
    }

    fn key_part(&self) -> String {
        let volatility = match self.volatility {
            EccVolatility::Volatile => "VOLATILE",
            EccVolatility::Aggregate => "AGGREGATE",
        };
        let class = match self.class {
            EccErrorClass::Corrected => "CORRECTED",
            EccErrorClass::Uncorrected => "UNCORRECTED",
        };
        format!("{}_{}_{}", self.location.key_part(), volatility, class)
    }

    /// Human readable label, e.g. "L1 Cache Volatile Corrected"
    pub fn label(&self) -> String {
        let volatility = match self.volatility {
            EccVolatility::Volatile => "Volatile",
            EccVolatility::Aggregate => "Aggregate",
        };
        let class = match self.class {
            EccErrorClass::Corrected => "Corrected",
            EccErrorClass::Uncorrected => "Uncorrected",
        };
        format!("{} {} {}", self.location.label(), volatility, class)
    }
}

/// Per-device metric slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceSlot {
    MemTotal,
    MemUsed,
    MemFree,
    UtilGpu,
    UtilMem,
    PcieTx,
    PcieRx,
    Temperature,
    FanSpeed,
    Power,
    Ecc(EccCounterId),
}

impl DeviceSlot {
    /// All slots in their fixed per-device order
    pub fn all() -> Vec<DeviceSlot> {
        let mut slots = vec![
            DeviceSlot::MemTotal,
            DeviceSlot::MemUsed,
            DeviceSlot::MemFree,
            DeviceSlot::UtilGpu,
            DeviceSlot::UtilMem,
            DeviceSlot::PcieTx,
            DeviceSlot::PcieRx,
            DeviceSlot::Temperature,
            DeviceSlot::FanSpeed,
            DeviceSlot::Power,
        ];
        slots.extend(EccCounterId::matrix().into_iter().map(DeviceSlot::Ecc));
        slots
    }

    /// Fully-qualified snapshot key for this slot on device `index`
    pub fn key(&self, index: u32) -> String {
        match self {
            DeviceSlot::MemTotal => format!("device_mem_total_{index}"),
            DeviceSlot::MemUsed => format!("device_mem_used_{index}"),
            DeviceSlot::MemFree => format!("device_mem_free_{index}"),
            DeviceSlot::UtilGpu => format!("device_util_gpu_{index}"),
            DeviceSlot::UtilMem => format!("device_util_mem_{index}"),
            DeviceSlot::PcieTx => format!("device_util_pcie_tx_{index}"),
            DeviceSlot::PcieRx => format!("device_util_pcie_rx_{index}"),
            DeviceSlot::Temperature => format!("device_temp_{index}"),
            DeviceSlot::FanSpeed => format!("device_fanspeed_{index}"),
            DeviceSlot::Power => format!("device_power_{index}"),
            DeviceSlot::Ecc(id) => format!("device_ecc_errors_{}_{index}", id.key_part()),
        }
    }
}

/// Per-chassis-unit metric slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitSlot {
    FanSpeed,
    FanState,
    PsuCurrent,
    PsuPower,
    PsuVoltage,
    PsuState,
    TempIntake,
    TempExhaust,
    TempBoard,
}

impl UnitSlot {
    pub const ALL: [UnitSlot; 9] = [
        UnitSlot::FanSpeed,
        UnitSlot::FanState,
        UnitSlot::PsuCurrent,
        UnitSlot::PsuPower,
        UnitSlot::PsuVoltage,
        UnitSlot::PsuState,
        UnitSlot::TempIntake,
        UnitSlot::TempExhaust,
        UnitSlot::TempBoard,
    ];

    pub fn key(&self, index: u32) -> String {
        let name = match self {
            UnitSlot::FanSpeed => "unit_fan_speed",
            UnitSlot::FanState => "unit_fan_state",
            UnitSlot::PsuCurrent => "unit_psu_current",
            UnitSlot::PsuPower => "unit_psu_power",
            UnitSlot::PsuVoltage => "unit_psu_voltage",
            UnitSlot::PsuState => "unit_psu_state",
            UnitSlot::TempIntake => "unit_temp_intake",
            UnitSlot::TempExhaust => "unit_temp_exhaust",
            UnitSlot::TempBoard => "unit_temp_board",
        };
        format!("{name}_{index}")
    }
}

/// Identity of an enumerated device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub index: u32,
    pub name: String,
    pub brand: String,
}

impl DeviceInfo {
    /// Name with the index appended, e.g. "Tesla K80 [0]"
    pub fn display_name(&self) -> String {
        format!("{} [{}]", self.name, self.index)
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// One complete set of readings for a single collection instant
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub timestamp: i64,
    pub devices: Vec<DeviceInfo>,
    pub unit_count: u32,
    values: BTreeMap<String, MetricValue>,
}

impl Snapshot {
    /// Snapshot with every declared slot initialised to `Absent`
    pub fn new(devices: Vec<DeviceInfo>, unit_count: u32) -> Self {
        let mut values = BTreeMap::new();
        let device_slots = DeviceSlot::all();
        for device in &devices {
            for slot in &device_slots {
                values.insert(slot.key(device.index), MetricValue::Absent);
            }
        }
        for unit in 0..unit_count {
            for slot in UnitSlot::ALL {
                values.insert(slot.key(unit), MetricValue::Absent);
            }
        }

        Self {
            timestamp: Utc::now().timestamp(),
            devices,
            unit_count,
            values,
        }
    }

    /// Value stored under `key`, `Absent` for unknown keys
    pub fn get(&self, key: &str) -> MetricValue {
        self.values.get(key).copied().unwrap_or_default()
    }

    pub fn is_present(&self, key: &str) -> bool {
        self.get(key).is_present()
    }

    pub fn device_value(&self, slot: DeviceSlot, index: u32) -> MetricValue {
        self.get(&slot.key(index))
    }

    pub fn unit_value(&self, slot: UnitSlot, index: u32) -> MetricValue {
        self.get(&slot.key(index))
    }

    pub fn set_device(&mut self, slot: DeviceSlot, index: u32, value: impl Into<MetricValue>) {
        self.values.insert(slot.key(index), value.into());
    }

    pub fn set_unit(&mut self, slot: UnitSlot, index: u32, value: impl Into<MetricValue>) {
        self.values.insert(slot.key(index), value.into());
    }

    /// Store `value` only if the slot is currently absent. Returns true when written.
    pub fn fill_if_absent(&mut self, slot: DeviceSlot, index: u32, value: u64) -> bool {
        let entry = self
            .values
            .entry(slot.key(index))
            .or_insert(MetricValue::Absent);
        if entry.is_present() {
            return false;
        }
        *entry = MetricValue::Present(value);
        true
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, MetricValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Flat key -> value mapping handed to the publishing layer
    pub fn to_flat_map(&self) -> BTreeMap<String, Option<u64>> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.as_option()))
            .collect()
    }
}
