use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;

use nvchart::core::metrics::{DeviceInfo, EccCounterId};
use nvchart::core::source::{
    MemoryReading, MetricSource, PcieReading, UnitFanReading, UnitPsuReading, UtilizationReading,
};
use nvchart::core::ReportSource;
use nvchart::Result;

/// Metric groups a fake device can be told not to support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Missing {
    Memory,
    Utilization,
    Pcie,
    Temperature,
    Fan,
    Power,
    Ecc,
}

/// Scriptable metric source
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    pub devices: u32,
    pub units: u32,
    pub missing: HashSet<(u32, Missing)>,
    pub unit_fans: Vec<u32>,
    pub unit_psus: Vec<u32>,
}

impl ScriptedSource {
    pub fn devices(count: u32) -> Self {
        Self {
            devices: count,
            ..Default::default()
        }
    }

    pub fn without(mut self, device: u32, metric: Missing) -> Self {
        self.missing.insert((device, metric));
        self
    }

    fn has(&self, device: u32, metric: Missing) -> bool {
        !self.missing.contains(&(device, metric))
    }
}

impl MetricSource for ScriptedSource {
    fn device_count(&self) -> u32 {
        self.devices
    }

    fn unit_count(&self) -> u32 {
        self.units
    }

    fn device_info(&self, index: u32) -> DeviceInfo {
        DeviceInfo {
            index,
            name: "GeForce GTX 1080".to_string(),
            brand: "GeForce".to_string(),
        }
    }

    fn memory(&self, index: u32) -> Option<MemoryReading> {
        self.has(index, Missing::Memory).then_some(MemoryReading {
            total: 8 << 30,
            used: 512 << 20,
            free: (8 << 30) - (512 << 20),
        })
    }

    fn utilization(&self, index: u32) -> Option<UtilizationReading> {
        self.has(index, Missing::Utilization)
            .then_some(UtilizationReading { gpu: 17, memory: 9 })
    }

    fn pcie_throughput(&self, index: u32) -> Option<PcieReading> {
        self.has(index, Missing::Pcie)
            .then_some(PcieReading { tx: 2048, rx: 4096 })
    }

    fn temperature(&self, index: u32) -> Option<u32> {
        self.has(index, Missing::Temperature).then_some(58)
    }

    fn fan_speed(&self, index: u32) -> Option<u32> {
        self.has(index, Missing::Fan).then_some(35)
    }

    fn power_usage(&self, index: u32) -> Option<u32> {
        self.has(index, Missing::Power).then_some(87_500)
    }

    fn ecc_counter(&self, index: u32, _counter: EccCounterId) -> Option<u64> {
        self.has(index, Missing::Ecc).then_some(1)
    }

    fn unit_fan(&self, unit: u32) -> Option<UnitFanReading> {
        self.unit_fans.contains(&unit).then_some(UnitFanReading {
            speed_rpm: 4200,
            state: 0,
        })
    }

    fn unit_psu(&self, unit: u32) -> Option<UnitPsuReading> {
        self.unit_psus.contains(&unit).then_some(UnitPsuReading {
            current: 12,
            power: 650,
            voltage: 220,
            state: 0,
        })
    }
}

/// Report source returning a fixed text and counting invocations
pub struct CannedReport {
    text: String,
    pub calls: Rc<Cell<usize>>,
}

impl CannedReport {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            calls: Rc::new(Cell::new(0)),
        }
    }
}

impl ReportSource for CannedReport {
    fn fetch(&mut self) -> Result<String> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.text.clone())
    }
}

/// A plausible nvidia-settings report for one GPU
pub fn one_gpu_report() -> String {
    let mut report = String::from(
        "  Attribute 'GPUUtilization' (host:0[gpu:0]): graphics=23, memory=11, video=0, PCIe=0\n\
         \x20 Attribute 'GPUCurrentClockFreqs' (host:0[gpu:0]): 1607,5005.\n\
         \x20 Attribute 'GPUCoreTemp' (host:0[gpu:0]): 44.\n\
         \x20 Attribute 'TotalDedicatedGPUMemory' (host:0[gpu:0]): 8119.\n\
         \x20 Attribute 'UsedDedicatedGPUMemory' (host:0[gpu:0]): 301.\n",
    );
    while report.len() < 900 {
        report.push_str("    'UsedDedicatedGPUMemory' can use the following target types: GPU.\n");
    }
    report
}
