use super::legacy::LegacyAdapter;
use super::metrics::{DeviceInfo, DeviceSlot, Snapshot, UnitSlot};
use super::source::{read_ecc_matrix, MetricSource, UnitProbe};

/// Runs one sampling pass over every device and chassis unit
pub struct Collector<S: MetricSource> {
    source: S,
    devices: Vec<DeviceInfo>,
    legacy: Option<LegacyAdapter>,
}

impl<S: MetricSource> Collector<S> {
    /// Create a collector. Device identities are resolved once, here.
    pub fn new(source: S, legacy: Option<LegacyAdapter>) -> Self {
        let devices = (0..source.device_count())
            .map(|index| source.device_info(index))
            .collect();

        Self {
            source,
            devices,
            legacy,
        }
    }

    pub fn legacy_active(&self) -> bool {
        self.legacy.as_ref().is_some_and(LegacyAdapter::is_active)
    }

    /// Collect one snapshot. Never fails: unsupported metrics are `Absent`.
    pub fn collect(&mut self) -> Snapshot {
        let mut snapshot = Snapshot::new(self.devices.clone(), self.source.unit_count());

        for device in &self.devices {
            self.collect_device(device, &mut snapshot);
        }

        for unit in 0..snapshot.unit_count {
            self.collect_unit(unit, &mut snapshot);
        }

        if let Some(legacy) = self.legacy.as_mut() {
            legacy.backfill(&mut snapshot);
        }

        snapshot
    }

    fn collect_device(&self, device: &DeviceInfo, snapshot: &mut Snapshot) {
        let i = device.index;
        let name = &device.name;

        let memory = self.source.memory(i);
        log::debug!("{} Mem: {:?}", name, memory);
        snapshot.set_device(DeviceSlot::MemTotal, i, memory.map(|m| m.total));
        snapshot.set_device(DeviceSlot::MemUsed, i, memory.map(|m| m.used));
        snapshot.set_device(DeviceSlot::MemFree, i, memory.map(|m| m.free));

        let utilization = self.source.utilization(i);
        log::debug!("{} Utilization: {:?}", name, utilization);
        snapshot.set_device(DeviceSlot::UtilGpu, i, utilization.map(|u| u.gpu));
        snapshot.set_device(DeviceSlot::UtilMem, i, utilization.map(|u| u.memory));

        let pcie = self.source.pcie_throughput(i);
        log::debug!("{} PCIe: {:?}", name, pcie);
        snapshot.set_device(DeviceSlot::PcieTx, i, pcie.map(|p| p.tx));
        snapshot.set_device(DeviceSlot::PcieRx, i, pcie.map(|p| p.rx));

        let temperature = self.source.temperature(i);
        log::debug!("{} Temp: {:?}", name, temperature);
        snapshot.set_device(DeviceSlot::Temperature, i, temperature);

        let fan_speed = self.source.fan_speed(i);
        log::debug!("{} Fan speed: {:?}", name, fan_speed);
        snapshot.set_device(DeviceSlot::FanSpeed, i, fan_speed);

        let power = self.source.power_usage(i);
        log::debug!("{} Power usage (mW): {:?}", name, power);
        snapshot.set_device(DeviceSlot::Power, i, power);

        // Slots were initialised Absent, so a failed matrix needs no writes
        match read_ecc_matrix(&self.source, i) {
            Some(counters) => {
                for (id, count) in counters {
                    snapshot.set_device(DeviceSlot::Ecc(id), i, Some(count));
                }
            }
            None => log::debug!("{} ECC errors: unsupported", name),
        }
    }

    fn collect_unit(&self, unit: u32, snapshot: &mut Snapshot) {
        let fan = self.source.unit_fan(unit);
        log::debug!("Unit {} fan: {:?}", unit, fan);
        snapshot.set_unit(UnitSlot::FanSpeed, unit, fan.map(|f| f.speed_rpm));
        snapshot.set_unit(UnitSlot::FanState, unit, fan.map(|f| f.state));

        let psu = self.source.unit_psu(unit);
        log::debug!("Unit {} PSU: {:?}", unit, psu);
        snapshot.set_unit(UnitSlot::PsuCurrent, unit, psu.map(|p| p.current));
        snapshot.set_unit(UnitSlot::PsuPower, unit, psu.map(|p| p.power));
        snapshot.set_unit(UnitSlot::PsuVoltage, unit, psu.map(|p| p.voltage));
        snapshot.set_unit(UnitSlot::PsuState, unit, psu.map(|p| p.state));

        for (slot, probe) in [
            (UnitSlot::TempIntake, UnitProbe::Intake),
            (UnitSlot::TempExhaust, UnitProbe::Exhaust),
            (UnitSlot::TempBoard, UnitProbe::Board),
        ] {
            let temperature = self.source.unit_temperature(unit, probe);
            log::debug!("Unit {} temp {:?}: {:?}", unit, probe, temperature);
            snapshot.set_unit(slot, unit, temperature);
        }
    }
}
