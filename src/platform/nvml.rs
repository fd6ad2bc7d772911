//! NVML-backed metric source.
//!
//! NVML (NVIDIA Management Library) is the library used by nvidia-smi. Every
//! query below maps a library error to `None`; only the handshake and the
//! device/unit enumeration in [`NvmlSource::init`] can fail hard.

#[cfg(feature = "nvml")]
mod imp {
    use nvml_wrapper::enum_wrappers::device::{
        EccCounter, MemoryError, MemoryLocation, PcieUtilCounter, TemperatureSensor,
    };
    use nvml_wrapper::enum_wrappers::unit::FanState;
    use nvml_wrapper::enums::unit::TemperatureReading;
    use nvml_wrapper::error::NvmlError;
    use nvml_wrapper::{Device, Nvml, Unit};
    use once_cell::sync::OnceCell;

    use crate::core::metrics::{
        DeviceInfo, EccCounterId, EccErrorClass, EccLocation, EccVolatility,
    };
    use crate::core::source::{
        MemoryReading, MetricSource, PcieReading, UnitFanReading, UnitProbe, UnitPsuReading,
        UtilizationReading,
    };
    use crate::error::{NvChartError, Result};

    /// NVML must be initialized once; device and unit handles borrow from it
    static NVML: OnceCell<Nvml> = OnceCell::new();

    /// Metric source holding the device and unit handles for the process lifetime
    pub struct NvmlSource {
        devices: Vec<Option<Device<'static>>>,
        units: Vec<Option<Unit<'static>>>,
    }

    impl NvmlSource {
        /// Initialize NVML, enumerate devices and units and acquire their handles.
        ///
        /// On enumeration failure the library is shut down before returning.
        pub fn init() -> Result<Self> {
            let nvml = match NVML.get() {
                Some(nvml) => {
                    let (device_count, unit_count) = enumerate(nvml)?;
                    return Ok(Self::acquire(nvml, device_count, unit_count));
                }
                None => Nvml::init().map_err(|e| {
                    NvChartError::library_init(format!("NVML could not be initialized: {}", e))
                })?,
            };

            match nvml.sys_driver_version() {
                Ok(version) => log::info!("Nvidia Driver Version: {}", version),
                Err(e) => log::debug!("Driver version unavailable: {}", e),
            }

            match enumerate(&nvml) {
                Ok((device_count, unit_count)) => {
                    let nvml = NVML.get_or_init(|| nvml);
                    Ok(Self::acquire(nvml, device_count, unit_count))
                }
                Err(e) => {
                    if let Err(shutdown) = nvml.shutdown() {
                        log::debug!("NVML shutdown failed: {}", shutdown);
                    }
                    Err(e)
                }
            }
        }

        fn acquire(nvml: &'static Nvml, device_count: u32, unit_count: u32) -> Self {
            let devices = (0..device_count)
                .map(|index| {
                    nvml
                        .device_by_index(index)
                        .map_err(|e| log::warn!("GPU {} handle: {}", index, e))
                        .ok()
                })
                .collect();
            let units = (0..unit_count)
                .map(|unit| {
                    nvml
                        .unit_by_index(unit)
                        .map_err(|e| log::warn!("Unit {} handle: {}", unit, e))
                        .ok()
                })
                .collect();

            Self { devices, units }
        }

        fn device(&self, index: u32) -> Option<&Device<'static>> {
            self.devices.get(index as usize)?.as_ref()
        }

        fn unit(&self, unit: u32) -> Option<&Unit<'static>> {
            self.units.get(unit as usize)?.as_ref()
        }
    }

    fn enumerate(nvml: &Nvml) -> Result<(u32, u32)> {
        nvml
            .device_count()
            .and_then(|devices| nvml.unit_count().map(|units| (devices, units)))
            .map_err(|e| {
                NvChartError::enumeration(format!("Error getting number of Nvidia GPUs: {}", e))
            })
    }

    /// Log an unsupported query and turn it into `None`
    fn supported<T>(
        result: std::result::Result<T, NvmlError>,
        what: &str,
        index: u32,
    ) -> Option<T> {
        result
            .map_err(|e| log::debug!("{} [{}]: {}", what, index, e))
            .ok()
    }

    fn memory_location(location: EccLocation) -> MemoryLocation {
        match location {
            EccLocation::L1Cache => MemoryLocation::L1Cache,
            EccLocation::L2Cache => MemoryLocation::L2Cache,
            EccLocation::DeviceMemory => MemoryLocation::Device,
            EccLocation::RegisterFile => MemoryLocation::RegisterFile,
            EccLocation::TextureMemory => MemoryLocation::Texture,
        }
    }

    fn temperature_reading(probe: UnitProbe) -> TemperatureReading {
        match probe {
            UnitProbe::Intake => TemperatureReading::Intake,
            UnitProbe::Exhaust => TemperatureReading::Exhaust,
            UnitProbe::Board => TemperatureReading::Board,
        }
    }

    impl MetricSource for NvmlSource {
        fn device_count(&self) -> u32 {
            self.devices.len() as u32
        }

        fn unit_count(&self) -> u32 {
            self.units.len() as u32
        }

        fn device_info(&self, index: u32) -> DeviceInfo {
            let device = self.device(index);
            let name = device
                .and_then(|d| supported(d.name(), "name", index))
                .unwrap_or_else(|| "Unknown NVIDIA GPU".to_string());
            let brand = device
                .and_then(|d| supported(d.brand(), "brand", index))
                .map(|b| format!("{:?}", b))
                .unwrap_or_else(|| "Unknown".to_string());
            log::debug!("Device {}: {} (brand {})", index, name, brand);

            DeviceInfo { index, name, brand }
        }

        fn memory(&self, index: u32) -> Option<MemoryReading> {
            let info = supported(self.device(index)?.memory_info(), "memory", index)?;
            Some(MemoryReading {
                total: info.total,
                used: info.used,
                free: info.free,
            })
        }

        fn utilization(&self, index: u32) -> Option<UtilizationReading> {
            let device = self.device(index)?;
            let rates = supported(device.utilization_rates(), "utilization", index)?;
            Some(UtilizationReading {
                gpu: rates.gpu,
                memory: rates.memory,
            })
        }

        fn pcie_throughput(&self, index: u32) -> Option<PcieReading> {
            let device = self.device(index)?;
            let tx = device.pcie_throughput(PcieUtilCounter::Send);
            let tx = supported(tx, "pcie tx", index)?;
            let rx = device.pcie_throughput(PcieUtilCounter::Receive);
            let rx = supported(rx, "pcie rx", index)?;
            Some(PcieReading { tx, rx })
        }

        fn temperature(&self, index: u32) -> Option<u32> {
            supported(
                self.device(index)?.temperature(TemperatureSensor::Gpu),
                "temperature",
                index,
            )
        }

        fn fan_speed(&self, index: u32) -> Option<u32> {
            supported(self.device(index)?.fan_speed(0), "fan speed", index)
        }

        fn power_usage(&self, index: u32) -> Option<u32> {
            supported(self.device(index)?.power_usage(), "power", index)
        }

        fn ecc_counter(&self, index: u32, counter: EccCounterId) -> Option<u64> {
            let error_type = match counter.class {
                EccErrorClass::Corrected => MemoryError::Corrected,
                EccErrorClass::Uncorrected => MemoryError::Uncorrected,
            };
            let counter_type = match counter.volatility {
                EccVolatility::Volatile => EccCounter::Volatile,
                EccVolatility::Aggregate => EccCounter::Aggregate,
            };
            let location = memory_location(counter.location);
            let count = self
                .device(index)?
                .memory_error_counter(error_type, counter_type, location);
            supported(count, "ecc", index)
        }

        fn unit_fan(&self, unit: u32) -> Option<UnitFanReading> {
            let info = supported(self.unit(unit)?.fan_info(), "unit fan", unit)?;
            let fan = info.fans.first()?;
            Some(UnitFanReading {
                speed_rpm: fan.speed,
                state: u32::from(!matches!(fan.state, FanState::Normal)),
            })
        }

        fn unit_psu(&self, unit: u32) -> Option<UnitPsuReading> {
            let psu = supported(self.unit(unit)?.psu_info(), "unit psu", unit)?;
            Some(UnitPsuReading {
                current: psu.current,
                power: psu.power_draw,
                voltage: psu.voltage,
                state: u32::from(!psu.state.trim().eq_ignore_ascii_case("normal")),
            })
        }

        fn unit_temperature(&self, unit: u32, probe: UnitProbe) -> Option<u32> {
            let reading = self.unit(unit)?.temperature(temperature_reading(probe));
            supported(reading, "unit temperature", unit)
        }
    }

}

/// Fallback when NVML feature is not enabled
#[cfg(not(feature = "nvml"))]
mod imp {
    use crate::core::source::MetricSource;
    use crate::error::{NvChartError, Result};

    pub struct NvmlSource;

    impl NvmlSource {
        pub fn init() -> Result<Self> {
            Err(NvChartError::gpu_not_available(
                "NVML feature not enabled. Recompile with --features nvml",
            ))
        }
    }

    impl MetricSource for NvmlSource {
        fn device_count(&self) -> u32 {
            0
        }

        fn unit_count(&self) -> u32 {
            0
        }
    }
}

pub use imp::NvmlSource;
