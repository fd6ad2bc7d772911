// Vendor library and tool adapters

pub mod nvidia_settings;
pub mod nvml;

// Re-exports for shorter imports
pub use nvidia_settings::NvidiaSettings;
pub use nvml::NvmlSource;
