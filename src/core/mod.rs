// Core collection and schema logic

pub mod collector;
pub mod config;
pub mod legacy;
pub mod metrics;
pub mod plugin;
pub mod schema;
pub mod source;

// Re-export commonly used items
pub use collector::Collector;
pub use config::CollectorConfig;
pub use legacy::{LegacyAdapter, LegacyReport, ReportSource};
pub use metrics::{DeviceInfo, DeviceSlot, MetricValue, Snapshot, UnitSlot};
pub use plugin::Plugin;
pub use schema::{ChartDefinition, MetricLine, Schema, SchemaBuilder};
pub use source::MetricSource;
