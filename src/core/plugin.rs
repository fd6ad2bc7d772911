use super::collector::Collector;
use super::config::CollectorConfig;
use super::legacy::{LegacyAdapter, ReportSource};
use super::metrics::Snapshot;
use super::schema::{Schema, SchemaBuilder};
use super::source::MetricSource;
use crate::error::Result;

/// Service-facing plugin: initialize once, then fetch a snapshot per tick
pub struct Plugin<S: MetricSource> {
    config: CollectorConfig,
    report_source: Option<Box<dyn ReportSource>>,
    collector: Option<Collector<S>>,
    schema: Option<Schema>,
}

impl<S: MetricSource> Plugin<S> {
    pub fn new(config: CollectorConfig) -> Self {
        Self {
            config,
            report_source: None,
            collector: None,
            schema: None,
        }
    }

    /// Text report used when legacy mode is on
    pub fn with_report_source(mut self, source: Box<dyn ReportSource>) -> Self {
        self.report_source = Some(source);
        self
    }

    /// Initialize the metric source and build the schema.
    ///
    /// Returns false when the source cannot be initialized; no schema is
    /// built in that case and [`Plugin::get_data`] keeps returning `None`.
    pub fn check<F>(&mut self, init: F) -> bool
    where
        F: FnOnce() -> Result<S>,
    {
        match self.initialize(init) {
            Ok(()) => true,
            Err(e) => {
                log::error!("{}", e);
                false
            }
        }
    }

    fn initialize<F>(&mut self, init: F) -> Result<()>
    where
        F: FnOnce() -> Result<S>,
    {
        let source = init()?;
        log::debug!("Unit count: {}", source.unit_count());
        log::debug!("Device count: {}", source.device_count());

        let legacy = if self.config.legacy {
            match self.report_source.take() {
                Some(report) => Some(LegacyAdapter::new(report, true)),
                None => {
                    log::warn!("Legacy mode requested but no report source is available");
                    None
                }
            }
        } else {
            None
        };

        let mut collector = Collector::new(source, legacy);
        let probe = collector.collect();
        let builder = SchemaBuilder::new(&probe, &self.config);
        log::info!("Graphics Card(s) found: {}", builder.device_names());

        let schema = builder.build();
        log::debug!(
            "Schema built: {} charts, {} lines",
            schema.populated_charts().count(),
            schema.line_count()
        );

        self.collector = Some(collector);
        self.schema = Some(schema);
        Ok(())
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    pub fn collector(&self) -> Option<&Collector<S>> {
        self.collector.as_ref()
    }

    /// One collection cycle; `None` until [`Plugin::check`] succeeded
    pub fn get_data(&mut self) -> Option<Snapshot> {
        self.collector.as_mut().map(Collector::collect)
    }
}
