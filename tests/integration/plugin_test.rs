use std::rc::Rc;

use nvchart::core::metrics::{DeviceSlot, EccCounterId, MetricValue};
use nvchart::core::{CollectorConfig, Plugin, SchemaBuilder};
use nvchart::NvChartError;

use super::common::{one_gpu_report, CannedReport, Missing, ScriptedSource};

fn lines_in(plugin: &Plugin<ScriptedSource>, chart: &str) -> usize {
    plugin
        .schema()
        .and_then(|s| s.chart(chart))
        .map_or(0, |c| c.lines.len())
}

#[test]
fn test_all_metrics_single_device() {
    let mut plugin = Plugin::new(CollectorConfig::default());
    assert!(plugin.check(|| Ok(ScriptedSource::devices(1))));

    let schema = plugin.schema().unwrap();
    assert_eq!(schema.populated_charts().count(), 8);
    assert!(schema.chart("unit_fan").is_none());
    assert!(schema.chart("unit_psu").is_none());
    for chart in ["utilization", "memoryutilization", "memory", "temperature", "fan", "power"] {
        assert_eq!(lines_in(&plugin, chart), 1, "{chart}");
    }
    assert_eq!(lines_in(&plugin, "pcie"), 2);
    assert_eq!(lines_in(&plugin, "ecc_errors"), 20);
}

#[test]
fn test_missing_ecc_keeps_empty_group() {
    let mut plugin = Plugin::new(CollectorConfig::default());
    assert!(plugin.check(|| Ok(ScriptedSource::devices(1).without(0, Missing::Ecc))));

    let schema = plugin.schema().unwrap();
    assert_eq!(schema.populated_charts().count(), 7);
    assert_eq!(schema.chart("ecc_errors").unwrap().lines.len(), 0);
}

#[test]
fn test_short_legacy_report_disables_fallback() {
    let report = CannedReport::new("ERROR: Unable to load info from any available system");
    let calls = Rc::clone(&report.calls);

    let mut plugin = Plugin::new(CollectorConfig::default().with_legacy(true))
        .with_report_source(Box::new(report));
    assert!(plugin.check(|| Ok(ScriptedSource::devices(1).without(0, Missing::Temperature))));

    assert!(!plugin.collector().unwrap().legacy_active());
    assert!(!plugin.schema().unwrap().contains_key("device_temp_0"));
    assert_eq!(lines_in(&plugin, "temperature"), 0);

    for _ in 0..3 {
        let snapshot = plugin.get_data().unwrap();
        assert_eq!(snapshot.get("device_temp_0"), MetricValue::Absent);
    }
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_legacy_report_backfills_and_enters_schema() {
    let report = CannedReport::new(&one_gpu_report());
    let calls = Rc::clone(&report.calls);

    let mut plugin = Plugin::new(CollectorConfig::default().with_legacy(true))
        .with_report_source(Box::new(report));
    let source = ScriptedSource::devices(1)
        .without(0, Missing::Temperature)
        .without(0, Missing::Memory);
    assert!(plugin.check(|| Ok(source)));

    let schema = plugin.schema().unwrap().clone();
    assert!(schema.contains_key("device_temp_0"));
    assert!(schema.contains_key("device_mem_used_0"));

    let snapshot = plugin.get_data().unwrap();
    assert_eq!(snapshot.get("device_temp_0"), MetricValue::Present(44));
    assert_eq!(snapshot.get("device_mem_used_0"), MetricValue::Present(301 * 1024 * 1024));
    // Primary value kept even though the report carries another one
    assert_eq!(snapshot.get("device_util_gpu_0"), MetricValue::Present(17));
    assert_eq!(calls.get(), 2);
}

#[test]
fn test_two_units_one_fan() {
    let source = ScriptedSource {
        units: 2,
        unit_fans: vec![0],
        ..ScriptedSource::devices(1)
    };
    let mut plugin = Plugin::new(CollectorConfig::default());
    assert!(plugin.check(|| Ok(source)));

    let fan = plugin.schema().unwrap().chart("unit_fan").unwrap();
    assert_eq!(fan.lines.len(), 1);
    assert_eq!(fan.lines[0].key, "unit_fan_speed_0");
    assert_eq!(fan.lines[0].name, "Unit0");
}

#[test]
fn test_unit_psu_lines() {
    let source = ScriptedSource {
        units: 2,
        unit_psus: vec![1],
        ..ScriptedSource::devices(1)
    };
    let mut plugin = Plugin::new(CollectorConfig::default());
    assert!(plugin.check(|| Ok(source)));

    let psu = plugin.schema().unwrap().chart("unit_psu").unwrap();
    let keys: Vec<&str> = psu.lines.iter().map(|l| l.key.as_str()).collect();
    assert_eq!(keys, ["unit_psu_current_1", "unit_psu_power_1", "unit_psu_voltage_1"]);
}

#[test]
fn test_ecc_and_pcie_groups_per_device() {
    let source = ScriptedSource::devices(3)
        .without(1, Missing::Ecc)
        .without(2, Missing::Pcie);
    let mut plugin = Plugin::new(CollectorConfig::default());
    assert!(plugin.check(|| Ok(source)));
    let schema = plugin.schema().unwrap();

    for device in 0..3u32 {
        let ecc = EccCounterId::matrix()
            .into_iter()
            .filter(|id| schema.contains_key(&DeviceSlot::Ecc(*id).key(device)))
            .count();
        assert_eq!(ecc, if device == 1 { 0 } else { 20 });

        let tx = schema.contains_key(&DeviceSlot::PcieTx.key(device));
        let rx = schema.contains_key(&DeviceSlot::PcieRx.key(device));
        assert_eq!(tx, rx);
        assert_eq!(tx, device != 2);
    }
}

#[test]
fn test_snapshot_declares_every_slot_every_cycle() {
    let source = ScriptedSource {
        units: 1,
        ..ScriptedSource::devices(2).without(0, Missing::Ecc)
    };
    let mut plugin = Plugin::new(CollectorConfig::default());
    assert!(plugin.check(|| Ok(source)));

    let first = plugin.get_data().unwrap().to_flat_map();
    let second = plugin.get_data().unwrap().to_flat_map();
    assert_eq!(first.len(), 2 * DeviceSlot::all().len() + 9);
    assert_eq!(
        first.keys().collect::<Vec<_>>(),
        second.keys().collect::<Vec<_>>()
    );
    assert_eq!(first["device_ecc_errors_L1_CACHE_VOLATILE_CORRECTED_0"], None);
    assert_eq!(first["device_ecc_errors_L1_CACHE_VOLATILE_CORRECTED_1"], Some(1));
}

#[test]
fn test_schema_rebuild_is_identical() {
    let mut plugin = Plugin::new(CollectorConfig::default());
    assert!(plugin.check(|| Ok(ScriptedSource::devices(2).without(1, Missing::Fan))));

    let probe = plugin.get_data().unwrap();
    let config = CollectorConfig::default();
    let first = SchemaBuilder::new(&probe, &config).build();
    let second = SchemaBuilder::new(&probe, &config).build();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_failed_initialization() {
    let mut plugin: Plugin<ScriptedSource> = Plugin::new(CollectorConfig::default());
    assert!(!plugin.check(|| Err(NvChartError::enumeration("no devices"))));
    assert!(plugin.schema().is_none());
    assert!(plugin.get_data().is_none());
}

#[test]
fn test_device_without_metrics_keeps_its_index() {
    let source = ScriptedSource::devices(2)
        .without(0, Missing::Memory)
        .without(0, Missing::Utilization)
        .without(0, Missing::Pcie)
        .without(0, Missing::Temperature)
        .without(0, Missing::Fan)
        .without(0, Missing::Power)
        .without(0, Missing::Ecc);
    let mut plugin = Plugin::new(CollectorConfig::default());
    assert!(plugin.check(|| Ok(source)));

    let schema = plugin.schema().unwrap();
    assert!(schema.lines().all(|l| l.key.ends_with("_1")));
    assert!(schema
        .chart("temperature")
        .unwrap()
        .title
        .ends_with("GeForce GTX 1080 [0] | GeForce GTX 1080 [1]"));
}
