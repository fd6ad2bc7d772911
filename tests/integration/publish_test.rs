use nvchart::core::{CollectorConfig, Plugin};
use nvchart::ui::NetdataWriter;

use super::common::{Missing, ScriptedSource};

#[test]
fn test_netdata_stream_for_two_devices() {
    let mut plugin = Plugin::new(CollectorConfig::default());
    assert!(plugin.check(|| Ok(ScriptedSource::devices(2).without(1, Missing::Ecc))));
    let schema = plugin.schema().unwrap().clone();

    let mut writer = NetdataWriter::new(Vec::new(), 2);
    writer.write_definitions(&schema).unwrap();
    let snapshot = plugin.get_data().unwrap();
    writer.write_snapshot(&schema, &snapshot, None).unwrap();
    let text = String::from_utf8(writer.into_inner()).unwrap();

    assert!(text.contains("DIMENSION device_util_gpu_1 'GPU:1' absolute 1 1"));
    assert!(text.contains("DIMENSION device_power_0 'GPU:0' absolute 1 1000"));
    assert!(text.contains("SET device_power_1 = 87500"));
    assert!(text.contains("SET device_ecc_errors_TEXTURE_MEMORY_AGGREGATE_UNCORRECTED_0 = 1"));
    assert!(!text.contains("_CORRECTED_1 "));
    assert_eq!(text.matches("\nEND\n").count(), 8);
}

#[test]
fn test_snapshot_json_uses_null_for_absent() {
    let mut plugin = Plugin::new(CollectorConfig::default());
    assert!(plugin.check(|| Ok(ScriptedSource::devices(1).without(0, Missing::Fan))));

    let json = serde_json::to_value(plugin.get_data().unwrap()).unwrap();
    assert!(json["values"]["device_fanspeed_0"].is_null());
    assert_eq!(json["values"]["device_temp_0"], 58);
    assert_eq!(json["devices"][0]["name"], "GeForce GTX 1080");
}
