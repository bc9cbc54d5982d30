//! Tests for profile index construction and the reload protocol.

use mapper_profile::indexer::{visitor_key, IntegrityViolation, ProfileError, ProfileIndexer};
use mapper_profile::DeviceProfileDocument;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn document(value: serde_json::Value) -> DeviceProfileDocument {
    serde_json::from_value(value).unwrap()
}

fn sample_document() -> DeviceProfileDocument {
    document(serde_json::json!({
        "deviceInstances": [
            {
                "id": "dev1",
                "model": "m1",
                "protocol": "p1",
                "propertyVisitors": [
                    {
                        "modelName": "m1",
                        "propertyName": "temp",
                        "protocol": "modbus-tcp",
                        "register": "HoldingRegister",
                        "offset": 2
                    }
                ]
            }
        ],
        "deviceModels": [
            {"name": "m1", "properties": [{"name": "temp"}]}
        ],
        "protocols": [
            {"name": "p1", "protocolType": "modbus-tcp"}
        ]
    }))
}

#[test]
fn end_to_end_single_instance() {
    let indexer = ProfileIndexer::new();
    let violations = indexer.rebuild(&sample_document());
    assert!(violations.is_empty());

    let index = indexer.snapshot();
    assert_eq!(index.instance("dev1").unwrap().model, "m1");
    assert_eq!(index.model_for("dev1").unwrap().name, "m1");
    assert_eq!(index.protocol_for("dev1").unwrap().name, "p1");

    let visitor = index.visitor_by_key("m1-temp-modbus").unwrap();
    assert_eq!(visitor.property_name, "temp");
    assert_eq!(visitor.config["register"], "HoldingRegister");

    // Family-normalizing lookup reaches the same entry through either
    // transport designator.
    assert!(index.visitor("m1", "temp", "modbus-rtu").is_some());
    assert!(index.visitor("m1", "temp", "modbus-tcp").is_some());
}

#[test]
fn every_instance_id_is_indexed() {
    let doc = document(serde_json::json!({
        "deviceInstances": [
            {"id": "dev1", "model": "m1", "protocol": "p1"},
            {"id": "dev2", "model": "missing", "protocol": "p1"},
            {"id": "dev3", "model": "m1", "protocol": "missing"}
        ],
        "deviceModels": [{"name": "m1", "properties": []}],
        "protocols": [{"name": "p1"}]
    }));

    let indexer = ProfileIndexer::new();
    indexer.rebuild(&doc);

    let index = indexer.snapshot();
    assert_eq!(index.instance_count(), 3);
    for id in ["dev1", "dev2", "dev3"] {
        assert!(index.instance(id).is_some());
    }
}

#[test]
fn missing_model_is_reported_not_fatal() {
    let doc = document(serde_json::json!({
        "deviceInstances": [
            {"id": "dev1", "model": "missing", "protocol": "p1"},
            {"id": "dev2", "model": "m1", "protocol": "p1"}
        ],
        "deviceModels": [{"name": "m1", "properties": []}],
        "protocols": [{"name": "p1"}]
    }));

    let indexer = ProfileIndexer::new();
    let violations = indexer.rebuild(&doc);

    assert_eq!(
        violations,
        vec![IntegrityViolation::ModelNotFound {
            instance_id: "dev1".to_string(),
            model: "missing".to_string(),
        }]
    );

    let index = indexer.snapshot();
    assert!(index.model_for("dev1").is_none());
    // The rest of the rebuild completed.
    assert!(index.model_for("dev2").is_some());
    assert!(index.protocol_for("dev1").is_some());
}

#[test]
fn missing_protocol_is_reported_not_fatal() {
    let doc = document(serde_json::json!({
        "deviceInstances": [
            {"id": "dev1", "model": "m1", "protocol": "missing"}
        ],
        "deviceModels": [{"name": "m1", "properties": []}],
        "protocols": [{"name": "p1"}]
    }));

    let indexer = ProfileIndexer::new();
    let violations = indexer.rebuild(&doc);

    assert_eq!(
        violations,
        vec![IntegrityViolation::ProtocolNotFound {
            instance_id: "dev1".to_string(),
            protocol: "missing".to_string(),
        }]
    );

    let index = indexer.snapshot();
    assert!(index.protocol_for("dev1").is_none());
    assert!(index.model_for("dev1").is_some());
}

#[test]
fn missing_visitor_is_reported_not_fatal() {
    let doc = document(serde_json::json!({
        "deviceInstances": [
            {"id": "dev1", "model": "m1", "protocol": "p1", "propertyVisitors": []}
        ],
        "deviceModels": [
            {"name": "m1", "properties": [{"name": "temp"}, {"name": "humidity"}]}
        ],
        "protocols": [{"name": "p1"}]
    }));

    let indexer = ProfileIndexer::new();
    let violations = indexer.rebuild(&doc);

    assert_eq!(violations.len(), 2);
    assert!(violations.contains(&IntegrityViolation::VisitorNotFound {
        model: "m1".to_string(),
        property: "temp".to_string(),
    }));

    let index = indexer.snapshot();
    assert_eq!(index.visitor_count(), 0);
    assert!(index.instance("dev1").is_some());
}

#[test]
fn duplicate_composite_keys_overwrite_last_write_wins() {
    // "a" + "b-c" and "a-b" + "c" collide on the composite key "a-b-c-...";
    // the later model in document order wins, without erroring.
    let doc = document(serde_json::json!({
        "deviceInstances": [
            {
                "id": "dev1",
                "model": "a",
                "protocol": "p1",
                "propertyVisitors": [
                    {"modelName": "a", "propertyName": "b-c", "protocol": "modbus-rtu", "offset": 1},
                    {"modelName": "a-b", "propertyName": "c", "protocol": "modbus-tcp", "offset": 2}
                ]
            }
        ],
        "deviceModels": [
            {"name": "a", "properties": [{"name": "b-c"}]},
            {"name": "a-b", "properties": [{"name": "c"}]}
        ],
        "protocols": [{"name": "p1"}]
    }));

    let indexer = ProfileIndexer::new();
    indexer.rebuild(&doc);

    let index = indexer.snapshot();
    assert_eq!(index.visitor_count(), 1);
    let visitor = index.visitor_by_key("a-b-c-modbus").unwrap();
    assert_eq!(visitor.model_name, "a-b");
    assert_eq!(visitor.config["offset"], 2);
}

#[test]
fn composite_key_formats_with_family() {
    assert_eq!(visitor_key("m1", "temp", "modbus-rtu"), "m1-temp-modbus");
    assert_eq!(visitor_key("m1", "temp", "opc-ua"), "m1-temp-opc-ua");
}

#[test]
fn reload_replaces_the_snapshot_wholesale() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("deviceProfile.json");

    fs::write(&path, serde_json::to_string(&sample_document()).unwrap()).unwrap();
    let indexer = ProfileIndexer::new();
    let violations = indexer.reload(&path).unwrap();
    assert!(violations.is_empty());
    assert_eq!(indexer.snapshot().instance_count(), 1);

    // A smaller document supersedes the previous index entirely.
    fs::write(
        &path,
        r#"{"deviceInstances": [], "deviceModels": [], "protocols": []}"#,
    )
    .unwrap();
    indexer.reload(&path).unwrap();
    assert!(indexer.snapshot().is_empty());
}

#[test]
fn failed_reload_keeps_last_known_good() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("deviceProfile.json");

    fs::write(&path, serde_json::to_string(&sample_document()).unwrap()).unwrap();
    let indexer = ProfileIndexer::new();
    indexer.reload(&path).unwrap();
    let before = indexer.snapshot();

    fs::write(&path, "{ definitely not json").unwrap();
    let err = indexer.reload(&path).unwrap_err();
    assert!(matches!(err, ProfileError::Parse { .. }));

    // Same snapshot, still queryable.
    let after = indexer.snapshot();
    assert!(Arc::ptr_eq(&before, &after));
    assert!(after.instance("dev1").is_some());
}

#[test]
fn missing_file_is_an_io_error() {
    let indexer = ProfileIndexer::new();
    let err = indexer.reload("no/such/deviceProfile.json").unwrap_err();
    assert!(matches!(err, ProfileError::Io { .. }));
    assert!(indexer.snapshot().is_empty());
}

#[test]
fn snapshots_are_isolated_from_later_rebuilds() {
    let indexer = ProfileIndexer::new();
    indexer.rebuild(&sample_document());
    let before = indexer.snapshot();

    indexer.rebuild(&DeviceProfileDocument::default());

    assert!(before.instance("dev1").is_some());
    assert!(indexer.snapshot().is_empty());
}
