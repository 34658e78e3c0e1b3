// crates/cmdtlm-rs-xtce/tests/round_trip.rs

//! Builds packets from configuration text, exports them to XTCE and imports
//! the result again, checking that the item layout survives.

use cmdtlm_rs::{CmdOrTlm, Conversion, DataType, PacketConfig, PacketMaps, Value};
use cmdtlm_rs_xtce::{export_xtce, export_xtce_string, import_xtce_file, import_xtce_str};

const INST_CMD: &str = r#"
COMMAND INST COLLECT BIG_ENDIAN "Starts a collect on the instrument"
  APPEND_ID_PARAMETER OPCODE 16 UINT 0 MAX 4 "Opcode"
  APPEND_PARAMETER TYPE 16 UINT MIN MAX 0 "Collect type"
    STATE NORMAL 0
    STATE SPECIAL 1
  APPEND_PARAMETER DURATION 32 FLOAT 0.0 10.0 1.0 "Collect duration"
  APPEND_PARAMETER TEMP 32 FLOAT 0.0 25.0 0.0 "Collect temperature"
    UNITS Celsius C
  APPEND_PARAMETER OPTION 64 STRING "NONE" "Option string"

COMMAND INST ABORT BIG_ENDIAN "Aborts a collect on the instrument"
  APPEND_ID_PARAMETER OPCODE 16 UINT 0 MAX 2 "Opcode"
"#;

const INST_TLM: &str = r#"
TELEMETRY INST HEALTH_STATUS BIG_ENDIAN "Health and status from the instrument"
  APPEND_ID_ITEM CCSDSAPID 16 UINT 1 "CCSDS application process id"
  APPEND_ITEM TEMP1 16 UINT "Temperature #1"
    POLY_READ_CONVERSION -100.0 0.00305
    UNITS CELSIUS C
    LIMITS DEFAULT 1 ENABLED -80.0 -70.0 60.0 80.0
  APPEND_ITEM COLLECT_TYPE 16 UINT "Most recent collect type"
    STATE NORMAL 0
    STATE SPECIAL 1
  APPEND_ARRAY_ITEM ARY 8 UINT 80 "Array data"

TELEMETRY INST PARAMS LITTLE_ENDIAN "Parameters"
  ID_ITEM CCSDSAPID 0 16 UINT 2 "CCSDS application process id" BIG_ENDIAN
  ITEM VALUE 32 32 FLOAT "A little endian value"
  ITEM CRC -16 16 UINT "Trailing checksum"
"#;

fn load() -> PacketMaps {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut config = PacketConfig::new();
    config.process_str(INST_CMD, "inst_cmds.txt", "INST").unwrap();
    config.process_str(INST_TLM, "inst_tlm.txt", "INST").unwrap();
    config.into_maps()
}

/// Everything about an item that the XTCE round trip preserves.
#[derive(Debug, PartialEq)]
struct Layout {
    name: String,
    bit_offset: i64,
    bit_size: i64,
    data_type: DataType,
    endianness_little: bool,
    array_size: Option<i64>,
    states: Option<Vec<(String, Value)>>,
    units: Option<String>,
    default: Option<Value>,
    range: Option<(Value, Value)>,
    id_value: Option<Value>,
    description: Option<String>,
}

fn layouts(maps: &PacketMaps, kind: CmdOrTlm, packet_name: &str) -> Vec<Layout> {
    let packet = maps.get(kind, "INST", packet_name).unwrap();
    packet
        .sorted_items()
        .into_iter()
        .filter(|item| item.data_type != DataType::Derived)
        .map(|item| Layout {
            name: item.name.clone(),
            bit_offset: item.bit_offset,
            bit_size: item.bit_size,
            data_type: item.data_type,
            endianness_little: item.bit_size > 8
                && !item.data_type.is_string_like()
                && item.endianness == cmdtlm_rs::Endianness::LittleEndian,
            array_size: item.array_size,
            states: item
                .states
                .as_ref()
                .map(|s| s.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
            units: item.units.clone(),
            default: item.default.clone(),
            range: item.range.as_ref().map(|r| (r.min.clone(), r.max.clone())),
            id_value: item.id_value.clone(),
            description: item.description.clone(),
        })
        .collect()
}

fn packet_names(maps: &PacketMaps, kind: CmdOrTlm) -> Vec<String> {
    maps.packets(kind, "INST")
        .iter()
        .map(|p| p.packet_name().to_string())
        .collect()
}

#[test]
fn test_export_then_import_preserves_items() {
    let mut original = load();
    let xml = export_xtce_string(&mut original, "inst").unwrap();

    let mut imported = PacketMaps::new();
    let warnings = import_xtce_str(&xml, &mut imported, None).unwrap();
    assert_eq!(
        warnings,
        vec!["Bit definition overlap at bit offset -16 for packet INST PARAMS items CRC and VALUE"]
    );

    for name in ["COLLECT", "ABORT"] {
        assert_eq!(
            layouts(&imported, CmdOrTlm::Command, name),
            layouts(&original, CmdOrTlm::Command, name),
            "command {}",
            name
        );
    }
    for name in ["HEALTH_STATUS", "PARAMS"] {
        assert_eq!(
            layouts(&imported, CmdOrTlm::Telemetry, name),
            layouts(&original, CmdOrTlm::Telemetry, name),
            "telemetry {}",
            name
        );
    }
}

#[test]
fn test_packet_order_and_descriptions_survive() {
    let mut original = load();
    let xml = export_xtce_string(&mut original, "INST").unwrap();
    // Exporting leaves the caller's order alone
    assert_eq!(packet_names(&original, CmdOrTlm::Command), vec!["COLLECT", "ABORT"]);

    let mut imported = PacketMaps::new();
    import_xtce_str(&xml, &mut imported, None).unwrap();
    assert_eq!(packet_names(&imported, CmdOrTlm::Command), vec!["COLLECT", "ABORT"]);
    assert_eq!(
        packet_names(&imported, CmdOrTlm::Telemetry),
        vec!["HEALTH_STATUS", "PARAMS"]
    );

    let collect = imported.get(CmdOrTlm::Command, "INST", "COLLECT").unwrap();
    assert_eq!(
        collect.description.as_deref(),
        Some("Starts a collect on the instrument")
    );
    assert!(!collect.is_abstract);
    let params = imported.get(CmdOrTlm::Telemetry, "INST", "PARAMS").unwrap();
    assert_eq!(params.description.as_deref(), Some("Parameters"));
    assert_eq!(
        params.get_item("VALUE").unwrap().endianness,
        cmdtlm_rs::Endianness::LittleEndian
    );
    // Mixed item endianness keeps the big endian default
    assert_eq!(params.default_endianness, cmdtlm_rs::Endianness::BigEndian);
}

#[test]
fn test_conversions_limits_and_units_survive() {
    let mut original = load();
    let xml = export_xtce_string(&mut original, "INST").unwrap();
    let mut imported = PacketMaps::new();
    import_xtce_str(&xml, &mut imported, None).unwrap();

    let health = imported
        .get(CmdOrTlm::Telemetry, "INST", "HEALTH_STATUS")
        .unwrap();
    let temp1 = health.get_item("TEMP1").unwrap();
    let poly = temp1
        .read_conversion
        .as_ref()
        .and_then(Conversion::as_polynomial)
        .unwrap();
    assert_eq!(poly.coeffs, vec![-100.0, 0.00305]);
    assert_eq!(temp1.units_full.as_deref(), Some("CELSIUS"));
    let limits = temp1.limits.default_values().unwrap();
    assert_eq!(limits.to_vec(), vec![-80.0, -70.0, 60.0, 80.0]);
    assert_eq!(health.limits_items().len(), 1);

    let collect = imported.get(CmdOrTlm::Command, "INST", "COLLECT").unwrap();
    let temp = collect.get_item("TEMP").unwrap();
    assert_eq!(temp.units_full.as_deref(), Some("Celsius"));
    assert_eq!(temp.units.as_deref(), Some("C"));
}

#[test]
fn test_document_shape() {
    let mut maps = load();
    let xml = export_xtce_string(&mut maps, "INST").unwrap();
    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<xtce:SpaceSystem"));
    assert!(xml.contains("xmlns:xtce=\"http://www.omg.org/space/xtce\""));
    assert!(xml.contains("<xtce:EnumeratedParameterType name=\"COLLECT_TYPE_Type\""));
    assert!(xml.contains("name=\"ARY_ArrayType\""));
    assert!(xml.contains("<xtce:SequenceContainer name=\"HEALTH_STATUS_Base\" abstract=\"true\">"));
    assert!(xml.contains("<xtce:Comparison parameterRef=\"CCSDSAPID\" value=\"1\"/>"));
    assert!(xml.contains("<xtce:ArgumentAssignment argumentName=\"OPCODE\" argumentValue=\"4\"/>"));
    assert!(xml.contains("referenceLocation=\"containerEnd\""));
    assert!(xml.contains("initialValue=\"&quot;NONE&quot;\""));
    // Received time items are never exported
    assert!(!xml.contains("RECEIVED_COUNT"));
}

#[test]
fn test_file_export_skips_unknown_target() {
    let mut maps = load();
    let dir = std::env::temp_dir().join(format!("cmdtlm_xtce_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);

    let written = export_xtce(&mut maps, &dir).unwrap();
    assert_eq!(written, vec![dir.join("INST").join("cmd_tlm").join("inst.xtce")]);

    // A second export replaces the file
    let written_again = export_xtce(&mut maps, &dir).unwrap();
    assert_eq!(written, written_again);

    let mut imported = PacketMaps::new();
    import_xtce_file(&written[0], &mut imported, None).unwrap();
    assert_eq!(
        packet_names(&imported, CmdOrTlm::Telemetry),
        vec!["HEALTH_STATUS", "PARAMS"]
    );
    let _ = std::fs::remove_dir_all(&dir);
}
