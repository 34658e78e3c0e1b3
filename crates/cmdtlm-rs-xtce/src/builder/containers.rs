// crates/cmdtlm-rs-xtce/src/builder/containers.rs

//! Builds sequence containers (telemetry) and meta commands (commands).

use super::types::type_ref;
use crate::model::containers::{
    Argument, ArgumentAssignment, ArgumentAssignmentList, ArgumentList, ArgumentRefEntry,
    ArrayRefEntry, BaseContainer, BaseMetaCommand, CommandContainer, Comparison, ComparisonList,
    Dimension, DimensionList, Entry, EntryList, LocationInContainerInBits, MetaCommand,
    ParameterRefEntry, RestrictionCriteria, SequenceContainer,
};
use crate::model::types::FixedValue;
use cmdtlm_rs::{CmdOrTlm, DataType, Packet, PacketItem};

/// Items that appear in the XTCE output, in offset order.
pub(crate) fn exported_items(packet: &Packet) -> impl Iterator<Item = &PacketItem> {
    packet
        .sorted_items()
        .into_iter()
        .filter(|item| item.data_type != DataType::Derived)
}

/// The abstract `_Base` container holding the entries and the concrete
/// container carrying the identification criteria.
pub(crate) fn sequence_containers(packet: &Packet) -> [SequenceContainer; 2] {
    let base_name = format!("{}_Base", packet.packet_name());
    let comparisons: Vec<Comparison> = packet
        .id_items()
        .into_iter()
        .filter_map(|item| {
            item.id_value.as_ref().map(|value| Comparison {
                parameter_ref: item.name.clone(),
                value: value.to_string(),
            })
        })
        .collect();

    let base = SequenceContainer {
        name: base_name.clone(),
        short_description: None,
        is_abstract: Some("true".into()),
        entry_list: entry_list(packet, CmdOrTlm::Telemetry),
        base_container: None,
    };
    let concrete = SequenceContainer {
        name: packet.packet_name().to_string(),
        short_description: packet.description.clone(),
        is_abstract: None,
        entry_list: EntryList::default(),
        base_container: Some(BaseContainer {
            container_ref: base_name,
            restriction_criteria: (!comparisons.is_empty()).then(|| RestrictionCriteria {
                comparison_list: ComparisonList { comparisons },
            }),
        }),
    };
    [base, concrete]
}

/// The abstract `_Base` command holding the arguments and the concrete
/// command assigning the identifying arguments.
pub(crate) fn meta_commands(packet: &Packet) -> [MetaCommand; 2] {
    let base_name = format!("{}_Base", packet.packet_name());
    let assignments: Vec<ArgumentAssignment> = packet
        .id_items()
        .into_iter()
        .filter_map(|item| {
            item.id_value.as_ref().map(|value| ArgumentAssignment {
                argument_name: item.name.clone(),
                argument_value: value.to_string(),
            })
        })
        .collect();

    let base = MetaCommand {
        name: base_name.clone(),
        short_description: None,
        is_abstract: Some("true".into()),
        base_meta_command: None,
        argument_list: Some(ArgumentList {
            arguments: exported_items(packet)
                .map(|item| Argument {
                    name: item.name.clone(),
                    argument_type_ref: type_ref(item),
                })
                .collect(),
        }),
        command_container: Some(CommandContainer {
            name: format!(
                "{}_{}_CommandContainer",
                packet.target_name(),
                packet.packet_name()
            ),
            entry_list: entry_list(packet, CmdOrTlm::Command),
        }),
    };
    let concrete = MetaCommand {
        name: packet.packet_name().to_string(),
        short_description: packet.description.clone(),
        is_abstract: None,
        base_meta_command: Some(BaseMetaCommand {
            meta_command_ref: base_name,
            argument_assignment_list: (!assignments.is_empty())
                .then(|| ArgumentAssignmentList { assignments }),
        }),
        argument_list: None,
        command_container: None,
    };
    [base, concrete]
}

fn entry_list(packet: &Packet, kind: CmdOrTlm) -> EntryList {
    let packed = packet.is_packed();
    let entries = exported_items(packet)
        .map(|item| {
            let location = (!packed).then(|| location(item));
            match (kind, item.array_size) {
                (CmdOrTlm::Telemetry, None) => Entry::Parameter(ParameterRefEntry {
                    parameter_ref: item.name.clone(),
                    location,
                }),
                (CmdOrTlm::Command, None) => Entry::Argument(ArgumentRefEntry {
                    argument_ref: item.name.clone(),
                    location,
                }),
                (CmdOrTlm::Telemetry, Some(array_size)) => {
                    Entry::ArrayParameter(array_entry(item, array_size, location))
                }
                (CmdOrTlm::Command, Some(array_size)) => {
                    Entry::ArrayArgument(array_entry(item, array_size, location))
                }
            }
        })
        .collect();
    EntryList { entries }
}

fn location(item: &PacketItem) -> LocationInContainerInBits {
    if item.bit_offset >= 0 {
        LocationInContainerInBits {
            reference_location: "containerStart".into(),
            fixed_value: item.bit_offset.to_string(),
        }
    } else {
        LocationInContainerInBits {
            reference_location: "containerEnd".into(),
            fixed_value: (-item.bit_offset).to_string(),
        }
    }
}

fn array_entry(
    item: &PacketItem,
    array_size: i64,
    location: Option<LocationInContainerInBits>,
) -> ArrayRefEntry {
    let last_index = array_size / item.bit_size - 1;
    ArrayRefEntry {
        parameter_ref: item.name.clone(),
        location,
        dimension_list: DimensionList {
            dimension: Dimension {
                starting_index: FixedValue::new(0),
                ending_index: FixedValue::new(last_index),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdtlm_rs::{Endianness, Value};

    fn packed_command() -> Packet {
        let mut packet = Packet::new("INST", "SET", Endianness::BigEndian, Some("Set".into()));
        packet
            .append_item("OPCODE", 8, DataType::Uint, None, None)
            .unwrap()
            .set_id_value(Some(Value::Int(3)))
            .unwrap();
        packet.update_id_items("OPCODE").unwrap();
        packet
            .append_item("VALUES", 16, DataType::Int, Some(64), None)
            .unwrap();
        packet
    }

    #[test]
    fn test_packed_command_has_no_locations() {
        let packet = packed_command();
        let [base, concrete] = meta_commands(&packet);
        assert_eq!(base.name, "SET_Base");
        let container = base.command_container.unwrap();
        assert_eq!(container.name, "INST_SET_CommandContainer");
        assert_eq!(container.entry_list.entries.len(), 2);
        match &container.entry_list.entries[1] {
            Entry::ArrayArgument(entry) => {
                assert!(entry.location.is_none());
                assert_eq!(entry.dimension_list.dimension.ending_index.fixed_value, "3");
            }
            other => panic!("unexpected entry {:?}", other),
        }
        let args = base.argument_list.unwrap().arguments;
        assert_eq!(args[1].argument_type_ref, "VALUES_ArrayType");

        let assignments = concrete
            .base_meta_command
            .unwrap()
            .argument_assignment_list
            .unwrap()
            .assignments;
        assert_eq!(assignments[0].argument_name, "OPCODE");
        assert_eq!(assignments[0].argument_value, "3");
    }

    #[test]
    fn test_gaps_and_negative_offsets_are_located() {
        let mut packet = Packet::new("INST", "HK", Endianness::BigEndian, None);
        packet
            .define_item("A", 8, 8, DataType::Uint, None, None)
            .unwrap();
        packet
            .define_item("CRC", -16, 16, DataType::Uint, None, None)
            .unwrap();
        let [base, concrete] = sequence_containers(&packet);
        let offsets: Vec<(String, String)> = base
            .entry_list
            .entries
            .iter()
            .map(|entry| match entry {
                Entry::Parameter(p) => {
                    let location = p.location.as_ref().unwrap();
                    (location.reference_location.clone(), location.fixed_value.clone())
                }
                other => panic!("unexpected entry {:?}", other),
            })
            .collect();
        assert_eq!(
            offsets,
            vec![
                ("containerStart".to_string(), "8".to_string()),
                ("containerEnd".to_string(), "16".to_string()),
            ]
        );
        let base_container = concrete.base_container.unwrap();
        assert_eq!(base_container.container_ref, "HK_Base");
        assert!(base_container.restriction_criteria.is_none());
    }
}
