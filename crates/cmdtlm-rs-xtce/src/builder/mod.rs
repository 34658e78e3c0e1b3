// crates/cmdtlm-rs-xtce/src/builder/mod.rs

//! Serializes the packets of a target into an XTCE document.
//!
//! The packet model is first converted into the internal `model` structs,
//! then written with `quick-xml`'s serde serializer. Items are shared by
//! name across all packets of a target: each name produces exactly one
//! parameter (or argument) and one type, so every occurrence of a name must
//! describe the same item.

mod containers;
mod types;

use crate::error::XtceError;
use crate::model::containers::{ContainerSet, MetaCommandSet, Parameter, ParameterSet};
use crate::model::types::{ArgumentTypeSet, ParameterTypeSet};
use crate::model::{CommandMetaData, SpaceSystem, TelemetryMetaData};
use cmdtlm_rs::parsers::packet_config::UNKNOWN;
use cmdtlm_rs::{CmdOrTlm, DataType, Endianness, Packet, PacketItem, PacketMaps};
use containers::exported_items;
use core::fmt::Write;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Serializes every packet of `target_name` into an XTCE XML string.
///
/// The packet order of the target is reversed while the document is built
/// and restored before returning, so that importing the result yields the
/// packets in their original order.
///
/// # Errors
/// Returns [`XtceError::DivergentItem`] when two packets define the same
/// item name differently, or a serialization error.
pub fn export_xtce_string(maps: &mut PacketMaps, target_name: &str) -> Result<String, XtceError> {
    let target = target_name.to_ascii_uppercase();
    maps.reverse_packet_order(&target);
    let result = build_space_system(maps, &target).and_then(|system| to_xml(&system));
    maps.reverse_packet_order(&target);
    result
}

/// Writes one `<output_dir>/<TARGET>/cmd_tlm/<target>.xtce` file per target
/// and returns the written paths. The `UNKNOWN` target is skipped.
pub fn export_xtce(maps: &mut PacketMaps, output_dir: &Path) -> Result<Vec<PathBuf>, XtceError> {
    let mut written = Vec::new();
    for target in maps.targets() {
        if target == UNKNOWN {
            continue;
        }
        let xml = export_xtce_string(maps, &target)?;
        let dir = output_dir.join(&target).join("cmd_tlm");
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.xtce", target.to_ascii_lowercase()));
        if path.exists() {
            log::debug!("Replacing existing {}", path.display());
            fs::remove_file(&path)?;
        }
        fs::write(&path, xml)?;
        log::info!("Exported target {} to {}", target, path.display());
        written.push(path);
    }
    Ok(written)
}

fn to_xml(system: &SpaceSystem) -> Result<String, XtceError> {
    let mut buffer = String::new();
    write!(&mut buffer, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n")?;

    let mut serializer = quick_xml::se::Serializer::new(&mut buffer);
    serializer.indent(' ', 2);

    system.serialize(serializer)?;
    buffer.push('\n');
    Ok(buffer)
}

fn build_space_system(maps: &PacketMaps, target: &str) -> Result<SpaceSystem, XtceError> {
    let telemetry = maps.packets(CmdOrTlm::Telemetry, target);
    let commands = maps.packets(CmdOrTlm::Command, target);
    log::debug!(
        "Building XTCE for {} ({} telemetry, {} command packets)",
        target,
        telemetry.len(),
        commands.len()
    );

    let mut system = SpaceSystem::new(target);
    system.telemetry_meta_data = build_telemetry(telemetry)?;
    if !commands.is_empty() {
        system.command_meta_data = Some(build_commands(commands)?);
    }
    Ok(system)
}

fn build_telemetry(packets: &[Packet]) -> Result<TelemetryMetaData, XtceError> {
    let items = unique_items(packets)?;

    let mut parameter_type_set = ParameterTypeSet::default();
    let mut parameter_set = ParameterSet::default();
    for item in &items {
        for def in types::type_defs(item)? {
            parameter_type_set.types.push(def.into());
        }
        parameter_set.parameters.push(Parameter {
            name: item.name.clone(),
            parameter_type_ref: types::type_ref(item),
        });
    }

    let container_set = (!packets.is_empty()).then(|| ContainerSet {
        containers: packets
            .iter()
            .flat_map(containers::sequence_containers)
            .collect(),
    });

    Ok(TelemetryMetaData {
        parameter_type_set,
        parameter_set,
        container_set,
    })
}

fn build_commands(packets: &[Packet]) -> Result<CommandMetaData, XtceError> {
    let items = unique_items(packets)?;

    let mut argument_type_set = ArgumentTypeSet::default();
    for item in &items {
        for def in types::type_defs(item)? {
            argument_type_set.types.push(def.into());
        }
    }
    let meta_command_set = MetaCommandSet {
        meta_commands: packets.iter().flat_map(containers::meta_commands).collect(),
    };
    Ok(CommandMetaData {
        argument_type_set,
        meta_command_set,
    })
}

/// Collects the non-DERIVED items of `packets` by name, first occurrence
/// first. Later occurrences must match the first one.
fn unique_items(packets: &[Packet]) -> Result<Vec<&PacketItem>, XtceError> {
    let mut unique: Vec<(&PacketItem, &str)> = Vec::new();
    for packet in packets {
        for item in exported_items(packet) {
            match unique.iter().find(|(seen, _)| seen.name == item.name) {
                Some((seen, first_packet)) => {
                    if !same_definition(seen, item) {
                        return Err(XtceError::DivergentItem {
                            name: item.name.clone(),
                            first: first_packet.to_string(),
                            second: packet.packet_name().to_string(),
                        });
                    }
                }
                None => unique.push((item, packet.packet_name())),
            }
        }
    }
    Ok(unique.into_iter().map(|(item, _)| item).collect())
}

/// Compares everything that ends up in the shared type and parameter.
/// Offsets are per packet. Defaults of identifying items are per packet too.
fn same_definition(a: &PacketItem, b: &PacketItem) -> bool {
    let defaults_match =
        a.id_value.is_some() || b.id_value.is_some() || a.default == b.default;
    a.bit_size == b.bit_size
        && a.data_type == b.data_type
        && a.array_size == b.array_size
        && little_endian(a) == little_endian(b)
        && a.states == b.states
        && a.units == b.units
        && a.units_full == b.units_full
        && a.read_conversion == b.read_conversion
        && a.write_conversion == b.write_conversion
        && a.limits.default_values() == b.limits.default_values()
        && a.range == b.range
        && a.description == b.description
        && defaults_match
}

/// Endianness only matters for multi-byte numeric items.
fn little_endian(item: &PacketItem) -> bool {
    item.endianness == Endianness::LittleEndian
        && item.bit_size > 8
        && item.data_type != DataType::Derived
        && !item.data_type.is_string_like()
}
