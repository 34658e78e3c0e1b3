// crates/cmdtlm-rs/src/parsers/packet_config.rs

use super::{
    FormatStringParser, LimitsParser, LimitsResponseParser, MacroParser, PacketItemParser,
    PacketParser, ProcessorParser, StateParser, model_error,
};
use crate::config::{ConfigError, ConfigLine};
use crate::log::record_warning;
use crate::packets::value::{handle_defined_constants, parse_float};
use crate::packets::{
    CmdOrTlm, Conversion, DEFAULT_LIMITS_SET, DataType, Endianness, ItemRange, Overflow, Packet,
    PacketMaps, PolynomialConversion, Value,
};
use crate::registry::Registry;
use std::collections::BTreeMap;

/// Keywords that need a current packet.
const PACKET_KEYWORDS: &[&str] = &[
    "SELECT_ITEM",
    "SELECT_PARAMETER",
    "ITEM",
    "PARAMETER",
    "ID_ITEM",
    "ID_PARAMETER",
    "ARRAY_ITEM",
    "ARRAY_PARAMETER",
    "APPEND_ITEM",
    "APPEND_PARAMETER",
    "APPEND_ID_ITEM",
    "APPEND_ID_PARAMETER",
    "APPEND_ARRAY_ITEM",
    "APPEND_ARRAY_PARAMETER",
    "MACRO_APPEND_START",
    "MACRO_APPEND_END",
    "HAZARDOUS",
    "PROCESSOR",
    "META",
];

/// Keywords that need a current item.
const ITEM_KEYWORDS: &[&str] = &[
    "STATE",
    "POLY_READ_CONVERSION",
    "POLY_WRITE_CONVERSION",
    "REQUIRED",
    "LIMITS",
    "LIMITS_RESPONSE",
    "UNITS",
    "FORMAT_STRING",
    "DESCRIPTION",
    "MINIMUM_VALUE",
    "MAXIMUM_VALUE",
    "DEFAULT_VALUE",
    "OVERFLOW",
];

/// Target and packet name given to the catch-all packets.
pub const UNKNOWN: &str = "UNKNOWN";

/// The packet keywords currently apply to.
#[derive(Debug, Default)]
enum CurrentPacket {
    #[default]
    None,
    /// Created by `COMMAND`/`TELEMETRY`, stored when finished.
    Building(Box<Packet>),
    /// Re-opened by `SELECT_COMMAND`/`SELECT_TELEMETRY`, edited in place.
    Selected {
        kind: CmdOrTlm,
        target_name: String,
        packet_name: String,
    },
}

/// How to take back one change to the packet maps.
#[derive(Debug)]
enum Undo {
    /// The packet did not exist before.
    Remove {
        kind: CmdOrTlm,
        target_name: String,
        packet_name: String,
    },
    /// The packet as it was before being replaced or selected.
    Restore { kind: CmdOrTlm, packet: Packet },
}

/// Session state that a failed `process_str`/`process_lines` call puts back.
#[derive(Debug)]
struct Checkpoint {
    limits_sets: Vec<String>,
    limits_groups: BTreeMap<String, Vec<(String, String, String)>>,
    latest_data: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    current_limits_group: Option<String>,
}

fn packet_mut<'a>(current: &'a mut CurrentPacket, maps: &'a mut PacketMaps) -> Option<&'a mut Packet> {
    match current {
        CurrentPacket::None => None,
        CurrentPacket::Building(packet) => Some(packet),
        CurrentPacket::Selected {
            kind,
            target_name,
            packet_name,
        } => maps.get_mut(*kind, target_name, packet_name),
    }
}

/// A configuration session: feeds tokenized lines to the keyword parsers and
/// collects the resulting packets.
///
/// ```
/// use cmdtlm_rs::{CmdOrTlm, PacketConfig};
///
/// let mut config = PacketConfig::new();
/// config
///     .process_str(
///         "COMMAND INST NOOP BIG_ENDIAN \"No operation\"\n  APPEND_ID_PARAMETER OPCODE 8 UINT 0 255 1 \"Opcode\"\n",
///         "cmd.txt",
///         "SYSTEM",
///     )
///     .unwrap();
/// let packet = config.maps().get(CmdOrTlm::Command, "INST", "NOOP").unwrap();
/// assert_eq!(packet.id_items().len(), 1);
/// ```
#[derive(Debug)]
pub struct PacketConfig {
    maps: PacketMaps,
    warnings: Vec<String>,
    limits_sets: Vec<String>,
    limits_groups: BTreeMap<String, Vec<(String, String, String)>>,
    /// Target to item name to the telemetry packets containing it.
    latest_data: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    registry: Registry,

    cmd_or_tlm: CmdOrTlm,
    current: CurrentPacket,
    current_item: Option<String>,
    current_limits_group: Option<String>,
    macro_parser: MacroParser,
    /// Changes made by the text being processed, oldest first.
    journal: Vec<Undo>,
}

impl Default for PacketConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketConfig {
    pub fn new() -> Self {
        Self::with_registry(Registry::new())
    }

    /// Creates a session resolving `LIMITS_RESPONSE` and `PROCESSOR` classes in `registry`.
    pub fn with_registry(registry: Registry) -> Self {
        let mut maps = PacketMaps::new();
        maps.upsert(
            CmdOrTlm::Command,
            Packet::new(UNKNOWN, UNKNOWN, Endianness::BigEndian, None),
        );
        maps.upsert(
            CmdOrTlm::Telemetry,
            Packet::new(UNKNOWN, UNKNOWN, Endianness::BigEndian, None),
        );
        Self {
            maps,
            warnings: Vec::new(),
            limits_sets: vec![DEFAULT_LIMITS_SET.to_string()],
            limits_groups: BTreeMap::new(),
            latest_data: BTreeMap::new(),
            registry,
            cmd_or_tlm: CmdOrTlm::Telemetry,
            current: CurrentPacket::None,
            current_item: None,
            current_limits_group: None,
            macro_parser: MacroParser::new(),
            journal: Vec::new(),
        }
    }

    pub fn maps(&self) -> &PacketMaps {
        &self.maps
    }

    pub fn maps_mut(&mut self) -> &mut PacketMaps {
        &mut self.maps
    }

    pub fn into_maps(self) -> PacketMaps {
        self.maps
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Every limits set named so far. Always contains DEFAULT.
    pub fn limits_sets(&self) -> &[String] {
        &self.limits_sets
    }

    pub fn limits_groups(&self) -> &BTreeMap<String, Vec<(String, String, String)>> {
        &self.limits_groups
    }

    pub fn latest_data(&self) -> &BTreeMap<String, BTreeMap<String, Vec<String>>> {
        &self.latest_data
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Tokenizes and processes `text`, then finishes the last packet.
    ///
    /// On error every packet defined or edited by `text` is put back the way
    /// it was before the call.
    pub fn process_str(&mut self, text: &str, filename: &str, target_name: &str) -> Result<(), ConfigError> {
        let lines = text
            .lines()
            .enumerate()
            .filter_map(|(index, raw)| ConfigLine::tokenize(raw, filename, index + 1));
        self.process_lines(lines, target_name)
    }

    /// Processes already tokenized lines, then finishes the last packet.
    ///
    /// The lines are applied as a whole: on error the packet maps, limits
    /// sets, limits groups and latest data are restored and no packet is
    /// left open. Warnings already recorded are kept.
    pub fn process_lines<I>(&mut self, lines: I, target_name: &str) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = ConfigLine>,
    {
        // A packet left open by process_line belongs to the previous text
        self.finish()?;
        self.journal.clear();
        let checkpoint = Checkpoint {
            limits_sets: self.limits_sets.clone(),
            limits_groups: self.limits_groups.clone(),
            latest_data: self.latest_data.clone(),
            current_limits_group: self.current_limits_group.clone(),
        };

        let result = lines
            .into_iter()
            .try_for_each(|line| self.process_line(&line, target_name))
            .and_then(|()| self.finish());
        match result {
            Ok(()) => {
                self.journal.clear();
                Ok(())
            }
            Err(err) => {
                self.rollback(checkpoint);
                Err(err)
            }
        }
    }

    fn rollback(&mut self, checkpoint: Checkpoint) {
        self.current = CurrentPacket::None;
        self.current_item = None;
        self.macro_parser = MacroParser::new();
        let undone = self.journal.len();
        while let Some(undo) = self.journal.pop() {
            match undo {
                Undo::Remove {
                    kind,
                    target_name,
                    packet_name,
                } => {
                    self.maps.remove(kind, &target_name, &packet_name);
                }
                Undo::Restore { kind, packet } => {
                    self.maps.upsert(kind, packet);
                }
            }
        }
        self.limits_sets = checkpoint.limits_sets;
        self.limits_groups = checkpoint.limits_groups;
        self.latest_data = checkpoint.latest_data;
        self.current_limits_group = checkpoint.current_limits_group;
        ::log::debug!("discarded {} packet change(s) after a configuration error", undone);
    }

    /// Stores the packet being built, if any.
    pub fn finish(&mut self) -> Result<(), ConfigError> {
        self.finish_packet(&ConfigLine::default())
    }

    /// Applies one configuration line. A target name of `SYSTEM` takes the
    /// target from each packet line.
    pub fn process_line(&mut self, line: &ConfigLine, target_name: &str) -> Result<(), ConfigError> {
        let keyword = line.keyword.as_str();
        match keyword {
            "COMMAND" | "TELEMETRY" => self.process_packet(line, target_name),
            "SELECT_COMMAND" | "SELECT_TELEMETRY" => self.select_packet(line, target_name),
            "LIMITS_GROUP" => {
                line.verify_num_parameters(1, Some(1), "LIMITS_GROUP <GROUP NAME>")?;
                let group = line.parameters[0].to_ascii_uppercase();
                self.limits_groups.entry(group.clone()).or_default();
                self.current_limits_group = Some(group);
                Ok(())
            }
            "LIMITS_GROUP_ITEM" => {
                line.verify_num_parameters(
                    3,
                    Some(3),
                    "LIMITS_GROUP_ITEM <TARGET NAME> <PACKET NAME> <ITEM NAME>",
                )?;
                if let Some(group) = &self.current_limits_group {
                    let p = &line.parameters;
                    self.limits_groups.entry(group.clone()).or_default().push((
                        p[0].to_ascii_uppercase(),
                        p[1].to_ascii_uppercase(),
                        p[2].to_ascii_uppercase(),
                    ));
                }
                Ok(())
            }
            k if PACKET_KEYWORDS.contains(&k) => {
                if matches!(self.current, CurrentPacket::None) {
                    return Err(line.error(format!("No current packet for {}", keyword), ""));
                }
                self.process_current_packet(line)
            }
            k if ITEM_KEYWORDS.contains(&k) => {
                if self.current_item.is_none() {
                    return Err(line.error(format!("No current item for {}", keyword), ""));
                }
                self.process_current_item(line)
            }
            _ => Err(line.error(format!("Unknown keyword '{}'", keyword), "")),
        }
    }

    fn current_packet(&mut self, line: &ConfigLine) -> Result<&mut Packet, ConfigError> {
        packet_mut(&mut self.current, &mut self.maps)
            .ok_or_else(|| line.error(format!("No current packet for {}", line.keyword), ""))
    }

    fn process_packet(&mut self, line: &ConfigLine, target_name: &str) -> Result<(), ConfigError> {
        self.finish_packet(line)?;
        let (kind, packet) = PacketParser::parse(line, target_name, &self.maps, &mut self.warnings)?;
        if kind == CmdOrTlm::Telemetry {
            self.latest_data
                .entry(packet.target_name().to_string())
                .or_default();
        }
        self.cmd_or_tlm = kind;
        self.current = CurrentPacket::Building(Box::new(packet));
        Ok(())
    }

    fn select_packet(&mut self, line: &ConfigLine, target_name: &str) -> Result<(), ConfigError> {
        let usage = format!("{} <TARGET NAME> <PACKET NAME>", line.keyword);
        self.finish_packet(line)?;
        line.verify_num_parameters(2, Some(2), &usage)?;

        let target_name = if target_name.eq_ignore_ascii_case("SYSTEM") {
            line.parameters[0].to_ascii_uppercase()
        } else {
            target_name.to_ascii_uppercase()
        };
        let packet_name = line.parameters[1].to_ascii_uppercase();
        let kind = if line.keyword.contains("COMMAND") {
            CmdOrTlm::Command
        } else {
            CmdOrTlm::Telemetry
        };
        self.cmd_or_tlm = kind;
        let Some(packet) = self.maps.get(kind, &target_name, &packet_name) else {
            return Err(line.error("Packet not found", &usage));
        };
        self.journal.push(Undo::Restore {
            kind,
            packet: packet.clone(),
        });
        self.current = CurrentPacket::Selected {
            kind,
            target_name,
            packet_name,
        };
        Ok(())
    }

    fn process_current_packet(&mut self, line: &ConfigLine) -> Result<(), ConfigError> {
        let keyword = line.keyword.as_str();
        let kind = self.cmd_or_tlm;
        match keyword {
            "SELECT_ITEM" | "SELECT_PARAMETER" => {
                if kind == CmdOrTlm::Command && keyword == "SELECT_ITEM" {
                    return Err(line.error("SELECT_ITEM only applies to telemetry packets", ""));
                }
                if kind == CmdOrTlm::Telemetry && keyword == "SELECT_PARAMETER" {
                    return Err(line.error("SELECT_PARAMETER only applies to command packets", ""));
                }
                let usage = match keyword {
                    "SELECT_ITEM" => "SELECT_ITEM <ITEM NAME>",
                    _ => "SELECT_PARAMETER <PARAMETER NAME>",
                };
                self.finish_item();
                line.verify_num_parameters(1, Some(1), usage)?;
                let packet = self.current_packet(line)?;
                let name = match packet.get_item(&line.parameters[0]) {
                    Ok(item) => item.name.clone(),
                    Err(_) => {
                        return Err(line.error(
                            format!(
                                "{} not found in {} packet {} {}",
                                line.parameters[0],
                                kind.label().to_ascii_lowercase(),
                                packet.target_name(),
                                packet.packet_name()
                            ),
                            usage,
                        ));
                    }
                };
                self.current_item = Some(name);
            }
            "MACRO_APPEND_START" => self.macro_parser.start(line)?,
            "MACRO_APPEND_END" => {
                self.finish_item();
                let packet = packet_mut(&mut self.current, &mut self.maps)
                    .ok_or_else(|| line.error("No current packet for MACRO_APPEND_END", ""))?;
                self.macro_parser.end(line, packet)?;
            }
            "HAZARDOUS" => {
                line.verify_num_parameters(0, Some(1), "HAZARDOUS <HAZARDOUS DESCRIPTION (Optional)>")?;
                let packet = self.current_packet(line)?;
                packet.hazardous = true;
                if let Some(description) = line.param(0) {
                    packet.hazardous_description = Some(description.to_string());
                }
            }
            "PROCESSOR" => {
                let packet = packet_mut(&mut self.current, &mut self.maps)
                    .ok_or_else(|| line.error("No current packet for PROCESSOR", ""))?;
                ProcessorParser::parse(line, packet, kind, &self.registry)?;
            }
            "META" => {
                line.verify_num_parameters(1, None, "META <META NAME> <META VALUES (optional)>")?;
                let name = line.parameters[0].to_ascii_uppercase();
                let values = line.parameters[1..].to_vec();
                let item_name = self.current_item.clone();
                let packet = self.current_packet(line)?;
                match item_name {
                    Some(item_name) => {
                        super::current_item(line, packet, &item_name)?
                            .meta
                            .insert(name, values);
                    }
                    None => {
                        packet.meta.insert(name, values);
                    }
                }
            }
            // Item definition keywords
            _ => {
                self.finish_item();
                let packet = packet_mut(&mut self.current, &mut self.maps)
                    .ok_or_else(|| line.error(format!("No current packet for {}", keyword), ""))?;
                let name = PacketItemParser::parse(line, packet, kind, &mut self.warnings)?;
                self.macro_parser.new_item(keyword, &name);
                self.current_item = Some(name);
            }
        }
        Ok(())
    }

    fn process_current_item(&mut self, line: &ConfigLine) -> Result<(), ConfigError> {
        let keyword = line.keyword.as_str();
        let kind = self.cmd_or_tlm;
        let item_name = self
            .current_item
            .clone()
            .ok_or_else(|| line.error(format!("No current item for {}", keyword), ""))?;
        let packet = packet_mut(&mut self.current, &mut self.maps)
            .ok_or_else(|| line.error(format!("No current packet for {}", keyword), ""))?;

        match keyword {
            "STATE" => StateParser::parse(line, packet, &item_name, kind, &mut self.warnings)?,
            "LIMITS" => {
                let set = LimitsParser::parse(line, packet, &item_name, kind, &mut self.warnings)?;
                if !self.limits_sets.contains(&set) {
                    self.limits_sets.push(set);
                }
            }
            "LIMITS_RESPONSE" => {
                LimitsResponseParser::parse(line, packet, &item_name, kind, &self.registry)?
            }
            "FORMAT_STRING" => FormatStringParser::parse(line, packet, &item_name)?,
            "POLY_READ_CONVERSION" | "POLY_WRITE_CONVERSION" => {
                let usage = format!("{} <C0> <C1> <C2> ...", keyword);
                line.verify_num_parameters(1, None, &usage)?;
                let coeffs = line
                    .parameters
                    .iter()
                    .map(|p| {
                        parse_float(p).ok_or_else(|| {
                            line.error(
                                format!("Invalid coefficient {}. Coefficients can be integers or floats.", p),
                                &usage,
                            )
                        })
                    })
                    .collect::<Result<Vec<f64>, ConfigError>>()?;
                let conversion = Some(Conversion::Polynomial(PolynomialConversion::new(coeffs)));
                let item = super::current_item(line, packet, &item_name)?;
                if keyword.contains("READ") {
                    item.read_conversion = conversion;
                } else {
                    item.write_conversion = conversion;
                }
            }
            "UNITS" => {
                line.verify_num_parameters(
                    2,
                    Some(2),
                    "UNITS <FULL UNITS NAME> <ABBREVIATED UNITS NAME>",
                )?;
                let item = super::current_item(line, packet, &item_name)?;
                item.units_full = Some(line.parameters[0].clone());
                item.units = Some(line.parameters[1].clone());
            }
            "DESCRIPTION" => {
                line.verify_num_parameters(1, Some(1), "DESCRIPTION <DESCRIPTION>")?;
                super::current_item(line, packet, &item_name)?.description =
                    Some(line.parameters[0].clone());
            }
            "REQUIRED" => {
                line.verify_num_parameters(0, Some(0), "REQUIRED")?;
                if kind != CmdOrTlm::Command {
                    return Err(line.error("REQUIRED only applies to command parameters", ""));
                }
                super::current_item(line, packet, &item_name)?.required = true;
            }
            "MINIMUM_VALUE" | "MAXIMUM_VALUE" | "DEFAULT_VALUE" => {
                if kind == CmdOrTlm::Telemetry {
                    return Err(line.error(
                        format!("{} only applies to command parameters", keyword),
                        "",
                    ));
                }
                let usage = match keyword {
                    "MINIMUM_VALUE" => "MINIMUM_VALUE <MINIMUM VALUE>",
                    "MAXIMUM_VALUE" => "MAXIMUM_VALUE <MAXIMUM VALUE>",
                    _ => "DEFAULT_VALUE <DEFAULT VALUE>",
                };
                line.verify_num_parameters(1, Some(1), usage)?;
                let item = super::current_item(line, packet, &item_name)?;
                let token = &line.parameters[0];
                if keyword == "DEFAULT_VALUE" && item.data_type.is_string_like() {
                    item.default = Some(Value::Str(token.clone()));
                    return Ok(());
                }
                let value = handle_defined_constants(
                    Value::convert_from_str(token),
                    Some(item.data_type),
                    Some(item.bit_size),
                )
                .map_err(model_error(line, usage))?;
                if keyword == "DEFAULT_VALUE" {
                    item.default = Some(value);
                    return Ok(());
                }
                let range = match (&item.range, item.data_type) {
                    (Some(range), _) => range.clone(),
                    (None, DataType::Int | DataType::Uint) => {
                        ItemRange::for_integer(item.data_type, item.bit_size)
                            .map_err(model_error(line, usage))?
                    }
                    (None, DataType::Float) => ItemRange::for_float(item.bit_size),
                    (None, _) => {
                        return Err(line.error(
                            format!("{} only applies to numeric parameters", keyword),
                            usage,
                        ));
                    }
                };
                item.range = Some(if keyword == "MINIMUM_VALUE" {
                    ItemRange::new(value, range.max)
                } else {
                    ItemRange::new(range.min, value)
                });
            }
            "OVERFLOW" => {
                let usage = "OVERFLOW <OVERFLOW VALUE - ERROR, ERROR_ALLOW_HEX, TRUNCATE, or SATURATE>";
                line.verify_num_parameters(1, Some(1), usage)?;
                let overflow: Overflow = line.parameters[0].parse().map_err(model_error(line, usage))?;
                super::current_item(line, packet, &item_name)?.overflow = overflow;
            }
            _ => return Err(line.error(format!("Unknown keyword '{}'", keyword), "")),
        }
        Ok(())
    }

    fn finish_item(&mut self) {
        let Some(item_name) = self.current_item.take() else {
            return;
        };
        if self.cmd_or_tlm != CmdOrTlm::Telemetry {
            return;
        }
        if let Some(packet) = packet_mut(&mut self.current, &mut self.maps) {
            let packets = self
                .latest_data
                .entry(packet.target_name().to_string())
                .or_default()
                .entry(item_name)
                .or_default();
            if !packets.iter().any(|p| p == packet.packet_name()) {
                packets.push(packet.packet_name().to_string());
            }
        }
    }

    fn finish_packet(&mut self, line: &ConfigLine) -> Result<(), ConfigError> {
        self.finish_item();
        let kind = self.cmd_or_tlm;
        match std::mem::take(&mut self.current) {
            CurrentPacket::None => {}
            CurrentPacket::Building(mut packet) => {
                finalize_packet(line, &mut packet, kind, &mut self.warnings)?;
                let target_name = packet.target_name().to_string();
                let packet_name = packet.packet_name().to_string();
                let undo = match self.maps.upsert(kind, *packet) {
                    Some(previous) => Undo::Restore {
                        kind,
                        packet: previous,
                    },
                    None => Undo::Remove {
                        kind,
                        target_name,
                        packet_name,
                    },
                };
                self.journal.push(undo);
            }
            CurrentPacket::Selected {
                kind,
                target_name,
                packet_name,
            } => {
                if let Some(packet) = self.maps.get_mut(kind, &target_name, &packet_name) {
                    finalize_packet(line, packet, kind, &mut self.warnings)?;
                }
            }
        }
        Ok(())
    }
}

/// Overlap warnings, then command default/range type checks.
fn finalize_packet(
    line: &ConfigLine,
    packet: &mut Packet,
    kind: CmdOrTlm,
    warnings: &mut Vec<String>,
) -> Result<(), ConfigError> {
    for warning in packet.check_bit_offsets() {
        record_warning(warnings, warning);
    }
    if kind == CmdOrTlm::Command {
        packet
            .check_item_data_types()
            .map_err(model_error(line, ""))?;
    }
    pkt_debug!(
        &*packet,
        "finished {} packet with {} item(s)",
        kind.label(),
        packet.items().len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packets::StateColor;

    fn process(text: &str) -> Result<PacketConfig, ConfigError> {
        let mut config = PacketConfig::new();
        config.process_str(text, "test.txt", "SYSTEM")?;
        Ok(config)
    }

    #[test]
    fn test_unknown_packets_exist() {
        let config = PacketConfig::new();
        assert!(config.maps().contains(CmdOrTlm::Command, UNKNOWN, UNKNOWN));
        assert!(config.maps().contains(CmdOrTlm::Telemetry, UNKNOWN, UNKNOWN));
        assert_eq!(config.limits_sets(), ["DEFAULT".to_string()]);
    }

    #[test]
    fn test_keyword_errors() {
        let err = process("BOGUS 1 2").unwrap_err();
        assert_eq!(err.message, "Unknown keyword 'BOGUS'");
        assert_eq!(err.line_number, 1);

        let err = process("APPEND_ITEM A 8 UINT").unwrap_err();
        assert_eq!(err.message, "No current packet for APPEND_ITEM");

        let err = process("TELEMETRY TGT PKT BIG_ENDIAN\n  UNITS Volts V").unwrap_err();
        assert_eq!(err.message, "No current item for UNITS");
    }

    #[test]
    fn test_telemetry_item_keywords() {
        let config = process(
            "TELEMETRY tgt pkt LITTLE_ENDIAN \"Health\"\n\
             APPEND_ITEM VOLTS 16 UINT \"Bus voltage\"\n\
             POLY_READ_CONVERSION 0.0 0.5\n\
             UNITS Volts V\n\
             FORMAT_STRING \"%0.2f\"\n\
             LIMITS DEFAULT 1 ENABLED 0 5 25 30\n\
             META SENSOR bus a\n\
             APPEND_ITEM MODE 8 UINT\n\
             STATE OFF 0 RED\n\
             STATE ON 1 GREEN\n",
        )
        .unwrap();
        let packet = config.maps().get(CmdOrTlm::Telemetry, "TGT", "PKT").unwrap();
        let volts = packet.get_item("VOLTS").unwrap();
        assert_eq!(volts.units.as_deref(), Some("V"));
        assert_eq!(volts.format_string.as_deref(), Some("%0.2f"));
        assert!(volts.limits.enabled);
        assert_eq!(volts.meta["SENSOR"], vec!["bus".to_string(), "a".to_string()]);
        let mode = packet.get_item("MODE").unwrap();
        assert_eq!(mode.state_colors.as_ref().unwrap()["OFF"], StateColor::Red);
        assert_eq!(packet.limits_items().len(), 2);
        assert_eq!(config.latest_data()["TGT"]["VOLTS"], vec!["PKT".to_string()]);
        assert!(config.warnings().is_empty());
    }

    #[test]
    fn test_command_keywords() {
        let config = process(
            "COMMAND TGT CMD BIG_ENDIAN\n\
             HAZARDOUS \"Fires thrusters\"\n\
             APPEND_PARAMETER DURATION 32 FLOAT 0 10 1\n\
             MAXIMUM_VALUE 20\n\
             REQUIRED\n\
             OVERFLOW saturate\n\
             APPEND_PARAMETER LABEL 64 STRING \"x\"\n\
             DEFAULT_VALUE abc\n",
        )
        .unwrap();
        let packet = config.maps().get(CmdOrTlm::Command, "TGT", "CMD").unwrap();
        assert!(packet.hazardous);
        assert_eq!(packet.hazardous_description.as_deref(), Some("Fires thrusters"));
        let duration = packet.get_item("DURATION").unwrap();
        assert_eq!(duration.range, Some(ItemRange::new(Value::Float(0.0), Value::Float(20.0))));
        assert_eq!(duration.default, Some(Value::Float(1.0)));
        assert!(duration.required);
        assert_eq!(duration.overflow, Overflow::Saturate);
        assert_eq!(packet.get_item("LABEL").unwrap().default, Some(Value::Str("abc".into())));
    }

    #[test]
    fn test_mode_restricted_keywords() {
        let err = process("TELEMETRY TGT PKT BIG_ENDIAN\n APPEND_ITEM A 8 UINT\n REQUIRED").unwrap_err();
        assert_eq!(err.message, "REQUIRED only applies to command parameters");
        let err = process("TELEMETRY TGT PKT BIG_ENDIAN\n APPEND_ITEM A 8 UINT\n DEFAULT_VALUE 1").unwrap_err();
        assert_eq!(err.message, "DEFAULT_VALUE only applies to command parameters");
        let err = process("COMMAND TGT CMD BIG_ENDIAN\n SELECT_ITEM A").unwrap_err();
        assert_eq!(err.message, "SELECT_ITEM only applies to telemetry packets");
    }

    #[test]
    fn test_select_packet_and_item() {
        let mut config = process("TELEMETRY TGT PKT BIG_ENDIAN\n APPEND_ITEM A 8 UINT\n").unwrap();
        config
            .process_str("SELECT_TELEMETRY TGT PKT\n SELECT_ITEM A\n  DESCRIPTION \"Updated\"\n", "more.txt", "SYSTEM")
            .unwrap();
        let packet = config.maps().get(CmdOrTlm::Telemetry, "TGT", "PKT").unwrap();
        assert_eq!(packet.get_item("A").unwrap().description.as_deref(), Some("Updated"));

        let err = config.process_str("SELECT_TELEMETRY TGT NOPE\n", "more.txt", "SYSTEM").unwrap_err();
        assert_eq!(err.message, "Packet not found");
        let err = config
            .process_str("SELECT_TELEMETRY TGT PKT\n SELECT_ITEM B\n", "more.txt", "SYSTEM")
            .unwrap_err();
        assert_eq!(err.message, "B not found in telemetry packet TGT PKT");
    }

    #[test]
    fn test_limits_groups_and_sets() {
        let config = process(
            "TELEMETRY TGT PKT BIG_ENDIAN\n\
             APPEND_ITEM A 8 UINT\n\
             LIMITS DEFAULT 1 ENABLED 0 1 5 6\n\
             LIMITS TVAC 1 ENABLED 0 1 5 6\n\
             LIMITS_GROUP first\n\
             LIMITS_GROUP_ITEM tgt pkt a\n",
        )
        .unwrap();
        assert_eq!(config.limits_sets(), ["DEFAULT".to_string(), "TVAC".to_string()]);
        assert_eq!(
            config.limits_groups()["FIRST"],
            vec![("TGT".to_string(), "PKT".to_string(), "A".to_string())]
        );
    }

    #[test]
    fn test_overlap_warning_on_finish() {
        let config = process(
            "TELEMETRY TGT PKT BIG_ENDIAN\n  ITEM A 0 16 UINT\n  ITEM B 8 8 UINT\n",
        )
        .unwrap();
        assert_eq!(
            config.warnings(),
            ["Bit definition overlap at bit offset 8 for packet TGT PKT items B and A".to_string()]
        );
    }
}
