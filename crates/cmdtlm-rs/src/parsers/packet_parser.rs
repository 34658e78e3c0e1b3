// crates/cmdtlm-rs/src/parsers/packet_parser.rs

use crate::config::{ConfigError, ConfigLine};
use crate::log::record_warning;
use crate::packets::{CmdOrTlm, Conversion, DataType, Endianness, Packet, PacketMaps};

/// Handles the `COMMAND` and `TELEMETRY` keywords.
pub struct PacketParser;

impl PacketParser {
    /// Creates the packet named by `line`. A target name of `SYSTEM` takes
    /// the target from the line itself.
    pub fn parse(
        line: &ConfigLine,
        target_name: &str,
        maps: &PacketMaps,
        warnings: &mut Vec<String>,
    ) -> Result<(CmdOrTlm, Packet), ConfigError> {
        let usage = format!(
            "{} <TARGET NAME> <PACKET NAME> <ENDIANNESS: BIG_ENDIAN/LITTLE_ENDIAN> <DESCRIPTION (Optional)>",
            line.keyword
        );
        line.verify_num_parameters(3, Some(4), &usage)?;
        let cmd_or_tlm = if line.keyword == "COMMAND" {
            CmdOrTlm::Command
        } else {
            CmdOrTlm::Telemetry
        };

        let params = &line.parameters;
        let target_name = if target_name.eq_ignore_ascii_case("SYSTEM") {
            params[0].to_ascii_uppercase()
        } else {
            target_name.to_ascii_uppercase()
        };
        let packet_name = params[1].to_ascii_uppercase();
        let endianness: Endianness = params[2].parse().map_err(|_| {
            line.error(
                format!(
                    "Invalid endianness {}. Must be BIG_ENDIAN or LITTLE_ENDIAN.",
                    params[2]
                ),
                &usage,
            )
        })?;
        let description = params.get(3).cloned();

        if maps.contains(cmd_or_tlm, &target_name, &packet_name) {
            record_warning(
                warnings,
                format!(
                    "{} Packet {} {} redefined.",
                    cmd_or_tlm.label(),
                    target_name,
                    packet_name
                ),
            );
        }

        let mut packet = Packet::new(&target_name, &packet_name, endianness, description);
        if cmd_or_tlm == CmdOrTlm::Telemetry {
            Self::define_received_items(&mut packet).map_err(|err| line.error(err.to_string(), &usage))?;
        }
        Ok((cmd_or_tlm, packet))
    }

    /// Adds the DERIVED items every telemetry packet carries.
    pub fn define_received_items(packet: &mut Packet) -> Result<(), crate::packets::PacketError> {
        let item = packet.define_item("RECEIVED_TIMESECONDS", 0, 0, DataType::Derived, None, None)?;
        item.set_format_string(Some("%0.6f".to_string()))?;
        item.read_conversion = Some(Conversion::ReceivedTimeSeconds);
        item.description = Some("COSMOS Received Time (UTC, Floating point, Unix epoch)".to_string());

        let item = packet.define_item("RECEIVED_TIMEFORMATTED", 0, 0, DataType::Derived, None, None)?;
        item.read_conversion = Some(Conversion::ReceivedTimeFormatted);
        item.description = Some("COSMOS Received Time (Local time zone, Formatted string)".to_string());

        let item = packet.define_item("RECEIVED_COUNT", 0, 0, DataType::Derived, None, None)?;
        item.read_conversion = Some(Conversion::ReceivedCount);
        item.description = Some("COSMOS packet received count".to_string());
        Ok(())
    }
}
