// crates/cmdtlm-rs/src/parsers/limits_response_parser.rs

use super::current_item;
use crate::config::{ConfigError, ConfigLine};
use crate::packets::{CmdOrTlm, Packet};
use crate::registry::Registry;

const USAGE: &str = "LIMITS_RESPONSE <RESPONSE CLASS FILENAME> <RESPONSE SPECIFIC OPTIONS>";

/// Handles the `LIMITS_RESPONSE` keyword.
pub struct LimitsResponseParser;

impl LimitsResponseParser {
    pub fn parse(
        line: &ConfigLine,
        packet: &mut Packet,
        item_name: &str,
        cmd_or_tlm: CmdOrTlm,
        registry: &Registry,
    ) -> Result<(), ConfigError> {
        if cmd_or_tlm == CmdOrTlm::Command {
            return Err(line.error("LIMITS_RESPONSE only applies to telemetry items", ""));
        }
        line.verify_num_parameters(1, None, USAGE)?;

        let params = &line.parameters;
        let response = registry
            .create_limits_response(Some(packet.target_name()), &params[0], &params[1..])
            .map_err(|err| line.error(err, USAGE))?;
        current_item(line, packet, item_name)?.limits.response = Some(response);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packets::{DataType, Endianness};

    fn packet() -> Packet {
        let mut p = Packet::new("INST", "HEALTH", Endianness::BigEndian, None);
        p.append_item("TEMP", 16, DataType::Int, None, None).unwrap();
        p
    }

    #[test]
    fn test_attaches_response() {
        let mut p = packet();
        let line = ConfigLine::new("LIMITS_RESPONSE", &["log_response.rb"]);
        LimitsResponseParser::parse(&line, &mut p, "TEMP", CmdOrTlm::Telemetry, &Registry::new()).unwrap();
        let response = p.get_item("TEMP").unwrap().limits.response.clone().unwrap();
        assert_eq!(response.to_config(), "    LIMITS_RESPONSE LOG_RESPONSE\n");
    }

    #[test]
    fn test_errors() {
        let mut p = packet();
        let line = ConfigLine::new("LIMITS_RESPONSE", &["log_response.rb"]);
        let err = LimitsResponseParser::parse(&line, &mut p, "TEMP", CmdOrTlm::Command, &Registry::new())
            .unwrap_err();
        assert_eq!(err.message, "LIMITS_RESPONSE only applies to telemetry items");

        let line = ConfigLine::new("LIMITS_RESPONSE", &["missing_response.rb"]);
        let err = LimitsResponseParser::parse(&line, &mut p, "TEMP", CmdOrTlm::Telemetry, &Registry::new())
            .unwrap_err();
        assert_eq!(err.message, "MISSING_RESPONSE class not found.");
        assert_eq!(err.usage, USAGE);
    }
}
