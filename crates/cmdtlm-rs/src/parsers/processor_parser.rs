// crates/cmdtlm-rs/src/parsers/processor_parser.rs

use crate::config::{ConfigError, ConfigLine};
use crate::packets::{CmdOrTlm, Packet};
use crate::registry::Registry;

const USAGE: &str = "PROCESSOR <PROCESSOR NAME> <PROCESSOR CLASS FILENAME> <PROCESSOR SPECIFIC OPTIONS>";

/// Handles the `PROCESSOR` keyword.
pub struct ProcessorParser;

impl ProcessorParser {
    pub fn parse(
        line: &ConfigLine,
        packet: &mut Packet,
        cmd_or_tlm: CmdOrTlm,
        registry: &Registry,
    ) -> Result<(), ConfigError> {
        if cmd_or_tlm == CmdOrTlm::Command {
            return Err(line.error("PROCESSOR only applies to telemetry packets", ""));
        }
        line.verify_num_parameters(2, None, USAGE)?;

        let params = &line.parameters;
        let mut processor = registry
            .create_processor(Some(packet.target_name()), &params[1], &params[2..])
            .map_err(|err| line.error(err, USAGE))?;
        let name = params[0].to_ascii_uppercase();
        processor.set_name(&name);
        pkt_debug!(&*packet, "added processor {}", name);
        packet.processors.insert(name, processor);
        Ok(())
    }
}
