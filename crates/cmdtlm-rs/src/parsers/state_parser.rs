// crates/cmdtlm-rs/src/parsers/state_parser.rs

use super::current_item;
use crate::config::{ConfigError, ConfigLine};
use crate::log::record_warning;
use crate::packets::{CmdOrTlm, Packet, StateColor, Value};
use std::collections::BTreeMap;

/// Handles the `STATE` keyword.
pub struct StateParser;

impl StateParser {
    pub fn parse(
        line: &ConfigLine,
        packet: &mut Packet,
        item_name: &str,
        cmd_or_tlm: CmdOrTlm,
        warnings: &mut Vec<String>,
    ) -> Result<(), ConfigError> {
        let usage = match cmd_or_tlm {
            CmdOrTlm::Command => {
                "STATE <STATE NAME> <STATE VALUE> <HAZARDOUS (Optional)> <Hazardous Description (Optional)>"
            }
            CmdOrTlm::Telemetry => {
                "STATE <STATE NAME> <STATE VALUE> <COLOR: GREEN/YELLOW/RED (Optional)>"
            }
        };
        let max = match cmd_or_tlm {
            CmdOrTlm::Command => 4,
            CmdOrTlm::Telemetry => 3,
        };

        let item = current_item(line, packet, item_name)?;
        if item.limits.values.is_some() {
            return Err(line.error("Items with LIMITS can't define STATE", usage));
        }
        if item.units.is_some() {
            return Err(line.error("Items with UNITS can't define STATE", usage));
        }
        line.verify_num_parameters(2, Some(max), usage)?;

        let params = &line.parameters;
        let state_name = params[0].to_ascii_uppercase();
        if item
            .states
            .as_ref()
            .is_some_and(|states| states.contains_key(&state_name))
        {
            record_warning(
                warnings,
                format!(
                    "Duplicate state defined on line {}: {}",
                    line.line_number, line.line
                ),
            );
        }

        let state_value = if item.data_type.is_string_like() {
            Value::Str(params[1].clone())
        } else {
            Value::convert_from_str(&params[1])
        };

        let mut color = None;
        if let Some(third) = line.param(2) {
            match cmd_or_tlm {
                CmdOrTlm::Command => {
                    if !third.eq_ignore_ascii_case("HAZARDOUS") {
                        return Err(line.error(
                            "HAZARDOUS expected as third parameter for this line.",
                            usage,
                        ));
                    }
                    let description = line.param(3).unwrap_or("").to_string();
                    item.hazardous
                        .get_or_insert_with(BTreeMap::new)
                        .insert(state_name.clone(), description);
                }
                CmdOrTlm::Telemetry => {
                    let parsed: StateColor = third.parse().map_err(|_| {
                        line.error(
                            format!(
                                "Invalid state color {}. Must be one of {}.",
                                third,
                                StateColor::ALL.map(|c| c.as_str()).join(" ")
                            ),
                            usage,
                        )
                    })?;
                    color = Some(parsed);
                }
            }
        }

        item.states
            .get_or_insert_with(BTreeMap::new)
            .insert(state_name.clone(), state_value);
        let colors = item.state_colors.get_or_insert_with(BTreeMap::new);
        if let Some(color) = color {
            colors.insert(state_name, color);
            item.limits.enabled = true;
            packet
                .update_limits_items_cache(item_name)
                .map_err(|err| line.error(err.to_string(), usage))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packets::{DataType, Endianness, LimitsValues};

    fn packet() -> Packet {
        let mut p = Packet::new("INST", "PKT", Endianness::BigEndian, None);
        p.append_item("MODE", 8, DataType::Uint, None, None).unwrap();
        p.append_item("NAME", 32, DataType::String, None, None).unwrap();
        p
    }

    fn state(p: &mut Packet, kind: CmdOrTlm, item: &str, params: &[&str]) -> Result<Vec<String>, ConfigError> {
        let mut warnings = Vec::new();
        StateParser::parse(&ConfigLine::new("STATE", params), p, item, kind, &mut warnings)?;
        Ok(warnings)
    }

    #[test]
    fn test_telemetry_states_with_colors() {
        let mut p = packet();
        state(&mut p, CmdOrTlm::Telemetry, "MODE", &["safe", "0", "GREEN"]).unwrap();
        state(&mut p, CmdOrTlm::Telemetry, "MODE", &["ERROR", "0x2", "RED"]).unwrap();
        let item = p.get_item("MODE").unwrap();
        assert_eq!(item.states.as_ref().unwrap()["SAFE"], Value::Int(0));
        assert_eq!(item.states.as_ref().unwrap()["ERROR"], Value::Int(2));
        assert_eq!(item.state_colors.as_ref().unwrap()["ERROR"], StateColor::Red);
        assert!(item.limits.enabled);
        assert_eq!(p.limits_items().len(), 1);
    }

    #[test]
    fn test_string_state_values_stay_literal() {
        let mut p = packet();
        state(&mut p, CmdOrTlm::Telemetry, "NAME", &["ONE", "1"]).unwrap();
        let item = p.get_item("NAME").unwrap();
        assert_eq!(item.states.as_ref().unwrap()["ONE"], Value::Str("1".into()));
        assert!(!item.limits.enabled);
    }

    #[test]
    fn test_hazardous_command_states() {
        let mut p = packet();
        state(&mut p, CmdOrTlm::Command, "MODE", &["BOOM", "1", "HAZARDOUS", "Really bad"]).unwrap();
        state(&mut p, CmdOrTlm::Command, "MODE", &["FIZZ", "2", "HAZARDOUS"]).unwrap();
        let hazardous = p.get_item("MODE").unwrap().hazardous.clone().unwrap();
        assert_eq!(hazardous["BOOM"], "Really bad");
        assert_eq!(hazardous["FIZZ"], "");

        let err = state(&mut p, CmdOrTlm::Command, "MODE", &["X", "3", "DANGER"]).unwrap_err();
        assert_eq!(err.message, "HAZARDOUS expected as third parameter for this line.");
    }

    #[test]
    fn test_rejections_and_duplicates() {
        let mut p = packet();
        let err = state(&mut p, CmdOrTlm::Telemetry, "MODE", &["A", "1", "PURPLE"]).unwrap_err();
        assert_eq!(err.message, "Invalid state color PURPLE. Must be one of GREEN YELLOW RED.");

        state(&mut p, CmdOrTlm::Telemetry, "MODE", &["A", "1"]).unwrap();
        let warnings = state(&mut p, CmdOrTlm::Telemetry, "MODE", &["A", "2"]).unwrap();
        assert_eq!(warnings, vec!["Duplicate state defined on line 0: STATE A 2".to_string()]);

        p.get_item_mut("NAME").unwrap().units = Some("V".into());
        let err = state(&mut p, CmdOrTlm::Telemetry, "NAME", &["A", "1"]).unwrap_err();
        assert_eq!(err.message, "Items with UNITS can't define STATE");

        let item = p.get_item_mut("NAME").unwrap();
        item.units = None;
        item.limits.values = Some(BTreeMap::from([(
            "DEFAULT".to_string(),
            LimitsValues::new(1.0, 2.0, 3.0, 4.0),
        )]));
        let err = state(&mut p, CmdOrTlm::Telemetry, "NAME", &["A", "1"]).unwrap_err();
        assert_eq!(err.message, "Items with LIMITS can't define STATE");
    }
}
