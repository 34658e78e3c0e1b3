// crates/cmdtlm-rs/src/parsers/limits_parser.rs

use super::current_item;
use crate::config::{ConfigError, ConfigLine};
use crate::log::record_warning;
use crate::packets::value::{parse_float, parse_int};
use crate::packets::{CmdOrTlm, LimitsValues, Packet, DEFAULT_LIMITS_SET};
use std::collections::BTreeMap;

const USAGE: &str = "LIMITS <LIMITS SET> <PERSISTENCE> <ENABLED/DISABLED> <RED LOW LIMIT> <YELLOW LOW LIMIT> <YELLOW HIGH LIMIT> <RED HIGH LIMIT> <GREEN LOW LIMIT (Optional)> <GREEN HIGH LIMIT (Optional)>";

/// Handles the `LIMITS` keyword.
///
/// Every parameter is validated before the item is touched, so a rejected
/// line leaves the item's limits exactly as they were.
pub struct LimitsParser;

impl LimitsParser {
    /// Adds a limits set to the item and returns the set name.
    pub fn parse(
        line: &ConfigLine,
        packet: &mut Packet,
        item_name: &str,
        cmd_or_tlm: CmdOrTlm,
        warnings: &mut Vec<String>,
    ) -> Result<String, ConfigError> {
        let target_name = packet.target_name().to_string();
        let packet_name = packet.packet_name().to_string();
        let item = current_item(line, packet, item_name)?;
        if item.states.is_some() {
            return Err(line.error("Items with STATE can't define LIMITS", ""));
        }
        if cmd_or_tlm == CmdOrTlm::Command {
            return Err(line.error("LIMITS only applies to telemetry items", ""));
        }
        line.verify_num_parameters(7, Some(9), USAGE)?;

        let params = &line.parameters;
        let limits_set = params[0].to_ascii_uppercase();
        let persistence = parse_int(&params[1])
            .and_then(|p| u32::try_from(p).ok())
            .ok_or_else(|| line.error("Persistence must be an integer.", USAGE))?;
        let enabled = match params[2].to_ascii_uppercase().as_str() {
            "ENABLED" => true,
            "DISABLED" => false,
            _ => {
                return Err(line.error(
                    "Initial LIMITS state must be ENABLED or DISABLED.",
                    USAGE,
                ))
            }
        };
        let values = Self::values(line)?;

        if item.limits.values.is_none() && limits_set != DEFAULT_LIMITS_SET {
            return Err(line.error(
                format!(
                    "DEFAULT limits set must be defined for {} {} {} before setting limits set {}",
                    target_name, packet_name, item.name, limits_set
                ),
                USAGE,
            ));
        }

        if limits_set != DEFAULT_LIMITS_SET {
            let message = |kind: &str| {
                format!(
                    "TELEMETRY Item {} {} {} {} limits {} setting conflict with DEFAULT",
                    target_name, packet_name, item.name, limits_set, kind
                )
            };
            if enabled != item.limits.enabled {
                record_warning(warnings, message("enable"));
            }
            if persistence != item.limits.persistence_setting {
                record_warning(warnings, message("persistence"));
            }
        }

        item.limits
            .values
            .get_or_insert_with(BTreeMap::new)
            .insert(limits_set.clone(), values);
        item.limits.enabled = enabled;
        item.limits.persistence_setting = persistence;
        item.limits.persistence_count = 0;
        packet
            .update_limits_items_cache(item_name)
            .map_err(|err| line.error(err.to_string(), USAGE))?;
        Ok(limits_set)
    }

    fn values(line: &ConfigLine) -> Result<LimitsValues, ConfigError> {
        let params = &line.parameters;
        let number = |index: usize, what: &str| {
            parse_float(&params[index]).ok_or_else(|| {
                line.error(
                    format!("Invalid {} limit value. Limits can be integers or floats.", what),
                    USAGE,
                )
            })
        };
        let red_low = number(3, "red low")?;
        let yellow_low = number(4, "yellow low")?;
        let yellow_high = number(5, "yellow high")?;
        let red_high = number(6, "red high")?;
        if red_low > yellow_low || yellow_low >= yellow_high || yellow_high > red_high {
            return Err(line.error(
                "Invalid limits specified. Ensure yellow limits are within red limits.",
                USAGE,
            ));
        }
        let values = LimitsValues::new(red_low, yellow_low, yellow_high, red_high);

        match params.len() {
            8 => Err(line.error("Must give both a green low and green high value.", USAGE)),
            9 => {
                let green_low = number(7, "green low")?;
                let green_high = number(8, "green high")?;
                if yellow_low > green_low || green_low >= green_high || green_high > yellow_high {
                    return Err(line.error(
                        "Invalid limits specified. Ensure green limits are within yellow limits.",
                        USAGE,
                    ));
                }
                Ok(values.with_green(green_low, green_high))
            }
            _ => Ok(values),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packets::{DataType, Endianness};

    fn packet() -> Packet {
        let mut p = Packet::new("TGT1", "PKT1", Endianness::BigEndian, None);
        p.append_item("ITEM1", 16, DataType::Uint, None, None).unwrap();
        p
    }

    fn limits(p: &mut Packet, params: &[&str]) -> Result<(String, Vec<String>), ConfigError> {
        let mut warnings = Vec::new();
        let set = LimitsParser::parse(
            &ConfigLine::new("LIMITS", params),
            p,
            "ITEM1",
            CmdOrTlm::Telemetry,
            &mut warnings,
        )?;
        Ok((set, warnings))
    }

    #[test]
    fn test_takes_four_and_six_values() {
        let mut p = packet();
        limits(&mut p, &["DEFAULT", "3", "ENABLED", "1", "2", "6", "7"]).unwrap();
        let item = p.get_item("ITEM1").unwrap();
        assert_eq!(item.limits.default_values().unwrap().to_vec(), vec![1.0, 2.0, 6.0, 7.0]);
        assert!(item.limits.enabled);
        assert_eq!(item.limits.persistence_setting, 3);

        limits(&mut p, &["DEFAULT", "3", "ENABLED", "1", "2", "6", "7", "3", "5"]).unwrap();
        let item = p.get_item("ITEM1").unwrap();
        assert_eq!(item.limits.default_values().unwrap().green, Some((3.0, 5.0)));
        assert_eq!(p.limits_items().len(), 1);
    }

    #[test]
    fn test_multiple_sets_and_consistency_warnings() {
        let mut p = packet();
        limits(&mut p, &["DEFAULT", "1", "ENABLED", "1", "2", "6", "7"]).unwrap();
        let (set, warnings) = limits(&mut p, &["tvac", "2", "DISABLED", "0", "1", "7", "8"]).unwrap();
        assert_eq!(set, "TVAC");
        assert_eq!(
            warnings,
            vec![
                "TELEMETRY Item TGT1 PKT1 ITEM1 TVAC limits enable setting conflict with DEFAULT".to_string(),
                "TELEMETRY Item TGT1 PKT1 ITEM1 TVAC limits persistence setting conflict with DEFAULT".to_string(),
            ]
        );
        assert_eq!(p.limits_sets().into_iter().collect::<Vec<_>>(), vec!["DEFAULT", "TVAC"]);
    }

    #[test]
    fn test_default_set_required_first() {
        let mut p = packet();
        let err = limits(&mut p, &["TVAC", "1", "ENABLED", "1", "2", "6", "7"]).unwrap_err();
        assert!(err.message.starts_with("DEFAULT limits set must be defined"));
        assert!(p.get_item("ITEM1").unwrap().limits.values.is_none());
    }

    #[test]
    fn test_rejected_line_leaves_limits_untouched() {
        let mut p = packet();
        limits(&mut p, &["DEFAULT", "1", "ENABLED", "1", "2", "6", "7"]).unwrap();
        let before = p.get_item("ITEM1").unwrap().limits.clone();

        let err = limits(&mut p, &["DEFAULT", "5", "DISABLED", "1", "2", "6", "7", "1", "4"]).unwrap_err();
        assert_eq!(err.message, "Invalid limits specified. Ensure green limits are within yellow limits.");
        let err = limits(&mut p, &["DEFAULT", "5", "DISABLED", "3", "2", "6", "7"]).unwrap_err();
        assert_eq!(err.message, "Invalid limits specified. Ensure yellow limits are within red limits.");
        let err = limits(&mut p, &["DEFAULT", "5", "DISABLED", "1", "2", "6", "7", "3"]).unwrap_err();
        assert_eq!(err.message, "Must give both a green low and green high value.");
        let err = limits(&mut p, &["DEFAULT", "5", "DISABLED", "1", "x", "6", "7"]).unwrap_err();
        assert_eq!(err.message, "Invalid yellow low limit value. Limits can be integers or floats.");

        assert_eq!(p.get_item("ITEM1").unwrap().limits, before);
    }

    #[test]
    fn test_parameter_errors() {
        let mut p = packet();
        let err = limits(&mut p, &["DEFAULT", "a", "ENABLED", "1", "2", "6", "7"]).unwrap_err();
        assert_eq!(err.message, "Persistence must be an integer.");
        let err = limits(&mut p, &["DEFAULT", "1", "ON", "1", "2", "6", "7"]).unwrap_err();
        assert_eq!(err.message, "Initial LIMITS state must be ENABLED or DISABLED.");
        let err = limits(&mut p, &["DEFAULT", "1", "ENABLED", "1", "2"]).unwrap_err();
        assert_eq!(err.message, "Not enough parameters for LIMITS.");

        let mut warnings = Vec::new();
        let err = LimitsParser::parse(
            &ConfigLine::new("LIMITS", &["DEFAULT", "1", "ENABLED", "1", "2", "6", "7"]),
            &mut p,
            "ITEM1",
            CmdOrTlm::Command,
            &mut warnings,
        )
        .unwrap_err();
        assert_eq!(err.message, "LIMITS only applies to telemetry items");
    }
}
