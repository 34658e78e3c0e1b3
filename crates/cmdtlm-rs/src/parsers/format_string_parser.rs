// crates/cmdtlm-rs/src/parsers/format_string_parser.rs

use super::{current_item, model_error};
use crate::config::{ConfigError, ConfigLine};
use crate::format::sprintf;
use crate::packets::{DataType, Packet, Value};

const USAGE: &str = "FORMAT_STRING <PRINTF STYLE STRING>";

/// Handles the `FORMAT_STRING` keyword.
pub struct FormatStringParser;

impl FormatStringParser {
    pub fn parse(line: &ConfigLine, packet: &mut Packet, item_name: &str) -> Result<(), ConfigError> {
        let item = current_item(line, packet, item_name)?;
        if item.states.is_some() {
            return Err(line.error("Items with STATE can't define FORMAT_STRING", ""));
        }
        line.verify_num_parameters(1, Some(1), USAGE)?;

        let format_string = &line.parameters[0];
        // A read conversion can change the type, so only raw values are checked
        if item.read_conversion.is_none() {
            let sample = match item.data_type {
                DataType::Int | DataType::Uint => Some(Value::Int(0)),
                DataType::Float => Some(Value::Float(0.0)),
                DataType::String | DataType::Block => Some(Value::Str("Hello".to_string())),
                DataType::Derived => None,
            };
            if let Some(sample) = sample {
                sprintf(format_string, &[sample]).map_err(|_| {
                    line.error(
                        format!(
                            "Invalid FORMAT_STRING specified for type {}: {}",
                            item.data_type, format_string
                        ),
                        USAGE,
                    )
                })?;
            }
        }
        item.set_format_string(Some(format_string.clone()))
            .map_err(model_error(line, USAGE))
    }
}
