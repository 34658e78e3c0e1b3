// crates/cmdtlm-rs/src/parsers/packet_item_parser.rs

use super::model_error;
use crate::config::{ConfigError, ConfigLine};
use crate::log::record_warning;
use crate::packets::value::{handle_defined_constants, hex_to_bytes, parse_int};
use crate::packets::{CmdOrTlm, DataType, Endianness, ItemRange, Packet, PacketItem, Value};

/// Arrays with at least this many elements draw a performance warning.
pub const BIG_ARRAY_SIZE: i64 = 100_000;

/// Handles `ITEM`, `PARAMETER` and their `ID_`, `ARRAY_` and `APPEND_` variants.
pub struct PacketItemParser<'a> {
    line: &'a ConfigLine,
    usage: String,
}

impl<'a> PacketItemParser<'a> {
    /// Defines (or appends) the item described by `line` and returns its name.
    pub fn parse(
        line: &'a ConfigLine,
        packet: &mut Packet,
        cmd_or_tlm: CmdOrTlm,
        warnings: &mut Vec<String>,
    ) -> Result<String, ConfigError> {
        let parser = PacketItemParser {
            line,
            usage: Self::build_usage(line),
        };
        parser.verify_parameters(cmd_or_tlm)?;
        parser.create_packet_item(packet, cmd_or_tlm, warnings)
    }

    fn keyword(&self) -> &str {
        &self.line.keyword
    }

    fn append(&self) -> bool {
        self.keyword().contains("APPEND")
    }

    fn max_options(&self) -> usize {
        self.usage.matches('<').count()
    }

    fn verify_parameters(&self, cmd_or_tlm: CmdOrTlm) -> Result<(), ConfigError> {
        if self.keyword().contains("ITEM") && cmd_or_tlm == CmdOrTlm::Command {
            return Err(self
                .line
                .error("ITEM types are only valid with TELEMETRY", &self.usage));
        }
        if self.keyword().contains("PARAMETER") && cmd_or_tlm == CmdOrTlm::Telemetry {
            return Err(self
                .line
                .error("PARAMETER types are only valid with COMMAND", &self.usage));
        }
        let max = self.max_options();
        self.line
            .verify_num_parameters(max.saturating_sub(2), Some(max), &self.usage)
    }

    fn create_packet_item(
        &self,
        packet: &mut Packet,
        cmd_or_tlm: CmdOrTlm,
        warnings: &mut Vec<String>,
    ) -> Result<String, ConfigError> {
        let params = &self.line.parameters;
        let item_name = params[0].to_ascii_uppercase();
        if packet.has_item(&item_name) {
            record_warning(
                warnings,
                format!(
                    "{} {} {} redefined.",
                    packet.target_name(),
                    packet.packet_name(),
                    item_name
                ),
            );
        }

        let data_type = self.data_type()?;
        let bit_size = self.bit_size()?;
        let mut item = PacketItem::new(
            &item_name,
            self.bit_offset()?,
            bit_size,
            data_type,
            self.endianness(packet)?,
            self.array_size(bit_size, warnings)?,
        )
        .map_err(model_error(self.line, &self.usage))?;

        if cmd_or_tlm == CmdOrTlm::Command {
            item.range = self.range(data_type, bit_size)?;
            item.default = self.default(data_type, bit_size)?;
        }
        let id_value = self.id_value(data_type, &item)?;
        item.set_id_value(id_value)
            .map_err(model_error(self.line, &self.usage))?;
        item.description = self.description();

        let (bit_offset, bit_size) = {
            let item = if self.append() {
                packet.append(item)
            } else {
                packet.define(item)
            }
            .map_err(model_error(self.line, &self.usage))?;
            (item.bit_offset, item.bit_size)
        };
        pkt_trace!(&*packet, "defined {} at bit {} size {}", item_name, bit_offset, bit_size);
        Ok(item_name)
    }

    fn param(&self, index: usize) -> Result<&str, ConfigError> {
        self.line.param(index).ok_or_else(|| {
            self.line
                .error(format!("Not enough parameters for {}.", self.keyword()), &self.usage)
        })
    }

    fn integer(&self, index: usize, what: &str) -> Result<i64, ConfigError> {
        let token = self.param(index)?;
        parse_int(token)
            .and_then(|v| i64::try_from(v).ok())
            .ok_or_else(|| {
                self.line
                    .error(format!("Invalid {} {}. Must be an integer.", what, token), &self.usage)
            })
    }

    fn data_type(&self) -> Result<DataType, ConfigError> {
        let index = if self.append() { 2 } else { 3 };
        self.param(index)?
            .parse()
            .map_err(model_error(self.line, &self.usage))
    }

    fn bit_offset(&self) -> Result<i64, ConfigError> {
        if self.append() {
            return Ok(0);
        }
        self.integer(1, "bit offset")
    }

    fn bit_size(&self) -> Result<i64, ConfigError> {
        let index = if self.append() { 1 } else { 2 };
        self.integer(index, "bit size")
    }

    fn array_size(&self, bit_size: i64, warnings: &mut Vec<String>) -> Result<Option<i64>, ConfigError> {
        if !self.keyword().contains("ARRAY") {
            return Ok(None);
        }
        let index = if self.append() { 3 } else { 4 };
        let array_bit_size = self.integer(index, "array bit size")?;
        if bit_size > 0 {
            let items = array_bit_size / bit_size;
            if items >= BIG_ARRAY_SIZE {
                record_warning(
                    warnings,
                    format!(
                        "Performance Issue!\nIn {}:{} your definition of:\n{}\ncreates an array with {} elements. Consider creating a BLOCK if this is binary data.",
                        self.line.filename, self.line.line_number, self.line.line, items
                    ),
                );
            }
        }
        Ok(Some(array_bit_size))
    }

    fn endianness(&self, packet: &Packet) -> Result<Endianness, ConfigError> {
        match self.line.param(self.max_options() - 1) {
            Some(token) => token.parse().map_err(|_| {
                self.line.error(
                    format!(
                        "Invalid endianness {}. Must be BIG_ENDIAN or LITTLE_ENDIAN.",
                        token.to_ascii_uppercase()
                    ),
                    &self.usage,
                )
            }),
            None => Ok(packet.default_endianness),
        }
    }

    fn constant(&self, token: &str, data_type: DataType, bit_size: i64) -> Result<Value, ConfigError> {
        handle_defined_constants(
            Value::convert_from_str(token),
            Some(data_type),
            Some(bit_size),
        )
        .map_err(model_error(self.line, &self.usage))
    }

    fn range(&self, data_type: DataType, bit_size: i64) -> Result<Option<ItemRange>, ConfigError> {
        if self.keyword().contains("ARRAY") || data_type.is_string_like() {
            return Ok(None);
        }
        let index = if self.append() { 3 } else { 4 };
        let min = self.constant(self.param(index)?, data_type, bit_size)?;
        let max = self.constant(self.param(index + 1)?, data_type, bit_size)?;
        Ok(Some(ItemRange::new(min, max)))
    }

    fn default(&self, data_type: DataType, bit_size: i64) -> Result<Option<Value>, ConfigError> {
        if self.keyword().contains("ARRAY") {
            return Ok(Some(Value::Array(Vec::new())));
        }
        let index = if self.append() { 3 } else { 4 };
        if data_type.is_string_like() {
            let token = self.param(index)?;
            // Unquoted 0x<data> is binary data, anything else a literal string
            if token.to_ascii_uppercase().starts_with("0X") && !self.line.is_quoted(token) {
                let bytes = hex_to_bytes(token).map_err(|err| {
                    self.line
                        .error(format!("Invalid hex default {}: {}", token, err), &self.usage)
                })?;
                return Ok(Some(Value::Bytes(bytes)));
            }
            return Ok(Some(Value::Str(token.to_string())));
        }
        let token = self.param(index + 2)?;
        self.constant(token, data_type, bit_size).map(Some)
    }

    fn id_value(&self, data_type: DataType, item: &PacketItem) -> Result<Option<Value>, ConfigError> {
        if !self.keyword().contains("ID_") {
            return Ok(None);
        }
        if data_type == DataType::Derived {
            return Err(self
                .line
                .error("DERIVED data type not allowed for Identifier", &self.usage));
        }
        let index = if self.keyword().contains("ITEM") {
            if self.append() { 3 } else { 4 }
        } else {
            let index = if self.append() { 5 } else { 6 };
            if data_type.is_string_like() { index - 2 } else { index }
        };
        let token = self.param(index)?;
        if data_type.is_string_like() {
            // Command ids share the parsed default so hex stays binary
            return Ok(Some(
                item.default
                    .clone()
                    .unwrap_or_else(|| Value::Str(token.to_string())),
            ));
        }
        Ok(Some(Value::convert_from_str(token)))
    }

    fn description(&self) -> Option<String> {
        self.line
            .param(self.max_options() - 2)
            .map(str::to_string)
    }

    /// Usage text for the keyword. The number of `<` markers bounds the
    /// parameter count.
    fn build_usage(line: &ConfigLine) -> String {
        let keyword = line.keyword.as_str();
        let append = keyword.contains("APPEND");
        let mut usage = format!("{} <ITEM NAME> ", keyword);
        if !append {
            usage.push_str("<BIT OFFSET> ");
        }
        if keyword.contains("ARRAY") {
            usage.push_str("<ARRAY ITEM BIT SIZE> ");
        } else {
            usage.push_str("<BIT SIZE> ");
        }

        if keyword.contains("ITEM") {
            usage.push_str("<TYPE: INT/UINT/FLOAT/STRING/BLOCK/DERIVED> ");
        } else if keyword.contains("ARRAY") {
            usage.push_str("<TYPE: INT/UINT/FLOAT/STRING/BLOCK> ");
        } else {
            let type_index = if append { 2 } else { 3 };
            let string_like = line
                .param(type_index)
                .and_then(|t| t.parse::<DataType>().ok())
                .is_some_and(|dt| dt.is_string_like());
            if string_like {
                usage.push_str("<TYPE: STRING/BLOCK> ");
            } else {
                usage.push_str("<TYPE: INT/UINT/FLOAT> <MIN VALUE> <MAX VALUE> ");
            }
            if !keyword.contains("ID") {
                usage.push_str("<DEFAULT_VALUE> ");
            }
        }

        if keyword.contains("ARRAY") {
            usage.push_str("<TOTAL ARRAY BIT SIZE> ");
        }
        if keyword.contains("ID") {
            if keyword.contains("PARAMETER") {
                usage.push_str("<DEFAULT AND ID VALUE> ");
            } else {
                usage.push_str("<ID VALUE> ");
            }
        }
        usage.push_str("<DESCRIPTION (Optional)> <ENDIANNESS (Optional)>");
        usage
    }
}
