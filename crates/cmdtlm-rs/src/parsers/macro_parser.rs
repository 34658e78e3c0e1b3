// crates/cmdtlm-rs/src/parsers/macro_parser.rs

use crate::config::{ConfigError, ConfigLine};
use crate::format::sprintf;
use crate::packets::{Packet, Value};

const START_USAGE: &str = "MACRO_APPEND_START <FIRST INDEX> <LAST INDEX> [NAME FORMAT]";
const DEFAULT_NAME_FORMAT: &str = "%s%d";

/// Tracks an open `MACRO_APPEND_START` .. `MACRO_APPEND_END` bracket.
///
/// Items appended inside the bracket are renamed with the first index and
/// then cloned, in order, once per remaining index.
#[derive(Debug, Default)]
pub struct MacroParser {
    building: bool,
    list: Vec<String>,
    indices: Vec<i64>,
    format: String,
    /// True when the index comes before the name in `format`.
    index_first: bool,
}

impl MacroParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_building(&self) -> bool {
        self.building
    }

    /// Handles `MACRO_APPEND_START <FIRST INDEX> <LAST INDEX> [NAME FORMAT]`.
    pub fn start(&mut self, line: &ConfigLine) -> Result<(), ConfigError> {
        if self.building {
            return Err(line.error("First close the previous MACRO_APPEND_START", START_USAGE));
        }
        line.verify_num_parameters(2, Some(3), START_USAGE)?;

        let params = &line.parameters;
        let index = |i: usize| {
            params[i].trim().parse::<i64>().map_err(|_| {
                line.error(format!("Invalid index {} for MACRO_APPEND_START", params[i]), START_USAGE)
            })
        };
        let first = index(0)?;
        let last = index(1)?;
        let format = line.param(2).unwrap_or(DEFAULT_NAME_FORMAT).to_string();
        let (Some(name_pos), Some(index_pos)) = (find_conversion(&format, 's'), find_conversion(&format, 'd')) else {
            return Err(line.error(
                format!("Invalid NAME FORMAT ({}) for MACRO_APPEND_START", format),
                START_USAGE,
            ));
        };

        self.indices = if first <= last {
            (first..=last).collect()
        } else {
            (last..=first).rev().collect()
        };
        self.index_first = index_pos < name_pos;
        self.format = format;
        self.list.clear();
        self.building = true;
        Ok(())
    }

    /// Records an item appended while the bracket is open.
    pub fn new_item(&mut self, keyword: &str, item_name: &str) {
        if self.building && keyword.starts_with("APPEND") {
            self.list.push(item_name.to_ascii_uppercase());
        }
    }

    /// Handles `MACRO_APPEND_END`, expanding the recorded items in `packet`.
    pub fn end(&mut self, line: &ConfigLine, packet: &mut Packet) -> Result<(), ConfigError> {
        line.verify_num_parameters(0, Some(0), "MACRO_APPEND_END")?;
        if !self.building {
            return Err(line.error("Missing MACRO_APPEND_START before this config.line.", ""));
        }
        if self.list.is_empty() {
            return Err(line.error("No items appended in MACRO_APPEND list", ""));
        }

        let list = std::mem::take(&mut self.list);
        let indices = std::mem::take(&mut self.indices);
        self.building = false;
        let Some((&first, rest)) = indices.split_first() else {
            return Ok(());
        };

        let mut renamed = Vec::with_capacity(list.len());
        for name in &list {
            let new_name = self.item_name(line, name, first)?;
            packet
                .rename_item(name, &new_name)
                .map_err(|err| line.error(err.to_string(), ""))?;
            renamed.push((name.as_str(), new_name));
        }

        for &index in rest {
            for (base, first_name) in &renamed {
                let mut item = packet
                    .clone_item(first_name)
                    .map_err(|err| line.error(err.to_string(), ""))?;
                item.name = self.item_name(line, base, index)?;
                packet
                    .append(item)
                    .map_err(|err| line.error(err.to_string(), ""))?;
            }
        }
        pkt_debug!(&*packet, "macro expanded {} item(s) over {} index(es)", list.len(), indices.len());
        Ok(())
    }

    fn item_name(&self, line: &ConfigLine, name: &str, index: i64) -> Result<String, ConfigError> {
        let name = Value::Str(name.to_string());
        let index = Value::Int(index as i128);
        let args = if self.index_first { [index, name] } else { [name, index] };
        sprintf(&self.format, &args).map_err(|err| line.error(err.to_string(), ""))
    }
}

/// Byte position of the first `%<width>conversion` specifier in `format`.
fn find_conversion(format: &str, conversion: char) -> Option<usize> {
    format.match_indices('%').map(|(pos, _)| pos).find(|&pos| {
        let rest = format[pos + 1..].trim_start_matches(|c: char| c.is_ascii_digit());
        rest.starts_with(conversion)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packets::{DataType, Endianness};

    fn start(parser: &mut MacroParser, params: &[&str]) -> Result<(), ConfigError> {
        parser.start(&ConfigLine::new("MACRO_APPEND_START", params))
    }

    fn append(parser: &mut MacroParser, packet: &mut Packet, name: &str) {
        packet.append_item(name, 8, DataType::Uint, None, None).unwrap();
        parser.new_item("APPEND_ITEM", name);
    }

    #[test]
    fn test_find_conversion() {
        assert_eq!(find_conversion("%s%d", 's'), Some(0));
        assert_eq!(find_conversion("%s%d", 'd'), Some(2));
        assert_eq!(find_conversion("%02d_%s", 'd'), Some(0));
        assert_eq!(find_conversion("%s_x", 'd'), None);
    }

    #[test]
    fn test_index_before_name_format() {
        let mut parser = MacroParser::new();
        let mut packet = Packet::new("INST", "PKT", Endianness::BigEndian, None);
        start(&mut parser, &["1", "2", "%02d_%s"]).unwrap();
        append(&mut parser, &mut packet, "CH");
        parser.end(&ConfigLine::new("MACRO_APPEND_END", &[] as &[&str]), &mut packet).unwrap();
        let names: Vec<&str> = packet.items().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["01_CH", "02_CH"]);
    }

    #[test]
    fn test_bracket_errors() {
        let mut parser = MacroParser::new();
        let mut packet = Packet::new("INST", "PKT", Endianness::BigEndian, None);
        let end = ConfigLine::new("MACRO_APPEND_END", &[] as &[&str]);

        let err = parser.end(&end, &mut packet).unwrap_err();
        assert_eq!(err.message, "Missing MACRO_APPEND_START before this config.line.");

        let err = start(&mut parser, &["1", "2", "%s_x"]).unwrap_err();
        assert_eq!(err.message, "Invalid NAME FORMAT (%s_x) for MACRO_APPEND_START");

        start(&mut parser, &["1", "2"]).unwrap();
        let err = start(&mut parser, &["1", "2"]).unwrap_err();
        assert_eq!(err.message, "First close the previous MACRO_APPEND_START");

        parser.new_item("ITEM", "IGNORED");
        let err = parser.end(&end, &mut packet).unwrap_err();
        assert_eq!(err.message, "No items appended in MACRO_APPEND list");
    }
}
