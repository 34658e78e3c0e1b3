// crates/cmdtlm-rs/src/packets/packet_item.rs

use super::conversion::Conversion;
use super::error::PacketError;
use super::limits::Limits;
use super::types::{CmdOrTlm, DataType, Endianness, Overflow, StateColor};
use super::value::{ItemRange, Value};
use crate::format::has_conversion;
use std::collections::BTreeMap;

/// One named field of a packet.
///
/// Layout fields (`bit_offset`, `bit_size`, `data_type`, `endianness`,
/// `array_size`) are checked by [`PacketItem::validate`] whenever the item is
/// created or (re)defined in a packet. The remaining attributes are free to be
/// mutated by the keyword parsers and the XTCE importer.
#[derive(Debug, Clone, PartialEq)]
pub struct PacketItem {
    pub name: String,
    /// Non-negative offsets count from the start of the packet, negative
    /// offsets from the end.
    pub bit_offset: i64,
    /// Zero or negative for variably sized STRING/BLOCK items.
    pub bit_size: i64,
    pub data_type: DataType,
    pub endianness: Endianness,
    /// Total bits of a fixed-count array (`element count * bit_size`).
    pub array_size: Option<i64>,
    pub overflow: Overflow,
    pub format_string: Option<String>,
    pub read_conversion: Option<Conversion>,
    pub write_conversion: Option<Conversion>,
    pub id_value: Option<Value>,
    /// State name to raw value. `ANY` is a reserved wildcard state.
    pub states: Option<BTreeMap<String, Value>>,
    pub state_colors: Option<BTreeMap<String, StateColor>>,
    /// Hazardous state name to description (empty when none was given).
    pub hazardous: Option<BTreeMap<String, String>>,
    pub description: Option<String>,
    pub units_full: Option<String>,
    pub units: Option<String>,
    pub default: Option<Value>,
    pub range: Option<ItemRange>,
    pub required: bool,
    pub limits: Limits,
    pub meta: BTreeMap<String, Vec<String>>,
    /// Definition order within the owning packet, used as a sort tie-break.
    pub create_index: usize,
}

impl PacketItem {
    /// Creates an item with validated layout. The name is upper-cased.
    pub fn new(
        name: &str,
        bit_offset: i64,
        bit_size: i64,
        data_type: DataType,
        endianness: Endianness,
        array_size: Option<i64>,
    ) -> Result<Self, PacketError> {
        let item = Self {
            name: name.to_ascii_uppercase(),
            bit_offset,
            bit_size,
            data_type,
            endianness,
            array_size,
            overflow: Overflow::default(),
            format_string: None,
            read_conversion: None,
            write_conversion: None,
            id_value: None,
            states: None,
            state_colors: None,
            hazardous: None,
            description: None,
            units_full: None,
            units: None,
            default: None,
            range: None,
            required: false,
            limits: Limits::default(),
            meta: BTreeMap::new(),
            create_index: 0,
        };
        item.validate()?;
        Ok(item)
    }

    /// Checks the bit layout of the item.
    pub fn validate(&self) -> Result<(), PacketError> {
        let name = self.name.as_str();
        let err = |reason: String| Err(PacketError::invalid_item(name, reason));

        if name.is_empty() {
            return Err(PacketError::invalid_item(
                name,
                "name must contain at least one character",
            ));
        }

        let byte_aligned = self.bit_offset % 8 == 0;
        match self.data_type {
            DataType::Float | DataType::String | DataType::Block if !byte_aligned => {
                return err(
                    "bit_offset for FLOAT, STRING, and BLOCK items must be byte aligned".into(),
                );
            }
            DataType::Derived if self.bit_offset != 0 => {
                return err("DERIVED items must have bit_offset of zero".into());
            }
            _ => {}
        }

        match self.data_type {
            DataType::Int | DataType::Uint | DataType::Float if self.bit_size <= 0 => {
                return err(format!(
                    "bit_size cannot be negative or zero for INT, UINT, and FLOAT items: {}",
                    self.bit_size
                ));
            }
            DataType::String | DataType::Block if self.bit_size % 8 != 0 => {
                return err("bit_size for STRING and BLOCK items must be byte multiples".into());
            }
            DataType::Float if self.bit_size != 32 && self.bit_size != 64 => {
                return err(format!(
                    "bit_size for FLOAT items must be 32 or 64. Given: {}",
                    self.bit_size
                ));
            }
            DataType::Derived if self.bit_size != 0 => {
                return err("DERIVED items must have bit_size of zero".into());
            }
            _ => {}
        }

        if let Some(array_size) = self.array_size {
            if self.bit_size != 0 && array_size >= 0 && array_size % self.bit_size != 0 {
                return err("array_size must be a multiple of bit_size".into());
            }
            if self.bit_size <= 0 {
                return err("bit_size cannot be negative or zero for array items".into());
            }
        }

        if self.bit_offset < 0 {
            if self.bit_size < 0 {
                return err(format!(
                    "Can't define an item with negative bit_size {} and negative bit_offset {}",
                    self.bit_size, self.bit_offset
                ));
            }
            match self.array_size {
                Some(a) if a < 0 => {
                    return err(format!(
                        "Can't define an item with negative array_size {} and negative bit_offset {}",
                        a, self.bit_offset
                    ));
                }
                Some(a) if a > self.bit_offset.abs() => {
                    return err(format!(
                        "Can't define an item with array_size {} greater than negative bit_offset {}",
                        a, self.bit_offset
                    ));
                }
                None if self.bit_size > self.bit_offset.abs() => {
                    return err(format!(
                        "Can't define an item with bit_size {} greater than negative bit_offset {}",
                        self.bit_size, self.bit_offset
                    ));
                }
                _ => {}
            }
        } else if self.is_little_endian_bitfield() {
            let num_bytes = ((self.bit_offset % 8) + self.bit_size - 1) / 8 + 1;
            let upper_bound = self.bit_offset / 8;
            let lower_bound = upper_bound - num_bytes + 1;
            if lower_bound < 0 {
                return err(format!(
                    "LITTLE_ENDIAN bitfield with bit_offset {} and bit_size {} is invalid",
                    self.bit_offset, self.bit_size
                ));
            }
        }
        Ok(())
    }

    /// True for a little-endian integer that is not a whole, aligned 8/16/32/64-bit word.
    pub fn is_little_endian_bitfield(&self) -> bool {
        let byte_aligned = self.bit_offset % 8 == 0;
        self.endianness == Endianness::LittleEndian
            && self.data_type.is_integer()
            && !(byte_aligned && matches!(self.bit_size, 8 | 16 | 32 | 64))
    }

    /// Sets the format string, rejecting one with no conversion.
    pub fn set_format_string(&mut self, format_string: Option<String>) -> Result<(), PacketError> {
        if let Some(fmt) = &format_string {
            if !has_conversion(fmt) {
                return Err(PacketError::invalid_item(
                    &self.name,
                    format!("format_string invalid '{}'", fmt),
                ));
            }
        }
        self.format_string = format_string;
        Ok(())
    }

    /// Sets the identifying value, converting it to the item's data type.
    pub fn set_id_value(&mut self, raw: Option<Value>) -> Result<(), PacketError> {
        self.id_value = match raw {
            Some(v) => Some(v.coerce(&self.name, self.data_type)?),
            None => None,
        };
        Ok(())
    }

    /// Replaces the states map, upper-casing the state names.
    pub fn set_states(&mut self, states: Option<BTreeMap<String, Value>>) {
        self.states = states.map(|s| {
            s.into_iter()
                .map(|(k, v)| (k.to_ascii_uppercase(), v))
                .collect()
        });
        if self.states.is_some() && self.state_colors.is_none() {
            self.state_colors = Some(BTreeMap::new());
        }
    }

    /// State name whose raw value equals `value`.
    pub fn state_name_for(&self, value: &Value) -> Option<&str> {
        self.states
            .as_ref()?
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(k, _)| k.as_str())
    }

    /// True when the item has at least one state color, i.e. participates in limits.
    pub fn has_state_colors(&self) -> bool {
        self.state_colors.as_ref().is_some_and(|c| !c.is_empty())
    }

    /// Checks that a command item's default and range match its data type.
    /// FLOAT defaults and ranges given as integers are promoted in place.
    pub fn check_default_and_range_data_types(&mut self) -> Result<(), PacketError> {
        if self.write_conversion.is_some() {
            return Ok(());
        }
        let Some(default) = &self.default else {
            return Ok(());
        };
        let name = self.name.clone();
        let type_error = |what: &str, expected: &str, actual: &Value| {
            PacketError::invalid_item(
                &name,
                format!("{} must be a {} but is a {}", what, expected, value_kind(actual)),
            )
        };

        if self.array_size.is_some() {
            if !matches!(default, Value::Array(_)) {
                return Err(type_error("default", "Array", default));
            }
            return Ok(());
        }

        match self.data_type {
            DataType::Int | DataType::Uint => {
                if !matches!(default, Value::Int(_)) {
                    return Err(type_error("default", "Integer", default));
                }
                if let Some(range) = &self.range {
                    if !matches!(range.min, Value::Int(_)) {
                        return Err(type_error("minimum", "Integer", &range.min));
                    }
                    if !matches!(range.max, Value::Int(_)) {
                        return Err(type_error("maximum", "Integer", &range.max));
                    }
                }
            }
            DataType::Float => {
                let Some(f) = default.as_f64() else {
                    return Err(type_error("default", "Float", default));
                };
                self.default = Some(Value::Float(f));
                if let Some(range) = &self.range {
                    let Some(min) = range.min.as_f64() else {
                        return Err(type_error("minimum", "Float", &range.min));
                    };
                    let Some(max) = range.max.as_f64() else {
                        return Err(type_error("maximum", "Float", &range.max));
                    };
                    self.range = Some(ItemRange::new(Value::Float(min), Value::Float(max)));
                }
            }
            DataType::String | DataType::Block => {
                if !matches!(default, Value::Str(_) | Value::Bytes(_)) {
                    return Err(type_error("default", "String", default));
                }
            }
            DataType::Derived => {}
        }
        Ok(())
    }

    /// Configuration text that recreates this item.
    pub fn to_config(&self, cmd_or_tlm: CmdOrTlm, default_endianness: Endianness) -> String {
        let description = self.description.as_deref().unwrap_or("").replace('"', "'");
        let name = quote_if_necessary(&self.name);
        let head = format!(
            "{} {} {} {}",
            name, self.bit_offset, self.bit_size, self.data_type
        );
        let mut config = match cmd_or_tlm {
            CmdOrTlm::Telemetry => {
                if let Some(array_size) = self.array_size {
                    format!("  ARRAY_ITEM {} {} \"{}\"", head, array_size, description)
                } else if let Some(id) = &self.id_value {
                    format!("  ID_ITEM {} {} \"{}\"", head, config_value(id), description)
                } else {
                    format!("  ITEM {} \"{}\"", head, description)
                }
            }
            CmdOrTlm::Command => {
                let keyword = if self.id_value.is_some() {
                    "ID_PARAMETER"
                } else {
                    "PARAMETER"
                };
                if let Some(array_size) = self.array_size {
                    format!("  ARRAY_PARAMETER {} {} \"{}\"", head, array_size, description)
                } else if self.data_type.is_string_like() {
                    let default = match &self.default {
                        Some(Value::Bytes(b)) => format!("0x{}", hex::encode_upper(b)),
                        Some(v) => format!("\"{}\"", v),
                        None => "\"\"".to_string(),
                    };
                    format!("  {} {} {} \"{}\"", keyword, head, default, description)
                } else if self.data_type == DataType::Derived {
                    format!("  {} {} \"{}\"", keyword, head, description)
                } else {
                    let (min, max) = match &self.range {
                        Some(r) => (config_value(&r.min), config_value(&r.max)),
                        None => ("MIN".to_string(), "MAX".to_string()),
                    };
                    let default = self
                        .default
                        .as_ref()
                        .map(config_value)
                        .unwrap_or_else(|| "0".to_string());
                    format!(
                        "  {} {} {} {} {} \"{}\"",
                        keyword, head, min, max, default, description
                    )
                }
            }
        };
        if self.endianness != default_endianness {
            config.push(' ');
            config.push_str(self.endianness.as_str());
        }
        config.push('\n');

        if self.required {
            config.push_str("    REQUIRED\n");
        }
        if let Some(fmt) = &self.format_string {
            config.push_str(&format!("    FORMAT_STRING {}\n", quote_if_necessary(fmt)));
        }
        if let Some(units) = &self.units {
            let full = self.units_full.as_deref().unwrap_or(units);
            config.push_str(&format!(
                "    UNITS {} {}\n",
                quote_if_necessary(full),
                quote_if_necessary(units)
            ));
        }
        if self.overflow != Overflow::Error {
            config.push_str(&format!("    OVERFLOW {}\n", self.overflow));
        }
        if let Some(states) = &self.states {
            for (state_name, state_value) in states {
                config.push_str(&format!(
                    "    STATE {} {}",
                    quote_if_necessary(state_name),
                    quote_if_necessary(&config_value(state_value))
                ));
                if let Some(desc) = self.hazardous.as_ref().and_then(|h| h.get(state_name)) {
                    config.push_str(" HAZARDOUS");
                    if !desc.is_empty() {
                        config.push(' ');
                        config.push_str(&quote_if_necessary(desc));
                    }
                }
                if let Some(color) = self.state_colors.as_ref().and_then(|c| c.get(state_name)) {
                    config.push(' ');
                    config.push_str(color.as_str());
                }
                config.push('\n');
            }
        }
        if let Some(line) = self.read_conversion.as_ref().and_then(|c| c.to_config(true)) {
            config.push_str(&line);
        }
        if let Some(line) = self.write_conversion.as_ref().and_then(|c| c.to_config(false)) {
            config.push_str(&line);
        }
        for (set, values) in self.limits.sets() {
            let numbers: Vec<String> = values.to_vec().iter().map(|v| v.to_string()).collect();
            config.push_str(&format!(
                "    LIMITS {} {} {} {}\n",
                set,
                self.limits.persistence_setting,
                if self.limits.enabled { "ENABLED" } else { "DISABLED" },
                numbers.join(" ")
            ));
        }
        if let Some(response) = &self.limits.response {
            config.push_str(&response.to_config());
        }
        for (key, values) in &self.meta {
            let values: Vec<String> = values.iter().map(|v| quote_if_necessary(v)).collect();
            config.push_str(&format!(
                "    META {} {}\n",
                quote_if_necessary(key),
                values.join(" ")
            ));
        }
        config
    }
}

/// Token form of a value inside a configuration line.
fn config_value(value: &Value) -> String {
    match value {
        Value::Str(s) => s.clone(),
        other => other.to_string(),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Int(_) => "Integer",
        Value::Float(_) => "Float",
        Value::Str(_) | Value::Bytes(_) => "String",
        Value::Array(_) => "Array",
    }
}

/// Wraps `text` in double quotes when it would not survive tokenizing as one word.
pub(crate) fn quote_if_necessary(text: &str) -> String {
    if text.is_empty() || text.chars().any(char::is_whitespace) {
        format!("\"{}\"", text)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packets::limits::LimitsValues;

    fn item(name: &str, offset: i64, size: i64, dt: DataType) -> Result<PacketItem, PacketError> {
        PacketItem::new(name, offset, size, dt, Endianness::BigEndian, None)
    }

    #[test]
    fn test_name_is_upcased() {
        let it = item("value", 0, 8, DataType::Uint).unwrap();
        assert_eq!(it.name, "VALUE");
    }

    #[test]
    fn test_layout_validation() {
        assert!(matches!(
            item("F", 4, 32, DataType::Float),
            Err(PacketError::InvalidItem { reason, .. }) if reason.contains("byte aligned")
        ));
        assert!(matches!(
            item("F", 0, 16, DataType::Float),
            Err(PacketError::InvalidItem { reason, .. }) if reason.contains("32 or 64")
        ));
        assert!(matches!(
            item("S", 0, 12, DataType::String),
            Err(PacketError::InvalidItem { reason, .. }) if reason.contains("byte multiples")
        ));
        assert!(matches!(
            item("D", 8, 0, DataType::Derived),
            Err(PacketError::InvalidItem { reason, .. }) if reason.contains("bit_offset of zero")
        ));
        assert!(matches!(
            item("U", 0, 0, DataType::Uint),
            Err(PacketError::InvalidItem { .. })
        ));
        assert!(matches!(
            item("N", -8, 16, DataType::Uint),
            Err(PacketError::InvalidItem { reason, .. }) if reason.contains("greater than negative bit_offset")
        ));
        assert!(item("S", 0, 0, DataType::String).is_ok());
    }

    #[test]
    fn test_array_size_must_be_multiple() {
        let result = PacketItem::new("A", 0, 8, DataType::Uint, Endianness::BigEndian, Some(12));
        assert!(matches!(
            result,
            Err(PacketError::InvalidItem { reason, .. }) if reason == "array_size must be a multiple of bit_size"
        ));
    }

    #[test]
    fn test_little_endian_bitfield_bounds() {
        let bad = PacketItem::new("B", 4, 12, DataType::Uint, Endianness::LittleEndian, None);
        assert!(bad.is_err());
        let ok = PacketItem::new("B", 12, 12, DataType::Uint, Endianness::LittleEndian, None);
        assert!(ok.is_ok());
    }

    #[test]
    fn test_format_string_requires_conversion() {
        let mut it = item("V", 0, 8, DataType::Uint).unwrap();
        assert!(it.set_format_string(Some("plain".into())).is_err());
        assert!(it.set_format_string(Some("0x%02X".into())).is_ok());
    }

    #[test]
    fn test_id_value_converted_by_type() {
        let mut it = item("V", 0, 32, DataType::Float).unwrap();
        it.set_id_value(Some(Value::Int(2))).unwrap();
        assert_eq!(it.id_value, Some(Value::Float(2.0)));

        let mut it = item("V", 0, 8, DataType::Uint).unwrap();
        let err = it.set_id_value(Some(Value::Str("abc".into()))).unwrap_err();
        assert_eq!(err.to_string(), "V: Invalid value: abc for data type: UINT");
    }

    #[test]
    fn test_check_default_promotes_float() {
        let mut it = item("V", 0, 32, DataType::Float).unwrap();
        it.default = Some(Value::Int(1));
        it.range = Some(ItemRange::new(Value::Int(0), Value::Int(10)));
        it.check_default_and_range_data_types().unwrap();
        assert_eq!(it.default, Some(Value::Float(1.0)));
        assert_eq!(it.range.unwrap().max, Value::Float(10.0));
    }

    #[test]
    fn test_check_default_rejects_mismatch() {
        let mut it = item("V", 0, 16, DataType::Uint).unwrap();
        it.default = Some(Value::Str("x".into()));
        let err = it.check_default_and_range_data_types().unwrap_err();
        assert_eq!(err.to_string(), "V: default must be a Integer but is a String");
    }

    #[test]
    fn test_to_config_telemetry() {
        let mut it = item("TEMP", 0, 16, DataType::Int).unwrap();
        it.description = Some("Temperature".into());
        it.units = Some("C".into());
        it.units_full = Some("Celsius".into());
        it.limits.enabled = true;
        let mut values = BTreeMap::new();
        values.insert("DEFAULT".to_string(), LimitsValues::new(-80.0, -70.0, 60.0, 80.0));
        it.limits.values = Some(values);
        let config = it.to_config(CmdOrTlm::Telemetry, Endianness::BigEndian);
        assert_eq!(
            config,
            "  ITEM TEMP 0 16 INT \"Temperature\"\n    UNITS Celsius C\n    LIMITS DEFAULT 1 ENABLED -80 -70 60 80\n"
        );
    }

    #[test]
    fn test_to_config_command_states() {
        let mut it = item("MODE", 8, 8, DataType::Uint).unwrap();
        it.range = Some(ItemRange::new(Value::Int(0), Value::Int(2)));
        it.default = Some(Value::Int(0));
        let mut states = BTreeMap::new();
        states.insert("safe".to_string(), Value::Int(0));
        states.insert("ARMED".to_string(), Value::Int(1));
        it.set_states(Some(states));
        let mut hazardous = BTreeMap::new();
        hazardous.insert("ARMED".to_string(), String::new());
        it.hazardous = Some(hazardous);
        let config = it.to_config(CmdOrTlm::Command, Endianness::LittleEndian);
        assert!(config.starts_with("  PARAMETER MODE 8 8 UINT 0 2 0 \"\" BIG_ENDIAN\n"));
        assert!(config.contains("    STATE ARMED 1 HAZARDOUS\n"));
        assert!(config.contains("    STATE SAFE 0\n"));
    }
}
