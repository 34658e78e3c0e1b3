// crates/cmdtlm-rs/src/packets/value.rs

use super::error::PacketError;
use super::types::DataType;
use core::fmt;

/// Largest finite value of a 32-bit float as written in configuration files.
pub const FLOAT32_MAX: f64 = 3.402823e38;

/// A raw or converted item value (default, id value, state value, range bound).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Signed integer wide enough for both `MIN_INT64` and `MAX_UINT64`.
    Int(i128),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
}

impl Value {
    /// Converts a configuration token the way untyped parameters are read:
    /// float literal, decimal integer, `0x` hex integer, `[a, b]` array,
    /// otherwise the string itself.
    pub fn convert_from_str(token: &str) -> Value {
        let trimmed = token.trim();
        if is_float_literal(trimmed) {
            if let Ok(f) = trimmed.parse::<f64>() {
                return Value::Float(f);
            }
        }
        if is_int_literal(trimmed) {
            if let Ok(i) = trimmed.parse::<i128>() {
                return Value::Int(i);
            }
        }
        if let Some(i) = parse_hex_int(trimmed) {
            return Value::Int(i);
        }
        if trimmed.len() >= 2 && trimmed.starts_with('[') && trimmed.ends_with(']') {
            let inner = trimmed[1..trimmed.len() - 1].trim();
            if inner.is_empty() {
                return Value::Array(Vec::new());
            }
            return Value::Array(
                inner
                    .split(',')
                    .map(|part| {
                        let part = part.trim();
                        let unquoted = part
                            .strip_prefix('"')
                            .and_then(|p| p.strip_suffix('"'))
                            .or_else(|| part.strip_prefix('\'').and_then(|p| p.strip_suffix('\'')));
                        match unquoted {
                            Some(text) => Value::Str(text.to_string()),
                            None => Value::convert_from_str(part),
                        }
                    })
                    .collect(),
            );
        }
        Value::Str(token.to_string())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Coerces `self` to `data_type`, failing with the item-qualified message
    /// used throughout the model.
    pub fn coerce(&self, item_name: &str, data_type: DataType) -> Result<Value, PacketError> {
        let invalid = || PacketError::InvalidValue {
            name: item_name.to_string(),
            value: self.to_string(),
            data_type: data_type.to_string(),
        };
        match data_type {
            DataType::Int | DataType::Uint => match self {
                Value::Int(i) => Ok(Value::Int(*i)),
                Value::Float(f) if f.is_finite() => Ok(Value::Int(f.trunc() as i128)),
                Value::Str(s) => {
                    let s = s.trim();
                    if is_int_literal(s) {
                        s.parse::<i128>().map(Value::Int).map_err(|_| invalid())
                    } else {
                        parse_hex_int(s).map(Value::Int).ok_or_else(invalid)
                    }
                }
                _ => Err(invalid()),
            },
            DataType::Float => match self {
                Value::Int(i) => Ok(Value::Float(*i as f64)),
                Value::Float(f) => Ok(Value::Float(*f)),
                Value::Str(s) => parse_float(s).map(Value::Float).ok_or_else(invalid),
                _ => Err(invalid()),
            },
            DataType::String | DataType::Block => match self {
                Value::Bytes(b) => Ok(Value::Bytes(b.clone())),
                Value::Array(_) => Err(invalid()),
                other => Ok(Value::Str(other.to_string())),
            },
            DataType::Derived => Ok(self.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => f.write_str(&format_float(*v)),
            Value::Str(s) => f.write_str(s),
            Value::Bytes(b) => write!(f, "0x{}", hex::encode_upper(b)),
            Value::Array(values) => {
                f.write_str("[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    match v {
                        Value::Str(s) => write!(f, "\"{}\"", s)?,
                        other => write!(f, "{}", other)?,
                    }
                }
                f.write_str("]")
            }
        }
    }
}

/// Inclusive numeric range of a command parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRange {
    pub min: Value,
    pub max: Value,
}

impl ItemRange {
    pub fn new(min: Value, max: Value) -> Self {
        Self { min, max }
    }

    /// Full range of an integer of `bit_size` bits. INT supports 1 to 128
    /// bits and UINT 1 to 127 bits.
    pub fn for_integer(data_type: DataType, bit_size: i64) -> Result<Self, PacketError> {
        let max_bits = if data_type == DataType::Int { 128 } else { 127 };
        if !(1..=max_bits).contains(&bit_size) {
            return Err(PacketError::NoIntegerRange {
                data_type,
                bit_size,
            });
        }
        let bits = bit_size as u32;
        Ok(if data_type == DataType::Int {
            Self::new(
                Value::Int(i128::MIN >> (128 - bits)),
                Value::Int(i128::MAX >> (128 - bits)),
            )
        } else {
            Self::new(Value::Int(0), Value::Int(i128::MAX >> (127 - bits)))
        })
    }

    /// Full range of a float of `bit_size` bits.
    pub fn for_float(bit_size: i64) -> Self {
        if bit_size == 32 {
            Self::new(Value::Float(-FLOAT32_MAX), Value::Float(FLOAT32_MAX))
        } else {
            Self::new(Value::Float(-f64::MAX), Value::Float(f64::MAX))
        }
    }
}

/// Formats a float so that it reads back as a float: integral values keep a
/// trailing `.0`, very large or small magnitudes use scientific notation.
pub fn format_float(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if v != 0.0 && (v.abs() >= 1e16 || v.abs() < 1e-4) {
        format!("{:e}", v)
    } else if v.fract() == 0.0 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

/// Parses a float token, accepting integers, hex integers and the infinity spellings.
pub fn parse_float(token: &str) -> Option<f64> {
    let t = token.trim();
    match t {
        "Infinity" | "inf" | "+Infinity" => return Some(f64::INFINITY),
        "-Infinity" | "-inf" => return Some(f64::NEG_INFINITY),
        _ => {}
    }
    if is_float_literal(t) || is_int_literal(t) {
        return t.parse::<f64>().ok();
    }
    parse_hex_int(t).map(|i| i as f64)
}

/// Parses a strict integer token (decimal or `0x` hex).
pub fn parse_int(token: &str) -> Option<i128> {
    let t = token.trim();
    if is_int_literal(t) {
        return t.parse::<i128>().ok();
    }
    parse_hex_int(t)
}

fn parse_hex_int(t: &str) -> Option<i128> {
    let (negative, body) = match t.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, t),
    };
    let digits = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X"))?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let v = i128::from_str_radix(digits, 16).ok()?;
    Some(if negative { -v } else { v })
}

fn is_int_literal(t: &str) -> bool {
    let body = t.strip_prefix(['+', '-']).unwrap_or(t);
    !body.is_empty() && body.chars().all(|c| c.is_ascii_digit())
}

fn is_float_literal(t: &str) -> bool {
    let body = t.strip_prefix(['+', '-']).unwrap_or(t);
    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(pos) => (&body[..pos], Some(&body[pos + 1..])),
        None => (body, None),
    };
    if let Some(exp) = exponent {
        let exp_digits = exp.strip_prefix(['+', '-']).unwrap_or(exp);
        if exp_digits.is_empty() || !exp_digits.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
    }
    match mantissa.split_once('.') {
        Some((int_part, frac_part)) => {
            int_part.chars().all(|c| c.is_ascii_digit())
                && !frac_part.is_empty()
                && frac_part.chars().all(|c| c.is_ascii_digit())
        }
        // Scientific notation without a decimal point ("1e5")
        None => {
            exponent.is_some()
                && !mantissa.is_empty()
                && mantissa.chars().all(|c| c.is_ascii_digit())
        }
    }
}

/// Resolves symbolic constants (`MIN`, `MAX`, `MAX_UINT16`, `POS_INFINITY`, ...)
/// left as strings by [`Value::convert_from_str`]. Numeric values pass through.
pub fn handle_defined_constants(
    value: Value,
    data_type: Option<DataType>,
    bit_size: Option<i64>,
) -> Result<Value, PacketError> {
    let text = match value {
        Value::Str(text) => text,
        other => return Ok(other),
    };
    let upper = text.to_ascii_uppercase();
    let v = match upper.as_str() {
        "MIN" | "MAX" => return calculate_range_value(&upper, data_type, bit_size),
        "MIN_INT8" => Value::Int(i8::MIN as i128),
        "MAX_INT8" => Value::Int(i8::MAX as i128),
        "MIN_INT16" => Value::Int(i16::MIN as i128),
        "MAX_INT16" => Value::Int(i16::MAX as i128),
        "MIN_INT32" => Value::Int(i32::MIN as i128),
        "MAX_INT32" => Value::Int(i32::MAX as i128),
        "MIN_INT64" => Value::Int(i64::MIN as i128),
        "MAX_INT64" => Value::Int(i64::MAX as i128),
        "MIN_UINT8" | "MIN_UINT16" | "MIN_UINT32" | "MIN_UINT64" => Value::Int(0),
        "MAX_UINT8" => Value::Int(u8::MAX as i128),
        "MAX_UINT16" => Value::Int(u16::MAX as i128),
        "MAX_UINT32" => Value::Int(u32::MAX as i128),
        "MAX_UINT64" => Value::Int(u64::MAX as i128),
        "MIN_FLOAT64" => Value::Float(-f64::MAX),
        "MAX_FLOAT64" => Value::Float(f64::MAX),
        "MIN_FLOAT32" => Value::Float(-FLOAT32_MAX),
        "MAX_FLOAT32" => Value::Float(FLOAT32_MAX),
        "POS_INFINITY" => Value::Float(f64::INFINITY),
        "NEG_INFINITY" => Value::Float(f64::NEG_INFINITY),
        _ => return Err(PacketError::UnknownConstant(text)),
    };
    Ok(v)
}

fn calculate_range_value(
    which: &str,
    data_type: Option<DataType>,
    bit_size: Option<i64>,
) -> Result<Value, PacketError> {
    let bit_size = bit_size.unwrap_or(32);
    Ok(match data_type {
        Some(DataType::Int) | Some(DataType::Uint) => {
            let range = ItemRange::for_integer(data_type.unwrap_or(DataType::Uint), bit_size)?;
            if which == "MIN" { range.min } else { range.max }
        }
        Some(DataType::Float) => {
            let range = ItemRange::for_float(bit_size);
            if which == "MIN" { range.min } else { range.max }
        }
        _ => Value::Int(0),
    })
}

/// Decodes a `0x`-prefixed hex string into bytes. Odd digit counts are left padded.
pub fn hex_to_bytes(text: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let t = text.trim();
    let digits = t
        .strip_prefix("0x")
        .or_else(|| t.strip_prefix("0X"))
        .unwrap_or(t);
    if digits.len() % 2 == 1 {
        hex::decode(format!("0{}", digits))
    } else {
        hex::decode(digits)
    }
}

/// True when every byte is printable ASCII or common whitespace.
pub fn is_printable(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .all(|b| (0x20..=0x7E).contains(b) || matches!(b, b'\n' | b'\r' | b'\t'))
}
