// crates/cmdtlm-rs-xtce/src/builder/types.rs

//! Builds the `*ParameterType` / `*ArgumentType` elements for one item.

use crate::error::XtceError;
use crate::model::types::{
    AlarmRange, ArgumentType, ArrayType, BinaryDataEncoding, BinaryType, Byte, ByteOrderList,
    DefaultAlarm, DefaultCalibrator, Enumeration, EnumerationList, EnumeratedType,
    FixedValue, FloatDataEncoding, IntegerDataEncoding, NumericType, ParameterType,
    PolynomialCalibrator, StaticAlarmRanges, StringDataEncoding, StringSize, StringType, Term,
    Unit, UnitSet, ValidRange,
};
use cmdtlm_rs::packets::value::{format_float, is_printable};
use cmdtlm_rs::{DataType, Endianness, PacketItem, PolynomialConversion, Value};

/// A type element before it is named as a parameter or an argument type.
#[derive(Debug)]
pub(crate) enum TypeDef {
    Integer(NumericType),
    Float(NumericType),
    Enumerated(EnumeratedType),
    String(StringType),
    Binary(BinaryType),
    Array(ArrayType),
}

impl From<TypeDef> for ParameterType {
    fn from(def: TypeDef) -> Self {
        match def {
            TypeDef::Integer(t) => ParameterType::Integer(t),
            TypeDef::Float(t) => ParameterType::Float(t),
            TypeDef::Enumerated(t) => ParameterType::Enumerated(t),
            TypeDef::String(t) => ParameterType::String(t),
            TypeDef::Binary(t) => ParameterType::Binary(t),
            TypeDef::Array(t) => ParameterType::Array(t),
        }
    }
}

impl From<TypeDef> for ArgumentType {
    fn from(def: TypeDef) -> Self {
        match def {
            TypeDef::Integer(t) => ArgumentType::Integer(t),
            TypeDef::Float(t) => ArgumentType::Float(t),
            TypeDef::Enumerated(t) => ArgumentType::Enumerated(t),
            TypeDef::String(t) => ArgumentType::String(t),
            TypeDef::Binary(t) => ArgumentType::Binary(t),
            TypeDef::Array(t) => ArgumentType::Array(t),
        }
    }
}

/// Name of the element type of `item`.
pub(crate) fn type_name(item: &PacketItem) -> String {
    format!("{}_Type", item.name)
}

/// Name of the type a parameter or argument refers to.
pub(crate) fn type_ref(item: &PacketItem) -> String {
    if item.array_size.is_some() {
        format!("{}_ArrayType", item.name)
    } else {
        type_name(item)
    }
}

/// The type element(s) describing `item`: its element type and, for
/// arrays, the one-dimensional array type wrapping it.
pub(crate) fn type_defs(item: &PacketItem) -> Result<Vec<TypeDef>, XtceError> {
    let mut defs = Vec::with_capacity(2);
    defs.push(match item.data_type {
        DataType::Int | DataType::Uint => integer_type(item),
        DataType::Float => float_type(item),
        DataType::String => TypeDef::String(string_type(item)),
        DataType::Block => TypeDef::Binary(binary_type(item)),
        DataType::Derived => {
            return Err(XtceError::Unsupported(format!(
                "DERIVED data type not supported in XTCE: {}",
                item.name
            )));
        }
    });
    if item.array_size.is_some() {
        defs.push(TypeDef::Array(ArrayType {
            name: type_ref(item),
            short_description: item.description.clone(),
            array_type_ref: type_name(item),
            number_of_dimensions: "1".into(),
        }));
    }
    Ok(defs)
}

fn integer_type(item: &PacketItem) -> TypeDef {
    let encoding = if item.data_type == DataType::Int {
        "twosComplement"
    } else {
        "unsigned"
    };
    let mut initial_value = scalar_default(item).map(|v| v.to_string());

    if let Some(states) = &item.states {
        if let Some(name) = scalar_default(item).and_then(|v| item.state_name_for(v)) {
            initial_value = Some(name.to_string());
        }
        let enumerations = states
            .iter()
            .filter(|(_, value)| **value != Value::Str("ANY".into()))
            .map(|(label, value)| Enumeration {
                value: value.to_string(),
                label: label.clone(),
            })
            .collect();
        return TypeDef::Enumerated(EnumeratedType {
            name: type_name(item),
            initial_value,
            short_description: item.description.clone(),
            byte_order_list: byte_order_list(item),
            unit_set: unit_set(item),
            integer_data_encoding: IntegerDataEncoding {
                size_in_bits: item.bit_size.to_string(),
                encoding: encoding.into(),
                default_calibrator: None,
            },
            enumeration_list: EnumerationList { enumerations },
        });
    }

    let calibrator = polynomial(item).map(default_calibrator);
    let calibrated = calibrator.is_some();
    let numeric = NumericType {
        name: type_name(item),
        size_in_bits: None,
        initial_value,
        short_description: item.description.clone(),
        signed: (!calibrated).then(|| (item.data_type == DataType::Int).to_string()),
        byte_order_list: byte_order_list(item),
        unit_set: unit_set(item),
        integer_data_encoding: Some(IntegerDataEncoding {
            size_in_bits: item.bit_size.to_string(),
            encoding: encoding.into(),
            default_calibrator: calibrator,
        }),
        float_data_encoding: None,
        default_alarm: default_alarm(item),
        valid_range: valid_range(item),
    };
    if calibrated {
        TypeDef::Float(numeric)
    } else {
        TypeDef::Integer(numeric)
    }
}

fn float_type(item: &PacketItem) -> TypeDef {
    TypeDef::Float(NumericType {
        name: type_name(item),
        size_in_bits: Some(item.bit_size.to_string()),
        initial_value: scalar_default(item).map(|v| v.to_string()),
        short_description: item.description.clone(),
        signed: None,
        byte_order_list: byte_order_list(item),
        unit_set: unit_set(item),
        integer_data_encoding: None,
        float_data_encoding: Some(FloatDataEncoding {
            size_in_bits: item.bit_size.to_string(),
            encoding: "IEEE754_1985".into(),
            default_calibrator: polynomial(item).map(default_calibrator),
        }),
        default_alarm: default_alarm(item),
        valid_range: valid_range(item),
    })
}

fn string_type(item: &PacketItem) -> StringType {
    StringType {
        name: type_name(item),
        character_width: "8".into(),
        initial_value: scalar_default(item).map(string_initial_value),
        short_description: item.description.clone(),
        unit_set: unit_set(item),
        string_data_encoding: StringDataEncoding {
            encoding: "UTF-8".into(),
            size_in_bits: StringSize {
                fixed: FixedValue::new(item.bit_size),
            },
        },
    }
}

fn binary_type(item: &PacketItem) -> BinaryType {
    BinaryType {
        name: type_name(item),
        initial_value: scalar_default(item).map(string_initial_value),
        short_description: item.description.clone(),
        unit_set: unit_set(item),
        binary_data_encoding: BinaryDataEncoding {
            size_in_bits: FixedValue::new(item.bit_size),
        },
    }
}

/// The default value, unless the item is an array.
fn scalar_default(item: &PacketItem) -> Option<&Value> {
    if item.array_size.is_some() {
        return None;
    }
    item.default.as_ref()
}

/// Printable defaults are written quoted, anything else as `0x` hex.
fn string_initial_value(value: &Value) -> String {
    match value {
        Value::Bytes(bytes) if is_printable(bytes) => {
            format!("\"{}\"", String::from_utf8_lossy(bytes))
        }
        Value::Bytes(bytes) => format!("0x{}", hex::encode_upper(bytes)),
        Value::Str(text) if is_printable(text.as_bytes()) => format!("\"{}\"", text),
        Value::Str(text) => format!("0x{}", hex::encode_upper(text.as_bytes())),
        other => format!("\"{}\"", other),
    }
}

/// The read conversion when there is one, else the write conversion, and
/// only if that one is a polynomial.
fn polynomial(item: &PacketItem) -> Option<&PolynomialConversion> {
    item.read_conversion
        .as_ref()
        .or(item.write_conversion.as_ref())
        .and_then(|c| c.as_polynomial())
}

fn default_calibrator(conversion: &PolynomialConversion) -> DefaultCalibrator {
    DefaultCalibrator {
        polynomial_calibrator: PolynomialCalibrator {
            terms: conversion
                .coeffs
                .iter()
                .enumerate()
                .map(|(exponent, coefficient)| Term {
                    coefficient: format_float(*coefficient),
                    exponent: exponent.to_string(),
                })
                .collect(),
        },
    }
}

/// Little endian multi-byte items list their bytes least significant first.
fn byte_order_list(item: &PacketItem) -> Option<ByteOrderList> {
    if item.endianness != Endianness::LittleEndian || item.bit_size <= 8 {
        return None;
    }
    let byte_count = (item.bit_size - 1) / 8 + 1;
    Some(ByteOrderList {
        bytes: (0..byte_count)
            .map(|significance| Byte {
                byte_significance: significance.to_string(),
            })
            .collect(),
    })
}

fn unit_set(item: &PacketItem) -> UnitSet {
    UnitSet {
        unit: item.units.as_ref().map(|units| Unit {
            description: item.units_full.clone(),
            value: units.clone(),
        }),
    }
}

/// Only the DEFAULT limits set has an XTCE representation.
fn default_alarm(item: &PacketItem) -> Option<DefaultAlarm> {
    let values = item.limits.default_values()?;
    Some(DefaultAlarm {
        static_alarm_ranges: StaticAlarmRanges {
            warning_range: AlarmRange {
                min_inclusive: format_float(values.yellow_low),
                max_inclusive: format_float(values.yellow_high),
            },
            critical_range: AlarmRange {
                min_inclusive: format_float(values.red_low),
                max_inclusive: format_float(values.red_high),
            },
        },
    })
}

fn valid_range(item: &PacketItem) -> Option<ValidRange> {
    item.range.as_ref().map(|range| ValidRange {
        min_inclusive: range.min.to_string(),
        max_inclusive: range.max.to_string(),
    })
}
