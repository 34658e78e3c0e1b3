// crates/cmdtlm-rs-xtce/src/model/types.rs

//! Contains model structs for `<ParameterTypeSet>` and `<ArgumentTypeSet>`.
//!
//! Parameter and argument types share their content; only the element
//! names differ, so each content struct appears in both enums.

use serde::Serialize;

#[derive(Debug, Serialize, Default)]
pub struct ParameterTypeSet {
    #[serde(rename = "$value")]
    pub types: Vec<ParameterType>,
}

#[derive(Debug, Serialize, Default)]
pub struct ArgumentTypeSet {
    #[serde(rename = "$value")]
    pub types: Vec<ArgumentType>,
}

#[derive(Debug, Serialize)]
pub enum ParameterType {
    #[serde(rename = "xtce:IntegerParameterType")]
    Integer(NumericType),
    /// Also used for integers carrying a polynomial calibration.
    #[serde(rename = "xtce:FloatParameterType")]
    Float(NumericType),
    #[serde(rename = "xtce:EnumeratedParameterType")]
    Enumerated(EnumeratedType),
    #[serde(rename = "xtce:StringParameterType")]
    String(StringType),
    #[serde(rename = "xtce:BinaryParameterType")]
    Binary(BinaryType),
    #[serde(rename = "xtce:ArrayParameterType")]
    Array(ArrayType),
}

#[derive(Debug, Serialize)]
pub enum ArgumentType {
    #[serde(rename = "xtce:IntegerArgumentType")]
    Integer(NumericType),
    #[serde(rename = "xtce:FloatArgumentType")]
    Float(NumericType),
    #[serde(rename = "xtce:EnumeratedArgumentType")]
    Enumerated(EnumeratedType),
    #[serde(rename = "xtce:StringArgumentType")]
    String(StringType),
    #[serde(rename = "xtce:BinaryArgumentType")]
    Binary(BinaryType),
    #[serde(rename = "xtce:ArrayArgumentType")]
    Array(ArrayType),
}

/// Content of `Integer*Type` and `Float*Type`.
///
/// Exactly one of the two encodings is set. A float type with an integer
/// encoding describes a raw integer with a calibration.
#[derive(Debug, Serialize, Default)]
pub struct NumericType {
    #[serde(rename = "@name")]
    pub name: String,

    #[serde(rename = "@sizeInBits", skip_serializing_if = "Option::is_none")]
    pub size_in_bits: Option<String>,

    #[serde(rename = "@initialValue", skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<String>,

    #[serde(rename = "@shortDescription", skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,

    /// `"true"` / `"false"`, integer types only.
    #[serde(rename = "@signed", skip_serializing_if = "Option::is_none")]
    pub signed: Option<String>,

    #[serde(rename = "xtce:ByteOrderList", skip_serializing_if = "Option::is_none")]
    pub byte_order_list: Option<ByteOrderList>,

    #[serde(rename = "xtce:UnitSet")]
    pub unit_set: UnitSet,

    #[serde(
        rename = "xtce:IntegerDataEncoding",
        skip_serializing_if = "Option::is_none"
    )]
    pub integer_data_encoding: Option<IntegerDataEncoding>,

    #[serde(
        rename = "xtce:FloatDataEncoding",
        skip_serializing_if = "Option::is_none"
    )]
    pub float_data_encoding: Option<FloatDataEncoding>,

    #[serde(rename = "xtce:DefaultAlarm", skip_serializing_if = "Option::is_none")]
    pub default_alarm: Option<DefaultAlarm>,

    #[serde(rename = "xtce:ValidRange", skip_serializing_if = "Option::is_none")]
    pub valid_range: Option<ValidRange>,
}

#[derive(Debug, Serialize)]
pub struct EnumeratedType {
    #[serde(rename = "@name")]
    pub name: String,

    /// The state name matching the default value, when there is one.
    #[serde(rename = "@initialValue", skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<String>,

    #[serde(rename = "@shortDescription", skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,

    #[serde(rename = "xtce:ByteOrderList", skip_serializing_if = "Option::is_none")]
    pub byte_order_list: Option<ByteOrderList>,

    #[serde(rename = "xtce:UnitSet")]
    pub unit_set: UnitSet,

    #[serde(rename = "xtce:IntegerDataEncoding")]
    pub integer_data_encoding: IntegerDataEncoding,

    #[serde(rename = "xtce:EnumerationList")]
    pub enumeration_list: EnumerationList,
}

#[derive(Debug, Serialize)]
pub struct StringType {
    #[serde(rename = "@name")]
    pub name: String,

    #[serde(rename = "@characterWidth")]
    pub character_width: String,

    #[serde(rename = "@initialValue", skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<String>,

    #[serde(rename = "@shortDescription", skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,

    #[serde(rename = "xtce:UnitSet")]
    pub unit_set: UnitSet,

    #[serde(rename = "xtce:StringDataEncoding")]
    pub string_data_encoding: StringDataEncoding,
}

#[derive(Debug, Serialize)]
pub struct BinaryType {
    #[serde(rename = "@name")]
    pub name: String,

    #[serde(rename = "@initialValue", skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<String>,

    #[serde(rename = "@shortDescription", skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,

    #[serde(rename = "xtce:UnitSet")]
    pub unit_set: UnitSet,

    #[serde(rename = "xtce:BinaryDataEncoding")]
    pub binary_data_encoding: BinaryDataEncoding,
}

/// A one-dimensional array of another type.
#[derive(Debug, Serialize)]
pub struct ArrayType {
    #[serde(rename = "@name")]
    pub name: String,

    #[serde(rename = "@shortDescription", skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,

    #[serde(rename = "@arrayTypeRef")]
    pub array_type_ref: String,

    #[serde(rename = "@numberOfDimensions")]
    pub number_of_dimensions: String,
}

// --- Encodings ---

#[derive(Debug, Serialize)]
pub struct IntegerDataEncoding {
    #[serde(rename = "@sizeInBits")]
    pub size_in_bits: String,

    /// `unsigned` or `twosComplement`.
    #[serde(rename = "@encoding")]
    pub encoding: String,

    #[serde(
        rename = "xtce:DefaultCalibrator",
        skip_serializing_if = "Option::is_none"
    )]
    pub default_calibrator: Option<DefaultCalibrator>,
}

#[derive(Debug, Serialize)]
pub struct FloatDataEncoding {
    #[serde(rename = "@sizeInBits")]
    pub size_in_bits: String,

    #[serde(rename = "@encoding")]
    pub encoding: String,

    #[serde(
        rename = "xtce:DefaultCalibrator",
        skip_serializing_if = "Option::is_none"
    )]
    pub default_calibrator: Option<DefaultCalibrator>,
}

#[derive(Debug, Serialize)]
pub struct StringDataEncoding {
    #[serde(rename = "@encoding")]
    pub encoding: String,

    #[serde(rename = "xtce:SizeInBits")]
    pub size_in_bits: StringSize,
}

/// `<SizeInBits><Fixed><FixedValue>n</FixedValue></Fixed></SizeInBits>`
#[derive(Debug, Serialize)]
pub struct StringSize {
    #[serde(rename = "xtce:Fixed")]
    pub fixed: FixedValue,
}

#[derive(Debug, Serialize)]
pub struct BinaryDataEncoding {
    #[serde(rename = "xtce:SizeInBits")]
    pub size_in_bits: FixedValue,
}

/// Any element whose only child is `<FixedValue>`.
#[derive(Debug, Serialize, Clone)]
pub struct FixedValue {
    #[serde(rename = "xtce:FixedValue")]
    pub fixed_value: String,
}

impl FixedValue {
    pub fn new(value: impl ToString) -> Self {
        Self {
            fixed_value: value.to_string(),
        }
    }
}

// --- Type details ---

#[derive(Debug, Serialize)]
pub struct ByteOrderList {
    #[serde(rename = "xtce:Byte")]
    pub bytes: Vec<Byte>,
}

#[derive(Debug, Serialize)]
pub struct Byte {
    #[serde(rename = "@byteSignificance")]
    pub byte_significance: String,
}

/// Always emitted; empty when the item has no units.
#[derive(Debug, Serialize, Default)]
pub struct UnitSet {
    #[serde(rename = "xtce:Unit", skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
}

/// `<Unit description="Celsius">C</Unit>`
#[derive(Debug, Serialize)]
pub struct Unit {
    #[serde(rename = "@description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "$text")]
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct DefaultCalibrator {
    #[serde(rename = "xtce:PolynomialCalibrator")]
    pub polynomial_calibrator: PolynomialCalibrator,
}

#[derive(Debug, Serialize)]
pub struct PolynomialCalibrator {
    #[serde(rename = "xtce:Term")]
    pub terms: Vec<Term>,
}

#[derive(Debug, Serialize)]
pub struct Term {
    #[serde(rename = "@coefficient")]
    pub coefficient: String,

    #[serde(rename = "@exponent")]
    pub exponent: String,
}

#[derive(Debug, Serialize)]
pub struct DefaultAlarm {
    #[serde(rename = "xtce:StaticAlarmRanges")]
    pub static_alarm_ranges: StaticAlarmRanges,
}

#[derive(Debug, Serialize)]
pub struct StaticAlarmRanges {
    #[serde(rename = "xtce:WarningRange")]
    pub warning_range: AlarmRange,

    #[serde(rename = "xtce:CriticalRange")]
    pub critical_range: AlarmRange,
}

#[derive(Debug, Serialize)]
pub struct AlarmRange {
    #[serde(rename = "@minInclusive")]
    pub min_inclusive: String,

    #[serde(rename = "@maxInclusive")]
    pub max_inclusive: String,
}

#[derive(Debug, Serialize)]
pub struct ValidRange {
    #[serde(rename = "@minInclusive")]
    pub min_inclusive: String,

    #[serde(rename = "@maxInclusive")]
    pub max_inclusive: String,
}

#[derive(Debug, Serialize)]
pub struct EnumerationList {
    #[serde(rename = "xtce:Enumeration")]
    pub enumerations: Vec<Enumeration>,
}

#[derive(Debug, Serialize)]
pub struct Enumeration {
    #[serde(rename = "@value")]
    pub value: String,

    #[serde(rename = "@label")]
    pub label: String,
}
