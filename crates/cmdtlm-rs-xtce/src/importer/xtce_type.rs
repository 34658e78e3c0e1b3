// crates/cmdtlm-rs-xtce/src/importer/xtce_type.rs

use crate::error::XtceError;
use crate::parser::Element;
use cmdtlm_rs::packets::value::parse_int;
use cmdtlm_rs::{DataType, Endianness, PolynomialConversion, Value};
use std::collections::BTreeMap;

/// The declared kind of a `*ParameterType` / `*ArgumentType` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TypeKind {
    Integer,
    Float,
    String,
    Binary,
    Enumerated,
    Array,
}

impl TypeKind {
    /// Maps an element name such as `IntegerArgumentType` to its kind.
    pub fn from_element(name: &str) -> Option<Self> {
        let base = name
            .strip_suffix("ParameterType")
            .or_else(|| name.strip_suffix("ArgumentType"))?;
        match base {
            "Integer" => Some(TypeKind::Integer),
            "Float" => Some(TypeKind::Float),
            "String" => Some(TypeKind::String),
            "Binary" => Some(TypeKind::Binary),
            "Enumerated" => Some(TypeKind::Enumerated),
            "Array" => Some(TypeKind::Array),
            _ => None,
        }
    }
}

/// The `*DataEncoding` child that decides the item data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Encoding {
    Integer,
    Float,
    String,
    Binary,
}

impl Encoding {
    pub fn from_element(name: &str) -> Option<Self> {
        match name {
            "IntegerDataEncoding" => Some(Encoding::Integer),
            "FloatDataEncoding" => Some(Encoding::Float),
            "StringDataEncoding" => Some(Encoding::String),
            "BinaryDataEncoding" => Some(Encoding::Binary),
            _ => None,
        }
    }
}

/// Everything gathered from one type definition and its children.
#[derive(Debug, Clone)]
pub(crate) struct XtceType {
    pub name: String,
    pub kind: TypeKind,
    pub encoding: Option<Encoding>,
    /// `signed` attribute of the type, `"true"` or `"false"`.
    pub signed: Option<String>,
    /// `encoding` attribute of the data encoding, e.g. `unsigned`.
    pub encoding_name: Option<String>,
    pub size_in_bits: Option<i64>,
    pub endianness: Endianness,
    pub short_description: Option<String>,
    pub initial_value: Option<String>,
    pub units: Option<String>,
    pub units_full: Option<String>,
    pub conversion: Option<PolynomialConversion>,
    /// `[red_low, yellow_low, yellow_high, red_high]`
    pub limits: Option<[f64; 4]>,
    pub min_inclusive: Option<String>,
    pub max_inclusive: Option<String>,
    pub states: Option<BTreeMap<String, Value>>,
    pub array_type_ref: Option<String>,
}

impl XtceType {
    /// Starts a type from its element. Encodings and sizes are the implied
    /// defaults until a data encoding child overrides them.
    pub fn new(element: &Element, kind: TypeKind) -> Result<Self, XtceError> {
        let name = element.required_attr("name")?.to_string();
        let (encoding, size_in_bits) = match kind {
            TypeKind::Enumerated => (Some(Encoding::Integer), Some(8)),
            TypeKind::Integer => (Some(Encoding::Integer), Some(32)),
            TypeKind::Float => (Some(Encoding::Float), Some(32)),
            TypeKind::String => (Some(Encoding::String), None),
            TypeKind::Binary => (Some(Encoding::Binary), Some(8)),
            TypeKind::Array => (None, None),
        };
        let size_in_bits = match element.attr("sizeInBits") {
            Some(text) => Some(parse_bits(text)?),
            None => size_in_bits,
        };
        Ok(Self {
            name,
            kind,
            encoding,
            signed: element.attr("signed").map(str::to_string),
            encoding_name: None,
            size_in_bits,
            endianness: Endianness::BigEndian,
            short_description: element.attr("shortDescription").map(str::to_string),
            initial_value: element.attr("initialValue").map(str::to_string),
            units: None,
            units_full: None,
            conversion: None,
            limits: None,
            min_inclusive: None,
            max_inclusive: None,
            states: None,
            array_type_ref: element.attr("arrayTypeRef").map(str::to_string),
        })
    }

    /// Applies a `*DataEncoding` element. A missing `sizeInBits` means 8.
    pub fn set_encoding(&mut self, element: &Element, encoding: Encoding) -> Result<(), XtceError> {
        self.encoding = Some(encoding);
        if let Some(name) = element.attr("encoding") {
            self.encoding_name = Some(name.to_string());
        }
        self.size_in_bits = Some(match element.attr("sizeInBits") {
            Some(text) => parse_bits(text)?,
            None => 8,
        });
        Ok(())
    }

    /// Item data type implied by the encoding.
    pub fn data_type(&self) -> Option<DataType> {
        Some(match self.encoding? {
            Encoding::Integer => {
                if self.signed.as_deref() == Some("false")
                    || self.encoding_name.as_deref() == Some("unsigned")
                {
                    DataType::Uint
                } else {
                    DataType::Int
                }
            }
            Encoding::Float => DataType::Float,
            Encoding::String => DataType::String,
            Encoding::Binary => DataType::Block,
        })
    }

    /// Appends one `<Unit>`. Multiple units are joined with `/`.
    pub fn add_unit(&mut self, unit: &Element) {
        let mut units = unit.text.clone();
        let mut description = unit.attr("description").unwrap_or_default().to_string();
        if description.is_empty() {
            description = units.clone();
        }
        if units.is_empty() {
            units = description.clone();
        }
        if let Some(power) = unit.attr("power") {
            units = format!("{}^{}", units, power);
        }
        self.units = Some(match self.units.take() {
            Some(existing) if !existing.is_empty() => format!("{}/{}", existing, units),
            _ => units,
        });
        self.units_full = Some(match self.units_full.take() {
            Some(existing) if !existing.is_empty() => format!("{}/{}", existing, description),
            _ => description,
        });
    }

    /// Sets the coefficient of one polynomial `<Term>`. Missing lower
    /// order terms are zero.
    pub fn add_term(&mut self, exponent: usize, coefficient: f64) {
        let conversion = self
            .conversion
            .get_or_insert_with(|| PolynomialConversion::new(Vec::new()));
        if conversion.coeffs.len() <= exponent {
            conversion.coeffs.resize(exponent + 1, 0.0);
        }
        conversion.coeffs[exponent] = coefficient;
    }

    /// Sets one bound of the DEFAULT limits set.
    pub fn set_limit(&mut self, index: usize, value: f64) {
        self.limits.get_or_insert([0.0; 4])[index] = value;
    }

    pub fn add_state(&mut self, label: &str, value: &str) -> Result<(), XtceError> {
        let value = parse_int(value).ok_or_else(|| XtceError::invalid_number("Enumeration", value))?;
        self.states
            .get_or_insert_with(BTreeMap::new)
            .insert(label.to_string(), Value::Int(value));
        Ok(())
    }
}

fn parse_bits(text: &str) -> Result<i64, XtceError> {
    text.trim()
        .parse()
        .map_err(|_| XtceError::invalid_number("sizeInBits", text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_document;

    #[test]
    fn test_kind_from_element_name() {
        assert_eq!(
            TypeKind::from_element("EnumeratedArgumentType"),
            Some(TypeKind::Enumerated)
        );
        assert_eq!(
            TypeKind::from_element("ArrayParameterType"),
            Some(TypeKind::Array)
        );
        assert_eq!(TypeKind::from_element("AggregateParameterType"), None);
    }

    #[test]
    fn test_encoding_decides_data_type() {
        let element = parse_document(r#"<IntegerParameterType name="T"/>"#).unwrap();
        let mut t = XtceType::new(&element, TypeKind::Integer).unwrap();
        assert_eq!(t.size_in_bits, Some(32));
        assert_eq!(t.data_type(), Some(DataType::Int));

        let encoding =
            parse_document(r#"<IntegerDataEncoding encoding="unsigned"/>"#).unwrap();
        t.set_encoding(&encoding, Encoding::Integer).unwrap();
        assert_eq!(t.size_in_bits, Some(8));
        assert_eq!(t.data_type(), Some(DataType::Uint));

        let array = parse_document(r#"<ArrayParameterType name="A" arrayTypeRef="T"/>"#).unwrap();
        let a = XtceType::new(&array, TypeKind::Array).unwrap();
        assert_eq!(a.data_type(), None);
        assert_eq!(a.array_type_ref.as_deref(), Some("T"));
    }

    #[test]
    fn test_units_are_joined() {
        let element = parse_document(r#"<FloatParameterType name="T"/>"#).unwrap();
        let mut t = XtceType::new(&element, TypeKind::Float).unwrap();
        t.add_unit(&parse_document(r#"<Unit description="Meters">m</Unit>"#).unwrap());
        t.add_unit(&parse_document(r#"<Unit power="2">s</Unit>"#).unwrap());
        assert_eq!(t.units.as_deref(), Some("m/s^2"));
        assert_eq!(t.units_full.as_deref(), Some("Meters/s"));
    }

    #[test]
    fn test_terms_are_zero_padded() {
        let element = parse_document(r#"<FloatParameterType name="T"/>"#).unwrap();
        let mut t = XtceType::new(&element, TypeKind::Float).unwrap();
        t.add_term(2, 0.5);
        t.add_term(0, 10.0);
        assert_eq!(t.conversion.unwrap().coeffs, vec![10.0, 0.0, 0.5]);
    }
}
