// crates/cmdtlm-rs/src/packets/conversion.rs

use super::value::format_float;

/// A polynomial `c0 + c1*x + c2*x^2 + ...` applied to a raw value.
#[derive(Debug, Clone, PartialEq)]
pub struct PolynomialConversion {
    /// Coefficients in ascending power order.
    pub coeffs: Vec<f64>,
}

impl PolynomialConversion {
    pub fn new(coeffs: Vec<f64>) -> Self {
        Self { coeffs }
    }

    /// Evaluates the polynomial at `x` (Horner's method).
    pub fn call(&self, x: f64) -> f64 {
        self.coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
    }
}

/// A conversion attached to an item as its read or write conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum Conversion {
    Polynomial(PolynomialConversion),
    /// Packet received time as floating point seconds since the Unix epoch.
    ReceivedTimeSeconds,
    /// Packet received time as a formatted local time string.
    ReceivedTimeFormatted,
    /// Number of times the packet has been received.
    ReceivedCount,
}

impl Conversion {
    pub fn as_polynomial(&self) -> Option<&PolynomialConversion> {
        match self {
            Conversion::Polynomial(p) => Some(p),
            _ => None,
        }
    }

    /// Configuration line that recreates this conversion, if it has one.
    /// The received-time conversions are implied by the packet keyword.
    pub fn to_config(&self, read: bool) -> Option<String> {
        let Conversion::Polynomial(poly) = self else {
            return None;
        };
        let keyword = if read {
            "POLY_READ_CONVERSION"
        } else {
            "POLY_WRITE_CONVERSION"
        };
        let coeffs: Vec<String> = poly.coeffs.iter().map(|c| format_float(*c)).collect();
        Some(format!("    {} {}\n", keyword, coeffs.join(" ")))
    }
}
