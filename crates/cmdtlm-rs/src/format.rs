// crates/cmdtlm-rs/src/format.rs

//! A printf-compatible formatter.
//!
//! Used to validate `FORMAT_STRING` definitions against an item's data type
//! and to expand macro item names such as `%s%d` or `%02d_%s`.

use crate::packets::Value;
use thiserror::Error;

/// Errors produced while applying a format string.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormatError {
    #[error("too few arguments")]
    TooFewArguments,

    #[error("malformed format string - %{0}")]
    UnknownConversion(char),

    #[error("incomplete format specifier; use %% (double %) instead")]
    Incomplete,

    #[error("invalid value for {conversion}: {value}")]
    InvalidArgument { conversion: char, value: String },
}

#[derive(Debug, Default, Clone, Copy)]
struct Spec {
    left: bool,
    plus: bool,
    space: bool,
    zero: bool,
    alt: bool,
    width: usize,
    precision: Option<usize>,
}

/// Returns true if `fmt` contains at least one conversion specifier.
pub fn has_conversion(fmt: &str) -> bool {
    let mut chars = fmt.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            continue;
        }
        for next in chars.by_ref() {
            if "bBdiouxXeEfgGaAcps%".contains(next) {
                return true;
            }
        }
    }
    false
}

/// Formats `args` according to the printf-style `fmt`.
pub fn sprintf(fmt: &str, args: &[Value]) -> Result<String, FormatError> {
    let mut out = String::with_capacity(fmt.len() + 16);
    let mut args = args.iter();
    let mut chars = fmt.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let mut spec = Spec::default();
        // Flags
        while let Some(&f) = chars.peek() {
            match f {
                '-' => spec.left = true,
                '+' => spec.plus = true,
                ' ' => spec.space = true,
                '0' => spec.zero = true,
                '#' => spec.alt = true,
                _ => break,
            }
            chars.next();
        }
        // Width
        while let Some(&d) = chars.peek() {
            match d.to_digit(10) {
                Some(v) => {
                    spec.width = spec.width * 10 + v as usize;
                    chars.next();
                }
                None => break,
            }
        }
        // Precision
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut precision = 0usize;
            while let Some(&d) = chars.peek() {
                match d.to_digit(10) {
                    Some(v) => {
                        precision = precision * 10 + v as usize;
                        chars.next();
                    }
                    None => break,
                }
            }
            spec.precision = Some(precision);
        }

        let conversion = chars.next().ok_or(FormatError::Incomplete)?;
        if conversion == '%' {
            out.push('%');
            continue;
        }
        if !"bBdiouxXeEfgGaAcps".contains(conversion) {
            return Err(FormatError::UnknownConversion(conversion));
        }
        let arg = args.next().ok_or(FormatError::TooFewArguments)?;
        let body = match conversion {
            'd' | 'i' | 'u' => {
                let v = int_arg(conversion, arg)?;
                signed(&spec, v < 0, v.unsigned_abs().to_string())
            }
            'x' | 'X' | 'o' | 'b' | 'B' => {
                let v = int_arg(conversion, arg)?;
                let magnitude = v.unsigned_abs();
                let (digits, prefix) = match conversion {
                    'x' => (format!("{:x}", magnitude), "0x"),
                    'X' => (format!("{:X}", magnitude), "0X"),
                    'o' => (format!("{:o}", magnitude), "0"),
                    'b' => (format!("{:b}", magnitude), "0b"),
                    _ => (format!("{:b}", magnitude), "0B"),
                };
                let digits = if spec.alt && magnitude != 0 {
                    format!("{}{}", prefix, digits)
                } else {
                    digits
                };
                signed(&spec, v < 0, digits)
            }
            'f' | 'e' | 'E' | 'g' | 'G' | 'a' | 'A' => {
                let v = float_arg(conversion, arg)?;
                let precision = spec.precision.unwrap_or(6);
                let digits = if v.is_nan() {
                    "NaN".to_string()
                } else if v.is_infinite() {
                    "Inf".to_string()
                } else {
                    match conversion {
                        'f' => format!("{:.*}", precision, v.abs()),
                        'e' | 'a' => c_exponent(v.abs(), precision, false),
                        'E' | 'A' => c_exponent(v.abs(), precision, true),
                        _ => c_general(v.abs(), precision, conversion == 'G', spec.alt),
                    }
                };
                signed(&spec, v.is_sign_negative() && !v.is_nan(), digits)
            }
            'c' => match arg {
                Value::Int(i) => u32::try_from(*i)
                    .ok()
                    .and_then(char::from_u32)
                    .map(String::from)
                    .ok_or_else(|| invalid(conversion, arg))?,
                Value::Str(s) => s.chars().next().map(String::from).unwrap_or_default(),
                _ => return Err(invalid(conversion, arg)),
            },
            // 's' and 'p'
            _ => {
                let text = arg.to_string();
                match spec.precision {
                    Some(p) => text.chars().take(p).collect(),
                    None => text,
                }
            }
        };
        pad_into(&mut out, &spec, body, matches!(conversion, 's' | 'p' | 'c'));
    }
    Ok(out)
}

fn invalid(conversion: char, arg: &Value) -> FormatError {
    FormatError::InvalidArgument {
        conversion,
        value: arg.to_string(),
    }
}

fn int_arg(conversion: char, arg: &Value) -> Result<i128, FormatError> {
    match arg {
        Value::Int(i) => Ok(*i),
        Value::Float(f) if f.is_finite() => Ok(f.floor() as i128),
        Value::Str(s) => crate::packets::value::parse_int(s).ok_or_else(|| invalid(conversion, arg)),
        _ => Err(invalid(conversion, arg)),
    }
}

fn float_arg(conversion: char, arg: &Value) -> Result<f64, FormatError> {
    match arg {
        Value::Int(i) => Ok(*i as f64),
        Value::Float(f) => Ok(*f),
        Value::Str(s) => {
            crate::packets::value::parse_float(s).ok_or_else(|| invalid(conversion, arg))
        }
        _ => Err(invalid(conversion, arg)),
    }
}

/// Prepends the sign character selected by the flags.
fn signed(spec: &Spec, negative: bool, digits: String) -> String {
    if negative {
        format!("-{}", digits)
    } else if spec.plus {
        format!("+{}", digits)
    } else if spec.space {
        format!(" {}", digits)
    } else {
        digits
    }
}

fn pad_into(out: &mut String, spec: &Spec, body: String, textual: bool) {
    let len = body.chars().count();
    if len >= spec.width {
        out.push_str(&body);
        return;
    }
    let fill = spec.width - len;
    if spec.left {
        out.push_str(&body);
        out.extend(std::iter::repeat_n(' ', fill));
    } else if spec.zero && !textual {
        // Zeros go between the sign and the digits
        let (sign, digits) = match body.chars().next() {
            Some(c @ ('-' | '+' | ' ')) => (Some(c), &body[1..]),
            _ => (None, body.as_str()),
        };
        if let Some(s) = sign {
            out.push(s);
        }
        out.extend(std::iter::repeat_n('0', fill));
        out.push_str(digits);
    } else {
        out.extend(std::iter::repeat_n(' ', fill));
        out.push_str(&body);
    }
}

/// C-style `%e`: mantissa with `precision` digits and a signed two-digit exponent.
fn c_exponent(v: f64, precision: usize, upper: bool) -> String {
    let rust = format!("{:.*e}", precision, v);
    let (mantissa, exp) = rust.split_once('e').unwrap_or((rust.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let sign = if exp < 0 { '-' } else { '+' };
    let e = if upper { 'E' } else { 'e' };
    format!("{}{}{}{:02}", mantissa, e, sign, exp.abs())
}

/// C-style `%g`: shortest of fixed or exponent notation, trailing zeros removed.
fn c_general(v: f64, precision: usize, upper: bool, alt: bool) -> String {
    let p = precision.max(1);
    if v == 0.0 {
        return if alt {
            format!("{:.*}", p - 1, 0.0)
        } else {
            "0".to_string()
        };
    }
    // Exponent as produced by %e at precision p - 1, after rounding
    let sci = format!("{:.*e}", p - 1, v);
    let exp: i32 = sci
        .split_once('e')
        .and_then(|(_, e)| e.parse().ok())
        .unwrap_or(0);
    let text = if exp < -4 || exp >= p as i32 {
        c_exponent(v, p - 1, upper)
    } else {
        let decimals = (p as i32 - 1 - exp).max(0) as usize;
        format!("{:.*}", decimals, v)
    };
    if alt {
        return text;
    }
    strip_trailing_zeros(&text)
}

fn strip_trailing_zeros(text: &str) -> String {
    let (mantissa, exponent) = match text.find(['e', 'E']) {
        Some(pos) => (&text[..pos], &text[pos..]),
        None => (text, ""),
    };
    if !mantissa.contains('.') {
        return text.to_string();
    }
    let trimmed = mantissa.trim_end_matches('0').trim_end_matches('.');
    format!("{}{}", trimmed, exponent)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Value {
        Value::Str(v.to_string())
    }

    #[test]
    fn test_integer_conversions() {
        assert_eq!(sprintf("%d", &[Value::Int(42)]).unwrap(), "42");
        assert_eq!(sprintf("%05d", &[Value::Int(-42)]).unwrap(), "-0042");
        assert_eq!(sprintf("%-4d|", &[Value::Int(7)]).unwrap(), "7   |");
        assert_eq!(sprintf("0x%04X", &[Value::Int(0xBEEF)]).unwrap(), "0xBEEF");
        assert_eq!(sprintf("%#x", &[Value::Int(255)]).unwrap(), "0xff");
        assert_eq!(sprintf("%d", &[Value::Float(0.0)]).unwrap(), "0");
    }

    #[test]
    fn test_float_conversions() {
        assert_eq!(sprintf("%0.6f", &[Value::Float(1.5)]).unwrap(), "1.500000");
        assert_eq!(sprintf("%.2f", &[Value::Int(3)]).unwrap(), "3.00");
        assert_eq!(sprintf("%e", &[Value::Float(1500.0)]).unwrap(), "1.500000e+03");
        assert_eq!(sprintf("%g", &[Value::Float(0.0001)]).unwrap(), "0.0001");
        assert_eq!(sprintf("%g", &[Value::Float(1.0e10)]).unwrap(), "1e+10");
        assert_eq!(sprintf("%g", &[Value::Float(2.5)]).unwrap(), "2.5");
    }

    #[test]
    fn test_string_conversions() {
        assert_eq!(sprintf("%s%d", &[s("TEMP"), Value::Int(1)]).unwrap(), "TEMP1");
        assert_eq!(sprintf("%02d_%s", &[Value::Int(8), s("BIT")]).unwrap(), "08_BIT");
        assert_eq!(sprintf("%5s|", &[s("ab")]).unwrap(), "   ab|");
        assert_eq!(sprintf("%.3s", &[s("Hello")]).unwrap(), "Hel");
        assert_eq!(sprintf("100%%", &[]).unwrap(), "100%");
    }

    #[test]
    fn test_invalid_formats() {
        assert_eq!(
            sprintf("%d %d", &[Value::Int(0)]),
            Err(FormatError::TooFewArguments)
        );
        assert!(matches!(
            sprintf("%d", &[s("Hello")]),
            Err(FormatError::InvalidArgument { conversion: 'd', .. })
        ));
        assert!(matches!(
            sprintf("%f", &[s("Hello")]),
            Err(FormatError::InvalidArgument { .. })
        ));
        assert_eq!(sprintf("%q", &[Value::Int(1)]), Err(FormatError::UnknownConversion('q')));
        assert_eq!(sprintf("abc%", &[Value::Int(1)]), Err(FormatError::Incomplete));
    }

    #[test]
    fn test_has_conversion() {
        assert!(has_conversion("%5.2f"));
        assert!(has_conversion("value: %s"));
        assert!(!has_conversion("no conversions"));
    }
}
