// crates/cmdtlm-rs/src/packets/types.rs

use super::error::PacketError;
use core::fmt;
use core::str::FromStr;

/// Data type of a packet item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataType {
    Int,
    Uint,
    Float,
    String,
    Block,
    /// Computed value with no bits in the packet buffer.
    Derived,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Int => "INT",
            DataType::Uint => "UINT",
            DataType::Float => "FLOAT",
            DataType::String => "STRING",
            DataType::Block => "BLOCK",
            DataType::Derived => "DERIVED",
        }
    }

    /// True for `STRING` and `BLOCK`, whose values are kept as literal text or bytes.
    pub fn is_string_like(&self) -> bool {
        matches!(self, DataType::String | DataType::Block)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, DataType::Int | DataType::Uint)
    }
}

impl FromStr for DataType {
    type Err = PacketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INT" => Ok(DataType::Int),
            "UINT" => Ok(DataType::Uint),
            "FLOAT" => Ok(DataType::Float),
            "STRING" => Ok(DataType::String),
            "BLOCK" => Ok(DataType::Block),
            "DERIVED" => Ok(DataType::Derived),
            _ => Err(PacketError::UnknownToken {
                kind: "data_type",
                token: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Byte order of a multi-byte item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Endianness {
    #[default]
    BigEndian,
    LittleEndian,
}

impl Endianness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endianness::BigEndian => "BIG_ENDIAN",
            Endianness::LittleEndian => "LITTLE_ENDIAN",
        }
    }
}

impl FromStr for Endianness {
    type Err = PacketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BIG_ENDIAN" => Ok(Endianness::BigEndian),
            "LITTLE_ENDIAN" => Ok(Endianness::LittleEndian),
            _ => Err(PacketError::UnknownToken {
                kind: "endianness",
                token: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Endianness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How out-of-range writes are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overflow {
    #[default]
    Error,
    ErrorAllowHex,
    Truncate,
    Saturate,
}

impl Overflow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Overflow::Error => "ERROR",
            Overflow::ErrorAllowHex => "ERROR_ALLOW_HEX",
            Overflow::Truncate => "TRUNCATE",
            Overflow::Saturate => "SATURATE",
        }
    }
}

impl FromStr for Overflow {
    type Err = PacketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ERROR" => Ok(Overflow::Error),
            "ERROR_ALLOW_HEX" => Ok(Overflow::ErrorAllowHex),
            "TRUNCATE" => Ok(Overflow::Truncate),
            "SATURATE" => Ok(Overflow::Saturate),
            _ => Err(PacketError::UnknownToken {
                kind: "overflow type",
                token: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Overflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Limits color attached to an enumerated state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateColor {
    Green,
    Yellow,
    Red,
}

impl StateColor {
    pub const ALL: [StateColor; 3] = [StateColor::Green, StateColor::Yellow, StateColor::Red];

    pub fn as_str(&self) -> &'static str {
        match self {
            StateColor::Green => "GREEN",
            StateColor::Yellow => "YELLOW",
            StateColor::Red => "RED",
        }
    }
}

impl FromStr for StateColor {
    type Err = PacketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GREEN" => Ok(StateColor::Green),
            "YELLOW" => Ok(StateColor::Yellow),
            "RED" => Ok(StateColor::Red),
            _ => Err(PacketError::UnknownToken {
                kind: "state color",
                token: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for StateColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a packet is a command or a telemetry packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdOrTlm {
    Command,
    Telemetry,
}

impl CmdOrTlm {
    /// Capitalized form used in diagnostics ("Command Packet ...").
    pub fn label(&self) -> &'static str {
        match self {
            CmdOrTlm::Command => "Command",
            CmdOrTlm::Telemetry => "Telemetry",
        }
    }

    /// Keyword form used in configuration text.
    pub fn keyword(&self) -> &'static str {
        match self {
            CmdOrTlm::Command => "COMMAND",
            CmdOrTlm::Telemetry => "TELEMETRY",
        }
    }
}

impl fmt::Display for CmdOrTlm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}
