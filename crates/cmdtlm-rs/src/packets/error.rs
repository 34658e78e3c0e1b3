// crates/cmdtlm-rs/src/packets/error.rs

use super::types::DataType;
use crate::format::FormatError;
use thiserror::Error;

/// Errors raised by the packet model itself, independent of where the
/// definition came from (configuration keywords or an XTCE document).
#[derive(Debug, Error, PartialEq)]
pub enum PacketError {
    /// No item with this name exists in the packet.
    #[error("Unknown item: {name}")]
    UnknownItem { name: String },

    /// A rename would overwrite an existing item.
    #[error("Item {name} already exists")]
    ItemExists { name: String },

    /// The item's layout or attributes violate a model invariant.
    #[error("{name}: {reason}")]
    InvalidItem { name: String, reason: String },

    /// A value could not be coerced to the item's data type.
    #[error("{name}: Invalid value: {value} for data type: {data_type}")]
    InvalidValue {
        name: String,
        value: String,
        data_type: String,
    },

    /// A fixed-offset append was attempted after a variably sized item.
    #[error("Can't append an item after a variably sized item")]
    AppendAfterVariableSize,

    /// A token did not name a known enumeration member.
    #[error("Unknown {kind}: {token}")]
    UnknownToken { kind: &'static str, token: String },

    /// An integer item too wide for a 128 bit value.
    #[error("No integer range for a {bit_size} bit {data_type}")]
    NoIntegerRange { data_type: DataType, bit_size: i64 },

    /// A symbolic constant such as `MAX_UINT8` was not recognized.
    #[error("Could not convert constant: {0}")]
    UnknownConstant(String),

    /// A format string failed to apply.
    #[error(transparent)]
    Format(#[from] FormatError),
}

impl PacketError {
    pub(crate) fn invalid_item(name: &str, reason: impl Into<String>) -> Self {
        PacketError::InvalidItem {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
