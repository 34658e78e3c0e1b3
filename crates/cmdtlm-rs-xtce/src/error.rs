// crates/cmdtlm-rs-xtce/src/error.rs

use cmdtlm_rs::PacketError;
use core::fmt;
use core::str::Utf8Error;
use hex::FromHexError;
use quick_xml::Error as XmlError;
use quick_xml::errors::serialize::SeError;
use quick_xml::escape::EscapeError;
use thiserror::Error;

/// Errors that can occur while importing or exporting an XTCE document.
///
/// Any error aborts the whole document: the importer only hands packets to
/// the caller once every element has been processed.
#[derive(Debug, Error)]
pub enum XtceError {
    /// The document is not well-formed XML.
    #[error("XML error: {0}")]
    XmlReading(#[from] XmlError),

    /// An error from the underlying `quick-xml` serializer.
    #[error("XML serialization error: {0}")]
    XmlSerializing(#[from] SeError),

    /// An attribute value or text node contained an invalid escape sequence.
    #[error("XML escape error: {0}")]
    Escape(#[from] EscapeError),

    /// Element names, attribute values or text were not valid UTF-8.
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] Utf8Error),

    /// Reading or writing an XTCE file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error occurred while writing the XML header.
    #[error("Formatting error: {0}")]
    Fmt(#[from] fmt::Error),

    /// A `0x...` initial value was not valid hex.
    #[error("Invalid hex value: {0}")]
    Hex(#[from] FromHexError),

    /// The packet model rejected an item built from the document.
    #[error(transparent)]
    Packet(#[from] PacketError),

    /// The document has no root element.
    #[error("XTCE document has no root element")]
    EmptyDocument,

    /// An element was still open when the document ended.
    #[error("Element <{0}> is not closed")]
    UnclosedElement(String),

    /// No `SpaceSystem` name and no target override were given.
    #[error("XTCE document does not name a SpaceSystem target")]
    MissingTarget,

    /// A mandatory attribute is missing.
    #[error("Element <{element}> is missing attribute '{attribute}'")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },

    /// A `parameterRef`, `argumentTypeRef`, `arrayTypeRef`, ... does not
    /// name anything defined earlier in the document.
    #[error("{kind} {name} not found")]
    UnresolvedReference { kind: &'static str, name: String },

    /// A `BaseContainer` or `BaseMetaCommand` names an unknown packet.
    #[error("Unknown {kind}: {name}")]
    UnknownBase { kind: &'static str, name: String },

    /// The referenced type never declared a data encoding.
    #[error("Referenced Parameter/Argument has no xtce_encoding: {0}")]
    MissingEncoding(String),

    /// A numeric attribute or text node could not be parsed.
    #[error("Invalid {what} value '{value}'")]
    InvalidNumber { what: &'static str, value: String },

    /// A type-level element appeared outside of a type definition.
    #[error("<{0}> found outside of a type definition")]
    NoCurrentType(String),

    /// An entry or comparison appeared outside of a container or command.
    #[error("<{0}> found outside of a container or command")]
    NoCurrentPacket(String),

    /// A construct the importer does not handle, such as `nextEntry`.
    #[error("{0}")]
    Unsupported(String),

    /// Two packets of the same target define an item of the same name
    /// differently, so a single shared type cannot describe both.
    #[error("Item {name} is defined differently in packets {first} and {second}")]
    DivergentItem {
        name: String,
        first: String,
        second: String,
    },
}

impl XtceError {
    pub(crate) fn missing_attribute(element: &str, attribute: &'static str) -> Self {
        XtceError::MissingAttribute {
            element: element.to_string(),
            attribute,
        }
    }

    pub(crate) fn invalid_number(what: &'static str, value: &str) -> Self {
        XtceError::InvalidNumber {
            what,
            value: value.to_string(),
        }
    }
}
