#![doc = "Bit-level command and telemetry packet definitions."]
#![doc = ""]
#![doc = "This crate holds the `Packet`/`PacketItem` model together with the"]
#![doc = "keyword parsers that build it from a tokenized configuration stream:"]
#![doc = "- `packets`: packets, items, limits, states, conversions and the two-level packet maps."]
#![doc = "- `parsers`: one parser per configuration keyword plus the `PacketConfig` session."]
#![doc = "- `registry`: name to factory lookup for limits responses and packet processors."]

#[macro_use]
pub mod log;

// --- Foundation Modules ---
pub mod config;
pub mod format;
pub mod registry;

// --- Model and Parsers ---
pub mod packets;
pub mod parsers;

// --- Top-level Exports ---
pub use config::{ConfigError, ConfigLine};
pub use packets::{
    CmdOrTlm, Conversion, DataType, Endianness, ItemRange, Limits, LimitsState, LimitsValues,
    Overflow, Packet, PacketError, PacketItem, PacketMaps, PolynomialConversion, StateColor,
    Value,
};
pub use parsers::PacketConfig;
pub use registry::{LimitsResponse, Processor, Registry};
