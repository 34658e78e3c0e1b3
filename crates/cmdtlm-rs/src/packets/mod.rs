// crates/cmdtlm-rs/src/packets/mod.rs

//! The packet/item model.

pub mod conversion;
pub mod error;
pub mod limits;
pub mod packet;
pub mod packet_item;
pub mod packet_maps;
pub mod types;
pub mod value;

pub use conversion::{Conversion, PolynomialConversion};
pub use error::PacketError;
pub use limits::{DEFAULT_LIMITS_SET, Limits, LimitsState, LimitsValues};
pub use packet::{Packet, RECEIVED_ITEMS, is_received_item};
pub use packet_item::PacketItem;
pub use packet_maps::PacketMaps;
pub use types::{CmdOrTlm, DataType, Endianness, Overflow, StateColor};
pub use value::{ItemRange, Value};
