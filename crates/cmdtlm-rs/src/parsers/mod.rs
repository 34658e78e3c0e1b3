// crates/cmdtlm-rs/src/parsers/mod.rs

//! Keyword parsers.
//!
//! Each parser consumes exactly one tokenized configuration line and
//! mutates the packet or item it applies to. State that spans several
//! lines (the current packet and item, an open macro bracket) lives in
//! [`PacketConfig`].

pub mod format_string_parser;
pub mod limits_parser;
pub mod limits_response_parser;
pub mod macro_parser;
pub mod packet_config;
pub mod packet_item_parser;
pub mod packet_parser;
pub mod processor_parser;
pub mod state_parser;

pub use format_string_parser::FormatStringParser;
pub use limits_parser::LimitsParser;
pub use limits_response_parser::LimitsResponseParser;
pub use macro_parser::MacroParser;
pub use packet_config::PacketConfig;
pub use packet_item_parser::PacketItemParser;
pub use packet_parser::PacketParser;
pub use processor_parser::ProcessorParser;
pub use state_parser::StateParser;

use crate::config::{ConfigError, ConfigLine};
use crate::packets::{Packet, PacketError, PacketItem};

/// Wraps a model error as a configuration error for `line`.
pub(crate) fn model_error<'a>(
    line: &'a ConfigLine,
    usage: &'a str,
) -> impl Fn(PacketError) -> ConfigError + 'a {
    move |err| line.error(err.to_string(), usage)
}

/// Looks up the item a keyword applies to.
pub(crate) fn current_item<'a>(
    line: &ConfigLine,
    packet: &'a mut Packet,
    item_name: &str,
) -> Result<&'a mut PacketItem, ConfigError> {
    packet
        .get_item_mut(item_name)
        .map_err(|err| line.error(err.to_string(), ""))
}
