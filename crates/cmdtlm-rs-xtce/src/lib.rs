// crates/cmdtlm-rs-xtce/src/lib.rs

#![doc = "Imports and exports command and telemetry packet definitions as XTCE."]
#![doc = ""]
#![doc = "XTCE (XML Telemetric and Command Exchange) is the CCSDS interchange format"]
#![doc = "for spacecraft command and telemetry interfaces. This library converts"]
#![doc = "between XTCE documents and the `cmdtlm_rs::PacketMaps` model."]
#![doc = ""]
#![doc = "It supports:"]
#![doc = "- `import_xtce_str` / `import_xtce_file`: Building packets from an XTCE document."]
#![doc = "- `export_xtce_string`: Serializing the packets of one target into an XTCE string."]
#![doc = "- `export_xtce`: Writing one `<TARGET>/cmd_tlm/<target>.xtce` file per target."]

// --- Crate Modules ---

mod builder;
mod error;
mod importer;
mod model;
mod parser;

// --- Public API Re-exports ---

pub use builder::{export_xtce, export_xtce_string};
pub use error::XtceError;
pub use importer::{import_xtce_file, import_xtce_str};
