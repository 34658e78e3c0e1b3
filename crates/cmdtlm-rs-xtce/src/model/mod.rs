// crates/cmdtlm-rs-xtce/src/model/mod.rs

//! Internal `serde` data structures that map directly to the XTCE XML schema.
//!
//! Only the subset of XTCE that describes fixed-layout packets is modelled:
//! parameter/argument types, parameters, arguments, sequence containers and
//! meta commands. Every element carries the `xtce:` prefix bound on the
//! root `SpaceSystem`. These structs are serialized with `quick-xml` by the
//! builder and are not part of the public API.

use serde::Serialize;

pub mod containers;
pub mod types;

use containers::{ContainerSet, MetaCommandSet, ParameterSet};
use types::{ArgumentTypeSet, ParameterTypeSet};

pub const XTCE_NAMESPACE: &str = "http://www.omg.org/space/xtce";
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const XTCE_SCHEMA_LOCATION: &str =
    "http://www.omg.org/space/xtce http://www.omg.org/spec/XTCE/20061101/06-11-06.xsd";

/// The root element of an XTCE document, one per target.
#[derive(Debug, Serialize)]
#[serde(rename = "xtce:SpaceSystem")]
pub struct SpaceSystem {
    #[serde(rename = "@xmlns:xtce")]
    pub xmlns_xtce: String,

    #[serde(rename = "@xmlns:xsi")]
    pub xmlns_xsi: String,

    #[serde(rename = "@name")]
    pub name: String,

    #[serde(rename = "@xsi:schemaLocation")]
    pub xsi_schema_location: String,

    /// Always present, even for a target without telemetry.
    #[serde(rename = "xtce:TelemetryMetaData")]
    pub telemetry_meta_data: TelemetryMetaData,

    #[serde(
        rename = "xtce:CommandMetaData",
        skip_serializing_if = "Option::is_none"
    )]
    pub command_meta_data: Option<CommandMetaData>,
}

impl SpaceSystem {
    pub fn new(name: &str) -> Self {
        Self {
            xmlns_xtce: XTCE_NAMESPACE.into(),
            xmlns_xsi: XSI_NAMESPACE.into(),
            name: name.into(),
            xsi_schema_location: XTCE_SCHEMA_LOCATION.into(),
            telemetry_meta_data: TelemetryMetaData::default(),
            command_meta_data: None,
        }
    }
}

#[derive(Debug, Serialize, Default)]
pub struct TelemetryMetaData {
    #[serde(rename = "xtce:ParameterTypeSet")]
    pub parameter_type_set: ParameterTypeSet,

    #[serde(rename = "xtce:ParameterSet")]
    pub parameter_set: ParameterSet,

    #[serde(rename = "xtce:ContainerSet", skip_serializing_if = "Option::is_none")]
    pub container_set: Option<ContainerSet>,
}

#[derive(Debug, Serialize, Default)]
pub struct CommandMetaData {
    #[serde(rename = "xtce:ArgumentTypeSet")]
    pub argument_type_set: ArgumentTypeSet,

    #[serde(rename = "xtce:MetaCommandSet")]
    pub meta_command_set: MetaCommandSet,
}
