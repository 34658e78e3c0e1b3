// crates/cmdtlm-rs-xtce/src/model/containers.rs

//! Contains model structs for parameters, sequence containers and meta commands.

use super::types::FixedValue;
use serde::Serialize;

// --- Telemetry ---

#[derive(Debug, Serialize, Default)]
pub struct ParameterSet {
    #[serde(rename = "xtce:Parameter")]
    pub parameters: Vec<Parameter>,
}

/// `<Parameter name="TEMP1" parameterTypeRef="TEMP1_Type"/>`
#[derive(Debug, Serialize)]
pub struct Parameter {
    #[serde(rename = "@name")]
    pub name: String,

    #[serde(rename = "@parameterTypeRef")]
    pub parameter_type_ref: String,
}

#[derive(Debug, Serialize, Default)]
pub struct ContainerSet {
    #[serde(rename = "xtce:SequenceContainer")]
    pub containers: Vec<SequenceContainer>,
}

/// A telemetry packet. Every packet is written as an abstract `_Base`
/// container holding the entries plus a concrete container that inherits
/// from it and carries the identification criteria.
#[derive(Debug, Serialize)]
pub struct SequenceContainer {
    #[serde(rename = "@name")]
    pub name: String,

    #[serde(rename = "@shortDescription", skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,

    #[serde(rename = "@abstract", skip_serializing_if = "Option::is_none")]
    pub is_abstract: Option<String>,

    #[serde(rename = "xtce:EntryList")]
    pub entry_list: EntryList,

    #[serde(rename = "xtce:BaseContainer", skip_serializing_if = "Option::is_none")]
    pub base_container: Option<BaseContainer>,
}

#[derive(Debug, Serialize)]
pub struct BaseContainer {
    #[serde(rename = "@containerRef")]
    pub container_ref: String,

    #[serde(
        rename = "xtce:RestrictionCriteria",
        skip_serializing_if = "Option::is_none"
    )]
    pub restriction_criteria: Option<RestrictionCriteria>,
}

#[derive(Debug, Serialize)]
pub struct RestrictionCriteria {
    #[serde(rename = "xtce:ComparisonList")]
    pub comparison_list: ComparisonList,
}

#[derive(Debug, Serialize)]
pub struct ComparisonList {
    #[serde(rename = "xtce:Comparison")]
    pub comparisons: Vec<Comparison>,
}

#[derive(Debug, Serialize)]
pub struct Comparison {
    #[serde(rename = "@parameterRef")]
    pub parameter_ref: String,

    #[serde(rename = "@value")]
    pub value: String,
}

// --- Entries (shared by telemetry and commands) ---

#[derive(Debug, Serialize, Default)]
pub struct EntryList {
    #[serde(rename = "$value")]
    pub entries: Vec<Entry>,
}

#[derive(Debug, Serialize)]
pub enum Entry {
    #[serde(rename = "xtce:ParameterRefEntry")]
    Parameter(ParameterRefEntry),
    #[serde(rename = "xtce:ArrayParameterRefEntry")]
    ArrayParameter(ArrayRefEntry),
    #[serde(rename = "xtce:ArgumentRefEntry")]
    Argument(ArgumentRefEntry),
    /// Array arguments are referenced with `parameterRef` as well.
    #[serde(rename = "xtce:ArrayArgumentRefEntry")]
    ArrayArgument(ArrayRefEntry),
}

#[derive(Debug, Serialize)]
pub struct ParameterRefEntry {
    #[serde(rename = "@parameterRef")]
    pub parameter_ref: String,

    #[serde(
        rename = "xtce:LocationInContainerInBits",
        skip_serializing_if = "Option::is_none"
    )]
    pub location: Option<LocationInContainerInBits>,
}

#[derive(Debug, Serialize)]
pub struct ArgumentRefEntry {
    #[serde(rename = "@argumentRef")]
    pub argument_ref: String,

    #[serde(
        rename = "xtce:LocationInContainerInBits",
        skip_serializing_if = "Option::is_none"
    )]
    pub location: Option<LocationInContainerInBits>,
}

#[derive(Debug, Serialize)]
pub struct ArrayRefEntry {
    #[serde(rename = "@parameterRef")]
    pub parameter_ref: String,

    #[serde(
        rename = "xtce:LocationInContainerInBits",
        skip_serializing_if = "Option::is_none"
    )]
    pub location: Option<LocationInContainerInBits>,

    #[serde(rename = "xtce:DimensionList")]
    pub dimension_list: DimensionList,
}

/// Omitted for packed packets, where offsets follow from entry order.
#[derive(Debug, Serialize)]
pub struct LocationInContainerInBits {
    /// `containerStart` or `containerEnd`.
    #[serde(rename = "@referenceLocation")]
    pub reference_location: String,

    #[serde(rename = "xtce:FixedValue")]
    pub fixed_value: String,
}

#[derive(Debug, Serialize)]
pub struct DimensionList {
    #[serde(rename = "xtce:Dimension")]
    pub dimension: Dimension,
}

#[derive(Debug, Serialize)]
pub struct Dimension {
    #[serde(rename = "xtce:StartingIndex")]
    pub starting_index: FixedValue,

    #[serde(rename = "xtce:EndingIndex")]
    pub ending_index: FixedValue,
}

// --- Commands ---

#[derive(Debug, Serialize, Default)]
pub struct MetaCommandSet {
    #[serde(rename = "xtce:MetaCommand")]
    pub meta_commands: Vec<MetaCommand>,
}

/// A command packet, split into an abstract `_Base` command holding the
/// arguments and a concrete command carrying the argument assignments.
#[derive(Debug, Serialize)]
pub struct MetaCommand {
    #[serde(rename = "@name")]
    pub name: String,

    #[serde(rename = "@shortDescription", skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,

    #[serde(rename = "@abstract", skip_serializing_if = "Option::is_none")]
    pub is_abstract: Option<String>,

    #[serde(
        rename = "xtce:BaseMetaCommand",
        skip_serializing_if = "Option::is_none"
    )]
    pub base_meta_command: Option<BaseMetaCommand>,

    #[serde(rename = "xtce:ArgumentList", skip_serializing_if = "Option::is_none")]
    pub argument_list: Option<ArgumentList>,

    #[serde(
        rename = "xtce:CommandContainer",
        skip_serializing_if = "Option::is_none"
    )]
    pub command_container: Option<CommandContainer>,
}

#[derive(Debug, Serialize)]
pub struct BaseMetaCommand {
    #[serde(rename = "@metaCommandRef")]
    pub meta_command_ref: String,

    #[serde(
        rename = "xtce:ArgumentAssignmentList",
        skip_serializing_if = "Option::is_none"
    )]
    pub argument_assignment_list: Option<ArgumentAssignmentList>,
}

#[derive(Debug, Serialize)]
pub struct ArgumentAssignmentList {
    #[serde(rename = "xtce:ArgumentAssignment")]
    pub assignments: Vec<ArgumentAssignment>,
}

#[derive(Debug, Serialize)]
pub struct ArgumentAssignment {
    #[serde(rename = "@argumentName")]
    pub argument_name: String,

    #[serde(rename = "@argumentValue")]
    pub argument_value: String,
}

#[derive(Debug, Serialize, Default)]
pub struct ArgumentList {
    #[serde(rename = "xtce:Argument")]
    pub arguments: Vec<Argument>,
}

#[derive(Debug, Serialize)]
pub struct Argument {
    #[serde(rename = "@name")]
    pub name: String,

    #[serde(rename = "@argumentTypeRef")]
    pub argument_type_ref: String,
}

#[derive(Debug, Serialize)]
pub struct CommandContainer {
    #[serde(rename = "@name")]
    pub name: String,

    #[serde(rename = "xtce:EntryList")]
    pub entry_list: EntryList,
}
