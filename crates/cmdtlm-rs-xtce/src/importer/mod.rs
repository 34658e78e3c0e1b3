// crates/cmdtlm-rs-xtce/src/importer/mod.rs

//! Builds packets from an XTCE document.
//!
//! The document is walked depth-first. Type, parameter and argument
//! definitions are collected into lookup tables as they appear, and each
//! `SequenceContainer` or `MetaCommand` opens a new packet whose entries
//! resolve against those tables. Containers and commands that inherit from
//! a base get the base's items copied in as soon as they open.
//!
//! Packets are built into a private set of maps and only merged into the
//! caller's maps once the whole document has been processed.

mod xtce_type;

use crate::error::XtceError;
use crate::parser::{Element, parse_document};
use cmdtlm_rs::log::{LogMetadata, record_warning};
use cmdtlm_rs::packets::value::{hex_to_bytes, parse_float, parse_int};
use cmdtlm_rs::packets::{DEFAULT_LIMITS_SET, is_received_item};
use cmdtlm_rs::parsers::PacketParser;
use cmdtlm_rs::{
    CmdOrTlm, Conversion, DataType, Endianness, ItemRange, LimitsValues, Packet, PacketItem,
    PacketMaps, Value,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use xtce_type::{Encoding, TypeKind, XtceType};

/// Imports every packet of an XTCE document into `maps`.
///
/// `target_name` overrides the target named by the root `SpaceSystem`.
/// Abstract containers and commands only serve as bases and are not added.
/// On success the warnings raised during the import are returned; on error
/// `maps` is left untouched.
pub fn import_xtce_str(
    xml: &str,
    maps: &mut PacketMaps,
    target_name: Option<&str>,
) -> Result<Vec<String>, XtceError> {
    let root = parse_document(xml)?;
    let (imported, warnings) = XtceImporter::new(maps, target_name).run(&root)?;
    maps.merge(imported);
    Ok(warnings)
}

/// Reads `path` and imports it with [`import_xtce_str`].
pub fn import_xtce_file(
    path: impl AsRef<Path>,
    maps: &mut PacketMaps,
    target_name: Option<&str>,
) -> Result<Vec<String>, XtceError> {
    let path = path.as_ref();
    log::info!("Importing XTCE file {}", path.display());
    let xml = fs::read_to_string(path)?;
    import_xtce_str(&xml, maps, target_name)
}

/// Elements skipped together with their children.
const IGNORED_ELEMENTS: [&str; 4] = ["text", "AliasSet", "Alias", "Header"];

/// Structural elements with nothing to record; their children are processed.
const CONTAINER_ELEMENTS: [&str; 17] = [
    "ParameterTypeSet",
    "EnumerationList",
    "ParameterSet",
    "ContainerSet",
    "EntryList",
    "DefaultCalibrator",
    "DefaultAlarm",
    "RestrictionCriteria",
    "ComparisonList",
    "MetaCommandSet",
    "ArgumentTypeSet",
    "ArgumentList",
    "ArgumentAssignmentList",
    "LocationInContainerInBits",
    "BaseContainer",
    "BaseMetaCommand",
    "ParameterProperties",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeSet {
    Parameter,
    Argument,
}

struct XtceImporter<'a> {
    existing: &'a PacketMaps,
    maps: PacketMaps,
    warnings: Vec<String>,
    target_override: Option<String>,
    target: Option<String>,
    current_packet: Option<(CmdOrTlm, Packet)>,
    current_type: Option<(TypeSet, String)>,
    parameter_types: BTreeMap<String, XtceType>,
    argument_types: BTreeMap<String, XtceType>,
    /// Parameter name to type name.
    parameters: BTreeMap<String, String>,
    /// Argument name to type name.
    arguments: BTreeMap<String, String>,
    /// Container name to the packet it belongs to.
    containers: BTreeMap<String, (CmdOrTlm, String)>,
}

impl<'a> XtceImporter<'a> {
    fn new(existing: &'a PacketMaps, target_override: Option<&str>) -> Self {
        Self {
            existing,
            maps: PacketMaps::new(),
            warnings: Vec::new(),
            target_override: target_override.map(str::to_ascii_uppercase),
            target: None,
            current_packet: None,
            current_type: None,
            parameter_types: BTreeMap::new(),
            argument_types: BTreeMap::new(),
            parameters: BTreeMap::new(),
            arguments: BTreeMap::new(),
            containers: BTreeMap::new(),
        }
    }

    fn run(mut self, root: &Element) -> Result<(PacketMaps, Vec<String>), XtceError> {
        // The root only names the target; its children are always walked.
        self.process_element(root)?;
        for child in &root.children {
            self.recurse(child)?;
        }
        self.finish_packet()?;

        for target in self.maps.targets() {
            self.maps.remove_abstract(&target);
            // Later packets take precedence during identification
            self.maps.reverse_packet_order(&target);
        }
        Ok((self.maps, self.warnings))
    }

    fn recurse(&mut self, element: &Element) -> Result<(), XtceError> {
        if self.process_element(element)? {
            for child in &element.children {
                self.recurse(child)?;
            }
        }
        Ok(())
    }

    /// Handles one element. Returns whether its children still need to be
    /// processed.
    fn process_element(&mut self, element: &Element) -> Result<bool, XtceError> {
        let name = element.name.as_str();
        if IGNORED_ELEMENTS.contains(&name) {
            return Ok(false);
        }
        if CONTAINER_ELEMENTS.contains(&name) {
            return Ok(true);
        }
        if let Some(kind) = TypeKind::from_element(name) {
            self.start_type(element, kind)?;
            return Ok(true);
        }
        if let Some(encoding) = Encoding::from_element(name) {
            self.current_type_mut(name)?.set_encoding(element, encoding)?;
            return Ok(true);
        }

        match name {
            "SpaceSystem" => {
                if self.target_override.is_none() {
                    if let Some(target) = element.attr("name") {
                        self.target = Some(target.to_ascii_uppercase());
                    }
                }
            }
            "TelemetryMetaData" | "CommandMetaData" => self.finish_packet()?,
            "ByteOrderList" => {
                self.byte_order_list(element)?;
                return Ok(false);
            }
            "SizeInBits" => {
                if let Some(text) = element.fixed_value() {
                    let bits: i64 = text
                        .trim()
                        .parse()
                        .map_err(|_| XtceError::invalid_number("FixedValue", text))?;
                    self.current_type_mut(name)?.size_in_bits = Some(bits);
                }
                return Ok(false);
            }
            "UnitSet" => {
                let mut units = Vec::new();
                element.find_all("Unit", &mut units);
                let current = self.current_type_mut(name)?;
                for unit in units {
                    current.add_unit(unit);
                }
                return Ok(false);
            }
            "PolynomialCalibrator" => {
                self.polynomial_calibrator(element)?;
                return Ok(false);
            }
            "StaticAlarmRanges" => {
                self.static_alarm_ranges(element)?;
                return Ok(false);
            }
            "ValidRange" => {
                let current = self.current_type_mut(name)?;
                current.min_inclusive = element.attr("minInclusive").map(str::to_string);
                current.max_inclusive = element.attr("maxInclusive").map(str::to_string);
            }
            "Enumeration" => {
                let label = element.required_attr("label")?;
                let value = element.required_attr("value")?;
                self.current_type_mut(name)?.add_state(label, value)?;
            }
            "Parameter" => {
                let type_ref = element.required_attr("parameterTypeRef")?;
                self.parameters.insert(
                    element.required_attr("name")?.to_string(),
                    type_ref.to_string(),
                );
            }
            "Argument" => {
                let type_ref = element.required_attr("argumentTypeRef")?;
                self.arguments.insert(
                    element.required_attr("name")?.to_string(),
                    type_ref.to_string(),
                );
            }
            "SequenceContainer" => {
                let packet_name = self.start_packet(element, CmdOrTlm::Telemetry)?;
                self.containers.insert(
                    element.required_attr("name")?.to_string(),
                    (CmdOrTlm::Telemetry, packet_name),
                );
                // Base items must exist before the entries are defined
                self.copy_base_items(element, "BaseContainer")?;
            }
            "MetaCommand" => {
                self.start_packet(element, CmdOrTlm::Command)?;
                self.copy_base_items(element, "BaseMetaCommand")?;
            }
            "CommandContainer" => {
                let (kind, packet) = self.current_packet(name)?;
                let entry = (kind, packet.packet_name().to_string());
                self.containers
                    .insert(element.required_attr("name")?.to_string(), entry);
                self.copy_base_items(element, "BaseContainer")?;
            }
            "LongDescription" => {
                if let Some((_, packet)) = self.current_packet.as_mut() {
                    if packet.description.is_none() {
                        packet.description = Some(element.text.clone());
                    }
                }
            }
            "ParameterRefEntry"
            | "ArgumentRefEntry"
            | "ArrayParameterRefEntry"
            | "ArrayArgumentRefEntry" => {
                self.ref_entry(element)?;
                return Ok(false);
            }
            "Comparison" => self.comparison(element)?,
            "ArgumentAssignment" => self.argument_assignment(element)?,
            _ => log::debug!("Ignoring unknown element <{}>", name),
        }
        Ok(true)
    }

    fn target(&self) -> Result<&str, XtceError> {
        self.target_override
            .as_deref()
            .or(self.target.as_deref())
            .ok_or(XtceError::MissingTarget)
    }

    // --- Types ---

    fn start_type(&mut self, element: &Element, kind: TypeKind) -> Result<(), XtceError> {
        let xtce_type = XtceType::new(element, kind)?;
        let set = if element.name.contains("Argument") {
            TypeSet::Argument
        } else {
            TypeSet::Parameter
        };
        log::trace!("Defining {:?} type {}", kind, xtce_type.name);
        self.current_type = Some((set, xtce_type.name.clone()));
        self.types_mut(set).insert(xtce_type.name.clone(), xtce_type);
        Ok(())
    }

    fn types_mut(&mut self, set: TypeSet) -> &mut BTreeMap<String, XtceType> {
        match set {
            TypeSet::Parameter => &mut self.parameter_types,
            TypeSet::Argument => &mut self.argument_types,
        }
    }

    fn current_type_mut(&mut self, element_name: &str) -> Result<&mut XtceType, XtceError> {
        let (set, name) = self
            .current_type
            .clone()
            .ok_or_else(|| XtceError::NoCurrentType(element_name.to_string()))?;
        self.types_mut(set)
            .get_mut(&name)
            .ok_or_else(|| XtceError::NoCurrentType(element_name.to_string()))
    }

    /// A list starting at byte significance 0 is little endian. The list
    /// must be contiguous in either direction.
    fn byte_order_list(&mut self, element: &Element) -> Result<(), XtceError> {
        let mut bytes = Vec::new();
        element.find_all("Byte", &mut bytes);
        let significances = bytes
            .iter()
            .filter_map(|byte| byte.attr("byteSignificance"))
            .map(|text| parse_int(text).ok_or_else(|| XtceError::invalid_number("byteSignificance", text)))
            .collect::<Result<Vec<i128>, _>>()?;
        let (Some(&first), Some(&last)) = (significances.first(), significances.last()) else {
            return Ok(());
        };

        if first == 0 {
            self.current_type_mut(&element.name)?.endianness = Endianness::LittleEndian;
        }
        let mut ordered = significances.clone();
        if first >= last {
            ordered.reverse();
        }
        let contiguous = ordered[0] == 0 && ordered.windows(2).all(|pair| pair[1] - pair[0] == 1);
        if !contiguous {
            let list: Vec<String> = significances.iter().map(i128::to_string).collect();
            record_warning(
                &mut self.warnings,
                format!("Invalid ByteOrderList detected: {}", list.join(", ")),
            );
        }
        Ok(())
    }

    fn polynomial_calibrator(&mut self, element: &Element) -> Result<(), XtceError> {
        let mut terms = Vec::new();
        element.find_all("Term", &mut terms);
        let current = self.current_type_mut(&element.name)?;
        for term in terms {
            let exponent = term.required_attr("exponent")?;
            let exponent = parse_float(exponent)
                .filter(|e| *e >= 0.0)
                .ok_or_else(|| XtceError::invalid_number("exponent", exponent))?;
            let coefficient = term.required_attr("coefficient")?;
            let coefficient = parse_float(coefficient)
                .ok_or_else(|| XtceError::invalid_number("coefficient", coefficient))?;
            current.add_term(exponent as usize, coefficient);
        }
        Ok(())
    }

    /// Warning bounds are the yellow limits, critical bounds the red ones.
    fn static_alarm_ranges(&mut self, element: &Element) -> Result<(), XtceError> {
        let current = self.current_type_mut(&element.name)?;
        for range in &element.children {
            let (low, high) = match range.name.as_str() {
                "WarningRange" => (1, 2),
                "CriticalRange" => (0, 3),
                _ => continue,
            };
            for (attribute, index) in [("minInclusive", low), ("maxInclusive", high)] {
                if let Some(text) = range.attr(attribute) {
                    let value =
                        parse_float(text).ok_or_else(|| XtceError::invalid_number("alarm", text))?;
                    current.set_limit(index, value);
                }
            }
        }
        Ok(())
    }

    // --- Packets ---

    fn current_packet(&self, element_name: &str) -> Result<(CmdOrTlm, &Packet), XtceError> {
        self.current_packet
            .as_ref()
            .map(|(kind, packet)| (*kind, packet))
            .ok_or_else(|| XtceError::NoCurrentPacket(element_name.to_string()))
    }

    fn current_packet_mut(
        &mut self,
        element_name: &str,
    ) -> Result<(CmdOrTlm, &mut Packet), XtceError> {
        self.current_packet
            .as_mut()
            .map(|(kind, packet)| (*kind, packet))
            .ok_or_else(|| XtceError::NoCurrentPacket(element_name.to_string()))
    }

    /// Finishes the open packet and opens a new one. Returns its name.
    fn start_packet(&mut self, element: &Element, kind: CmdOrTlm) -> Result<String, XtceError> {
        self.finish_packet()?;
        let target = self.target()?.to_string();
        let name = element.required_attr("name")?;

        let mut packet = Packet::new(
            &target,
            name,
            Endianness::BigEndian,
            element.attr("shortDescription").map(str::to_string),
        );
        packet.is_abstract = element
            .attr("abstract")
            .is_some_and(|value| value.eq_ignore_ascii_case("true"));
        let packet_name = packet.packet_name().to_string();

        if self.existing.contains(kind, &target, &packet_name)
            || self.maps.contains(kind, &target, &packet_name)
        {
            record_warning(
                &mut self.warnings,
                format!("{} Packet {} {} redefined.", kind.label(), target, packet_name),
            );
        }
        if kind == CmdOrTlm::Telemetry {
            PacketParser::define_received_items(&mut packet)?;
        }
        log::debug!("[{}] Started {} packet", packet.meta(), kind.label());
        self.current_packet = Some((kind, packet));
        Ok(packet_name)
    }

    fn finish_packet(&mut self) -> Result<(), XtceError> {
        let Some((kind, mut packet)) = self.current_packet.take() else {
            return Ok(());
        };
        for warning in packet.check_bit_offsets() {
            record_warning(&mut self.warnings, warning);
        }
        set_packet_endianness(&mut packet);
        if kind == CmdOrTlm::Command {
            packet.check_item_data_types()?;
        }
        log::debug!(
            "[{}] Finished with {} items",
            packet.meta(),
            packet.items().len()
        );
        self.maps.upsert(kind, packet);
        Ok(())
    }

    /// Copies the items of every base referenced below `element` into the
    /// current packet, skipping items it already has.
    /// Copies the items of the first `base_element` below `element`.
    fn copy_base_items(&mut self, element: &Element, base_element: &str) -> Result<(), XtceError> {
        let Some(base) = element.find(base_element) else {
            return Ok(());
        };
        let items = {
            let packet = self.base_packet(base)?;
            let (_, current) = self.current_packet(&base.name)?;
            packet
                .sorted_items()
                .into_iter()
                .filter(|item| !is_received_item(&item.name) && !current.has_item(&item.name))
                .cloned()
                .collect::<Vec<PacketItem>>()
        };
        let (_, current) = self.current_packet_mut(&base.name)?;
        log::trace!("[{}] Copying {} base items", current.meta(), items.len());
        for item in items {
            current.define(item)?;
        }
        Ok(())
    }

    fn base_packet(&self, base: &Element) -> Result<&Packet, XtceError> {
        let target = self.target()?;
        let unknown = |name: &str| XtceError::UnknownBase {
            kind: if base.name == "BaseMetaCommand" {
                "BaseMetaCommand"
            } else {
                "BaseContainer"
            },
            name: name.to_string(),
        };
        let (kind, reference, packet_name) = if base.name == "BaseMetaCommand" {
            let reference = base.required_attr("metaCommandRef")?;
            (CmdOrTlm::Command, reference, reference.to_ascii_uppercase())
        } else {
            let reference = base.required_attr("containerRef")?;
            let (kind, packet_name) = self
                .containers
                .get(reference)
                .ok_or_else(|| unknown(reference))?;
            (*kind, reference, packet_name.clone())
        };
        self.maps
            .get(kind, target, &packet_name)
            .or_else(|| self.existing.get(kind, target, &packet_name))
            .ok_or_else(|| unknown(reference))
    }

    /// Resolves an entry to its item name and type. Array entries resolve
    /// to the element type of the array.
    fn resolve_entry(&self, entry: &Element) -> Result<(String, XtceType), XtceError> {
        let unresolved = |kind: &'static str, name: &str| XtceError::UnresolvedReference {
            kind,
            name: name.to_string(),
        };
        let (reference, objects, types, object_kind, type_kind) = match entry.name.as_str() {
            "ParameterRefEntry" | "ArrayParameterRefEntry" => (
                entry.required_attr("parameterRef")?,
                &self.parameters,
                &self.parameter_types,
                "parameterRef",
                "parameterTypeRef",
            ),
            // Array arguments are referenced through parameterRef
            "ArrayArgumentRefEntry" => (
                entry.required_attr("parameterRef")?,
                &self.arguments,
                &self.argument_types,
                "parameterRef",
                "argumentTypeRef",
            ),
            _ => (
                entry.required_attr("argumentRef")?,
                &self.arguments,
                &self.argument_types,
                "argumentRef",
                "argumentTypeRef",
            ),
        };
        let type_name = objects
            .get(reference)
            .ok_or_else(|| unresolved(object_kind, reference))?;
        let mut xtce_type = types
            .get(type_name)
            .ok_or_else(|| unresolved(type_kind, type_name))?;
        if entry.name.starts_with("Array") {
            let element_type = xtce_type.array_type_ref.as_deref().unwrap_or_default();
            xtce_type = types
                .get(element_type)
                .ok_or_else(|| unresolved("arrayTypeRef", element_type))?;
        }
        Ok((reference.to_string(), xtce_type.clone()))
    }

    fn ref_entry(&mut self, entry: &Element) -> Result<(), XtceError> {
        let (item_name, xtce_type) = self.resolve_entry(entry)?;
        let data_type = xtce_type
            .data_type()
            .ok_or_else(|| XtceError::MissingEncoding(item_name.clone()))?;
        let bit_size = xtce_type
            .size_in_bits
            .ok_or_else(|| XtceError::MissingEncoding(item_name.clone()))?;
        let array_size = entry
            .name
            .starts_with("Array")
            .then(|| array_bit_size(entry, bit_size));
        let location = location_in_container(entry)?;

        let (kind, packet) = self.current_packet_mut(&entry.name)?;
        let endianness = Some(xtce_type.endianness);
        let item = match location {
            None => packet.append_item(&item_name, bit_size, data_type, array_size, endianness)?,
            Some((reference, offset)) => {
                let bit_offset = match reference.as_deref() {
                    Some("containerStart") => offset,
                    Some("containerEnd") => -offset,
                    Some("previousEntry") | None => packet.defined_length_bits() + offset,
                    Some("nextEntry") => {
                        return Err(XtceError::Unsupported("nextEntry is not supported".into()));
                    }
                    Some(other) => {
                        return Err(XtceError::Unsupported(format!(
                            "Unsupported referenceLocation {}",
                            other
                        )));
                    }
                };
                packet.define_item(&item_name, bit_offset, bit_size, data_type, array_size, endianness)?
            }
        };
        populate_item(item, &xtce_type, kind)?;
        if kind == CmdOrTlm::Telemetry {
            packet.update_limits_items_cache(&item_name)?;
        }
        Ok(())
    }

    fn comparison(&mut self, element: &Element) -> Result<(), XtceError> {
        let name = element.required_attr("parameterRef")?;
        let value = element.required_attr("value")?;
        let (kind, packet) = self.current_packet_mut(&element.name)?;
        let item = packet.get_item_mut(name)?;
        let raw = if item.data_type.is_string_like() && value.to_ascii_uppercase().starts_with("0X") {
            Value::Bytes(hex_to_bytes(value)?)
        } else {
            Value::Str(value.to_string())
        };
        item.set_id_value(Some(raw))?;
        if kind == CmdOrTlm::Command {
            item.default = item.id_value.clone();
        }
        packet.update_id_items(name)?;
        Ok(())
    }

    /// A value naming a state assigns that state's raw value.
    fn argument_assignment(&mut self, element: &Element) -> Result<(), XtceError> {
        let name = element.required_attr("argumentName")?;
        let value = element.required_attr("argumentValue")?;
        let (_, packet) = self.current_packet_mut(&element.name)?;
        let item = packet.get_item_mut(name)?;
        let state_value = item
            .states
            .as_ref()
            .and_then(|states| states.get(&value.to_ascii_uppercase()))
            .cloned();
        item.set_id_value(Some(state_value.unwrap_or_else(|| Value::Str(value.to_string()))))?;
        item.default = item.id_value.clone();
        packet.update_id_items(name)?;
        Ok(())
    }
}

/// `referenceLocation` and offset of the entry's `LocationInContainerInBits`.
fn location_in_container(entry: &Element) -> Result<Option<(Option<String>, i64)>, XtceError> {
    let Some(location) = entry
        .children
        .iter()
        .find(|child| child.name == "LocationInContainerInBits")
    else {
        return Ok(None);
    };
    let Some(text) = location.fixed_value() else {
        return Ok(None);
    };
    let offset: i64 = text
        .trim()
        .parse()
        .map_err(|_| XtceError::invalid_number("LocationInContainerInBits", text))?;
    Ok(Some((
        location.attr("referenceLocation").map(str::to_string),
        offset,
    )))
}

/// Product of all dimension lengths times the element size.
fn array_bit_size(entry: &Element, bit_size: i64) -> i64 {
    let mut dimensions = Vec::new();
    entry.find_all("Dimension", &mut dimensions);
    let index = |dimension: &Element, name: &str| -> i64 {
        dimension
            .find(name)
            .and_then(Element::fixed_value)
            .and_then(|text| text.trim().parse().ok())
            .unwrap_or(0)
    };
    let count: i64 = dimensions
        .iter()
        .map(|d| (index(d, "EndingIndex") - index(d, "StartingIndex")).abs() + 1)
        .product();
    count * bit_size
}

/// Uses the endianness shared by every numeric item, if there is one.
fn set_packet_endianness(packet: &mut Packet) {
    let mut endianness = packet
        .items()
        .iter()
        .filter(|item| !item.data_type.is_string_like() && item.data_type != DataType::Derived)
        .map(|item| item.endianness);
    if let Some(first) = endianness.next() {
        if endianness.all(|e| e == first) {
            packet.default_endianness = first;
        }
    }
}

/// Copies the type's attributes onto a freshly defined item.
fn populate_item(item: &mut PacketItem, xtce_type: &XtceType, kind: CmdOrTlm) -> Result<(), XtceError> {
    if let Some(description) = &xtce_type.short_description {
        item.description = Some(description.clone());
    }
    if let Some(states) = &xtce_type.states {
        item.set_states(Some(states.clone()));
    }
    if let (Some(units), Some(units_full)) = (&xtce_type.units, &xtce_type.units_full) {
        item.units = Some(units.clone());
        item.units_full = Some(units_full.clone());
    }
    if let Some(conversion) = &xtce_type.conversion {
        let conversion = Some(Conversion::Polynomial(conversion.clone()));
        match kind {
            CmdOrTlm::Command => item.write_conversion = conversion,
            CmdOrTlm::Telemetry => item.read_conversion = conversion,
        }
    }
    match kind {
        CmdOrTlm::Command => set_range_and_default(item, xtce_type),
        CmdOrTlm::Telemetry => {
            if let Some([red_low, yellow_low, yellow_high, red_high]) = xtce_type.limits {
                item.limits.enabled = true;
                item.limits.values = Some(BTreeMap::from([(
                    DEFAULT_LIMITS_SET.to_string(),
                    LimitsValues::new(red_low, yellow_low, yellow_high, red_high),
                )]));
            }
            Ok(())
        }
    }
}

/// Command items get the full range of their type unless a `ValidRange`
/// narrows it, and a default from `initialValue`.
fn set_range_and_default(item: &mut PacketItem, xtce_type: &XtceType) -> Result<(), XtceError> {
    let initial = xtce_type.initial_value.as_deref();
    let valid_range = xtce_type
        .min_inclusive
        .as_deref()
        .zip(xtce_type.max_inclusive.as_deref());
    let is_array = item.array_size.is_some();

    match item.data_type {
        DataType::Int | DataType::Uint => {
            item.range = Some(match valid_range {
                Some((min, max)) => ItemRange::new(
                    Value::Int(parse_int(min).ok_or_else(|| XtceError::invalid_number("minInclusive", min))?),
                    Value::Int(parse_int(max).ok_or_else(|| XtceError::invalid_number("maxInclusive", max))?),
                ),
                None => ItemRange::for_integer(item.data_type, item.bit_size)?,
            });
            item.default = Some(if is_array {
                Value::Array(Vec::new())
            } else if let Some(initial) = initial {
                let state = item
                    .states
                    .as_ref()
                    .and_then(|states| states.get(&initial.to_ascii_uppercase()))
                    .cloned();
                match state {
                    Some(value) => value,
                    None => Value::Int(
                        parse_int(initial)
                            .ok_or_else(|| XtceError::invalid_number("initialValue", initial))?,
                    ),
                }
            } else {
                Value::Int(0)
            });
        }
        DataType::Float => {
            item.range = Some(match valid_range {
                Some((min, max)) => ItemRange::new(
                    Value::Float(parse_float(min).ok_or_else(|| XtceError::invalid_number("minInclusive", min))?),
                    Value::Float(parse_float(max).ok_or_else(|| XtceError::invalid_number("maxInclusive", max))?),
                ),
                None => ItemRange::for_float(item.bit_size),
            });
            item.default = Some(if is_array {
                Value::Array(Vec::new())
            } else if let Some(initial) = initial {
                Value::Float(
                    parse_float(initial)
                        .ok_or_else(|| XtceError::invalid_number("initialValue", initial))?,
                )
            } else {
                Value::Float(0.0)
            });
        }
        DataType::String | DataType::Block => {
            item.default = Some(if is_array {
                Value::Array(Vec::new())
            } else {
                match initial {
                    Some(text) if text.to_ascii_uppercase().starts_with("0X") => {
                        Value::Bytes(hex_to_bytes(text)?)
                    }
                    Some(text) => Value::Str(unquote(text).to_string()),
                    None => Value::Str(String::new()),
                }
            });
        }
        DataType::Derived => {}
    }
    Ok(())
}

fn unquote(text: &str) -> &str {
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TLM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xtce:SpaceSystem xmlns:xtce="http://www.omg.org/space/xtce" name="inst">
  <xtce:TelemetryMetaData>
    <xtce:ParameterTypeSet>
      <xtce:IntegerParameterType name="APID_Type" signed="false">
        <xtce:UnitSet/>
        <xtce:IntegerDataEncoding sizeInBits="11" encoding="unsigned"/>
      </xtce:IntegerParameterType>
      <xtce:IntegerParameterType name="VOLTS_Type" shortDescription="Bus voltage">
        <xtce:ByteOrderList>
          <xtce:Byte byteSignificance="0"/>
          <xtce:Byte byteSignificance="1"/>
        </xtce:ByteOrderList>
        <xtce:UnitSet>
          <xtce:Unit description="Volts">V</xtce:Unit>
        </xtce:UnitSet>
        <xtce:IntegerDataEncoding sizeInBits="16" encoding="twosComplement">
          <xtce:DefaultCalibrator>
            <xtce:PolynomialCalibrator>
              <xtce:Term coefficient="0.5" exponent="1"/>
            </xtce:PolynomialCalibrator>
          </xtce:DefaultCalibrator>
        </xtce:IntegerDataEncoding>
        <xtce:DefaultAlarm>
          <xtce:StaticAlarmRanges>
            <xtce:WarningRange minInclusive="-5.0" maxInclusive="5.0"/>
            <xtce:CriticalRange minInclusive="-10.0" maxInclusive="10.0"/>
          </xtce:StaticAlarmRanges>
        </xtce:DefaultAlarm>
      </xtce:IntegerParameterType>
    </xtce:ParameterTypeSet>
    <xtce:ParameterSet>
      <xtce:Parameter name="APID" parameterTypeRef="APID_Type"/>
      <xtce:Parameter name="VOLTS" parameterTypeRef="VOLTS_Type"/>
    </xtce:ParameterSet>
    <xtce:ContainerSet>
      <xtce:SequenceContainer name="HK_Base" abstract="true">
        <xtce:EntryList>
          <xtce:ParameterRefEntry parameterRef="APID"/>
          <xtce:ParameterRefEntry parameterRef="VOLTS">
            <xtce:LocationInContainerInBits referenceLocation="containerStart">
              <xtce:FixedValue>16</xtce:FixedValue>
            </xtce:LocationInContainerInBits>
          </xtce:ParameterRefEntry>
        </xtce:EntryList>
      </xtce:SequenceContainer>
      <xtce:SequenceContainer name="HK" shortDescription="Housekeeping">
        <xtce:EntryList/>
        <xtce:BaseContainer containerRef="HK_Base">
          <xtce:RestrictionCriteria>
            <xtce:ComparisonList>
              <xtce:Comparison parameterRef="APID" value="5"/>
            </xtce:ComparisonList>
          </xtce:RestrictionCriteria>
        </xtce:BaseContainer>
      </xtce:SequenceContainer>
    </xtce:ContainerSet>
  </xtce:TelemetryMetaData>
</xtce:SpaceSystem>"#;

    #[test]
    fn test_telemetry_with_base_container() {
        let mut maps = PacketMaps::new();
        let warnings = import_xtce_str(TLM, &mut maps, None).unwrap();
        assert!(warnings.is_empty(), "{:?}", warnings);
        assert!(maps.get(CmdOrTlm::Telemetry, "INST", "HK_BASE").is_none());

        let packet = maps.get(CmdOrTlm::Telemetry, "INST", "HK").unwrap();
        assert_eq!(packet.description.as_deref(), Some("Housekeeping"));
        assert!(packet.has_item("RECEIVED_COUNT"));

        let apid = packet.get_item("APID").unwrap();
        assert_eq!((apid.bit_offset, apid.bit_size), (0, 11));
        assert_eq!(apid.data_type, DataType::Uint);
        assert_eq!(apid.id_value, Some(Value::Int(5)));
        assert_eq!(packet.id_items().len(), 1);

        let volts = packet.get_item("VOLTS").unwrap();
        assert_eq!(volts.bit_offset, 16);
        assert_eq!(volts.data_type, DataType::Int);
        assert_eq!(volts.endianness, Endianness::LittleEndian);
        assert_eq!(volts.units.as_deref(), Some("V"));
        assert_eq!(volts.units_full.as_deref(), Some("Volts"));
        assert_eq!(volts.description.as_deref(), Some("Bus voltage"));
        let poly = volts.read_conversion.as_ref().and_then(Conversion::as_polynomial).unwrap();
        assert_eq!(poly.coeffs, vec![0.0, 0.5]);
        let limits = volts.limits.default_values().unwrap();
        assert_eq!(
            (limits.red_low, limits.yellow_low, limits.yellow_high, limits.red_high),
            (-10.0, -5.0, 5.0, 10.0)
        );
        assert!(volts.limits.enabled);
        assert_eq!(packet.limits_items().len(), 1);
        // APID is big endian, VOLTS little endian
        assert_eq!(packet.default_endianness, Endianness::BigEndian);
    }

    #[test]
    fn test_only_first_base_container_is_copied() {
        let xml = TLM
            .replace(
                r#"<xtce:Parameter name="VOLTS" parameterTypeRef="VOLTS_Type"/>"#,
                r#"<xtce:Parameter name="VOLTS" parameterTypeRef="VOLTS_Type"/>
      <xtce:Parameter name="SPARE" parameterTypeRef="APID_Type"/>"#,
            )
            .replace(
                r#"<xtce:SequenceContainer name="HK" shortDescription="Housekeeping">"#,
                r#"<xtce:SequenceContainer name="SPARE_Base" abstract="true">
        <xtce:EntryList>
          <xtce:ParameterRefEntry parameterRef="SPARE"/>
        </xtce:EntryList>
      </xtce:SequenceContainer>
      <xtce:SequenceContainer name="HK" shortDescription="Housekeeping">"#,
            )
            .replace(
                "</xtce:BaseContainer>",
                r#"</xtce:BaseContainer>
        <xtce:BaseContainer containerRef="SPARE_Base"/>"#,
            );
        let mut maps = PacketMaps::new();
        let warnings = import_xtce_str(&xml, &mut maps, None).unwrap();
        assert!(warnings.is_empty(), "{:?}", warnings);
        let packet = maps.get(CmdOrTlm::Telemetry, "INST", "HK").unwrap();
        assert!(packet.has_item("VOLTS"));
        assert!(!packet.has_item("SPARE"));
        assert_eq!(packet.get_item("APID").unwrap().id_value, Some(Value::Int(5)));
    }

    #[test]
    fn test_target_override() {
        let mut maps = PacketMaps::new();
        import_xtce_str(TLM, &mut maps, Some("other")).unwrap();
        assert!(maps.get(CmdOrTlm::Telemetry, "OTHER", "HK").is_some());
        assert!(maps.packets(CmdOrTlm::Telemetry, "INST").is_empty());
    }

    #[test]
    fn test_redefinition_warns() {
        let mut maps = PacketMaps::new();
        import_xtce_str(TLM, &mut maps, None).unwrap();
        let warnings = import_xtce_str(TLM, &mut maps, None).unwrap();
        assert_eq!(warnings, vec!["Telemetry Packet INST HK redefined."]);
        assert_eq!(maps.packets(CmdOrTlm::Telemetry, "INST").len(), 1);
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"abc\""), "abc");
        assert_eq!(unquote("abc"), "abc");
        assert_eq!(unquote("\""), "\"");
    }
}
