// crates/cmdtlm-rs/src/packets/packet.rs

use super::error::PacketError;
use super::limits::DEFAULT_LIMITS_SET;
use super::packet_item::{PacketItem, quote_if_necessary};
use super::types::{CmdOrTlm, DataType, Endianness};
use crate::registry::Processor;
use core::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// A command or telemetry packet: an ordered set of bit-level items plus
/// identification, limits and processor bookkeeping.
#[derive(Debug, Clone)]
pub struct Packet {
    target_name: String,
    packet_name: String,
    pub default_endianness: Endianness,
    pub description: Option<String>,
    /// Abstract packets only serve as a base for other packets and are
    /// dropped from the final packet maps.
    pub is_abstract: bool,
    pub hazardous: bool,
    pub hazardous_description: Option<String>,
    pub meta: BTreeMap<String, Vec<String>>,
    pub processors: BTreeMap<String, Box<dyn Processor>>,
    items: Vec<PacketItem>,
    index: BTreeMap<String, usize>,
    id_items: Vec<String>,
    limits_items: Vec<String>,
    pos_bit_size: i64,
    neg_bit_size: i64,
    defined_length_bits: i64,
    fixed_size: bool,
    next_create_index: usize,
}

impl Packet {
    pub fn new(
        target_name: &str,
        packet_name: &str,
        default_endianness: Endianness,
        description: Option<String>,
    ) -> Self {
        Self {
            target_name: target_name.to_ascii_uppercase(),
            packet_name: packet_name.to_ascii_uppercase(),
            default_endianness,
            description,
            is_abstract: false,
            hazardous: false,
            hazardous_description: None,
            meta: BTreeMap::new(),
            processors: BTreeMap::new(),
            items: Vec::new(),
            index: BTreeMap::new(),
            id_items: Vec::new(),
            limits_items: Vec::new(),
            pos_bit_size: 0,
            neg_bit_size: 0,
            defined_length_bits: 0,
            fixed_size: true,
            next_create_index: 0,
        }
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    pub fn packet_name(&self) -> &str {
        &self.packet_name
    }

    /// Defined length of the packet in bits (positive extent plus negative extent).
    pub fn defined_length_bits(&self) -> i64 {
        self.defined_length_bits
    }

    /// Defined length in whole bytes, rounded up.
    pub fn defined_length(&self) -> i64 {
        (self.defined_length_bits + 7) / 8
    }

    /// False once a variably sized item has been defined.
    pub fn fixed_size(&self) -> bool {
        self.fixed_size
    }

    /// Creates and defines a new item. Optional attributes are set on the
    /// returned reference.
    pub fn define_item(
        &mut self,
        name: &str,
        bit_offset: i64,
        bit_size: i64,
        data_type: DataType,
        array_size: Option<i64>,
        endianness: Option<Endianness>,
    ) -> Result<&mut PacketItem, PacketError> {
        let endianness = endianness.unwrap_or(self.default_endianness);
        let item = PacketItem::new(name, bit_offset, bit_size, data_type, endianness, array_size)?;
        self.define(item)
    }

    /// Like [`Packet::define_item`] with the offset placed right after the
    /// current defined length. DERIVED items always sit at offset zero.
    pub fn append_item(
        &mut self,
        name: &str,
        bit_size: i64,
        data_type: DataType,
        array_size: Option<i64>,
        endianness: Option<Endianness>,
    ) -> Result<&mut PacketItem, PacketError> {
        if !self.fixed_size {
            return Err(PacketError::AppendAfterVariableSize);
        }
        let offset = if data_type == DataType::Derived {
            0
        } else {
            self.defined_length_bits
        };
        self.define_item(name, offset, bit_size, data_type, array_size, endianness)
    }

    /// Adds a fully built item. An existing item of the same name is
    /// replaced in place.
    pub fn define(&mut self, mut item: PacketItem) -> Result<&mut PacketItem, PacketError> {
        item.name = item.name.to_ascii_uppercase();
        item.validate()?;
        item.create_index = self.next_create_index;
        self.next_create_index += 1;

        if (item.data_type != DataType::Derived && item.bit_size <= 0)
            || item.array_size.is_some_and(|a| a <= 0)
        {
            self.fixed_size = false;
        }
        self.update_defined_length(&item);

        let name = item.name.clone();
        let is_id = item.id_value.is_some();
        let has_limits = item.limits.values.is_some() || item.has_state_colors();
        let pos = match self.index.get(&name) {
            Some(&pos) => {
                self.items[pos] = item;
                pos
            }
            None => {
                self.items.push(item);
                let pos = self.items.len() - 1;
                self.index.insert(name.clone(), pos);
                pos
            }
        };

        if is_id {
            if !self.id_items.contains(&name) {
                self.id_items.push(name.clone());
            }
        } else {
            self.id_items.retain(|n| *n != name);
        }
        if has_limits {
            if !self.limits_items.contains(&name) {
                self.limits_items.push(name);
            }
        } else {
            self.limits_items.retain(|n| *n != name);
        }
        Ok(&mut self.items[pos])
    }

    /// Adds a fully built item after the current defined length.
    pub fn append(&mut self, mut item: PacketItem) -> Result<&mut PacketItem, PacketError> {
        if !self.fixed_size {
            return Err(PacketError::AppendAfterVariableSize);
        }
        item.bit_offset = if item.data_type == DataType::Derived {
            0
        } else {
            self.defined_length_bits
        };
        self.define(item)
    }

    fn update_defined_length(&mut self, item: &PacketItem) {
        if item.bit_offset >= 0 {
            let extent = if item.bit_size > 0 {
                match item.array_size {
                    Some(a) if a >= 0 => item.bit_offset + a,
                    Some(_) => item.bit_offset,
                    None => item.bit_offset + item.bit_size,
                }
            } else {
                item.bit_offset
            };
            self.pos_bit_size = self.pos_bit_size.max(extent);
        } else {
            self.neg_bit_size = self.neg_bit_size.max(item.bit_offset.abs());
        }
        self.defined_length_bits = self.pos_bit_size + self.neg_bit_size;
    }

    pub fn has_item(&self, name: &str) -> bool {
        self.index.contains_key(&name.to_ascii_uppercase())
    }

    pub fn get_item(&self, name: &str) -> Result<&PacketItem, PacketError> {
        self.index
            .get(&name.to_ascii_uppercase())
            .map(|&pos| &self.items[pos])
            .ok_or_else(|| PacketError::UnknownItem {
                name: name.to_string(),
            })
    }

    pub fn get_item_mut(&mut self, name: &str) -> Result<&mut PacketItem, PacketError> {
        match self.index.get(&name.to_ascii_uppercase()) {
            Some(&pos) => Ok(&mut self.items[pos]),
            None => Err(PacketError::UnknownItem {
                name: name.to_string(),
            }),
        }
    }

    /// Returns a copy of an item, suitable for defining in another packet.
    pub fn clone_item(&self, name: &str) -> Result<PacketItem, PacketError> {
        self.get_item(name).cloned()
    }

    /// Replaces an existing item with `item`, matched by name.
    pub fn set_item(&mut self, item: PacketItem) -> Result<(), PacketError> {
        let Some(&pos) = self.index.get(&item.name) else {
            return Err(PacketError::UnknownItem { name: item.name });
        };
        self.items[pos] = item;
        Ok(())
    }

    /// Renames an item without changing its position.
    pub fn rename_item(&mut self, name: &str, new_name: &str) -> Result<&mut PacketItem, PacketError> {
        let old = name.to_ascii_uppercase();
        let new = new_name.to_ascii_uppercase();
        if old != new && self.index.contains_key(&new) {
            return Err(PacketError::ItemExists { name: new });
        }
        let pos = self
            .index
            .remove(&old)
            .ok_or_else(|| PacketError::UnknownItem {
                name: name.to_string(),
            })?;
        self.index.insert(new.clone(), pos);
        for list in [&mut self.id_items, &mut self.limits_items] {
            for n in list.iter_mut().filter(|n| **n == old) {
                *n = new.clone();
            }
        }
        let item = &mut self.items[pos];
        item.name = new;
        Ok(item)
    }

    /// Items in definition order.
    pub fn items(&self) -> &[PacketItem] {
        &self.items
    }

    /// Items ordered by bit offset: non-negative offsets ascending, then
    /// negative offsets ascending. Items at offset zero are ordered by bit
    /// size, remaining ties by definition order.
    pub fn sorted_items(&self) -> Vec<&PacketItem> {
        let mut sorted: Vec<&PacketItem> = self.items.iter().collect();
        sorted.sort_by(|a, b| compare_items(a, b));
        sorted
    }

    /// Registers `name` as an id item if it carries an id value.
    pub fn update_id_items(&mut self, name: &str) -> Result<(), PacketError> {
        let item = self.get_item(name)?;
        if item.id_value.is_some() && !self.id_items.contains(&item.name) {
            let name = item.name.clone();
            self.id_items.push(name);
        }
        Ok(())
    }

    /// Items whose values identify this packet, in registration order.
    pub fn id_items(&self) -> Vec<&PacketItem> {
        self.id_items
            .iter()
            .filter_map(|n| self.index.get(n).map(|&pos| &self.items[pos]))
            .collect()
    }

    /// Adds `name` to the limits cache once it has limits values or state colors.
    pub fn update_limits_items_cache(&mut self, name: &str) -> Result<(), PacketError> {
        let item = self.get_item(name)?;
        if (item.limits.values.is_some() || item.has_state_colors())
            && !self.limits_items.contains(&item.name)
        {
            let name = item.name.clone();
            self.limits_items.push(name);
        }
        Ok(())
    }

    /// Items taking part in limits checking.
    pub fn limits_items(&self) -> Vec<&PacketItem> {
        self.limits_items
            .iter()
            .filter_map(|n| self.index.get(n).map(|&pos| &self.items[pos]))
            .collect()
    }

    /// Limits set names used by this packet. Always contains DEFAULT.
    pub fn limits_sets(&self) -> BTreeSet<String> {
        let mut sets = BTreeSet::new();
        sets.insert(DEFAULT_LIMITS_SET.to_string());
        for item in self.limits_items() {
            if let Some(values) = &item.limits.values {
                sets.extend(values.keys().cloned());
            }
        }
        sets
    }

    /// Warnings for items whose bits overlap their predecessor.
    pub fn check_bit_offsets(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let mut expected_next_offset: Option<i64> = None;
        let mut previous: Option<&PacketItem> = None;
        for item in self.sorted_items() {
            if let (Some(expected), Some(prev)) = (expected_next_offset, previous) {
                if item.bit_offset < expected {
                    warnings.push(format!(
                        "Bit definition overlap at bit offset {} for packet {} {} items {} and {}",
                        item.bit_offset, self.target_name, self.packet_name, item.name, prev.name
                    ));
                }
            }
            expected_next_offset = Some(next_bit_offset(item));
            previous = Some(item);
        }
        if !warnings.is_empty() {
            pkt_trace!(self, "{} bit overlap warning(s)", warnings.len());
        }
        warnings
    }

    /// Runs [`PacketItem::check_default_and_range_data_types`] over every
    /// item. Used when a command packet is finished.
    pub fn check_item_data_types(&mut self) -> Result<(), PacketError> {
        for item in &mut self.items {
            item.check_default_and_range_data_types()?;
        }
        Ok(())
    }

    /// True when every non-DERIVED item is fixed size and the items tile the
    /// packet from bit zero with no gap or overlap, so that offsets are
    /// implied by declaration order.
    pub fn is_packed(&self) -> bool {
        let mut expected = 0;
        for item in self.sorted_items() {
            if item.data_type == DataType::Derived {
                continue;
            }
            if item.bit_offset != expected
                || item.bit_size <= 0
                || item.array_size.is_some_and(|a| a <= 0)
                || item.is_little_endian_bitfield()
            {
                return false;
            }
            expected = next_bit_offset(item);
        }
        true
    }

    /// Configuration text that recreates this packet and its items.
    pub fn to_config(&self, cmd_or_tlm: CmdOrTlm) -> String {
        let description = self.description.as_deref().unwrap_or("").replace('"', "'");
        let mut config = format!(
            "{} {} {} {} \"{}\"\n",
            cmd_or_tlm.keyword(),
            quote_if_necessary(&self.target_name),
            quote_if_necessary(&self.packet_name),
            self.default_endianness,
            description
        );
        if self.hazardous {
            config.push_str("  HAZARDOUS");
            if let Some(desc) = &self.hazardous_description {
                config.push(' ');
                config.push_str(&quote_if_necessary(desc));
            }
            config.push('\n');
        }
        for (key, values) in &self.meta {
            let values: Vec<String> = values.iter().map(|v| quote_if_necessary(v)).collect();
            config.push_str(&format!("  META {} {}\n", quote_if_necessary(key), values.join(" ")));
        }
        for processor in self.processors.values() {
            config.push_str(&processor.to_config());
        }
        for item in self.sorted_items() {
            if cmd_or_tlm == CmdOrTlm::Telemetry && is_received_item(&item.name) {
                continue;
            }
            config.push_str(&item.to_config(cmd_or_tlm, self.default_endianness));
        }
        config
    }
}

/// Items injected into every telemetry packet.
pub const RECEIVED_ITEMS: [&str; 3] = ["RECEIVED_TIMESECONDS", "RECEIVED_TIMEFORMATTED", "RECEIVED_COUNT"];

pub fn is_received_item(name: &str) -> bool {
    RECEIVED_ITEMS.contains(&name)
}

fn compare_items(a: &PacketItem, b: &PacketItem) -> Ordering {
    if a.bit_offset == 0 && b.bit_offset == 0 {
        return a
            .bit_size
            .cmp(&b.bit_size)
            .then(a.create_index.cmp(&b.create_index));
    }
    (a.bit_offset < 0)
        .cmp(&(b.bit_offset < 0))
        .then(a.bit_offset.cmp(&b.bit_offset))
        .then(a.create_index.cmp(&b.create_index))
}

/// Offset at which the item following `item` is expected to start.
/// Variably sized items yield their (non-positive) size.
fn next_bit_offset(item: &PacketItem) -> i64 {
    if let Some(array_size) = item.array_size {
        return if array_size > 0 {
            item.bit_offset + array_size
        } else {
            array_size
        };
    }
    if item.bit_offset > 0 && item.is_little_endian_bitfield() {
        // Offset names the most significant bit of a little endian bitfield
        let bits_remaining_in_last_byte = 8 - (item.bit_offset % 8);
        if item.bit_size > bits_remaining_in_last_byte {
            return item.bit_offset + bits_remaining_in_last_byte;
        }
    }
    if item.bit_size > 0 {
        item.bit_offset + item.bit_size
    } else {
        item.bit_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packets::value::Value;

    fn packet() -> Packet {
        Packet::new("tgt1", "pkt1", Endianness::BigEndian, None)
    }

    #[test]
    fn test_names_are_upcased() {
        let mut p = packet();
        p.define_item("item1", 0, 8, DataType::Uint, None, None).unwrap();
        assert_eq!(p.target_name(), "TGT1");
        assert_eq!(p.packet_name(), "PKT1");
        assert!(p.has_item("Item1"));
        assert_eq!(p.get_item("ITEM1").unwrap().name, "ITEM1");
    }

    #[test]
    fn test_get_unknown_item() {
        let p = packet();
        assert_eq!(
            p.get_item("nope").unwrap_err(),
            PacketError::UnknownItem { name: "nope".into() }
        );
    }

    #[test]
    fn test_append_item_tracks_length() {
        let mut p = packet();
        p.append_item("a", 8, DataType::Uint, None, None).unwrap();
        p.append_item("b", 16, DataType::Uint, Some(64), None).unwrap();
        p.append_item("c", 32, DataType::Float, None, None).unwrap();
        assert_eq!(p.get_item("b").unwrap().bit_offset, 8);
        assert_eq!(p.get_item("c").unwrap().bit_offset, 72);
        assert_eq!(p.defined_length_bits(), 104);
        assert_eq!(p.defined_length(), 13);
        assert!(p.is_packed());
    }

    #[test]
    fn test_append_after_variable_size_fails() {
        let mut p = packet();
        p.append_item("text", 0, DataType::String, None, None).unwrap();
        assert!(!p.fixed_size());
        assert_eq!(
            p.append_item("after", 8, DataType::Uint, None, None).unwrap_err(),
            PacketError::AppendAfterVariableSize
        );
    }

    #[test]
    fn test_redefine_replaces_in_place() {
        let mut p = packet();
        p.define_item("a", 0, 8, DataType::Uint, None, None).unwrap();
        p.define_item("b", 8, 8, DataType::Uint, None, None).unwrap();
        p.define_item("a", 0, 8, DataType::Int, None, None).unwrap();
        assert_eq!(p.items().len(), 2);
        assert_eq!(p.items()[0].data_type, DataType::Int);
    }

    #[test]
    fn test_rename_item() {
        let mut p = packet();
        p.define_item("a", 0, 8, DataType::Uint, None, None).unwrap();
        p.define_item("b", 8, 8, DataType::Uint, None, None).unwrap();
        assert_eq!(
            p.rename_item("a", "b").unwrap_err(),
            PacketError::ItemExists { name: "B".into() }
        );
        p.rename_item("a", "c").unwrap();
        assert!(!p.has_item("a"));
        assert_eq!(p.items()[0].name, "C");
    }

    #[test]
    fn test_sorted_items_order() {
        let mut p = packet();
        p.define_item("tail", -16, 16, DataType::Uint, None, None).unwrap();
        p.define_item("body", 8, 8, DataType::Uint, None, None).unwrap();
        p.define_item("head", 0, 8, DataType::Uint, None, None).unwrap();
        p.define_item("derived", 0, 0, DataType::Derived, None, None).unwrap();
        p.define_item("end", -32, 16, DataType::Uint, None, None).unwrap();
        let names: Vec<&str> = p.sorted_items().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["DERIVED", "HEAD", "BODY", "END", "TAIL"]);
        assert!(!p.is_packed());
    }

    #[test]
    fn test_check_bit_offsets_overlap() {
        let mut p = packet();
        p.define_item("item1", 0, 8, DataType::Uint, None, None).unwrap();
        p.define_item("item2", 0, 8, DataType::Uint, None, None).unwrap();
        assert_eq!(
            p.check_bit_offsets(),
            vec!["Bit definition overlap at bit offset 0 for packet TGT1 PKT1 items ITEM2 and ITEM1"]
        );

        let mut p = packet();
        p.define_item("item1", 0, 32, DataType::Uint, None, None).unwrap();
        p.define_item("item2", 16, 32, DataType::Uint, None, None).unwrap();
        assert_eq!(
            p.check_bit_offsets(),
            vec!["Bit definition overlap at bit offset 16 for packet TGT1 PKT1 items ITEM2 and ITEM1"]
        );
    }

    #[test]
    fn test_check_bit_offsets_negative() {
        let mut p = packet();
        p.define_item("item1", 0, 8, DataType::Uint, None, None).unwrap();
        p.define_item("item2", 8, -16, DataType::Block, None, None).unwrap();
        p.define_item("item3", -16, 16, DataType::Uint, None, None).unwrap();
        assert!(p.check_bit_offsets().is_empty());

        p.define_item("item3", -17, 16, DataType::Uint, None, None).unwrap();
        assert_eq!(
            p.check_bit_offsets(),
            vec!["Bit definition overlap at bit offset -17 for packet TGT1 PKT1 items ITEM3 and ITEM2"]
        );
    }

    #[test]
    fn test_id_items() {
        let mut p = packet();
        p.append_item("opcode", 8, DataType::Uint, None, None)
            .unwrap()
            .set_id_value(Some(Value::Int(5)))
            .unwrap();
        p.update_id_items("opcode").unwrap();
        p.update_id_items("opcode").unwrap();
        assert_eq!(p.id_items().len(), 1);
        assert_eq!(p.id_items()[0].id_value, Some(Value::Int(5)));
    }

    #[test]
    fn test_limits_sets_always_has_default() {
        let p = packet();
        assert!(p.limits_sets().contains("DEFAULT"));
        assert!(p.limits_items().is_empty());
    }
}
