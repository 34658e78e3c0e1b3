// crates/cmdtlm-rs/src/packets/packet_maps.rs

use super::packet::Packet;
use super::types::CmdOrTlm;
use std::collections::{BTreeMap, BTreeSet};

/// Command and telemetry packets keyed by target, each target holding its
/// packets in definition order.
#[derive(Debug, Default)]
pub struct PacketMaps {
    commands: BTreeMap<String, Vec<Packet>>,
    telemetry: BTreeMap<String, Vec<Packet>>,
}

impl PacketMaps {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self, kind: CmdOrTlm) -> &BTreeMap<String, Vec<Packet>> {
        match kind {
            CmdOrTlm::Command => &self.commands,
            CmdOrTlm::Telemetry => &self.telemetry,
        }
    }

    fn map_mut(&mut self, kind: CmdOrTlm) -> &mut BTreeMap<String, Vec<Packet>> {
        match kind {
            CmdOrTlm::Command => &mut self.commands,
            CmdOrTlm::Telemetry => &mut self.telemetry,
        }
    }

    /// Inserts `packet` under its target, replacing (in place) and returning
    /// a packet of the same name.
    pub fn upsert(&mut self, kind: CmdOrTlm, packet: Packet) -> Option<Packet> {
        let packets = self
            .map_mut(kind)
            .entry(packet.target_name().to_string())
            .or_default();
        match packets
            .iter()
            .position(|p| p.packet_name() == packet.packet_name())
        {
            Some(pos) => Some(std::mem::replace(&mut packets[pos], packet)),
            None => {
                packets.push(packet);
                None
            }
        }
    }

    pub fn get(&self, kind: CmdOrTlm, target_name: &str, packet_name: &str) -> Option<&Packet> {
        let packet_name = packet_name.to_ascii_uppercase();
        self.map(kind)
            .get(&target_name.to_ascii_uppercase())?
            .iter()
            .find(|p| p.packet_name() == packet_name)
    }

    pub fn get_mut(
        &mut self,
        kind: CmdOrTlm,
        target_name: &str,
        packet_name: &str,
    ) -> Option<&mut Packet> {
        let packet_name = packet_name.to_ascii_uppercase();
        self.map_mut(kind)
            .get_mut(&target_name.to_ascii_uppercase())?
            .iter_mut()
            .find(|p| p.packet_name() == packet_name)
    }

    pub fn contains(&self, kind: CmdOrTlm, target_name: &str, packet_name: &str) -> bool {
        self.get(kind, target_name, packet_name).is_some()
    }

    /// Packets of one target in their current order.
    pub fn packets(&self, kind: CmdOrTlm, target_name: &str) -> &[Packet] {
        self.map(kind)
            .get(&target_name.to_ascii_uppercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Removes a packet, returning it.
    pub fn remove(&mut self, kind: CmdOrTlm, target_name: &str, packet_name: &str) -> Option<Packet> {
        let packet_name = packet_name.to_ascii_uppercase();
        let packets = self.map_mut(kind).get_mut(&target_name.to_ascii_uppercase())?;
        let pos = packets.iter().position(|p| p.packet_name() == packet_name)?;
        Some(packets.remove(pos))
    }

    /// Drops abstract packets of `target_name` from both maps.
    pub fn remove_abstract(&mut self, target_name: &str) {
        let target = target_name.to_ascii_uppercase();
        for kind in [CmdOrTlm::Command, CmdOrTlm::Telemetry] {
            if let Some(packets) = self.map_mut(kind).get_mut(&target) {
                packets.retain(|p| !p.is_abstract);
            }
        }
    }

    /// Reverses the packet order of `target_name` in both maps.
    pub fn reverse_packet_order(&mut self, target_name: &str) {
        let target = target_name.to_ascii_uppercase();
        for kind in [CmdOrTlm::Command, CmdOrTlm::Telemetry] {
            if let Some(packets) = self.map_mut(kind).get_mut(&target) {
                packets.reverse();
            }
        }
    }

    /// Moves every packet of `other` into `self`, in order. Packets that
    /// already exist are replaced in place.
    pub fn merge(&mut self, other: PacketMaps) {
        for (kind, map) in [
            (CmdOrTlm::Command, other.commands),
            (CmdOrTlm::Telemetry, other.telemetry),
        ] {
            for packet in map.into_values().flatten() {
                self.upsert(kind, packet);
            }
        }
    }

    /// Every target with at least one command or telemetry packet.
    pub fn targets(&self) -> BTreeSet<String> {
        self.commands
            .iter()
            .chain(self.telemetry.iter())
            .filter(|(_, packets)| !packets.is_empty())
            .map(|(target, _)| target.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packets::types::Endianness;

    fn packet(target: &str, name: &str) -> Packet {
        Packet::new(target, name, Endianness::BigEndian, None)
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut maps = PacketMaps::new();
        assert!(maps.upsert(CmdOrTlm::Telemetry, packet("inst", "a")).is_none());
        assert!(maps.upsert(CmdOrTlm::Telemetry, packet("inst", "b")).is_none());
        let mut replacement = packet("inst", "a");
        replacement.description = Some("new".into());
        assert!(maps.upsert(CmdOrTlm::Telemetry, replacement).is_some());

        let packets = maps.packets(CmdOrTlm::Telemetry, "INST");
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].description.as_deref(), Some("new"));
        assert!(maps.get(CmdOrTlm::Command, "INST", "A").is_none());
    }

    #[test]
    fn test_remove_abstract_and_reverse() {
        let mut maps = PacketMaps::new();
        let mut base = packet("inst", "base");
        base.is_abstract = true;
        maps.upsert(CmdOrTlm::Command, base);
        maps.upsert(CmdOrTlm::Command, packet("inst", "one"));
        maps.upsert(CmdOrTlm::Command, packet("inst", "two"));
        maps.upsert(CmdOrTlm::Telemetry, packet("other", "tlm"));

        maps.remove_abstract("inst");
        maps.reverse_packet_order("inst");
        let names: Vec<&str> = maps
            .packets(CmdOrTlm::Command, "inst")
            .iter()
            .map(|p| p.packet_name())
            .collect();
        assert_eq!(names, vec!["TWO", "ONE"]);
        assert_eq!(
            maps.targets().into_iter().collect::<Vec<_>>(),
            vec!["INST".to_string(), "OTHER".to_string()]
        );
    }

    #[test]
    fn test_merge_appends_and_replaces() {
        let mut maps = PacketMaps::new();
        maps.upsert(CmdOrTlm::Telemetry, packet("inst", "a"));
        maps.upsert(CmdOrTlm::Telemetry, packet("inst", "b"));

        let mut other = PacketMaps::new();
        let mut replacement = packet("inst", "a");
        replacement.description = Some("imported".into());
        other.upsert(CmdOrTlm::Telemetry, packet("inst", "c"));
        other.upsert(CmdOrTlm::Telemetry, replacement);
        other.upsert(CmdOrTlm::Command, packet("inst", "cmd"));
        maps.merge(other);

        let names: Vec<&str> = maps
            .packets(CmdOrTlm::Telemetry, "INST")
            .iter()
            .map(|p| p.packet_name())
            .collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(
            maps.get(CmdOrTlm::Telemetry, "INST", "A").unwrap().description.as_deref(),
            Some("imported")
        );
        assert!(maps.contains(CmdOrTlm::Command, "INST", "CMD"));
    }
}
