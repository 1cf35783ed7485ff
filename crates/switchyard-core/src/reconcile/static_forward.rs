// Static unicast and multicast forwarding diff.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::actions;
use crate::capability::{CapabilityKey, FeatureGroup, keys};
use crate::device::{DEFAULT_PVID, MacAddress};

/// Which static forwarding table an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum ForwardKind {
    Unicast,
    Multicast,
}

impl ForwardKind {
    pub fn capability(self) -> CapabilityKey {
        match self {
            Self::Unicast => keys::STATIC_UNICAST,
            Self::Multicast => keys::STATIC_MULTICAST,
        }
    }

    pub fn is_enabled(self, group: &FeatureGroup) -> bool {
        let forward = &group.configuration.static_forward_setting;
        match self {
            Self::Unicast => forward.unicast,
            Self::Multicast => forward.multicast,
        }
    }

    pub(crate) fn get_action(self) -> &'static str {
        match self {
            Self::Unicast => actions::GET_STATIC_UNICAST,
            Self::Multicast => actions::GET_STATIC_MULTICAST,
        }
    }

    pub(crate) fn add_action(self) -> &'static str {
        match self {
            Self::Unicast => actions::ADD_STATIC_UNICAST,
            Self::Multicast => actions::ADD_STATIC_MULTICAST,
        }
    }

    pub(crate) fn delete_action(self) -> &'static str {
        match self {
            Self::Unicast => actions::DELETE_STATIC_UNICAST,
            Self::Multicast => actions::DELETE_STATIC_MULTICAST,
        }
    }
}

/// One static forwarding entry, keyed by VLAN and MAC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticForwardEntry {
    pub vlan_id: u16,
    pub mac: MacAddress,
    #[serde(default)]
    pub egress_ports: BTreeSet<u32>,
}

impl StaticForwardEntry {
    fn key(&self) -> (u16, MacAddress) {
        (self.vlan_id, self.mac.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardDiff {
    pub remove: Vec<StaticForwardEntry>,
    pub add: Vec<StaticForwardEntry>,
}

impl ForwardDiff {
    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.add.is_empty()
    }
}

/// Diff a desired forwarding table against the device's table.
///
/// Entries on the default VLAN are owned by the device and never removed.
/// Entries with the same key but different egress ports are removed and
/// re-added. Both lists are ordered by (VLAN, MAC).
pub fn diff_static_forward(
    desired: &[StaticForwardEntry],
    observed: &[StaticForwardEntry],
) -> ForwardDiff {
    let mut to_add: BTreeMap<(u16, MacAddress), &StaticForwardEntry> =
        desired.iter().map(|e| (e.key(), e)).collect();
    let mut remove = Vec::new();

    for current in observed {
        let key = current.key();
        if to_add.get(&key).is_some_and(|wanted| *wanted == current) {
            to_add.remove(&key);
            continue;
        }
        if current.vlan_id == DEFAULT_PVID {
            continue;
        }
        remove.push(current.clone());
    }

    remove.sort_by_key(StaticForwardEntry::key);
    ForwardDiff {
        remove,
        add: to_add.into_values().cloned().collect(),
    }
}

/// VLANs referenced by `desired` that the device does not have, ascending.
pub fn missing_vlans(desired: &[StaticForwardEntry], existing: &BTreeSet<u16>) -> Vec<u16> {
    desired
        .iter()
        .map(|e| e.vlan_id)
        .filter(|id| !existing.contains(id))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
