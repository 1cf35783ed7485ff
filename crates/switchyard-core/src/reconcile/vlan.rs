// VLAN table, port type, and PVID diffs.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::changed_entries;

/// One static VLAN and its port membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VlanStaticEntry {
    pub vlan_id: u16,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub egress_ports: BTreeSet<u32>,
    #[serde(default)]
    pub untagged_ports: BTreeSet<u32>,
    #[serde(default)]
    pub te_mstid: bool,
}

impl VlanStaticEntry {
    /// Entry named `v<id>` with no member ports.
    pub fn new(vlan_id: u16) -> Self {
        Self {
            vlan_id,
            name: format!("v{vlan_id}"),
            egress_ports: BTreeSet::new(),
            untagged_ports: BTreeSet::new(),
            te_mstid: false,
        }
    }

    pub fn with_ports(mut self, ports: impl IntoIterator<Item = u32>) -> Self {
        self.egress_ports.extend(ports);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum PortType {
    Access,
    Trunk,
    Hybrid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortTypeEntry {
    pub port_id: u32,
    pub port_type: PortType,
}

/// Port default VLAN and priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortVlanEntry {
    pub port_id: u32,
    pub pvid: u16,
    #[serde(default)]
    pub pcp: u8,
}

/// Desired VLAN configuration for one device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VlanConfig {
    pub vlans: Vec<VlanStaticEntry>,
    pub port_types: Vec<PortTypeEntry>,
    pub pvids: Vec<PortVlanEntry>,
    pub management_vlan: Option<u16>,
}

/// Changes to the VLAN table itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VlanDiff {
    /// Ascending.
    pub delete_vlan_ids: Vec<u16>,
    /// Ascending.
    pub add_vlan_ids: Vec<u16>,
    /// Entries whose fields must be written after delete and add.
    pub set_table: Vec<VlanStaticEntry>,
}

impl VlanDiff {
    pub fn is_empty(&self) -> bool {
        self.delete_vlan_ids.is_empty() && self.add_vlan_ids.is_empty() && self.set_table.is_empty()
    }
}

/// Diff a desired VLAN table against the device's table.
///
/// Unchanged entries produce nothing. Observed entries missing from
/// `desired` are deleted unless reserved. Changed entries are deleted and
/// re-created, except reserved ones, which only get their fields written.
pub fn diff_vlan_table(
    desired: &[VlanStaticEntry],
    observed: &[VlanStaticEntry],
    reserved: &BTreeSet<u16>,
) -> VlanDiff {
    let mut set_table: BTreeMap<u16, &VlanStaticEntry> =
        desired.iter().map(|e| (e.vlan_id, e)).collect();
    let mut to_add: BTreeSet<u16> = set_table.keys().copied().collect();
    let mut to_delete = BTreeSet::new();

    for current in observed {
        let id = current.vlan_id;
        let is_reserved = reserved.contains(&id);
        match set_table.get(&id) {
            None => {
                if !is_reserved {
                    to_delete.insert(id);
                }
            }
            Some(wanted) if *wanted == current => {
                to_add.remove(&id);
                set_table.remove(&id);
            }
            Some(_) if is_reserved => {
                to_add.remove(&id);
            }
            Some(_) => {
                to_delete.insert(id);
            }
        }
    }

    VlanDiff {
        delete_vlan_ids: to_delete.into_iter().collect(),
        add_vlan_ids: to_add.into_iter().collect(),
        set_table: set_table.into_values().cloned().collect(),
    }
}

/// Desired port types that differ from the device.
pub fn diff_port_types(desired: &[PortTypeEntry], observed: &[PortTypeEntry]) -> Vec<PortTypeEntry> {
    changed_entries(desired, observed, |e| e.port_id)
}

/// Desired PVID entries that differ from the device.
pub fn diff_port_pvids(desired: &[PortVlanEntry], observed: &[PortVlanEntry]) -> Vec<PortVlanEntry> {
    changed_entries(desired, observed, |e| e.port_id)
}
