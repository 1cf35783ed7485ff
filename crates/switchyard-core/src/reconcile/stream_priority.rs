// Per-stream priority ingress rules.
//
// Rules live in numbered slots per port. Reconciling keeps rules already
// present in the desired set, removes the rest, and places new rules in
// the lowest free slot of their port.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::device::DEFAULT_PVID;
use crate::error::CoreError;

/// One ingress classification rule on a port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamPriorityEntry {
    pub port_id: u32,
    /// Slot on the port. Assigned by the diff for new rules.
    #[serde(default)]
    pub ingress_index: u16,
    #[serde(default = "enabled")]
    pub index_enable: bool,
    pub vlan_id: u16,
    pub vlan_pcp: u8,
    #[serde(default)]
    pub ethertype_value: u16,
    #[serde(default)]
    pub subtype_enable: bool,
    #[serde(default)]
    pub subtype_value: u8,
}

fn enabled() -> bool {
    true
}

impl StreamPriorityEntry {
    /// Same port and classification, regardless of slot.
    fn same_rule(&self, other: &Self) -> bool {
        self.port_id == other.port_id
            && self.index_enable == other.index_enable
            && self.vlan_id == other.vlan_id
            && self.vlan_pcp == other.vlan_pcp
            && self.ethertype_value == other.ethertype_value
            && self.subtype_enable == other.subtype_enable
            && self.subtype_value == other.subtype_value
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamPriorityDiff {
    pub remove: Vec<StreamPriorityEntry>,
    /// New rules with their assigned `ingress_index`.
    pub add: Vec<StreamPriorityEntry>,
}

impl StreamPriorityDiff {
    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.add.is_empty()
    }
}

/// Lowest slot in `0..max` not in `occupied`.
pub fn find_idle_index(max: u16, occupied: &BTreeSet<u16>) -> Result<u16, CoreError> {
    (0..max)
        .find(|index| !occupied.contains(index))
        .ok_or_else(|| CoreError::Internal(format!("all {max} ingress slots are in use")))
}

/// Diff desired ingress rules against the device's rules.
///
/// Observed rules on the default VLAN are device-owned and keep their
/// slots. Observed rules matching a desired rule on the same port are kept
/// in place. Every other observed rule is removed, freeing its slot.
pub fn diff_stream_priority(
    desired: &[StreamPriorityEntry],
    observed: &[StreamPriorityEntry],
    max: u16,
) -> Result<StreamPriorityDiff, CoreError> {
    let mut to_add: Vec<StreamPriorityEntry> = desired.to_vec();
    let mut occupied: BTreeMap<u32, BTreeSet<u16>> = BTreeMap::new();
    let mut remove = Vec::new();

    for current in observed {
        if current.vlan_id == DEFAULT_PVID {
            occupied.entry(current.port_id).or_default().insert(current.ingress_index);
            continue;
        }
        if let Some(pos) = to_add.iter().position(|wanted| wanted.same_rule(current)) {
            to_add.remove(pos);
            occupied.entry(current.port_id).or_default().insert(current.ingress_index);
            continue;
        }
        remove.push(current.clone());
    }

    for rule in &mut to_add {
        let slots = occupied.entry(rule.port_id).or_default();
        let index = find_idle_index(max, slots).map_err(|_| {
            CoreError::Internal(format!(
                "no free ingress index on port {} (max {max})",
                rule.port_id
            ))
        })?;
        slots.insert(index);
        rule.ingress_index = index;
    }

    remove.sort_by_key(|e| (e.port_id, e.ingress_index));
    to_add.sort_by_key(|e| (e.port_id, e.ingress_index));
    Ok(StreamPriorityDiff {
        remove,
        add: to_add,
    })
}
