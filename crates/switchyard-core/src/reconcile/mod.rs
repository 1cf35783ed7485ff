// ── Reconciliation engine ──
//
// Reads a device's live tables through the dispatcher, diffs them against
// the desired configuration, and applies the minimal change set. The diff
// functions are pure; `Reconciler` adds the southbound reads and writes.
// Writes are ordered delete, add, then field updates, and the cancellation
// token is checked after every southbound call.

pub mod static_forward;
pub mod stream_priority;
pub mod vlan;

use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::actions::{self, ManagementVlan};
use crate::capability::{CapabilityBinding, CapabilityKey, keys};
use crate::device::Device;
use crate::dispatcher::{Dispatcher, decode};
use crate::error::CoreError;
use crate::profile::ProfileStore;

pub use static_forward::{ForwardDiff, ForwardKind, StaticForwardEntry, diff_static_forward, missing_vlans};
pub use stream_priority::{
    StreamPriorityDiff, StreamPriorityEntry, diff_stream_priority, find_idle_index,
};
pub use vlan::{
    PortType, PortTypeEntry, PortVlanEntry, VlanConfig, VlanDiff, VlanStaticEntry, diff_port_pvids,
    diff_port_types, diff_vlan_table,
};

/// Desired entries that are missing from, or differ in, `observed`.
pub(crate) fn changed_entries<T, K>(desired: &[T], observed: &[T], key: impl Fn(&T) -> K) -> Vec<T>
where
    T: Clone + PartialEq,
    K: Eq + Hash,
{
    let current: HashMap<K, &T> = observed.iter().map(|e| (key(e), e)).collect();
    desired
        .iter()
        .filter(|e| current.get(&key(e)).is_none_or(|c| *c != *e))
        .cloned()
        .collect()
}

/// Everything `configure_vlan` will write, in application order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VlanPlan {
    pub table: VlanDiff,
    pub port_types: Vec<PortTypeEntry>,
    pub pvids: Vec<PortVlanEntry>,
    /// New management VLAN, when it changes.
    pub management_vlan: Option<u16>,
}

impl VlanPlan {
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
            && self.port_types.is_empty()
            && self.pvids.is_empty()
            && self.management_vlan.is_none()
    }
}

// ── Reconciler ──────────────────────────────────────────────────────

/// Drives diff-and-apply for one device at a time.
#[derive(Clone)]
pub struct Reconciler {
    dispatcher: Dispatcher,
    profiles: ProfileStore,
}

impl Reconciler {
    pub fn new(dispatcher: Dispatcher, profiles: ProfileStore) -> Self {
        Self {
            dispatcher,
            profiles,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Resolve a binding the feature group asserts is present.
    fn binding(&self, device: &Device, key: &CapabilityKey) -> Result<CapabilityBinding, CoreError> {
        let binding = self.profiles.resolve_for_device(device, key)?;
        if binding.is_supported() {
            Ok(binding)
        } else {
            Err(CoreError::not_found("capability method", key.to_string()))
        }
    }

    async fn read<T: serde::de::DeserializeOwned>(
        &self,
        device: &Device,
        binding: &CapabilityBinding,
        action: &str,
    ) -> Result<T, CoreError> {
        let value = self.dispatcher.invoke(device, binding, action, None).await?;
        self.dispatcher.check_cancelled()?;
        if value.is_null() {
            return decode(action, Value::Array(Vec::new()));
        }
        decode(action, value)
    }

    async fn write<P: Serialize + ?Sized>(
        &self,
        device: &Device,
        binding: &CapabilityBinding,
        action: &str,
        payload: &P,
    ) -> Result<(), CoreError> {
        debug!(device = %device.address, action, "applying change");
        self.dispatcher.set(device, binding, action, payload).await?;
        self.dispatcher.check_cancelled()
    }

    // ── VLAN ─────────────────────────────────────────────────────────

    /// Compute the VLAN plan, or `None` when the device has no VLAN method.
    pub async fn vlan_plan(&self, device: &Device, desired: &VlanConfig) -> Result<Option<VlanPlan>, CoreError> {
        let flags = &device.property.feature_group.configuration.vlan_setting;
        if !flags.vlan_method {
            debug!(device = %device.address, "VLAN method unsupported, skipping");
            return Ok(None);
        }

        let vlan_binding = self.binding(device, &keys::VLAN_METHOD)?;
        let observed: Vec<VlanStaticEntry> = self.read(device, &vlan_binding, actions::GET_VLAN).await?;

        let mut reserved = device.property.reserved_vlans.clone();
        let mut management_vlan = None;
        if flags.management_vlan {
            let binding = self.binding(device, &keys::MANAGEMENT_VLAN)?;
            let value = self
                .dispatcher
                .invoke(device, &binding, actions::GET_MANAGEMENT_VLAN, None)
                .await?;
            self.dispatcher.check_cancelled()?;
            let current: ManagementVlan = decode(actions::GET_MANAGEMENT_VLAN, value)?;
            reserved.insert(current.vlan_id);
            if let Some(wanted) = desired.management_vlan.filter(|id| *id != current.vlan_id) {
                reserved.insert(wanted);
                management_vlan = Some(wanted);
            }
        }

        let mut plan = VlanPlan {
            table: diff_vlan_table(&desired.vlans, &observed, &reserved),
            management_vlan,
            ..VlanPlan::default()
        };

        if flags.access_trunk_mode && !desired.port_types.is_empty() {
            let binding = self.binding(device, &keys::ACCESS_TRUNK_MODE)?;
            let current: Vec<PortTypeEntry> = self.read(device, &binding, actions::GET_PORT_TYPE).await?;
            plan.port_types = diff_port_types(&desired.port_types, &current);
        }

        if flags.default_pvid && !desired.pvids.is_empty() {
            let binding = self.binding(device, &keys::DEFAULT_PVID)?;
            let current: Vec<PortVlanEntry> = self.read(device, &binding, actions::GET_PVID).await?;
            plan.pvids = diff_port_pvids(&desired.pvids, &current);
        }

        Ok(Some(plan))
    }

    /// Converge the device's VLAN configuration to `desired`.
    ///
    /// Returns the applied plan, or `None` when VLANs are unsupported.
    pub async fn configure_vlan(
        &self,
        device: &Device,
        desired: &VlanConfig,
    ) -> Result<Option<VlanPlan>, CoreError> {
        let Some(plan) = self.vlan_plan(device, desired).await? else {
            return Ok(None);
        };
        if plan.is_empty() {
            info!(device = %device.address, "VLAN configuration already converged");
            return Ok(Some(plan));
        }

        let vlan_binding = self.binding(device, &keys::VLAN_METHOD)?;
        if !plan.table.delete_vlan_ids.is_empty() {
            self.write(device, &vlan_binding, actions::DELETE_VLAN, &plan.table.delete_vlan_ids)
                .await?;
        }
        if !plan.table.add_vlan_ids.is_empty() {
            self.write(device, &vlan_binding, actions::ADD_VLAN, &plan.table.add_vlan_ids)
                .await?;
        }
        if !plan.port_types.is_empty() {
            let binding = self.binding(device, &keys::ACCESS_TRUNK_MODE)?;
            self.write(device, &binding, actions::SET_PORT_TYPE, &plan.port_types)
                .await?;
        }
        if !plan.pvids.is_empty() {
            let binding = self.binding(device, &keys::DEFAULT_PVID)?;
            self.write(device, &binding, actions::SET_PVID, &plan.pvids).await?;
        }
        if !plan.table.set_table.is_empty() {
            self.write(device, &vlan_binding, actions::SET_VLAN, &plan.table.set_table)
                .await?;
        }
        if let Some(vlan_id) = plan.management_vlan {
            let binding = self.binding(device, &keys::MANAGEMENT_VLAN)?;
            self.write(device, &binding, actions::SET_MANAGEMENT_VLAN, &ManagementVlan { vlan_id })
                .await?;
        }

        info!(
            device = %device.address,
            deleted = plan.table.delete_vlan_ids.len(),
            added = plan.table.add_vlan_ids.len(),
            updated = plan.table.set_table.len(),
            "VLAN configuration applied"
        );
        Ok(Some(plan))
    }

    // ── Static forwarding ────────────────────────────────────────────

    pub async fn static_forward_diff(
        &self,
        device: &Device,
        kind: ForwardKind,
        desired: &[StaticForwardEntry],
    ) -> Result<Option<ForwardDiff>, CoreError> {
        if !kind.is_enabled(&device.property.feature_group) {
            debug!(device = %device.address, %kind, "static forwarding unsupported, skipping");
            return Ok(None);
        }

        let vlan_binding = self.binding(device, &keys::VLAN_METHOD)?;
        let vlans: Vec<VlanStaticEntry> = self.read(device, &vlan_binding, actions::GET_VLAN).await?;
        let existing: BTreeSet<u16> = vlans.iter().map(|v| v.vlan_id).collect();
        if let Some(missing) = missing_vlans(desired, &existing).first() {
            return Err(CoreError::not_found("VLAN", missing.to_string()));
        }

        let binding = self.binding(device, &kind.capability())?;
        let observed: Vec<StaticForwardEntry> = self.read(device, &binding, kind.get_action()).await?;
        Ok(Some(diff_static_forward(desired, &observed)))
    }

    pub async fn configure_static_forward(
        &self,
        device: &Device,
        kind: ForwardKind,
        desired: &[StaticForwardEntry],
    ) -> Result<Option<ForwardDiff>, CoreError> {
        let Some(diff) = self.static_forward_diff(device, kind, desired).await? else {
            return Ok(None);
        };

        let binding = self.binding(device, &kind.capability())?;
        if !diff.remove.is_empty() {
            self.write(device, &binding, kind.delete_action(), &diff.remove).await?;
        }
        if !diff.add.is_empty() {
            self.write(device, &binding, kind.add_action(), &diff.add).await?;
        }
        info!(
            device = %device.address,
            %kind,
            removed = diff.remove.len(),
            added = diff.add.len(),
            "static forwarding applied"
        );
        Ok(Some(diff))
    }

    // ── Stream priority ──────────────────────────────────────────────

    pub async fn stream_priority_diff(
        &self,
        device: &Device,
        desired: &[StreamPriorityEntry],
    ) -> Result<Option<StreamPriorityDiff>, CoreError> {
        if !device.property.feature_group.configuration.vlan_setting.per_stream_priority {
            debug!(device = %device.address, "per-stream priority unsupported, skipping");
            return Ok(None);
        }

        let binding = self.binding(device, &keys::PER_STREAM_PRIORITY)?;
        let observed: Vec<StreamPriorityEntry> =
            self.read(device, &binding, actions::GET_STREAM_PRIORITY).await?;
        let max = device.property.stream_priority_ingress_index_max;
        diff_stream_priority(desired, &observed, max).map(Some)
    }

    pub async fn configure_stream_priority(
        &self,
        device: &Device,
        desired: &[StreamPriorityEntry],
    ) -> Result<Option<StreamPriorityDiff>, CoreError> {
        let Some(diff) = self.stream_priority_diff(device, desired).await? else {
            return Ok(None);
        };

        let binding = self.binding(device, &keys::PER_STREAM_PRIORITY)?;
        if !diff.remove.is_empty() {
            self.write(device, &binding, actions::DELETE_STREAM_PRIORITY, &diff.remove)
                .await?;
        }
        if !diff.add.is_empty() {
            self.write(device, &binding, actions::ADD_STREAM_PRIORITY, &diff.add)
                .await?;
        }
        info!(
            device = %device.address,
            removed = diff.remove.len(),
            added = diff.add.len(),
            "stream priority applied"
        );
        Ok(Some(diff))
    }
}
