// ── FeatureGroup ──
//
// Precomputed boolean summary of a profile's capabilities. Computed once
// from the bindings; dependent flags follow explicit prerequisite rules
// and are forced off without a lookup when the prerequisite is off.

use serde::{Deserialize, Serialize};

use super::{CapabilityKey, CapabilitySet, keys};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FeatureGroup {
    pub auto_scan: AutoScanGroup,
    pub operation: OperationGroup,
    pub configuration: ConfigurationGroup,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AutoScanGroup {
    pub broadcast_search: bool,
    pub identify: IdentifyGroup,
    #[serde(rename = "LLDP")]
    pub lldp: bool,
    pub device_information: DeviceInformationGroup,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct IdentifyGroup {
    pub model_name: bool,
    #[serde(rename = "VendorID")]
    pub vendor_id: bool,
    pub firmware_version: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DeviceInformationGroup {
    pub device_name: bool,
    #[serde(rename = "MACTable")]
    pub mac_table: bool,
    pub interface_name: bool,
    pub port_speed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct OperationGroup {
    pub reboot: bool,
    pub factory_default: bool,
    pub firmware_upgrade: bool,
    #[serde(rename = "EnableSNMPService")]
    pub enable_snmp_service: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ConfigurationGroup {
    pub network_setting: bool,
    #[serde(rename = "VLANSetting")]
    pub vlan_setting: VlanSettingGroup,
    pub static_forward_setting: StaticForwardGroup,
    #[serde(rename = "STPRSTP")]
    pub stp_rstp: StpRstpGroup,
    #[serde(rename = "TSN")]
    pub tsn: TsnGroup,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct VlanSettingGroup {
    #[serde(rename = "VLANMethod")]
    pub vlan_method: bool,
    pub access_trunk_mode: bool,
    pub hybrid_mode: bool,
    #[serde(rename = "TEMSTID")]
    pub te_mstid: bool,
    #[serde(rename = "DefaultPVID")]
    pub default_pvid: bool,
    #[serde(rename = "DefaultPCP")]
    pub default_pcp: bool,
    pub per_stream_priority: bool,
    #[serde(rename = "ManagementVLAN")]
    pub management_vlan: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct StaticForwardGroup {
    pub unicast: bool,
    pub multicast: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct StpRstpGroup {
    #[serde(rename = "RSTP")]
    pub rstp: bool,
    pub root_guard: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TsnGroup {
    #[serde(rename = "IEEE802Dot1Qbv")]
    pub qbv: bool,
    #[serde(rename = "IEEE802Dot1CB")]
    pub cb: bool,
}

impl FeatureGroup {
    /// Derive the flags from a capability set.
    ///
    /// A flag is set when its triple resolves to a binding with at least
    /// one method.
    pub fn derive(capabilities: &CapabilitySet) -> Self {
        Self::derive_with(|key| {
            capabilities
                .resolve(key)
                .is_ok_and(|binding| binding.is_supported())
        })
    }

    /// Derive the flags through an arbitrary support lookup.
    pub fn derive_with(mut supported: impl FnMut(&CapabilityKey) -> bool) -> Self {
        let mut group = Self::default();

        let scan = &mut group.auto_scan;
        scan.broadcast_search = supported(&keys::BROADCAST_SEARCH);
        scan.identify.model_name = supported(&keys::MODEL_NAME);
        scan.identify.vendor_id = supported(&keys::VENDOR_ID);
        scan.identify.firmware_version = supported(&keys::FIRMWARE_VERSION);
        scan.lldp = supported(&keys::LLDP);
        scan.device_information.device_name = supported(&keys::DEVICE_NAME);
        scan.device_information.mac_table = supported(&keys::MAC_TABLE);
        scan.device_information.interface_name = supported(&keys::INTERFACE_NAME);
        scan.device_information.port_speed = supported(&keys::PORT_SPEED);

        let op = &mut group.operation;
        op.reboot = supported(&keys::REBOOT);
        op.factory_default = supported(&keys::FACTORY_DEFAULT);
        op.firmware_upgrade = supported(&keys::FIRMWARE_UPGRADE);
        op.enable_snmp_service = supported(&keys::ENABLE_SNMP_SERVICE);

        let cfg = &mut group.configuration;
        cfg.network_setting = supported(&keys::NETWORK_SETTING);

        // VLAN method gates every VLAN-scoped flag and static forwarding.
        let vlan = &mut cfg.vlan_setting;
        vlan.vlan_method = supported(&keys::VLAN_METHOD);
        if vlan.vlan_method {
            vlan.access_trunk_mode = supported(&keys::ACCESS_TRUNK_MODE);
            vlan.hybrid_mode = vlan.access_trunk_mode;
            vlan.te_mstid = supported(&keys::TE_MSTID);
            vlan.default_pvid = supported(&keys::DEFAULT_PVID);
            vlan.default_pcp = supported(&keys::DEFAULT_PCP);
            vlan.per_stream_priority = supported(&keys::PER_STREAM_PRIORITY);
            vlan.management_vlan = supported(&keys::MANAGEMENT_VLAN);
            cfg.static_forward_setting.unicast = supported(&keys::STATIC_UNICAST);
            cfg.static_forward_setting.multicast = supported(&keys::STATIC_MULTICAST);
        }

        cfg.stp_rstp.rstp = supported(&keys::RSTP_METHOD);
        if cfg.stp_rstp.rstp {
            cfg.stp_rstp.root_guard = supported(&keys::ROOT_GUARD);
        }

        cfg.tsn.qbv = supported(&keys::TSN_QBV);
        cfg.tsn.cb = supported(&keys::TSN_CB);

        group
    }

    /// The flag recorded for `key`, or `None` when the group tracks no flag
    /// for that triple.
    pub fn supports(&self, key: &CapabilityKey) -> Option<bool> {
        let scan = &self.auto_scan;
        let cfg = &self.configuration;
        let flag = match key {
            k if *k == keys::BROADCAST_SEARCH => scan.broadcast_search,
            k if *k == keys::MODEL_NAME => scan.identify.model_name,
            k if *k == keys::VENDOR_ID => scan.identify.vendor_id,
            k if *k == keys::FIRMWARE_VERSION => scan.identify.firmware_version,
            k if *k == keys::LLDP => scan.lldp,
            k if *k == keys::DEVICE_NAME => scan.device_information.device_name,
            k if *k == keys::MAC_TABLE => scan.device_information.mac_table,
            k if *k == keys::INTERFACE_NAME => scan.device_information.interface_name,
            k if *k == keys::PORT_SPEED => scan.device_information.port_speed,
            k if *k == keys::REBOOT => self.operation.reboot,
            k if *k == keys::FACTORY_DEFAULT => self.operation.factory_default,
            k if *k == keys::FIRMWARE_UPGRADE => self.operation.firmware_upgrade,
            k if *k == keys::ENABLE_SNMP_SERVICE => self.operation.enable_snmp_service,
            k if *k == keys::NETWORK_SETTING => cfg.network_setting,
            k if *k == keys::VLAN_METHOD => cfg.vlan_setting.vlan_method,
            k if *k == keys::ACCESS_TRUNK_MODE => cfg.vlan_setting.access_trunk_mode,
            k if *k == keys::TE_MSTID => cfg.vlan_setting.te_mstid,
            k if *k == keys::DEFAULT_PVID => cfg.vlan_setting.default_pvid,
            k if *k == keys::DEFAULT_PCP => cfg.vlan_setting.default_pcp,
            k if *k == keys::PER_STREAM_PRIORITY => cfg.vlan_setting.per_stream_priority,
            k if *k == keys::MANAGEMENT_VLAN => cfg.vlan_setting.management_vlan,
            k if *k == keys::STATIC_UNICAST => cfg.static_forward_setting.unicast,
            k if *k == keys::STATIC_MULTICAST => cfg.static_forward_setting.multicast,
            k if *k == keys::RSTP_METHOD => cfg.stp_rstp.rstp,
            k if *k == keys::ROOT_GUARD => cfg.stp_rstp.root_guard,
            k if *k == keys::TSN_QBV => cfg.tsn.qbv,
            k if *k == keys::TSN_CB => cfg.tsn.cb,
            _ => return None,
        };
        Some(flag)
    }
}
