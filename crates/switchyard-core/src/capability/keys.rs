// Well-known capability triples.

use super::{CapabilityKey, Feature};

// ── AutoScan ────────────────────────────────────────────────────────

pub const BROADCAST_SEARCH: CapabilityKey =
    CapabilityKey::fixed(Feature::AutoScan, "BroadcastSearch", "Basic");
pub const MODEL_NAME: CapabilityKey = CapabilityKey::fixed(Feature::AutoScan, "Identify", "ModelName");
pub const VENDOR_ID: CapabilityKey = CapabilityKey::fixed(Feature::AutoScan, "Identify", "VendorID");
pub const FIRMWARE_VERSION: CapabilityKey =
    CapabilityKey::fixed(Feature::AutoScan, "Identify", "FirmwareVersion");
pub const LLDP: CapabilityKey = CapabilityKey::fixed(Feature::AutoScan, "LLDP", "Basic");
pub const DEVICE_NAME: CapabilityKey =
    CapabilityKey::fixed(Feature::AutoScan, "DeviceInformation", "DeviceName");
pub const MAC_TABLE: CapabilityKey =
    CapabilityKey::fixed(Feature::AutoScan, "DeviceInformation", "MACTable");
pub const INTERFACE_NAME: CapabilityKey =
    CapabilityKey::fixed(Feature::AutoScan, "DeviceInformation", "InterfaceName");
pub const PORT_SPEED: CapabilityKey =
    CapabilityKey::fixed(Feature::AutoScan, "DeviceInformation", "PortSpeed");

// ── Operation ───────────────────────────────────────────────────────

pub const REBOOT: CapabilityKey = CapabilityKey::fixed(Feature::Operation, "Reboot", "Basic");
pub const FACTORY_DEFAULT: CapabilityKey =
    CapabilityKey::fixed(Feature::Operation, "FactoryDefault", "Basic");
pub const FIRMWARE_UPGRADE: CapabilityKey =
    CapabilityKey::fixed(Feature::Operation, "FirmwareUpgrade", "Basic");
pub const ENABLE_SNMP_SERVICE: CapabilityKey =
    CapabilityKey::fixed(Feature::Operation, "EnableSNMPService", "Basic");

// ── Configuration ───────────────────────────────────────────────────

pub const NETWORK_SETTING: CapabilityKey =
    CapabilityKey::fixed(Feature::Configuration, "NetworkSetting", "Basic");
pub const VLAN_METHOD: CapabilityKey =
    CapabilityKey::fixed(Feature::Configuration, "VLANSetting", "VLANMethod");
pub const ACCESS_TRUNK_MODE: CapabilityKey =
    CapabilityKey::fixed(Feature::Configuration, "VLANSetting", "AccessTrunkMode");
pub const TE_MSTID: CapabilityKey =
    CapabilityKey::fixed(Feature::Configuration, "VLANSetting", "TEMSTID");
pub const DEFAULT_PVID: CapabilityKey =
    CapabilityKey::fixed(Feature::Configuration, "VLANSetting", "DefaultPVID");
pub const DEFAULT_PCP: CapabilityKey =
    CapabilityKey::fixed(Feature::Configuration, "VLANSetting", "DefaultPCP");
pub const PER_STREAM_PRIORITY: CapabilityKey =
    CapabilityKey::fixed(Feature::Configuration, "VLANSetting", "PerStreamPriority");
pub const MANAGEMENT_VLAN: CapabilityKey =
    CapabilityKey::fixed(Feature::Configuration, "VLANSetting", "ManagementVLAN");
pub const STATIC_UNICAST: CapabilityKey =
    CapabilityKey::fixed(Feature::Configuration, "StaticForwardSetting", "Unicast");
pub const STATIC_MULTICAST: CapabilityKey =
    CapabilityKey::fixed(Feature::Configuration, "StaticForwardSetting", "Multicast");
pub const RSTP_METHOD: CapabilityKey =
    CapabilityKey::fixed(Feature::Configuration, "STPRSTP", "RSTPMethod");
pub const ROOT_GUARD: CapabilityKey =
    CapabilityKey::fixed(Feature::Configuration, "STPRSTP", "RootGuard");
pub const TSN_QBV: CapabilityKey =
    CapabilityKey::fixed(Feature::Configuration, "TSN", "IEEE802Dot1Qbv");
pub const TSN_CB: CapabilityKey =
    CapabilityKey::fixed(Feature::Configuration, "TSN", "IEEE802Dot1CB");
