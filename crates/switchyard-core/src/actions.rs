// ── Action keys and device information shapes ──
//
// Action keys name the concrete operations a capability method offers.
// Profiles list them under each method; the dispatcher looks them up by
// these exact strings.

use serde::{Deserialize, Serialize};

use crate::device::{Interface, MacAddress};

// ── Identification ──────────────────────────────────────────────────

pub const GET_MODEL_NAME: &str = "GetModelName";
pub const GET_VENDOR_ID: &str = "GetVendorID";
pub const GET_FIRMWARE_VERSION: &str = "GetFirmwareVersion";

// ── Device information ──────────────────────────────────────────────

pub const GET_DEVICE_NAME: &str = "GetDeviceName";
pub const GET_INTERFACES: &str = "GetInterfaces";
pub const GET_PORT_SPEED: &str = "GetPortSpeed";
pub const GET_LLDP_NEIGHBORS: &str = "GetLLDPNeighbors";
pub const GET_MAC_TABLE: &str = "GetMACTable";

// ── Operations ──────────────────────────────────────────────────────

pub const ENABLE_SNMP: &str = "EnableSNMP";
pub const REBOOT: &str = "Reboot";
pub const FACTORY_DEFAULT: &str = "FactoryDefault";

// ── VLAN ────────────────────────────────────────────────────────────

pub const GET_VLAN: &str = "GetVLAN";
pub const ADD_VLAN: &str = "AddVLAN";
pub const DELETE_VLAN: &str = "DeleteVLAN";
pub const SET_VLAN: &str = "SetVLAN";
pub const GET_PORT_TYPE: &str = "GetVLANPortType";
pub const SET_PORT_TYPE: &str = "SetVLANPortType";
pub const GET_PVID: &str = "GetPVID";
pub const SET_PVID: &str = "SetPVID";
pub const GET_MANAGEMENT_VLAN: &str = "GetManagementVLAN";
pub const SET_MANAGEMENT_VLAN: &str = "SetManagementVLAN";

// ── Static forwarding ───────────────────────────────────────────────

pub const GET_STATIC_UNICAST: &str = "GetStaticForwardUnicast";
pub const ADD_STATIC_UNICAST: &str = "AddStaticForwardUnicast";
pub const DELETE_STATIC_UNICAST: &str = "DeleteStaticForwardUnicast";
pub const GET_STATIC_MULTICAST: &str = "GetStaticForwardMulticast";
pub const ADD_STATIC_MULTICAST: &str = "AddStaticForwardMulticast";
pub const DELETE_STATIC_MULTICAST: &str = "DeleteStaticForwardMulticast";

// ── Stream priority ─────────────────────────────────────────────────

pub const GET_STREAM_PRIORITY: &str = "GetStreamPriorityIngress";
pub const ADD_STREAM_PRIORITY: &str = "AddStreamPriorityIngress";
pub const DELETE_STREAM_PRIORITY: &str = "DeleteStreamPriorityIngress";

/// True for read-only actions. Probing only exercises these.
pub fn is_read_action(action: &str) -> bool {
    action.starts_with("Get")
}

// ── Response shapes ─────────────────────────────────────────────────

/// Interface listing returned by [`GET_INTERFACES`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceList {
    #[serde(default)]
    pub interfaces: Vec<Interface>,
}

/// One LLDP neighbor seen on a local port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LldpNeighbor {
    pub local_port: u32,
    #[serde(default)]
    pub remote_chassis_id: Option<MacAddress>,
    #[serde(default)]
    pub remote_port: Option<u32>,
    #[serde(default)]
    pub remote_address: Option<std::net::IpAddr>,
}

/// One learned MAC forwarding entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacTableEntry {
    pub mac: MacAddress,
    pub port: u32,
    #[serde(default)]
    pub vlan_id: Option<u16>,
}

/// Body of [`GET_MANAGEMENT_VLAN`] and [`SET_MANAGEMENT_VLAN`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagementVlan {
    pub vlan_id: u16,
}
