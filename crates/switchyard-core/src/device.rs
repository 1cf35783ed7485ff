// ── Device model ──
//
// A live management target: address, per-protocol accounts, per-protocol
// reachability, and the properties reconciliation needs (reserved VLANs,
// ingress index limits, feature flags). Devices are created per scan or
// probe invocation and handed to the profile store by the caller.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use switchyard_api::{Protocol, Target};

use crate::capability::FeatureGroup;
use crate::error::CoreError;

/// VLAN every port falls back to. Never deleted by reconciliation.
pub const DEFAULT_PVID: u16 = 1;

/// Ingress rule slots per port on devices that do not report a limit.
pub const DEFAULT_INGRESS_INDEX_MAX: u16 = 10;

// ── MacAddress ──────────────────────────────────────────────────────

/// MAC address, normalized to lowercase colon-separated format (aa:bb:cc:dd:ee:ff).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct MacAddress(String);

impl MacAddress {
    /// Create a normalized MAC address from colon- or dash-separated hex.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let normalized = raw.as_ref().trim().to_lowercase().replace('-', ":");
        Self(normalized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MacAddress {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<String> for MacAddress {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> Self {
        mac.0
    }
}

// ── Accounts ────────────────────────────────────────────────────────

/// Login credentials for one protocol.
#[derive(Debug, Clone)]
pub struct Account {
    pub username: String,
    pub password: SecretString,
}

impl Account {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

// ── Connection status ───────────────────────────────────────────────

/// Which protocols answered the last status check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectStatus {
    pub reachable: BTreeMap<Protocol, bool>,
}

impl ConnectStatus {
    pub fn set(&mut self, protocol: Protocol, reachable: bool) {
        self.reachable.insert(protocol, reachable);
    }

    pub fn is_reachable(&self, protocol: Protocol) -> bool {
        self.reachable.get(&protocol).copied().unwrap_or(false)
    }

    /// `true` when at least one management protocol answered.
    pub fn any_reachable(&self) -> bool {
        self.reachable.values().any(|r| *r)
    }
}

// ── Interfaces / properties ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub speed: Option<String>,
}

/// Per-device facts reconciliation relies on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceProperty {
    /// VLAN ids reconciliation must never delete (management VLAN, PVID 1).
    pub reserved_vlans: BTreeSet<u16>,
    /// Number of ingress rule slots per port for stream priority.
    pub stream_priority_ingress_index_max: u16,
    pub feature_group: FeatureGroup,
}

impl Default for DeviceProperty {
    fn default() -> Self {
        Self {
            reserved_vlans: BTreeSet::from([DEFAULT_PVID]),
            stream_priority_ingress_index_max: DEFAULT_INGRESS_INDEX_MAX,
            feature_group: FeatureGroup::default(),
        }
    }
}

// ── Device ──────────────────────────────────────────────────────────

/// A live switch targeted by one scan, probe, or reconciliation run.
#[derive(Debug, Clone)]
pub struct Device {
    /// Explicit numeric id. Session tokens are keyed by it.
    pub id: i64,
    pub address: IpAddr,
    pub mac: Option<MacAddress>,
    /// Fallback account for every protocol.
    pub account: Account,
    /// Protocol-specific accounts overriding `account`.
    pub protocol_accounts: BTreeMap<Protocol, Account>,
    pub status: ConnectStatus,
    pub profile_id: Option<i64>,
    pub model_name: String,
    pub firmware_version: String,
    pub device_name: String,
    pub interfaces: Vec<Interface>,
    pub property: DeviceProperty,
}

impl Device {
    pub fn new(id: i64, address: IpAddr, account: Account) -> Self {
        Self {
            id,
            address,
            mac: None,
            account,
            protocol_accounts: BTreeMap::new(),
            status: ConnectStatus::default(),
            profile_id: None,
            model_name: String::new(),
            firmware_version: String::new(),
            device_name: String::new(),
            interfaces: Vec::new(),
            property: DeviceProperty::default(),
        }
    }

    pub fn with_protocol_account(mut self, protocol: Protocol, account: Account) -> Self {
        self.protocol_accounts.insert(protocol, account);
        self
    }

    pub fn account_for(&self, protocol: Protocol) -> &Account {
        self.protocol_accounts.get(&protocol).unwrap_or(&self.account)
    }

    /// Connection target for `protocol`.
    ///
    /// Session-based protocols refuse to log in with an empty password.
    pub fn target(&self, protocol: Protocol) -> Result<Target<'_>, CoreError> {
        let account = self.account_for(protocol);
        if protocol.is_session_based()
            && (account.username.is_empty() || account.password.expose_secret().is_empty())
        {
            return Err(CoreError::BadRequest {
                message: format!(
                    "{protocol} account for {} needs a username and password",
                    self.address
                ),
            });
        }
        Ok(Target {
            address: self.address,
            username: &account.username,
            password: &account.password,
        })
    }
}
