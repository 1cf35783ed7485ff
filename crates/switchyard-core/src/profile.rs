// ── Profile store ──
//
// Read-mostly capability data: the generic feature profile used before a
// device is identified, per-model device profiles, firmware overrides,
// and default profiles. Probing inserts newly discovered models under a
// synthetic id; everything else is read-only after load.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::capability::{CapabilityBinding, CapabilityKey, CapabilitySet, FeatureGroup};
use crate::device::{DEFAULT_INGRESS_INDEX_MAX, DEFAULT_PVID, Device, DeviceProperty};
use crate::error::CoreError;

/// First id handed to profiles created by probing.
pub const SYNTHETIC_ID_BASE: i64 = 10_000;

// ── Profile types ───────────────────────────────────────────────────

/// One device model and the capabilities it supports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub id: i64,
    pub model_name: String,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub firmware_version: String,
    /// Shipped with the product rather than created by probing.
    #[serde(default)]
    pub built_in: bool,
    #[serde(default)]
    pub capabilities: CapabilitySet,
    #[serde(default)]
    pub feature_group: FeatureGroup,
    #[serde(default = "default_reserved_vlans")]
    pub reserved_vlans: BTreeSet<u16>,
    #[serde(default = "default_ingress_index_max")]
    pub stream_priority_ingress_index_max: u16,
}

fn default_reserved_vlans() -> BTreeSet<u16> {
    BTreeSet::from([DEFAULT_PVID])
}

fn default_ingress_index_max() -> u16 {
    DEFAULT_INGRESS_INDEX_MAX
}

impl DeviceProfile {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            id: 0,
            model_name: model_name.into(),
            vendor: String::new(),
            firmware_version: String::new(),
            built_in: false,
            capabilities: CapabilitySet::new(),
            feature_group: FeatureGroup::default(),
            reserved_vlans: default_reserved_vlans(),
            stream_priority_ingress_index_max: DEFAULT_INGRESS_INDEX_MAX,
        }
    }

    /// Recompute the feature flags from the capability bindings.
    pub fn derive_feature_group(&mut self) {
        self.feature_group = FeatureGroup::derive(&self.capabilities);
    }

    /// Device properties a device identified as this model inherits.
    pub fn device_property(&self) -> DeviceProperty {
        DeviceProperty {
            reserved_vlans: self.reserved_vlans.clone(),
            stream_priority_ingress_index_max: self.stream_priority_ingress_index_max,
            feature_group: self.feature_group.clone(),
        }
    }

    fn matches_model(&self, model_name: &str) -> bool {
        self.model_name.eq_ignore_ascii_case(model_name.trim())
    }
}

/// Firmware-specific capability override for one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirmwareFeatureProfile {
    pub model_name: String,
    pub firmware_version: String,
    #[serde(default)]
    pub capabilities: CapabilitySet,
}

/// Serialized form of the whole store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profiles {
    pub feature_profile: CapabilitySet,
    pub device_profiles: Vec<DeviceProfile>,
    pub firmware_feature_profiles: Vec<FirmwareFeatureProfile>,
    pub default_device_profiles: Vec<DeviceProfile>,
}

impl Profiles {
    /// Load profiles from a JSON or YAML file, chosen by extension.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path).map_err(|e| CoreError::Config {
            message: format!("cannot read profiles from {}: {e}", path.display()),
        })?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        let parsed = if is_yaml {
            serde_yaml::from_str(&raw).map_err(|e| e.to_string())
        } else {
            serde_json::from_str(&raw).map_err(|e| e.to_string())
        };
        parsed.map_err(|message| CoreError::Config {
            message: format!("invalid profiles file {}: {message}", path.display()),
        })
    }

    /// Write profiles as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| CoreError::Internal(format!("profile serialization failed: {e}")))?;
        std::fs::write(path, json).map_err(|e| CoreError::Config {
            message: format!("cannot write profiles to {}: {e}", path.display()),
        })
    }
}

// ── ProfileStore ────────────────────────────────────────────────────

struct StoreInner {
    feature_profile: CapabilitySet,
    device_profiles: DashMap<i64, Arc<DeviceProfile>>,
    firmware_profiles: Vec<FirmwareFeatureProfile>,
    default_profiles: Vec<Arc<DeviceProfile>>,
}

/// Shared, cheaply clonable handle to the loaded profiles.
#[derive(Clone)]
pub struct ProfileStore {
    inner: Arc<StoreInner>,
}

impl ProfileStore {
    pub fn new(profiles: Profiles) -> Self {
        let device_profiles = DashMap::new();
        for profile in profiles.device_profiles {
            device_profiles.insert(profile.id, Arc::new(profile));
        }
        Self {
            inner: Arc::new(StoreInner {
                feature_profile: profiles.feature_profile,
                device_profiles,
                firmware_profiles: profiles.firmware_feature_profiles,
                default_profiles: profiles
                    .default_device_profiles
                    .into_iter()
                    .map(Arc::new)
                    .collect(),
            }),
        }
    }

    /// The generic protocol-capability taxonomy.
    pub fn feature_profile(&self) -> &CapabilitySet {
        &self.inner.feature_profile
    }

    pub fn device_profile(&self, id: i64) -> Option<Arc<DeviceProfile>> {
        self.inner
            .device_profiles
            .get(&id)
            .map(|r| Arc::clone(r.value()))
    }

    /// Known profile for a model name, lowest id first.
    pub fn find_by_model(&self, model_name: &str) -> Option<Arc<DeviceProfile>> {
        self.inner
            .device_profiles
            .iter()
            .filter(|r| r.value().matches_model(model_name))
            .min_by_key(|r| *r.key())
            .map(|r| Arc::clone(r.value()))
    }

    /// Default profile to seed a newly discovered model from: an entry for
    /// the model itself, else the vendor-wide entry (model name equal to
    /// the vendor id and the same vendor).
    pub fn default_profile(&self, model_name: &str, vendor: &str) -> Option<Arc<DeviceProfile>> {
        let defaults = &self.inner.default_profiles;
        defaults
            .iter()
            .find(|p| p.matches_model(model_name))
            .or_else(|| {
                if vendor.trim().is_empty() {
                    return None;
                }
                defaults
                    .iter()
                    .find(|p| p.matches_model(vendor) && p.vendor.eq_ignore_ascii_case(vendor.trim()))
            })
            .cloned()
    }

    /// Every device profile, sorted by id.
    pub fn device_profiles(&self) -> Vec<Arc<DeviceProfile>> {
        let mut all: Vec<_> = self
            .inner
            .device_profiles
            .iter()
            .map(|r| Arc::clone(r.value()))
            .collect();
        all.sort_by_key(|p| p.id);
        all
    }

    /// Resolve a triple against the generic feature profile.
    pub fn resolve_feature(&self, key: &CapabilityKey) -> Result<CapabilityBinding, CoreError> {
        self.inner.feature_profile.resolve(key)
    }

    /// Resolve a triple for an identified device.
    ///
    /// A firmware override for the device's model and firmware wins over the
    /// device profile when it records the triple.
    pub fn resolve_for_device(
        &self,
        device: &Device,
        key: &CapabilityKey,
    ) -> Result<CapabilityBinding, CoreError> {
        let profile_id = device.profile_id.ok_or_else(|| {
            CoreError::not_found("device profile", format!("device {}", device.address))
        })?;
        let profile = self
            .device_profile(profile_id)
            .ok_or_else(|| CoreError::not_found("device profile", profile_id.to_string()))?;

        let firmware_override = self.inner.firmware_profiles.iter().find(|fw| {
            profile.matches_model(&fw.model_name)
                && !device.firmware_version.is_empty()
                && fw.firmware_version == device.firmware_version
                && fw.capabilities.contains(key)
        });
        if let Some(fw) = firmware_override {
            debug!(
                device = %device.address,
                firmware = %fw.firmware_version,
                capability = %key,
                "resolved through firmware profile"
            );
            return fw.capabilities.resolve(key);
        }

        profile.capabilities.resolve(key)
    }

    /// Insert a newly discovered profile under the first unused id at or
    /// above [`SYNTHETIC_ID_BASE`]. Returns the assigned id.
    pub fn insert_new(&self, mut profile: DeviceProfile) -> i64 {
        let mut id = SYNTHETIC_ID_BASE;
        loop {
            match self.inner.device_profiles.entry(id) {
                Entry::Occupied(_) => id += 1,
                Entry::Vacant(slot) => {
                    profile.id = id;
                    info!(id, model = %profile.model_name, "registered new device profile");
                    slot.insert(Arc::new(profile));
                    return id;
                }
            }
        }
    }

    /// Serializable copy of the current contents.
    pub fn snapshot(&self) -> Profiles {
        Profiles {
            feature_profile: self.inner.feature_profile.clone(),
            device_profiles: self
                .device_profiles()
                .into_iter()
                .map(|p| (*p).clone())
                .collect(),
            firmware_feature_profiles: self.inner.firmware_profiles.clone(),
            default_device_profiles: self
                .inner
                .default_profiles
                .iter()
                .map(|p| (**p).clone())
                .collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::capability::{Method, keys};
    use crate::device::Account;
    use switchyard_api::Protocol;

    fn method(protocol: Protocol) -> Method {
        Method {
            name: protocol.to_string(),
            protocol,
            actions: indexmap::IndexMap::new(),
        }
    }

    fn store() -> ProfileStore {
        let mut tsn = DeviceProfile::new("TSN-G5008");
        tsn.id = 3;
        tsn.built_in = true;
        tsn.capabilities
            .insert(&keys::VLAN_METHOD, vec![method(Protocol::Snmp)]);

        let mut fw_caps = CapabilitySet::new();
        fw_caps.insert(&keys::VLAN_METHOD, vec![method(Protocol::Restful)]);

        ProfileStore::new(Profiles {
            feature_profile: CapabilitySet::new(),
            device_profiles: vec![tsn],
            firmware_feature_profiles: vec![FirmwareFeatureProfile {
                model_name: "TSN-G5008".into(),
                firmware_version: "v2.1".into(),
                capabilities: fw_caps,
            }],
            default_device_profiles: Vec::new(),
        })
    }

    fn device(firmware: &str) -> Device {
        let mut dev = Device::new(1, "10.0.0.1".parse().unwrap(), Account::new("admin", "x"));
        dev.profile_id = Some(3);
        dev.firmware_version = firmware.into();
        dev
    }

    #[test]
    fn firmware_override_wins() {
        let store = store();
        let binding = store
            .resolve_for_device(&device("v2.1"), &keys::VLAN_METHOD)
            .unwrap();
        assert_eq!(binding.primary_protocol(), Some(Protocol::Restful));

        let binding = store
            .resolve_for_device(&device("v1.0"), &keys::VLAN_METHOD)
            .unwrap();
        assert_eq!(binding.primary_protocol(), Some(Protocol::Snmp));
    }

    #[test]
    fn unidentified_device_is_not_found() {
        let mut dev = device("v1.0");
        dev.profile_id = None;
        let err = store().resolve_for_device(&dev, &keys::VLAN_METHOD).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn synthetic_ids_fill_first_gap() {
        let store = store();
        let first = store.insert_new(DeviceProfile::new("EDS-4008"));
        let second = store.insert_new(DeviceProfile::new("EDS-4012"));
        assert_eq!(first, SYNTHETIC_ID_BASE);
        assert_eq!(second, SYNTHETIC_ID_BASE + 1);
        assert_eq!(store.device_profile(second).unwrap().model_name, "EDS-4012");
    }

    #[test]
    fn find_by_model_ignores_case() {
        let store = store();
        assert_eq!(store.find_by_model("tsn-g5008").unwrap().id, 3);
        assert!(store.find_by_model("EDS-4008").is_none());
    }

    #[test]
    fn default_profile_falls_back_to_vendor_entry() {
        let mut exact = DeviceProfile::new("EDS-4008");
        exact.stream_priority_ingress_index_max = 4;
        let mut vendor_wide = DeviceProfile::new("Moxa");
        vendor_wide.vendor = "Moxa".into();
        let mut wrong_vendor = DeviceProfile::new("Acme");
        wrong_vendor.vendor = "Other".into();

        let store = ProfileStore::new(Profiles {
            default_device_profiles: vec![exact, vendor_wide, wrong_vendor],
            ..store().snapshot()
        });

        let hit = store.default_profile("eds-4008", "Moxa").unwrap();
        assert_eq!(hit.stream_priority_ingress_index_max, 4);
        assert_eq!(store.default_profile("EDS-G4012", "Moxa").unwrap().model_name, "Moxa");
        assert!(store.default_profile("X-1", "Acme").is_none());
        assert!(store.default_profile("X-1", "").is_none());
    }

    #[test]
    fn load_and_save_round_trip_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.json");
        store().snapshot().save(&path).unwrap();

        let loaded = Profiles::load(&path).unwrap();
        assert_eq!(loaded.device_profiles.len(), 1);
        assert_eq!(loaded.firmware_feature_profiles[0].firmware_version, "v2.1");
    }

    #[test]
    fn loads_yaml_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.yaml");
        std::fs::write(
            &path,
            "device_profiles:\n  - id: 5\n    model_name: EDS-G4012\n    capabilities:\n      Configuration:\n        VLANSetting:\n          VLANMethod:\n            - name: RESTful\n              protocol: RESTful\n              actions:\n                GetVLAN: { method: GET, path: /api/v1/vlans }\n",
        )
        .unwrap();

        let profiles = Profiles::load(&path).unwrap();
        let profile = &profiles.device_profiles[0];
        assert_eq!(profile.reserved_vlans, BTreeSet::from([1]));
        let binding = profile.capabilities.resolve(&keys::VLAN_METHOD).unwrap();
        assert!(binding.method_for("GetVLAN").is_some());
    }
}
