// ── Capability model ──
//
// Addresses every configurable device capability by a
// (Feature, Item, SubItem) triple and records, per profile, which
// protocol methods implement it. A triple present with an empty method
// list means "known but unsupported" and is skipped, never failed.

pub mod feature_group;
pub mod keys;

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumIter, EnumString};
use switchyard_api::Protocol;

use crate::error::CoreError;

pub use feature_group::FeatureGroup;

/// Top-level taxonomy node.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
pub enum Feature {
    Base,
    AutoScan,
    Operation,
    Configuration,
    Monitor,
    #[serde(rename = "TSN")]
    #[strum(serialize = "TSN")]
    Tsn,
}

// ── CapabilityKey ───────────────────────────────────────────────────

/// Addressing key for one configurable capability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CapabilityKey {
    pub feature: Feature,
    pub item: Cow<'static, str>,
    pub sub_item: Cow<'static, str>,
}

impl CapabilityKey {
    /// A key built from static names, usable in `const` items.
    pub const fn fixed(feature: Feature, item: &'static str, sub_item: &'static str) -> Self {
        Self {
            feature,
            item: Cow::Borrowed(item),
            sub_item: Cow::Borrowed(sub_item),
        }
    }

    pub fn new(feature: Feature, item: impl Into<String>, sub_item: impl Into<String>) -> Self {
        Self {
            feature,
            item: Cow::Owned(item.into()),
            sub_item: Cow::Owned(sub_item.into()),
        }
    }
}

impl fmt::Display for CapabilityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.feature, self.item, self.sub_item)
    }
}

// ── Method / binding ────────────────────────────────────────────────

/// One way of implementing a capability over one protocol.
///
/// `actions` maps each action key (e.g. `GetVLAN`) to the parameters the
/// protocol client needs for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    pub protocol: Protocol,
    #[serde(default)]
    pub actions: IndexMap<String, Value>,
}

impl Method {
    pub fn has_action(&self, action: &str) -> bool {
        self.actions.contains_key(action)
    }
}

/// The resolved methods implementing one capability on one profile.
///
/// Handed out by value; nothing mutates a binding after resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityBinding {
    pub key: CapabilityKey,
    pub methods: Vec<Method>,
}

impl CapabilityBinding {
    /// `false` when the profile knows the capability but has no method for it.
    pub fn is_supported(&self) -> bool {
        !self.methods.is_empty()
    }

    /// First method (in binding order) that carries `action`.
    pub fn method_for(&self, action: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.has_action(action))
    }

    /// Protocol of the first method in binding order.
    pub fn primary_protocol(&self) -> Option<Protocol> {
        self.methods.first().map(|m| m.protocol)
    }
}

// ── CapabilitySet ───────────────────────────────────────────────────

type SubItems = BTreeMap<String, Vec<Method>>;

/// Feature → Item → SubItem → methods, as stored in profile files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet {
    features: BTreeMap<Feature, BTreeMap<String, SubItems>>,
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the methods for one triple, replacing any previous entry.
    pub fn insert(&mut self, key: &CapabilityKey, methods: Vec<Method>) {
        self.features
            .entry(key.feature)
            .or_default()
            .entry(key.item.to_string())
            .or_default()
            .insert(key.sub_item.to_string(), methods);
    }

    /// Append one method to a triple, creating the entry when missing.
    pub fn push_method(&mut self, key: &CapabilityKey, method: Method) {
        self.features
            .entry(key.feature)
            .or_default()
            .entry(key.item.to_string())
            .or_default()
            .entry(key.sub_item.to_string())
            .or_default()
            .push(method);
    }

    pub fn get(&self, key: &CapabilityKey) -> Option<&[Method]> {
        self.features
            .get(&key.feature)?
            .get(key.item.as_ref())?
            .get(key.sub_item.as_ref())
            .map(Vec::as_slice)
    }

    pub fn contains(&self, key: &CapabilityKey) -> bool {
        self.get(key).is_some()
    }

    /// Resolve one triple into a binding.
    ///
    /// Fails with `NotFound` when the triple has no entry. An entry with no
    /// methods resolves successfully to an unsupported binding.
    pub fn resolve(&self, key: &CapabilityKey) -> Result<CapabilityBinding, CoreError> {
        let methods = self
            .get(key)
            .ok_or_else(|| CoreError::not_found("capability", key.to_string()))?;
        Ok(CapabilityBinding {
            key: key.clone(),
            methods: methods.to_vec(),
        })
    }

    /// Every recorded triple with its methods, in key order.
    pub fn iter(&self) -> impl Iterator<Item = (CapabilityKey, &[Method])> + '_ {
        self.features.iter().flat_map(|(feature, items)| {
            items.iter().flat_map(move |(item, subs)| {
                subs.iter().map(move |(sub, methods)| {
                    (
                        CapabilityKey::new(*feature, item.clone(), sub.clone()),
                        methods.as_slice(),
                    )
                })
            })
        })
    }

    pub fn len(&self) -> usize {
        self.features
            .values()
            .flat_map(BTreeMap::values)
            .map(BTreeMap::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rest_method(actions: &[&str]) -> Method {
        Method {
            name: "RESTful".into(),
            protocol: Protocol::Restful,
            actions: actions
                .iter()
                .map(|a| ((*a).to_owned(), json!({ "method": "GET", "path": "/x" })))
                .collect(),
        }
    }

    #[test]
    fn resolve_missing_triple_is_not_found() {
        let set = CapabilitySet::new();
        let err = set.resolve(&keys::VLAN_METHOD).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn empty_methods_resolve_to_unsupported_binding() {
        let mut set = CapabilitySet::new();
        set.insert(&keys::VLAN_METHOD, Vec::new());

        let binding = set.resolve(&keys::VLAN_METHOD).unwrap();
        assert!(!binding.is_supported());
        assert!(binding.method_for("GetVLAN").is_none());
    }

    #[test]
    fn method_for_picks_first_method_with_action() {
        let mut set = CapabilitySet::new();
        set.push_method(&keys::VLAN_METHOD, rest_method(&["GetVLAN"]));
        set.push_method(
            &keys::VLAN_METHOD,
            Method {
                name: "SNMP".into(),
                protocol: Protocol::Snmp,
                actions: [("SetVLAN".to_owned(), json!({}))].into_iter().collect(),
            },
        );

        let binding = set.resolve(&keys::VLAN_METHOD).unwrap();
        assert_eq!(binding.method_for("GetVLAN").unwrap().protocol, Protocol::Restful);
        assert_eq!(binding.method_for("SetVLAN").unwrap().protocol, Protocol::Snmp);
        assert_eq!(binding.primary_protocol(), Some(Protocol::Restful));
    }

    #[test]
    fn iter_and_len_cover_every_triple() {
        let mut set = CapabilitySet::new();
        set.insert(&keys::VLAN_METHOD, vec![rest_method(&["GetVLAN"])]);
        set.insert(&keys::MODEL_NAME, vec![rest_method(&["GetModelName"])]);
        set.insert(&keys::REBOOT, Vec::new());

        assert_eq!(set.len(), 3);
        let listed: Vec<String> = set.iter().map(|(k, _)| k.to_string()).collect();
        assert!(listed.contains(&"Configuration/VLANSetting/VLANMethod".to_owned()));
        assert!(listed.contains(&"AutoScan/Identify/ModelName".to_owned()));
    }

    #[test]
    fn serializes_as_nested_taxonomy() {
        let mut set = CapabilitySet::new();
        set.insert(&keys::VLAN_METHOD, vec![rest_method(&["GetVLAN"])]);

        let value = serde_json::to_value(&set).unwrap();
        assert_eq!(
            value["Configuration"]["VLANSetting"]["VLANMethod"][0]["protocol"],
            "RESTful"
        );

        let back: CapabilitySet = serde_json::from_value(value).unwrap();
        assert_eq!(back, set);
    }
}
