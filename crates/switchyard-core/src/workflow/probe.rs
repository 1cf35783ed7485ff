// ── Probe workflow ──
//
// Identifies a device through the generic feature profile, matches it
// against known device profiles, and for unknown models tests every
// capability method to build a new profile. Per-device outcomes stream
// through the job result queue.

use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::Display;
use switchyard_api::Protocol;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::actions::{self, InterfaceList};
use crate::capability::{CapabilityBinding, CapabilityKey, CapabilitySet, Feature, Method, keys};
use crate::device::{ConnectStatus, Device, Interface};
use crate::dispatcher::{Dispatcher, decode};
use crate::error::CoreError;
use crate::job::{JobContext, JobError};
use crate::profile::{DeviceProfile, ProfileStore};

/// Upper bound on concurrent per-protocol status checks for one device.
pub const MAX_STATUS_PROBES: usize = 10;

/// Time a device gets to bring SNMP up after it was enabled remotely.
pub const SNMP_ENABLE_SETTLE: Duration = Duration::from_secs(3);

// ── Result types ────────────────────────────────────────────────────

/// Model identity read through the generic profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub model_name: String,
    pub vendor: String,
    pub firmware_version: String,
}

/// One capability method that failed its probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeWarning {
    pub feature: Feature,
    pub item: String,
    pub sub_item: String,
    pub method: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub warnings: Vec<ProbeWarning>,
}

impl ProbeReport {
    fn warn(&mut self, key: &CapabilityKey, method: &str, reason: impl Into<String>) {
        self.warnings.push(ProbeWarning {
            feature: key.feature,
            item: key.item.to_string(),
            sub_item: key.sub_item.to_string(),
            method: method.to_owned(),
            reason: reason.into(),
        });
    }
}

/// Terminal status of one probed device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum ProbeStatus {
    Success,
    Failed,
    /// The model already had a profile.
    Skip,
}

/// Per-device entry streamed through the result queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub device_id: i64,
    pub address: IpAddr,
    pub status: ProbeStatus,
    #[serde(default)]
    pub model_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<DeviceProfile>,
    #[serde(default)]
    pub report: ProbeReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

/// What probing found out about one device.
#[derive(Debug, Clone)]
pub enum ProbeOutcome {
    /// Model already known; the device now points at that profile.
    Known(Arc<DeviceProfile>),
    /// Model was new; the profile is not yet registered.
    Discovered {
        profile: DeviceProfile,
        report: ProbeReport,
    },
}

// ── Prober ──────────────────────────────────────────────────────────

/// Runs device identification and capability discovery.
#[derive(Clone)]
pub struct Prober {
    dispatcher: Dispatcher,
    profiles: ProfileStore,
}

impl Prober {
    pub fn new(dispatcher: Dispatcher, profiles: ProfileStore) -> Self {
        Self {
            dispatcher,
            profiles,
        }
    }

    /// A clone whose southbound calls observe `cancel`.
    pub fn with_cancel(&self, cancel: CancellationToken) -> Self {
        Self {
            dispatcher: self.dispatcher.with_cancel(cancel),
            profiles: self.profiles.clone(),
        }
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Check every registered protocol concurrently and record which answered.
    pub async fn check_status(&self, device: &mut Device) -> Result<(), CoreError> {
        let status = Mutex::new(ConnectStatus::default());
        let protocols = self.dispatcher.protocols();
        {
            let target: &Device = device;
            let checks = protocols.into_iter().take(MAX_STATUS_PROBES).map(|protocol| {
                let status = &status;
                async move {
                    let reachable = self.dispatcher.check_connection(target, protocol).await.is_ok();
                    debug!(device = %target.address, %protocol, reachable, "status check");
                    status.lock().expect("status lock poisoned").set(protocol, reachable);
                }
            });
            join_all(checks).await;
        }
        self.dispatcher.check_cancelled()?;
        device.status = status.into_inner().expect("status lock poisoned");
        Ok(())
    }

    /// Read one identity string through the generic profile, trying each
    /// reachable method in order.
    async fn read_identity_field(
        &self,
        device: &Device,
        key: &CapabilityKey,
        action: &str,
    ) -> Result<String, CoreError> {
        let binding = self.profiles.resolve_feature(key)?;
        let mut last_error = CoreError::not_found("method", format!("{action} on a reachable protocol"));
        for method in binding.methods.iter().filter(|m| m.has_action(action)) {
            if !device.status.is_reachable(method.protocol) {
                continue;
            }
            match self.dispatcher.invoke_method(device, method, action, None).await {
                Ok(value) => return decode_string(action, value),
                Err(e) if e.is_stopped() => return Err(e),
                Err(e) => {
                    debug!(device = %device.address, action, error = %e, "identity read failed");
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }

    /// Read model name, vendor, and firmware version.
    ///
    /// Only the model name is required.
    pub async fn identify(&self, device: &Device) -> Result<Identity, CoreError> {
        let model_name = self
            .read_identity_field(device, &keys::MODEL_NAME, actions::GET_MODEL_NAME)
            .await?;
        let vendor = self.optional_identity_field(device, &keys::VENDOR_ID, actions::GET_VENDOR_ID).await?;
        let firmware_version = self
            .optional_identity_field(device, &keys::FIRMWARE_VERSION, actions::GET_FIRMWARE_VERSION)
            .await?;
        Ok(Identity {
            model_name: model_name.trim().to_owned(),
            vendor,
            firmware_version,
        })
    }

    async fn optional_identity_field(
        &self,
        device: &Device,
        key: &CapabilityKey,
        action: &str,
    ) -> Result<String, CoreError> {
        match self.read_identity_field(device, key, action).await {
            Ok(value) => Ok(value),
            Err(e) if e.is_stopped() => Err(e),
            Err(_) => Ok(String::new()),
        }
    }

    /// Turn SNMP on through another reachable protocol, then recheck it.
    async fn enable_snmp(&self, device: &mut Device) -> Result<(), CoreError> {
        if device.status.is_reachable(Protocol::Snmp) || !self.dispatcher.protocols().contains(&Protocol::Snmp) {
            return Ok(());
        }
        let Ok(binding) = self.profiles.resolve_feature(&keys::ENABLE_SNMP_SERVICE) else {
            return Ok(());
        };
        let Some(method) = binding
            .methods
            .iter()
            .find(|m| m.has_action(actions::ENABLE_SNMP) && device.status.is_reachable(m.protocol))
        else {
            return Ok(());
        };

        info!(device = %device.address, "enabling SNMP");
        match self.dispatcher.invoke_method(device, method, actions::ENABLE_SNMP, None).await {
            Ok(_) => {}
            Err(e) if e.is_stopped() => return Err(e),
            Err(e) => {
                warn!(device = %device.address, error = %e, "could not enable SNMP");
                return Ok(());
            }
        }

        tokio::select! {
            () = self.dispatcher.cancel_token().cancelled() => return Err(CoreError::Stopped),
            () = tokio::time::sleep(SNMP_ENABLE_SETTLE) => {}
        }
        let reachable = self.dispatcher.check_connection(device, Protocol::Snmp).await.is_ok();
        self.dispatcher.check_cancelled()?;
        device.status.set(Protocol::Snmp, reachable);
        Ok(())
    }

    /// Test one method: every read action must succeed; set-only methods
    /// are accepted when their protocol answers.
    async fn probe_method(&self, device: &Device, method: &Method) -> Result<Option<String>, CoreError> {
        if !device.status.is_reachable(method.protocol) {
            return Ok(Some(format!("{} is unreachable", method.protocol)));
        }
        for action in method.actions.keys().filter(|a| actions::is_read_action(a)) {
            match self.dispatcher.invoke_method(device, method, action, None).await {
                Ok(_) => {}
                Err(e) if e.is_stopped() => return Err(e),
                Err(e) => return Ok(Some(format!("{action}: {e}"))),
            }
        }
        Ok(None)
    }

    /// Test every method of the generic profile against the device.
    pub async fn probe_features(&self, device: &Device) -> Result<(CapabilitySet, ProbeReport), CoreError> {
        let mut capabilities = CapabilitySet::new();
        let mut report = ProbeReport::default();

        for (key, methods) in self.profiles.feature_profile().iter() {
            let mut accepted = Vec::new();
            for method in methods {
                match self.probe_method(device, method).await? {
                    None => accepted.push(method.clone()),
                    Some(reason) => report.warn(&key, &method.name, reason),
                }
            }
            capabilities.insert(&key, accepted);
        }

        debug!(
            device = %device.address,
            capabilities = capabilities.len(),
            warnings = report.warnings.len(),
            "feature probe complete"
        );
        Ok((capabilities, report))
    }

    /// Read device name and interfaces through `resolve`. Failures only
    /// produce warnings.
    pub async fn read_device_information(
        &self,
        device: &mut Device,
        resolve: impl Fn(&CapabilityKey) -> Result<CapabilityBinding, CoreError>,
        report: &mut ProbeReport,
    ) -> Result<(), CoreError> {
        let group = device.property.feature_group.auto_scan.device_information.clone();

        if group.device_name {
            let binding = resolve(&keys::DEVICE_NAME)?;
            match self.dispatcher.invoke(device, &binding, actions::GET_DEVICE_NAME, None).await {
                Ok(value) => match decode_string(actions::GET_DEVICE_NAME, value) {
                    Ok(name) => device.device_name = name,
                    Err(e) => report.warn(&keys::DEVICE_NAME, actions::GET_DEVICE_NAME, e.to_string()),
                },
                Err(e) if e.is_stopped() => return Err(e),
                Err(e) => report.warn(&keys::DEVICE_NAME, actions::GET_DEVICE_NAME, e.to_string()),
            }
        }

        if group.interface_name {
            let binding = resolve(&keys::INTERFACE_NAME)?;
            match self.dispatcher.invoke(device, &binding, actions::GET_INTERFACES, None).await {
                Ok(value) => match decode_interfaces(value) {
                    Ok(interfaces) => device.interfaces = interfaces,
                    Err(e) => report.warn(&keys::INTERFACE_NAME, actions::GET_INTERFACES, e.to_string()),
                },
                Err(e) if e.is_stopped() => return Err(e),
                Err(e) => report.warn(&keys::INTERFACE_NAME, actions::GET_INTERFACES, e.to_string()),
            }
        }
        Ok(())
    }

    /// Check reachability, identify the device, and attach the known
    /// profile for its model when there is one.
    pub async fn identify_device(
        &self,
        device: &mut Device,
    ) -> Result<(Identity, Option<Arc<DeviceProfile>>), CoreError> {
        self.check_status(device).await?;
        if !device.status.any_reachable() {
            return Err(CoreError::ServiceUnavailable {
                message: format!("{} does not answer on any protocol", device.address),
            });
        }

        let identity = self.identify(device).await?;
        if identity.model_name.is_empty() {
            return Err(CoreError::BadRequest {
                message: format!("{} reported an empty model name", device.address),
            });
        }
        device.model_name.clone_from(&identity.model_name);
        device.firmware_version.clone_from(&identity.firmware_version);

        let known = self.profiles.find_by_model(&identity.model_name);
        if let Some(ref profile) = known {
            info!(device = %device.address, model = %profile.model_name, id = profile.id, "matched known profile");
            device.profile_id = Some(profile.id);
            device.property = profile.device_property();
        }
        Ok((identity, known))
    }

    /// Identify one device and, for an unknown model, discover its profile.
    pub async fn probe(&self, device: &mut Device) -> Result<ProbeOutcome, CoreError> {
        let (identity, known) = self.identify_device(device).await?;
        if let Some(known) = known {
            return Ok(ProbeOutcome::Known(known));
        }

        self.enable_snmp(device).await?;
        let (capabilities, mut report) = self.probe_features(device).await?;

        let mut profile = match self.profiles.default_profile(&identity.model_name, &identity.vendor) {
            Some(seed) => {
                debug!(device = %device.address, seed = %seed.model_name, "seeding from default profile");
                let mut profile = (*seed).clone();
                profile.model_name = identity.model_name;
                profile.built_in = false;
                profile
            }
            None => DeviceProfile::new(identity.model_name),
        };
        profile.vendor = identity.vendor;
        profile.firmware_version = identity.firmware_version;
        for (key, methods) in capabilities.iter() {
            profile.capabilities.insert(&key, methods.to_vec());
        }
        profile.derive_feature_group();
        device.property = profile.device_property();

        let caps = profile.capabilities.clone();
        self.read_device_information(device, |key| caps.resolve(key), &mut report)
            .await?;

        info!(
            device = %device.address,
            model = %profile.model_name,
            warnings = report.warnings.len(),
            "discovered new device model"
        );
        Ok(ProbeOutcome::Discovered { profile, report })
    }

    /// Probe one device and register a new profile when one was discovered.
    ///
    /// `Stopped` propagates; every other failure becomes a `Failed` result.
    pub async fn probe_and_register(&self, device: &mut Device) -> Result<ProbeResult, CoreError> {
        let mut result = ProbeResult {
            device_id: device.id,
            address: device.address,
            status: ProbeStatus::Failed,
            model_name: String::new(),
            profile: None,
            report: ProbeReport::default(),
            error: None,
        };

        match self.probe(device).await {
            Ok(ProbeOutcome::Known(profile)) => {
                result.status = ProbeStatus::Skip;
                result.model_name.clone_from(&profile.model_name);
                result.profile = Some((*profile).clone());
            }
            Ok(ProbeOutcome::Discovered { profile, report }) => {
                let id = self.profiles.insert_new(profile);
                device.profile_id = Some(id);
                result.status = ProbeStatus::Success;
                result.model_name.clone_from(&device.model_name);
                result.profile = self.profiles.device_profile(id).map(|p| (*p).clone());
                result.report = report;
            }
            Err(e) if e.is_stopped() => return Err(e),
            Err(e) => {
                warn!(device = %device.address, error = %e, "probe failed");
                result.model_name.clone_from(&device.model_name);
                result.error = Some(JobError {
                    kind: e.kind(),
                    reason: e.to_string(),
                });
            }
        }
        Ok(result)
    }

    // ── Job bodies ───────────────────────────────────────────────────

    /// Job body probing one device.
    pub async fn run_probe(self, ctx: JobContext<ProbeResult>, device: Device) -> Result<(), CoreError> {
        self.run_probe_range(ctx, vec![device]).await
    }

    /// Job body probing several devices in order.
    pub async fn run_probe_range(
        self,
        ctx: JobContext<ProbeResult>,
        devices: Vec<Device>,
    ) -> Result<(), CoreError> {
        let prober = self.with_cancel(ctx.cancel_token().clone());
        ctx.set_progress(10);

        let total = devices.len().max(1);
        for (done, mut device) in devices.into_iter().enumerate() {
            ctx.check_cancelled()?;
            let result = prober.probe_and_register(&mut device).await?;
            ctx.push_result(result);
            ctx.set_progress(milestone(10, 100, done + 1, total));
        }
        ctx.set_progress(100);
        Ok(())
    }
}

/// Linear progress between two milestones.
pub(crate) fn milestone(from: u8, to: u8, done: usize, total: usize) -> u8 {
    let span = usize::from(to.saturating_sub(from));
    let step = span * done.min(total) / total.max(1);
    from.saturating_add(u8::try_from(step).unwrap_or(u8::MAX)).min(to)
}

/// Accepts a bare string or a single-field object wrapping one.
fn decode_string(action: &str, value: Value) -> Result<String, CoreError> {
    if let Value::Object(map) = &value {
        if let (1, Some(Value::String(s))) = (map.len(), map.values().next()) {
            return Ok(s.clone());
        }
    }
    decode(action, value)
}

fn decode_interfaces(value: Value) -> Result<Vec<Interface>, CoreError> {
    if value.is_array() {
        decode(actions::GET_INTERFACES, value)
    } else {
        decode::<InterfaceList>(actions::GET_INTERFACES, value).map(|list| list.interfaces)
    }
}
