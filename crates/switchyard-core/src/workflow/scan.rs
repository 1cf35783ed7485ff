// ── Scan workflow ──
//
// Discovers alive hosts in one or more address ranges, identifies them,
// optionally probes unknown models, reads per-device information and
// neighbor tables, and infers the links between the scanned devices.
// New device profiles stream through the job result queue as they are
// created; the final device and link set is the last result.

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::discovery::{IpRange, Link, LinkInference, NetworkDiscovery, Observations};
use super::probe::{ProbeReport, ProbeStatus, Prober, milestone};
use crate::actions::{self, LldpNeighbor, MacTableEntry};
use crate::capability::{CapabilityKey, keys};
use crate::device::{Account, ConnectStatus, Device, Interface, MacAddress};
use crate::error::CoreError;
use crate::job::JobContext;
use crate::profile::DeviceProfile;

/// What to scan.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub ranges: Vec<IpRange>,
    /// Account used for every discovered host.
    pub account: Account,
    /// Probe models that match no known profile.
    pub auto_probe: bool,
}

/// Serializable summary of one scanned device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedDevice {
    pub id: i64,
    pub address: IpAddr,
    pub mac: Option<MacAddress>,
    pub profile_id: Option<i64>,
    pub model_name: String,
    pub firmware_version: String,
    pub device_name: String,
    pub interfaces: Vec<Interface>,
    pub status: ConnectStatus,
}

impl From<&Device> for ScannedDevice {
    fn from(device: &Device) -> Self {
        Self {
            id: device.id,
            address: device.address,
            mac: device.mac.clone(),
            profile_id: device.profile_id,
            model_name: device.model_name.clone(),
            firmware_version: device.firmware_version.clone(),
            device_name: device.device_name.clone(),
            interfaces: device.interfaces.clone(),
            status: device.status.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub devices: Vec<ScannedDevice>,
    pub links: Vec<Link>,
}

/// Items pushed to the scan job's result queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ScanEvent {
    ProfileCreated(Box<DeviceProfile>),
    Completed(ScanResult),
}

#[derive(Clone)]
pub struct Scanner {
    prober: Prober,
    discovery: Arc<dyn NetworkDiscovery>,
    inference: Arc<dyn LinkInference>,
}

impl Scanner {
    pub fn new(prober: Prober, discovery: Arc<dyn NetworkDiscovery>, inference: Arc<dyn LinkInference>) -> Self {
        Self {
            prober,
            discovery,
            inference,
        }
    }

    /// Job body for a full scan.
    pub async fn run(self, ctx: JobContext<ScanEvent>, request: ScanRequest) -> Result<(), CoreError> {
        let scanner = Self {
            prober: self.prober.with_cancel(ctx.cancel_token().clone()),
            ..self
        };

        let devices = scanner.discover(&ctx, &request).await?;
        ctx.set_progress(30);
        ctx.check_cancelled()?;

        let total = devices.len();
        let mut identified = Vec::with_capacity(total);
        for (done, mut device) in devices.into_iter().enumerate() {
            if scanner.identify(&ctx, &mut device, request.auto_probe).await? {
                identified.push(device);
            }
            ctx.set_progress(milestone(30, 50, done + 1, total));
        }
        ctx.set_progress(50);
        ctx.check_cancelled()?;

        let mut observations = Observations::default();
        let total = identified.len();
        for (done, device) in identified.iter_mut().enumerate() {
            scanner.assign_information(device, &mut observations).await?;
            ctx.set_progress(milestone(50, 70, done + 1, total));
        }
        ctx.set_progress(70);
        ctx.check_cancelled()?;

        let links = scanner.inference.infer_links(&identified, &observations);
        ctx.set_progress(90);
        ctx.check_cancelled()?;

        info!(devices = identified.len(), links = links.len(), "scan complete");
        ctx.push_result(ScanEvent::Completed(ScanResult {
            devices: identified.iter().map(ScannedDevice::from).collect(),
            links,
        }));
        ctx.set_progress(100);
        Ok(())
    }

    /// Alive hosts across every range, one device each, with MACs attached.
    async fn discover(&self, ctx: &JobContext<ScanEvent>, request: &ScanRequest) -> Result<Vec<Device>, CoreError> {
        let mut hosts = BTreeSet::new();
        for range in &request.ranges {
            let alive = self.discovery.alive_hosts(*range, ctx.cancel_token()).await?;
            debug!(start = %range.start, end = %range.end, alive = alive.len(), "range scanned");
            hosts.extend(alive);
            ctx.check_cancelled()?;
        }

        let hosts: Vec<IpAddr> = hosts.into_iter().collect();
        let macs = self.discovery.ip_mac_table(&hosts).await?;
        ctx.check_cancelled()?;

        Ok(hosts
            .into_iter()
            .zip(1..)
            .map(|(address, id)| {
                let mut device = Device::new(id, address, request.account.clone());
                device.mac = macs.get(&address).cloned();
                device
            })
            .collect())
    }

    /// Identify one device. Returns `false` when it answers on no protocol.
    async fn identify(
        &self,
        ctx: &JobContext<ScanEvent>,
        device: &mut Device,
        auto_probe: bool,
    ) -> Result<bool, CoreError> {
        if auto_probe {
            let result = self.prober.probe_and_register(device).await?;
            if result.status == ProbeStatus::Success {
                if let Some(profile) = result.profile {
                    ctx.push_result(ScanEvent::ProfileCreated(Box::new(profile)));
                }
            }
            return Ok(device.status.any_reachable());
        }

        match self.prober.identify_device(device).await {
            Ok((_, Some(_))) => {}
            Ok((identity, None)) => {
                info!(device = %device.address, model = %identity.model_name, "unknown model, not probed");
            }
            Err(e) if e.is_stopped() => return Err(e),
            Err(_) if !device.status.any_reachable() => {
                debug!(device = %device.address, "no protocol answered, dropping");
                return Ok(false);
            }
            Err(e) => warn!(device = %device.address, error = %e, "identification failed"),
        }
        Ok(true)
    }

    /// Read name, interfaces, LLDP neighbors and MAC table of an identified
    /// device. Read failures are logged and skipped.
    async fn assign_information(&self, device: &mut Device, observations: &mut Observations) -> Result<(), CoreError> {
        if device.profile_id.is_none() {
            return Ok(());
        }
        let snapshot = device.clone();
        let profiles = self.prober.profiles().clone();
        let mut report = ProbeReport::default();
        match self
            .prober
            .read_device_information(device, |key| profiles.resolve_for_device(&snapshot, key), &mut report)
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_stopped() => return Err(e),
            Err(e) => warn!(device = %device.address, error = %e, "device information unavailable"),
        }
        for warning in &report.warnings {
            debug!(device = %device.address, item = %warning.sub_item, reason = %warning.reason, "read skipped");
        }

        let group = device.property.feature_group.auto_scan.clone();
        if group.lldp {
            if let Some(neighbors) = self
                .observe::<LldpNeighbor>(device, &keys::LLDP, actions::GET_LLDP_NEIGHBORS)
                .await?
            {
                observations.lldp.insert(device.id, neighbors);
            }
        }
        if group.device_information.mac_table {
            if let Some(entries) = self
                .observe::<MacTableEntry>(device, &keys::MAC_TABLE, actions::GET_MAC_TABLE)
                .await?
            {
                observations.mac_tables.insert(device.id, entries);
            }
        }
        Ok(())
    }

    async fn observe<T: DeserializeOwned>(
        &self,
        device: &Device,
        key: &CapabilityKey,
        action: &str,
    ) -> Result<Option<Vec<T>>, CoreError> {
        let read = async {
            let binding = self.prober.profiles().resolve_for_device(device, key)?;
            let value = self.prober.dispatcher().invoke(device, &binding, action, None).await?;
            if value.is_null() {
                return Ok(Vec::new());
            }
            crate::dispatcher::decode(action, value)
        };
        match read.await {
            Ok(entries) => Ok(Some(entries)),
            Err(e) if e.is_stopped() => Err(e),
            Err(e) => {
                warn!(device = %device.address, action, error = %e, "neighbor read failed");
                Ok(None)
            }
        }
    }
}
