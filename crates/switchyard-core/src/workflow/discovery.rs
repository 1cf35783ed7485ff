// ── Discovery and link inference collaborators ──
//
// Scanning needs two things it does not implement itself: finding alive
// hosts in an address range, and turning LLDP/MAC observations into links.
// Both are traits; `TcpDiscovery` and `LldpLinkInference` are the stock
// implementations.

use std::collections::{BTreeSet, HashMap};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream;
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::actions::{LldpNeighbor, MacTableEntry};
use crate::device::{Device, MacAddress};
use crate::error::CoreError;

/// Largest range a single scan accepts.
pub const MAX_RANGE_HOSTS: u32 = 65_536;

// ── IpRange ─────────────────────────────────────────────────────────

/// Inclusive IPv4 address range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpRange {
    pub start: Ipv4Addr,
    pub end: Ipv4Addr,
}

impl IpRange {
    pub fn new(start: IpAddr, end: IpAddr) -> Result<Self, CoreError> {
        let (IpAddr::V4(start), IpAddr::V4(end)) = (start, end) else {
            return Err(CoreError::BadRequest {
                message: "only IPv4 ranges can be scanned".into(),
            });
        };
        if u32::from(start) > u32::from(end) {
            return Err(CoreError::BadRequest {
                message: format!("range start {start} is after end {end}"),
            });
        }
        let range = Self { start, end };
        if range.len() > MAX_RANGE_HOSTS {
            return Err(CoreError::BadRequest {
                message: format!("range {start}-{end} exceeds {MAX_RANGE_HOSTS} hosts"),
            });
        }
        Ok(range)
    }

    pub fn len(&self) -> u32 {
        (u32::from(self.end) - u32::from(self.start)).saturating_add(1)
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = IpAddr> + use<> {
        (u32::from(self.start)..=u32::from(self.end)).map(|raw| IpAddr::V4(Ipv4Addr::from(raw)))
    }
}

// ── Traits ──────────────────────────────────────────────────────────

/// Finds hosts that answer inside a range.
#[async_trait]
pub trait NetworkDiscovery: Send + Sync {
    async fn alive_hosts(&self, range: IpRange, cancel: &CancellationToken) -> Result<Vec<IpAddr>, CoreError>;

    /// Known IP to MAC bindings for the given hosts.
    async fn ip_mac_table(&self, hosts: &[IpAddr]) -> Result<HashMap<IpAddr, MacAddress>, CoreError>;
}

/// A physical link between two scanned devices.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Link {
    pub source_device: i64,
    pub source_port: u32,
    pub target_device: i64,
    pub target_port: u32,
}

impl Link {
    /// The same link with endpoints ordered, for de-duplication.
    fn canonical(self) -> Self {
        if (self.source_device, self.source_port) <= (self.target_device, self.target_port) {
            self
        } else {
            Self {
                source_device: self.target_device,
                source_port: self.target_port,
                target_device: self.source_device,
                target_port: self.source_port,
            }
        }
    }
}

/// Per-device neighbor observations collected during a scan.
#[derive(Debug, Clone, Default)]
pub struct Observations {
    pub lldp: HashMap<i64, Vec<LldpNeighbor>>,
    pub mac_tables: HashMap<i64, Vec<MacTableEntry>>,
}

/// Turns neighbor observations into links.
pub trait LinkInference: Send + Sync {
    fn infer_links(&self, devices: &[Device], observations: &Observations) -> Vec<Link>;
}

// ── TcpDiscovery ────────────────────────────────────────────────────

/// Marks a host alive when any management port accepts a TCP connection.
#[derive(Debug, Clone)]
pub struct TcpDiscovery {
    pub ports: Vec<u16>,
    pub connect_timeout: Duration,
    pub concurrency: usize,
}

impl Default for TcpDiscovery {
    fn default() -> Self {
        Self {
            ports: vec![443, 80, 22, 830],
            connect_timeout: Duration::from_millis(500),
            concurrency: 64,
        }
    }
}

impl TcpDiscovery {
    async fn answers(&self, host: IpAddr) -> bool {
        for port in &self.ports {
            let addr = SocketAddr::new(host, *port);
            if let Ok(Ok(_)) = tokio::time::timeout(self.connect_timeout, TcpStream::connect(addr)).await {
                return true;
            }
        }
        false
    }
}

#[async_trait]
impl NetworkDiscovery for TcpDiscovery {
    async fn alive_hosts(&self, range: IpRange, cancel: &CancellationToken) -> Result<Vec<IpAddr>, CoreError> {
        let checks = stream::iter(range.iter())
            .map(|host| async move { (host, self.answers(host).await) })
            .buffer_unordered(self.concurrency.max(1));

        let collect = checks
            .filter_map(|(host, alive)| async move { alive.then_some(host) })
            .collect::<Vec<_>>();

        let mut alive = tokio::select! {
            () = cancel.cancelled() => return Err(CoreError::Stopped),
            hosts = collect => hosts,
        };
        alive.sort();
        debug!(start = %range.start, end = %range.end, alive = alive.len(), "range discovery complete");
        Ok(alive)
    }

    async fn ip_mac_table(&self, hosts: &[IpAddr]) -> Result<HashMap<IpAddr, MacAddress>, CoreError> {
        let Ok(raw) = tokio::fs::read_to_string("/proc/net/arp").await else {
            return Ok(HashMap::new());
        };
        let wanted: BTreeSet<&IpAddr> = hosts.iter().collect();
        Ok(parse_arp_table(&raw)
            .into_iter()
            .filter(|(ip, _)| wanted.contains(ip))
            .collect())
    }
}

/// Parse the Linux `/proc/net/arp` format.
fn parse_arp_table(raw: &str) -> HashMap<IpAddr, MacAddress> {
    raw.lines()
        .skip(1)
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let ip = cols.next()?.parse().ok()?;
            let mac = cols.nth(2)?;
            (mac != "00:00:00:00:00:00").then(|| (ip, MacAddress::new(mac)))
        })
        .collect()
}

// ── LldpLinkInference ───────────────────────────────────────────────

/// Links from LLDP neighbors whose chassis id or management address
/// matches another scanned device.
#[derive(Debug, Clone, Copy, Default)]
pub struct LldpLinkInference;

impl LinkInference for LldpLinkInference {
    fn infer_links(&self, devices: &[Device], observations: &Observations) -> Vec<Link> {
        let by_mac: HashMap<&MacAddress, i64> = devices
            .iter()
            .filter_map(|d| d.mac.as_ref().map(|mac| (mac, d.id)))
            .collect();
        let by_ip: HashMap<IpAddr, i64> = devices.iter().map(|d| (d.address, d.id)).collect();

        let mut links = BTreeSet::new();
        for (device_id, neighbors) in &observations.lldp {
            for neighbor in neighbors {
                let remote = neighbor
                    .remote_chassis_id
                    .as_ref()
                    .and_then(|mac| by_mac.get(mac).copied())
                    .or_else(|| neighbor.remote_address.and_then(|ip| by_ip.get(&ip).copied()));
                let (Some(target_device), Some(target_port)) = (remote, neighbor.remote_port) else {
                    continue;
                };
                if target_device == *device_id {
                    continue;
                }
                links.insert(
                    Link {
                        source_device: *device_id,
                        source_port: neighbor.local_port,
                        target_device,
                        target_port,
                    }
                    .canonical(),
                );
            }
        }
        links.into_iter().collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::device::Account;

    #[test]
    fn range_validation() {
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.4".parse().unwrap();
        let range = IpRange::new(a, b).unwrap();
        assert_eq!(range.len(), 4);
        assert_eq!(range.iter().last(), Some(b));

        assert!(IpRange::new(b, a).is_err());
        assert!(IpRange::new("::1".parse().unwrap(), b).is_err());
        assert!(IpRange::new("10.0.0.0".parse().unwrap(), "10.2.0.0".parse().unwrap()).is_err());
    }

    #[test]
    fn parses_proc_arp() {
        let raw = "IP address       HW type     Flags       HW address            Mask     Device\n\
                   192.168.127.1    0x1         0x2         00:90:E8:11:22:33     *        eth0\n\
                   192.168.127.9    0x1         0x0         00:00:00:00:00:00     *        eth0\n";
        let table = parse_arp_table(raw);
        assert_eq!(table.len(), 1);
        assert_eq!(
            table[&"192.168.127.1".parse::<IpAddr>().unwrap()].as_str(),
            "00:90:e8:11:22:33"
        );
    }

    fn device(id: i64, mac: &str) -> Device {
        let mut dev = Device::new(id, format!("10.0.0.{id}").parse().unwrap(), Account::new("a", "b"));
        dev.mac = Some(MacAddress::new(mac));
        dev
    }

    #[test]
    fn lldp_links_are_deduplicated() {
        let devices = [device(1, "00:00:00:00:00:01"), device(2, "00:00:00:00:00:02")];
        let mut observations = Observations::default();
        observations.lldp.insert(
            1,
            vec![LldpNeighbor {
                local_port: 3,
                remote_chassis_id: Some(MacAddress::new("00:00:00:00:00:02")),
                remote_port: Some(7),
                remote_address: None,
            }],
        );
        observations.lldp.insert(
            2,
            vec![
                LldpNeighbor {
                    local_port: 7,
                    remote_chassis_id: None,
                    remote_port: Some(3),
                    remote_address: Some("10.0.0.1".parse().unwrap()),
                },
                LldpNeighbor {
                    local_port: 8,
                    remote_chassis_id: Some(MacAddress::new("aa:aa:aa:aa:aa:aa")),
                    remote_port: Some(1),
                    remote_address: None,
                },
            ],
        );

        let links = LldpLinkInference.infer_links(&devices, &observations);
        assert_eq!(
            links,
            vec![Link {
                source_device: 1,
                source_port: 3,
                target_device: 2,
                target_port: 7,
            }]
        );
    }
}
