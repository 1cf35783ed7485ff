// ── Probe and scan orchestration ──
//
// Both workflows run as `JobRunner` bodies and share the `Prober` for
// status checks, identification, and device information reads.

pub mod discovery;
pub mod probe;
pub mod scan;

pub use discovery::{
    IpRange, LinkInference, LldpLinkInference, Link, NetworkDiscovery, Observations, TcpDiscovery,
};
pub use probe::{
    Identity, ProbeOutcome, ProbeReport, ProbeResult, ProbeStatus, ProbeWarning, Prober,
};
pub use scan::{ScanEvent, ScanRequest, ScanResult, ScannedDevice, Scanner};
