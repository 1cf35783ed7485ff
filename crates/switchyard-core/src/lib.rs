//! Capability routing, reconciliation, and background jobs for switch fleets.
//!
//! This crate sits between `switchyard-api` and the CLI:
//!
//! - **[`ProfileStore`]** holds the generic feature profile and the per-model
//!   device profiles. Abstract capability triples resolve against it to the
//!   protocol methods a device supports.
//!
//! - **[`Dispatcher`]** executes one action over the resolved protocol with
//!   the session cache, re-login on expired tokens, and a single backoff
//!   retry when the device is busy.
//!
//! - **[`Reconciler`]** diffs desired VLAN, static forwarding, and stream
//!   priority tables against live state and applies the minimal change set
//!   without touching reserved VLANs.
//!
//! - **[`JobRunner`]** runs probe and scan workflows as cancellable tasks
//!   with polled progress and a queue of streamed results.

pub mod actions;
pub mod capability;
pub mod device;
pub mod dispatcher;
pub mod error;
pub mod job;
pub mod profile;
pub mod reconcile;
pub mod session;
pub mod workflow;

#[cfg(test)]
mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use capability::{CapabilityBinding, CapabilityKey, CapabilitySet, Feature, FeatureGroup, Method};
pub use device::{Account, ConnectStatus, Device, DeviceProperty, Interface, MacAddress};
pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use error::{CoreError, ErrorKind};
pub use job::{JobContext, JobError, JobRunner, JobState, JobStatus};
pub use profile::{DeviceProfile, FirmwareFeatureProfile, ProfileStore, Profiles};
pub use reconcile::{Reconciler, VlanConfig, VlanPlan};
pub use session::SessionCache;
pub use workflow::{Prober, ProbeResult, ProbeStatus, ScanEvent, ScanRequest, ScanResult, Scanner};
