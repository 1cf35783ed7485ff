// ── Transport protocol taxonomy ──
//
// Every capability binding names one of these protocols. Only RESTful
// speaks a stateful login, so only it goes through the session cache.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Wire protocol a capability method is executed over.
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
pub enum Protocol {
    #[serde(rename = "RESTful")]
    #[strum(serialize = "RESTful", ascii_case_insensitive)]
    Restful,
    #[serde(rename = "SNMP")]
    #[strum(serialize = "SNMP", ascii_case_insensitive)]
    Snmp,
    #[serde(rename = "NETCONF")]
    #[strum(serialize = "NETCONF", ascii_case_insensitive)]
    Netconf,
    /// Vendor-proprietary command channel.
    #[serde(rename = "MoxaCommand")]
    #[strum(serialize = "MoxaCommand", ascii_case_insensitive)]
    MoxaCommand,
}

impl Protocol {
    /// Whether calls over this protocol carry a cached login token.
    pub fn is_session_based(self) -> bool {
        matches!(self, Self::Restful)
    }
}
