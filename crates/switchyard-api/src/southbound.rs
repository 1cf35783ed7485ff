// Southbound client contract
//
// The narrow interface every protocol family implements. The core never
// encodes protocol bytes itself: it resolves a capability binding, picks
// the client registered for the binding's protocol, and calls through
// this trait.

use std::net::IpAddr;

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::Value;

use crate::error::Error;
use crate::protocol::Protocol;

/// Address and account a client needs to reach one device.
#[derive(Debug, Clone, Copy)]
pub struct Target<'a> {
    pub address: IpAddr,
    pub username: &'a str,
    pub password: &'a SecretString,
}

/// One named action to execute against a device.
///
/// `params` are the protocol-specific parameters recorded in the capability
/// binding for this action (a REST route, an OID list, an RPC name).
#[derive(Debug, Clone, Copy)]
pub struct ActionCall<'a> {
    pub target: Target<'a>,
    /// Session token for session-based protocols, `None` otherwise.
    pub token: Option<&'a str>,
    pub action: &'a str,
    pub params: &'a Value,
    pub payload: Option<&'a Value>,
}

/// A protocol client the dispatcher can route actions to.
#[async_trait]
pub trait SouthboundClient: Send + Sync {
    /// The protocol this client speaks.
    fn protocol(&self) -> Protocol;

    /// Open a session and return its token.
    ///
    /// Only called for session-based protocols.
    async fn login(&self, target: Target<'_>) -> Result<String, Error>;

    /// Execute one named action and return its decoded result.
    async fn execute(&self, call: ActionCall<'_>) -> Result<Value, Error>;

    /// Check that the device answers on this protocol at all.
    async fn check_connection(&self, target: Target<'_>) -> Result<(), Error> {
        self.login(target).await.map(|_| ())
    }
}
