// ── Session token cache ──
//
// Per-device, per-protocol login tokens shared by every dispatcher clone.
// Tokens are keyed by the device address: numeric device ids are assigned
// per run and may repeat across runs. The lock is held only for the map
// read or write, never across a southbound call.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::RwLock;

use switchyard_api::Protocol;
use tracing::debug;

type SessionKey = (IpAddr, Protocol);

/// Token store keyed by device address and protocol.
///
/// An empty token is equivalent to no token: the next call logs in.
#[derive(Debug, Default)]
pub struct SessionCache {
    tokens: RwLock<HashMap<SessionKey, String>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached token, or `None` when absent or empty.
    pub fn token(&self, address: IpAddr, protocol: Protocol) -> Option<String> {
        let tokens = self.tokens.read().expect("session lock poisoned");
        tokens
            .get(&(address, protocol))
            .filter(|t| !t.is_empty())
            .cloned()
    }

    pub fn store(&self, address: IpAddr, protocol: Protocol, token: String) {
        debug!(device = %address, %protocol, "session token refreshed");
        self.tokens
            .write()
            .expect("session lock poisoned")
            .insert((address, protocol), token);
    }

    /// Reset the token to empty so the next call logs in again.
    pub fn clear(&self, address: IpAddr, protocol: Protocol) {
        let mut tokens = self.tokens.write().expect("session lock poisoned");
        if let Some(token) = tokens.get_mut(&(address, protocol)) {
            debug!(device = %address, %protocol, "session token cleared");
            token.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.tokens
            .read()
            .expect("session lock poisoned")
            .values()
            .filter(|t| !t.is_empty())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ip(last: u8) -> IpAddr {
        IpAddr::from([192, 168, 127, last])
    }

    #[test]
    fn empty_token_reads_as_absent() {
        let cache = SessionCache::new();
        assert_eq!(cache.token(ip(1), Protocol::Restful), None);

        cache.store(ip(1), Protocol::Restful, String::new());
        assert_eq!(cache.token(ip(1), Protocol::Restful), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn tokens_are_scoped_per_address_and_protocol() {
        let cache = SessionCache::new();
        cache.store(ip(1), Protocol::Restful, "a".into());
        cache.store(ip(2), Protocol::Restful, "b".into());

        assert_eq!(cache.token(ip(1), Protocol::Restful).as_deref(), Some("a"));
        assert_eq!(cache.token(ip(2), Protocol::Restful).as_deref(), Some("b"));
        assert_eq!(cache.token(ip(1), Protocol::Netconf), None);
    }

    #[test]
    fn clear_keeps_other_protocols() {
        let cache = SessionCache::new();
        cache.store(ip(1), Protocol::Restful, "a".into());
        cache.store(ip(1), Protocol::Netconf, "n".into());
        cache.clear(ip(1), Protocol::Restful);
        assert_eq!(cache.token(ip(1), Protocol::Restful), None);
        assert_eq!(cache.token(ip(1), Protocol::Netconf).as_deref(), Some("n"));
        assert_eq!(cache.len(), 1);
    }
}
