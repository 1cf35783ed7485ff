// ── Protocol action dispatcher ──
//
// Routes a named action in a capability binding to the southbound client
// for the method's protocol. Session-based protocols log in on demand and
// keep their token in the shared `SessionCache`. Every call runs inside a
// bounded retry loop: one re-login on Unauthorized, one backoff on
// ServiceUnavailable, each at most once per logical call.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use switchyard_api::{ActionCall, Protocol, SouthboundClient, Target};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::capability::{CapabilityBinding, Method};
use crate::device::Device;
use crate::error::CoreError;
use crate::session::SessionCache;

/// Backoff before the single retry of an unavailable device.
pub const DEFAULT_UNAVAILABLE_BACKOFF: Duration = Duration::from_secs(2);

/// Tunables for the retry loop.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub unavailable_backoff: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            unavailable_backoff: DEFAULT_UNAVAILABLE_BACKOFF,
        }
    }
}

struct DispatcherInner {
    clients: HashMap<Protocol, Arc<dyn SouthboundClient>>,
    sessions: Arc<SessionCache>,
    config: DispatcherConfig,
}

/// Cheaply clonable action router.
///
/// Clones share clients and the session cache. Each clone carries its own
/// cancellation token so a job can stop only the calls it issued.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
    cancel: CancellationToken,
}

impl Dispatcher {
    pub fn new(
        clients: impl IntoIterator<Item = Arc<dyn SouthboundClient>>,
        sessions: Arc<SessionCache>,
        config: DispatcherConfig,
    ) -> Self {
        let clients = clients.into_iter().map(|c| (c.protocol(), c)).collect();
        Self {
            inner: Arc::new(DispatcherInner {
                clients,
                sessions,
                config,
            }),
            cancel: CancellationToken::new(),
        }
    }

    /// A clone that observes `cancel` between southbound calls.
    pub fn with_cancel(&self, cancel: CancellationToken) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            cancel,
        }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// `Err(Stopped)` once the token is cancelled.
    pub fn check_cancelled(&self) -> Result<(), CoreError> {
        if self.cancel.is_cancelled() {
            Err(CoreError::Stopped)
        } else {
            Ok(())
        }
    }

    pub fn sessions(&self) -> &SessionCache {
        &self.inner.sessions
    }

    /// Protocols with a registered client.
    pub fn protocols(&self) -> Vec<Protocol> {
        let mut protocols: Vec<Protocol> = self.inner.clients.keys().copied().collect();
        protocols.sort();
        protocols
    }

    fn client(&self, protocol: Protocol) -> Result<&Arc<dyn SouthboundClient>, CoreError> {
        self.inner
            .clients
            .get(&protocol)
            .ok_or_else(|| CoreError::not_found("protocol client", protocol.to_string()))
    }

    // ── Sessions ─────────────────────────────────────────────────────

    /// Log in and cache the token. A failed login clears the cached token.
    pub async fn login(&self, device: &Device, protocol: Protocol) -> Result<String, CoreError> {
        let client = self.client(protocol)?;
        let target = device.target(protocol)?;
        self.login_with(client.as_ref(), target).await
    }

    async fn login_with(
        &self,
        client: &dyn SouthboundClient,
        target: Target<'_>,
    ) -> Result<String, CoreError> {
        let protocol = client.protocol();
        debug!(device = %target.address, %protocol, "logging in");
        match client.login(target).await {
            Ok(token) => {
                self.inner.sessions.store(target.address, protocol, token.clone());
                Ok(token)
            }
            Err(e) => {
                self.inner.sessions.clear(target.address, protocol);
                Err(e.into())
            }
        }
    }

    async fn session_token(
        &self,
        client: &dyn SouthboundClient,
        device: &Device,
        target: Target<'_>,
    ) -> Result<Option<String>, CoreError> {
        let protocol = client.protocol();
        if !protocol.is_session_based() {
            return Ok(None);
        }
        if let Some(token) = self.inner.sessions.token(device.address, protocol) {
            return Ok(Some(token));
        }
        self.login_with(client, target).await.map(Some)
    }

    /// Check that the device answers on `protocol`.
    pub async fn check_connection(&self, device: &Device, protocol: Protocol) -> Result<(), CoreError> {
        self.check_cancelled()?;
        let client = self.client(protocol)?;
        let target = device.target(protocol)?;
        client.check_connection(target).await.map_err(CoreError::from)
    }

    // ── Invocation ───────────────────────────────────────────────────

    /// Execute `action` through the first method of `binding` that lists it.
    pub async fn invoke(
        &self,
        device: &Device,
        binding: &CapabilityBinding,
        action: &str,
        payload: Option<&Value>,
    ) -> Result<Value, CoreError> {
        let method = binding
            .method_for(action)
            .ok_or_else(|| CoreError::not_found("action", format!("{action} in {}", binding.key)))?;
        self.invoke_method(device, method, action, payload).await
    }

    /// Read an action result into `T`.
    pub async fn get<T: DeserializeOwned>(
        &self,
        device: &Device,
        binding: &CapabilityBinding,
        action: &str,
    ) -> Result<T, CoreError> {
        let value = self.invoke(device, binding, action, None).await?;
        decode(action, value)
    }

    /// Send `payload` through an action, discarding the response body.
    pub async fn set<P: Serialize + ?Sized>(
        &self,
        device: &Device,
        binding: &CapabilityBinding,
        action: &str,
        payload: &P,
    ) -> Result<(), CoreError> {
        let payload = serde_json::to_value(payload)
            .map_err(|e| CoreError::Internal(format!("cannot encode {action} payload: {e}")))?;
        self.invoke(device, binding, action, Some(&payload)).await.map(|_| ())
    }

    /// Execute one action on a specific method with the retry contract.
    pub async fn invoke_method(
        &self,
        device: &Device,
        method: &Method,
        action: &str,
        payload: Option<&Value>,
    ) -> Result<Value, CoreError> {
        self.check_cancelled()?;
        let params = method
            .actions
            .get(action)
            .ok_or_else(|| CoreError::not_found("action", format!("{action} in {}", method.name)))?;
        let protocol = method.protocol;
        let client = self.client(protocol)?;
        let target = device.target(protocol)?;

        let mut token = self.session_token(client.as_ref(), device, target).await?;
        let mut relogged = false;
        let mut backed_off = false;

        loop {
            self.check_cancelled()?;
            let call = ActionCall {
                target,
                token: token.as_deref(),
                action,
                params,
                payload,
            };

            let err = match client.execute(call).await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if err.is_auth_expired() && protocol.is_session_based() && !relogged {
                relogged = true;
                warn!(device = %device.address, action, "session rejected, logging in again");
                self.inner.sessions.clear(device.address, protocol);
                token = Some(self.login_with(client.as_ref(), target).await?);
            } else if err.is_unavailable() && !backed_off {
                backed_off = true;
                let backoff = self.inner.config.unavailable_backoff;
                warn!(
                    device = %device.address,
                    action,
                    backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                    "device unavailable, retrying once"
                );
                tokio::select! {
                    () = self.cancel.cancelled() => return Err(CoreError::Stopped),
                    () = tokio::time::sleep(backoff) => {}
                }
            } else {
                if err.is_auth_expired() && protocol.is_session_based() {
                    self.inner.sessions.clear(device.address, protocol);
                }
                debug!(device = %device.address, action, error = %err, "southbound call failed");
                return Err(err.into());
            }
        }
    }
}

/// Decode an action result into `T`.
pub(crate) fn decode<T: DeserializeOwned>(action: &str, value: Value) -> Result<T, CoreError> {
    serde_json::from_value(value.clone()).map_err(|e| {
        CoreError::Southbound(switchyard_api::Error::Deserialization {
            message: format!("{action}: {e}"),
            body: value.to_string(),
        })
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::capability::keys;
    use crate::testing::{ScriptedClient, Step, binding, device, dispatcher};
    use serde_json::json;

    const GET_STRING: &str = "GetStringRequestUseToken";

    fn rest_binding() -> CapabilityBinding {
        binding(&keys::MODEL_NAME, Protocol::Restful, &[GET_STRING])
    }

    #[tokio::test]
    async fn logs_in_when_no_token_is_cached() {
        let client = ScriptedClient::new(Protocol::Restful);
        client.reply(GET_STRING, json!("TSN-G5008"));
        let dispatcher = dispatcher(&[client.clone()]);
        let dev = device(1);

        let value = dispatcher.invoke(&dev, &rest_binding(), GET_STRING, None).await.unwrap();
        assert_eq!(value, json!("TSN-G5008"));
        assert_eq!(client.login_count(), 1);
        assert_eq!(client.calls()[0].token.as_deref(), Some("token-1"));
        assert_eq!(dispatcher.sessions().token(dev.address, Protocol::Restful).as_deref(), Some("token-1"));

        dispatcher.invoke(&dev, &rest_binding(), GET_STRING, None).await.unwrap();
        assert_eq!(client.login_count(), 1);
    }

    #[tokio::test]
    async fn devices_sharing_an_id_keep_separate_sessions() {
        let client = ScriptedClient::new(Protocol::Restful);
        client.reply(GET_STRING, json!("TSN-G5008"));
        let dispatcher = dispatcher(&[client.clone()]);
        let first = device(1);
        let mut second = device(1);
        second.address = "10.0.0.99".parse().unwrap();

        dispatcher.invoke(&first, &rest_binding(), GET_STRING, None).await.unwrap();
        dispatcher.invoke(&second, &rest_binding(), GET_STRING, None).await.unwrap();

        assert_eq!(client.login_count(), 2);
        let tokens: Vec<_> = client.calls().into_iter().map(|c| c.token).collect();
        assert_eq!(tokens, vec![Some("token-1".into()), Some("token-2".into())]);
    }

    #[tokio::test]
    async fn unauthorized_then_success_logs_in_exactly_once() {
        let client = ScriptedClient::new(Protocol::Restful);
        client.script(GET_STRING, [Step::Unauthorized, Step::Reply(json!("ok"))]);
        let dispatcher = dispatcher(&[client.clone()]);
        dispatcher.sessions().store(device(1).address, Protocol::Restful, "stale".into());

        let value = dispatcher
            .invoke(&device(1), &rest_binding(), GET_STRING, None)
            .await
            .unwrap();

        assert_eq!(value, json!("ok"));
        assert_eq!(client.login_count(), 1);
        let tokens: Vec<_> = client.calls().into_iter().map(|c| c.token).collect();
        assert_eq!(tokens, vec![Some("stale".into()), Some("token-1".into())]);
    }

    #[tokio::test]
    async fn second_unauthorized_propagates_and_clears_token() {
        let client = ScriptedClient::new(Protocol::Restful);
        client.script(GET_STRING, [Step::Unauthorized, Step::Unauthorized, Step::Reply(json!("late"))]);
        let dispatcher = dispatcher(&[client.clone()]);
        dispatcher.sessions().store(device(1).address, Protocol::Restful, "stale".into());

        let err = dispatcher
            .invoke(&device(1), &rest_binding(), GET_STRING, None)
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Unauthorized { .. }));
        assert_eq!(client.calls().len(), 2);
        assert_eq!(client.login_count(), 1);
        assert_eq!(dispatcher.sessions().token(device(1).address, Protocol::Restful), None);
    }

    #[tokio::test(start_paused = true)]
    async fn unavailable_retries_once_after_backoff() {
        let client = ScriptedClient::new(Protocol::Snmp);
        client.script(GET_STRING, [Step::Unavailable, Step::Reply(json!(1))]);
        let dispatcher = dispatcher(&[client.clone()]);
        let snmp = binding(&keys::MODEL_NAME, Protocol::Snmp, &[GET_STRING]);

        let started = tokio::time::Instant::now();
        let value = dispatcher.invoke(&device(1), &snmp, GET_STRING, None).await.unwrap();

        assert_eq!(value, json!(1));
        assert!(started.elapsed() >= DEFAULT_UNAVAILABLE_BACKOFF);
        assert_eq!(client.login_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn second_unavailable_propagates() {
        let client = ScriptedClient::new(Protocol::Snmp);
        client.script(GET_STRING, [Step::Unavailable, Step::Unavailable, Step::Reply(json!(1))]);
        let dispatcher = dispatcher(&[client.clone()]);
        let snmp = binding(&keys::MODEL_NAME, Protocol::Snmp, &[GET_STRING]);

        let err = dispatcher.invoke(&device(1), &snmp, GET_STRING, None).await.unwrap_err();
        assert!(matches!(err, CoreError::ServiceUnavailable { .. }));
        assert_eq!(client.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn both_retry_kinds_fire_once_each() {
        let client = ScriptedClient::new(Protocol::Restful);
        client.script(
            GET_STRING,
            [
                Step::Unavailable,
                Step::Unauthorized,
                Step::Unavailable,
                Step::Reply(json!("never")),
            ],
        );
        let dispatcher = dispatcher(&[client.clone()]);
        dispatcher.sessions().store(device(1).address, Protocol::Restful, "t".into());

        let err = dispatcher
            .invoke(&device(1), &rest_binding(), GET_STRING, None)
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::ServiceUnavailable { .. }));
        assert_eq!(client.calls().len(), 3);
        assert_eq!(client.login_count(), 1);
    }

    #[tokio::test]
    async fn missing_action_is_not_found_without_io() {
        let client = ScriptedClient::new(Protocol::Restful);
        let dispatcher = dispatcher(&[client.clone()]);

        let err = dispatcher
            .invoke(&device(1), &rest_binding(), "SetVLAN", None)
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(client.login_count(), 0);
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_client_is_not_found() {
        let dispatcher = dispatcher(&[]);
        let err = dispatcher
            .invoke(&device(1), &rest_binding(), GET_STRING, None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn failed_login_clears_token_and_propagates() {
        let client = ScriptedClient::new(Protocol::Restful);
        client.set_login_ok(false);
        let dispatcher = dispatcher(&[client.clone()]);

        let err = dispatcher
            .invoke(&device(1), &rest_binding(), GET_STRING, None)
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Unauthorized { .. }));
        assert!(client.calls().is_empty());
        assert!(dispatcher.sessions().is_empty());
    }

    #[tokio::test]
    async fn cancelled_dispatcher_stops_before_io() {
        let client = ScriptedClient::new(Protocol::Snmp);
        let token = CancellationToken::new();
        let dispatcher = dispatcher(&[client.clone()]).with_cancel(token.clone());
        token.cancel();

        let snmp = binding(&keys::MODEL_NAME, Protocol::Snmp, &[GET_STRING]);
        let err = dispatcher.invoke(&device(1), &snmp, GET_STRING, None).await.unwrap_err();
        assert!(err.is_stopped());
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn typed_get_and_set() {
        let client = ScriptedClient::new(Protocol::Snmp);
        client.reply("GetVLAN", json!([10, 20]));
        let dispatcher = dispatcher(&[client.clone()]);
        let snmp = binding(&keys::VLAN_METHOD, Protocol::Snmp, &["GetVLAN", "SetVLAN"]);
        let dev = device(1);

        let ids: Vec<u16> = dispatcher.get(&dev, &snmp, "GetVLAN").await.unwrap();
        assert_eq!(ids, vec![10, 20]);

        dispatcher.set(&dev, &snmp, "SetVLAN", &[30_u16]).await.unwrap();
        assert_eq!(client.payloads_for("SetVLAN"), vec![json!([30])]);

        let err = dispatcher.get::<Vec<u16>>(&dev, &snmp, "SetVLAN").await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InternalError);
    }
}
