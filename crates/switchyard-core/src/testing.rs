// Scripted southbound client and fixtures shared by unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};
use switchyard_api::{ActionCall, Error, Protocol, SouthboundClient, Target};

use crate::capability::{CapabilityBinding, CapabilityKey, CapabilitySet, Method};
use crate::device::{Account, Device};
use crate::dispatcher::{Dispatcher, DispatcherConfig};
use crate::session::SessionCache;

/// One scripted outcome for an action.
#[derive(Debug, Clone)]
pub(crate) enum Step {
    Reply(Value),
    Unauthorized,
    Unavailable,
    Fail(u16),
}

impl Step {
    fn into_result(self) -> Result<Value, Error> {
        match self {
            Self::Reply(v) => Ok(v),
            Self::Unauthorized => Err(Error::Unauthorized {
                message: "session expired".into(),
            }),
            Self::Unavailable => Err(Error::ServiceUnavailable {
                message: "busy".into(),
            }),
            Self::Fail(status) => Err(Error::Http {
                status,
                body: String::new(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub action: String,
    pub token: Option<String>,
    pub payload: Option<Value>,
}

/// Fake client: scripted one-shot steps first, then persistent replies,
/// then `null`.
pub(crate) struct ScriptedClient {
    protocol: Protocol,
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    replies: Mutex<HashMap<String, Value>>,
    calls: Mutex<Vec<RecordedCall>>,
    logins: AtomicUsize,
    login_ok: AtomicBool,
    reachable: AtomicBool,
}

impl ScriptedClient {
    pub fn new(protocol: Protocol) -> Arc<Self> {
        Arc::new(Self {
            protocol,
            scripts: Mutex::new(HashMap::new()),
            replies: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            logins: AtomicUsize::new(0),
            login_ok: AtomicBool::new(true),
            reachable: AtomicBool::new(true),
        })
    }

    pub fn script(&self, action: &str, steps: impl IntoIterator<Item = Step>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(action.to_owned())
            .or_default()
            .extend(steps);
    }

    pub fn reply(&self, action: &str, value: Value) {
        self.replies
            .lock()
            .unwrap()
            .insert(action.to_owned(), value);
    }

    pub fn set_login_ok(&self, ok: bool) {
        self.login_ok.store(ok, Ordering::SeqCst);
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn login_count(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn actions(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.action).collect()
    }

    pub fn payloads_for(&self, action: &str) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter(|c| c.action == action)
            .filter_map(|c| c.payload)
            .collect()
    }
}

#[async_trait]
impl SouthboundClient for ScriptedClient {
    fn protocol(&self) -> Protocol {
        self.protocol
    }

    async fn login(&self, _target: Target<'_>) -> Result<String, Error> {
        let n = self.logins.fetch_add(1, Ordering::SeqCst) + 1;
        if self.login_ok.load(Ordering::SeqCst) {
            Ok(format!("token-{n}"))
        } else {
            Err(Error::Unauthorized {
                message: "bad credentials".into(),
            })
        }
    }

    async fn execute(&self, call: ActionCall<'_>) -> Result<Value, Error> {
        self.calls.lock().unwrap().push(RecordedCall {
            action: call.action.to_owned(),
            token: call.token.map(str::to_owned),
            payload: call.payload.cloned(),
        });

        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(call.action)
            .and_then(VecDeque::pop_front);
        if let Some(step) = scripted {
            return step.into_result();
        }
        let reply = self.replies.lock().unwrap().get(call.action).cloned();
        Ok(reply.unwrap_or(Value::Null))
    }

    async fn check_connection(&self, _target: Target<'_>) -> Result<(), Error> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::Protocol("no answer".into()))
        }
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

pub(crate) fn device(id: i64) -> Device {
    let address = format!("192.168.127.{id}").parse().unwrap();
    Device::new(id, address, Account::new("admin", "moxa"))
}

pub(crate) fn method(protocol: Protocol, actions: &[&str]) -> Method {
    Method {
        name: protocol.to_string(),
        protocol,
        actions: actions
            .iter()
            .map(|a| ((*a).to_owned(), json!({})))
            .collect(),
    }
}

pub(crate) fn binding(key: &CapabilityKey, protocol: Protocol, actions: &[&str]) -> CapabilityBinding {
    CapabilityBinding {
        key: key.clone(),
        methods: vec![method(protocol, actions)],
    }
}

/// Capability set where every listed key is served by `protocol` with the
/// given actions.
pub(crate) fn capability_set(entries: &[(&CapabilityKey, &[&str])], protocol: Protocol) -> CapabilitySet {
    let mut set = CapabilitySet::new();
    for (key, actions) in entries {
        set.insert(key, vec![method(protocol, actions)]);
    }
    set
}

pub(crate) fn dispatcher(clients: &[Arc<ScriptedClient>]) -> Dispatcher {
    let clients = clients
        .iter()
        .map(|c| Arc::clone(c) as Arc<dyn SouthboundClient>);
    Dispatcher::new(clients, Arc::new(SessionCache::new()), DispatcherConfig::default())
}
