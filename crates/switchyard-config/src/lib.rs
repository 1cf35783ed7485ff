//! Shared configuration for the switchyard CLI.
//!
//! TOML settings, account credential resolution (env + keyring + plaintext),
//! and translation into the southbound transport, dispatcher, and discovery
//! settings used by `switchyard-core`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use switchyard_api::{RestfulConfig, TlsMode, TransportConfig};
use switchyard_core::workflow::TcpDiscovery;
use switchyard_core::{Account, DispatcherConfig};

/// Environment prefix. Nested keys use `__`, e.g. `SWITCHYARD_SOUTHBOUND__TIMEOUT`.
pub const ENV_PREFIX: &str = "SWITCHYARD_";

const KEYRING_SERVICE: &str = "switchyard";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no account named '{account}' is configured")]
    UnknownAccount { account: String },

    #[error("no password configured for account '{account}'")]
    NoCredentials { account: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Account used when a command names none.
    pub default_account: Option<String>,

    /// Profile store file. Defaults to `profiles.json` in the data dir.
    pub profiles_path: Option<PathBuf>,

    #[serde(default)]
    pub southbound: Southbound,

    #[serde(default)]
    pub probe: Probe,

    /// Named device accounts.
    #[serde(default)]
    pub accounts: BTreeMap<String, AccountEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_account: Some("default".into()),
            profiles_path: None,
            southbound: Southbound::default(),
            probe: Probe::default(),
            accounts: BTreeMap::new(),
        }
    }
}

/// Southbound transport and retry settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Southbound {
    /// Per-call timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Accept self-signed device certificates.
    #[serde(default = "default_insecure")]
    pub insecure: bool,

    /// Path to a custom CA certificate. Ignored when `insecure` is set.
    pub ca_cert: Option<PathBuf>,

    /// Wait before the single retry of a busy device, in milliseconds.
    #[serde(default = "default_backoff_ms")]
    pub unavailable_backoff_ms: u64,

    /// `https` or `http`.
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// RESTful port override.
    pub port: Option<u16>,
}

impl Default for Southbound {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            insecure: default_insecure(),
            ca_cert: None,
            unavailable_backoff_ms: default_backoff_ms(),
            scheme: default_scheme(),
            port: None,
        }
    }
}

fn default_timeout() -> u64 {
    30
}
fn default_insecure() -> bool {
    true
}
fn default_backoff_ms() -> u64 {
    2_000
}
fn default_scheme() -> String {
    "https".into()
}

/// Probe and scan settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Probe {
    /// Probe unknown models found during a scan.
    #[serde(default)]
    pub auto_probe: bool,

    /// TCP ports that mark a host alive.
    #[serde(default = "default_ports")]
    pub discovery_ports: Vec<u16>,

    /// Per-port connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Hosts checked concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for Probe {
    fn default() -> Self {
        Self {
            auto_probe: false,
            discovery_ports: default_ports(),
            connect_timeout_ms: default_connect_timeout_ms(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_ports() -> Vec<u16> {
    TcpDiscovery::default().ports
}
fn default_connect_timeout_ms() -> u64 {
    500
}
fn default_concurrency() -> usize {
    64
}

/// A named device login.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AccountEntry {
    pub username: String,

    /// Password in plaintext. Prefer `password_env` or the keyring.
    pub password: Option<String>,

    /// Environment variable holding the password.
    pub password_env: Option<String>,
}

// ── Config file paths ───────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("io", "switchyard", "switchyard")
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("switchyard");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn default_profiles_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("profiles.json"),
        |dirs| dirs.data_dir().join("profiles.json"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from the canonical path and environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load defaults, then `path` (when present), then `SWITCHYARD_` variables.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Conversions ─────────────────────────────────────────────────────

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sb = &self.southbound;
        if !matches!(sb.scheme.as_str(), "http" | "https") {
            return Err(ConfigError::Validation {
                field: "southbound.scheme".into(),
                reason: format!("expected 'http' or 'https', got '{}'", sb.scheme),
            });
        }
        if sb.timeout == 0 {
            return Err(ConfigError::Validation {
                field: "southbound.timeout".into(),
                reason: "must be at least one second".into(),
            });
        }
        if self.probe.discovery_ports.is_empty() {
            return Err(ConfigError::Validation {
                field: "probe.discovery_ports".into(),
                reason: "at least one port is required".into(),
            });
        }
        Ok(())
    }

    pub fn transport_config(&self) -> TransportConfig {
        let sb = &self.southbound;
        let tls = if sb.insecure {
            TlsMode::DangerAcceptInvalid
        } else if let Some(ref ca_path) = sb.ca_cert {
            TlsMode::CustomCa(ca_path.clone())
        } else {
            TlsMode::System
        };
        TransportConfig {
            tls,
            timeout: Duration::from_secs(sb.timeout),
        }
    }

    pub fn restful_config(&self) -> RestfulConfig {
        RestfulConfig {
            scheme: self.southbound.scheme.clone(),
            port: self.southbound.port,
            transport: self.transport_config(),
        }
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            unavailable_backoff: Duration::from_millis(self.southbound.unavailable_backoff_ms),
        }
    }

    pub fn discovery(&self) -> TcpDiscovery {
        TcpDiscovery {
            ports: self.probe.discovery_ports.clone(),
            connect_timeout: Duration::from_millis(self.probe.connect_timeout_ms),
            concurrency: self.probe.concurrency.max(1),
        }
    }

    pub fn profiles_path(&self) -> PathBuf {
        self.profiles_path.clone().unwrap_or_else(default_profiles_path)
    }

    /// Resolve the named account, or the default one.
    pub fn resolve_account(&self, name: Option<&str>) -> Result<Account, ConfigError> {
        let name = name
            .or(self.default_account.as_deref())
            .unwrap_or("default");
        let entry = self.accounts.get(name).ok_or_else(|| ConfigError::UnknownAccount {
            account: name.into(),
        })?;
        let password = resolve_password(entry, name)?;
        Ok(Account {
            username: entry.username.clone(),
            password,
        })
    }
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve a password from the credential chain.
pub fn resolve_password(entry: &AccountEntry, account: &str) -> Result<SecretString, ConfigError> {
    // 1. Account's password_env → env var lookup
    if let Some(ref env_name) = entry.password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(keyring_entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{account}/password")) {
        if let Ok(secret) = keyring_entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref pw) = entry.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        account: account.into(),
    })
}
