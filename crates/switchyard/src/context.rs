//! Wiring from config + global flags to core services.
//!
//! Loads the config file and profile store, builds the southbound clients
//! and dispatcher, and resolves the device account.

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use switchyard_api::{RestfulClient, SouthboundClient};
use switchyard_config::{Config, config_path, load_config_from};
use switchyard_core::workflow::{LldpLinkInference, Scanner};
use switchyard_core::{
    Account, Device, Dispatcher, ProfileStore, Profiles, Prober, Reconciler, SessionCache,
};
use tracing::{debug, info};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Everything a device command needs.
pub struct AppContext {
    pub config: Config,
    pub profiles_path: PathBuf,
    pub store: ProfileStore,
    pub dispatcher: Dispatcher,
    pub account: Account,
}

/// Load the config named by `--config`, or the canonical one.
pub fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let path = global.config.clone().unwrap_or_else(config_path);
    debug!(path = %path.display(), "loading config");
    Ok(load_config_from(&path)?)
}

impl AppContext {
    pub fn build(global: &GlobalOpts) -> Result<Self, CliError> {
        let config = load_config(global)?;
        let profiles_path = global
            .profiles
            .clone()
            .unwrap_or_else(|| config.profiles_path());
        if !profiles_path.exists() {
            return Err(CliError::NoProfiles {
                path: profiles_path.display().to_string(),
            });
        }
        let store = ProfileStore::new(Profiles::load(&profiles_path)?);
        let account = config.resolve_account(global.account.as_deref())?;

        let restful = RestfulClient::new(config.restful_config()).map_err(switchyard_core::CoreError::from)?;
        let clients: Vec<Arc<dyn SouthboundClient>> = vec![Arc::new(restful)];
        let dispatcher = Dispatcher::new(
            clients,
            Arc::new(SessionCache::new()),
            config.dispatcher_config(),
        );

        Ok(Self {
            config,
            profiles_path,
            store,
            dispatcher,
            account,
        })
    }

    /// A device numbered `id` at `address` using the resolved account.
    pub fn device(&self, id: i64, address: IpAddr) -> Device {
        Device::new(id, address, self.account.clone())
    }

    pub fn prober(&self) -> Prober {
        Prober::new(self.dispatcher.clone(), self.store.clone())
    }

    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(self.dispatcher.clone(), self.store.clone())
    }

    pub fn scanner(&self) -> Scanner {
        Scanner::new(
            self.prober(),
            Arc::new(self.config.discovery()),
            Arc::new(LldpLinkInference),
        )
    }

    /// Write the profile store back, keeping newly discovered profiles.
    pub fn persist_profiles(&self) -> Result<(), CliError> {
        self.store.snapshot().save(&self.profiles_path)?;
        info!(path = %self.profiles_path.display(), "profile store saved");
        Ok(())
    }
}
