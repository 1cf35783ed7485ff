//! Profile store inspection.

use serde::Serialize;
use tabled::Tabled;

use switchyard_core::{DeviceProfile, Profiles};

use crate::cli::{GlobalOpts, ProfilesArgs, ProfilesCommand};
use crate::context;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Vendor")]
    vendor: String,
    #[tabled(rename = "Firmware")]
    firmware: String,
    #[tabled(rename = "Built-in")]
    built_in: String,
    #[tabled(rename = "Capabilities")]
    capabilities: usize,
}

/// Flattened listing entry: one per device profile, default profiles included.
#[derive(Serialize)]
struct ProfileSummary {
    id: i64,
    model_name: String,
    vendor: String,
    firmware_version: String,
    built_in: bool,
    default: bool,
    capabilities: usize,
}

impl ProfileSummary {
    fn new(profile: &DeviceProfile, default: bool) -> Self {
        Self {
            id: profile.id,
            model_name: profile.model_name.clone(),
            vendor: profile.vendor.clone(),
            firmware_version: profile.firmware_version.clone(),
            built_in: profile.built_in,
            default,
            capabilities: profile.capabilities.iter().count(),
        }
    }
}

pub fn handle(args: ProfilesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ProfilesCommand::List => list(global),
    }
}

fn list(global: &GlobalOpts) -> Result<(), CliError> {
    let config = context::load_config(global)?;
    let path = global
        .profiles
        .clone()
        .unwrap_or_else(|| config.profiles_path());
    if !path.exists() {
        return Err(CliError::NoProfiles {
            path: path.display().to_string(),
        });
    }
    let profiles = Profiles::load(&path)?;

    let summaries: Vec<ProfileSummary> = profiles
        .device_profiles
        .iter()
        .map(|p| ProfileSummary::new(p, false))
        .chain(
            profiles
                .default_device_profiles
                .iter()
                .map(|p| ProfileSummary::new(p, true)),
        )
        .collect();

    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &summaries,
        |s| ProfileRow {
            id: s.id,
            model: if s.default {
                format!("{} (default)", s.model_name)
            } else {
                s.model_name.clone()
            },
            vendor: s.vendor.clone(),
            firmware: s.firmware_version.clone(),
            built_in: output::paint_status(if s.built_in { "yes" } else { "no" }, color),
            capabilities: s.capabilities,
        },
        |s| s.id.to_string(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
