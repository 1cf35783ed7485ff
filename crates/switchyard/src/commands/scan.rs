//! Scan command handler.

use tabled::Tabled;

use switchyard_core::workflow::{IpRange, Link, ScannedDevice};
use switchyard_core::{JobRunner, ScanEvent, ScanRequest, ScanResult};

use crate::cli::{GlobalOpts, OutputFormat, ScanArgs};
use crate::context::AppContext;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Profile")]
    profile: String,
}

impl From<&ScannedDevice> for DeviceRow {
    fn from(d: &ScannedDevice) -> Self {
        Self {
            id: d.id,
            address: d.address.to_string(),
            mac: d.mac.as_ref().map_or_else(|| "-".into(), ToString::to_string),
            model: d.model_name.clone(),
            name: d.device_name.clone(),
            profile: d.profile_id.map_or_else(|| "-".into(), |id| id.to_string()),
        }
    }
}

#[derive(Tabled)]
struct LinkRow {
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "To")]
    to: String,
}

impl From<&Link> for LinkRow {
    fn from(l: &Link) -> Self {
        Self {
            from: format!("{}:{}", l.source_device, l.source_port),
            to: format!("{}:{}", l.target_device, l.target_port),
        }
    }
}

pub async fn handle(args: ScanArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let ctx = AppContext::build(global)?;
    let request = ScanRequest {
        ranges: vec![IpRange::new(args.range.start, args.range.end)?],
        account: ctx.account.clone(),
        auto_probe: args.auto_probe || ctx.config.probe.auto_probe,
    };

    let scanner = ctx.scanner();
    let runner: JobRunner<ScanEvent> = JobRunner::new("scan");
    runner.start(move |job| scanner.run(job, request)).await?;
    let (status, events) = util::follow_job(&runner, "scanning", global.quiet).await;

    let mut created = 0_usize;
    let mut result = ScanResult::default();
    for event in events {
        match event {
            ScanEvent::ProfileCreated(profile) => {
                tracing::info!(id = profile.id, model = %profile.model_name, "new device profile");
                created += 1;
            }
            ScanEvent::Completed(done) => result = done,
        }
    }
    if created > 0 {
        ctx.persist_profiles()?;
    }
    util::job_outcome(&status)?;

    let out = match global.output {
        OutputFormat::Table => {
            let devices: Vec<DeviceRow> = result.devices.iter().map(DeviceRow::from).collect();
            let links: Vec<LinkRow> = result.links.iter().map(LinkRow::from).collect();
            let devices = output::render_table(&devices);
            let links = output::render_table(&links);
            format!("{devices}\n{links}")
        }
        _ => output::render_single(
            &global.output,
            &result,
            |_| String::new(),
            |r| {
                r.devices
                    .iter()
                    .map(|d| d.address.to_string())
                    .collect::<Vec<_>>()
                    .join("\n")
            },
        ),
    };
    output::print_output(&out, global.quiet);
    Ok(())
}
