//! Probe command handlers.

use std::net::IpAddr;

use tabled::Tabled;

use switchyard_core::workflow::IpRange;
use switchyard_core::{ErrorKind, JobRunner, ProbeResult, ProbeStatus};

use crate::cli::{GlobalOpts, ProbeArgs, RangeArgs};
use crate::context::AppContext;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ────────────────────────────────────────────────────────

#[derive(Tabled)]
struct ProbeRow {
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Profile")]
    profile: String,
    #[tabled(rename = "Warnings")]
    warnings: usize,
    #[tabled(rename = "Error")]
    error: String,
}

fn to_row(result: &ProbeResult, color: bool) -> ProbeRow {
    ProbeRow {
        address: result.address.to_string(),
        status: output::paint_status(&result.status.to_string(), color),
        model: result.model_name.clone(),
        profile: result
            .profile
            .as_ref()
            .map_or_else(|| "-".into(), |p| p.id.to_string()),
        warnings: result.report.warnings.len(),
        error: result
            .error
            .as_ref()
            .map_or_else(String::new, |e| e.reason.clone()),
    }
}

// ── Handlers ─────────────────────────────────────────────────────────

pub async fn probe(args: ProbeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let results = run(vec![args.address], global).await?;
    if let Some(failed) = results.iter().find(|r| r.status == ProbeStatus::Failed) {
        if let Some(ref err) = failed.error {
            return Err(match err.kind {
                ErrorKind::ServiceUnavailable => CliError::Unavailable {
                    message: err.reason.clone(),
                },
                ErrorKind::Unauthorized => CliError::AuthFailed {
                    message: err.reason.clone(),
                },
                _ => CliError::Rejected {
                    message: err.reason.clone(),
                },
            });
        }
    }
    Ok(())
}

pub async fn probe_range(args: RangeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let range = IpRange::new(args.start, args.end)?;
    run(range.iter().collect(), global).await?;
    Ok(())
}

async fn run(addresses: Vec<IpAddr>, global: &GlobalOpts) -> Result<Vec<ProbeResult>, CliError> {
    let ctx = AppContext::build(global)?;
    let devices: Vec<_> = addresses
        .into_iter()
        .zip(1..)
        .map(|(address, id)| ctx.device(id, address))
        .collect();

    let prober = ctx.prober();
    let runner: JobRunner<ProbeResult> = JobRunner::new("probe");
    runner
        .start(move |job| prober.run_probe_range(job, devices))
        .await?;
    let (status, results) = util::follow_job(&runner, "probing", global.quiet).await;

    if results.iter().any(|r| r.status == ProbeStatus::Success) {
        ctx.persist_profiles()?;
    }

    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &results,
        |r| to_row(r, color),
        |r| format!("{} {}", r.address, r.status),
    );
    output::print_output(&out, global.quiet);

    util::job_outcome(&status)?;
    Ok(results)
}
