//! VLAN diff / apply handlers.

use tabled::Tabled;

use switchyard_core::reconcile::VlanPlan;
use switchyard_core::{Device, VlanConfig};

use crate::cli::{GlobalOpts, OutputFormat, VlanArgs, VlanCommand, VlanTarget};
use crate::context::AppContext;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "Step")]
    step: &'static str,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

/// One row per southbound write, in application order.
fn plan_rows(plan: &VlanPlan) -> Vec<PlanRow> {
    let mut rows = Vec::new();
    for id in &plan.table.delete_vlan_ids {
        rows.push(PlanRow {
            step: "delete",
            target: format!("VLAN {id}"),
            detail: String::new(),
        });
    }
    for id in &plan.table.add_vlan_ids {
        rows.push(PlanRow {
            step: "add",
            target: format!("VLAN {id}"),
            detail: String::new(),
        });
    }
    for entry in &plan.port_types {
        rows.push(PlanRow {
            step: "port type",
            target: format!("port {}", entry.port_id),
            detail: entry.port_type.to_string(),
        });
    }
    for entry in &plan.pvids {
        rows.push(PlanRow {
            step: "pvid",
            target: format!("port {}", entry.port_id),
            detail: format!("pvid {} pcp {}", entry.pvid, entry.pcp),
        });
    }
    for entry in &plan.table.set_table {
        let ports: Vec<String> = entry.egress_ports.iter().map(ToString::to_string).collect();
        rows.push(PlanRow {
            step: "set",
            target: format!("VLAN {}", entry.vlan_id),
            detail: format!("{} egress [{}]", entry.name, ports.join(",")),
        });
    }
    if let Some(id) = plan.management_vlan {
        rows.push(PlanRow {
            step: "management",
            target: format!("VLAN {id}"),
            detail: String::new(),
        });
    }
    rows
}

pub async fn handle(args: VlanArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        VlanCommand::Diff(target) => run(&target, false, global).await,
        VlanCommand::Apply(target) => run(&target, true, global).await,
    }
}

async fn run(target: &VlanTarget, apply: bool, global: &GlobalOpts) -> Result<(), CliError> {
    let desired: VlanConfig = util::read_document(&target.desired)?;
    let ctx = AppContext::build(global)?;

    let mut device = ctx.device(1, target.device);
    identify(&ctx, &mut device).await?;

    let reconciler = ctx.reconciler();
    let plan = if apply {
        reconciler.configure_vlan(&device, &desired).await?
    } else {
        reconciler.vlan_plan(&device, &desired).await?
    };
    let Some(plan) = plan else {
        return Err(CliError::Rejected {
            message: format!("{} ({}) has no VLAN method", device.address, device.model_name),
        });
    };

    let out = match global.output {
        OutputFormat::Table if plan.is_empty() => "Already converged.".to_owned(),
        OutputFormat::Table => {
            let header = if apply { "Applied" } else { "Pending" };
            let table = output::render_table(&plan_rows(&plan));
            format!("{header} changes for {}:\n{table}", device.address)
        }
        _ => output::render_single(&global.output, &plan, |_| String::new(), |p| {
            plan_rows(p)
                .iter()
                .map(|r| format!("{} {}", r.step, r.target))
                .collect::<Vec<_>>()
                .join("\n")
        }),
    };
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Attach the known profile for the device's model.
async fn identify(ctx: &AppContext, device: &mut Device) -> Result<(), CliError> {
    let (identity, known) = ctx.prober().identify_device(device).await?;
    if known.is_none() {
        return Err(CliError::UnknownModel {
            model: identity.model_name,
            address: device.address.to_string(),
        });
    }
    Ok(())
}
