//! Shared helpers for command handlers.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use switchyard_core::{JobRunner, JobState, JobStatus};
use tracing::warn;

use crate::error::CliError;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Follow a started job until it ends, draining results as they stream in.
///
/// Ctrl-C requests cancellation; the job then ends as `Stopped`.
pub async fn follow_job<R: Send + 'static>(
    runner: &JobRunner<R>,
    label: &str,
    quiet: bool,
) -> (JobStatus, Vec<R>) {
    let bar = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(100)
    };
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg} [{bar:30}] {pos:>3}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message(label.to_owned());

    let mut results = Vec::new();
    loop {
        let status = runner.status();
        bar.set_position(u64::from(status.progress));
        results.extend(runner.drain_results());
        if !status.is_running() {
            break;
        }
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                warn!(job = label, "interrupted, stopping");
                runner.cancel();
            }
            () = tokio::time::sleep(POLL_INTERVAL) => {}
        }
    }

    let status = runner.wait().await;
    results.extend(runner.drain_results());
    bar.finish_and_clear();
    (status, results)
}

/// Turn a terminal job status into a command result.
pub fn job_outcome(status: &JobStatus) -> Result<(), CliError> {
    match status.state {
        JobState::Finished => Ok(()),
        JobState::Stopped => Err(CliError::Stopped),
        JobState::Failed | JobState::Running => Err(CliError::Internal {
            message: status
                .error
                .as_ref()
                .map_or_else(|| "job failed".to_owned(), |e| e.reason.clone()),
        }),
    }
}

/// Read a JSON or YAML file, picking the format by extension.
pub fn read_document<T: serde::de::DeserializeOwned>(path: &std::path::Path) -> Result<T, CliError> {
    let raw = std::fs::read_to_string(path)?;
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
    if is_yaml {
        Ok(serde_yaml::from_str(&raw)?)
    } else {
        Ok(serde_json::from_str(&raw)?)
    }
}
