// ── Background job runner ──
//
// One cancellable worker task per runner, a polling status surface, and a
// FIFO queue of partial results. State moves Stopped → Running →
// {Finished | Failed | Stopped}. A fresh cancellation token is created for
// every run; bodies observe it through `JobContext`.

use std::any::Any;
use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use strum::Display;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{CoreError, ErrorKind};

// ── Status types ────────────────────────────────────────────────────

/// Visible job state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum JobState {
    Stopped,
    Running,
    Finished,
    Failed,
}

/// Why a job failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobError {
    pub kind: ErrorKind,
    pub reason: String,
}

/// Snapshot returned by every job control call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    pub state: JobState,
    /// Percentage, never decreasing within one run.
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

impl JobStatus {
    pub fn is_running(&self) -> bool {
        self.state == JobState::Running
    }
}

// ── Shared state ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Outcome {
    Idle,
    Running,
    Succeeded,
    Failed(JobError),
    Stopped,
}

struct RunState {
    outcome: Outcome,
    cancel: CancellationToken,
    /// Flips to `true` once the current worker has recorded its outcome.
    done: watch::Receiver<bool>,
    run_id: Option<Uuid>,
    started_at: Option<DateTime<Utc>>,
}

struct Shared<R> {
    state: Mutex<RunState>,
    progress: AtomicU8,
    results: Mutex<VecDeque<R>>,
}

impl<R> Shared<R> {
    fn finish(&self, outcome: Outcome) {
        if matches!(outcome, Outcome::Succeeded) {
            self.progress.store(100, Ordering::SeqCst);
        }
        self.state.lock().expect("job state lock poisoned").outcome = outcome;
    }
}

/// Handle a job body uses to report progress, stream results, and observe
/// cancellation.
pub struct JobContext<R> {
    shared: Arc<Shared<R>>,
    cancel: CancellationToken,
}

impl<R> Clone for JobContext<R> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            cancel: self.cancel.clone(),
        }
    }
}

impl<R> JobContext<R> {
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// `Err(Stopped)` once stop was requested.
    pub fn check_cancelled(&self) -> Result<(), CoreError> {
        if self.cancel.is_cancelled() {
            Err(CoreError::Stopped)
        } else {
            Ok(())
        }
    }

    /// Raise progress to `percent`. Lower values are ignored.
    pub fn set_progress(&self, percent: u8) {
        self.shared.progress.fetch_max(percent.min(100), Ordering::SeqCst);
    }

    pub fn push_result(&self, result: R) {
        self.shared
            .results
            .lock()
            .expect("job results lock poisoned")
            .push_back(result);
    }
}

// ── JobRunner ───────────────────────────────────────────────────────

/// Runs at most one background body at a time.
///
/// Any number of callers may `wait` or `stop` concurrently: completion is
/// broadcast through a watch channel rather than a single join handle.
pub struct JobRunner<R> {
    name: &'static str,
    shared: Arc<Shared<R>>,
    starting: tokio::sync::Mutex<()>,
}

impl<R: Send + 'static> JobRunner<R> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            shared: Arc::new(Shared {
                state: Mutex::new(RunState {
                    outcome: Outcome::Idle,
                    cancel: CancellationToken::new(),
                    done: watch::channel(true).1,
                    run_id: None,
                    started_at: None,
                }),
                progress: AtomicU8::new(0),
                results: Mutex::new(VecDeque::new()),
            }),
            starting: tokio::sync::Mutex::new(()),
        }
    }

    /// Launch `body` on a new worker.
    ///
    /// Fails with `InternalError` while a previous run is still active. A
    /// run promoted to `Finished` at progress 100 is awaited before the new
    /// one begins. The worker yields once before running the body, so the
    /// returned status is always `Running`.
    pub async fn start<F, Fut>(&self, body: F) -> Result<JobStatus, CoreError>
    where
        F: FnOnce(JobContext<R>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), CoreError>> + Send + 'static,
    {
        let _starting = self.starting.lock().await;

        if self.status().is_running() {
            return Err(CoreError::Internal(format!("{} job is already running", self.name)));
        }
        self.wait().await;

        let (done_tx, done_rx) = watch::channel(false);
        let cancel = {
            let mut state = self.shared.state.lock().expect("job state lock poisoned");
            self.shared.progress.store(0, Ordering::SeqCst);
            state.outcome = Outcome::Running;
            state.cancel = CancellationToken::new();
            state.done = done_rx;
            state.run_id = Some(Uuid::new_v4());
            state.started_at = Some(Utc::now());
            state.cancel.clone()
        };
        self.shared
            .results
            .lock()
            .expect("job results lock poisoned")
            .clear();

        let ctx = JobContext {
            shared: Arc::clone(&self.shared),
            cancel: cancel.clone(),
        };
        let shared = Arc::clone(&self.shared);
        let name = self.name;
        debug!(job = name, "starting job");

        tokio::spawn(async move {
            tokio::task::yield_now().await;
            let result = AssertUnwindSafe(body(ctx)).catch_unwind().await;
            let outcome = match result {
                Ok(Ok(())) if cancel.is_cancelled() => Outcome::Stopped,
                Ok(Ok(())) => Outcome::Succeeded,
                Ok(Err(e)) if e.is_stopped() => Outcome::Stopped,
                Ok(Err(e)) => {
                    warn!(job = name, error = %e, "job failed");
                    Outcome::Failed(JobError {
                        kind: e.kind(),
                        reason: e.to_string(),
                    })
                }
                Err(panic) => {
                    let reason = panic_message(panic.as_ref());
                    warn!(job = name, reason = %reason, "job panicked");
                    Outcome::Failed(JobError {
                        kind: ErrorKind::InternalError,
                        reason,
                    })
                }
            };
            debug!(job = name, outcome = ?outcome, "job ended");
            shared.finish(outcome);
            let _ = done_tx.send(true);
        });

        Ok(self.status())
    }

    /// Non-blocking status poll.
    pub fn status(&self) -> JobStatus {
        let state = self.shared.state.lock().expect("job state lock poisoned");
        let progress = self.shared.progress.load(Ordering::SeqCst);
        let (visible, error) = match &state.outcome {
            Outcome::Idle | Outcome::Stopped => (JobState::Stopped, None),
            // A body that reported 100 has done its work.
            Outcome::Running if progress >= 100 => (JobState::Finished, None),
            Outcome::Running => (JobState::Running, None),
            Outcome::Succeeded => (JobState::Finished, None),
            Outcome::Failed(e) => (JobState::Failed, Some(e.clone())),
        };
        JobStatus {
            state: visible,
            progress,
            error,
            run_id: state.run_id,
            started_at: state.started_at,
        }
    }

    /// Request cooperative cancellation without waiting.
    pub fn cancel(&self) {
        self.shared
            .state
            .lock()
            .expect("job state lock poisoned")
            .cancel
            .cancel();
    }

    /// Wait for the current worker to end and return its final status.
    pub async fn wait(&self) -> JobStatus {
        let mut done = self
            .shared
            .state
            .lock()
            .expect("job state lock poisoned")
            .done
            .clone();
        if done.wait_for(|finished| *finished).await.is_err() {
            // The worker was dropped before recording an outcome.
            let mut state = self.shared.state.lock().expect("job state lock poisoned");
            if matches!(state.outcome, Outcome::Running) {
                warn!(job = self.name, "job worker did not complete");
                state.outcome = Outcome::Failed(JobError {
                    kind: ErrorKind::InternalError,
                    reason: "job worker did not complete".to_owned(),
                });
            }
        }
        self.status()
    }

    /// Cancel the current run and wait for the worker to end.
    pub async fn stop(&self) -> JobStatus {
        self.cancel();
        self.wait().await
    }

    /// Remove and return every queued result.
    pub fn drain_results(&self) -> Vec<R> {
        self.shared
            .results
            .lock()
            .expect("job results lock poisoned")
            .drain(..)
            .collect()
    }

    pub fn pop_result(&self) -> Option<R> {
        self.shared
            .results
            .lock()
            .expect("job results lock poisoned")
            .pop_front()
    }
}

impl<R> Drop for JobRunner<R> {
    fn drop(&mut self) {
        if let Ok(state) = self.shared.state.lock() {
            state.cancel.cancel();
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "job panicked".to_owned()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn fresh_runner_reports_stopped() {
        let runner: JobRunner<u32> = JobRunner::new("test");
        let status = runner.status();
        assert_eq!(status.state, JobState::Stopped);
        assert_eq!(status.progress, 0);
        assert!(status.run_id.is_none());
    }

    #[tokio::test]
    async fn successful_run_finishes_at_100() {
        let runner: JobRunner<u32> = JobRunner::new("test");
        let status = runner
            .start(|ctx| async move {
                ctx.set_progress(30);
                ctx.push_result(1);
                ctx.push_result(2);
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(status.state, JobState::Running);

        let done = runner.wait().await;
        assert_eq!(done.state, JobState::Finished);
        assert_eq!(done.progress, 100);
        assert_eq!(runner.pop_result(), Some(1));
        assert_eq!(runner.drain_results(), vec![2]);
    }

    #[tokio::test]
    async fn start_while_running_fails_without_second_worker() {
        let runner: JobRunner<()> = JobRunner::new("test");
        let (release, gate) = oneshot::channel::<()>();
        runner
            .start(move |_ctx| async move {
                let _ = gate.await;
                Ok(())
            })
            .await
            .unwrap();

        let err = runner.start(|_ctx| async { Ok(()) }).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InternalError);
        assert!(runner.status().is_running());

        release.send(()).unwrap();
        assert_eq!(runner.wait().await.state, JobState::Finished);
    }

    #[tokio::test]
    async fn stop_cancels_and_never_reports_running() {
        let runner: JobRunner<()> = JobRunner::new("test");
        runner
            .start(|ctx| async move {
                ctx.set_progress(10);
                ctx.cancel_token().cancelled().await;
                ctx.check_cancelled()
            })
            .await
            .unwrap();

        let status = runner.stop().await;
        assert_eq!(status.state, JobState::Stopped);
        assert!(status.error.is_none());
        assert_eq!(runner.status().state, JobState::Stopped);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stop_with_concurrent_waiter_never_reports_running() {
        let runner: Arc<JobRunner<()>> = Arc::new(JobRunner::new("test"));
        runner
            .start(|ctx| async move {
                tokio::select! {
                    () = ctx.cancel_token().cancelled() => {}
                    () = tokio::time::sleep(Duration::from_millis(300)) => {}
                }
                ctx.check_cancelled()
            })
            .await
            .unwrap();

        let waiter = {
            let runner = Arc::clone(&runner);
            tokio::spawn(async move { runner.wait().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let stopped = runner.stop().await;
        assert_ne!(stopped.state, JobState::Running);
        assert_eq!(stopped.state, JobState::Stopped);
        assert_eq!(waiter.await.unwrap().state, JobState::Stopped);
    }

    #[tokio::test]
    async fn progress_100_reads_as_finished_before_body_returns() {
        let runner: JobRunner<()> = JobRunner::new("test");
        let (release, gate) = oneshot::channel::<()>();
        runner
            .start(move |ctx| async move {
                ctx.set_progress(100);
                let _ = gate.await;
                Ok(())
            })
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(1), async {
            while runner.status().progress < 100 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert_eq!(runner.status().state, JobState::Finished);

        release.send(()).unwrap();
        assert_eq!(runner.wait().await.state, JobState::Finished);
    }

    #[tokio::test]
    async fn errors_and_panics_become_failed() {
        let runner: JobRunner<()> = JobRunner::new("test");
        runner
            .start(|_ctx| async { Err(CoreError::not_found("capability", "x")) })
            .await
            .unwrap();
        let status = runner.wait().await;
        assert_eq!(status.state, JobState::Failed);
        assert_eq!(status.error.unwrap().kind, ErrorKind::NotFound);

        runner
            .start(|_ctx| async {
                if true {
                    panic!("driver exploded");
                }
                Ok(())
            })
            .await
            .unwrap();
        let status = runner.wait().await;
        assert_eq!(status.state, JobState::Failed);
        let error = status.error.unwrap();
        assert_eq!(error.kind, ErrorKind::InternalError);
        assert!(error.reason.contains("driver exploded"));
    }

    #[tokio::test]
    async fn restart_resets_progress_and_results() {
        let runner: JobRunner<u8> = JobRunner::new("test");
        runner
            .start(|ctx| async move {
                ctx.push_result(1);
                Ok(())
            })
            .await
            .unwrap();
        let first = runner.wait().await;

        let (release, gate) = oneshot::channel::<()>();
        let status = runner
            .start(move |_ctx| async move {
                let _ = gate.await;
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(status.progress, 0);
        assert_ne!(status.run_id, first.run_id);
        assert!(runner.drain_results().is_empty());

        release.send(()).unwrap();
        runner.wait().await;
    }

    #[tokio::test]
    async fn progress_never_decreases() {
        let runner: JobRunner<()> = JobRunner::new("test");
        let (release, gate) = oneshot::channel::<()>();
        runner
            .start(move |ctx| async move {
                ctx.set_progress(50);
                ctx.set_progress(30);
                let _ = gate.await;
                Ok(())
            })
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(1), async {
            while runner.status().progress < 50 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert_eq!(runner.status().progress, 50);

        release.send(()).unwrap();
        runner.wait().await;
    }
}
