//! SchedulerRunner - drives registered jobs on their schedules.
//!
//! Each job gets its own tokio task. A task sleeps until the next firing,
//! runs the job to completion and only then computes the next delay, so a
//! job never overlaps with itself.
//!
//! ## Graceful Shutdown
//!
//! All loops watch the same shutdown channel. A running job finishes its
//! current pass before the loop exits.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::domain::foundation::Timestamp;

use super::{JobSchedule, ScheduledJob};

struct Registration {
    job: Arc<dyn ScheduledJob>,
    schedule: JobSchedule,
}

/// Owns the job registry and spawns one loop per job.
#[derive(Default)]
pub struct SchedulerRunner {
    jobs: Vec<Registration>,
}

impl SchedulerRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, job: Arc<dyn ScheduledJob>, schedule: JobSchedule) -> Self {
        self.jobs.push(Registration { job, schedule });
        self
    }

    pub fn job_names(&self) -> Vec<&'static str> {
        self.jobs.iter().map(|r| r.job.name()).collect()
    }

    /// Spawns every job loop. Loops end when `shutdown` turns true or its sender is dropped.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        self.jobs
            .into_iter()
            .map(|registration| tokio::spawn(run_loop(registration, shutdown.clone())))
            .collect()
    }
}

async fn run_loop(registration: Registration, mut shutdown: watch::Receiver<bool>) {
    let Registration { job, schedule } = registration;
    info!(job = job.name(), schedule = ?schedule, "Job scheduled");

    loop {
        let delay = schedule.delay_from(Utc::now());
        debug!(job = job.name(), delay_secs = delay.as_secs(), "Waiting for next run");

        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!(job = job.name(), "Job loop stopped");
                    return;
                }
            }

            _ = tokio::time::sleep(delay) => {
                let report = job.run(Timestamp::now()).await;
                report.log(job.name());
            }
        }
    }
}
