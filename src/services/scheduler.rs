use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Duration;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::SchedulerConfig;
use crate::domain::expiry::today;
use crate::services::CertificateService;

/// Runs the daily expiry sweep on a cron schedule.
pub struct Scheduler {
    certificates: Arc<dyn CertificateService>,
    config: SchedulerConfig,
    running: Arc<RwLock<bool>>,
}

impl Scheduler {
    pub fn new(certificates: Arc<dyn CertificateService>, config: SchedulerConfig) -> Self {
        Self {
            certificates,
            config,
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Blocks until [`Scheduler::stop`] is called.
    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            info!("Scheduler is disabled in config");
            return Ok(());
        }

        *self.running.write().await = true;
        info!("Starting background scheduler");

        let mut sched = JobScheduler::new().await?;

        let job = self.expiry_job()?;

        sched.add(job).await?;
        sched.start().await?;

        info!(
            cron = %self.config.expiry_sweep_cron,
            "Expiry sweep scheduled"
        );

        loop {
            if !*self.running.read().await {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        sched.shutdown().await?;
        Ok(())
    }

    /// Builds the sweep job. The cron expression is read in the server's
    /// local time zone, the same clock that decides what "today" is.
    fn expiry_job(&self) -> Result<Job> {
        let certificates = Arc::clone(&self.certificates);
        let running = Arc::clone(&self.running);
        let job = Job::new_async_tz(
            self.config.expiry_sweep_cron.as_str(),
            chrono::Local,
            move |_uuid, _lock| {
                let certificates = Arc::clone(&certificates);
                let running = Arc::clone(&running);
                Box::pin(async move {
                    if !*running.read().await {
                        return;
                    }
                    if let Err(e) = sweep(certificates.as_ref()).await {
                        error!(event = "job_failed", job_name = "expire_certificates", error = %e, "Scheduled expiry sweep failed");
                    }
                })
            },
        )?;
        Ok(job)
    }

    pub async fn stop(&self) {
        info!("Stopping scheduler...");
        *self.running.write().await = false;
    }

    pub async fn run_once(&self) -> Result<u64> {
        info!("Running manual expiry sweep...");
        sweep(self.certificates.as_ref()).await
    }
}

async fn sweep(certificates: &dyn CertificateService) -> Result<u64> {
    let start = std::time::Instant::now();
    info!(event = "job_started", job_name = "expire_certificates", "Starting expiry sweep");

    let expired = certificates.expire_overdue(today()).await?;

    info!(
        event = "job_finished",
        job_name = "expire_certificates",
        expired,
        duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        "Expiry sweep finished"
    );
    Ok(expired)
}
