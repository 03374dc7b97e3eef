use crate::config::JobsConfig;
use crate::registry::Registry;
use crate::store::AccountStore;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Background job types
#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    /// Record one resolution of a short code
    IncrementClicks { short_code: String },
    /// Clear a stored Pro flag whose expiry has passed
    RevokeExpiredPro { user_id: Uuid },
}

/// Background worker configuration
#[derive(Clone)]
pub struct WorkerConfig {
    /// Maximum retries for failed jobs
    pub max_retries: u32,
    /// Backoff duration between retries
    pub retry_delay_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl From<&JobsConfig> for WorkerConfig {
    fn from(config: &JobsConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            retry_delay_ms: config.retry_delay_ms,
        }
    }
}

/// Background job worker
pub struct Worker {
    registry: Registry,
    accounts: Arc<dyn AccountStore>,
    receiver: mpsc::UnboundedReceiver<Job>,
    config: WorkerConfig,
}

impl Worker {
    /// Create a new worker
    pub fn new(
        registry: Registry,
        accounts: Arc<dyn AccountStore>,
        receiver: mpsc::UnboundedReceiver<Job>,
    ) -> Self {
        Self {
            registry,
            accounts,
            receiver,
            config: WorkerConfig::default(),
        }
    }

    /// Set worker configuration
    pub fn with_config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the worker - processes jobs until every sender is dropped
    pub async fn run(mut self) {
        info!("Background worker started");

        while let Some(job) = self.receiver.recv().await {
            self.process_job(job).await;
        }

        info!("Background worker stopped");
    }

    /// Process a single job with bounded retries
    async fn process_job(&self, job: Job) {
        let mut retries = 0;

        loop {
            match self.execute_job(&job).await {
                Ok(()) => break,
                Err(e) if retries < self.config.max_retries => {
                    retries += 1;
                    let delay = std::time::Duration::from_millis(self.config.retry_delay_ms);
                    warn!(
                        ?job,
                        error = %e,
                        "Job failed (attempt {}/{}), retrying in {:?}",
                        retries,
                        self.config.max_retries,
                        delay,
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!(?job, error = %e, "Job dropped after {} retries", self.config.max_retries);
                    break;
                }
            }
        }
    }

    /// Execute a job without retries
    async fn execute_job(&self, job: &Job) -> anyhow::Result<()> {
        match job {
            Job::IncrementClicks { short_code } => {
                self.registry.increment_clicks(short_code).await?;
            }
            Job::RevokeExpiredPro { user_id } => {
                if self.accounts.revoke_expired_pro(*user_id, Utc::now()).await? {
                    info!(user_id = %user_id, "Expired Pro subscription revoked");
                } else {
                    debug!(user_id = %user_id, "Pro flag already reconciled");
                }
            }
        }
        Ok(())
    }
}

/// Job sender - used to submit jobs to the worker
#[derive(Clone)]
pub struct JobSender {
    sender: mpsc::UnboundedSender<Job>,
}

impl JobSender {
    /// Create a new job sender
    pub fn new(sender: mpsc::UnboundedSender<Job>) -> Self {
        Self { sender }
    }

    /// Submit a job without waiting; a closed channel is logged, never returned
    pub fn send(&self, job: Job) {
        if let Err(e) = self.sender.send(job) {
            error!(job = ?e.0, "Failed to send job to worker - channel may be closed");
        }
    }

    /// Submit a click increment job
    pub fn increment_clicks(&self, short_code: String) {
        self.send(Job::IncrementClicks { short_code });
    }

    /// Submit a Pro reconciliation job
    pub fn revoke_expired_pro(&self, user_id: Uuid) {
        self.send(Job::RevokeExpiredPro { user_id });
    }
}

/// Create a new job sender and receiver pair
pub fn create_job_channel() -> (JobSender, mpsc::UnboundedReceiver<Job>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (JobSender::new(sender), receiver)
}
