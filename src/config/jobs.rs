use serde::Deserialize;

/// Background worker configuration
#[derive(Debug, Clone, Deserialize)]
pub struct JobsConfig {
    /// Maximum retries for a failed job before it is dropped
    pub max_retries: u32,

    /// Delay between retries in milliseconds
    pub retry_delay_ms: u64,
}

impl JobsConfig {
    /// Validate worker configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.max_retries > 10 {
            return Err("WORKER_MAX_RETRIES must be at most 10".to_string());
        }

        Ok(())
    }
}
