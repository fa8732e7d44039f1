//! Fixed delay between targets

use async_trait::async_trait;
use std::time::Duration;

/// Pause enforced between consecutive targets
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn wait_between_targets(&self);
}

/// Sleeps for a fixed duration
#[derive(Debug, Clone)]
pub struct SleepPacer {
    delay: Duration,
}

impl SleepPacer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn from_secs(seconds: u64) -> Self {
        Self::new(Duration::from_secs(seconds))
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[async_trait]
impl Pacer for SleepPacer {
    async fn wait_between_targets(&self) {
        if self.delay.is_zero() {
            return;
        }
        tracing::info!(seconds = self.delay.as_secs(), "Waiting before next target");
        tokio::time::sleep(self.delay).await;
    }
}
