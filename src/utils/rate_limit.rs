use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Pacing applied before every detail-page request.
#[async_trait]
pub trait RateLimit: Send + Sync {
    async fn wait(&self);
}

/// Unconditional fixed pause, regardless of how fast the server answers.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        FixedDelay { delay }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[async_trait]
impl RateLimit for FixedDelay {
    async fn wait(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// No pacing at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unlimited;

#[async_trait]
impl RateLimit for Unlimited {
    async fn wait(&self) {}
}

/// Shares one limiter between owners.
#[async_trait]
impl<L: RateLimit + ?Sized> RateLimit for Arc<L> {
    async fn wait(&self) {
        (**self).wait().await
    }
}
