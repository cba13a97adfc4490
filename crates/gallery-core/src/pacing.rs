//! Pauses between processed items.

use crate::config::DelayRange;
use async_trait::async_trait;
use tracing::debug;

/// Decides how to wait between items.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, range: DelayRange);
}

/// Sleeps a random duration from the range.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, range: DelayRange) {
        let delay = range.sample();
        debug!("Pausing {:?}", delay);
        tokio::time::sleep(delay).await;
    }
}

/// Never waits.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPacer;

#[async_trait]
impl Pacer for NoPacer {
    async fn pause(&self, _range: DelayRange) {}
}
