//! Bounded polling until a transaction commits

use std::time::Duration;

use async_trait::async_trait;
use ckb_types::packed::Byte32;
use tracing::{debug, info};

use super::{ChainRpc, TxStatus};
use crate::error::{Error, Result};
use crate::types::{DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL_MS};

#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self { interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS), attempts: DEFAULT_POLL_ATTEMPTS }
    }
}

/// Query the status up to `policy.attempts` times, sleeping between queries
/// while the transaction is pending or proposed.
pub async fn wait_for_commit(
    rpc: &dyn ChainRpc,
    clock: &dyn Clock,
    policy: PollPolicy,
    tx_hash: &Byte32,
) -> Result<()> {
    for attempt in 1..=policy.attempts {
        match rpc.transaction_status(tx_hash).await? {
            TxStatus::Committed => {
                info!(tx_hash = %format!("{tx_hash:#x}"), attempt, "transaction committed");
                return Ok(());
            }
            status @ (TxStatus::Pending | TxStatus::Proposed) => {
                debug!(tx_hash = %format!("{tx_hash:#x}"), attempt, %status, "waiting for commit");
                if attempt < policy.attempts {
                    clock.sleep(policy.interval).await;
                }
            }
            TxStatus::Other(status) => {
                return Err(Error::UnexpectedState(format!("transaction {tx_hash:#x} is {status}")));
            }
        }
    }
    Err(Error::Timeout { tx_hash: format!("{tx_hash:#x}"), attempts: policy.attempts })
}
