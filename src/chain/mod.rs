//! Chain access: node RPC, live cell collection and commit polling
//!
//! Builders only see the [`ChainRpc`] and [`CellCollector`] traits; the JSON-RPC
//! client in [`client`] is one implementation, test fakes are another.

pub mod client;
pub mod wait;

pub use client::*;
pub use wait::*;

use async_trait::async_trait;
use ckb_types::{
    core::TransactionView,
    packed::{Byte32, OutPoint, Script},
};
use futures::stream::BoxStream;

use crate::ckb_utils::{dao_accumulated_rate, Cell, LiveCell};
use crate::error::Result;

#[derive(Clone, Debug)]
pub struct ChainHeader {
    pub hash: Byte32,
    pub number: u64,
    pub dao: Byte32,
}

impl ChainHeader {
    pub fn accumulated_rate(&self) -> u64 {
        dao_accumulated_rate(&self.dao)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxStatus {
    Pending,
    Proposed,
    Committed,
    /// Anything else the node reports: `unknown`, `rejected`, ...
    Other(String),
}

impl TxStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "pending" => TxStatus::Pending,
            "proposed" => TxStatus::Proposed,
            "committed" => TxStatus::Committed,
            other => TxStatus::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for TxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TxStatus::Pending => f.write_str("pending"),
            TxStatus::Proposed => f.write_str("proposed"),
            TxStatus::Committed => f.write_str("committed"),
            TxStatus::Other(status) => f.write_str(status),
        }
    }
}

#[async_trait]
pub trait ChainRpc: Send + Sync {
    async fn tip_header(&self) -> Result<ChainHeader>;

    async fn header(&self, block_hash: &Byte32) -> Result<ChainHeader>;

    /// Hash of the block that committed `tx_hash`, via its inclusion proof.
    async fn committing_block(&self, tx_hash: &Byte32) -> Result<Byte32>;

    /// `None` unless the cell exists and is unspent.
    async fn live_cell(&self, out_point: &OutPoint) -> Result<Option<Cell>>;

    async fn send_transaction(&self, tx: &TransactionView) -> Result<Byte32>;

    async fn transaction_status(&self, tx_hash: &Byte32) -> Result<TxStatus>;

    async fn genesis_transaction_hashes(&self) -> Result<Vec<Byte32>>;
}

/// Live cells guarded by `lock` with no type script and no data, in chain order.
pub trait CellCollector: Send + Sync {
    fn collect<'a>(&'a self, lock: &Script) -> BoxStream<'a, Result<LiveCell>>;
}
