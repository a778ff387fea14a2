//! JSON-RPC client for a CKB node with the built-in indexer enabled

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use ckb_jsonrpc_types::{
    CellOutput as JsonCellOutput, CellWithStatus, HeaderView, JsonBytes, OutPoint as JsonOutPoint,
    Script as JsonScript, Transaction as JsonTransaction, TransactionProof,
};
use ckb_types::{
    core::TransactionView,
    packed::{Byte32, OutPoint, Script},
    prelude::*,
    H256,
};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::debug;

use super::{CellCollector, ChainHeader, ChainRpc, TxStatus};
use crate::ckb_utils::{Cell, LiveCell};
use crate::error::{Error, Result};

/// Indexer page size for `get_cells`.
const CELLS_PAGE_SIZE: usize = 100;
const RPC_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct IndexerCell {
    output: JsonCellOutput,
    output_data: Option<JsonBytes>,
    out_point: JsonOutPoint,
}

#[derive(Deserialize)]
struct CellsPage {
    objects: Vec<IndexerCell>,
    last_cursor: JsonBytes,
}

impl From<IndexerCell> for LiveCell {
    fn from(cell: IndexerCell) -> Self {
        LiveCell {
            out_point: cell.out_point.into(),
            cell: Cell {
                output: cell.output.into(),
                data: cell.output_data.map(JsonBytes::into_bytes).unwrap_or_default(),
            },
        }
    }
}

impl From<HeaderView> for ChainHeader {
    fn from(view: HeaderView) -> Self {
        ChainHeader {
            hash: view.hash.pack(),
            number: view.inner.number.value(),
            dao: view.inner.dao.into(),
        }
    }
}

pub struct RpcClient {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(RPC_TIMEOUT).build()?;
        Ok(Self { client, url: url.into(), next_id: AtomicU64::new(1) })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call_optional<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<Option<T>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(method, id, "rpc call");

        let resp: RpcResponse<T> = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = resp.error {
            return Err(Error::Rpc(format!("{method}: {} (code {})", err.message, err.code)));
        }
        Ok(resp.result)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        self.call_optional(method, params)
            .await?
            .ok_or_else(|| Error::Rpc(format!("{method}: empty result")))
    }
}

#[async_trait]
impl ChainRpc for RpcClient {
    async fn tip_header(&self) -> Result<ChainHeader> {
        let view: HeaderView = self.call("get_tip_header", json!([])).await?;
        Ok(view.into())
    }

    async fn header(&self, block_hash: &Byte32) -> Result<ChainHeader> {
        let hash: H256 = block_hash.unpack();
        let view: HeaderView = self.call("get_header", json!([hash])).await?;
        Ok(view.into())
    }

    async fn committing_block(&self, tx_hash: &Byte32) -> Result<Byte32> {
        let hash: H256 = tx_hash.unpack();
        let proof: TransactionProof = self.call("get_transaction_proof", json!([[hash]])).await?;
        Ok(proof.block_hash.pack())
    }

    async fn live_cell(&self, out_point: &OutPoint) -> Result<Option<Cell>> {
        let json_out_point: JsonOutPoint = out_point.clone().into();
        let res: CellWithStatus = self.call("get_live_cell", json!([json_out_point, true])).await?;
        if res.status != "live" {
            return Ok(None);
        }
        Ok(res.cell.map(|info| Cell {
            output: info.output.into(),
            data: info.data.map(|d| d.content.into_bytes()).unwrap_or_default(),
        }))
    }

    async fn send_transaction(&self, tx: &TransactionView) -> Result<Byte32> {
        let json_tx = JsonTransaction::from(tx.data());
        let hash: H256 = self.call("send_transaction", json!([json_tx, "passthrough"])).await?;
        Ok(hash.pack())
    }

    async fn transaction_status(&self, tx_hash: &Byte32) -> Result<TxStatus> {
        #[derive(Deserialize)]
        struct TxWithStatus {
            tx_status: RpcTxStatus,
        }

        #[derive(Deserialize)]
        struct RpcTxStatus {
            status: String,
        }

        let hash: H256 = tx_hash.unpack();
        // verbosity 1: status only, no transaction body
        let res: Option<TxWithStatus> = self.call_optional("get_transaction", json!([hash, "0x1"])).await?;
        Ok(res.map_or(TxStatus::Other("unknown".to_string()), |r| TxStatus::parse(&r.tx_status.status)))
    }

    async fn genesis_transaction_hashes(&self) -> Result<Vec<Byte32>> {
        #[derive(Deserialize)]
        struct Block {
            transactions: Vec<BlockTx>,
        }

        #[derive(Deserialize)]
        struct BlockTx {
            hash: H256,
        }

        let block: Block = self.call("get_block_by_number", json!(["0x0"])).await?;
        Ok(block.transactions.into_iter().map(|tx| tx.hash.pack()).collect())
    }
}

impl CellCollector for RpcClient {
    fn collect<'a>(&'a self, lock: &Script) -> BoxStream<'a, Result<LiveCell>> {
        let search_key = json!({
            "script": JsonScript::from(lock.clone()),
            "script_type": "lock",
            "filter": {
                "script_len_range": ["0x0", "0x1"],
                "output_data_len_range": ["0x0", "0x1"],
            },
            "with_data": true,
        });
        let limit = format!("{:#x}", CELLS_PAGE_SIZE);

        // state: Some(cursor) while pages remain
        stream::try_unfold(Some(None::<JsonBytes>), move |cursor| {
            let params = cursor.map(|c| json!([search_key, "asc", limit, c]));
            async move {
                let Some(params) = params else {
                    return Ok(None);
                };
                let page: CellsPage = self.call("get_cells", params).await?;
                let next = (page.objects.len() == CELLS_PAGE_SIZE).then_some(Some(page.last_cursor));
                let cells: Vec<LiveCell> = page.objects.into_iter().map(LiveCell::from).collect();
                Ok::<_, Error>(Some((cells, next)))
            }
        })
        .map_ok(|cells| stream::iter(cells.into_iter().map(Ok)))
        .try_flatten()
        .boxed()
    }
}

