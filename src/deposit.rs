//! Two-phase iCKB deposit
//!
//! Phase one locks `quantity` identical NervosDAO deposits under the iCKB domain
//! logic and mints a receipt for them, plus an owner-lock cell used to authorize
//! phase two. Phase two, once the receipt's block is committed, consumes the
//! receipt and owner-lock cell and mints iCKB sUDT valued at the receipt block's
//! accumulated rate. The two phases usually run in different invocations, so
//! phase one's result is a [`DepositHandoff`] that can be written to disk.

use std::collections::HashMap;
use std::path::Path;

use ckb_jsonrpc_types::OutPoint as JsonOutPoint;
use ckb_types::{
    bytes::Bytes,
    packed::{OutPoint, Script},
    prelude::*,
    H256,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::chain::ChainRpc;
use crate::ckb_utils::{
    format_out_point, ickb_sudt_script, token_amount_to_bytes, Cell, LiveCell, Receipt, RoleOutPoints,
    TransactionDraft, ValueOracle,
};
use crate::config::{ScriptRegistry, DAO, DEPOSIT_SCRIPTS, ICKB_DOMAIN_LOGIC};
use crate::error::{Error, Result};
use crate::submit::{Submitted, Submitter};
use crate::types::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepositRequest {
    /// Unoccupied capacity of each deposit, in shannons.
    pub amount: u64,
    pub quantity: u32,
}

impl DepositRequest {
    pub fn new(amount: u64, quantity: u32) -> Result<Self> {
        let request = Self { amount, quantity };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<()> {
        if self.amount >= DEPOSIT_AMOUNT_LIMIT {
            return Err(Error::overflow("deposit amount", self.amount));
        }
        if self.quantity == 0 || self.quantity > MAX_DEPOSIT_QUANTITY {
            return Err(Error::Limit {
                what: "deposit quantity",
                value: self.quantity as u64,
                max: MAX_DEPOSIT_QUANTITY as u64,
            });
        }
        Ok(())
    }

    pub fn receipt(&self) -> Receipt {
        Receipt::new(self.amount, self.quantity as u64)
    }

    pub fn deposit_capacity(&self) -> Result<u64> {
        (DEPOSIT_OCCUPIED_CKB * SHANNONS_PER_CKB)
            .checked_add(self.amount)
            .ok_or_else(|| Error::overflow("deposit capacity", self.amount))
    }
}

/// What phase two needs from phase one.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositHandoff {
    pub receipt_out_points: Vec<JsonOutPoint>,
    pub owner_lock_out_point: JsonOutPoint,
}

impl DepositHandoff {
    pub fn new(receipts: &[OutPoint], owner_lock: &OutPoint) -> Self {
        Self {
            receipt_out_points: receipts.iter().cloned().map(Into::into).collect(),
            owner_lock_out_point: owner_lock.clone().into(),
        }
    }

    pub fn from_out_points(out_points: &RoleOutPoints) -> Result<Self> {
        let receipts = out_points.get(Role::Receipt);
        if receipts.is_empty() {
            return Err(Error::UnexpectedState("phase one produced no receipt".to_string()));
        }
        Ok(Self::new(receipts, &out_points.first(Role::OwnerLock)?))
    }

    pub fn receipts(&self) -> Vec<OutPoint> {
        self.receipt_out_points.iter().cloned().map(Into::into).collect()
    }

    pub fn owner_lock(&self) -> OutPoint {
        self.owner_lock_out_point.clone().into()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }
}

/// Phase one outputs: the deposits, a receipt owned by `owner_lock` and the owner-lock cell.
pub fn build_phase_one(
    request: &DepositRequest,
    owner_lock: &Script,
    registry: &ScriptRegistry,
) -> Result<TransactionDraft> {
    request.validate()?;
    registry.require(DEPOSIT_SCRIPTS)?;
    let ickb_logic = registry.script(ICKB_DOMAIN_LOGIC)?;
    let dao = registry.script(DAO)?;

    let mut draft = TransactionDraft::new();

    let deposit = Cell::new(
        request.deposit_capacity()?,
        ickb_logic.clone(),
        Some(dao),
        Bytes::copy_from_slice(&0u64.to_le_bytes()),
    );
    draft.add_outputs(Role::Deposit, vec![deposit; request.quantity as usize])?;

    let receipt = Cell::new(
        RECEIPT_CELL_CKB * SHANNONS_PER_CKB,
        owner_lock.clone(),
        Some(ickb_logic.clone()),
        request.receipt().to_bytes()?,
    );
    draft.add_outputs(Role::Receipt, [receipt])?;

    let owner = Cell::new(OWNER_LOCK_CELL_CKB * SHANNONS_PER_CKB, ickb_logic, None, Bytes::new());
    draft.add_outputs(Role::OwnerLock, [owner])?;

    // one output stays free for change
    if draft.outputs().len() >= DAO_OUTPUT_LIMIT {
        return Err(Error::Limit {
            what: "dao transaction outputs",
            value: draft.outputs().len() as u64 + 1,
            max: DAO_OUTPUT_LIMIT as u64,
        });
    }
    Ok(draft)
}

async fn fetch_live(rpc: &dyn ChainRpc, out_point: &OutPoint) -> Result<LiveCell> {
    let cell = rpc
        .live_cell(out_point)
        .await?
        .ok_or_else(|| Error::LiveCellNotFound(format_out_point(out_point)))?;
    Ok(LiveCell { out_point: out_point.clone(), cell })
}

/// Phase two: redeem every receipt in `handoff` for iCKB, one token cell per
/// receipt, locked like the receipt it replaces.
pub async fn build_phase_two(
    handoff: &DepositHandoff,
    rpc: &dyn ChainRpc,
    registry: &ScriptRegistry,
    oracle: &ValueOracle,
) -> Result<TransactionDraft> {
    registry.require(DEPOSIT_SCRIPTS)?;
    let receipts = handoff.receipts();
    if receipts.is_empty() {
        return Err(Error::Config("deposit hand-off lists no receipts".to_string()));
    }
    let ickb_logic = registry.get(ICKB_DOMAIN_LOGIC)?;
    let token_type = ickb_sudt_script(registry)?;

    let mut draft = TransactionDraft::new();
    let mut rates: HashMap<H256, u64> = HashMap::new();

    for out_point in &receipts {
        if draft.spends(out_point) {
            return Err(Error::DuplicateInput(format_out_point(out_point)));
        }
        let receipt_cell = fetch_live(rpc, out_point).await?;
        let is_receipt = receipt_cell
            .cell
            .output
            .type_()
            .to_opt()
            .is_some_and(|t| ickb_logic.runs(&t));
        if !is_receipt {
            return Err(Error::NotAReceipt(format_out_point(out_point)));
        }
        let receipt = Receipt::from_bytes(&receipt_cell.cell.data)?;

        let block_hash = rpc.committing_block(&out_point.tx_hash()).await?;
        let key: H256 = block_hash.unpack();
        let ar = match rates.get(&key) {
            Some(ar) => *ar,
            None => {
                let ar = rpc.header(&block_hash).await?.accumulated_rate();
                rates.insert(key, ar);
                ar
            }
        };
        let value = oracle.receipt_value(receipt.deposit_amount, receipt.deposit_quantity, ar)?;
        debug!(
            receipt = %format_out_point(out_point),
            amount = receipt.deposit_amount,
            quantity = receipt.deposit_quantity,
            ar,
            value = %value,
            "receipt valued"
        );

        let token = Cell::new(
            TOKEN_CELL_CKB * SHANNONS_PER_CKB,
            receipt_cell.cell.output.lock(),
            Some(token_type.clone()),
            token_amount_to_bytes(value),
        );
        draft.add_header_dep(block_hash);
        draft.add_input(receipt_cell);
        draft.add_outputs(Role::IckbSudt, [token])?;
    }

    let owner_lock = handoff.owner_lock();
    if draft.spends(&owner_lock) {
        return Err(Error::DuplicateInput(format_out_point(&owner_lock)));
    }
    draft.add_input(fetch_live(rpc, &owner_lock).await?);
    Ok(draft)
}

/// Largest single deposit that stays at the soft cap at the current tip.
pub async fn default_deposit_amount(rpc: &dyn ChainRpc, oracle: &ValueOracle) -> Result<u64> {
    let tip = rpc.tip_header().await?;
    oracle.capacity_for_soft_cap(tip.accumulated_rate())
}

pub async fn run_phase_one(
    submitter: &Submitter<'_>,
    request: DepositRequest,
    oracle: &ValueOracle,
    check_soft_cap: bool,
) -> Result<(Submitted, DepositHandoff)> {
    // nothing touches the node before the request is known to be valid
    request.validate()?;
    if check_soft_cap {
        let tip = submitter.rpc().tip_header().await?;
        oracle.ensure_under_soft_cap(request.amount, tip.accumulated_rate())?;
    } else {
        warn!(amount = request.amount, "soft cap check skipped");
    }

    let owner_lock = submitter.signer().lock_script();
    let draft = build_phase_one(&request, &owner_lock, submitter.registry())?;
    let submitted = submitter.submit(draft).await?;
    let handoff = DepositHandoff::from_out_points(&submitted.out_points)?;
    info!(
        tx_hash = %format!("{:#x}", submitted.tx_hash),
        quantity = request.quantity,
        amount = request.amount,
        "deposit phase one committed"
    );
    Ok((submitted, handoff))
}

pub async fn run_phase_two(
    submitter: &Submitter<'_>,
    handoff: &DepositHandoff,
    oracle: &ValueOracle,
) -> Result<Submitted> {
    let draft = build_phase_two(handoff, submitter.rpc(), submitter.registry(), oracle).await?;
    let submitted = submitter.submit(draft).await?;
    info!(
        tx_hash = %format!("{:#x}", submitted.tx_hash),
        tokens = submitted.out_points.get(Role::IckbSudt).len(),
        "deposit phase two committed"
    );
    Ok(submitted)
}
