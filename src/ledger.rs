//! Capacity balancing: fund a draft from the owner's plain cells and return the
//! residual as one change output.

use ckb_types::{bytes::Bytes, packed::Script};
use futures::TryStreamExt;
use tracing::{debug, info};

use crate::chain::CellCollector;
use crate::ckb_utils::{Cell, FeePolicy, TransactionDraft};
use crate::config::ScriptRegistry;
use crate::error::{Error, Result};
use crate::types::{Role, MIN_CHANGE_CELL_CKB, SHANNONS_PER_CKB};

pub const MIN_CHANGE_CELL_CAPACITY: u64 = MIN_CHANGE_CELL_CKB * SHANNONS_PER_CKB;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Balance {
    pub fee: u64,
    pub change: Option<u64>,
}

fn change_cell(capacity: u64, owner_lock: &Script) -> Cell {
    Cell::new(capacity, owner_lock.clone(), None, Bytes::new())
}

/// Balance `draft` so that inputs equal outputs plus fee.
///
/// Leaves the draft alone when it is already exact. Otherwise collects plain
/// cells of `owner_lock` until a change cell fits, then appends the change.
/// Cell deps for every script in use are added before each size estimate, so a
/// rate-based fee is charged on the transaction as broadcast.
pub async fn balance(
    draft: &mut TransactionDraft,
    owner_lock: &Script,
    collector: &dyn CellCollector,
    registry: &ScriptRegistry,
    fee_policy: FeePolicy,
) -> Result<Balance> {
    let template = change_cell(MIN_CHANGE_CELL_CAPACITY, owner_lock);
    loop {
        draft.add_script_deps(registry)?;
        let input = draft.input_capacity()?;
        let output = draft.output_capacity()?;

        let exact_fee = fee_policy.fee_for(&draft.estimate(None))?;
        if Some(input) == output.checked_add(exact_fee) {
            debug!(input, output, fee = exact_fee, "draft already balanced");
            return Ok(Balance { fee: exact_fee, change: None });
        }

        let fee = fee_policy.fee_for(&draft.estimate(Some(&template)))?;
        let required = output
            .checked_add(MIN_CHANGE_CELL_CAPACITY)
            .and_then(|c| c.checked_add(fee))
            .ok_or_else(|| Error::overflow("required capacity", output))?;

        if input < required {
            let collected = collect_capacity(draft, owner_lock, collector, required - input).await?;
            debug!(collected, shortfall = required - input, "added funding inputs");
            // a rate-based fee grows with the new inputs
            continue;
        }

        let change = input - output - fee;
        draft.add_outputs(Role::Change, [change_cell(change, owner_lock)])?;
        info!(input, output, fee, change, "draft balanced");
        return Ok(Balance { fee, change: Some(change) });
    }
}

/// Add plain cells of `owner_lock` until at least `target` shannons are added.
async fn collect_capacity(
    draft: &mut TransactionDraft,
    owner_lock: &Script,
    collector: &dyn CellCollector,
    target: u64,
) -> Result<u64> {
    let mut collected = 0u64;
    let mut cells = collector.collect(owner_lock);
    while let Some(live) = cells.try_next().await? {
        // cells carrying data (deployed code, dep groups) are never spent for fees
        if !live.cell.data.is_empty() || live.cell.output.type_().to_opt().is_some() {
            continue;
        }
        let capacity = live.cell.capacity();
        if !draft.add_input(live) {
            continue;
        }
        collected = collected.saturating_add(capacity);
        if collected >= target {
            return Ok(collected);
        }
    }
    let input = draft.input_capacity()?;
    Err(Error::InsufficientFunds {
        required: input.saturating_sub(collected).saturating_add(target),
        collected: input,
    })
}
