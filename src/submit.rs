//! Transaction pipeline: balance, sign, broadcast and wait for commitment.
//!
//! Every build (deploy, dep group, deposit phases) ends here. A draft moves
//! through `Draft -> Funded -> Signed -> Broadcast -> Confirmed`; nothing reaches
//! the chain before `Broadcast`, so an error in an earlier state only drops the
//! in-memory draft.

use ckb_types::{packed::Byte32, prelude::*};
use serde::Serialize;
use tracing::info;

use crate::chain::{wait_for_commit, CellCollector, ChainRpc, Clock, PollPolicy};
use crate::ckb_utils::{seal, FeePolicy, RoleOutPoints, Signer, TransactionDraft};
use crate::config::{ScriptRegistry, DAO};
use crate::error::{Error, Result};
use crate::ledger::{self, Balance};
use crate::types::DAO_OUTPUT_LIMIT;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TxState {
    Draft,
    Funded,
    Signed,
    Broadcast,
    Confirmed,
}

const VALID_TRANSITIONS: &[(TxState, TxState)] = &[
    (TxState::Draft, TxState::Funded),
    (TxState::Funded, TxState::Signed),
    (TxState::Signed, TxState::Broadcast),
    (TxState::Broadcast, TxState::Confirmed),
];

impl TxState {
    pub fn advance(&mut self, to: TxState) -> Result<()> {
        if !VALID_TRANSITIONS.contains(&(*self, to)) {
            return Err(Error::InvalidStateTransition { from: format!("{self:?}"), to: format!("{to:?}") });
        }
        *self = to;
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TxState::Confirmed)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubmitConfig {
    pub fee: FeePolicy,
    pub poll: PollPolicy,
}

#[derive(Clone, Debug)]
pub struct Submitted {
    pub tx_hash: Byte32,
    pub out_points: RoleOutPoints,
    pub balance: Balance,
}

/// A transaction that carries any DAO-typed output may not exceed the DAO output ceiling.
pub fn ensure_dao_output_limit(draft: &TransactionDraft, registry: &ScriptRegistry) -> Result<()> {
    let Ok(dao) = registry.get(DAO) else {
        return Ok(());
    };
    let has_dao_output = draft
        .outputs()
        .iter()
        .filter_map(|o| o.output.type_().to_opt())
        .any(|t| dao.runs(&t));
    if has_dao_output && draft.outputs().len() > DAO_OUTPUT_LIMIT {
        return Err(Error::Limit {
            what: "dao transaction outputs",
            value: draft.outputs().len() as u64,
            max: DAO_OUTPUT_LIMIT as u64,
        });
    }
    Ok(())
}

pub struct Submitter<'a> {
    rpc: &'a dyn ChainRpc,
    collector: &'a dyn CellCollector,
    signer: &'a dyn Signer,
    registry: &'a ScriptRegistry,
    clock: &'a dyn Clock,
    config: SubmitConfig,
}

impl<'a> Submitter<'a> {
    pub fn new(
        rpc: &'a dyn ChainRpc,
        collector: &'a dyn CellCollector,
        signer: &'a dyn Signer,
        registry: &'a ScriptRegistry,
        clock: &'a dyn Clock,
        config: SubmitConfig,
    ) -> Self {
        Self { rpc, collector, signer, registry, clock, config }
    }

    pub fn rpc(&self) -> &'a dyn ChainRpc {
        self.rpc
    }

    pub fn signer(&self) -> &'a dyn Signer {
        self.signer
    }

    pub fn registry(&self) -> &'a ScriptRegistry {
        self.registry
    }

    pub fn poll_policy(&self) -> PollPolicy {
        self.config.poll
    }

    pub async fn submit(&self, mut draft: TransactionDraft) -> Result<Submitted> {
        let mut state = TxState::Draft;
        let lock = self.signer.lock_script();

        let balance = ledger::balance(&mut draft, &lock, self.collector, self.registry, self.config.fee).await?;
        ensure_dao_output_limit(&draft, self.registry)?;
        state.advance(TxState::Funded)?;

        let roles = draft.pop_role_tags()?;
        draft.finalize_witnesses()?;
        seal(&mut draft, self.signer)?;
        state.advance(TxState::Signed)?;

        let tx = draft.to_transaction();
        let tx_hash = self.rpc.send_transaction(&tx).await?;
        if tx_hash.as_slice() != tx.hash().as_slice() {
            return Err(Error::Rpc(format!("node returned hash {tx_hash:#x}, expected {:#x}", tx.hash())));
        }
        state.advance(TxState::Broadcast)?;
        info!(
            tx_hash = %format!("{tx_hash:#x}"),
            inputs = tx.inputs().len(),
            outputs = tx.outputs().len(),
            fee = balance.fee,
            "transaction broadcast"
        );

        wait_for_commit(self.rpc, self.clock, self.config.poll, &tx_hash).await?;
        state.advance(TxState::Confirmed)?;

        Ok(Submitted { out_points: roles.into_out_points(&tx_hash), tx_hash, balance })
    }
}
