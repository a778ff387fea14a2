//! Incremental transaction assembly
//!
//! A draft collects cell deps, header deps, resolved inputs and outputs. Every
//! output is added together with a [`Role`] kept in a parallel list, so that once
//! the transaction hash is known callers can look outpoints up by meaning. Roles
//! never reach the chain: they are popped before witnesses are finalized.

use std::collections::{BTreeMap, HashSet};

use ckb_jsonrpc_types::OutPoint as JsonOutPoint;
use ckb_types::{
    bytes::Bytes,
    core::{TransactionBuilder, TransactionView},
    packed::{Byte32, CellDep, CellInput, CellOutput, OutPoint, Script, Transaction, WitnessArgs},
    prelude::*,
    H256,
};

use super::capacity::{cell_capacity, occupied_capacity, sum_capacity};
use super::scripts::format_out_point;
use crate::config::ScriptRegistry;
use crate::error::{Error, Result};
use crate::types::{Role, SIGNATURE_SIZE};

#[derive(Clone, Debug)]
pub struct Cell {
    pub output: CellOutput,
    pub data: Bytes,
}

impl Cell {
    pub fn new(capacity: u64, lock: Script, type_: Option<Script>, data: Bytes) -> Self {
        let output = CellOutput::new_builder()
            .capacity(capacity.pack())
            .lock(lock)
            .type_(type_.pack())
            .build();
        Self { output, data }
    }

    pub fn capacity(&self) -> u64 {
        cell_capacity(&self.output)
    }
}

/// A cell resolved from the chain together with where it lives.
#[derive(Clone, Debug)]
pub struct LiveCell {
    pub out_point: OutPoint,
    pub cell: Cell,
}

#[derive(Clone, Debug, Default)]
pub struct TransactionDraft {
    cell_deps: Vec<CellDep>,
    header_deps: Vec<Byte32>,
    inputs: Vec<LiveCell>,
    outputs: Vec<Cell>,
    roles: Vec<Role>,
    witnesses: Vec<Bytes>,
}

impl TransactionDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cell_deps(&self) -> &[CellDep] {
        &self.cell_deps
    }

    pub fn header_deps(&self) -> &[Byte32] {
        &self.header_deps
    }

    pub fn inputs(&self) -> &[LiveCell] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Cell] {
        &self.outputs
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn witnesses(&self) -> &[Bytes] {
        &self.witnesses
    }

    /// Append `cells`, all tagged with `role`.
    pub fn add_outputs(&mut self, role: Role, cells: impl IntoIterator<Item = Cell>) -> Result<()> {
        self.ensure_aligned()?;
        let cells: Vec<Cell> = cells.into_iter().collect();
        for cell in &cells {
            let occupied = occupied_capacity(&cell.output, &cell.data)?;
            if cell.capacity() < occupied {
                return Err(Error::UnderCapacity {
                    role: role.to_string(),
                    capacity: cell.capacity(),
                    occupied,
                });
            }
        }
        self.roles.extend(std::iter::repeat(role).take(cells.len()));
        self.outputs.extend(cells);
        Ok(())
    }

    /// Returns false when the outpoint is already spent by this draft.
    pub fn add_input(&mut self, input: LiveCell) -> bool {
        if self.spends(&input.out_point) {
            return false;
        }
        self.inputs.push(input);
        true
    }

    pub fn spends(&self, out_point: &OutPoint) -> bool {
        self.inputs.iter().any(|i| i.out_point.as_slice() == out_point.as_slice())
    }

    pub fn add_cell_dep(&mut self, cell_dep: CellDep) {
        if !self.cell_deps.iter().any(|d| d.as_slice() == cell_dep.as_slice()) {
            self.cell_deps.push(cell_dep);
        }
    }

    pub fn add_header_dep(&mut self, block_hash: Byte32) {
        if !self.header_deps.iter().any(|h| h.as_slice() == block_hash.as_slice()) {
            self.header_deps.push(block_hash);
        }
    }

    /// Cell deps for every script the transaction runs: input locks, input and output types.
    pub fn add_script_deps(&mut self, registry: &ScriptRegistry) -> Result<()> {
        let scripts: Vec<Script> = self
            .inputs
            .iter()
            .flat_map(|i| [Some(i.cell.output.lock()), i.cell.output.type_().to_opt()])
            .chain(self.outputs.iter().map(|o| o.output.type_().to_opt()))
            .flatten()
            .collect();
        for script in scripts {
            let (_, info) = registry
                .find(&script)
                .ok_or_else(|| Error::MissingScript(format!("{:#x}", script.code_hash())))?;
            self.add_cell_dep(info.cell_dep());
        }
        Ok(())
    }

    pub fn input_capacity(&self) -> Result<u64> {
        sum_capacity(self.inputs.iter().map(|i| &i.cell.output))
    }

    pub fn output_capacity(&self) -> Result<u64> {
        sum_capacity(self.outputs.iter().map(|o| &o.output))
    }

    pub fn ensure_aligned(&self) -> Result<()> {
        if self.outputs.len() != self.roles.len() {
            return Err(Error::Alignment { outputs: self.outputs.len(), roles: self.roles.len() });
        }
        Ok(())
    }

    /// Take the role list out of the draft.
    pub fn pop_role_tags(&mut self) -> Result<RoleTags> {
        self.ensure_aligned()?;
        Ok(RoleTags(std::mem::take(&mut self.roles)))
    }

    /// One `WitnessArgs` per input: the first input of each distinct lock gets a
    /// zeroed signature-sized lock, all others an empty lock.
    pub fn placeholder_witnesses(&self) -> Vec<Bytes> {
        let mut seen_locks = HashSet::new();
        self.inputs
            .iter()
            .map(|input| {
                let lock_hash: H256 = input.cell.output.lock().calc_script_hash().unpack();
                let lock = if seen_locks.insert(lock_hash) {
                    Bytes::from(vec![0u8; SIGNATURE_SIZE])
                } else {
                    Bytes::new()
                };
                WitnessArgs::new_builder().lock(Some(lock).pack()).build().as_bytes()
            })
            .collect()
    }

    pub fn finalize_witnesses(&mut self) -> Result<()> {
        if !self.witnesses.is_empty() {
            return Err(Error::AlreadyFinalized(self.witnesses.len()));
        }
        self.witnesses = self.placeholder_witnesses();
        Ok(())
    }

    pub fn set_witness(&mut self, index: usize, witness: Bytes) -> Result<()> {
        let len = self.witnesses.len();
        let slot = self
            .witnesses
            .get_mut(index)
            .ok_or_else(|| Error::Signing(format!("no witness slot {index}, {len} finalized")))?;
        *slot = witness;
        Ok(())
    }

    fn build(&self, extra_output: Option<&Cell>, witnesses: &[Bytes]) -> TransactionView {
        let outputs = self.outputs.iter().chain(extra_output);
        TransactionBuilder::default()
            .cell_deps(self.cell_deps.clone())
            .header_deps(self.header_deps.clone())
            .inputs(self.inputs.iter().map(|i| CellInput::new(i.out_point.clone(), 0)))
            .outputs(outputs.clone().map(|o| o.output.clone()))
            .outputs_data(outputs.map(|o| o.data.pack()))
            .witnesses(witnesses.iter().map(|w| w.pack()))
            .build()
    }

    /// The transaction as currently assembled.
    pub fn to_transaction(&self) -> TransactionView {
        self.build(None, &self.witnesses)
    }

    /// Size stand-in for fee estimation: placeholder witnesses and an optional change cell.
    pub fn estimate(&self, change: Option<&Cell>) -> Transaction {
        self.build(change, &self.placeholder_witnesses()).data()
    }
}

/// Roles taken out of a draft, in output order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoleTags(Vec<Role>);

impl RoleTags {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_out_points(self, tx_hash: &Byte32) -> RoleOutPoints {
        let mut map: BTreeMap<Role, Vec<OutPoint>> = BTreeMap::new();
        for (index, role) in self.0.into_iter().enumerate() {
            map.entry(role).or_default().push(OutPoint::new(tx_hash.clone(), index as u32));
        }
        RoleOutPoints(map)
    }
}

#[derive(Clone, Debug, Default)]
pub struct RoleOutPoints(BTreeMap<Role, Vec<OutPoint>>);

impl RoleOutPoints {
    pub fn get(&self, role: Role) -> &[OutPoint] {
        self.0.get(&role).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn first(&self, role: Role) -> Result<OutPoint> {
        self.get(role)
            .first()
            .cloned()
            .ok_or_else(|| Error::UnexpectedState(format!("transaction has no {role} output")))
    }

    pub fn to_json(&self) -> BTreeMap<Role, Vec<JsonOutPoint>> {
        self.0
            .iter()
            .map(|(role, out_points)| (*role, out_points.iter().cloned().map(Into::into).collect()))
            .collect()
    }

    pub fn describe(&self) -> Vec<String> {
        self.0
            .iter()
            .flat_map(|(role, ops)| ops.iter().map(move |op| format!("{role}: {}", format_out_point(op))))
            .collect()
    }
}
