//! Capacity arithmetic and fee policy

use ckb_types::{
    bytes::Bytes,
    core::Capacity,
    packed::{CellOutput, Transaction},
    prelude::*,
};

use crate::error::{Error, Result};
use crate::types::DEFAULT_TX_FEE;

/// Transaction fee: a flat amount, or shannons per 1000 serialized bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeePolicy {
    Fixed(u64),
    Rate(u64),
}

impl Default for FeePolicy {
    fn default() -> Self {
        FeePolicy::Fixed(DEFAULT_TX_FEE)
    }
}

impl FeePolicy {
    pub fn is_fixed(&self) -> bool {
        matches!(self, FeePolicy::Fixed(_))
    }

    /// Fee for a transaction estimate; the flat policy ignores it.
    pub fn fee_for(&self, tx: &Transaction) -> Result<u64> {
        match *self {
            FeePolicy::Fixed(fee) => Ok(fee),
            FeePolicy::Rate(rate) => calculate_fee(serialized_size_in_block(tx), rate),
        }
    }
}

/// Molecule size plus the 4 byte offset a transaction takes in a block.
pub fn serialized_size_in_block(tx: &Transaction) -> u64 {
    tx.as_slice().len() as u64 + 4
}

/// `size * rate / 1000`, rounded up on any remainder.
pub fn calculate_fee(size: u64, fee_rate: u64) -> Result<u64> {
    let base = size
        .checked_mul(fee_rate)
        .ok_or_else(|| Error::overflow("fee", format!("{size} bytes x {fee_rate}")))?;
    Ok(base.div_ceil(1000))
}

pub fn cell_capacity(output: &CellOutput) -> u64 {
    output.capacity().unpack()
}

pub fn sum_capacity<'a>(outputs: impl IntoIterator<Item = &'a CellOutput>) -> Result<u64> {
    outputs.into_iter().try_fold(0u64, |acc, output| {
        acc.checked_add(cell_capacity(output))
            .ok_or_else(|| Error::overflow("capacity sum", acc))
    })
}

/// Minimum capacity a cell with this output and data must carry.
pub fn occupied_capacity(output: &CellOutput, data: &Bytes) -> Result<u64> {
    let data_capacity = Capacity::bytes(data.len()).map_err(|_| Error::overflow("data capacity", data.len()))?;
    output
        .occupied_capacity(data_capacity)
        .map(|c| c.as_u64())
        .map_err(|_| Error::overflow("occupied capacity", data.len()))
}
