//! Receipt and token cell data codecs
//!
//! Receipt data packs `(deposit_amount, deposit_quantity)` into one little-endian u64:
//! `deposit_quantity * 2^48 + deposit_amount`. Token cells carry a little-endian u128 amount.

use ckb_types::bytes::Bytes;

use crate::error::{Error, Result};
use crate::types::DEPOSIT_AMOUNT_LIMIT;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub deposit_amount: u64,
    pub deposit_quantity: u64,
}

impl Receipt {
    pub fn new(deposit_amount: u64, deposit_quantity: u64) -> Self {
        Self { deposit_amount, deposit_quantity }
    }

    pub fn pack(&self) -> Result<u64> {
        pack_receipt(self.deposit_amount, self.deposit_quantity)
    }

    pub fn to_bytes(&self) -> Result<Bytes> {
        Ok(Bytes::from(self.pack()?.to_le_bytes().to_vec()))
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let raw: [u8; 8] = data.try_into().map_err(|_| Error::MalformedCellData {
            what: "receipt",
            expected: 8,
            actual: data.len(),
        })?;
        Ok(unpack_receipt(u64::from_le_bytes(raw)))
    }
}

pub fn pack_receipt(amount: u64, quantity: u64) -> Result<u64> {
    if amount >= DEPOSIT_AMOUNT_LIMIT {
        return Err(Error::overflow("deposit amount", amount));
    }
    quantity
        .checked_mul(DEPOSIT_AMOUNT_LIMIT)
        .and_then(|q| q.checked_add(amount))
        .ok_or_else(|| Error::overflow("receipt", format!("{quantity} * 2^48 + {amount}")))
}

pub fn unpack_receipt(value: u64) -> Receipt {
    Receipt {
        deposit_amount: value % DEPOSIT_AMOUNT_LIMIT,
        deposit_quantity: value / DEPOSIT_AMOUNT_LIMIT,
    }
}

pub fn token_amount_to_bytes(amount: u128) -> Bytes {
    Bytes::from(amount.to_le_bytes().to_vec())
}

pub fn token_amount_from_bytes(data: &[u8]) -> Result<u128> {
    let raw: [u8; 16] = data.try_into().map_err(|_| Error::MalformedCellData {
        what: "token",
        expected: 16,
        actual: data.len(),
    })?;
    Ok(u128::from_le_bytes(raw))
}
