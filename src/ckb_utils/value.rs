//! iCKB value conversion against the NervosDAO accumulated rate

use crate::error::{Error, Result};
use crate::types::{GENESIS_ACCUMULATED_RATE, ICKB_SOFT_CAP_PER_DEPOSIT, SOFT_CAP_DISCOUNT_DIVISOR};

/// Converts unoccupied deposit capacity into iCKB.
///
/// `raw = capacity * AR_0 / AR_m`; the part of `raw` above the soft cap is
/// discounted by 10%. The cap applies per deposit unit, so receipts covering
/// several identical deposits convert one unit and multiply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValueOracle {
    pub genesis_rate: u64,
    pub soft_cap: u128,
}

impl Default for ValueOracle {
    fn default() -> Self {
        Self { genesis_rate: GENESIS_ACCUMULATED_RATE, soft_cap: ICKB_SOFT_CAP_PER_DEPOSIT }
    }
}

impl ValueOracle {
    pub fn convert(&self, unoccupied_capacity: u64, ar_m: u64) -> Result<u128> {
        if ar_m == 0 {
            return Err(Error::InvalidAccumulatedRate(format!("ar={ar_m}")));
        }
        // u64 * u64 always fits in u128
        let raw = unoccupied_capacity as u128 * self.genesis_rate as u128 / ar_m as u128;
        if raw > self.soft_cap {
            Ok(raw - (raw - self.soft_cap) / SOFT_CAP_DISCOUNT_DIVISOR)
        } else {
            Ok(raw)
        }
    }

    pub fn receipt_value(&self, deposit_amount: u64, deposit_quantity: u64, ar_m: u64) -> Result<u128> {
        self.convert(deposit_amount, ar_m)?
            .checked_mul(deposit_quantity as u128)
            .ok_or_else(|| Error::overflow("receipt value", format!("{deposit_quantity} x {deposit_amount}")))
    }

    /// Largest single deposit capacity whose value at `ar_m` does not exceed the soft cap.
    ///
    /// `convert(x) <= soft_cap` iff `x * AR_0 < (soft_cap + 1) * ar_m`.
    pub fn capacity_for_soft_cap(&self, ar_m: u64) -> Result<u64> {
        if ar_m == 0 {
            return Err(Error::InvalidAccumulatedRate(format!("ar={ar_m}")));
        }
        let bound = (self.soft_cap + 1)
            .checked_mul(ar_m as u128)
            .ok_or_else(|| Error::overflow("soft cap capacity", self.soft_cap))?;
        let capacity = (bound - 1) / self.genesis_rate as u128;
        u64::try_from(capacity).map_err(|_| Error::overflow("soft cap capacity", capacity))
    }

    pub fn ensure_under_soft_cap(&self, unoccupied_capacity: u64, ar_m: u64) -> Result<()> {
        let value = self.convert(unoccupied_capacity, ar_m)?;
        if value > self.soft_cap {
            return Err(Error::DepositTooLarge { value, soft_cap: self.soft_cap });
        }
        Ok(())
    }
}
