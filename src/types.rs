//! Shared constants and data structures

use serde::{Deserialize, Serialize};

// ── Capacity Constants ───────────────────────────────────────────────────────

pub const SHANNONS_PER_CKB: u64 = 100_000_000;

/// Flat fee paid by every transaction unless a fee rate is configured.
pub const DEFAULT_TX_FEE: u64 = 200_000;

/// Smallest plain cell (capacity + secp256k1 lock with 20 byte args).
pub const MIN_CHANGE_CELL_CKB: u64 = 61;

// Occupied capacity of the cell shapes emitted by the deposit protocol, in CKBytes.
pub const DEPOSIT_OCCUPIED_CKB: u64 = 82;
pub const RECEIPT_CELL_CKB: u64 = 102;
pub const OWNER_LOCK_CELL_CKB: u64 = 41;
pub const TOKEN_CELL_CKB: u64 = 142;

/// Capacity header of a code or dep group cell: 8 (capacity) + 32 (code hash) + 1 (hash type).
pub const DEPLOY_CELL_BASE_CKB: u64 = 41;

// ── Deposit Constants ────────────────────────────────────────────────────────

/// Receipt data keeps the deposit amount in the low 6 bytes.
pub const DEPOSIT_AMOUNT_LIMIT: u64 = 1 << 48;

/// NervosDAO transactions are limited to 64 outputs.
pub const DAO_OUTPUT_LIMIT: usize = 64;

/// 64 outputs minus receipt, owner lock and change.
pub const MAX_DEPOSIT_QUANTITY: u32 = 61;

/// Accumulated rate at genesis.
pub const GENESIS_ACCUMULATED_RATE: u64 = 10_000_000_000_000_000;

/// Per deposit iCKB soft cap: 100_000 CKBytes.
pub const ICKB_SOFT_CAP_PER_DEPOSIT: u128 = 100_000 * SHANNONS_PER_CKB as u128;

/// Discount divisor applied to the part of a deposit above the soft cap (10%).
pub const SOFT_CAP_DISCOUNT_DIVISOR: u128 = 10;

// ── Confirmation Polling ─────────────────────────────────────────────────────

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_POLL_ATTEMPTS: u32 = 120;

// ── Witness Layout ───────────────────────────────────────────────────────────

/// Recoverable secp256k1 signature: 64 bytes compact + 1 byte recovery id.
pub const SIGNATURE_SIZE: usize = 65;

// ── Genesis References ───────────────────────────────────────────────────────

/// Genesis cellbase outputs bundled into the iCKB dep group:
/// SECP256K1_BLAKE160_SIGHASH_ALL, DAO, SECP256K1_DATA.
pub const GENESIS_DEP_GROUP_INDICES: [u32; 3] = [1, 2, 3];

// ── Output Roles ─────────────────────────────────────────────────────────────

/// Assembly-time label attached to every output, used to find outpoints by
/// meaning once the transaction hash is known. Never part of on-chain data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    Funding,
    Code,
    DepGroup,
    Deposit,
    Receipt,
    OwnerLock,
    IckbSudt,
    Change,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Funding => "funding",
            Role::Code => "code",
            Role::DepGroup => "depGroup",
            Role::Deposit => "deposit",
            Role::Receipt => "receipt",
            Role::OwnerLock => "ownerLock",
            Role::IckbSudt => "ickbSudt",
            Role::Change => "change",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn ckb_to_shannons(ckb: u64) -> Option<u64> {
    ckb.checked_mul(SHANNONS_PER_CKB)
}
