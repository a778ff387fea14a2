//! Script helpers: iCKB token script, DAO field parsing, dep group packing

use ckb_types::{
    bytes::Bytes,
    packed::{Byte32, OutPoint, OutPointVec, Script},
    prelude::*,
};

use crate::config::{ScriptRegistry, ICKB_DOMAIN_LOGIC, SUDT};
use crate::error::Result;

/// Byte-exact script comparison.
pub fn script_eq(a: &Script, b: &Script) -> bool {
    a.as_slice() == b.as_slice()
}

/// sUDT type script whose owner is the iCKB domain logic script hash.
pub fn ickb_sudt_script(registry: &ScriptRegistry) -> Result<Script> {
    let owner_hash = registry.script(ICKB_DOMAIN_LOGIC)?.calc_script_hash();
    Ok(registry.get(SUDT)?.script(owner_hash.as_bytes()))
}

/// Accumulated rate from a header DAO field: `C (8) | AR (8) | S (8) | U (8)`, little-endian.
pub fn dao_accumulated_rate(dao: &Byte32) -> u64 {
    let mut ar = [0u8; 8];
    ar.copy_from_slice(&dao.as_slice()[8..16]);
    u64::from_le_bytes(ar)
}

/// Dep group cell data: molecule `OutPointVec`, a u32 item count followed by
/// `(tx_hash: 32 bytes, index: u32 LE)` items.
pub fn pack_out_points(out_points: &[OutPoint]) -> Bytes {
    OutPointVec::new_builder().set(out_points.to_vec()).build().as_bytes()
}

pub fn format_out_point(out_point: &OutPoint) -> String {
    let index: u32 = out_point.index().unpack();
    format!("{:#x}-{}", out_point.tx_hash(), index)
}
