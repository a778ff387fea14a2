//! Publishing script binaries, dep groups and funding cells

use std::path::{Path, PathBuf};

use ckb_jsonrpc_types::OutPoint as JsonOutPoint;
use ckb_types::{
    bytes::Bytes,
    packed::{Byte32, OutPoint, Script},
};
use serde::{Deserialize, Serialize};

use crate::ckb_utils::{pack_out_points, Cell, RoleOutPoints, TransactionDraft};
use crate::config::{ScriptRegistry, SECP256K1_BLAKE160};
use crate::error::{Error, Result};
use crate::types::*;

#[derive(Clone, Debug)]
pub struct Binary {
    pub name: String,
    pub path: PathBuf,
    pub data: Bytes,
}

impl Binary {
    /// Reads `path`; the script name is the file name.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::Config(format!("binary path {} has no file name", path.display())))?
            .to_string();
        let data = Bytes::from(std::fs::read(path)?);
        Ok(Self { name, path: path.to_path_buf(), data })
    }
}

/// `(41 + data length)` CKBytes: a plain lock with empty args plus the payload.
pub fn deploy_capacity(data_len: usize) -> Result<u64> {
    DEPLOY_CELL_BASE_CKB
        .checked_add(data_len as u64)
        .and_then(ckb_to_shannons)
        .ok_or_else(|| Error::overflow("deploy capacity", data_len))
}

fn deploy_cell(data: Bytes, registry: &ScriptRegistry) -> Result<Cell> {
    Ok(Cell::new(deploy_capacity(data.len())?, registry.script(SECP256K1_BLAKE160)?, None, data))
}

/// One code cell per binary, in order.
pub fn build_deploy_code(binaries: &[Binary], registry: &ScriptRegistry) -> Result<TransactionDraft> {
    if binaries.is_empty() {
        return Err(Error::Config("no binaries to deploy".to_string()));
    }
    let cells = binaries
        .iter()
        .map(|b| deploy_cell(b.data.clone(), registry))
        .collect::<Result<Vec<_>>>()?;
    let mut draft = TransactionDraft::new();
    draft.add_outputs(Role::Code, cells)?;
    Ok(draft)
}

/// Genesis system cells (secp256k1 sighash-all, DAO, secp256k1 data) followed by `code`.
pub fn dep_group_out_points(genesis_tx_hashes: &[Byte32], code: &[OutPoint]) -> Result<Vec<OutPoint>> {
    let genesis_tx = genesis_tx_hashes
        .first()
        .ok_or_else(|| Error::Config("genesis block has no transactions".to_string()))?;
    Ok(GENESIS_DEP_GROUP_INDICES
        .iter()
        .map(|&i| OutPoint::new(genesis_tx.clone(), i))
        .chain(code.iter().cloned())
        .collect())
}

pub fn build_dep_group(
    genesis_tx_hashes: &[Byte32],
    code: &[OutPoint],
    registry: &ScriptRegistry,
) -> Result<TransactionDraft> {
    let data = pack_out_points(&dep_group_out_points(genesis_tx_hashes, code)?);
    let mut draft = TransactionDraft::new();
    draft.add_outputs(Role::DepGroup, [deploy_cell(data, registry)?])?;
    Ok(draft)
}

/// `count` identical plain cells of `capacity` shannons for `target`.
pub fn build_funding(target: &Script, count: usize, capacity: u64) -> Result<TransactionDraft> {
    if count == 0 {
        return Err(Error::Config("funding needs at least one cell".to_string()));
    }
    let cell = Cell::new(capacity, target.clone(), None, Bytes::new());
    let mut draft = TransactionDraft::new();
    draft.add_outputs(Role::Funding, vec![cell; count])?;
    Ok(draft)
}

/// Deployed binaries and where their code cells live, kept between `deploy` and `dep-group`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployedCode {
    pub name: String,
    pub path: PathBuf,
    pub out_point: JsonOutPoint,
}

pub fn deployed_code(binaries: &[Binary], out_points: &RoleOutPoints) -> Result<Vec<DeployedCode>> {
    let code = out_points.get(Role::Code);
    if code.len() != binaries.len() {
        return Err(Error::Alignment { outputs: code.len(), roles: binaries.len() });
    }
    Ok(binaries
        .iter()
        .zip(code)
        .map(|(b, op)| DeployedCode { name: b.name.clone(), path: b.path.clone(), out_point: op.clone().into() })
        .collect())
}
