//! Script registry: symbolic script names resolved to code hash and cell dep.
//!
//! Built once per invocation, validated against the names an operation needs,
//! and passed explicitly to every builder.

use std::collections::BTreeMap;
use std::path::Path;

use ckb_jsonrpc_types::{DepType, OutPoint as JsonOutPoint, ScriptHashType};
use ckb_types::{
    bytes::Bytes,
    core,
    h256,
    packed::{self, Byte32, CellDep, Script},
    prelude::*,
    H256,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const SECP256K1_BLAKE160: &str = "SECP256K1_BLAKE160";
pub const DAO: &str = "DAO";
pub const ICKB_DOMAIN_LOGIC: &str = "ICKB_DOMAIN_LOGIC";
pub const SUDT: &str = "SUDT";

/// Names required to publish code and dep groups.
pub const DEPLOY_SCRIPTS: &[&str] = &[SECP256K1_BLAKE160];
/// Names required by both deposit phases.
pub const DEPOSIT_SCRIPTS: &[&str] = &[SECP256K1_BLAKE160, DAO, ICKB_DOMAIN_LOGIC, SUDT];

pub const SECP256K1_BLAKE160_CODE_HASH: H256 =
    h256!("0x9bd7e06f3ecf4be0f2fcd2188b23f1b9fcc88e5d4b65a8637b17723bbda3cce8");
pub const DAO_CODE_HASH: H256 = h256!("0x82d76d1b75fe2fd9a27dfbaa65a039221a380d76c926f378d3f81cf3e7e13f2e");

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScriptInfo {
    pub code_hash: H256,
    pub hash_type: ScriptHashType,
    pub out_point: JsonOutPoint,
    pub dep_type: DepType,
}

impl ScriptInfo {
    fn packed_hash_type(&self) -> packed::Byte {
        core::ScriptHashType::from(self.hash_type.clone()).into()
    }

    pub fn script(&self, args: Bytes) -> Script {
        Script::new_builder()
            .code_hash(self.code_hash.pack())
            .hash_type(self.packed_hash_type())
            .args(args.pack())
            .build()
    }

    pub fn cell_dep(&self) -> CellDep {
        CellDep::new_builder()
            .out_point(packed::OutPoint::from(self.out_point.clone()))
            .dep_type(core::DepType::from(self.dep_type.clone()).into())
            .build()
    }

    /// Whether `script` runs this code, regardless of its args.
    pub fn runs(&self, script: &Script) -> bool {
        script.code_hash().as_slice() == self.code_hash.as_bytes()
            && script.hash_type().as_slice() == self.packed_hash_type().as_slice()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ScriptRegistry {
    scripts: BTreeMap<String, ScriptInfo>,
}

impl ScriptRegistry {
    pub fn new(scripts: BTreeMap<String, ScriptInfo>, required: &[&str]) -> Result<Self> {
        let registry = Self { scripts };
        registry.require(required)?;
        Ok(registry)
    }

    pub fn require(&self, required: &[&str]) -> Result<()> {
        match required.iter().find(|name| !self.scripts.contains_key(**name)) {
            Some(missing) => Err(Error::MissingScript(missing.to_string())),
            None => Ok(()),
        }
    }

    /// Devnet defaults read off the genesis block: the secp256k1 lock dep group
    /// in transaction 1, the DAO type code in transaction 0.
    pub fn devnet(genesis_tx_hashes: &[Byte32]) -> Result<Self> {
        if genesis_tx_hashes.len() < 2 {
            return Err(Error::Config(format!(
                "genesis block has {} transactions, expected at least 2",
                genesis_tx_hashes.len()
            )));
        }
        let mut scripts = BTreeMap::new();
        scripts.insert(
            SECP256K1_BLAKE160.to_string(),
            ScriptInfo {
                code_hash: SECP256K1_BLAKE160_CODE_HASH,
                hash_type: ScriptHashType::Type,
                out_point: packed::OutPoint::new(genesis_tx_hashes[1].clone(), 0).into(),
                dep_type: DepType::DepGroup,
            },
        );
        scripts.insert(
            DAO.to_string(),
            ScriptInfo {
                code_hash: DAO_CODE_HASH,
                hash_type: ScriptHashType::Type,
                out_point: packed::OutPoint::new(genesis_tx_hashes[0].clone(), 2).into(),
                dep_type: DepType::Code,
            },
        );
        Self::new(scripts, DEPLOY_SCRIPTS)
    }

    /// Registry after the iCKB dep group is committed: every script, including the
    /// freshly deployed binaries, resolves through the dep group.
    pub fn with_dep_group(&self, binaries: &[(String, Bytes)], dep_group: &packed::OutPoint) -> Self {
        let out_point: JsonOutPoint = dep_group.clone().into();
        let mut scripts: BTreeMap<String, ScriptInfo> = self
            .scripts
            .iter()
            .map(|(name, info)| {
                let info = ScriptInfo {
                    out_point: out_point.clone(),
                    dep_type: DepType::DepGroup,
                    ..info.clone()
                };
                (name.clone(), info)
            })
            .collect();
        for (name, binary) in binaries {
            scripts.insert(
                name.to_uppercase(),
                ScriptInfo {
                    code_hash: H256(ckb_hash::blake2b_256(binary)),
                    hash_type: ScriptHashType::Data,
                    out_point: out_point.clone(),
                    dep_type: DepType::DepGroup,
                },
            );
        }
        Self { scripts }
    }

    pub fn get(&self, name: &str) -> Result<&ScriptInfo> {
        self.scripts.get(name).ok_or_else(|| Error::MissingScript(name.to_string()))
    }

    /// Script `name` with empty args.
    pub fn script(&self, name: &str) -> Result<Script> {
        Ok(self.get(name)?.script(Bytes::new()))
    }

    pub fn find(&self, script: &Script) -> Option<(&str, &ScriptInfo)> {
        self.scripts
            .iter()
            .find(|(_, info)| info.runs(script))
            .map(|(name, info)| (name.as_str(), info))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scripts.keys().map(String::as_str)
    }

    pub fn load(path: impl AsRef<Path>, required: &[&str]) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let registry: Self = serde_json::from_str(&json)?;
        registry.require(required)?;
        Ok(registry)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }
}
