//! Key handling and secp256k1-blake160 sighash-all signing

use ckb_hash::{blake2b_256, new_blake2b};
use ckb_types::{
    bytes::Bytes,
    core::TransactionView,
    packed::{Script, WitnessArgs},
    prelude::*,
};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};

use super::draft::TransactionDraft;
use crate::config::ScriptInfo;
use crate::error::{Error, Result};
use crate::types::SIGNATURE_SIZE;

/// Parse a raw hex private key, with or without `0x`.
pub fn parse_private_key(key_str: &str) -> Result<SecretKey> {
    let key_str = key_str.trim();
    let hex_str = key_str.strip_prefix("0x").unwrap_or(key_str);
    if hex_str.len() != 64 {
        return Err(Error::Signing(format!("private key must be 32 bytes of hex, got {} chars", hex_str.len())));
    }
    let bytes = hex::decode(hex_str).map_err(|e| Error::Signing(format!("private key hex: {e}")))?;
    SecretKey::from_slice(&bytes).map_err(|e| Error::Signing(format!("private key: {e}")))
}

/// blake160 of the compressed public key.
pub fn lock_args(secret: &SecretKey) -> Bytes {
    let secp = Secp256k1::signing_only();
    let pubkey = PublicKey::from_secret_key(&secp, secret);
    Bytes::copy_from_slice(&blake2b_256(pubkey.serialize())[..20])
}

pub trait Signer: Send + Sync {
    /// Lock guarding every cell this signer owns.
    fn lock_script(&self) -> Script;
    fn sign(&self, message: &[u8; 32]) -> Result<[u8; SIGNATURE_SIZE]>;
}

pub struct Secp256k1Signer {
    secret: SecretKey,
    lock: Script,
}

impl Secp256k1Signer {
    pub fn new(secret: SecretKey, secp_lock: &ScriptInfo) -> Self {
        let lock = secp_lock.script(lock_args(&secret));
        Self { secret, lock }
    }
}

impl std::fmt::Debug for Secp256k1Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secp256k1Signer").field("lock", &self.lock).finish_non_exhaustive()
    }
}

impl Signer for Secp256k1Signer {
    fn lock_script(&self) -> Script {
        self.lock.clone()
    }

    fn sign(&self, message: &[u8; 32]) -> Result<[u8; SIGNATURE_SIZE]> {
        let secp = Secp256k1::signing_only();
        let msg = Message::from_digest(*message);
        let (rec_id, compact) = secp.sign_ecdsa_recoverable(&msg, &self.secret).serialize_compact();
        let mut signature = [0u8; SIGNATURE_SIZE];
        signature[..64].copy_from_slice(&compact);
        signature[64] = rec_id.to_i32() as u8;
        Ok(signature)
    }
}

/// Indices of inputs locked by `lock`.
pub fn lock_group(draft: &TransactionDraft, lock: &Script) -> Vec<usize> {
    draft
        .inputs()
        .iter()
        .enumerate()
        .filter(|(_, input)| input.cell.output.lock().as_slice() == lock.as_slice())
        .map(|(i, _)| i)
        .collect()
}

/// Sighash-all message over the transaction hash, the group's witnesses (the
/// first with its signature zeroed) and every witness past the input count.
pub fn signing_message(tx: &TransactionView, group: &[usize]) -> Result<[u8; 32]> {
    let witnesses: Vec<Bytes> = tx.witnesses().into_iter().map(|w| w.raw_data()).collect();
    let first = *group.first().ok_or_else(|| Error::Signing("empty lock group".to_string()))?;
    let first_witness = witnesses
        .get(first)
        .ok_or_else(|| Error::Signing(format!("no witness for input {first}")))?;
    let zeroed = WitnessArgs::from_slice(first_witness)
        .map_err(|e| Error::Signing(format!("witness {first}: {e}")))?
        .as_builder()
        .lock(Some(Bytes::from(vec![0u8; SIGNATURE_SIZE])).pack())
        .build()
        .as_bytes();

    let mut blake2b = new_blake2b();
    blake2b.update(tx.hash().as_slice());
    let mut update_witness = |w: &[u8]| {
        blake2b.update(&(w.len() as u64).to_le_bytes());
        blake2b.update(w);
    };
    update_witness(&zeroed[..]);
    for &i in &group[1..] {
        let w = witnesses.get(i).ok_or_else(|| Error::Signing(format!("no witness for input {i}")))?;
        update_witness(&w[..]);
    }
    for w in witnesses.iter().skip(tx.inputs().len()) {
        update_witness(&w[..]);
    }
    let mut message = [0u8; 32];
    blake2b.finalize(&mut message);
    Ok(message)
}

/// Sign every input locked by the signer and seal the signature into the
/// group's first witness. Witnesses must already be finalized.
pub fn seal(draft: &mut TransactionDraft, signer: &dyn Signer) -> Result<()> {
    let lock = signer.lock_script();
    let group = lock_group(draft, &lock);
    let Some(&first) = group.first() else {
        return Err(Error::Signing("no input is locked by the signing key".to_string()));
    };
    let message = signing_message(&draft.to_transaction(), &group)?;
    let signature = signer.sign(&message)?;
    let sealed = WitnessArgs::from_slice(&draft.witnesses()[first])
        .map_err(|e| Error::Signing(format!("witness {first}: {e}")))?
        .as_builder()
        .lock(Some(Bytes::copy_from_slice(&signature)).pack())
        .build()
        .as_bytes();
    draft.set_witness(first, sealed)
}
